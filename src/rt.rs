//! RT module: NAND output evaluation.

// IMPORTANT: Do not call assert_invariant or any PPT logging in evaluation loops; it takes a lock per call.

use crate::graph::{GateId, Graph, GraphError, Slot};
use crate::plan::{refill, Scratch};
use log::{debug, trace};

/// Reusable evaluation context.
///
/// Holds the validation tables, the output memo and the work stack between
/// runs. Once a run has sized them, later runs over a graph no larger than
/// that do not allocate.
#[derive(Debug, Default)]
pub struct Evaluator {
    plan: Scratch,
    outputs: Vec<Option<bool>>,
    stack: Vec<(GateId, usize)>,
    evaluated: usize,
}

impl Evaluator {
    /// Create an evaluator with empty scratch tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `sinks`, write their outputs to `out` and return the
    /// critical-path depth.
    ///
    /// On error the contents of `out` are unspecified.
    pub fn run(&mut self, graph: &Graph<'_>, sinks: &[GateId], out: &mut [bool]) -> Result<usize, GraphError> {
        if sinks.is_empty() {
            return Err(GraphError::NoSinks);
        }
        if out.len() != sinks.len() {
            return Err(GraphError::BufferLength {
                sinks: sinks.len(),
                buffer: out.len(),
            });
        }
        let critical = self.plan.check(graph, sinks, None)?;
        self.reset(graph.id_bound())?;

        for (value, &sink) in out.iter_mut().zip(sinks) {
            *value = self.output(graph, sink)?;
        }
        debug!(
            "evaluate({} sinks): {} gates evaluated, critical path {}",
            sinks.len(),
            self.evaluated,
            critical
        );
        Ok(critical)
    }

    /// Number of gate outputs computed by the last run.
    pub fn gates_evaluated(&self) -> usize {
        self.evaluated
    }

    fn reset(&mut self, bound: usize) -> Result<(), GraphError> {
        refill(&mut self.outputs, bound, None)?;
        self.stack.clear();
        self.evaluated = 0;
        Ok(())
    }

    /// Output of a validated gate.
    ///
    /// A gate is `false` only when every input is `true`; scanning stops at
    /// the first `false` input. A gate without inputs is `false`.
    fn output(&mut self, graph: &Graph<'_>, sink: GateId) -> Result<bool, GraphError> {
        if let Some(value) = self.outputs[sink.index()] {
            return Ok(value);
        }
        self.stack.clear();
        self.stack.try_reserve(1)?;
        self.stack.push((sink, 0));

        while let Some(&(id, start)) = self.stack.last() {
            let gate = graph.gate(id).ok_or(GraphError::InvalidGate(id))?;
            let mut value = false;
            let mut pending = None;
            let mut slot = start;
            while slot < gate.inputs.len() {
                let input = match gate.inputs[slot] {
                    Slot::Signal(signal) => signal.get(),
                    Slot::Gate(source) => match self.outputs[source.index()] {
                        Some(input) => input,
                        None => {
                            pending = Some(source);
                            break;
                        }
                    },
                    Slot::Empty => return Err(GraphError::Incomplete { gate: id, slot }),
                };
                if !input {
                    value = true;
                    break;
                }
                slot += 1;
            }

            if let Some(source) = pending {
                // Resume at the same slot once `source` is known.
                if let Some(top) = self.stack.last_mut() {
                    top.1 = slot;
                }
                self.stack.try_reserve(1)?;
                self.stack.push((source, 0));
                continue;
            }

            trace!("output({}) = {}", id, value);
            self.outputs[id.index()] = Some(value);
            self.evaluated += 1;
            self.stack.pop();
        }

        self.outputs[sink.index()].ok_or(GraphError::InvalidGate(sink))
    }
}

impl Graph<'_> {
    /// Evaluate `sinks` into `out` and return the largest critical-path depth.
    ///
    /// Each sink is checked for cycles and missing wiring before anything is
    /// computed. Shared upstream gates are evaluated once per call.
    pub fn evaluate(&self, sinks: &[GateId], out: &mut [bool]) -> Result<usize, GraphError> {
        Evaluator::new().run(self, sinks, out)
    }
}
