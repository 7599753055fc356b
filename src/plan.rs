//! Plan module: validate the subgraph behind a batch of sinks and measure it.
//!
//! Compiling a plan walks everything reachable from each sink through gate
//! bindings. A gate met twice on the same path is a cycle; an empty slot or a
//! binding to a removed gate means the circuit is not fully wired. Only then
//! is the critical-path depth computed. All walks use explicit stacks, so a
//! chain of any length is fine.
//!
//! [`Plan`] keeps the per-sink depths and a topological order for callers
//! that want to inspect a circuit. Evaluation runs the same checks through
//! a reusable `Scratch` and builds neither.

use crate::graph::{GateId, Graph, GraphError, Slot};
use crate::invariant_ppt::{assert_invariant, DEPTH_MEMO_SOUND, EVAL_REJECTS_CYCLE, EVAL_REJECTS_INCOMPLETE};
use log::{debug, trace};

/// Traversal state of a gate during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    /// On the path currently being explored.
    OnPath,
    /// Fully explored, no cycle behind it.
    Done,
}

/// A validated batch of sinks, for inspecting a circuit before evaluating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Sinks in request order.
    pub sinks: Vec<GateId>,
    /// Critical-path depth of each sink.
    pub depths: Vec<usize>,
    /// Every gate reachable from a sink, each after all of its inputs.
    pub order: Vec<GateId>,
}

impl Plan {
    /// Validate `sinks` in order and compute their depths.
    pub fn compile(graph: &Graph<'_>, sinks: &[GateId]) -> Result<Self, GraphError> {
        let mut scratch = Scratch::default();
        let mut order = Vec::new();
        scratch.check(graph, sinks, Some(&mut order))?;

        let mut depths = Vec::new();
        depths.try_reserve_exact(sinks.len())?;
        for &sink in sinks {
            depths.push(scratch.depth(sink).ok_or(GraphError::InvalidGate(sink))?);
        }

        let plan = Self {
            sinks: sinks.to_vec(),
            depths,
            order,
        };
        debug!(
            "compile({} sinks): {} gates reachable, critical path {}",
            plan.sinks.len(),
            plan.order.len(),
            plan.critical_path()
        );
        Ok(plan)
    }

    /// Largest depth over all sinks.
    pub fn critical_path(&self) -> usize {
        self.depths.iter().copied().max().unwrap_or(0)
    }
}

/// Tables for validating sinks and measuring their depth.
///
/// Cleared between runs but never shrunk, so a warm instance checks a graph
/// no larger than before without allocating.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    marks: Vec<Mark>,
    /// Depth per gate id, filled on the way back up.
    memo: Vec<Option<usize>>,
    /// (gate, next slot)
    walk: Vec<(GateId, usize)>,
    /// (gate, next slot, deepest input so far)
    climb: Vec<(GateId, usize, usize)>,
}

impl Scratch {
    /// Validate `sinks` in order and return the largest depth.
    ///
    /// When `order` is given, every reachable gate is appended to it after
    /// all of its inputs.
    pub(crate) fn check(
        &mut self,
        graph: &Graph<'_>,
        sinks: &[GateId],
        mut order: Option<&mut Vec<GateId>>,
    ) -> Result<usize, GraphError> {
        if sinks.is_empty() {
            return Err(GraphError::NoSinks);
        }
        if let Some(&missing) = sinks.iter().find(|&&s| !graph.contains(s)) {
            return Err(GraphError::InvalidGate(missing));
        }

        let bound = graph.id_bound();
        refill(&mut self.marks, bound, Mark::Unseen)?;
        refill(&mut self.memo, bound, None)?;

        let mut critical = 0;
        for &sink in sinks {
            self.check_sink(graph, sink, order.as_deref_mut())?;
            critical = critical.max(self.depth_of(graph, sink)?);
        }
        Ok(critical)
    }

    /// Depth of a gate measured by the last successful [`Scratch::check`].
    pub(crate) fn depth(&self, id: GateId) -> Option<usize> {
        self.memo.get(id.index()).copied().flatten()
    }

    /// Depth-first walk from `sink`. Cycles win over missing wiring.
    fn check_sink(
        &mut self,
        graph: &Graph<'_>,
        sink: GateId,
        mut order: Option<&mut Vec<GateId>>,
    ) -> Result<(), GraphError> {
        if self.marks[sink.index()] == Mark::Done {
            return Ok(());
        }
        let mut incomplete: Option<GraphError> = None;
        self.walk.clear();
        self.walk.try_reserve(1)?;
        self.walk.push((sink, 0));
        self.marks[sink.index()] = Mark::OnPath;

        while let Some(top) = self.walk.last_mut() {
            let (id, slot) = *top;
            let gate = graph.gate(id).ok_or(GraphError::InvalidGate(id))?;
            if slot == gate.inputs.len() {
                self.marks[id.index()] = Mark::Done;
                if let Some(order) = order.as_mut() {
                    order.try_reserve(1)?;
                    order.push(id);
                }
                self.walk.pop();
                continue;
            }
            top.1 += 1;

            match gate.inputs[slot] {
                Slot::Signal(_) => {}
                Slot::Empty => {
                    incomplete.get_or_insert(GraphError::Incomplete { gate: id, slot });
                }
                Slot::Gate(source) if !graph.contains(source) => {
                    incomplete.get_or_insert(GraphError::DanglingInput {
                        gate: id,
                        slot,
                        missing: source,
                    });
                }
                Slot::Gate(source) => match self.marks[source.index()] {
                    Mark::OnPath => {
                        assert_invariant(
                            EVAL_REJECTS_CYCLE,
                            self.marks[source.index()] == Mark::OnPath,
                            "Cycle detected, rejecting",
                            Some("check_sink"),
                        );
                        debug!("check_sink({}): cycle through {}", sink, source);
                        return Err(GraphError::Cycle { gate: source });
                    }
                    Mark::Done => {}
                    Mark::Unseen => {
                        self.marks[source.index()] = Mark::OnPath;
                        self.walk.try_reserve(1)?;
                        self.walk.push((source, 0));
                    }
                },
            }
        }

        match incomplete {
            Some(err) => {
                assert_invariant(
                    EVAL_REJECTS_INCOMPLETE,
                    err.kind() == crate::graph::ErrorKind::MalformedGraph,
                    "Missing wiring detected, rejecting",
                    Some("check_sink"),
                );
                debug!("check_sink({}): {}", sink, err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Critical-path depth of a validated sink, memoized per gate.
    ///
    /// A gate without slots has depth 0. Otherwise it is one more than the
    /// deepest gate it reads from; signals count as depth 0.
    fn depth_of(&mut self, graph: &Graph<'_>, sink: GateId) -> Result<usize, GraphError> {
        if let Some(depth) = self.memo[sink.index()] {
            return Ok(depth);
        }
        self.climb.clear();
        self.climb.try_reserve(1)?;
        self.climb.push((sink, 0, 0));

        while let Some(top) = self.climb.last_mut() {
            let (id, slot, deepest) = *top;
            let gate = graph.gate(id).ok_or(GraphError::InvalidGate(id))?;
            if slot == gate.inputs.len() {
                let depth = if gate.inputs.is_empty() { 0 } else { deepest + 1 };
                assert_invariant(
                    DEPTH_MEMO_SOUND,
                    self.memo[id.index()].is_none(),
                    "Depth is computed once per gate",
                    Some("depth_of"),
                );
                self.memo[id.index()] = Some(depth);
                trace!("depth({}) = {}", id, depth);
                self.climb.pop();
                if let Some(parent) = self.climb.last_mut() {
                    parent.2 = parent.2.max(depth);
                }
                continue;
            }

            let pending = match gate.inputs[slot] {
                Slot::Gate(source) => match self.memo[source.index()] {
                    Some(depth) => {
                        top.2 = deepest.max(depth);
                        None
                    }
                    None => Some(source),
                },
                Slot::Signal(_) | Slot::Empty => None,
            };
            top.1 += 1;
            if let Some(source) = pending {
                self.climb.try_reserve(1)?;
                self.climb.push((source, 0, 0));
            }
        }

        self.memo[sink.index()].ok_or(GraphError::InvalidGate(sink))
    }
}

/// Reset a per-id table to `len` copies of `value`, keeping its capacity.
///
/// Reports allocation failure instead of aborting.
pub(crate) fn refill<T: Clone>(table: &mut Vec<T>, len: usize, value: T) -> Result<(), GraphError> {
    table.clear();
    table.try_reserve_exact(len)?;
    table.resize(len, value);
    Ok(())
}
