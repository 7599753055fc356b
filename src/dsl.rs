//! DSL module: builder API for circuits with named gates.

use crate::graph::{GateId, Graph, GraphError};
use crate::invariant_ppt::{assert_invariant, BUILDER_NAMES_UNIQUE};
use std::cell::Cell;
use std::collections::HashMap;
use thiserror::Error;

/// The circuit builder.
#[derive(Debug, Default)]
pub struct CircuitBuilder<'s> {
    graph: Graph<'s>,
    names: HashMap<String, GateId>,
}

impl<'s> CircuitBuilder<'s> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            names: HashMap::new(),
        }
    }

    /// Add a named gate with `slots` inputs.
    pub fn gate(&mut self, name: &str, slots: usize) -> Result<GateId, DslError> {
        if self.names.contains_key(name) {
            return Err(DslError::DuplicateGate(name.to_string()));
        }
        let id = self.graph.add_gate(slots)?;
        self.names.insert(name.to_string(), id);
        assert_invariant(
            BUILDER_NAMES_UNIQUE,
            self.names.len() == self.graph.len(),
            "Every gate has exactly one name",
            Some("gate"),
        );
        Ok(id)
    }

    /// Feed gate `from` into slot `slot` of gate `to`.
    pub fn wire(&mut self, from: &str, to: &str, slot: usize) -> Result<(), DslError> {
        let (from, to) = (self.id(from)?, self.id(to)?);
        self.graph.connect_gate(from, to, slot)?;
        Ok(())
    }

    /// Feed a signal into slot `slot` of gate `to`.
    pub fn feed(&mut self, signal: &'s Cell<bool>, to: &str, slot: usize) -> Result<(), DslError> {
        let to = self.id(to)?;
        self.graph.connect_signal(signal, to, slot)?;
        Ok(())
    }

    /// Look up a gate by name.
    pub fn id(&self, name: &str) -> Result<GateId, DslError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DslError::MissingGate(name.to_string()))
    }

    /// Build the circuit.
    pub fn build(self) -> Circuit<'s> {
        Circuit {
            graph: self.graph,
            names: self.names,
        }
    }
}

/// A graph together with the names its gates were built under.
#[derive(Debug)]
pub struct Circuit<'s> {
    /// The underlying gate graph.
    pub graph: Graph<'s>,
    names: HashMap<String, GateId>,
}

impl Circuit<'_> {
    /// Look up a gate by name.
    pub fn id(&self, name: &str) -> Result<GateId, DslError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DslError::MissingGate(name.to_string()))
    }

    /// Evaluate the named sinks. Returns their outputs and the critical path.
    pub fn evaluate(&self, sinks: &[&str]) -> Result<(Vec<bool>, usize), DslError> {
        let ids = sinks.iter().map(|name| self.id(name)).collect::<Result<Vec<_>, _>>()?;
        let mut out = vec![false; ids.len()];
        let depth = self.graph.evaluate(&ids, &mut out)?;
        Ok((out, depth))
    }
}

/// DSL-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    /// The graph rejected the operation.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// No gate has this name.
    #[error("no gate named `{0}`")]
    MissingGate(String),
    /// A gate with this name already exists.
    #[error("gate `{0}` is already defined")]
    DuplicateGate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn dsl_half_adder() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let (sa, sb) = (Cell::new(a), Cell::new(b));
            let mut builder = CircuitBuilder::new();
            for name in ["n1", "n2", "n3", "sum", "carry"] {
                builder.gate(name, 2).unwrap();
            }
            builder.feed(&sa, "n1", 0).unwrap();
            builder.feed(&sb, "n1", 1).unwrap();
            builder.feed(&sa, "n2", 0).unwrap();
            builder.wire("n1", "n2", 1).unwrap();
            builder.feed(&sb, "n3", 0).unwrap();
            builder.wire("n1", "n3", 1).unwrap();
            builder.wire("n2", "sum", 0).unwrap();
            builder.wire("n3", "sum", 1).unwrap();
            builder.wire("n1", "carry", 0).unwrap();
            builder.wire("n1", "carry", 1).unwrap();
            let circuit = builder.build();

            let (out, depth) = circuit.evaluate(&["sum", "carry"]).unwrap();
            assert_eq!(out, vec![a ^ b, a && b]);
            assert_eq!(depth, 3);
            assert_eq!(circuit.graph.fan_out(circuit.id("n1").unwrap()), Ok(4));
        }
    }

    #[test]
    fn dsl_errors() {
        let mut builder = CircuitBuilder::new();
        builder.gate("x", 1).unwrap();
        assert_eq!(builder.gate("x", 1), Err(DslError::DuplicateGate("x".into())));
        assert_eq!(builder.wire("y", "x", 0), Err(DslError::MissingGate("y".into())));
        let x = builder.id("x").unwrap();
        assert_eq!(
            builder.wire("x", "x", 3),
            Err(DslError::Graph(GraphError::SlotOutOfRange { gate: x, slot: 3, count: 1 }))
        );
        let circuit = builder.build();
        assert!(matches!(
            circuit.evaluate(&["x"]),
            Err(DslError::Graph(GraphError::Incomplete { .. }))
        ));
    }
}
