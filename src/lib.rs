//! # nandgraph: combinational NAND circuits
//!
//! A [`Graph`][crate::graph::Graph] owns NAND gates with a fixed number of
//! input slots. Each slot reads a caller-owned signal (`&Cell<bool>`) or the
//! output of another gate. Wiring may be cyclic or incomplete while a circuit
//! is being built; [`Graph::evaluate`][crate::graph::Graph::evaluate] checks
//! everything reachable from the requested sinks, then fills an output buffer
//! and returns the critical-path depth.
//!
//! ```rust
//! use std::cell::Cell;
//! use nandgraph::graph::Graph;
//!
//! let (a, b) = (Cell::new(true), Cell::new(true));
//! let mut graph = Graph::new();
//! let gate = graph.add_gate(2).unwrap();
//! graph.connect_signal(&a, gate, 0).unwrap();
//! graph.connect_signal(&b, gate, 1).unwrap();
//!
//! let mut out = [true];
//! assert_eq!(graph.evaluate(&[gate], &mut out), Ok(1));
//! assert!(!out[0]);
//!
//! b.set(false);
//! graph.evaluate(&[gate], &mut out).unwrap();
//! assert!(out[0]);
//! ```

pub mod dsl;
pub mod graph;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod plan;
pub mod rt;
