//! The only test in this binary, so nothing else clears the invariant log under it.

use nandgraph::dsl::CircuitBuilder;
use nandgraph::graph::Graph;
use nandgraph::invariant_ppt::{
    clear_invariant_log, contract_test, BUILDER_NAMES_UNIQUE, DEPTH_MEMO_SOUND,
    EVAL_REJECTS_CYCLE, EVAL_REJECTS_INCOMPLETE, FAN_OUT_BALANCED, GATE_IDS_MONOTONIC,
    SLOT_COUNT_FIXED,
};
use std::cell::Cell;
use test_log::test;

#[test]
fn contract_graph_invariants() {
    clear_invariant_log();
    let s = Cell::new(true);

    let mut graph = Graph::new();
    let a = graph.add_gate(1).unwrap();
    let b = graph.add_gate(2).unwrap();
    graph.connect_signal(&s, a, 0).unwrap();
    graph.connect_gate(a, b, 0).unwrap();
    let mut out = [false];
    assert!(graph.evaluate(&[b], &mut out).is_err());

    graph.connect_signal(&s, b, 1).unwrap();
    assert_eq!(graph.evaluate(&[b], &mut out), Ok(2));

    graph.connect_gate(b, a, 0).unwrap();
    assert!(graph.evaluate(&[b], &mut out).is_err());

    let mut builder = CircuitBuilder::new();
    builder.gate("only", 0).unwrap();

    contract_test(
        "graph invariants",
        &[
            GATE_IDS_MONOTONIC,
            SLOT_COUNT_FIXED,
            FAN_OUT_BALANCED,
            EVAL_REJECTS_CYCLE,
            EVAL_REJECTS_INCOMPLETE,
            DEPTH_MEMO_SOUND,
            BUILDER_NAMES_UNIQUE,
        ],
    );
}
