use nandgraph::graph::{ErrorKind, GateId, Graph, GraphError, Slot};
use std::cell::Cell;
use test_log::test;

#[test]
fn input_reflects_latest_binding() {
    let (s1, s2) = (Cell::new(true), Cell::new(false));
    let mut graph = Graph::new();
    let a = graph.add_gate(0).unwrap();
    let t = graph.add_gate(2).unwrap();

    graph.connect_signal(&s1, t, 0).unwrap();
    assert_eq!(graph.input(t, 0), Ok(Slot::Signal(&s1)));
    graph.connect_gate(a, t, 0).unwrap();
    assert_eq!(graph.input(t, 0), Ok(Slot::Gate(a)));
    graph.connect_signal(&s2, t, 0).unwrap();
    assert_eq!(graph.input(t, 0), Ok(Slot::Signal(&s2)));
    assert_ne!(graph.input(t, 0), Ok(Slot::Signal(&s1)));
    assert_eq!(graph.input(t, 1), Ok(Slot::Empty));
}

#[test]
fn rebinding_moves_exactly_one_count() {
    let mut graph = Graph::new();
    let a = graph.add_gate(0).unwrap();
    let b = graph.add_gate(0).unwrap();
    let t = graph.add_gate(3).unwrap();
    for slot in 0..3 {
        graph.connect_gate(a, t, slot).unwrap();
    }
    assert_eq!(graph.fan_out(a), Ok(3));

    graph.connect_gate(b, t, 1).unwrap();
    assert_eq!(graph.fan_out(a), Ok(2));
    assert_eq!(graph.fan_out(b), Ok(1));

    // Rebinding a slot to the gate it already reads from keeps the count.
    graph.connect_gate(b, t, 1).unwrap();
    assert_eq!(graph.fan_out(b), Ok(1));
}

#[test]
fn consumer_indexes_fan_out() {
    let mut graph = Graph::new();
    let a = graph.add_gate(0).unwrap();
    let x = graph.add_gate(1).unwrap();
    let y = graph.add_gate(2).unwrap();
    assert_eq!(
        graph.consumer(a, 0),
        Err(GraphError::ConsumerOutOfRange { gate: a, index: 0, count: 0 })
    );
    graph.connect_gate(a, x, 0).unwrap();
    graph.connect_gate(a, y, 1).unwrap();
    assert_eq!(graph.consumer(a, 0), Ok(x));
    assert_eq!(graph.consumer(a, 1), Ok(y));
    assert_eq!(graph.consumer(a, 2).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn slot_count_is_fixed() {
    let s = Cell::new(true);
    let mut graph = Graph::new();
    let a = graph.add_gate(0).unwrap();
    let t = graph.add_gate(4).unwrap();
    graph.connect_gate(a, t, 3).unwrap();
    graph.connect_signal(&s, t, 0).unwrap();
    graph.disconnect(t, 3).unwrap();
    assert_eq!(graph.slot_count(t), Ok(4));
    assert!(graph.input(t, 4).is_err());
}

#[test]
fn gate_ids_stable_monotonic() {
    let mut graph = Graph::new();
    let ids: Vec<GateId> = (0..5).map(|_| graph.add_gate(1).unwrap()).collect();
    graph.remove_gate(ids[4]);
    graph.remove_gate(ids[2]);
    let next = graph.add_gate(1).unwrap();
    assert!(ids.iter().all(|&id| id < next));
    assert_eq!(next.index(), 5);
    assert_eq!(graph.len(), 4);
}

#[test]
fn separate_graphs_number_independently() {
    let mut first = Graph::new();
    let mut second = Graph::new();
    first.add_gate(0).unwrap();
    first.add_gate(0).unwrap();
    let id = second.add_gate(0).unwrap();
    assert_eq!(id.index(), 0);
}

#[test]
fn remove_gate_leaves_references_dangling() {
    let s = Cell::new(true);
    let mut graph = Graph::new();
    let a = graph.add_gate(1).unwrap();
    let t = graph.add_gate(1).unwrap();
    graph.connect_signal(&s, a, 0).unwrap();
    graph.connect_gate(a, t, 0).unwrap();

    assert!(graph.remove_gate(a));
    assert_eq!(graph.input(t, 0), Ok(Slot::Gate(a)));
    assert_eq!(graph.fan_out(a), Err(GraphError::InvalidGate(a)));

    // Rebinding the dangling slot is still allowed.
    graph.connect_signal(&s, t, 0).unwrap();
    let mut out = [true];
    assert_eq!(graph.evaluate(&[t], &mut out), Ok(1));
    assert!(!out[0]);
}

#[test]
fn detach_then_evaluate_reports_empty_slot() {
    let s = Cell::new(true);
    let mut graph = Graph::new();
    let a = graph.add_gate(1).unwrap();
    let t = graph.add_gate(1).unwrap();
    graph.connect_signal(&s, a, 0).unwrap();
    graph.connect_gate(a, t, 0).unwrap();

    assert!(graph.detach(a));
    let mut out = [false];
    assert_eq!(
        graph.evaluate(&[t], &mut out),
        Err(GraphError::Incomplete { gate: t, slot: 0 })
    );
}
