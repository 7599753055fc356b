//! Graph module: an arena of NAND gates and the wiring between them.
//!
//! Gates are addressed by [`GateId`], handed out monotonically by the owning
//! [`Graph`] and never reused. Every input slot is either empty, bound to a
//! caller-owned signal, or bound to another gate's output. Each gate also
//! keeps its fan-out: one entry per slot that currently reads from it.
//!
//! Cycles and empty slots are legal while a circuit is being wired. They are
//! rejected by [`Graph::evaluate`], not here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::invariant_ppt::{assert_invariant, FAN_OUT_BALANCED, GATE_IDS_MONOTONIC, SLOT_COUNT_FIXED};
use log::{debug, warn};
use std::cell::Cell;
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a gate within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(usize);

impl GateId {
    /// Position of this gate in its graph's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// What a single input slot reads from.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'s> {
    /// Nothing bound yet.
    Empty,
    /// A caller-owned signal, read at evaluation time.
    Signal(&'s Cell<bool>),
    /// The output of another gate.
    Gate(GateId),
}

impl Slot<'_> {
    /// Whether nothing is bound to this slot.
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// The upstream gate, if this slot reads from one.
    pub fn as_gate(&self) -> Option<GateId> {
        match self {
            Slot::Gate(id) => Some(*id),
            _ => None,
        }
    }
}

// Signals compare by identity: two slots are equal when they read the same cell.
impl PartialEq for Slot<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::Empty, Slot::Empty) => true,
            (Slot::Signal(a), Slot::Signal(b)) => std::ptr::eq(*a, *b),
            (Slot::Gate(a), Slot::Gate(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Slot<'_> {}

/// Coarse classification of [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed call: bad handle, index out of range, bad buffer. Nothing changed.
    InvalidArgument,
    /// Storage could not be allocated.
    OutOfMemory,
    /// The subgraph reachable from a sink is cyclic or not fully wired.
    MalformedGraph,
}

/// Errors reported by graph construction and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Gate does not exist (never created, or already removed).
    #[error("gate {0} does not exist")]
    InvalidGate(GateId),
    /// Input slot index past the gate's slot count.
    #[error("slot {slot} is out of range for gate {gate} with {count} slots")]
    SlotOutOfRange {
        /// The gate addressed.
        gate: GateId,
        /// The requested slot.
        slot: usize,
        /// The gate's slot count.
        count: usize,
    },
    /// Fan-out index past the gate's fan-out count.
    #[error("consumer {index} is out of range for gate {gate} with fan-out {count}")]
    ConsumerOutOfRange {
        /// The gate addressed.
        gate: GateId,
        /// The requested fan-out position.
        index: usize,
        /// The gate's fan-out count.
        count: usize,
    },
    /// Evaluation was asked for no sinks.
    #[error("no sink gates given")]
    NoSinks,
    /// Output buffer length does not match the number of sinks.
    #[error("output buffer holds {buffer} values but {sinks} sinks were given")]
    BufferLength {
        /// Number of sinks.
        sinks: usize,
        /// Length of the output buffer.
        buffer: usize,
    },
    /// An allocation failed.
    #[error("allocation failed: {0}")]
    OutOfMemory(#[from] TryReserveError),
    /// A cycle is reachable from a sink.
    #[error("cycle through gate {gate}")]
    Cycle {
        /// A gate found twice on the same path.
        gate: GateId,
    },
    /// An empty slot is reachable from a sink.
    #[error("gate {gate} has nothing bound to slot {slot}")]
    Incomplete {
        /// The gate owning the empty slot.
        gate: GateId,
        /// The empty slot.
        slot: usize,
    },
    /// A slot reachable from a sink reads from a removed gate.
    #[error("gate {gate} slot {slot} reads from removed gate {missing}")]
    DanglingInput {
        /// The gate owning the slot.
        gate: GateId,
        /// The slot.
        slot: usize,
        /// The removed upstream gate.
        missing: GateId,
    },
}

impl GraphError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::InvalidGate(_)
            | GraphError::SlotOutOfRange { .. }
            | GraphError::ConsumerOutOfRange { .. }
            | GraphError::NoSinks
            | GraphError::BufferLength { .. } => ErrorKind::InvalidArgument,
            GraphError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            GraphError::Cycle { .. }
            | GraphError::Incomplete { .. }
            | GraphError::DanglingInput { .. } => ErrorKind::MalformedGraph,
        }
    }
}

/// A gate in the arena.
#[derive(Debug, Clone)]
pub(crate) struct GateData<'s> {
    pub(crate) id: GateId,
    /// Fixed at creation.
    pub(crate) inputs: Box<[Slot<'s>]>,
    /// One entry per slot reading from this gate, in binding order.
    pub(crate) fan_out: Vec<GateId>,
}

/// The gate graph: owns every gate, borrows every signal for `'s`.
#[derive(Debug, Clone, Default)]
pub struct Graph<'s> {
    /// All gates ever created (None for removed gates). Index is the id.
    gates: Vec<Option<GateData<'s>>>,
    live: usize,
}

impl<'s> Graph<'s> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            gates: Vec::new(),
            live: 0,
        }
    }

    /// Create an empty graph with room for `gates` gates.
    pub fn with_capacity(gates: usize) -> Self {
        Self {
            gates: Vec::with_capacity(gates),
            live: 0,
        }
    }

    /// Add a gate with `slots` empty input slots.
    pub fn add_gate(&mut self, slots: usize) -> Result<GateId, GraphError> {
        let id = GateId(self.gates.len());
        let mut inputs = Vec::new();
        inputs.try_reserve_exact(slots)?;
        inputs.resize(slots, Slot::Empty);
        self.gates.try_reserve(1)?;

        assert_invariant(
            GATE_IDS_MONOTONIC,
            self.live <= id.0,
            "New gate id must exceed every live id",
            Some("add_gate"),
        );
        self.gates.push(Some(GateData {
            id,
            inputs: inputs.into_boxed_slice(),
            fan_out: Vec::new(),
        }));
        self.live += 1;
        debug!("add_gate(slots = {}) -> {}", slots, id);
        Ok(id)
    }

    /// Release a gate. Returns `false` if it did not exist.
    ///
    /// Slots of other gates that still read from `id` are left untouched and
    /// will dangle; use [`Graph::detach`] to unlink first.
    pub fn remove_gate(&mut self, id: GateId) -> bool {
        match self.gates.get_mut(id.0).and_then(Option::take) {
            Some(gate) => {
                self.live -= 1;
                debug!(
                    "remove_gate({}): {} slots, fan-out {}",
                    id,
                    gate.inputs.len(),
                    gate.fan_out.len()
                );
                true
            }
            None => false,
        }
    }

    /// Unlink a gate from all its neighbours, then remove it.
    ///
    /// Every slot reading from `id` becomes empty and every gate `id` reads
    /// from loses the matching fan-out entry. Returns `false` if `id` did
    /// not exist.
    pub fn detach(&mut self, id: GateId) -> bool {
        let Some(gate) = self.gate(id) else {
            return false;
        };
        let consumers = gate.fan_out.clone();
        let sources: Vec<GateId> = gate.inputs.iter().filter_map(Slot::as_gate).collect();

        for consumer in consumers {
            if consumer == id {
                continue;
            }
            if let Some(data) = self.gate_data_mut(consumer) {
                if let Some(slot) = data.inputs.iter_mut().find(|s| **s == Slot::Gate(id)) {
                    *slot = Slot::Empty;
                }
            }
        }
        for source in sources {
            if source != id {
                self.unlink(source, id);
            }
        }
        debug!("detach({})", id);
        self.remove_gate(id)
    }

    /// Bind `target`'s slot to read `source`'s output.
    ///
    /// If the fan-out of `source` cannot grow, the slot is already rebound
    /// when `OutOfMemory` is returned.
    pub fn connect_gate(&mut self, source: GateId, target: GateId, slot: usize) -> Result<(), GraphError> {
        self.live_gate(source)?;
        let previous = self.input(target, slot)?;
        let slots_before = self.slot_count(target)?;
        let balanced_before = self.bindings_balanced(source, target);

        if let Slot::Gate(former) = previous {
            self.unlink(former, target);
        }
        self.live_gate_mut(target)?.inputs[slot] = Slot::Gate(source);

        let fan_out = &mut self.live_gate_mut(source)?.fan_out;
        if fan_out.len() == fan_out.capacity() {
            let extra = fan_out.capacity().max(1);
            fan_out.try_reserve_exact(extra)?;
        }
        fan_out.push(target);

        assert_invariant(
            SLOT_COUNT_FIXED,
            self.slot_count(target)? == slots_before,
            "Binding must not change the slot count",
            Some("connect_gate"),
        );
        // A pair left uneven by an earlier failed append stays uneven.
        if balanced_before {
            assert_invariant(
                FAN_OUT_BALANCED,
                self.bindings_balanced(source, target),
                "Fan-out entries must match bound slots",
                Some("connect_gate"),
            );
        } else {
            debug!("connect_gate: fan-out of {} out of step with {}", source, target);
        }
        debug!("connect_gate({} -> {}[{}])", source, target, slot);
        Ok(())
    }

    /// Bind `target`'s slot to read a caller-owned signal.
    pub fn connect_signal(&mut self, signal: &'s Cell<bool>, target: GateId, slot: usize) -> Result<(), GraphError> {
        let previous = self.input(target, slot)?;
        if let Slot::Gate(former) = previous {
            self.unlink(former, target);
        }
        self.live_gate_mut(target)?.inputs[slot] = Slot::Signal(signal);
        debug!("connect_signal(-> {}[{}])", target, slot);
        Ok(())
    }

    /// Reset `target`'s slot to empty.
    pub fn disconnect(&mut self, target: GateId, slot: usize) -> Result<(), GraphError> {
        let former = self.input(target, slot)?.as_gate();
        let balanced_before = former.is_some_and(|f| self.bindings_balanced(f, target));
        self.live_gate_mut(target)?.inputs[slot] = Slot::Empty;

        if let Some(former) = former {
            self.unlink(former, target);
            if balanced_before {
                assert_invariant(
                    FAN_OUT_BALANCED,
                    self.bindings_balanced(former, target),
                    "Fan-out entries must match bound slots",
                    Some("disconnect"),
                );
            }
        }
        debug!("disconnect({}[{}])", target, slot);
        Ok(())
    }

    /// Number of slots reading from `id`, counting each binding.
    pub fn fan_out(&self, id: GateId) -> Result<usize, GraphError> {
        Ok(self.live_gate(id)?.fan_out.len())
    }

    /// What `id`'s slot is bound to.
    pub fn input(&self, id: GateId, slot: usize) -> Result<Slot<'s>, GraphError> {
        let gate = self.live_gate(id)?;
        gate.inputs.get(slot).copied().ok_or(GraphError::SlotOutOfRange {
            gate: id,
            slot,
            count: gate.inputs.len(),
        })
    }

    /// The `index`-th gate reading from `id`, in binding order.
    pub fn consumer(&self, id: GateId, index: usize) -> Result<GateId, GraphError> {
        let gate = self.live_gate(id)?;
        gate.fan_out.get(index).copied().ok_or(GraphError::ConsumerOutOfRange {
            gate: id,
            index,
            count: gate.fan_out.len(),
        })
    }

    /// Number of input slots of `id`.
    pub fn slot_count(&self, id: GateId) -> Result<usize, GraphError> {
        Ok(self.live_gate(id)?.inputs.len())
    }

    /// Whether `id` names a live gate.
    pub fn contains(&self, id: GateId) -> bool {
        self.gate(id).is_some()
    }

    /// Number of live gates.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether there are no live gates.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// One past the highest id ever assigned.
    pub fn id_bound(&self) -> usize {
        self.gates.len()
    }

    /// Live gate ids in creation order.
    pub fn gates(&self) -> impl Iterator<Item = GateId> + '_ {
        self.gates.iter().flatten().map(|g| g.id)
    }

    pub(crate) fn gate(&self, id: GateId) -> Option<&GateData<'s>> {
        self.gates.get(id.0).and_then(Option::as_ref)
    }

    fn gate_data_mut(&mut self, id: GateId) -> Option<&mut GateData<'s>> {
        self.gates.get_mut(id.0).and_then(Option::as_mut)
    }

    fn live_gate(&self, id: GateId) -> Result<&GateData<'s>, GraphError> {
        self.gate(id).ok_or(GraphError::InvalidGate(id))
    }

    fn live_gate_mut(&mut self, id: GateId) -> Result<&mut GateData<'s>, GraphError> {
        self.gate_data_mut(id).ok_or(GraphError::InvalidGate(id))
    }

    /// Drop one fan-out entry `consumer` from `source`, keeping order.
    fn unlink(&mut self, source: GateId, consumer: GateId) {
        let Some(gate) = self.gate_data_mut(source) else {
            debug!("unlink: {} already removed", source);
            return;
        };
        match gate.fan_out.iter().position(|&c| c == consumer) {
            Some(pos) => {
                gate.fan_out.remove(pos);
            }
            // Only reachable after a fan-out append failed.
            None => warn!("unlink: {} is not in the fan-out of {}", consumer, source),
        }
    }

    fn bindings_balanced(&self, source: GateId, consumer: GateId) -> bool {
        let (Some(src), Some(dst)) = (self.gate(source), self.gate(consumer)) else {
            return false;
        };
        let entries = src.fan_out.iter().filter(|&&c| c == consumer).count();
        let bound = dst.inputs.iter().filter(|s| **s == Slot::Gate(source)).count();
        entries == bound
    }
}
