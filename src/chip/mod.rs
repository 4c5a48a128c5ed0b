//! The runtime chip tree.
//!
//! This module notably includes:
//! - [`Chip`]: one runtime instance in the circuit tree
//! - [`Pin`]: a signal carrier owned by a chip
//! - [`CircuitTree`]: the arena owning every chip and pin
//!
//! The tree is two structures in one: a strict ownership hierarchy
//! (parent → sub-chip → pins) and a possibly-cyclic fan-out graph over pins
//! whose edges are non-owning [`PinKey`]s. Keys are generational, so a
//! reference to a removed pin simply stops resolving.

pub mod kind;
pub mod pin;

use std::collections::HashSet;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

pub use kind::ChipKind;
pub use pin::{Pin, PinDir, SourceTrace};

use crate::desc::{PinAddress, PinDescription, WireDescription, HOST_CHIP};
use crate::pinstate::PinState;
use crate::rng::FrameRng;

new_key_type! {
    /// Key type for chips in the tree.
    pub struct ChipKey;
    /// Key type for pins in the tree.
    pub struct PinKey;
}

/// Per-frame context threaded through signal propagation.
pub struct SignalCtx<'a> {
    /// Index of the frame being simulated.
    pub frame: u64,
    /// Random source for multi-driver conflict resolution.
    pub rng: &'a mut FrameRng,
    /// When set, a Custom-owned pin forwards to its fan-out as soon as it
    /// has received all its sources this frame. The topological scheduler
    /// relies on this; the reorder scheduler forwards at step time instead.
    pub relay_through_custom: bool,
}

/// One runtime instance in the circuit tree.
#[derive(Debug)]
pub struct Chip {
    /// Id unique among siblings.
    pub id: i32,
    /// Type name from the description.
    pub name: String,
    /// Optional instance label from the description.
    pub label: Option<String>,
    pub kind: ChipKind,
    pub(crate) parent: Option<ChipKey>,
    pub(crate) inputs: Vec<PinKey>,
    pub(crate) outputs: Vec<PinKey>,
    /// Sub-chips in scheduling order; the reorder strategy permutes this.
    pub(crate) children: Vec<ChipKey>,
    /// Internal memory, sized by [`ChipKind::memory_len`].
    pub memory: Vec<u32>,
    /// Input pins with at least one upstream source.
    pub(crate) connected_inputs: u32,
    /// Connected inputs that finished receiving this frame; cleared when
    /// the chip's outputs propagate.
    pub(crate) ready_inputs: u32,
}

impl Chip {
    /// True iff every connected input has received all its declared sources
    /// this frame. Chips without connected inputs are always ready.
    pub fn is_ready(&self) -> bool {
        self.ready_inputs >= self.connected_inputs
    }

    pub fn inputs(&self) -> &[PinKey] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PinKey] {
        &self.outputs
    }

    pub fn children(&self) -> &[ChipKey] {
        &self.children
    }

    pub fn connected_inputs(&self) -> u32 {
        self.connected_inputs
    }

    /// The enclosing chip, or `None` for the root.
    pub fn parent(&self) -> Option<ChipKey> {
        self.parent
    }
}

/// The arena owning every chip and pin of one circuit.
#[derive(Default, Debug)]
pub struct CircuitTree {
    pub(crate) chips: SlotMap<ChipKey, Chip>,
    pub(crate) pins: SlotMap<PinKey, Pin>,
    root: ChipKey,
}

impl CircuitTree {
    pub fn new() -> Self {
        Default::default()
    }

    /// The root chip of the circuit.
    pub fn root(&self) -> ChipKey {
        self.root
    }

    pub(crate) fn set_root(&mut self, key: ChipKey) {
        self.root = key;
    }

    pub fn chip(&self, key: ChipKey) -> Option<&Chip> {
        self.chips.get(key)
    }

    pub fn chip_mut(&mut self, key: ChipKey) -> Option<&mut Chip> {
        self.chips.get_mut(key)
    }

    pub fn pin(&self, key: PinKey) -> Option<&Pin> {
        self.pins.get(key)
    }

    /// Inserts a chip, registering it with its parent (or as the root).
    pub(crate) fn insert_chip(
        &mut self,
        parent: Option<ChipKey>,
        id: i32,
        name: String,
        label: Option<String>,
        kind: ChipKind,
        memory: Vec<u32>,
    ) -> ChipKey {
        let key = self.chips.insert(Chip {
            id,
            name,
            label,
            kind,
            parent,
            inputs: Vec::new(),
            outputs: Vec::new(),
            children: Vec::new(),
            memory,
            connected_inputs: 0,
            ready_inputs: 0,
        });
        match parent {
            Some(p) => self.chips[p].children.push(key),
            None => self.root = key,
        }
        key
    }

    // ---- addressing ------------------------------------------------------

    /// Resolves a pin address against a host chip's scope: owner id
    /// [`HOST_CHIP`] names the host's own pins, any other id names the
    /// matching sub-chip's pins.
    pub fn find_pin(&self, host: ChipKey, addr: PinAddress) -> Option<PinKey> {
        let host_chip = self.chips.get(host)?;
        let scope = match addr.chip {
            HOST_CHIP => host_chip,
            id => {
                let child = host_chip
                    .children
                    .iter()
                    .copied()
                    .find(|&k| self.chips.get(k).is_some_and(|c| c.id == id))?;
                &self.chips[child]
            }
        };
        scope
            .inputs
            .iter()
            .chain(scope.outputs.iter())
            .copied()
            .find(|&k| self.pins.get(k).is_some_and(|p| p.id == addr.pin))
    }

    // ---- signal flow -----------------------------------------------------

    /// Assigns a packed state to a pin. Output pins whose value actually
    /// changed propagate immediately; input pins never do (reception is
    /// driven by their upstream sources).
    pub fn write_pin(&mut self, key: PinKey, state: PinState, ctx: &mut SignalCtx<'_>) {
        let Some(p) = self.pins.get_mut(key) else { return };
        let changed = p.state != state;
        p.state = state;
        if changed && p.dir == PinDir::Output {
            self.propagate_pin(key, ctx);
        }
    }

    /// Stores an evaluator result without propagating; the scheduler calls
    /// [`CircuitTree::propagate_outputs`] exactly once per step.
    pub(crate) fn store_pin_state(&mut self, key: PinKey, state: PinState) {
        if let Some(p) = self.pins.get_mut(key) {
            p.state = state;
        }
    }

    /// Delivers this pin's state to every fan-out target.
    pub fn propagate_pin(&mut self, key: PinKey, ctx: &mut SignalCtx<'_>) {
        let Some(p) = self.pins.get(key) else { return };
        let targets: SmallVec<[PinKey; 4]> = p.targets.clone();
        for target in targets {
            self.receive(target, key, ctx);
        }
    }

    /// Reception contract for a pin being driven by `source` this frame.
    fn receive(&mut self, target: PinKey, source: PinKey, ctx: &mut SignalCtx<'_>) {
        let Some(src) = self.pins.get(source) else { return };
        let incoming = src.state;
        let trace = SourceTrace {
            chip_id: self.chips.get(src.owner).map_or(HOST_CHIP, |c| c.id),
            pin_id: src.id,
        };

        let Some(p) = self.pins.get_mut(target) else { return };
        if p.last_frame != ctx.frame {
            p.received = 0;
            p.last_frame = ctx.frame;
        }

        let old = p.state;
        p.state = match p.received {
            0 => incoming,
            // The OR/AND coin is per pin per conflict, shared by all bits.
            _ => old.resolve(incoming, ctx.rng.coin()),
        };
        p.received += 1;
        debug_assert!(
            p.source_count == 0 || p.received <= p.source_count,
            "pin {} received {} of {} declared sources",
            p.id,
            p.received,
            p.source_count
        );

        if p.state != old {
            p.last_source = Some(trace);
        }

        let completed = p.received == p.source_count && p.dir == PinDir::Input;
        let owner = p.owner;
        if completed {
            if let Some(chip) = self.chips.get_mut(owner) {
                chip.ready_inputs += 1;
            }
        }

        let relay = ctx.relay_through_custom
            && self.chips.get(owner).is_some_and(|c| c.kind.is_custom());
        if relay && self.pins[target].received == self.pins[target].source_count {
            self.propagate_pin(target, ctx);
        }
    }

    /// Propagates every input pin of a chip (drives the internal network).
    pub fn propagate_inputs(&mut self, chip: ChipKey, ctx: &mut SignalCtx<'_>) {
        let Some(c) = self.chips.get(chip) else { return };
        let inputs = c.inputs.clone();
        for key in inputs {
            self.propagate_pin(key, ctx);
        }
    }

    /// Propagates every output pin of a chip and clears its ready counter.
    pub fn propagate_outputs(&mut self, chip: ChipKey, ctx: &mut SignalCtx<'_>) {
        let Some(c) = self.chips.get(chip) else { return };
        let outputs = c.outputs.clone();
        for key in outputs {
            self.propagate_pin(key, ctx);
        }
        if let Some(c) = self.chips.get_mut(chip) {
            c.ready_inputs = 0;
        }
    }

    // ---- edits -----------------------------------------------------------

    /// Adds a pin to a chip. Duplicate pin ids within the chip are dropped.
    pub fn add_pin(&mut self, chip: ChipKey, desc: &PinDescription, dir: PinDir) -> Option<PinKey> {
        if !self.chips.contains_key(chip) || self.pin_id_in_use(chip, desc.id) {
            return None;
        }
        let key = self
            .pins
            .insert(Pin::new(desc.id, desc.name.clone(), dir, desc.bit_count, chip));
        match dir {
            PinDir::Input => self.chips[chip].inputs.push(key),
            PinDir::Output => self.chips[chip].outputs.push(key),
        }
        Some(key)
    }

    pub(crate) fn pin_id_in_use(&self, chip: ChipKey, id: i32) -> bool {
        let Some(c) = self.chips.get(chip) else { return false };
        c.inputs
            .iter()
            .chain(c.outputs.iter())
            .any(|&k| self.pins.get(k).is_some_and(|p| p.id == id))
    }

    /// Removes a pin by id, fixing up connection counts and scrubbing the
    /// removed key from every fan-out list. Unknown ids are silently
    /// dropped (edit race).
    pub fn remove_pin(&mut self, chip: ChipKey, pin_id: i32) {
        let Some(c) = self.chips.get(chip) else { return };
        let Some(key) = c
            .inputs
            .iter()
            .chain(c.outputs.iter())
            .copied()
            .find(|&k| self.pins.get(k).is_some_and(|p| p.id == pin_id))
        else {
            return;
        };

        self.detach_pin(key);
        let c = &mut self.chips[chip];
        c.inputs.retain(|&k| k != key);
        c.outputs.retain(|&k| k != key);
        self.pins.remove(key);
        self.scrub_fanout(&HashSet::from([key]));
    }

    /// Removes a sub-chip by id, cascading over its whole subtree.
    pub fn remove_subchip(&mut self, host: ChipKey, id: i32) {
        let Some(h) = self.chips.get(host) else { return };
        let Some(child) = h
            .children
            .iter()
            .copied()
            .find(|&k| self.chips.get(k).is_some_and(|c| c.id == id))
        else {
            return;
        };

        let mut doomed_chips = vec![child];
        let mut doomed_pins = Vec::new();
        let mut i = 0;
        while i < doomed_chips.len() {
            let c = &self.chips[doomed_chips[i]];
            doomed_pins.extend(c.inputs.iter().chain(c.outputs.iter()).copied());
            doomed_chips.extend(c.children.iter().copied());
            i += 1;
        }
        let removed: HashSet<PinKey> = doomed_pins.iter().copied().collect();

        // Release surviving targets of doomed pins before anything is freed.
        for &p in &doomed_pins {
            let targets = self.pins[p].targets.clone();
            for t in targets {
                if !removed.contains(&t) {
                    self.release_target(t);
                }
            }
        }

        for p in doomed_pins {
            self.pins.remove(p);
        }
        for c in doomed_chips {
            self.chips.remove(c);
        }
        self.chips[host].children.retain(|&k| k != child);
        self.scrub_fanout(&removed);
    }

    /// Installs a wire in a host chip's scope. Missing pins are silently
    /// skipped (the referenced chip may have been edited).
    pub fn add_wire(&mut self, host: ChipKey, wire: WireDescription) {
        let (Some(src), Some(dst)) = (
            self.find_pin(host, wire.source),
            self.find_pin(host, wire.target),
        ) else {
            return;
        };

        self.pins[src].targets.push(dst);
        let p = &mut self.pins[dst];
        p.source_count += 1;
        if p.source_count == 1 && p.dir == PinDir::Input && p.owner != host {
            let owner = p.owner;
            self.chips[owner].connected_inputs += 1;
        }
    }

    /// Removes one occurrence of a wire. Missing pins or wires are silently
    /// skipped.
    pub fn remove_wire(&mut self, host: ChipKey, wire: WireDescription) {
        let (Some(src), Some(dst)) = (
            self.find_pin(host, wire.source),
            self.find_pin(host, wire.target),
        ) else {
            return;
        };
        let p = &mut self.pins[src];
        let Some(pos) = p.targets.iter().position(|&t| t == dst) else { return };
        p.targets.remove(pos);
        self.release_target(dst);
    }

    /// Undoes one source's contribution to a target pin's counts.
    fn release_target(&mut self, target: PinKey) {
        let Some(p) = self.pins.get_mut(target) else { return };
        p.source_count = p.source_count.saturating_sub(1);
        if p.source_count == 0 && p.dir == PinDir::Input {
            let owner = p.owner;
            if let Some(c) = self.chips.get_mut(owner) {
                c.connected_inputs = c.connected_inputs.saturating_sub(1);
            }
        }
    }

    /// Fix-ups performed when a pin is about to be destroyed.
    fn detach_pin(&mut self, key: PinKey) {
        let p = &self.pins[key];
        let owner = p.owner;
        let was_connected_input = p.dir == PinDir::Input && p.source_count > 0;
        let targets = p.targets.clone();
        for t in targets {
            self.release_target(t);
        }
        if was_connected_input {
            if let Some(c) = self.chips.get_mut(owner) {
                c.connected_inputs = c.connected_inputs.saturating_sub(1);
            }
        }
    }

    /// Strips destroyed keys out of every fan-out list.
    fn scrub_fanout(&mut self, removed: &HashSet<PinKey>) {
        for (_, p) in self.pins.iter_mut() {
            p.targets.retain(|t| !removed.contains(t));
        }
    }

    /// Checks that no fan-out list references a destroyed pin.
    #[cfg(test)]
    pub(crate) fn fanout_is_clean(&self) -> bool {
        self.pins
            .iter()
            .all(|(_, p)| p.targets.iter().all(|&t| self.pins.contains_key(t)))
    }
}
