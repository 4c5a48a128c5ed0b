//! The simulation scheduler.
//!
//! A [`Simulator`] advances a whole circuit one frame at a time: drain
//! pending edits, reseed the random source, ingest external inputs, then
//! run one scheduling pass. Two interchangeable strategies drive the pass:
//!
//! - [`Strategy::Reorder`]: the iterative, stochastic scheduler. Sub-chips
//!   are processed ready-first with random cycle-breaking, the resulting
//!   order is kept between frames, and a dynamic shuffle every 100 frames
//!   varies race outcomes.
//! - [`Strategy::Topological`]: a deterministic Kahn ordering of the
//!   flattened primitive graph, recomputed only when the circuit changes.
//!
//! Both strategies agree on combinational steady states.

pub mod command;
mod reorder;
mod topo;


use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::build::{self, BuildError};
use crate::chip::{ChipKey, ChipKind, CircuitTree, PinKey, SignalCtx};
use crate::desc::{ChipDescription, Library, PinAddress};
use crate::pinstate::PinState;
use crate::proc::{NoteSink, ProcCtx, Processor, ProcessorFn};
use crate::rng::FrameRng;

pub use command::{EditCommand, Modifier};

/// Frames between dynamic-reorder shuffles under the reorder strategy.
pub const DYNAMIC_REORDER_PERIOD: u64 = 100;

/// The scheduling strategy driving each frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Strategy {
    #[default]
    Reorder,
    Topological,
}

/// Boot-time simulator configuration.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub strategy: Strategy,
    /// Fixed PRNG seed; skips per-frame reseeding for reproducible runs.
    pub deterministic_seed: Option<u64>,
    /// Frames per clock transition; 0 disables the clock primitive.
    pub steps_per_clock: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { strategy: Strategy::Reorder, deterministic_seed: None, steps_per_clock: 1 }
    }
}

/// A player-facing input handle: an address into the root chip plus the
/// desired packed state, updated from any thread and read by the worker at
/// ingestion. A `u32` store cannot tear, so readers see a state at most one
/// frame old.
#[derive(Debug)]
pub struct InputSource {
    address: PinAddress,
    state: AtomicU32,
}

impl InputSource {
    pub fn new(address: PinAddress) -> Arc<Self> {
        Arc::new(Self { address, state: AtomicU32::new(PinState::LOW.raw()) })
    }

    pub fn address(&self) -> PinAddress {
        self.address
    }

    pub fn set(&self, state: PinState) {
        self.state.store(state.raw(), Ordering::Relaxed);
    }

    pub fn get(&self) -> PinState {
        PinState::from_raw(self.state.load(Ordering::Relaxed))
    }
}

/// The simulation context: circuit tree, frame counter, PRNG, collaborator
/// handles and the command queue, all owned by one worker.
pub struct Simulator {
    tree: CircuitTree,
    library: Library,
    strategy: Strategy,
    frame: u64,
    rng: FrameRng,
    steps_per_clock: u32,
    inputs: Vec<Arc<InputSource>>,
    held_shared: Arc<RwLock<HashSet<char>>>,
    held_snapshot: HashSet<char>,
    notes: Option<Arc<dyn NoteSink + Send + Sync>>,
    commands: Receiver<EditCommand>,
    modifier: Modifier,
    needs_order_pass: bool,
    topo_order: Option<Vec<ChipKey>>,
}

impl Simulator {
    /// Builds the runtime tree for `desc` and wraps it in a fresh context.
    pub fn new(desc: &ChipDescription, library: Library, config: SimConfig) -> Result<Self, BuildError> {
        let tree = build::build(desc, &library)?;
        let (modifier, commands) = command::queue();
        let rng = match config.deterministic_seed {
            Some(seed) => FrameRng::seeded(seed),
            None => FrameRng::from_entropy(),
        };
        Ok(Self {
            tree,
            library,
            strategy: config.strategy,
            frame: 0,
            rng,
            steps_per_clock: config.steps_per_clock,
            inputs: Vec::new(),
            held_shared: Arc::new(RwLock::new(HashSet::new())),
            held_snapshot: HashSet::new(),
            notes: None,
            commands,
            modifier,
            needs_order_pass: true,
            topo_order: None,
        })
    }

    /// The submission handle for structural edits.
    pub fn modifier(&self) -> Modifier {
        self.modifier.clone()
    }

    /// Registers an external input driving a root pin each frame.
    pub fn add_input(&mut self, address: PinAddress) -> Arc<InputSource> {
        let source = InputSource::new(address);
        self.inputs.push(source.clone());
        source
    }

    /// The shared held-key set read by Key primitives.
    pub fn held_keys(&self) -> Arc<RwLock<HashSet<char>>> {
        self.held_shared.clone()
    }

    pub fn set_note_sink(&mut self, sink: Arc<dyn NoteSink + Send + Sync>) {
        self.notes = Some(sink);
    }

    pub fn set_steps_per_clock(&mut self, steps: u32) {
        self.steps_per_clock = steps;
    }

    pub fn steps_per_clock(&self) -> u32 {
        self.steps_per_clock
    }

    /// Index of the next frame to simulate.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tree(&self) -> &CircuitTree {
        &self.tree
    }

    /// The packed state of a pin addressed in the root chip's scope, or
    /// `None` if the address no longer resolves.
    pub fn pin_state(&self, address: PinAddress) -> Option<PinState> {
        let key = self.tree.find_pin(self.tree.root(), address)?;
        Some(self.tree.pin(key)?.state)
    }

    /// The internal memory of the chip reached by following sub-chip ids
    /// from the root, or `None` if the path no longer resolves.
    pub fn chip_memory(&self, path: &[i32]) -> Option<&[u32]> {
        let mut key = self.tree.root();
        for &id in path {
            key = self
                .tree
                .chip(key)?
                .children()
                .iter()
                .copied()
                .find(|&k| self.tree.chip(k).is_some_and(|c| c.id == id))?;
        }
        Some(&self.tree.chip(key)?.memory)
    }

    /// Advances the whole circuit by one frame.
    pub fn advance_frame(&mut self) {
        self.drain_commands();
        self.rng.reseed();
        self.held_snapshot = self.held_shared.read().clone();
        self.ingest_inputs();

        match self.strategy {
            Strategy::Reorder => reorder::run_frame(self),
            Strategy::Topological => topo::run_frame(self),
        }
        self.frame += 1;
    }

    /// Runs `advance_frame` until `frames` have elapsed.
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.advance_frame();
        }
    }

    fn drain_commands(&mut self) {
        let mut applied = 0usize;
        while let Ok(cmd) = self.commands.try_recv() {
            self.apply(cmd);
            applied += 1;
        }
        if applied > 0 {
            log::debug!("applied {applied} edit commands; invalidating schedule order");
            self.needs_order_pass = true;
            self.topo_order = None;
        }
    }

    fn apply(&mut self, command: EditCommand) {
        match command {
            EditCommand::AddPin { chip, pin, dir } => {
                self.tree.add_pin(chip, &pin, dir);
            }
            EditCommand::RemovePin { chip, pin_id } => self.tree.remove_pin(chip, pin_id),
            EditCommand::AddSubChip { chip, sub } => {
                if !self.tree.chips.contains_key(chip) {
                    return;
                }
                if let Err(err) = build::instantiate_sub(&mut self.tree, chip, &sub, &self.library) {
                    log::warn!("dropping sub-chip edit: {err}");
                }
            }
            EditCommand::RemoveSubChip { chip, id } => self.tree.remove_subchip(chip, id),
            EditCommand::AddWire { chip, wire } => self.tree.add_wire(chip, wire),
            EditCommand::RemoveWire { chip, wire } => self.tree.remove_wire(chip, wire),
        }
    }

    fn ingest_inputs(&mut self) {
        let root = self.tree.root();
        let mut ctx = SignalCtx {
            frame: self.frame,
            rng: &mut self.rng,
            relay_through_custom: false,
        };
        for source in &self.inputs {
            // Lookup failures are edit races and are swallowed.
            if let Some(key) = self.tree.find_pin(root, source.address()) {
                self.tree.write_pin(key, source.get(), &mut ctx);
            }
        }
    }

    fn pass(&mut self, relay: bool) -> FramePass<'_> {
        let notes: Option<&dyn NoteSink> = match &self.notes {
            Some(sink) => Some(sink.as_ref()),
            None => None,
        };
        FramePass {
            tree: &mut self.tree,
            rng: &mut self.rng,
            frame: self.frame,
            steps_per_clock: self.steps_per_clock,
            held_keys: &self.held_snapshot,
            notes,
            relay,
        }
    }
}

/// Borrowed view of the simulator used by one scheduling pass.
pub(crate) struct FramePass<'a> {
    pub(crate) tree: &'a mut CircuitTree,
    pub(crate) rng: &'a mut FrameRng,
    frame: u64,
    steps_per_clock: u32,
    held_keys: &'a HashSet<char>,
    notes: Option<&'a dyn NoteSink>,
    relay: bool,
}

impl FramePass<'_> {
    pub(crate) fn propagate_inputs(&mut self, chip: ChipKey) {
        let mut ctx = SignalCtx {
            frame: self.frame,
            rng: &mut *self.rng,
            relay_through_custom: self.relay,
        };
        self.tree.propagate_inputs(chip, &mut ctx);
    }

    pub(crate) fn propagate_outputs(&mut self, chip: ChipKey) {
        let mut ctx = SignalCtx {
            frame: self.frame,
            rng: &mut *self.rng,
            relay_through_custom: self.relay,
        };
        self.tree.propagate_outputs(chip, &mut ctx);
    }

    /// Runs the registered evaluator for a primitive chip, storing its
    /// outputs without propagating them.
    pub(crate) fn evaluate(&mut self, chip: ChipKey) {
        let c = &self.tree.chips[chip];
        let kind = c.kind;
        let inputs: SmallVec<[PinState; 8]> = c
            .inputs
            .iter()
            .map(|&k| self.tree.pins[k].state)
            .collect();
        let out_keys: SmallVec<[PinKey; 8]> = SmallVec::from_slice(&c.outputs);
        let mut outputs: SmallVec<[PinState; 8]> = out_keys
            .iter()
            .map(|&k| self.tree.pins[k].state)
            .collect();

        let mut memory = std::mem::take(&mut self.tree.chips[chip].memory);
        ProcessorFn::for_kind(kind).process(&mut ProcCtx {
            inputs: &inputs,
            outputs: &mut outputs,
            memory: &mut memory,
            frame: self.frame,
            steps_per_clock: self.steps_per_clock,
            held_keys: self.held_keys,
            notes: self.notes,
        });
        self.tree.chips[chip].memory = memory;

        for (key, state) in out_keys.into_iter().zip(outputs) {
            self.tree.store_pin_state(key, state);
        }
    }

    /// One full step of a primitive chip.
    pub(crate) fn step_primitive(&mut self, chip: ChipKey) {
        self.propagate_inputs(chip);
        self.evaluate(chip);
        self.propagate_outputs(chip);
    }

    pub(crate) fn kind(&self, chip: ChipKey) -> ChipKind {
        self.tree.chips[chip].kind
    }
}
