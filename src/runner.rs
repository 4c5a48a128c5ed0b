//! Standalone simulation worker.
//!
//! [`SimRunner`] owns the thread that performs all pin writes, primitive
//! evaluations and edit applications. Other threads talk to it through the
//! [`Modifier`] queue, the shared [`SimControls`] block, and the
//! frame-boundary [`OutputSnapshot`] it publishes after every frame.
//! Shutdown is cooperative: the flag is checked between frames only.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::chip::{ChipKey, ChipKind, CircuitTree};
use crate::pinstate::PinState;
use crate::sim::{Modifier, Simulator};

/// Shared control block between the worker and its drivers.
pub struct SimControls {
    held: Arc<RwLock<HashSet<char>>>,
    steps_per_clock: AtomicU32,
    shutdown: AtomicBool,
    frame: AtomicU64,
}

impl SimControls {
    /// Marks a key as held for the Key primitives.
    pub fn press(&self, key: char) {
        self.held.write().insert(key);
    }

    pub fn release(&self, key: char) {
        self.held.write().remove(&key);
    }

    pub fn set_steps_per_clock(&self, steps: u32) {
        self.steps_per_clock.store(steps, Ordering::Relaxed);
    }

    /// Index of the last completed frame.
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Frame-boundary view of the circuit published for renderers and audio.
/// Coherent as a whole; at most one frame old.
#[derive(Clone, Debug, Default)]
pub struct OutputSnapshot {
    pub frame: u64,
    /// Root output pin id → packed state.
    pub outputs: Vec<(i32, PinState)>,
    /// Internal memories of every chip that owns one.
    pub memories: Vec<MemorySnapshot>,
}

/// One chip's internal memory, located by sub-chip ids from the root.
#[derive(Clone, Debug)]
pub struct MemorySnapshot {
    pub path: Vec<i32>,
    pub kind: ChipKind,
    pub words: Vec<u32>,
}

/// Owns the simulation worker thread.
pub struct SimRunner {
    worker: Option<JoinHandle<Simulator>>,
    controls: Arc<SimControls>,
    snapshot: Arc<Mutex<OutputSnapshot>>,
    modifier: Modifier,
}

impl SimRunner {
    /// Spawns the worker, driving frames back to back (or paced by
    /// `pace` between frames).
    pub fn spawn(mut sim: Simulator, pace: Option<Duration>) -> Self {
        let controls = Arc::new(SimControls {
            held: sim.held_keys(),
            steps_per_clock: AtomicU32::new(sim.steps_per_clock()),
            shutdown: AtomicBool::new(false),
            frame: AtomicU64::new(0),
        });
        let snapshot = Arc::new(Mutex::new(OutputSnapshot::default()));
        let modifier = sim.modifier();

        let worker_controls = controls.clone();
        let worker_snapshot = snapshot.clone();
        let worker = thread::Builder::new()
            .name("chipsim-worker".into())
            .spawn(move || {
                log::info!("simulation worker started");
                while !worker_controls.shutdown.load(Ordering::Relaxed) {
                    sim.set_steps_per_clock(worker_controls.steps_per_clock.load(Ordering::Relaxed));
                    sim.advance_frame();
                    *worker_snapshot.lock() = snapshot_of(&sim);
                    worker_controls.frame.store(sim.frame(), Ordering::Relaxed);
                    if let Some(pace) = pace {
                        thread::sleep(pace);
                    }
                }
                log::info!("simulation worker stopped at frame {}", sim.frame());
                sim
            })
            .expect("failed to spawn simulation worker");

        Self { worker: Some(worker), controls, snapshot, modifier }
    }

    pub fn controls(&self) -> Arc<SimControls> {
        self.controls.clone()
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier.clone()
    }

    /// The most recent frame-boundary snapshot.
    pub fn snapshot(&self) -> OutputSnapshot {
        self.snapshot.lock().clone()
    }

    /// Stops the worker between frames and returns the simulator.
    pub fn stop(mut self) -> Simulator {
        self.controls.request_shutdown();
        let worker = self.worker.take().expect("worker already joined");
        worker.join().expect("simulation worker panicked")
    }
}

impl Drop for SimRunner {
    fn drop(&mut self) {
        self.controls.request_shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn snapshot_of(sim: &Simulator) -> OutputSnapshot {
    let tree = sim.tree();
    let root = tree.root();
    let outputs = tree
        .chip(root)
        .map(|c| {
            c.outputs()
                .iter()
                .filter_map(|&k| tree.pin(k).map(|p| (p.id, p.state)))
                .collect()
        })
        .unwrap_or_default();

    let mut memories = Vec::new();
    collect_memories(tree, root, &mut Vec::new(), &mut memories);
    OutputSnapshot { frame: sim.frame(), outputs, memories }
}

fn collect_memories(
    tree: &CircuitTree,
    key: ChipKey,
    path: &mut Vec<i32>,
    out: &mut Vec<MemorySnapshot>,
) {
    let Some(chip) = tree.chip(key) else { return };
    if !chip.memory.is_empty() {
        out.push(MemorySnapshot { path: path.clone(), kind: chip.kind, words: chip.memory.clone() });
    }
    for &child in chip.children() {
        let Some(c) = tree.chip(child) else { continue };
        path.push(c.id);
        collect_memories(tree, child, path, out);
        path.pop();
    }
}
