//! Primitive chip evaluators.
//!
//! One stateless evaluator per primitive [`ChipKind`], each consuming input
//! pin states (and, where the kind owns one, internal memory) and writing
//! output pin states. Evaluators are deterministic: the scheduler's random
//! source is never consumed here.
//!
//! This module notably consists of:
//! - **[`Processor`]**: the interface every primitive evaluator implements.
//! - **[`ProcessorFn`]**: the dispatch enum covering every non-Custom kind.
//! - **[`PortSpec`]**: the fixed pin layout of a primitive kind.

use std::collections::HashSet;

use enum_dispatch::enum_dispatch;

use crate::chip::{ChipKind, PinDir};
use crate::pinstate::PinState;

pub use gates::*;
pub use io::*;
pub use memory::*;
pub use sources::*;
pub use wiring::*;

mod gates;
mod io;
mod memory;
mod sources;
mod wiring;

/// The fixed layout of one pin of a primitive kind.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PortSpec {
    pub name: &'static str,
    pub dir: PinDir,
    pub bits: u8,
}

impl PortSpec {
    pub fn input(name: &'static str, bits: u8) -> Self {
        Self { name, dir: PinDir::Input, bits }
    }

    pub fn output(name: &'static str, bits: u8) -> Self {
        Self { name, dir: PinDir::Output, bits }
    }
}

/// Collaborator audio API invoked by the buzzer.
pub trait NoteSink {
    fn register_note(&self, freq_index: u16, volume_index: u16);
}

/// Everything an evaluator may touch during one step.
pub struct ProcCtx<'a> {
    /// Current input pin states, in port order.
    pub inputs: &'a [PinState],
    /// Output pin states, in port order; pre-filled with the current
    /// states, mutated in place.
    pub outputs: &'a mut [PinState],
    /// The chip's internal memory (empty for memoryless kinds).
    pub memory: &'a mut [u32],
    /// Index of the frame being simulated.
    pub frame: u64,
    /// Frames per clock transition; 0 disables the clock.
    pub steps_per_clock: u32,
    /// Keys currently held on the keyboard collaborator.
    pub held_keys: &'a HashSet<char>,
    /// Audio collaborator, when one is attached.
    pub notes: Option<&'a dyn NoteSink>,
}

/// The interface defining how a primitive evaluator operates.
#[enum_dispatch]
pub trait Processor {
    /// The fixed pin layout of this kind.
    ///
    /// Called during construction; the result never changes.
    fn ports(&self) -> Vec<PortSpec>;

    /// Applies the evaluator to the context's inputs and memory, storing
    /// results into the context's outputs.
    fn process(&self, ctx: &mut ProcCtx<'_>);
}

/// An enum that represents every primitive evaluator.
#[enum_dispatch(Processor)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ProcessorFn {
    // Gates
    Nand,
    TriStateBuffer,
    // Wiring
    Bus,
    Split4To1,
    Split8To4,
    Split8To1,
    Merge1To4,
    Merge1To8,
    Merge4To8,
    // Sources
    Clock,
    Pulse,
    Key,
    // Memory
    Rom256x16,
    DevRam8,
    // I/O
    DisplayRgb,
    DisplayDot,
    SevenSegment,
    Led,
    Buzzer,
}

impl ProcessorFn {
    /// The evaluator registered for a primitive kind.
    ///
    /// Routing a Custom chip here is a programmer error: composites have no
    /// evaluator and are walked by the scheduler instead.
    pub fn for_kind(kind: ChipKind) -> ProcessorFn {
        match kind {
            ChipKind::Nand => Nand.into(),
            ChipKind::TriStateBuffer => TriStateBuffer.into(),
            ChipKind::Bus1 => Bus::origin(1).into(),
            ChipKind::Bus4 => Bus::origin(4).into(),
            ChipKind::Bus8 => Bus::origin(8).into(),
            ChipKind::BusTerminus1 => Bus::terminus(1).into(),
            ChipKind::BusTerminus4 => Bus::terminus(4).into(),
            ChipKind::BusTerminus8 => Bus::terminus(8).into(),
            ChipKind::Split4To1 => Split4To1.into(),
            ChipKind::Split8To4 => Split8To4.into(),
            ChipKind::Split8To1 => Split8To1.into(),
            ChipKind::Merge1To4 => Merge1To4.into(),
            ChipKind::Merge1To8 => Merge1To8.into(),
            ChipKind::Merge4To8 => Merge4To8.into(),
            ChipKind::Clock => Clock.into(),
            ChipKind::Pulse => Pulse.into(),
            ChipKind::Key => Key.into(),
            ChipKind::Rom256x16 => Rom256x16.into(),
            ChipKind::DevRam8 => DevRam8.into(),
            ChipKind::DisplayRgb => DisplayRgb.into(),
            ChipKind::DisplayDot => DisplayDot.into(),
            ChipKind::SevenSegment => SevenSegment.into(),
            ChipKind::Led => Led.into(),
            ChipKind::Buzzer => Buzzer.into(),
            ChipKind::Custom => panic!("custom chips have no evaluator"),
        }
    }
}

/// Clock-edge detection for clocked primitives.
///
/// The last word of the chip's internal memory is a 1-bit latch holding the
/// previous frame's clock level; it is updated unconditionally on every
/// evaluation.
pub(crate) fn rising_edge(memory: &mut [u32], clock_high: bool) -> bool {
    let latch = memory.len() - 1;
    let rising = clock_high && memory[latch] == 0;
    memory[latch] = u32::from(clock_high);
    rising
}

/// Test helper running an evaluator over explicit inputs.
#[cfg(test)]
pub(crate) fn run_proc(
    proc: &ProcessorFn,
    inputs: &[PinState],
    outputs: &mut [PinState],
    memory: &mut [u32],
    frame: u64,
) {
    let held = HashSet::new();
    proc.process(&mut ProcCtx {
        inputs,
        outputs,
        memory,
        frame,
        steps_per_clock: 1,
        held_keys: &held,
        notes: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_primitive_kind_has_an_evaluator() {
        let kinds = [
            ChipKind::Nand,
            ChipKind::TriStateBuffer,
            ChipKind::Clock,
            ChipKind::Pulse,
            ChipKind::Key,
            ChipKind::Bus1,
            ChipKind::Bus4,
            ChipKind::Bus8,
            ChipKind::BusTerminus1,
            ChipKind::BusTerminus4,
            ChipKind::BusTerminus8,
            ChipKind::Split4To1,
            ChipKind::Split8To4,
            ChipKind::Split8To1,
            ChipKind::Merge1To4,
            ChipKind::Merge1To8,
            ChipKind::Merge4To8,
            ChipKind::Rom256x16,
            ChipKind::DevRam8,
            ChipKind::DisplayRgb,
            ChipKind::DisplayDot,
            ChipKind::SevenSegment,
            ChipKind::Led,
            ChipKind::Buzzer,
        ];
        for kind in kinds {
            let proc = ProcessorFn::for_kind(kind);
            let ports = proc.ports();
            assert!(
                ports.iter().all(|p| matches!(p.bits, 1 | 4 | 8)),
                "{kind:?} port widths must be 1, 4 or 8"
            );
        }
    }

    #[test]
    #[should_panic(expected = "no evaluator")]
    fn test_custom_has_no_evaluator() {
        let _ = ProcessorFn::for_kind(ChipKind::Custom);
    }

    #[test]
    fn test_rising_edge_latch() {
        let mut mem = [0u32; 3];
        assert!(rising_edge(&mut mem, true), "0 -> 1 is a rising edge");
        assert!(!rising_edge(&mut mem, true), "Held high is not an edge");
        assert!(!rising_edge(&mut mem, false), "Falling edge is not rising");
        assert!(rising_edge(&mut mem, true), "Rises again after a low frame");
    }
}
