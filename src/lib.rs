//! Frame-based simulation kernel for hierarchical digital logic circuits.
//!
//! Circuits are trees of chips: primitives with native evaluators (NAND,
//! tri-state buffer, clock, pulse, key, buses, splitters and mergers, ROM,
//! dev RAM, displays, buzzer) and user-defined Custom composites whose
//! behavior is their sub-chip graph. Signals are packed tri-state states
//! ([`PinState`]): 16 value bits plus 16 disconnected flags, with
//! stochastic resolution when several drivers share one pin.
//!
//! ## This crate notably consists of:
//! - **[`pinstate`]**: the packed tri-state signal codec.
//! - **[`chip`]**: the runtime tree of chips and pins over slotmap arenas.
//! - **[`proc`]**: one deterministic evaluator per primitive kind.
//! - **[`desc`] and [`build`]**: boot-time descriptions and the recursive
//!   builder that turns them into a runtime tree.
//! - **[`sim`]**: the frame scheduler with its two strategies (reorder and
//!   topological), the edit command queue and the per-frame PRNG.
//! - **[`runner`]**: a standalone worker thread wrapping a [`Simulator`].
//!
//! ```
//! use chipsim::{library, ChipDescription, PinAddress, PinDescription};
//! use chipsim::{PinState, SimConfig, Simulator, SubChipDescription, WireDescription};
//!
//! // A root chip holding a single NAND whose inputs are tied together.
//! let mut root = ChipDescription::custom("main");
//! root.input_pins.push(PinDescription { id: 0, name: "in".into(), bit_count: 1 });
//! root.output_pins.push(PinDescription { id: 1, name: "out".into(), bit_count: 1 });
//! root.sub_chips.push(SubChipDescription {
//!     chip_name: "NAND".into(),
//!     id: 0,
//!     label: None,
//!     internal_data: None,
//! });
//! root.wires.extend([
//!     WireDescription { source: PinAddress::host(0), target: PinAddress::new(0, 0) },
//!     WireDescription { source: PinAddress::host(0), target: PinAddress::new(0, 1) },
//!     WireDescription { source: PinAddress::new(0, 2), target: PinAddress::host(1) },
//! ]);
//!
//! let mut sim = Simulator::new(&root, library::builtin(), SimConfig::default()).unwrap();
//! let input = sim.add_input(PinAddress::host(0));
//! input.set(PinState::HIGH);
//! sim.run(4);
//! assert!(!sim.pin_state(PinAddress::host(1)).unwrap().first_bit_high());
//! ```

pub mod build;
pub mod chip;
pub mod desc;
pub mod library;
pub mod pinstate;
pub mod proc;
pub mod rng;
pub mod runner;
pub mod sim;

pub use build::{build, BuildError};
pub use chip::{Chip, ChipKey, ChipKind, CircuitTree, Pin, PinDir, PinKey};
pub use desc::{
    ChipDescription, Library, PinAddress, PinDescription, SubChipDescription, WireDescription,
};
pub use pinstate::{BitState, PinState};
pub use proc::NoteSink;
pub use rng::FrameRng;
pub use runner::{OutputSnapshot, SimControls, SimRunner};
pub use sim::{EditCommand, InputSource, Modifier, SimConfig, Simulator, Strategy};
