//! Chip type tags.

use serde::{Deserialize, Serialize};

/// Words of internal memory held by each display (256 front + 256 back + 1
/// clock latch).
pub const DISPLAY_MEMORY_LEN: usize = 513;
/// Words of internal memory held by the dev RAM (256 cells + 1 clock latch).
pub const DEV_RAM_MEMORY_LEN: usize = 257;
/// Words of a ROM image.
pub const ROM_MEMORY_LEN: usize = 256;
/// Pulse memory layout: duration, ticks remaining, previous-input latch.
pub const PULSE_MEMORY_LEN: usize = 3;

/// The type tag of a runtime chip.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChipKind {
    Nand,
    TriStateBuffer,
    Clock,
    Pulse,
    Key,
    Bus1,
    Bus4,
    Bus8,
    BusTerminus1,
    BusTerminus4,
    BusTerminus8,
    Split4To1,
    Split8To4,
    Split8To1,
    Merge1To4,
    Merge1To8,
    Merge4To8,
    Rom256x16,
    DevRam8,
    DisplayRgb,
    DisplayDot,
    SevenSegment,
    Led,
    Buzzer,
    /// User-defined composite; behavior comes from its sub-chip graph.
    Custom,
}

impl ChipKind {
    pub fn is_custom(self) -> bool {
        matches!(self, ChipKind::Custom)
    }

    /// Bus origins are skipped by the scheduler's random cycle-breaking and
    /// by the dynamic-reorder swap.
    pub fn is_bus_origin(self) -> bool {
        matches!(self, ChipKind::Bus1 | ChipKind::Bus4 | ChipKind::Bus8)
    }

    /// Words of internal memory a chip of this kind owns.
    pub fn memory_len(self) -> usize {
        match self {
            ChipKind::DisplayRgb | ChipKind::DisplayDot => DISPLAY_MEMORY_LEN,
            ChipKind::DevRam8 => DEV_RAM_MEMORY_LEN,
            ChipKind::Rom256x16 => ROM_MEMORY_LEN,
            ChipKind::Pulse => PULSE_MEMORY_LEN,
            ChipKind::Key => 1,
            _ => 0,
        }
    }

    /// Length of the persistent data a description must supply for this
    /// kind, if any. Lengths must match exactly; the builder rejects
    /// truncation or padding.
    pub fn persistent_data_len(self) -> Option<usize> {
        match self {
            ChipKind::Rom256x16 => Some(ROM_MEMORY_LEN),
            ChipKind::Pulse => Some(1),
            ChipKind::Key => Some(1),
            _ => None,
        }
    }
}
