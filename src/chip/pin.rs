//! Pin entities.

use smallvec::SmallVec;

use crate::chip::{ChipKey, PinKey};
use crate::pinstate::PinState;

/// Direction of a pin relative to its owning chip.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PinDir {
    Input,
    Output,
}

/// Identifiers of the pin that most recently drove another pin, for
/// tracing and rendering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourceTrace {
    /// Id of the driving pin's owner chip.
    pub chip_id: i32,
    /// Id of the driving pin.
    pub pin_id: i32,
}

/// A signal carrier owned by one chip.
///
/// The fan-out list holds non-owning keys to downstream input pins (or the
/// owning scope's output pins); removal of a pin scrubs it from every
/// fan-out list it appears in.
#[derive(Debug)]
pub struct Pin {
    /// Id unique within the owning chip.
    pub id: i32,
    pub name: String,
    pub dir: PinDir,
    /// Signal width in bits.
    pub bits: u8,
    /// Owning chip (non-owning back-reference).
    pub owner: ChipKey,
    /// Current packed state.
    pub state: PinState,
    /// Downstream pins this pin drives.
    pub(crate) targets: SmallVec<[PinKey; 4]>,
    /// How many upstream sources drive this pin. 0 means always-ready.
    pub(crate) source_count: u32,
    /// Sources already received in the frame `last_frame`.
    pub(crate) received: u32,
    /// Frame index of the last reception.
    pub(crate) last_frame: u64,
    /// Most recent driver, for tracing.
    pub last_source: Option<SourceTrace>,
}

impl Pin {
    pub(crate) fn new(id: i32, name: String, dir: PinDir, bits: u8, owner: ChipKey) -> Self {
        Self {
            id,
            name,
            dir,
            bits,
            owner,
            state: PinState::floating(bits),
            targets: SmallVec::new(),
            source_count: 0,
            received: 0,
            last_frame: 0,
            last_source: None,
        }
    }

    /// Number of upstream sources driving this pin.
    pub fn source_count(&self) -> u32 {
        self.source_count
    }

    /// The pins this pin drives.
    pub fn targets(&self) -> &[PinKey] {
        &self.targets
    }
}
