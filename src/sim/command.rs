//! The thread-safe modification pipeline.
//!
//! Any thread may submit edit commands through a [`Modifier`]; the
//! simulation worker drains them at the next frame boundary and applies
//! them in enqueue order. Commands referencing chips or pins that no longer
//! exist are silently dropped (edit race).

use crossbeam_channel::{Receiver, Sender};

use crate::chip::{ChipKey, PinDir};
use crate::desc::{PinDescription, SubChipDescription, WireDescription};

/// One structural edit to a chip in the tree.
#[derive(Debug, Clone)]
pub enum EditCommand {
    AddPin { chip: ChipKey, pin: PinDescription, dir: PinDir },
    RemovePin { chip: ChipKey, pin_id: i32 },
    AddSubChip { chip: ChipKey, sub: SubChipDescription },
    RemoveSubChip { chip: ChipKey, id: i32 },
    AddWire { chip: ChipKey, wire: WireDescription },
    RemoveWire { chip: ChipKey, wire: WireDescription },
}

/// A cloneable submission handle to one simulator's command queue.
#[derive(Debug, Clone)]
pub struct Modifier {
    tx: Sender<EditCommand>,
}

impl Modifier {
    /// Enqueues a command; it becomes visible by the next frame. Submitting
    /// after the simulator is gone is a no-op.
    pub fn submit(&self, command: EditCommand) {
        let _ = self.tx.send(command);
    }

    pub fn add_pin(&self, chip: ChipKey, pin: PinDescription, dir: PinDir) {
        self.submit(EditCommand::AddPin { chip, pin, dir });
    }

    pub fn remove_pin(&self, chip: ChipKey, pin_id: i32) {
        self.submit(EditCommand::RemovePin { chip, pin_id });
    }

    pub fn add_sub_chip(&self, chip: ChipKey, sub: SubChipDescription) {
        self.submit(EditCommand::AddSubChip { chip, sub });
    }

    pub fn remove_sub_chip(&self, chip: ChipKey, id: i32) {
        self.submit(EditCommand::RemoveSubChip { chip, id });
    }

    pub fn add_wire(&self, chip: ChipKey, wire: WireDescription) {
        self.submit(EditCommand::AddWire { chip, wire });
    }

    pub fn remove_wire(&self, chip: ChipKey, wire: WireDescription) {
        self.submit(EditCommand::RemoveWire { chip, wire });
    }
}

/// Builds the queue pair: a handle for producers, a receiver drained by the
/// simulation worker.
pub(crate) fn queue() -> (Modifier, Receiver<EditCommand>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Modifier { tx }, rx)
}
