//! Construction of the runtime chip tree from descriptions.

use rand::Rng;
use thiserror::Error;

use crate::chip::{ChipKey, ChipKind, CircuitTree, PinDir};
use crate::desc::{ChipDescription, Library, SubChipDescription};

/// Failures raised while constructing a circuit. Edit-time races are not
/// errors; these are genuine description defects.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A sub-chip references a name the library does not contain.
    #[error("chip not found in library: {0:?}")]
    ChipNotFound(String),

    /// Two pins of one chip share an id.
    #[error("duplicate pin id {pin} in chip {chip:?}")]
    DuplicatePinId { chip: String, pin: i32 },

    /// Supplied persistent data does not match the kind's exact length;
    /// truncation and padding are both rejected.
    #[error("internal data for {chip:?} must be {expected} words, got {got}")]
    InternalDataLength { chip: String, expected: usize, got: usize },
}

/// Builds the runtime tree for a root description.
pub fn build(desc: &ChipDescription, library: &Library) -> Result<CircuitTree, BuildError> {
    let mut tree = CircuitTree::new();
    instantiate(&mut tree, None, desc, None, library)?;
    log::debug!(
        "built circuit {:?}: {} chips, {} pins",
        desc.name,
        tree.chips.len(),
        tree.pins.len()
    );
    Ok(tree)
}

/// Instantiates one sub-chip into a host chip's scope, resolving its type
/// name against the library. Used by the edit pipeline.
pub fn instantiate_sub(
    tree: &mut CircuitTree,
    host: ChipKey,
    sub: &SubChipDescription,
    library: &Library,
) -> Result<ChipKey, BuildError> {
    let desc = library
        .get(&sub.chip_name)
        .ok_or_else(|| BuildError::ChipNotFound(sub.chip_name.clone()))?;
    instantiate(tree, Some(host), desc, Some(sub), library)
}

fn instantiate(
    tree: &mut CircuitTree,
    parent: Option<ChipKey>,
    desc: &ChipDescription,
    sub: Option<&SubChipDescription>,
    library: &Library,
) -> Result<ChipKey, BuildError> {
    let memory = initial_memory(desc, sub)?;
    let key = tree.insert_chip(
        parent,
        sub.map_or(0, |s| s.id),
        desc.name.clone(),
        sub.and_then(|s| s.label.clone()),
        desc.kind,
        memory,
    );

    for (pins, dir) in [(&desc.input_pins, PinDir::Input), (&desc.output_pins, PinDir::Output)] {
        for pin in pins {
            if tree.add_pin(key, pin, dir).is_none() {
                return Err(BuildError::DuplicatePinId { chip: desc.name.clone(), pin: pin.id });
            }
        }
    }

    for child in &desc.sub_chips {
        let child_desc = library
            .get(&child.chip_name)
            .ok_or_else(|| BuildError::ChipNotFound(child.chip_name.clone()))?;
        instantiate(tree, Some(key), child_desc, Some(child), library)?;
    }

    // Wires come last, once every pin in scope exists. Addresses that still
    // fail to resolve are skipped: the referenced chip may have been edited
    // after this description was written.
    for wire in &desc.wires {
        tree.add_wire(key, *wire);
    }

    Ok(key)
}

/// Allocates internal memory by kind. Absent persistent data defaults to
/// zeroed memory; supplied data must match the kind's length exactly.
fn initial_memory(
    desc: &ChipDescription,
    sub: Option<&SubChipDescription>,
) -> Result<Vec<u32>, BuildError> {
    let mut memory = vec![0u32; desc.kind.memory_len()];
    if desc.kind == ChipKind::DevRam8 {
        // All cells start random; the trailing clock latch stays clear.
        let cells = memory.len() - 1;
        let mut rng = rand::thread_rng();
        for cell in &mut memory[..cells] {
            *cell = rng.gen();
        }
    }

    let data = sub.and_then(|s| s.internal_data.as_deref());
    if let (Some(expected), Some(data)) = (desc.kind.persistent_data_len(), data) {
        if data.len() != expected {
            return Err(BuildError::InternalDataLength {
                chip: desc.name.clone(),
                expected,
                got: data.len(),
            });
        }
        memory[..expected].copy_from_slice(data);
    }
    Ok(memory)
}
