//! Boot-time description records.
//!
//! A circuit arrives as a [`ChipDescription`] graph plus a name-keyed
//! [`Library`] used to resolve sub-chip types during the recursive build.
//! Descriptions are plain data; the runtime tree is produced from them by
//! [`crate::build`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::chip::ChipKind;

/// Owner id denoting the host chip itself in a [`PinAddress`].
pub const HOST_CHIP: i32 = -1;

/// Identifies a pin within one chip's scope: the owning sub-chip's id, or
/// [`HOST_CHIP`] for the host's own pins, plus the pin id.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PinAddress {
    /// Id of the sub-chip owning the pin, or [`HOST_CHIP`].
    pub chip: i32,
    /// Id of the pin within its owner.
    pub pin: i32,
}

impl PinAddress {
    pub fn new(chip: i32, pin: i32) -> Self {
        Self { chip, pin }
    }

    /// Address of a pin on the host chip itself.
    pub fn host(pin: i32) -> Self {
        Self { chip: HOST_CHIP, pin }
    }
}

/// One pin of a described chip.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PinDescription {
    pub id: i32,
    pub name: String,
    /// Signal width; 1, 4 or 8.
    pub bit_count: u8,
}

/// One sub-chip instance of a described chip.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubChipDescription {
    /// Type name, resolved against the library (case-insensitively).
    pub chip_name: String,
    /// Id unique among the host's sub-chips.
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Persistent internal data (ROM contents, pulse duration, key char).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_data: Option<Vec<u32>>,
}

/// A directed connection between two pins in the host chip's scope.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireDescription {
    pub source: PinAddress,
    pub target: PinAddress,
}

/// A complete chip type: interface pins, sub-chip instances and the wires
/// between them.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChipDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChipKind,
    #[serde(default)]
    pub input_pins: Vec<PinDescription>,
    #[serde(default)]
    pub output_pins: Vec<PinDescription>,
    #[serde(default)]
    pub sub_chips: Vec<SubChipDescription>,
    #[serde(default)]
    pub wires: Vec<WireDescription>,
}

impl ChipDescription {
    /// An empty custom chip description with the given name.
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChipKind::Custom,
            input_pins: Vec::new(),
            output_pins: Vec::new(),
            sub_chips: Vec::new(),
            wires: Vec::new(),
        }
    }
}

/// Name→description mapping used to resolve sub-chip types.
///
/// Names are compared case-insensitively; entries keep insertion order.
#[derive(Default, Clone, Debug)]
pub struct Library {
    entries: IndexMap<String, ChipDescription>,
}

impl Library {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a description, replacing any entry with the same name.
    pub fn insert(&mut self, desc: ChipDescription) {
        self.entries.insert(desc.name.to_lowercase(), desc);
    }

    pub fn get(&self, name: &str) -> Option<&ChipDescription> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChipDescription> {
        self.entries.values()
    }
}
