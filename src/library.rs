//! The built-in chip library.
//!
//! Every primitive kind is published as a [`ChipDescription`] whose pin
//! layout comes straight from its evaluator's port list, so descriptions
//! refer to primitives by name exactly like they refer to custom chips.

use crate::chip::{ChipKind, PinDir};
use crate::desc::{ChipDescription, Library, PinDescription};
use crate::proc::{Processor, ProcessorFn};

/// Built-in name → kind table. Lookups are case-insensitive.
pub const BUILTINS: &[(&str, ChipKind)] = &[
    ("NAND", ChipKind::Nand),
    ("TRI-STATE BUFFER", ChipKind::TriStateBuffer),
    ("CLOCK", ChipKind::Clock),
    ("PULSE", ChipKind::Pulse),
    ("KEY", ChipKind::Key),
    ("BUS-1", ChipKind::Bus1),
    ("BUS-4", ChipKind::Bus4),
    ("BUS-8", ChipKind::Bus8),
    ("BUS-TERMINUS-1", ChipKind::BusTerminus1),
    ("BUS-TERMINUS-4", ChipKind::BusTerminus4),
    ("BUS-TERMINUS-8", ChipKind::BusTerminus8),
    ("SPLIT-4TO1", ChipKind::Split4To1),
    ("SPLIT-8TO4", ChipKind::Split8To4),
    ("SPLIT-8TO1", ChipKind::Split8To1),
    ("MERGE-1TO4", ChipKind::Merge1To4),
    ("MERGE-1TO8", ChipKind::Merge1To8),
    ("MERGE-4TO8", ChipKind::Merge4To8),
    ("ROM-256X16", ChipKind::Rom256x16),
    ("DEV-RAM-8", ChipKind::DevRam8),
    ("DISPLAY-RGB", ChipKind::DisplayRgb),
    ("DISPLAY-DOT", ChipKind::DisplayDot),
    ("7-SEGMENT", ChipKind::SevenSegment),
    ("LED", ChipKind::Led),
    ("BUZZER", ChipKind::Buzzer),
];

/// A library pre-populated with every built-in primitive.
pub fn builtin() -> Library {
    let mut lib = Library::new();
    for &(name, kind) in BUILTINS {
        lib.insert(primitive_description(name, kind));
    }
    lib
}

fn primitive_description(name: &str, kind: ChipKind) -> ChipDescription {
    let mut desc = ChipDescription::custom(name);
    desc.kind = kind;
    for (id, port) in ProcessorFn::for_kind(kind).ports().into_iter().enumerate() {
        let pin = PinDescription {
            id: id as i32,
            name: port.name.into(),
            bit_count: port.bits,
        };
        match port.dir {
            PinDir::Input => desc.input_pins.push(pin),
            PinDir::Output => desc.output_pins.push(pin),
        }
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_resolves() {
        let lib = builtin();
        for &(name, kind) in BUILTINS {
            let desc = lib.get(name).unwrap_or_else(|| panic!("{name} missing from library"));
            assert_eq!(desc.kind, kind);
        }
    }

    #[test]
    fn test_nand_layout() {
        let lib = builtin();
        let nand = lib.get("nand").unwrap();
        assert_eq!(nand.input_pins.len(), 2);
        assert_eq!(nand.output_pins.len(), 1);
        assert_eq!(nand.output_pins[0].id, 2, "Pin ids are sequential across inputs then outputs");
    }

    #[test]
    fn test_pin_ids_unique_within_each_builtin() {
        let lib = builtin();
        for desc in lib.iter() {
            let mut ids: Vec<_> = desc
                .input_pins
                .iter()
                .chain(desc.output_pins.iter())
                .map(|p| p.id)
                .collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(
                ids.len(),
                desc.input_pins.len() + desc.output_pins.len(),
                "{} has duplicate pin ids",
                desc.name
            );
        }
    }
}
