use crate::pinstate::PinState;
use crate::proc::{PortSpec, ProcCtx, Processor};

/// The NAND gate, the sole logic primitive every other gate is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nand;

impl Processor for Nand {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("in0", 1),
            PortSpec::input("in1", 1),
            PortSpec::output("out0", 1),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let a = ctx.inputs[0].first_bit_high();
        let b = ctx.inputs[1].first_bit_high();
        ctx.outputs[0] = PinState::from_bool(!(a && b));
    }
}

/// A 1-bit tri-state buffer: passes data through while enabled, floats its
/// output otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriStateBuffer;

impl Processor for TriStateBuffer {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("data", 1),
            PortSpec::input("enable", 1),
            PortSpec::output("out", 1),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = match ctx.inputs[1].first_bit_high() {
            true => ctx.inputs[0],
            false => ctx.outputs[0].set_all_disconnected(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::{run_proc, ProcessorFn};

    #[test]
    fn test_nand_truth_table() {
        let proc = ProcessorFn::from(Nand);
        for (a, b, expected) in [
            (false, false, true),
            (false, true, true),
            (true, false, true),
            (true, true, false),
        ] {
            let inputs = [PinState::from_bool(a), PinState::from_bool(b)];
            let mut outputs = [PinState::floating(1)];
            run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
            assert_eq!(
                outputs[0],
                PinState::from_bool(expected),
                "NAND({a}, {b}) should be {expected}"
            );
        }
    }

    #[test]
    fn test_nand_treats_floating_input_as_low() {
        let proc = ProcessorFn::from(Nand);
        let inputs = [PinState::floating(1), PinState::HIGH];
        let mut outputs = [PinState::floating(1)];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert!(outputs[0].first_bit_high(), "A floating input is not driven high");
    }

    #[test]
    fn test_tristate_buffer_enabled_passes_data() {
        let proc = ProcessorFn::from(TriStateBuffer);
        let inputs = [PinState::HIGH, PinState::HIGH];
        let mut outputs = [PinState::LOW];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert_eq!(outputs[0], PinState::HIGH);
    }

    #[test]
    fn test_tristate_buffer_disabled_floats() {
        let proc = ProcessorFn::from(TriStateBuffer);
        let inputs = [PinState::HIGH, PinState::LOW];
        let mut outputs = [PinState::HIGH];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert_ne!(outputs[0].tristate_flags(), 0, "Disabled buffer must float its output");
        assert!(!outputs[0].first_bit_high());
    }
}
