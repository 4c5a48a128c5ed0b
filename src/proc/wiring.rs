use crate::pinstate::PinState;
use crate::proc::{PortSpec, ProcCtx, Processor};

/// A bus origin or terminus: a plain state copy at a wire junction.
///
/// Origins and termini share the evaluator; they differ only in how the
/// scheduler treats them (origins are exempt from random cycle-breaking).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bus {
    bits: u8,
    terminus: bool,
}

impl Bus {
    pub fn origin(bits: u8) -> Self {
        Self { bits, terminus: false }
    }

    pub fn terminus(bits: u8) -> Self {
        Self { bits, terminus: true }
    }
}

impl Processor for Bus {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in", self.bits), PortSpec::output("out", self.bits)]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = ctx.inputs[0];
    }
}

/// Extracts one bit of a packed state, carrying both planes.
fn take_bit(state: PinState, bit: u8) -> PinState {
    let value = state.raw() >> bit & 1;
    let flag = state.raw() >> (16 + u32::from(bit)) & 1;
    PinState::from_raw(value | flag << 16)
}

/// Splits a 4-bit signal into four 1-bit outputs, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split4To1;

impl Processor for Split4To1 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("in", 4),
            PortSpec::output("out0", 1),
            PortSpec::output("out1", 1),
            PortSpec::output("out2", 1),
            PortSpec::output("out3", 1),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        for i in 0..4u8 {
            ctx.outputs[usize::from(i)] = take_bit(ctx.inputs[0], 3 - i);
        }
    }
}

/// Splits an 8-bit signal into its upper and lower nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split8To4;

impl Processor for Split8To4 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("in", 8),
            PortSpec::output("hi4", 4),
            PortSpec::output("lo4", 4),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = ctx.outputs[0].nibble_from_byte(ctx.inputs[0], true);
        ctx.outputs[1] = ctx.outputs[1].nibble_from_byte(ctx.inputs[0], false);
    }
}

/// Splits an 8-bit signal into eight 1-bit outputs, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split8To1;

impl Processor for Split8To1 {
    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![PortSpec::input("in", 8)];
        ports.extend([
            PortSpec::output("out0", 1),
            PortSpec::output("out1", 1),
            PortSpec::output("out2", 1),
            PortSpec::output("out3", 1),
            PortSpec::output("out4", 1),
            PortSpec::output("out5", 1),
            PortSpec::output("out6", 1),
            PortSpec::output("out7", 1),
        ]);
        ports
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        for i in 0..8u8 {
            ctx.outputs[usize::from(i)] = take_bit(ctx.inputs[0], 7 - i);
        }
    }
}

/// Packs 1-bit inputs into one output; the last input index is the LSB.
fn merge_bits(inputs: &[PinState]) -> PinState {
    let n = inputs.len();
    let mut value = 0u32;
    let mut flags = 0u32;
    for i in 0..n {
        let s = inputs[n - 1 - i];
        value |= (s.raw() & 1) << i;
        flags |= (s.raw() >> 16 & 1) << i;
    }
    PinState::from_raw(value | flags << 16)
}

/// Merges four 1-bit inputs into a 4-bit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge1To4;

impl Processor for Merge1To4 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("in0", 1),
            PortSpec::input("in1", 1),
            PortSpec::input("in2", 1),
            PortSpec::input("in3", 1),
            PortSpec::output("out", 4),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = merge_bits(ctx.inputs);
    }
}

/// Merges eight 1-bit inputs into an 8-bit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge1To8;

impl Processor for Merge1To8 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("in0", 1),
            PortSpec::input("in1", 1),
            PortSpec::input("in2", 1),
            PortSpec::input("in3", 1),
            PortSpec::input("in4", 1),
            PortSpec::input("in5", 1),
            PortSpec::input("in6", 1),
            PortSpec::input("in7", 1),
            PortSpec::output("out", 8),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = merge_bits(ctx.inputs);
    }
}

/// Pairs two 4-bit signals into an 8-bit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge4To8;

impl Processor for Merge4To8 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("hi4", 4),
            PortSpec::input("lo4", 4),
            PortSpec::output("out", 8),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        ctx.outputs[0] = PinState::byte_from_nibbles(ctx.inputs[1], ctx.inputs[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::{run_proc, ProcessorFn};

    #[test]
    fn test_bus_copies_state() {
        let proc = ProcessorFn::from(Bus::origin(8));
        let inputs = [PinState::from_raw(0x00F0_00A5)];
        let mut outputs = [PinState::floating(8)];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert_eq!(outputs[0], inputs[0], "Bus must copy both planes verbatim");
    }

    #[test]
    fn test_split4_orders_msb_first() {
        let proc = ProcessorFn::from(Split4To1);
        let inputs = [PinState::from_value(0b1010)];
        let mut outputs = [PinState::floating(1); 4];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        let bits: Vec<_> = outputs.iter().map(|s| s.first_bit_high()).collect();
        assert_eq!(bits, vec![true, false, true, false], "out0 carries bit 3");
    }

    #[test]
    fn test_split8_to_1_orders_msb_first() {
        let proc = ProcessorFn::from(Split8To1);
        let inputs = [PinState::from_value(0b1000_0001)];
        let mut outputs = [PinState::floating(1); 8];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert!(outputs[0].first_bit_high(), "out0 carries bit 7");
        assert!(outputs[7].first_bit_high(), "out7 carries bit 0");
        assert!(outputs[1..7].iter().all(|s| !s.first_bit_high()));
    }

    #[test]
    fn test_merge4_last_input_is_lsb() {
        let proc = ProcessorFn::from(Merge1To4);
        let inputs = [PinState::HIGH, PinState::LOW, PinState::LOW, PinState::HIGH];
        let mut outputs = [PinState::floating(4)];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert_eq!(outputs[0].bit_states(), 0b1001, "in3 is the LSB, in0 the MSB");
    }

    #[test]
    fn test_merge_carries_tristate_flags() {
        let proc = ProcessorFn::from(Merge1To4);
        let inputs = [PinState::LOW, PinState::floating(1), PinState::LOW, PinState::LOW];
        let mut outputs = [PinState::floating(4)];
        run_proc(&proc, &inputs, &mut outputs, &mut [], 0);
        assert_eq!(outputs[0].tristate_flags(), 0b0100, "in1's float flag lands on bit 2");
    }

    #[test]
    fn test_split_then_merge_round_trip() {
        let byte = PinState::from_raw(0x0081_00C3);
        let split = ProcessorFn::from(Split8To4);
        let mut halves = [PinState::floating(4); 2];
        run_proc(&split, &[byte], &mut halves, &mut [], 0);

        let merge = ProcessorFn::from(Merge4To8);
        let mut joined = [PinState::floating(8)];
        run_proc(&merge, &halves, &mut joined, &mut [], 0);
        assert_eq!(joined[0], byte, "Nibble split then merge must round-trip both planes");
    }
}
