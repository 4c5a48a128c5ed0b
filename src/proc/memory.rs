use crate::pinstate::PinState;
use crate::proc::{rising_edge, PortSpec, ProcCtx, Processor};

/// A 256-word, 16-bit read-only memory. Contents come verbatim from the
/// description's persistent data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rom256x16;

impl Processor for Rom256x16 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("addr", 8),
            PortSpec::output("hi8", 8),
            PortSpec::output("lo8", 8),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let addr = usize::from(ctx.inputs[0].bit_states() & 0xFF);
        let word = ctx.memory[addr];
        ctx.outputs[0] = PinState::from_value((word >> 8 & 0xFF) as u16);
        ctx.outputs[1] = PinState::from_value((word & 0xFF) as u16);
    }
}

/// A 256-cell 8-bit development RAM with synchronous write and reset.
///
/// Memory layout: 256 cells plus the clock-edge latch. Cells are randomized
/// at construction. On each clock rising edge a high reset clears every
/// cell, otherwise a high write-enable stores the data input at the
/// addressed cell; the addressed cell is always driven on the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevRam8;

impl Processor for DevRam8 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("addr", 8),
            PortSpec::input("data", 8),
            PortSpec::input("write-en", 1),
            PortSpec::input("reset", 1),
            PortSpec::input("clock", 1),
            PortSpec::output("out", 8),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let addr = usize::from(ctx.inputs[0].bit_states() & 0xFF);
        if rising_edge(ctx.memory, ctx.inputs[4].first_bit_high()) {
            if ctx.inputs[3].first_bit_high() {
                ctx.memory[..256].fill(0);
            } else if ctx.inputs[2].first_bit_high() {
                ctx.memory[addr] = u32::from(ctx.inputs[1].bit_states() & 0xFF);
            }
        }
        ctx.outputs[0] = PinState::from_value((ctx.memory[addr] & 0xFF) as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::kind::DEV_RAM_MEMORY_LEN;
    use crate::proc::{run_proc, ProcessorFn};

    #[test]
    fn test_rom_splits_word_into_bytes() {
        let proc = ProcessorFn::from(Rom256x16);
        let mut mem = vec![0u32; 256];
        mem[0x42] = 0xBEEF;
        let inputs = [PinState::from_value(0x42)];
        let mut outputs = [PinState::floating(8); 2];
        run_proc(&proc, &inputs, &mut outputs, &mut mem, 0);
        assert_eq!(outputs[0].bit_states(), 0xBE, "hi8 carries the upper byte");
        assert_eq!(outputs[1].bit_states(), 0xEF, "lo8 carries the lower byte");
    }

    #[test]
    fn test_rom_floating_address_bits_read_as_zero() {
        let proc = ProcessorFn::from(Rom256x16);
        let mut mem = vec![0u32; 256];
        mem[0] = 0x1234;
        let inputs = [PinState::floating(8)];
        let mut outputs = [PinState::floating(8); 2];
        run_proc(&proc, &inputs, &mut outputs, &mut mem, 0);
        assert_eq!(outputs[1].bit_states(), 0x34, "A floating address reads address 0");
    }

    fn ram_step(
        proc: &ProcessorFn,
        mem: &mut [u32],
        addr: u16,
        data: u16,
        write: bool,
        reset: bool,
        clock: bool,
    ) -> u16 {
        let inputs = [
            PinState::from_value(addr),
            PinState::from_value(data),
            PinState::from_bool(write),
            PinState::from_bool(reset),
            PinState::from_bool(clock),
        ];
        let mut outputs = [PinState::floating(8)];
        run_proc(proc, &inputs, &mut outputs, mem, 0);
        outputs[0].bit_states()
    }

    #[test]
    fn test_ram_write_then_read() {
        let proc = ProcessorFn::from(DevRam8);
        let mut mem = vec![0u32; DEV_RAM_MEMORY_LEN];

        // Rising edge with write-en stores.
        ram_step(&proc, &mut mem, 0x42, 0xA5, true, false, true);
        // Falling edge, then a read on the next rising edge.
        ram_step(&proc, &mut mem, 0x42, 0x00, false, false, false);
        let out = ram_step(&proc, &mut mem, 0x42, 0x00, false, false, true);
        assert_eq!(out, 0xA5, "Stored byte must read back at the same address");
    }

    #[test]
    fn test_ram_held_clock_writes_once() {
        let proc = ProcessorFn::from(DevRam8);
        let mut mem = vec![0u32; DEV_RAM_MEMORY_LEN];
        ram_step(&proc, &mut mem, 0x01, 0x11, true, false, true);
        // Clock stays high with different data: no second write.
        ram_step(&proc, &mut mem, 0x01, 0x22, true, false, true);
        assert_eq!(mem[0x01], 0x11, "A held clock is not a rising edge");
    }

    #[test]
    fn test_ram_reset_clears_all_cells() {
        let proc = ProcessorFn::from(DevRam8);
        let mut mem = vec![0xFFu32; DEV_RAM_MEMORY_LEN];
        mem[DEV_RAM_MEMORY_LEN - 1] = 0;
        let out = ram_step(&proc, &mut mem, 0x10, 0x00, false, true, true);
        assert_eq!(out, 0, "Reset clears the addressed cell too");
        assert!(mem[..256].iter().all(|&w| w == 0), "Reset clears every cell");
    }

    #[test]
    fn test_ram_reset_wins_over_write() {
        let proc = ProcessorFn::from(DevRam8);
        let mut mem = vec![0u32; DEV_RAM_MEMORY_LEN];
        let out = ram_step(&proc, &mut mem, 0x05, 0x99, true, true, true);
        assert_eq!(out, 0, "Reset takes precedence over write-enable");
    }
}
