use crate::pinstate::PinState;
use crate::proc::{rising_edge, PortSpec, ProcCtx, Processor};

const PIXELS: usize = 256;
const BACK: usize = PIXELS;

/// Double-buffered display plumbing shared by the RGB and dot displays.
///
/// Memory layout: 256 front-buffer words, 256 back-buffer words, clock
/// latch. On a clock rising edge a high reset clears the back buffer,
/// otherwise a high write stores `pixel` at the addressed back-buffer word;
/// a high refresh on the same edge copies the back buffer to the front.
fn display_edge(ctx: &mut ProcCtx<'_>, addr: usize, pixel: u32, reset: bool, write: bool, refresh: bool, clock: bool) {
    if rising_edge(ctx.memory, clock) {
        if reset {
            ctx.memory[BACK..BACK + PIXELS].fill(0);
        } else if write {
            ctx.memory[BACK + addr] = pixel;
        }
        if refresh {
            ctx.memory.copy_within(BACK..BACK + PIXELS, 0);
        }
    }
}

/// A 16×16 RGB display with 4-bit channels and back-buffer semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRgb;

impl Processor for DisplayRgb {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("addr", 8),
            PortSpec::input("r", 4),
            PortSpec::input("g", 4),
            PortSpec::input("b", 4),
            PortSpec::input("reset", 1),
            PortSpec::input("write", 1),
            PortSpec::input("refresh", 1),
            PortSpec::input("clock", 1),
            PortSpec::output("r-out", 4),
            PortSpec::output("g-out", 4),
            PortSpec::output("b-out", 4),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let addr = usize::from(ctx.inputs[0].bit_states() & 0xFF);
        let pixel = u32::from(ctx.inputs[1].bit_states() & 0xF)
            | u32::from(ctx.inputs[2].bit_states() & 0xF) << 4
            | u32::from(ctx.inputs[3].bit_states() & 0xF) << 8;
        let (reset, write, refresh, clock) = (
            ctx.inputs[4].first_bit_high(),
            ctx.inputs[5].first_bit_high(),
            ctx.inputs[6].first_bit_high(),
            ctx.inputs[7].first_bit_high(),
        );
        display_edge(ctx, addr, pixel, reset, write, refresh, clock);

        let front = ctx.memory[addr];
        ctx.outputs[0] = PinState::from_value((front & 0xF) as u16);
        ctx.outputs[1] = PinState::from_value((front >> 4 & 0xF) as u16);
        ctx.outputs[2] = PinState::from_value((front >> 8 & 0xF) as u16);
    }
}

/// A 16×16 single-channel dot display with back-buffer semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayDot;

impl Processor for DisplayDot {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("addr", 8),
            PortSpec::input("pixel", 4),
            PortSpec::input("reset", 1),
            PortSpec::input("write", 1),
            PortSpec::input("refresh", 1),
            PortSpec::input("clock", 1),
            PortSpec::output("pixel-out", 4),
        ]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let addr = usize::from(ctx.inputs[0].bit_states() & 0xFF);
        let pixel = u32::from(ctx.inputs[1].bit_states() & 0xF);
        let (reset, write, refresh, clock) = (
            ctx.inputs[2].first_bit_high(),
            ctx.inputs[3].first_bit_high(),
            ctx.inputs[4].first_bit_high(),
            ctx.inputs[5].first_bit_high(),
        );
        display_edge(ctx, addr, pixel, reset, write, refresh, clock);
        ctx.outputs[0] = PinState::from_value((ctx.memory[addr] & 0xF) as u16);
    }
}

/// A seven-segment display (segments a-g plus the dot). Visual only: the
/// renderer reads the input pin states directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SevenSegment;

impl Processor for SevenSegment {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("a", 1),
            PortSpec::input("b", 1),
            PortSpec::input("c", 1),
            PortSpec::input("d", 1),
            PortSpec::input("e", 1),
            PortSpec::input("f", 1),
            PortSpec::input("g", 1),
            PortSpec::input("dot", 1),
        ]
    }

    fn process(&self, _ctx: &mut ProcCtx<'_>) {}
}

/// A single LED. Visual only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led;

impl Processor for Led {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in", 1)]
    }

    fn process(&self, _ctx: &mut ProcCtx<'_>) {}
}

/// Registers a note with the audio collaborator every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buzzer;

impl Processor for Buzzer {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("freq", 4), PortSpec::input("volume", 4)]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        if let Some(notes) = ctx.notes {
            notes.register_note(ctx.inputs[0].bit_states(), ctx.inputs[1].bit_states());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::*;
    use crate::chip::kind::DISPLAY_MEMORY_LEN;
    use crate::proc::{run_proc, NoteSink, Processor, ProcessorFn};

    fn rgb_step(mem: &mut [u32], addr: u16, rgb: (u16, u16, u16), ctl: (bool, bool, bool, bool)) -> (u16, u16, u16) {
        let proc = ProcessorFn::from(DisplayRgb);
        let inputs = [
            PinState::from_value(addr),
            PinState::from_value(rgb.0),
            PinState::from_value(rgb.1),
            PinState::from_value(rgb.2),
            PinState::from_bool(ctl.0),
            PinState::from_bool(ctl.1),
            PinState::from_bool(ctl.2),
            PinState::from_bool(ctl.3),
        ];
        let mut outputs = [PinState::floating(4); 3];
        run_proc(&proc, &inputs, &mut outputs, mem, 0);
        (outputs[0].bit_states(), outputs[1].bit_states(), outputs[2].bit_states())
    }

    #[test]
    fn test_rgb_write_is_invisible_until_refresh() {
        let mut mem = vec![0u32; DISPLAY_MEMORY_LEN];
        // Write pixel 7 on a rising edge, no refresh.
        rgb_step(&mut mem, 7, (0xA, 0xB, 0xC), (false, true, false, true));
        assert_eq!(mem[BACK + 7], 0xA | 0xB << 4 | 0xC << 8, "Write lands in the back buffer");
        assert_eq!(mem[7], 0, "Front buffer is untouched before refresh");

        // Falling edge, then refresh on the next rising edge.
        rgb_step(&mut mem, 7, (0, 0, 0), (false, false, false, false));
        let out = rgb_step(&mut mem, 7, (0, 0, 0), (false, false, true, true));
        assert_eq!(out, (0xA, 0xB, 0xC), "Refresh copies the back buffer to the front");
    }

    #[test]
    fn test_rgb_reset_clears_back_buffer() {
        let mut mem = vec![0u32; DISPLAY_MEMORY_LEN];
        for w in &mut mem[BACK..BACK + PIXELS] {
            *w = 0x123;
        }
        rgb_step(&mut mem, 0, (0, 0, 0), (true, false, false, true));
        assert!(mem[BACK..BACK + PIXELS].iter().all(|&w| w == 0));
    }

    #[test]
    fn test_dot_display_round_trip() {
        let proc = ProcessorFn::from(DisplayDot);
        let mut mem = vec![0u32; DISPLAY_MEMORY_LEN];
        let write = [
            PinState::from_value(3),
            PinState::from_value(0x9),
            PinState::LOW,
            PinState::HIGH,
            PinState::HIGH,
            PinState::HIGH,
        ];
        let mut outputs = [PinState::floating(4)];
        run_proc(&proc, &write, &mut outputs, &mut mem, 0);
        assert_eq!(outputs[0].bit_states(), 0x9, "Write + refresh on one edge shows the pixel");
    }

    struct Recorder(RefCell<Vec<(u16, u16)>>);
    impl NoteSink for Recorder {
        fn register_note(&self, freq_index: u16, volume_index: u16) {
            self.0.borrow_mut().push((freq_index, volume_index));
        }
    }

    #[test]
    fn test_buzzer_registers_note() {
        let proc = ProcessorFn::from(Buzzer);
        let sink = Recorder(RefCell::new(Vec::new()));
        let inputs = [PinState::from_value(5), PinState::from_value(9)];
        let held = HashSet::new();
        proc.process(&mut ProcCtx {
            inputs: &inputs,
            outputs: &mut [],
            memory: &mut [],
            frame: 0,
            steps_per_clock: 1,
            held_keys: &held,
            notes: Some(&sink),
        });
        assert_eq!(sink.0.into_inner(), vec![(5, 9)]);
    }
}
