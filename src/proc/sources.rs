use crate::pinstate::PinState;
use crate::proc::{PortSpec, ProcCtx, Processor};

/// A free-running clock driven by the global frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock;

impl Processor for Clock {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("out", 1)]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        // steps_per_clock = 0 disables oscillation; the output holds low.
        ctx.outputs[0] = match ctx.steps_per_clock {
            0 => PinState::LOW,
            steps => PinState::from_bool(ctx.frame / u64::from(steps) & 1 == 0),
        };
    }
}

/// Emits a fixed-duration high pulse on each rising edge of its input.
///
/// Memory layout: `[duration, ticks_remaining, previous_input_latch]`.
/// An in-flight pulse survives the input floating mid-pulse; the input's
/// disconnected flags are mirrored onto the output while they last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse;

impl Processor for Pulse {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in", 1), PortSpec::output("out", 1)]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let high = ctx.inputs[0].first_bit_high();
        if high && ctx.memory[2] == 0 {
            ctx.memory[1] = ctx.memory[0];
        }
        ctx.memory[2] = u32::from(high);

        let mut out = PinState::from_bool(ctx.memory[1] > 0);
        if ctx.memory[1] > 0 {
            ctx.memory[1] -= 1;
        }
        let flags = ctx.inputs[0].tristate_flags();
        if flags != 0 {
            out = PinState::from_raw(out.raw() | u32::from(flags) << 16);
        }
        ctx.outputs[0] = out;
    }
}

/// Outputs high while its configured key is held.
///
/// Memory layout: `[key_char]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key;

impl Processor for Key {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("out", 1)]
    }

    fn process(&self, ctx: &mut ProcCtx<'_>) {
        let held = char::from_u32(ctx.memory[0])
            .is_some_and(|c| ctx.held_keys.contains(&c));
        ctx.outputs[0] = PinState::from_bool(held);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::proc::{ProcessorFn, Processor};

    fn run_clock(frame: u64, steps: u32) -> bool {
        let proc = ProcessorFn::from(Clock);
        let mut outputs = [PinState::floating(1)];
        let held = HashSet::new();
        proc.process(&mut ProcCtx {
            inputs: &[],
            outputs: &mut outputs,
            memory: &mut [],
            frame,
            steps_per_clock: steps,
            held_keys: &held,
            notes: None,
        });
        outputs[0].first_bit_high()
    }

    #[test]
    fn test_clock_toggles_every_n_frames() {
        // steps = 4: high on frames 0-3, low on 4-7, high on 8-11, ...
        for frame in 0..16 {
            let expected = frame / 4 % 2 == 0;
            assert_eq!(run_clock(frame, 4), expected, "Clock level at frame {frame}");
        }
    }

    #[test]
    fn test_clock_disabled_at_zero_steps() {
        for frame in 0..8 {
            assert!(!run_clock(frame, 0), "A disabled clock holds low");
        }
    }

    fn pulse_step(proc: &ProcessorFn, mem: &mut [u32], input: PinState) -> PinState {
        let mut outputs = [PinState::floating(1)];
        crate::proc::run_proc(proc, &[input], &mut outputs, mem, 0);
        outputs[0]
    }

    #[test]
    fn test_pulse_fires_for_duration_on_rising_edge() {
        let proc = ProcessorFn::from(Pulse);
        let mut mem = [3, 0, 0];

        assert!(!pulse_step(&proc, &mut mem, PinState::LOW).first_bit_high());
        // Rising edge: high for 3 frames even though the input stays high.
        for i in 0..3 {
            assert!(
                pulse_step(&proc, &mut mem, PinState::HIGH).first_bit_high(),
                "Pulse frame {i} should be high"
            );
        }
        assert!(!pulse_step(&proc, &mut mem, PinState::HIGH).first_bit_high());
        // No retrigger without a fresh edge.
        assert!(!pulse_step(&proc, &mut mem, PinState::HIGH).first_bit_high());
        // Low then high retriggers.
        assert!(!pulse_step(&proc, &mut mem, PinState::LOW).first_bit_high());
        assert!(pulse_step(&proc, &mut mem, PinState::HIGH).first_bit_high());
    }

    #[test]
    fn test_pulse_mirrors_disconnected_input() {
        let proc = ProcessorFn::from(Pulse);
        let mut mem = [2, 0, 0];
        pulse_step(&proc, &mut mem, PinState::HIGH);
        let out = pulse_step(&proc, &mut mem, PinState::floating(1));
        assert_ne!(out.tristate_flags(), 0, "Floating input shows on the output flags");
        assert_eq!(mem[1], 0, "In-flight pulse keeps ticking down");
    }

    #[test]
    fn test_key_reads_held_set() {
        let proc = ProcessorFn::from(Key);
        let mut held = HashSet::new();
        held.insert('f');
        let mut outputs = [PinState::floating(1)];
        let mut mem = ['f' as u32];
        proc.process(&mut ProcCtx {
            inputs: &[],
            outputs: &mut outputs,
            memory: &mut mem,
            frame: 0,
            steps_per_clock: 1,
            held_keys: &held,
            notes: None,
        });
        assert!(outputs[0].first_bit_high());

        held.clear();
        proc.process(&mut ProcCtx {
            inputs: &[],
            outputs: &mut outputs,
            memory: &mut mem,
            frame: 0,
            steps_per_clock: 1,
            held_keys: &held,
            notes: None,
        });
        assert!(!outputs[0].first_bit_high());
    }
}
