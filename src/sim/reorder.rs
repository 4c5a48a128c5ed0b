//! The iterative, stochastic scheduling strategy.
//!
//! An *order pass* visits each composite's sub-chips ready-first, breaking
//! deadlocks (feedback cycles) by random choice, and leaves the sub-chip
//! array in reverse order of processing. Steady-state frames then walk the
//! array tail-first, reproducing that order, with a randomized adjacent
//! swap every [`DYNAMIC_REORDER_PERIOD`] frames to vary race outcomes.

use crate::chip::ChipKey;
use crate::sim::{FramePass, Simulator, DYNAMIC_REORDER_PERIOD};

pub(crate) fn run_frame(sim: &mut Simulator) {
    let root = sim.tree.root();
    let order_pass_due = sim.needs_order_pass;
    let dynamic = sim.frame % DYNAMIC_REORDER_PERIOD == 0;
    let root_is_custom = sim.tree.chips[root].kind.is_custom();

    let mut pass = sim.pass(false);
    match (order_pass_due, root_is_custom) {
        (true, true) => order_step(&mut pass, root),
        (false, true) => step(&mut pass, root, dynamic),
        // A bare primitive root has nothing to order.
        (_, false) => pass.step_primitive(root),
    }
    sim.needs_order_pass = false;
}

/// One steady-state step of a composite chip: forward its inputs, walk its
/// sub-chips tail-first, forward its outputs.
fn step(pass: &mut FramePass<'_>, chip: ChipKey, dynamic: bool) {
    pass.propagate_inputs(chip);

    let mut i = pass.tree.chips[chip].children.len();
    while i > 0 {
        i -= 1;
        if dynamic && i > 0 {
            let current = pass.tree.chips[chip].children[i];
            let left = pass.tree.chips[chip].children[i - 1];
            if !pass.tree.chips[current].is_ready()
                && !pass.tree.chips[left].kind.is_bus_origin()
                && pass.rng.coin()
            {
                pass.tree.chips[chip].children.swap(i, i - 1);
            }
        }
        let next = pass.tree.chips[chip].children[i];
        match pass.kind(next).is_custom() {
            true => step(pass, next, dynamic),
            false => pass.step_primitive(next),
        }
    }

    pass.propagate_outputs(chip);
}

/// One ordering step of a composite chip.
///
/// Repeatedly picks the leftmost ready sub-chip (falling back to a random
/// non-bus-origin when nothing is ready), processes it, and swaps it to the
/// tail. The array ends up in reverse order of processing, which the
/// tail-first [`step`] walk replays on later frames.
fn order_step(pass: &mut FramePass<'_>, chip: ChipKey) {
    pass.propagate_inputs(chip);

    let mut n = pass.tree.chips[chip].children.len();
    while n > 0 {
        let k = next_index(pass, chip, n);
        let next = pass.tree.chips[chip].children[k];
        match pass.kind(next).is_custom() {
            true => order_step(pass, next),
            false => pass.step_primitive(next),
        }
        pass.tree.chips[chip].children.swap(k, n - 1);
        n -= 1;
    }

    pass.propagate_outputs(chip);
}

/// Picks the next sub-chip to process among `children[..n]`.
fn next_index(pass: &mut FramePass<'_>, chip: ChipKey, n: usize) -> usize {
    let tree = &pass.tree;
    let children = &tree.chips[chip].children;
    if let Some(k) = children[..n]
        .iter()
        .position(|&c| tree.chips[c].is_ready())
    {
        return k;
    }

    // Nothing is ready: a feedback cycle. Break it at random, but never at
    // a bus origin while anything else remains.
    let mut k = pass.rng.below(n);
    let any_non_bus = children[..n]
        .iter()
        .any(|&c| !tree.chips[c].kind.is_bus_origin());
    if any_non_bus {
        while tree.chips[children[k]].kind.is_bus_origin() {
            k = (k + 1) % n;
        }
    }
    k
}
