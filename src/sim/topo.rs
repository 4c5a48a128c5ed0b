//! The deterministic, topologically sorted scheduling strategy.
//!
//! The circuit is flattened into its primitive chips (Custom containers are
//! transparent) and ordered once by Kahn's algorithm over the
//! primitive-level dependency graph induced by the wires. Chips on feedback
//! cycles cannot be sorted and are appended after the sorted prefix. The
//! order is recomputed only when the modification queue reports changes.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use slotmap::SecondaryMap;

use crate::chip::{ChipKey, CircuitTree, PinDir, PinKey};
use crate::sim::Simulator;

pub(crate) fn run_frame(sim: &mut Simulator) {
    if sim.topo_order.is_none() {
        let order = primitive_order(&sim.tree);
        log::debug!("rebuilt topological order over {} primitives", order.len());
        sim.topo_order = Some(order);
        sim.needs_order_pass = false;
    }
    let order = sim.topo_order.clone().unwrap_or_default();

    let root = sim.tree.root();
    let mut pass = sim.pass(true);
    // Boundary pins relay on receive, so propagating the root's inputs
    // reaches every nested sub-chip input before any primitive evaluates.
    pass.propagate_inputs(root);
    for chip in order {
        if pass.tree.chips.contains_key(chip) {
            pass.step_primitive(chip);
        }
    }
}

/// Flattens the tree into primitives and returns them in evaluation order:
/// a Kahn topological prefix followed by the members of feedback cycles.
pub(crate) fn primitive_order(tree: &CircuitTree) -> Vec<ChipKey> {
    let primitives = flatten(tree);

    let mut graph: Graph<ChipKey, ()> = Graph::new();
    let mut nodes: SecondaryMap<ChipKey, NodeIndex> = SecondaryMap::new();
    for &p in &primitives {
        nodes.insert(p, graph.add_node(p));
    }
    for &p in &primitives {
        for succ in primitive_successors(tree, p) {
            if let Some(&t) = nodes.get(succ) {
                graph.add_edge(nodes[p], t, ());
            }
        }
    }

    kahn(&graph)
}

/// Every primitive chip, walking through Custom containers as transparent.
fn flatten(tree: &CircuitTree) -> Vec<ChipKey> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(key) = stack.pop() {
        let chip = &tree.chips[key];
        match chip.kind.is_custom() {
            true => stack.extend(chip.children.iter().rev()),
            false => out.push(key),
        }
    }
    out
}

/// Primitives reachable from `chip`'s outputs through the fan-out graph,
/// crossing Custom boundary pins transparently.
fn primitive_successors(tree: &CircuitTree, chip: ChipKey) -> Vec<ChipKey> {
    let mut result = Vec::new();
    let mut seen: HashSet<PinKey> = HashSet::new();
    let mut stack: Vec<PinKey> = tree.chips[chip]
        .outputs
        .iter()
        .flat_map(|&k| tree.pins[k].targets.iter().copied())
        .collect();

    while let Some(key) = stack.pop() {
        if !seen.insert(key) {
            continue;
        }
        let Some(pin) = tree.pins.get(key) else { continue };
        match tree.chips[pin.owner].kind.is_custom() {
            true => stack.extend(pin.targets.iter().copied()),
            false if pin.dir == PinDir::Input => result.push(pin.owner),
            false => {}
        }
    }
    result
}

/// Kahn's algorithm, tolerant of cycles: unsortable nodes are appended in
/// discovery order after the sorted prefix.
fn kahn(graph: &Graph<ChipKey, ()>) -> Vec<ChipKey> {
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.edges_directed(n, Direction::Incoming).count())
        .collect();

    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|&n| indegree[n.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());
    let mut placed = vec![false; graph.node_count()];

    while let Some(n) = queue.pop_front() {
        placed[n.index()] = true;
        order.push(graph[n]);
        for edge in graph.edges(n) {
            let t = edge.target();
            if placed[t.index()] {
                continue;
            }
            indegree[t.index()] -= 1;
            if indegree[t.index()] == 0 {
                queue.push_back(t);
            }
        }
    }

    // Whatever is left sits on a cycle.
    order.extend(
        graph
            .node_indices()
            .filter(|&n| !placed[n.index()])
            .map(|n| graph[n]),
    );
    order
}
