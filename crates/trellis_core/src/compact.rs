//! Gate compaction.
//!
//! Elaboration wires nodes together through chains of gates. Compaction
//! rewrites every chain that links two nodes into a single direct edge and
//! rebuilds the graph without the consumed gates.

use std::collections::HashMap;

use log::debug;
use petgraph::graph::NodeIndex;

use crate::error::Error;
use crate::graph::{Graph, NodeKind};

/// Collapse gate chains into direct node-to-node edges.
///
/// Chains that reach a second node contract to one edge carrying the last
/// non-empty edge attribute seen along the chain; open-ended chains are
/// dropped silently. A gate with more than two neighbors is a
/// [`Error::BadGate`]; a chain returning to its own starting node is an
/// [`Error::Conn`]. Nodes left without any original adjacency disappear from
/// the rebuilt graph.
pub fn compact(mut g: Graph) -> Result<Graph, Error> {
    for i in g.node_indices().collect::<Vec<_>>() {
        if g.node(i).kind != NodeKind::Node {
            continue;
        }
        for (nb, _) in g.edges_of(i) {
            if g.node(nb).kind != NodeKind::Gate {
                continue;
            }
            if let Some((end, attrs)) = walk_chain(&mut g, i, nb)? {
                if !g.are_adjacent(end, i) {
                    g.add_edge(end, i, attrs.as_deref())?;
                }
            }
        }
    }

    let mut out = Graph::new();
    let mut map = HashMap::new();
    for i in g.node_indices().collect::<Vec<_>>() {
        let node = g.node(i);
        if matches!(node.kind, NodeKind::Node | NodeKind::Gate) && g.degree(i) > 0 {
            let ix = out.add_node(&node.name, node.kind, node.attributes.as_deref());
            map.insert(i, ix);
        }
    }
    for (a, b, attrs) in g.edges() {
        if let (Some(&na), Some(&nb)) = (map.get(&a), map.get(&b)) {
            out.add_edge(na, nb, attrs)?;
        }
    }
    debug!(
        "compacted {} nodes / {} edges down to {} / {}",
        g.node_count(),
        g.edge_count(),
        out.node_count(),
        out.edge_count()
    );
    Ok(out)
}

/// Follow the gate chain beginning at `first` (a gate neighbor of `start`),
/// marking every traversed gate visited. Returns the node terminating the
/// chain and the attribute to carry, or `None` for an open-ended chain.
fn walk_chain(
    g: &mut Graph,
    start: NodeIndex,
    first: NodeIndex,
) -> Result<Option<(NodeIndex, Option<String>)>, Error> {
    let mut prev = start;
    let mut cur = first;
    let mut attrs = None;
    loop {
        if g.degree(cur) > 2 {
            return Err(Error::BadGate(g.node(cur).name.clone()));
        }
        g.set_kind(cur, NodeKind::VisitedGate);
        let next = g
            .edges_of(cur)
            .into_iter()
            .find(|&(x, _)| x != prev && g.node(x).kind != NodeKind::VisitedGate);
        let Some((next, edge_attr)) = next else {
            return Ok(None);
        };
        if edge_attr.is_some() {
            attrs = edge_attr;
        }
        match g.node(next).kind {
            NodeKind::Node => return Ok(Some((next, attrs))),
            NodeKind::Gate => {
                prev = cur;
                cur = next;
            }
            // A chain ending in a replaced record is as dead as a dangling one.
            _ => return Ok(None),
        }
    }
}
