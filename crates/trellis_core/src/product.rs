//! Graph products.
//!
//! A product combines two independently elaborated, compacted operand graphs
//! into one whose vertices are pairs `(u,v)`. The variants differ only in
//! which factor edges induce product edges; vertex construction and gate
//! replication are shared.

use petgraph::graph::NodeIndex;

use crate::def::ProductKind;
use crate::error::Error;
use crate::graph::{Graph, NodeKind};

/// Compute the product of `a` and `b`. `root` names the designated root
/// vertex of `b` and is required for [`ProductKind::Root`].
pub fn product(
    kind: ProductKind,
    a: &Graph,
    b: &Graph,
    root: Option<&str>,
) -> Result<Graph, Error> {
    let mut out = Graph::new();
    let a_nodes = vertices(a);
    let b_nodes = vertices(b);

    for &u in &a_nodes {
        for &v in &b_nodes {
            let name = pair_name(a, u, b, v);
            let attrs = joined_attrs(a, u, b, v);
            let vertex = out.add_node(&name, NodeKind::Node, attrs.as_deref());
            replicate_gates(&mut out, vertex, &name, a, u)?;
            replicate_gates(&mut out, vertex, &name, b, v)?;
        }
    }

    match kind {
        ProductKind::Cartesian => {
            a_edges_per_copy(&mut out, a, b, &b_nodes)?;
            b_edges_per_copy(&mut out, a, &a_nodes, b)?;
        }
        ProductKind::Tensor => {
            tensor_edges(&mut out, a, b)?;
        }
        ProductKind::Lexicographical => {
            // A-edges connect every pair of B-vertices across the two copies.
            for (u1, u2, attrs) in node_edges(a) {
                for &v1 in &b_nodes {
                    for &v2 in &b_nodes {
                        out.add_edge_by_name(
                            &pair_name(a, u1, b, v1),
                            &pair_name(a, u2, b, v2),
                            attrs,
                        )?;
                    }
                }
            }
            b_edges_per_copy(&mut out, a, &a_nodes, b)?;
        }
        ProductKind::Strong => {
            a_edges_per_copy(&mut out, a, b, &b_nodes)?;
            b_edges_per_copy(&mut out, a, &a_nodes, b)?;
            tensor_edges(&mut out, a, b)?;
        }
        ProductKind::Root => {
            let root = root.ok_or_else(|| Error::Root(String::new()))?;
            let root_v = b_nodes
                .iter()
                .copied()
                .find(|&v| b.node(v).name == root)
                .ok_or_else(|| Error::Root(root.to_string()))?;
            for (u1, u2, attrs) in node_edges(a) {
                out.add_edge_by_name(
                    &pair_name(a, u1, b, root_v),
                    &pair_name(a, u2, b, root_v),
                    attrs,
                )?;
            }
            b_edges_per_copy(&mut out, a, &a_nodes, b)?;
        }
    }

    Ok(out)
}

/// The node-typed vertices of a factor, in index order.
fn vertices(g: &Graph) -> Vec<NodeIndex> {
    g.node_indices()
        .filter(|&i| g.node(i).kind == NodeKind::Node)
        .collect()
}

/// The factor edges both of whose endpoints are node-typed.
fn node_edges<'a>(g: &'a Graph) -> impl Iterator<Item = (NodeIndex, NodeIndex, Option<&'a str>)> {
    g.edges().filter(|&(x, y, _)| {
        g.node(x).kind == NodeKind::Node && g.node(y).kind == NodeKind::Node
    })
}

fn pair_name(a: &Graph, u: NodeIndex, b: &Graph, v: NodeIndex) -> String {
    format!("({},{})", a.node(u).name, b.node(v).name)
}

/// Product vertex attributes concatenate the factor attributes.
fn joined_attrs(a: &Graph, u: NodeIndex, b: &Graph, v: NodeIndex) -> Option<String> {
    match (&a.node(u).attributes, &b.node(v).attributes) {
        (Some(x), Some(y)) => Some(format!("{x}, {y}")),
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    }
}

/// Copy the gates hanging off a factor vertex onto the product vertex,
/// keeping each gate's full factor name as the suffix.
fn replicate_gates(
    out: &mut Graph,
    vertex: NodeIndex,
    vertex_name: &str,
    factor: &Graph,
    u: NodeIndex,
) -> Result<(), Error> {
    for (nb, attrs) in factor.edges_of(u) {
        if factor.node(nb).kind != NodeKind::Gate {
            continue;
        }
        let gate_name = format!("{vertex_name}.{}", factor.node(nb).name);
        let gate = out.add_node(&gate_name, NodeKind::Gate, None);
        out.add_edge(vertex, gate, attrs.as_deref())?;
    }
    Ok(())
}

/// `(u1,v) -- (u2,v)` for every A-edge `u1 -- u2` and every B-vertex `v`.
fn a_edges_per_copy(
    out: &mut Graph,
    a: &Graph,
    b: &Graph,
    b_nodes: &[NodeIndex],
) -> Result<(), Error> {
    for (u1, u2, attrs) in node_edges(a) {
        for &v in b_nodes {
            out.add_edge_by_name(&pair_name(a, u1, b, v), &pair_name(a, u2, b, v), attrs)?;
        }
    }
    Ok(())
}

/// `(u,v1) -- (u,v2)` for every B-edge `v1 -- v2` and every A-vertex `u`.
fn b_edges_per_copy(
    out: &mut Graph,
    a: &Graph,
    a_nodes: &[NodeIndex],
    b: &Graph,
) -> Result<(), Error> {
    for (v1, v2, attrs) in node_edges(b) {
        for &u in a_nodes {
            out.add_edge_by_name(&pair_name(a, u, b, v1), &pair_name(a, u, b, v2), attrs)?;
        }
    }
    Ok(())
}

/// `(u1,v1) -- (u2,v2)` whenever both factor edges exist; undirected, so both
/// diagonal orientations are emitted. Attributes come from the B edge.
fn tensor_edges(out: &mut Graph, a: &Graph, b: &Graph) -> Result<(), Error> {
    for (u1, u2, _) in node_edges(a) {
        for (v1, v2, attrs) in node_edges(b) {
            out.add_edge_by_name(&pair_name(a, u1, b, v1), &pair_name(a, u2, b, v2), attrs)?;
            out.add_edge_by_name(&pair_name(a, u1, b, v2), &pair_name(a, u2, b, v1), attrs)?;
        }
    }
    Ok(())
}
