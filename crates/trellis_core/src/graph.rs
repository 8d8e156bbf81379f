//! The undirected graph store produced by elaboration.
//!
//! Nodes carry a full dotted name, a kind and optional attributes; edges
//! carry optional attributes shared by both endpoints. Indices are insertion
//! order and are never reused: logical deletion is expressed with the
//! [`NodeKind::Replaced`] tag and filtered during lookup and serialization.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::error::Error;

/// What a stored node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A concrete network element.
    Node,
    /// A hook-point through which connections travel.
    Gate,
    /// A gate consumed by compaction.
    VisitedGate,
    /// Marked for replacement; awaiting its successor.
    PendingReplace,
    /// Logically deleted.
    Replaced,
}

/// A stored node.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub attributes: Option<String>,
}

/// An adjacency-indexed undirected graph with attributed nodes and edges.
#[derive(Clone, Debug)]
pub struct Graph {
    inner: UnGraph<Node, Option<String>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: UnGraph::new_undirected(),
        }
    }

    /// Allocate a new node. Duplicate names are allowed; lookups resolve to
    /// the lowest non-replaced match.
    pub fn add_node(&mut self, name: &str, kind: NodeKind, attributes: Option<&str>) -> NodeIndex {
        self.inner.add_node(Node {
            name: name.to_string(),
            kind,
            attributes: attributes.map(str::to_string),
        })
    }

    /// Find the lowest-index node with the given name, skipping replaced
    /// nodes.
    pub fn find_node(&self, name: &str) -> Option<NodeIndex> {
        self.inner.node_indices().find(|&ix| {
            let node = &self.inner[ix];
            node.name == name
                && node.kind != NodeKind::Replaced
                && node.kind != NodeKind::PendingReplace
        })
    }

    pub fn node(&self, ix: NodeIndex) -> &Node {
        &self.inner[ix]
    }

    pub(crate) fn set_kind(&mut self, ix: NodeIndex, kind: NodeKind) {
        self.inner[ix].kind = kind;
    }

    pub(crate) fn set_name(&mut self, ix: NodeIndex, name: &str) {
        self.inner[ix].name = name.to_string();
    }

    /// Insert an undirected edge. Self-loops are an error; an edge that
    /// already exists is silently left in place.
    pub fn add_edge(
        &mut self,
        a: NodeIndex,
        b: NodeIndex,
        attributes: Option<&str>,
    ) -> Result<(), Error> {
        if a == b {
            return Err(Error::Conn {
                from: self.inner[a].name.clone(),
                to: self.inner[b].name.clone(),
            });
        }
        if self.inner.find_edge(a, b).is_none() {
            self.inner.add_edge(a, b, attributes.map(str::to_string));
        }
        Ok(())
    }

    /// Insert an undirected edge between two named nodes.
    pub fn add_edge_by_name(&mut self, a: &str, b: &str, attributes: Option<&str>) -> Result<(), Error> {
        let (Some(ix_a), Some(ix_b)) = (self.find_node(a), self.find_node(b)) else {
            return Err(Error::Conn {
                from: a.to_string(),
                to: b.to_string(),
            });
        };
        self.add_edge(ix_a, ix_b, attributes)
    }

    pub fn are_adjacent(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.inner.find_edge(a, b).is_some()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// The neighbors of `a` together with the connecting edges' attributes.
    pub fn edges_of(&self, a: NodeIndex) -> Vec<(NodeIndex, Option<String>)> {
        self.inner
            .edges(a)
            .map(|e| {
                let other = if e.source() == a { e.target() } else { e.source() };
                (other, e.weight().clone())
            })
            .collect()
    }

    pub fn degree(&self, a: NodeIndex) -> usize {
        self.inner.edges(a).count()
    }

    /// The attribute stored on the edge between `a` and `b`, if any.
    pub fn edge_attr(&self, a: NodeIndex, b: NodeIndex) -> Option<&str> {
        self.inner
            .find_edge(a, b)
            .and_then(|e| self.inner.edge_weight(e))
            .and_then(|w| w.as_deref())
    }

    /// Every undirected edge, once.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, Option<&str>)> + '_ {
        self.inner
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight().as_deref()))
    }

    /// Remove every edge incident on `a`.
    pub(crate) fn clear_edges_of(&mut self, a: NodeIndex) {
        while let Some(id) = self.inner.edges(a).next().map(|e| e.id()) {
            let _ = self.inner.remove_edge(id);
        }
    }

    /// Serialize to DOT. When `include_gates` is false, gate-typed nodes and
    /// their incident edges are skipped. Replaced nodes are never emitted.
    pub fn to_dot(&self, include_gates: bool) -> String {
        fn printable(kind: NodeKind, include_gates: bool) -> bool {
            match kind {
                NodeKind::Node => true,
                NodeKind::Gate | NodeKind::VisitedGate => include_gates,
                NodeKind::PendingReplace | NodeKind::Replaced => false,
            }
        }

        let mut out = String::from("graph g {\n");
        for ix in self.inner.node_indices() {
            let node = &self.inner[ix];
            if !printable(node.kind, include_gates) {
                continue;
            }
            out.push_str(&format!("n{} [label=\"{}\"", ix.index(), node.name));
            if let Some(attrs) = &node.attributes {
                out.push_str(&format!(", {attrs}"));
            }
            out.push_str("];\n");
        }
        for e in self.inner.edge_references() {
            let (mut a, mut b) = (e.source(), e.target());
            if a.index() > b.index() {
                std::mem::swap(&mut a, &mut b);
            }
            if !printable(self.inner[a].kind, include_gates)
                || !printable(self.inner[b].kind, include_gates)
            {
                continue;
            }
            out.push_str(&format!("n{} -- n{}", a.index(), b.index()));
            if let Some(attrs) = e.weight() {
                out.push_str(&format!(" [{attrs}]"));
            }
            out.push_str(";\n");
        }
        out.push_str("}\n");
        out
    }
}
