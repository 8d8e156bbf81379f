//! The elaborator: recursive expansion of the module tree into the graph.
//!
//! Expansion walks the definition left to right under a [`NameStack`] and
//! [`ParamStack`] that grow and shrink in sync with the descent, so the
//! output graph is deterministic for a given input. Product operands and
//! replacement submodules elaborate through the same machinery, products
//! under a fresh empty scope and replacements in place.

use std::collections::HashMap;

use log::debug;
use petgraph::graph::NodeIndex;
use regex::Regex;

use crate::compact::compact;
use crate::def::{Connection, Module, ModuleKind, NetworkDefinition, Replace, Submodule};
use crate::error::Error;
use crate::graph::{Graph, NodeKind};
use crate::product::product;
use crate::scope::{NameStack, ParamStack};

/// Elaborate a definition into a graph of nodes and gates.
///
/// Fails with [`Error::NoNetwork`] when the definition has no `network`
/// entry and [`Error::NoModule`] when the entry names an unknown module.
pub fn elaborate(def: &NetworkDefinition) -> Result<Graph, Error> {
    let network = def.network.as_ref().ok_or(Error::NoNetwork)?;
    let root = def
        .find_module(&network.module)
        .ok_or_else(|| Error::NoModule(network.module.clone()))?;

    let mut elaborator = Elaborator {
        def,
        params: ParamStack::new(),
    };
    let mut names = NameStack::new("network");
    let mut graph = Graph::new();
    for param in &network.params {
        elaborator.params.enter(param)?;
    }
    elaborator.expand(root, &mut graph, &mut names)?;
    for _ in &network.params {
        elaborator.params.leave();
    }
    Ok(graph)
}

struct Elaborator<'a> {
    def: &'a NetworkDefinition,
    params: ParamStack,
}

impl Elaborator<'_> {
    fn expand(&mut self, module: &Module, g: &mut Graph, names: &mut NameStack) -> Result<(), Error> {
        for param in &module.params {
            self.params.enter(param)?;
        }
        match module.kind {
            ModuleKind::Simple => {
                let name = names.full();
                debug!("expanding simple module {} as {name}", module.name);
                let node = g.add_node(&name, NodeKind::Node, module.attributes.as_deref());
                for gate in &module.gates {
                    let size = self.params.eval_int(&gate.size)?;
                    if size == 0 {
                        add_simple_gate(g, names, node, &gate.name, None)?;
                    } else {
                        for j in 0..size {
                            add_simple_gate(g, names, node, &gate.name, Some(j))?;
                        }
                    }
                }
            }
            ModuleKind::Compound => {
                // Compound gates are connection waypoints only; no edges yet.
                for gate in &module.gates {
                    let size = self.params.eval_int(&gate.size)?;
                    if size == 0 {
                        g.add_node(&names.qualify(&gate.name, None), NodeKind::Gate, None);
                    } else {
                        for j in 0..size {
                            g.add_node(&names.qualify(&gate.name, Some(j)), NodeKind::Gate, None);
                        }
                    }
                }
                for submodule in &module.submodules {
                    self.add_submodule(submodule, g, names)?;
                }
                for connection in &module.connections {
                    self.add_connection(connection, g, names)?;
                }
                for replace in &module.replace {
                    self.apply_replace(replace, g, names)?;
                }
            }
        }
        for _ in &module.params {
            self.params.leave();
        }
        Ok(())
    }

    fn add_submodule(
        &mut self,
        submodule: &Submodule,
        g: &mut Graph,
        names: &mut NameStack,
    ) -> Result<(), Error> {
        match submodule {
            Submodule::Instance {
                name,
                module,
                size,
                params,
            } => {
                for param in params {
                    self.params.enter(param)?;
                }
                let count = match size {
                    None => 0,
                    Some(expr) => self.params.eval_int(expr)?,
                };
                if count > 0 {
                    for j in 0..count {
                        self.params.enter_literal("index", j);
                        let res = self.expand_instance(name, Some(j), module, g, names);
                        self.params.leave();
                        res?;
                    }
                } else {
                    self.expand_instance(name, None, module, g, names)?;
                }
                for _ in params {
                    self.params.leave();
                }
            }
            Submodule::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.params.eval_int(condition)? != 0 {
                    self.add_submodule(then, g, names)?;
                } else if let Some(otherwise) = otherwise {
                    self.add_submodule(otherwise, g, names)?;
                }
            }
            Submodule::Product { kind, a, b, root } => {
                // Operands elaborate into their own graphs under an empty
                // scope and are compacted before the product is formed.
                let mut operand_names = NameStack::new("");
                let mut g_a = Graph::new();
                self.add_submodule(a, &mut g_a, &mut operand_names)?;
                let g_a = compact(g_a)?;
                let mut g_b = Graph::new();
                self.add_submodule(b, &mut g_b, &mut operand_names)?;
                let g_b = compact(g_b)?;
                let prod = product(*kind, &g_a, &g_b, root.as_deref())?;
                insert_subgraph(g, &names.full(), &prod)?;
            }
        }
        Ok(())
    }

    fn expand_instance(
        &mut self,
        name: &str,
        index: Option<i64>,
        module: &str,
        g: &mut Graph,
        names: &mut NameStack,
    ) -> Result<(), Error> {
        let Some(module) = self.def.find_module(module) else {
            return Err(Error::NoModule(module.to_string()));
        };
        names.enter(name, index);
        let res = self.expand(module, g, names);
        names.leave();
        res
    }

    fn add_connection(
        &mut self,
        connection: &Connection,
        g: &mut Graph,
        names: &mut NameStack,
    ) -> Result<(), Error> {
        match connection {
            Connection::Link {
                from,
                to,
                attributes,
            } => {
                let name_a = self.params.eval_name(from)?;
                let name_b = self.params.eval_name(to)?;
                let scope = names.full();
                let full_a = scoped(&scope, &name_a);
                let full_b = scoped(&scope, &name_b);
                let (Some(node_a), Some(node_b)) = (g.find_node(&full_a), g.find_node(&full_b))
                else {
                    return Err(Error::Conn {
                        from: full_a,
                        to: full_b,
                    });
                };
                let end_a = through_gate(g, node_a)?;
                let end_b = through_gate(g, node_b)?;
                g.add_edge(end_a, end_b, attributes.as_deref())?;
            }
            Connection::Loop {
                var,
                start,
                end,
                body,
            } => {
                let start = self.params.eval_int(start)?;
                let end = self.params.eval_int(end)?;
                if start > end {
                    return Err(Error::Loop { start, end });
                }
                for j in start..end {
                    self.params.enter_literal(var, j);
                    let res = self.add_connection(body, g, names);
                    self.params.leave();
                    res?;
                }
            }
            Connection::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.params.eval_int(condition)? != 0 {
                    self.add_connection(then, g, names)?;
                } else if let Some(otherwise) = otherwise {
                    self.add_connection(otherwise, g, names)?;
                }
            }
            Connection::AllMatch { nodes, attributes } => {
                let selected = self.matching_nodes(nodes, g, names)?;
                for (pos, &x) in selected.iter().enumerate() {
                    for &y in &selected[..pos] {
                        let end_x = through_gate(g, x)?;
                        let end_y = through_gate(g, y)?;
                        g.add_edge(end_x, end_y, attributes.as_deref())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_replace(
        &mut self,
        replace: &Replace,
        g: &mut Graph,
        names: &mut NameStack,
    ) -> Result<(), Error> {
        let marked = self.matching_nodes(&replace.nodes, g, names)?;
        for &i in &marked {
            g.set_kind(i, NodeKind::PendingReplace);
        }

        self.add_submodule(&replace.with, g, names)?;

        for &old in &marked {
            let name = g.node(old).name.clone();
            // The pending mark hides the old node, so a lookup by its own
            // name resolves to the freshly elaborated successor, if any.
            match g.find_node(&name) {
                None => g.set_kind(old, NodeKind::Replaced),
                Some(successor) => {
                    for (nb, attrs) in g.edges_of(old) {
                        if nb != successor && !g.are_adjacent(successor, nb) {
                            g.add_edge(successor, nb, attrs.as_deref())?;
                        }
                    }
                    g.clear_edges_of(old);
                    g.set_kind(old, NodeKind::Replaced);
                    g.set_name(old, "");
                }
            }
        }
        Ok(())
    }

    /// The live nodes under the current scope whose full name matches the
    /// pattern.
    fn matching_nodes(
        &self,
        pattern: &str,
        g: &Graph,
        names: &NameStack,
    ) -> Result<Vec<NodeIndex>, Error> {
        let re = Regex::new(pattern)?;
        let scope = names.full();
        Ok(g.node_indices()
            .filter(|&i| {
                let node = g.node(i);
                !matches!(node.kind, NodeKind::Replaced | NodeKind::PendingReplace)
                    && node.name.starts_with(&scope)
                    && re.is_match(&node.name)
            })
            .collect())
    }
}

/// Emit one gate of a simple module and wire it to the module's node.
fn add_simple_gate(
    g: &mut Graph,
    names: &NameStack,
    node: NodeIndex,
    gate: &str,
    index: Option<i64>,
) -> Result<(), Error> {
    let full = names.qualify(gate, index);
    let ix = g.add_node(&full, NodeKind::Gate, None);
    g.add_edge(node, ix, None)
}

/// Connections land on gates. A plain-node endpoint gets an implicit
/// `_auto[k]` gate, with the smallest `k` not already hanging off the node.
fn through_gate(g: &mut Graph, node: NodeIndex) -> Result<NodeIndex, Error> {
    if g.node(node).kind != NodeKind::Node {
        return Ok(node);
    }
    let base = g.node(node).name.clone();
    let mut k = 0;
    loop {
        let candidate = format!("{base}._auto[{k}]");
        if !g
            .edges_of(node)
            .iter()
            .any(|&(nb, _)| g.node(nb).name == candidate)
        {
            let gate = g.add_node(&candidate, NodeKind::Gate, None);
            g.add_edge(node, gate, None)?;
            return Ok(gate);
        }
        k += 1;
    }
}

/// Copy an elaborated product graph into the host graph under a scope.
fn insert_subgraph(g: &mut Graph, scope: &str, sub: &Graph) -> Result<(), Error> {
    let mut map = HashMap::new();
    for i in sub.node_indices() {
        let node = sub.node(i);
        let name = scoped(scope, &node.name);
        map.insert(i, g.add_node(&name, node.kind, node.attributes.as_deref()));
    }
    for (a, b, attrs) in sub.edges() {
        g.add_edge(map[&a], map[&b], attrs)?;
    }
    Ok(())
}

fn scoped(scope: &str, local: &str) -> String {
    if scope.is_empty() {
        local.to_string()
    } else {
        format!("{scope}.{local}")
    }
}
