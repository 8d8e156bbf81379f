//! The in-memory network definition.
//!
//! A definition is a catalogue of [`Module`]s plus at most one [`Network`]
//! entry naming the root module. Everything here is plain owned data: the
//! recursive constructs ([`Submodule`], [`Connection`]) are sum types with
//! strictly tree-shaped ownership, and the definition is read-only during
//! elaboration.

use serde::Deserialize;

use crate::error::Error;

mod de;

/// A named, unevaluated parameter expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawParam {
    pub name: String,
    pub value: String,
}

/// A gate declaration. `size` evaluates in the enclosing parameter scope;
/// 0 means a scalar gate, anything greater an indexed vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gate {
    pub name: String,
    pub size: String,
}

/// The flavours of graph product a [`Submodule::Product`] may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductKind {
    Cartesian,
    Tensor,
    Lexicographical,
    Strong,
    Root,
}

/// A reference to a module from within a compound module.
#[derive(Clone, Debug, PartialEq)]
pub enum Submodule {
    /// Instantiate `module` as a (possibly indexed) child named `name`.
    Instance {
        name: String,
        module: String,
        size: Option<String>,
        params: Vec<RawParam>,
    },
    /// Combine two independently elaborated operands into a product graph.
    ///
    /// `root` carries the designated root vertex name and is only present for
    /// [`ProductKind::Root`].
    Product {
        kind: ProductKind,
        a: Box<Submodule>,
        b: Box<Submodule>,
        root: Option<String>,
    },
    /// Realize `then` when `condition` evaluates non-zero, otherwise the
    /// `otherwise` branch when present.
    Conditional {
        condition: String,
        then: Box<Submodule>,
        otherwise: Option<Box<Submodule>>,
    },
}

/// An edge specification inside a compound module.
#[derive(Clone, Debug, PartialEq)]
pub enum Connection {
    /// A single edge between two name patterns.
    Link {
        from: String,
        to: String,
        attributes: Option<String>,
    },
    /// Repeat `body` for `var` over the half-open range `[start, end)`.
    Loop {
        var: String,
        start: String,
        end: String,
        body: Box<Connection>,
    },
    Conditional {
        condition: String,
        then: Box<Connection>,
        otherwise: Option<Box<Connection>>,
    },
    /// Fully connect every node under the current scope whose full name
    /// matches the pattern.
    AllMatch {
        nodes: String,
        attributes: Option<String>,
    },
}

/// Substitute a freshly elaborated submodule for the nodes matching `nodes`.
#[derive(Clone, Debug, PartialEq)]
pub struct Replace {
    pub nodes: String,
    pub with: Submodule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    /// A leaf: one node plus its gates.
    Simple,
    /// A container of submodules, connections and replacements; its gates are
    /// connection waypoints.
    Compound,
}

/// A named template describing either a leaf element or a composite.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
    /// Propagated onto the emitted node. Simple modules only.
    pub attributes: Option<String>,
    pub params: Vec<RawParam>,
    pub gates: Vec<Gate>,
    pub submodules: Vec<Submodule>,
    pub connections: Vec<Connection>,
    pub replace: Vec<Replace>,
}

/// The elaboration entry point: the root module and its parameter bindings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Network {
    pub module: String,
    #[serde(default)]
    pub params: Vec<RawParam>,
}

/// A parsed topology description, possibly merged from several inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkDefinition {
    pub modules: Vec<Module>,
    pub network: Option<Network>,
}

impl NetworkDefinition {
    /// Parse a single JSON description.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let mut def = Self::default();
        def.merge_json(text)?;
        Ok(def)
    }

    /// Parse a JSON description and merge it into this definition. Module
    /// lists concatenate; a second `network` entry is an error.
    pub fn merge_json(&mut self, text: &str) -> Result<(), Error> {
        use serde::de::Error as _;

        let entries: Vec<de::Entry> = serde_json::from_str(text)?;
        for entry in entries {
            match entry {
                de::Entry::Module(raw) => {
                    let module = raw
                        .into_module(ModuleKind::Compound)
                        .map_err(serde_json::Error::custom)?;
                    self.modules.push(module);
                }
                de::Entry::SimpleModule(raw) => {
                    let module = raw
                        .into_module(ModuleKind::Simple)
                        .map_err(serde_json::Error::custom)?;
                    self.modules.push(module);
                }
                de::Entry::Network(network) => {
                    if self.network.is_some() {
                        return Err(Error::DuplicateNetwork);
                    }
                    self.network = Some(network);
                }
            }
        }
        Ok(())
    }

    /// Look up a module by name. The first definition wins.
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}
