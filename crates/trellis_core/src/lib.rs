//! Elaboration of declarative network topology descriptions.
//!
//! A description is a catalogue of modules, either simple (leaf nodes with
//! gates) or compound (containers of submodules linked by connections), plus
//! a `network` entry naming the root. [`elaborate`] expands the root
//! recursively into an undirected [`Graph`] of named nodes and gates;
//! [`compact`] then rewrites the gate chains into direct node-to-node edges.

pub use compact::compact;
pub use def::NetworkDefinition;
pub use elaborate::elaborate;
pub use error::Error;
pub use graph::{Graph, NodeKind};

pub mod compact;
pub mod def;
pub mod elaborate;
pub mod error;
pub mod graph;
pub mod product;
pub mod scope;
