//! Deserialization of the JSON description format.
//!
//! The format leans on shapes `serde` cannot derive: single-pair objects for
//! params and gates, and key-set dispatch for the tagged submodule and
//! connection constructs, so those impls are written by hand against
//! `serde_json::Value` maps.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    Connection, Gate, Module, ModuleKind, Network, ProductKind, RawParam, Replace, Submodule,
};

/// One element of the top-level input array.
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum Entry {
    Module(RawModule),
    #[serde(rename = "simplemodule")]
    SimpleModule(RawModule),
    Network(Network),
}

/// A module body before its kind-specific invariants are checked.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawModule {
    name: String,
    #[serde(default)]
    attributes: Option<String>,
    #[serde(default)]
    params: Vec<RawParam>,
    #[serde(default)]
    gates: Vec<Gate>,
    #[serde(default)]
    submodules: Vec<Submodule>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    replace: Vec<Replace>,
}

impl RawModule {
    pub(super) fn into_module(self, kind: ModuleKind) -> Result<Module, String> {
        match kind {
            ModuleKind::Simple => {
                if !self.submodules.is_empty()
                    || !self.connections.is_empty()
                    || !self.replace.is_empty()
                {
                    return Err(format!(
                        "simple module `{}` cannot have submodules, connections or replacements",
                        self.name
                    ));
                }
            }
            ModuleKind::Compound => {
                if self.attributes.is_some() {
                    return Err(format!(
                        "attributes are only valid on simple modules (`{}`)",
                        self.name
                    ));
                }
            }
        }
        Ok(Module {
            name: self.name,
            kind,
            attributes: self.attributes,
            params: self.params,
            gates: self.gates,
            submodules: self.submodules,
            connections: self.connections,
            replace: self.replace,
        })
    }
}

/// Deserialize a `{"name": "value"}` single-pair object.
fn single_pair<'de, A>(mut access: A, what: &'static str) -> Result<(String, String), A::Error>
where
    A: MapAccess<'de>,
{
    let Some(pair) = access.next_entry::<String, String>()? else {
        return Err(de::Error::custom(format!("empty {what} object")));
    };
    if access.next_entry::<String, String>()?.is_some() {
        return Err(de::Error::custom(format!(
            "{what} objects hold exactly one pair"
        )));
    }
    Ok(pair)
}

impl<'de> Deserialize<'de> for RawParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = RawParam;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single {\"name\": \"expr\"} pair")
            }
            fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<RawParam, A::Error> {
                let (name, value) = single_pair(access, "parameter")?;
                Ok(RawParam { name, value })
            }
        }
        deserializer.deserialize_map(V)
    }
}

impl<'de> Deserialize<'de> for Gate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Gate;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single {\"name\": \"size-expr\"} pair")
            }
            fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Gate, A::Error> {
                let (name, size) = single_pair(access, "gate")?;
                Ok(Gate { name, size })
            }
        }
        deserializer.deserialize_map(V)
    }
}

impl<'de> Deserialize<'de> for Submodule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        submodule_from_map(&map).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Connection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        connection_from_map(&map).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Replace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        replace_from_map(&map).map_err(de::Error::custom)
    }
}

fn check_keys(map: &Map<String, Value>, allowed: &[&str], what: &str) -> Result<(), String> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(format!("unexpected key `{key}` in {what}"));
        }
    }
    Ok(())
}

fn required<'a>(map: &'a Map<String, Value>, key: &str, what: &str) -> Result<&'a Value, String> {
    map.get(key)
        .ok_or_else(|| format!("{what} requires `{key}`"))
}

fn required_str(map: &Map<String, Value>, key: &str, what: &str) -> Result<String, String> {
    required(map, key, what)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("`{key}` in {what} must be a string"))
}

fn optional_str(
    map: &Map<String, Value>,
    key: &str,
    what: &str,
) -> Result<Option<String>, String> {
    match map.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| format!("`{key}` in {what} must be a string")),
    }
}

fn nested_submodule(value: &Value) -> Result<Submodule, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

fn nested_connection(value: &Value) -> Result<Connection, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

fn product_operands(
    value: &Value,
    key: &str,
) -> Result<(Box<Submodule>, Box<Submodule>), String> {
    let operands = value
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| format!("`{key}` takes exactly two operands"))?;
    let a = nested_submodule(&operands[0])?;
    let b = nested_submodule(&operands[1])?;
    Ok((Box::new(a), Box::new(b)))
}

fn replace_from_map(map: &Map<String, Value>) -> Result<Replace, String> {
    check_keys(map, &["nodes", "with"], "replace")?;
    let nodes = required_str(map, "nodes", "replace")?;
    let with = nested_submodule(required(map, "with", "replace")?)?;
    Ok(Replace { nodes, with })
}

fn submodule_from_map(map: &Map<String, Value>) -> Result<Submodule, String> {
    const PRODUCT_KINDS: &[(&str, ProductKind)] = &[
        ("cartesian", ProductKind::Cartesian),
        ("tensor", ProductKind::Tensor),
        ("lexicographical", ProductKind::Lexicographical),
        ("strong", ProductKind::Strong),
    ];
    for &(key, kind) in PRODUCT_KINDS {
        if let Some(value) = map.get(key) {
            check_keys(map, &[key], "product submodule")?;
            let (a, b) = product_operands(value, key)?;
            return Ok(Submodule::Product {
                kind,
                a,
                b,
                root: None,
            });
        }
    }
    // The root product takes `root` and `rooted` in either order.
    if map.contains_key("rooted") || map.contains_key("root") {
        check_keys(map, &["root", "rooted"], "root product submodule")?;
        let root = required_str(map, "root", "root product")?;
        let (a, b) = product_operands(required(map, "rooted", "root product")?, "rooted")?;
        return Ok(Submodule::Product {
            kind: ProductKind::Root,
            a,
            b,
            root: Some(root),
        });
    }
    if map.contains_key("if") || map.contains_key("then") || map.contains_key("else") {
        check_keys(map, &["if", "then", "else"], "conditional submodule")?;
        let condition = required_str(map, "if", "conditional submodule")?;
        let then = nested_submodule(required(map, "then", "conditional submodule")?)?;
        let otherwise = match map.get("else") {
            None => None,
            Some(v) => Some(Box::new(nested_submodule(v)?)),
        };
        return Ok(Submodule::Conditional {
            condition,
            then: Box::new(then),
            otherwise,
        });
    }
    check_keys(map, &["name", "module", "size", "params"], "submodule")?;
    let name = required_str(map, "name", "submodule")?;
    let module = required_str(map, "module", "submodule")?;
    let size = optional_str(map, "size", "submodule")?;
    let params = match map.get("params") {
        None => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| e.to_string())?,
    };
    Ok(Submodule::Instance {
        name,
        module,
        size,
        params,
    })
}

fn connection_from_map(map: &Map<String, Value>) -> Result<Connection, String> {
    if map.contains_key("from") || map.contains_key("to") {
        check_keys(map, &["from", "to", "attributes"], "connection")?;
        let from = required_str(map, "from", "connection")?;
        let to = required_str(map, "to", "connection")?;
        let attributes = optional_str(map, "attributes", "connection")?;
        return Ok(Connection::Link {
            from,
            to,
            attributes,
        });
    }
    if map.contains_key("all-match") {
        check_keys(map, &["all-match", "attributes"], "all-match connection")?;
        let nodes = required_str(map, "all-match", "all-match connection")?;
        let attributes = optional_str(map, "attributes", "all-match connection")?;
        return Ok(Connection::AllMatch { nodes, attributes });
    }
    if map.contains_key("if") || map.contains_key("then") || map.contains_key("else") {
        check_keys(map, &["if", "then", "else"], "conditional connection")?;
        let condition = required_str(map, "if", "conditional connection")?;
        let then = nested_connection(required(map, "then", "conditional connection")?)?;
        let otherwise = match map.get("else") {
            None => None,
            Some(v) => Some(Box::new(nested_connection(v)?)),
        };
        return Ok(Connection::Conditional {
            condition,
            then: Box::new(then),
            otherwise,
        });
    }
    if map.contains_key("loop") {
        check_keys(map, &["loop", "start", "end", "conn"], "loop connection")?;
        let var = required_str(map, "loop", "loop connection")?;
        let start = required_str(map, "start", "loop connection")?;
        let end = required_str(map, "end", "loop connection")?;
        let body = nested_connection(required(map, "conn", "loop connection")?)?;
        return Ok(Connection::Loop {
            var,
            start,
            end,
            body: Box::new(body),
        });
    }
    Err("unrecognized connection form".to_string())
}
