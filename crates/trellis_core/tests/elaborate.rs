// End-to-end elaboration scenarios: JSON description in, graph out.

use trellis_core::{compact, elaborate, Error, Graph, NetworkDefinition, NodeKind};

fn build(text: &str) -> Graph {
    let def = NetworkDefinition::from_json(text).unwrap();
    elaborate(&def).unwrap()
}

fn build_compacted(text: &str) -> Graph {
    compact(build(text)).unwrap()
}

fn kind_count(g: &Graph, kind: NodeKind) -> usize {
    g.node_indices().filter(|&i| g.node(i).kind == kind).count()
}

const RING: &str = r#"[
    { "simplemodule": { "name": "host", "gates": [ { "g": "2" } ] } },
    { "module": {
        "name": "net",
        "submodules": [ { "name": "n", "module": "host", "size": "cnt" } ],
        "connections": [
            { "loop": "i", "start": "0", "end": "cnt",
              "conn": { "from": "n[i].g[0]", "to": "n[(i+1)%cnt].g[1]" } }
        ]
    } },
    { "network": { "module": "net", "params": [ { "cnt": "4" } ] } }
]"#;

#[test]
fn single_node_network() {
    let text = r#"[
        { "simplemodule": { "name": "host" } },
        { "network": { "module": "host" } }
    ]"#;
    let g = build(text);
    assert_eq!(g.node_count(), 1);
    assert_eq!(g.edge_count(), 0);
    assert_eq!(g.to_dot(true), "graph g {\nn0 [label=\"network\"];\n}\n");
    // An isolated node has nothing left after compaction.
    assert_eq!(compact(g).unwrap().to_dot(true), "graph g {\n}\n");
}

#[test]
fn dyad_wires_through_simple_gates() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "submodules": [
                { "name": "a", "module": "host" },
                { "name": "b", "module": "host" }
            ],
            "connections": [ { "from": "a.g", "to": "b.g" } ]
        } },
        { "network": { "module": "net" } }
    ]"#;

    let g = build(text);
    // network.a -- network.a.g -- network.b.g -- network.b
    assert_eq!(g.node_count(), 4);
    assert_eq!(g.edge_count(), 3);
    let ag = g.find_node("network.a.g").unwrap();
    let bg = g.find_node("network.b.g").unwrap();
    assert!(g.are_adjacent(ag, bg));

    let g = compact(g).unwrap();
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
    let a = g.find_node("network.a").unwrap();
    let b = g.find_node("network.b").unwrap();
    assert!(g.are_adjacent(a, b));
}

#[test]
fn gate_counting_law_for_plain_copies() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "2" } ] } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "h", "module": "host", "size": "3" } ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    // N * (1 + gates) nodes and N * gates edges.
    assert_eq!(g.node_count(), 9);
    assert_eq!(g.edge_count(), 6);
    assert_eq!(kind_count(&g, NodeKind::Node), 3);
    assert!(g.find_node("network.h[2].g[1]").is_some());
}

#[test]
fn loop_ring_of_four() {
    let g = build_compacted(RING);
    assert_eq!(g.node_count(), 4);
    assert_eq!(g.edge_count(), 4);
    for i in 0..4 {
        let n = g.find_node(&format!("network.n[{i}]")).unwrap();
        let next = g.find_node(&format!("network.n[{}]", (i + 1) % 4)).unwrap();
        assert_eq!(g.degree(n), 2);
        assert!(g.are_adjacent(n, next));
    }
}

#[test]
fn elaboration_is_deterministic() {
    let def = NetworkDefinition::from_json(RING).unwrap();
    let first = elaborate(&def).unwrap();
    let second = elaborate(&def).unwrap();
    assert_eq!(first.to_dot(true), second.to_dot(true));
    assert_eq!(
        compact(first).unwrap().to_dot(true),
        compact(second).unwrap().to_dot(true)
    );
}

#[test]
fn conditional_submodule_takes_the_else_branch() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "params": [ { "big": "0" } ],
            "submodules": [
                { "if": "big",
                  "then": { "name": "h", "module": "host", "size": "8" },
                  "else": { "name": "h", "module": "host", "size": "2" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build_compacted(text);
    assert_eq!(kind_count(&g, NodeKind::Node), 2);
    assert_eq!(g.node_count(), 2);
}

#[test]
fn conditional_submodule_takes_the_then_branch() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "params": [ { "big": "1" } ],
            "submodules": [
                { "if": "big",
                  "then": { "name": "h", "module": "host", "size": "8" },
                  "else": { "name": "h", "module": "host", "size": "2" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    assert_eq!(kind_count(&build_compacted(text), NodeKind::Node), 8);
}

#[test]
fn cartesian_product_of_two_rings_of_three() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "2" } ] } },
        { "module": {
            "name": "ring",
            "submodules": [ { "name": "n", "module": "host", "size": "3" } ],
            "connections": [
                { "loop": "i", "start": "0", "end": "3",
                  "conn": { "from": "n[i].g[0]", "to": "n[(i+1)%3].g[1]" } }
            ]
        } },
        { "module": {
            "name": "net",
            "submodules": [
                { "cartesian": [
                    { "name": "a", "module": "ring" },
                    { "name": "b", "module": "ring" }
                ] }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    assert_eq!(g.node_count(), 9);
    assert_eq!(g.edge_count(), 18);
    assert!(g.find_node("network.(a.n[0],b.n[2])").is_some());

    // Already gate-free; compaction preserves the product.
    let g = compact(g).unwrap();
    assert_eq!(g.node_count(), 9);
    assert_eq!(g.edge_count(), 18);
}

#[test]
fn root_product_attaches_a_copy_per_vertex() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "chain",
            "submodules": [ { "name": "n", "module": "host", "size": "2" } ],
            "connections": [ { "from": "n[0].g", "to": "n[1].g" } ]
        } },
        { "module": {
            "name": "net",
            "submodules": [
                { "root": "b.n[0]", "rooted": [
                    { "name": "a", "module": "chain" },
                    { "name": "b", "module": "chain" }
                ] }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    assert_eq!(g.node_count(), 4);
    assert_eq!(g.edge_count(), 3);
    let across = (
        g.find_node("network.(a.n[0],b.n[0])").unwrap(),
        g.find_node("network.(a.n[1],b.n[0])").unwrap(),
    );
    assert!(g.are_adjacent(across.0, across.1));
}

#[test]
fn unknown_root_vertex_is_an_error() {
    let text = r#"[
        { "simplemodule": { "name": "host" } },
        { "module": {
            "name": "net",
            "submodules": [
                { "root": "nowhere", "rooted": [
                    { "name": "a", "module": "host" },
                    { "name": "b", "module": "host" }
                ] }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let def = NetworkDefinition::from_json(text).unwrap();
    assert!(matches!(elaborate(&def), Err(Error::Root(_))));
}

#[test]
fn bare_node_connections_allocate_fresh_auto_gates() {
    let text = r#"[
        { "simplemodule": { "name": "peer" } },
        { "module": {
            "name": "net",
            "submodules": [
                { "name": "a", "module": "peer" },
                { "name": "b", "module": "peer" }
            ],
            "connections": [
                { "from": "a", "to": "b" },
                { "from": "a", "to": "b" }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    assert!(g.find_node("network.a._auto[0]").is_some());
    assert!(g.find_node("network.a._auto[1]").is_some());
    assert!(g.find_node("network.b._auto[1]").is_some());

    // Both parallel chains contract onto the same deduplicated edge.
    let g = compact(g).unwrap();
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn empty_loop_produces_no_iterations() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "n", "module": "host", "size": "2" } ],
            "connections": [
                { "loop": "i", "start": "2", "end": "2",
                  "conn": { "from": "n[0].g", "to": "n[1].g" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    // Gate edges only; the loop body never ran.
    assert_eq!(g.edge_count(), 2);
}

#[test]
fn reversed_loop_bounds_are_an_error() {
    let text = r#"[
        { "simplemodule": { "name": "host" } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "n", "module": "host", "size": "2" } ],
            "connections": [
                { "loop": "i", "start": "3", "end": "1",
                  "conn": { "from": "n[0]", "to": "n[1]" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let def = NetworkDefinition::from_json(text).unwrap();
    assert!(matches!(
        elaborate(&def),
        Err(Error::Loop { start: 3, end: 1 })
    ));
}

#[test]
fn all_match_fully_connects_the_selection() {
    let text = r#"[
        { "simplemodule": { "name": "peer" } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "h", "module": "peer", "size": "3" } ],
            "connections": [ { "all-match": "h\\[", "attributes": "w=1" } ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build_compacted(text);
    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 3);
    let a = g.find_node("network.h[0]").unwrap();
    let b = g.find_node("network.h[1]").unwrap();
    assert_eq!(g.edge_attr(a, b), Some("w=1"));
}

#[test]
fn all_match_without_matches_is_not_an_error() {
    let text = r#"[
        { "simplemodule": { "name": "peer" } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "h", "module": "peer", "size": "2" } ],
            "connections": [ { "all-match": "no_such_name" } ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let g = build(text);
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn replacement_rewires_onto_the_successor() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "simplemodule": { "name": "relay", "gates": [ { "g": "0" } ],
                            "attributes": "shape=diamond" } },
        { "module": {
            "name": "net",
            "submodules": [
                { "name": "a", "module": "host" },
                { "name": "b", "module": "host" }
            ],
            "connections": [ { "from": "a.g", "to": "b.g" } ],
            "replace": [
                { "nodes": "network\\.a$", "with": { "name": "a", "module": "relay" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;

    let g = build(text);
    // The successor took over the old identity's edges.
    let successor = g.find_node("network.a").unwrap();
    assert_eq!(g.node(successor).attributes.as_deref(), Some("shape=diamond"));
    assert!(g.edge_count() > 0);

    let g = compact(g).unwrap();
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
    let a = g.find_node("network.a").unwrap();
    let b = g.find_node("network.b").unwrap();
    assert!(g.are_adjacent(a, b));
    assert_eq!(g.node(a).attributes.as_deref(), Some("shape=diamond"));
}

#[test]
fn replacement_without_successor_demotes_the_node() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "simplemodule": { "name": "relay", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "submodules": [
                { "name": "a", "module": "host" },
                { "name": "b", "module": "host" }
            ],
            "connections": [ { "from": "a.g", "to": "b.g" } ],
            "replace": [
                { "nodes": "network\\.a$", "with": { "name": "c", "module": "relay" } }
            ]
        } },
        { "network": { "module": "net" } }
    ]"#;

    let g = build(text);
    // The old node is invisible to lookups and serialization.
    assert!(g.find_node("network.a").is_none());
    assert!(!g.to_dot(true).contains("label=\"network.a\""));
    assert!(g.find_node("network.c").is_some());

    // Its chains die with it: only the fresh node and its disconnected
    // neighbor survive compaction.
    let g = compact(g).unwrap();
    assert_eq!(g.edge_count(), 0);
    assert!(g.find_node("network.b").is_some());
    assert!(g.find_node("network.c").is_some());
}

#[test]
fn missing_network_entry_is_an_error() {
    let def = NetworkDefinition::from_json(
        r#"[ { "simplemodule": { "name": "host" } } ]"#,
    )
    .unwrap();
    assert!(matches!(elaborate(&def), Err(Error::NoNetwork)));
}

#[test]
fn unknown_module_is_an_error() {
    let def = NetworkDefinition::from_json(
        r#"[ { "network": { "module": "ghost" } } ]"#,
    )
    .unwrap();
    assert!(matches!(elaborate(&def), Err(Error::NoModule(name)) if name == "ghost"));
}

#[test]
fn unresolvable_endpoint_is_an_error() {
    let text = r#"[
        { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } },
        { "module": {
            "name": "net",
            "submodules": [ { "name": "a", "module": "host" } ],
            "connections": [ { "from": "a.g", "to": "z.g" } ]
        } },
        { "network": { "module": "net" } }
    ]"#;
    let def = NetworkDefinition::from_json(text).unwrap();
    assert!(matches!(
        elaborate(&def),
        Err(Error::Conn { to, .. }) if to == "network.z.g"
    ));
}

#[test]
fn definitions_merge_across_inputs() {
    let mut def = NetworkDefinition::from_json(
        r#"[ { "simplemodule": { "name": "host", "gates": [ { "g": "0" } ] } } ]"#,
    )
    .unwrap();
    def.merge_json(
        r#"[
            { "module": {
                "name": "net",
                "submodules": [
                    { "name": "a", "module": "host" },
                    { "name": "b", "module": "host" }
                ],
                "connections": [ { "from": "a.g", "to": "b.g" } ]
            } },
            { "network": { "module": "net" } }
        ]"#,
    )
    .unwrap();

    let g = compact(elaborate(&def).unwrap()).unwrap();
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn network_params_flow_into_expansion() {
    // RING sizes itself from the `cnt` binding supplied by the network entry.
    let g = build(RING);
    assert_eq!(kind_count(&g, NodeKind::Node), 4);
    assert_eq!(kind_count(&g, NodeKind::Gate), 8);

    let shrunk = RING.replace("\"cnt\": \"4\"", "\"cnt\": \"3\"");
    assert_eq!(kind_count(&build(&shrunk), NodeKind::Node), 3);
}
