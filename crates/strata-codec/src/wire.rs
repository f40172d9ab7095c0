use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use strata_types::{Anchor, AnchorId, NodeIx, PayloadGraph, PayloadNode, Value};

use crate::error::{CodecError, CodecResult};

/// Current wire format version, written as the first byte of every blob.
pub const FORMAT_VERSION: u8 = 1;

/// Key under which a blob is stored in key-value tiers: `anchor:<uuid>`.
pub fn cache_key(id: AnchorId) -> String {
    format!("anchor:{id}")
}

/// Flattened anchor as it appears on the wire (after the version byte).
#[derive(Serialize, Deserialize)]
struct WireAnchor {
    id: AnchorId,
    persistent: bool,
    root: u32,
    nodes: Vec<WireNode>,
}

#[derive(Serialize, Deserialize)]
struct WireNode {
    fields: Vec<(String, WireValue)>,
}

/// Wire form of a field value. `Node` carries a back-pointer index into
/// the reference table instead of an arena index.
#[derive(Serialize, Deserialize)]
enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<WireValue>),
    Node(u32),
    Anchor(AnchorId),
}

/// Encode an anchor into a binary blob.
///
/// The payload graph is walked from the root; each node is assigned a
/// compact table index on first visit, and any later reference to it is
/// emitted as that index. Cycles therefore terminate, and arena nodes
/// unreachable from the root are dropped from the blob.
pub fn encode(anchor: &Anchor) -> CodecResult<Vec<u8>> {
    let graph = &anchor.payload;

    // Pass 1: assign table slots in first-visit order.
    let mut assigned: HashMap<u32, u32> = HashMap::new();
    let mut order: Vec<NodeIx> = Vec::new();
    let mut stack = vec![graph.root()];
    while let Some(ix) = stack.pop() {
        if assigned.contains_key(&ix.index()) {
            continue;
        }
        let node = graph.node(ix).ok_or(CodecError::InvalidNodeRef {
            index: ix.index(),
            len: graph.len(),
        })?;
        assigned.insert(ix.index(), order.len() as u32);
        order.push(ix);
        for (_, value) in &node.fields {
            collect_node_refs(value, &mut stack);
        }
    }

    // Pass 2: remap every reference through the table.
    let mut nodes = Vec::with_capacity(order.len());
    for ix in &order {
        let node = graph.node(*ix).ok_or(CodecError::InvalidNodeRef {
            index: ix.index(),
            len: graph.len(),
        })?;
        let mut fields = Vec::with_capacity(node.fields.len());
        for (name, value) in &node.fields {
            fields.push((name.clone(), remap(value, &assigned, graph.len())?));
        }
        nodes.push(WireNode { fields });
    }

    let wire = WireAnchor {
        id: anchor.id,
        persistent: anchor.persistent,
        root: 0, // the root is always visited first
        nodes,
    };
    let body = bincode::serialize(&wire).map_err(|e| CodecError::Encode(e.to_string()))?;

    let mut blob = Vec::with_capacity(1 + body.len());
    blob.push(FORMAT_VERSION);
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Decode a blob back into an anchor.
///
/// Fails loudly on an unknown version byte, a truncated body, or any
/// node reference outside the table. No partial recovery is attempted.
pub fn decode(blob: &[u8]) -> CodecResult<Anchor> {
    let (&version, body) = blob
        .split_first()
        .ok_or_else(|| CodecError::Decode("empty blob".to_string()))?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let wire: WireAnchor =
        bincode::deserialize(body).map_err(|e| CodecError::Decode(e.to_string()))?;
    let len = wire.nodes.len();

    let mut nodes = Vec::with_capacity(len);
    for wire_node in wire.nodes {
        let mut fields = Vec::with_capacity(wire_node.fields.len());
        for (name, value) in wire_node.fields {
            fields.push((name, unmap(value, len)?));
        }
        nodes.push(PayloadNode { fields });
    }

    let payload = PayloadGraph::from_parts(nodes, wire.root)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(Anchor {
        id: wire.id,
        persistent: wire.persistent,
        payload,
    })
}

/// Push every node reference inside `value` (including nested lists).
fn collect_node_refs(value: &Value, stack: &mut Vec<NodeIx>) {
    match value {
        Value::Node(ix) => stack.push(*ix),
        Value::List(items) => {
            for item in items {
                collect_node_refs(item, stack);
            }
        }
        _ => {}
    }
}

fn remap(value: &Value, assigned: &HashMap<u32, u32>, len: usize) -> CodecResult<WireValue> {
    Ok(match value {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Int(i) => WireValue::Int(*i),
        Value::Float(f) => WireValue::Float(*f),
        Value::Text(s) => WireValue::Text(s.clone()),
        Value::Bytes(b) => WireValue::Bytes(b.clone()),
        Value::List(items) => WireValue::List(
            items
                .iter()
                .map(|item| remap(item, assigned, len))
                .collect::<CodecResult<_>>()?,
        ),
        Value::Node(ix) => WireValue::Node(*assigned.get(&ix.index()).ok_or(
            CodecError::InvalidNodeRef {
                index: ix.index(),
                len,
            },
        )?),
        Value::Anchor(id) => WireValue::Anchor(*id),
    })
}

fn unmap(value: WireValue, len: usize) -> CodecResult<Value> {
    Ok(match value {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(b),
        WireValue::Int(i) => Value::Int(i),
        WireValue::Float(f) => Value::Float(f),
        WireValue::Text(s) => Value::Text(s),
        WireValue::Bytes(b) => Value::Bytes(b),
        WireValue::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| unmap(item, len))
                .collect::<CodecResult<_>>()?,
        ),
        WireValue::Node(index) => {
            if index as usize >= len {
                return Err(CodecError::InvalidNodeRef { index, len });
            }
            Value::Node(NodeIx::from_index(index))
        }
        WireValue::Anchor(id) => Value::Anchor(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::PayloadGraph;

    fn flat_anchor() -> Anchor {
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        payload.set_field(root, "name", Value::Text("alpha".into())).unwrap();
        payload.set_field(root, "count", Value::Int(42)).unwrap();
        payload.set_field(root, "raw", Value::Bytes(vec![0, 1, 2])).unwrap();
        Anchor::new(payload).persist()
    }

    #[test]
    fn cache_key_is_namespaced() {
        let id = AnchorId::new();
        assert_eq!(cache_key(id), format!("anchor:{id}"));
    }

    #[test]
    fn flat_roundtrip() {
        let anchor = flat_anchor();
        let blob = encode(&anchor).unwrap();
        let decoded = decode(&blob).unwrap();
        assert_eq!(decoded.id, anchor.id);
        assert!(decoded.persistent);
        assert_eq!(decoded.payload, anchor.payload);
    }

    #[test]
    fn cyclic_payload_roundtrip() {
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        let child = payload.add_node();
        payload.set_field(root, "child", Value::Node(child)).unwrap();
        payload.set_field(child, "parent", Value::Node(root)).unwrap();
        payload.set_field(child, "label", Value::Text("loop".into())).unwrap();
        let anchor = Anchor::new(payload);

        let decoded = decode(&encode(&anchor).unwrap()).unwrap();
        assert_eq!(decoded.id, anchor.id);

        // The cycle must survive: root -> child -> root.
        let g = &decoded.payload;
        let Some(Value::Node(child)) = g.field(g.root(), "child") else {
            panic!("missing child ref");
        };
        let Some(Value::Node(back)) = g.field(*child, "parent") else {
            panic!("missing parent ref");
        };
        assert_eq!(*back, g.root());
        assert_eq!(g.field(*child, "label"), Some(&Value::Text("loop".into())));
    }

    #[test]
    fn self_reference_roundtrip() {
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        payload.set_field(root, "me", Value::Node(root)).unwrap();
        let anchor = Anchor::new(payload);

        let decoded = decode(&encode(&anchor).unwrap()).unwrap();
        let g = &decoded.payload;
        assert_eq!(g.field(g.root(), "me"), Some(&Value::Node(g.root())));
    }

    #[test]
    fn cross_anchor_references_survive() {
        // Anchor A references anchor B, and B references A, by identity.
        let a_id = AnchorId::new();
        let b_id = AnchorId::new();

        let mut a_payload = PayloadGraph::new();
        a_payload.set_field(a_payload.root(), "peer", Value::Anchor(b_id)).unwrap();
        let a = Anchor::with_id(a_id, a_payload);

        let mut b_payload = PayloadGraph::new();
        b_payload.set_field(b_payload.root(), "peer", Value::Anchor(a_id)).unwrap();
        let b = Anchor::with_id(b_id, b_payload);

        let a2 = decode(&encode(&a).unwrap()).unwrap();
        let b2 = decode(&encode(&b).unwrap()).unwrap();
        assert_eq!(a2.payload.field(a2.payload.root(), "peer"), Some(&Value::Anchor(b_id)));
        assert_eq!(b2.payload.field(b2.payload.root(), "peer"), Some(&Value::Anchor(a_id)));
    }

    #[test]
    fn unreachable_nodes_are_dropped() {
        let mut payload = PayloadGraph::new();
        let orphan = payload.add_node();
        payload.set_field(orphan, "never", Value::Int(-1)).unwrap();
        let anchor = Anchor::new(payload);

        let decoded = decode(&encode(&anchor).unwrap()).unwrap();
        assert_eq!(decoded.payload.len(), 1);
    }

    #[test]
    fn nested_list_refs_roundtrip() {
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        let a = payload.add_node();
        let b = payload.add_node();
        payload.set_field(a, "n", Value::Int(1)).unwrap();
        payload.set_field(b, "n", Value::Int(2)).unwrap();
        payload.set_field(
            root,
            "children",
            Value::List(vec![
                Value::Node(a),
                Value::List(vec![Value::Node(b), Value::Null]),
            ]),
        );
        let anchor = Anchor::new(payload);

        let decoded = decode(&encode(&anchor).unwrap()).unwrap();
        assert_eq!(decoded.payload.len(), 3);
        let g = &decoded.payload;
        let Some(Value::List(items)) = g.field(g.root(), "children") else {
            panic!("missing list");
        };
        let Value::Node(a2) = items[0] else { panic!() };
        assert_eq!(g.field(a2, "n"), Some(&Value::Int(1)));
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let anchor = flat_anchor();
        let mut blob = encode(&anchor).unwrap();
        blob[0] = 99;
        let err = decode(&blob).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(99)));
    }

    #[test]
    fn decode_rejects_truncated_blob() {
        let anchor = flat_anchor();
        let blob = encode(&anchor).unwrap();
        assert!(matches!(
            decode(&blob[..blob.len() / 2]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(decode(&[]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn encode_rejects_dangling_node_ref() {
        let mut payload = PayloadGraph::new();
        let root = payload.root();
        payload.set_field(root, "bad", Value::Node(NodeIx::from_index(999))).unwrap();
        let anchor = Anchor::new(payload);
        assert!(matches!(
            encode(&anchor),
            Err(CodecError::InvalidNodeRef { index: 999, .. })
        ));
    }

    #[test]
    fn encode_is_deterministic() {
        let anchor = flat_anchor();
        assert_eq!(encode(&anchor).unwrap(), encode(&anchor).unwrap());
    }
}
