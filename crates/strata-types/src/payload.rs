use serde::{Deserialize, Serialize};

use crate::anchor::AnchorId;
use crate::error::TypeError;

/// Index of a node within one [`PayloadGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIx(u32);

impl NodeIx {
    /// The raw index value.
    pub fn index(self) -> u32 {
        self.0
    }

    /// Build an index from a raw value.
    ///
    /// Callers that construct indices by hand (codecs rebuilding a graph)
    /// are responsible for range-checking against the target arena.
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }
}

/// A field value inside a payload graph.
///
/// `Node` references another node of the *same* graph by arena index;
/// this is how back-references and cycles are expressed. `Anchor`
/// references a different anchor by identity and is resolved by the
/// store, never by the codec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Intra-graph reference (may form a cycle).
    Node(NodeIx),
    /// Cross-anchor reference by identity.
    Anchor(AnchorId),
}

/// One node of the payload graph: an ordered list of named fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub fields: Vec<(String, Value)>,
}

impl PayloadNode {
    /// Look up a field by name (first match wins).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// An arena-backed object graph.
///
/// Nodes live in a flat arena and refer to each other by [`NodeIx`], so
/// arbitrary back-references and cycles are representable without shared
/// ownership. A graph always has at least its root node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadGraph {
    nodes: Vec<PayloadNode>,
    root: NodeIx,
}

impl PayloadGraph {
    /// Create a graph containing a single empty root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![PayloadNode::default()],
            root: NodeIx(0),
        }
    }

    /// The designated root node.
    pub fn root(&self) -> NodeIx {
        self.root
    }

    /// Append an empty node to the arena and return its index.
    pub fn add_node(&mut self) -> NodeIx {
        let ix = NodeIx(self.nodes.len() as u32);
        self.nodes.push(PayloadNode::default());
        ix
    }

    /// Set (or overwrite) a named field on a node.
    ///
    /// Out-of-range indices (constructible via [`NodeIx::from_index`])
    /// are rejected rather than panicking.
    pub fn set_field(
        &mut self,
        node: NodeIx,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), TypeError> {
        let len = self.nodes.len();
        let slot = self.nodes.get_mut(node.0 as usize).ok_or(TypeError::InvalidNodeRef {
            index: node.0,
            len,
        })?;
        let name = name.into();
        if let Some(field) = slot.fields.iter_mut().find(|(n, _)| *n == name) {
            field.1 = value;
        } else {
            slot.fields.push((name, value));
        }
        Ok(())
    }

    /// Look up a field on a node.
    pub fn field(&self, node: NodeIx, name: &str) -> Option<&Value> {
        self.node(node).and_then(|n| n.field(name))
    }

    /// The node at `ix`, if in range.
    pub fn node(&self, ix: NodeIx) -> Option<&PayloadNode> {
        self.nodes.get(ix.0 as usize)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a graph has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild a graph from raw parts, validating the root index.
    ///
    /// Used by the codec when decoding; node-reference validation inside
    /// values is the codec's job.
    pub fn from_parts(nodes: Vec<PayloadNode>, root: u32) -> Result<Self, TypeError> {
        if nodes.is_empty() || root as usize >= nodes.len() {
            return Err(TypeError::InvalidNodeRef {
                index: root,
                len: nodes.len(),
            });
        }
        Ok(Self {
            nodes,
            root: NodeIx(root),
        })
    }

    /// The raw node arena, in index order.
    pub fn nodes(&self) -> &[PayloadNode] {
        &self.nodes
    }
}

impl Default for PayloadGraph {
    fn default() -> Self {
        Self::new()
    }
}
