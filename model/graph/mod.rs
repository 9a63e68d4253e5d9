/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graph data structures for the mind-map canvas.
//!
//! Core structures:
//! - `Graph`: main container backed by petgraph::StableGraph
//! - `Node`: canvas rectangle with stable UUID and typed content
//! - `NodeContent`: tagged content union (text, code document, media, ...)
//! - `EdgePayload`: parent-to-child link identity and attachment stamp
//!
//! Boundary: direct mutation methods are `pub(crate)` — callers outside the
//! reducer path are single-write-path invariant violations.

use euclid::default::{Point2D, Size2D};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Stable node handle (petgraph NodeIndex — survives other deletions)
pub type NodeKey = NodeIndex;

/// Stable edge handle
pub type EdgeKey = EdgeIndex;

/// Width floor enforced by every resize path.
pub const MIN_NODE_WIDTH: f32 = 200.0;
/// Height floor enforced by every resize path.
pub const MIN_NODE_HEIGHT: f32 = 100.0;

/// Typed node content.
///
/// The serialized form is internally tagged so stored projects stay readable
/// and diffable; the tag strings are stable and shared with node references
/// in conversation transcripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeContent {
    /// Plain text, the default for new nodes.
    Text { text: String },
    /// Raster image as a data URL.
    Image { data_url: String },
    /// Embedded YouTube player.
    Youtube { video_id: String },
    /// Embedded external page.
    Website { url: String },
    /// Self-contained HTML document rendered in a sandboxed frame.
    Code { html: String },
    /// Audio player pointed at a source URL.
    Audio { source_url: String },
    /// Video player pointed at a source URL.
    Video { source_url: String },
    /// Placeholder shown while a generation request is in flight.
    Loading { prompt: String },
    /// Search answer with the query that produced it.
    SearchResult { query: String, body: String },
    /// Live screen share surface.
    Screen,
}

impl NodeContent {
    /// Stable string tag for this content kind.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            NodeContent::Text { .. } => "text",
            NodeContent::Image { .. } => "image",
            NodeContent::Youtube { .. } => "youtube",
            NodeContent::Website { .. } => "website",
            NodeContent::Code { .. } => "code",
            NodeContent::Audio { .. } => "audio",
            NodeContent::Video { .. } => "video",
            NodeContent::Loading { .. } => "loading",
            NodeContent::SearchResult { .. } => "search_result",
            NodeContent::Screen => "screen",
        }
    }

    /// Primary payload string, used when a node is referenced in chat.
    /// Callers truncate; this returns the full text.
    pub fn summary(&self) -> &str {
        match self {
            NodeContent::Text { text } => text,
            NodeContent::Image { data_url } => data_url,
            NodeContent::Youtube { video_id } => video_id,
            NodeContent::Website { url } => url,
            NodeContent::Code { html } => html,
            NodeContent::Audio { source_url } => source_url,
            NodeContent::Video { source_url } => source_url,
            NodeContent::Loading { prompt } => prompt,
            NodeContent::SearchResult { body, .. } => body,
            NodeContent::Screen => "",
        }
    }

    /// Empty content of the kind named by a stable tag, seeded the way
    /// interactive creation seeds it. `None` for an unknown tag.
    pub fn default_for_kind(tag: &str) -> Option<Self> {
        match tag {
            "text" => Some(NodeContent::Text {
                text: String::new(),
            }),
            "image" => Some(NodeContent::Image {
                data_url: String::new(),
            }),
            "youtube" => Some(NodeContent::Youtube {
                video_id: String::new(),
            }),
            "website" => Some(NodeContent::Website { url: String::new() }),
            "code" => Some(NodeContent::Code {
                html: "// Start coding...".to_string(),
            }),
            "audio" => Some(NodeContent::Audio {
                source_url: String::new(),
            }),
            "video" => Some(NodeContent::Video {
                source_url: String::new(),
            }),
            "loading" => Some(NodeContent::Loading {
                prompt: String::new(),
            }),
            "search_result" => Some(NodeContent::SearchResult {
                query: String::new(),
                body: String::new(),
            }),
            "screen" => Some(NodeContent::Screen),
            _ => None,
        }
    }

    /// Default rectangle for a node of this kind created by hand on the
    /// canvas. Tool-created nodes get their sizes from the orchestrator.
    pub fn interactive_default_size(&self) -> Size2D<f32> {
        match self {
            NodeContent::Text { .. } => Size2D::new(250.0, 120.0),
            NodeContent::Code { .. } => Size2D::new(450.0, 300.0),
            NodeContent::Youtube { .. } => Size2D::new(320.0, 350.0),
            NodeContent::Website { .. } => Size2D::new(400.0, 300.0),
            NodeContent::Video { .. } => Size2D::new(320.0, 240.0),
            NodeContent::Screen => Size2D::new(480.0, 270.0),
            _ => Size2D::new(300.0, 200.0),
        }
    }
}

/// A rectangle on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identity, survives persistence round trips
    pub id: Uuid,
    /// Top-left corner in logical canvas space
    pub origin: Point2D<f32>,
    /// Extent in logical units
    pub size: Size2D<f32>,
    /// What the node displays
    pub content: NodeContent,
}

/// Link payload. Edges run parent -> child; the UUID keys the edge across
/// persistence round trips.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePayload {
    pub id: Uuid,
    /// Attachment stamp. StableGraph reuses freed edge indices, so index
    /// order is not attachment order; readers sort by this instead.
    seq: u64,
}

/// View of one edge for iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView {
    pub from: NodeKey,
    pub to: NodeKey,
    pub id: Uuid,
}

/// Node in serialized form. UUIDs travel as strings so stored projects stay
/// greppable; rows with an unparseable id are dropped on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub node_id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub content: NodeContent,
}

/// Edge in serialized form, endpoints referenced by node UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEdge {
    pub edge_id: String,
    pub from_node_id: String,
    pub to_node_id: String,
}

/// Serializable image of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<PersistedNode>,
    pub edges: Vec<PersistedEdge>,
}

/// Main graph container.
pub struct Graph {
    /// The underlying petgraph structure
    inner: StableGraph<Node, EdgePayload, Directed>,
    /// Stable-UUID secondary index
    id_to_node: HashMap<Uuid, NodeKey>,
    /// Next attachment stamp, monotonic over the graph's lifetime.
    next_edge_seq: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            inner: StableGraph::new(),
            id_to_node: HashMap::new(),
            next_edge_seq: 0,
        }
    }

    // Single-write-path boundary: graph topology mutators are crate-internal.
    // Callers outside the reducer path are invariant violations.

    /// Add a new node to the graph
    pub(crate) fn add_node(
        &mut self,
        content: NodeContent,
        origin: Point2D<f32>,
        size: Size2D<f32>,
    ) -> NodeKey {
        self.add_node_with_id(Uuid::new_v4(), content, origin, size)
    }

    /// Add a node with a pre-existing UUID.
    pub(crate) fn add_node_with_id(
        &mut self,
        id: Uuid,
        content: NodeContent,
        origin: Point2D<f32>,
        size: Size2D<f32>,
    ) -> NodeKey {
        let key = self.inner.add_node(Node {
            id,
            origin,
            size,
            content,
        });
        self.id_to_node.insert(id, key);
        key
    }

    /// Remove a node and all its connected edges
    pub(crate) fn remove_node(&mut self, key: NodeKey) -> bool {
        if let Some(node) = self.inner.remove_node(key) {
            self.id_to_node.remove(&node.id);
            true
        } else {
            false
        }
    }

    /// Move a node's top-left corner. Returns false if the node is gone.
    pub(crate) fn move_node(&mut self, key: NodeKey, origin: Point2D<f32>) -> bool {
        let Some(node) = self.inner.node_weight_mut(key) else {
            return false;
        };
        node.origin = origin;
        true
    }

    /// Resize a node, clamping to the minimum rectangle.
    pub(crate) fn resize_node(&mut self, key: NodeKey, size: Size2D<f32>) -> bool {
        let Some(node) = self.inner.node_weight_mut(key) else {
            return false;
        };
        node.size = Size2D::new(
            size.width.max(MIN_NODE_WIDTH),
            size.height.max(MIN_NODE_HEIGHT),
        );
        true
    }

    /// Replace a node's content in place, keeping identity and edges.
    /// This is how a loading placeholder becomes a finished document.
    pub(crate) fn set_node_content(&mut self, key: NodeKey, content: NodeContent) -> bool {
        let Some(node) = self.inner.node_weight_mut(key) else {
            return false;
        };
        node.content = content;
        true
    }

    /// Add an edge between two nodes
    pub(crate) fn add_edge(&mut self, from: NodeKey, to: NodeKey) -> Option<EdgeKey> {
        self.add_edge_with_id(Uuid::new_v4(), from, to)
    }

    /// Add an edge with a pre-existing UUID.
    pub(crate) fn add_edge_with_id(
        &mut self,
        id: Uuid,
        from: NodeKey,
        to: NodeKey,
    ) -> Option<EdgeKey> {
        if !self.inner.contains_node(from) || !self.inner.contains_node(to) {
            return None;
        }
        let seq = self.next_edge_seq;
        self.next_edge_seq += 1;
        Some(self.inner.add_edge(from, to, EdgePayload { id, seq }))
    }

    /// Remove every edge running `from -> to`. Returns how many went.
    /// The interactive link path calls this before inserting, so re-linking
    /// an already linked pair replaces the edge instead of stacking one.
    pub(crate) fn remove_edges_between(&mut self, from: NodeKey, to: NodeKey) -> usize {
        let doomed: Vec<EdgeKey> = self
            .inner
            .edge_references()
            .filter(|e| e.source() == from && e.target() == to)
            .map(|e| e.id())
            .collect();
        let count = doomed.len();
        for key in doomed {
            self.inner.remove_edge(key);
        }
        count
    }

    /// Get a node by key
    pub fn get_node(&self, key: NodeKey) -> Option<&Node> {
        self.inner.node_weight(key)
    }

    /// Get a node by UUID.
    pub fn get_node_by_id(&self, id: Uuid) -> Option<(NodeKey, &Node)> {
        let key = *self.id_to_node.get(&id)?;
        Some((key, self.inner.node_weight(key)?))
    }

    /// Get node key by UUID.
    pub fn get_node_key_by_id(&self, id: Uuid) -> Option<NodeKey> {
        self.id_to_node.get(&id).copied()
    }

    /// Iterate over all nodes as (key, node) pairs
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.inner
            .node_indices()
            .map(move |idx| (idx, &self.inner[idx]))
    }

    /// Iterate over all edges in attachment order
    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        let mut refs: Vec<_> = self.inner.edge_references().collect();
        refs.sort_by_key(|e| e.weight().seq);
        refs.into_iter().map(|e| EdgeView {
            from: e.source(),
            to: e.target(),
            id: e.weight().id,
        })
    }

    /// Children of a node, in attachment order.
    ///
    /// petgraph's neighbor iterator walks newest-first and freed edge
    /// indices get reused, so neither gives the order children were
    /// attached in; sort by the attachment stamp.
    pub fn children_of(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut children: Vec<(u64, NodeKey)> = self
            .inner
            .edges_directed(key, Direction::Outgoing)
            .map(|e| (e.weight().seq, e.target()))
            .collect();
        children.sort_by_key(|(seq, _)| *seq);
        children.into_iter().map(|(_, child)| child).collect()
    }

    /// Parent of a node: source of the earliest-attached inbound edge, if any.
    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.inner
            .edges_directed(key, Direction::Incoming)
            .min_by_key(|e| e.weight().seq)
            .map(|e| e.source())
    }

    /// Check if a directed edge exists from `from` to `to`
    pub fn has_edge_between(&self, from: NodeKey, to: NodeKey) -> bool {
        self.inner.find_edge(from, to).is_some()
    }

    /// Count of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Count of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Serialize the graph to a persistable snapshot
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|(_, node)| PersistedNode {
                node_id: node.id.to_string(),
                x: node.origin.x,
                y: node.origin.y,
                width: node.size.width,
                height: node.size.height,
                content: node.content.clone(),
            })
            .collect();

        let edges = self
            .edges()
            .map(|edge| {
                let from_node_id = self
                    .get_node(edge.from)
                    .map(|n| n.id.to_string())
                    .unwrap_or_default();
                let to_node_id = self
                    .get_node(edge.to)
                    .map(|n| n.id.to_string())
                    .unwrap_or_default();
                PersistedEdge {
                    edge_id: edge.id.to_string(),
                    from_node_id,
                    to_node_id,
                }
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }

    /// Rebuild a graph from a persisted snapshot
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut graph = Graph::new();

        for pnode in &snapshot.nodes {
            let Ok(node_id) = Uuid::parse_str(&pnode.node_id) else {
                continue;
            };
            graph.add_node_with_id(
                node_id,
                pnode.content.clone(),
                Point2D::new(pnode.x, pnode.y),
                Size2D::new(pnode.width, pnode.height),
            );
        }

        for pedge in &snapshot.edges {
            let from_key = Uuid::parse_str(&pedge.from_node_id)
                .ok()
                .and_then(|id| graph.get_node_key_by_id(id));
            let to_key = Uuid::parse_str(&pedge.to_node_id)
                .ok()
                .and_then(|id| graph.get_node_key_by_id(id));
            let edge_id = Uuid::parse_str(&pedge.edge_id).unwrap_or_else(|_| Uuid::new_v4());
            if let (Some(from), Some(to)) = (from_key, to_key) {
                let _ = graph.add_edge_with_id(edge_id, from, to);
            }
        }

        graph
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
