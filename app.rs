/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Workspace state management for the canvas.
//!
//! Core structures:
//! - `Workspace`: the graph, conversation, viewport and selection aggregate
//! - `CanvasIntent`: deterministic mutation intents applied by the reducer
//! - `SelectionState`: selected-node set with ordering and revision metadata
//!
//! Boundary: all graph topology mutation flows through `apply_intent` or the
//! crate-internal helpers the assistant orchestrator shares with it. Shell
//! layers submit intents; they never reach into the graph.

use std::collections::HashSet;
use std::ops::Deref;

use euclid::default::{Point2D, Size2D, Vector2D};
use log::debug;

use crate::layout::{self, NodeRect};
use crate::model::conversation::Conversation;
use crate::model::graph::{Graph, GraphSnapshot, NodeContent, NodeKey};
use crate::services::capture::CaptureLedger;
use crate::viewport::{ContentBounds, Viewport};

/// Selection tracking with explicit change metadata.
///
/// This wraps the selected-node set with insertion order, a primary node and
/// a revision counter so consumers can reason about selection changes
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    nodes: HashSet<NodeKey>,
    order: Vec<NodeKey>,
    primary: Option<NodeKey>,
    revision: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Primary selected node (most recently selected).
    pub fn primary(&self) -> Option<NodeKey> {
        self.primary
    }

    pub fn select(&mut self, key: NodeKey, multi_select: bool) {
        if multi_select {
            if self.nodes.contains(&key) {
                self.nodes.remove(&key);
                self.order.retain(|existing| *existing != key);
                self.primary = self.order.last().copied();
                self.revision = self.revision.saturating_add(1);
            } else if self.nodes.insert(key) {
                self.order.push(key);
                self.primary = Some(key);
                self.revision = self.revision.saturating_add(1);
            }
            return;
        }

        if self.nodes.len() == 1 && self.nodes.contains(&key) && self.primary == Some(key) {
            self.nodes.clear();
            self.order.clear();
            self.primary = None;
            self.revision = self.revision.saturating_add(1);
            return;
        }

        self.nodes.clear();
        self.order.clear();
        self.nodes.insert(key);
        self.order.push(key);
        self.primary = Some(key);
        self.revision = self.revision.saturating_add(1);
    }

    pub fn clear(&mut self) {
        if self.nodes.is_empty() && self.primary.is_none() {
            return;
        }
        self.nodes.clear();
        self.order.clear();
        self.primary = None;
        self.revision = self.revision.saturating_add(1);
    }

}

impl Deref for SelectionState {
    type Target = HashSet<NodeKey>;

    fn deref(&self) -> &Self::Target {
        &self.nodes
    }
}

/// Deterministic mutation intent boundary for workspace state updates.
#[derive(Debug, Clone)]
pub enum CanvasIntent {
    /// Create a node, optionally attached under a parent. With a parent the
    /// whole sibling ring is re-laid-out; without one the node lands
    /// centered in the current viewport.
    AddNode {
        content: NodeContent,
        parent: Option<NodeKey>,
    },
    MoveNode {
        node: NodeKey,
        origin: Point2D<f32>,
    },
    ResizeNode {
        node: NodeKey,
        size: Size2D<f32>,
    },
    /// Replace a node's content, possibly changing its kind.
    SetNodeContent {
        node: NodeKey,
        content: NodeContent,
    },
    RemoveNode {
        node: NodeKey,
    },
    RemoveSelectedNodes,
    /// Interactive re-link: replaces any existing edge on the same ordered
    /// pair instead of stacking a duplicate.
    LinkNodes {
        from: NodeKey,
        to: NodeKey,
    },
    SelectNode {
        node: NodeKey,
        multi_select: bool,
    },
    ClearSelection,
    /// Host window size in screen pixels; drives centering and fit.
    SetViewSize {
        size: Size2D<f32>,
    },
    WheelPan {
        delta: Vector2D<f32>,
    },
    WheelZoom {
        delta_y: f32,
        cursor: Point2D<f32>,
    },
    ZoomIn,
    ZoomOut,
    ResetView,
    FitToContent,
}

/// One canvas project's full mutable state.
pub struct Workspace {
    /// The canvas graph.
    pub graph: Graph,

    /// Chat transcript with the assistant, append-only.
    pub conversation: Conversation,

    /// Screen transform for this workspace's canvas.
    pub viewport: Viewport,

    /// Currently selected nodes (can be multiple).
    pub selected_nodes: SelectionState,

    /// Media-capture capabilities keyed by node id.
    pub captures: CaptureLedger,

    /// Host window size in screen pixels, reported via `SetViewSize`.
    view_size: Size2D<f32>,

    /// True while an assistant exchange is in flight. Cooperative: gates a
    /// second submission, never canvas interaction.
    is_processing: bool,
}

impl Workspace {
    /// View size assumed before the host reports a real one.
    const DEFAULT_VIEW_SIZE: Size2D<f32> = Size2D::new(1280.0, 800.0);

    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            conversation: Conversation::new(),
            viewport: Viewport::new(),
            selected_nodes: SelectionState::new(),
            captures: CaptureLedger::new(),
            view_size: Self::DEFAULT_VIEW_SIZE,
            is_processing: false,
        }
    }

    pub fn view_size(&self) -> Size2D<f32> {
        self.view_size
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Mark an exchange in flight. Returns false when one already is;
    /// callers gate a second chat submission on this, nothing else.
    pub(crate) fn begin_exchange(&mut self) -> bool {
        if self.is_processing {
            return false;
        }
        self.is_processing = true;
        true
    }

    pub(crate) fn finish_exchange(&mut self) {
        self.is_processing = false;
    }

    /// Swap in a persisted project's graph and conversation. Selection,
    /// viewport and capture leases are per-session state and start fresh.
    pub fn restore(&mut self, snapshot: &GraphSnapshot, conversation: Conversation) {
        self.graph = Graph::from_snapshot(snapshot);
        self.conversation = conversation;
        self.selected_nodes.clear();
        self.captures.release_all();
        self.viewport.reset();
        debug!(
            "restored workspace: {} nodes, {} turns",
            self.graph.node_count(),
            self.conversation.len()
        );
    }

    /// Apply a batch of intents deterministically in insertion order.
    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = CanvasIntent>,
    {
        for intent in intents {
            self.apply_intent(intent);
        }
    }

    fn apply_intent(&mut self, intent: CanvasIntent) {
        match intent {
            CanvasIntent::AddNode { content, parent } => {
                let size = content.interactive_default_size();
                let key = self.insert_node(content, size, parent);
                // Select the newly created node.
                self.selected_nodes.select(key, false);
            },
            CanvasIntent::MoveNode { node, origin } => {
                self.graph.move_node(node, origin);
            },
            CanvasIntent::ResizeNode { node, size } => {
                self.graph.resize_node(node, size);
            },
            CanvasIntent::SetNodeContent { node, content } => {
                self.graph.set_node_content(node, content);
            },
            CanvasIntent::RemoveNode { node } => {
                self.remove_node(node);
            },
            CanvasIntent::RemoveSelectedNodes => {
                self.remove_selected_nodes();
            },
            CanvasIntent::LinkNodes { from, to } => {
                self.link_nodes(from, to);
            },
            CanvasIntent::SelectNode { node, multi_select } => {
                self.selected_nodes.select(node, multi_select);
            },
            CanvasIntent::ClearSelection => {
                self.selected_nodes.clear();
            },
            CanvasIntent::SetViewSize { size } => {
                self.view_size = size;
            },
            CanvasIntent::WheelPan { delta } => {
                self.viewport.wheel_pan(delta);
            },
            CanvasIntent::WheelZoom { delta_y, cursor } => {
                self.viewport.wheel_zoom(delta_y, cursor);
            },
            CanvasIntent::ZoomIn => {
                self.viewport.zoom_in();
            },
            CanvasIntent::ZoomOut => {
                self.viewport.zoom_out();
            },
            CanvasIntent::ResetView => {
                self.viewport.reset();
            },
            CanvasIntent::FitToContent => {
                self.fit_view_to_content();
            },
        }
    }

    /// Create a node and wire it under `parent` when given.
    ///
    /// With a live parent the node enters at the parent's origin and the
    /// parent's full child ring is re-laid-out, so existing siblings shift
    /// to make room. Without one (or when the parent is gone) the node lands
    /// centered in the current viewport.
    pub(crate) fn insert_node(
        &mut self,
        content: NodeContent,
        size: Size2D<f32>,
        parent: Option<NodeKey>,
    ) -> NodeKey {
        if let Some(parent_key) = parent {
            if let Some(parent_origin) = self.graph.get_node(parent_key).map(|node| node.origin) {
                let key = self.graph.add_node(content, parent_origin, size);
                self.graph.add_edge(parent_key, key);
                self.relayout_children(parent_key);
                return key;
            }
        }

        let origin = Point2D::new(
            (self.view_size.width / 2.0 - size.width / 2.0 - self.viewport.x)
                / self.viewport.scale,
            (self.view_size.height / 2.0 - size.height / 2.0 - self.viewport.y)
                / self.viewport.scale,
        );
        self.graph.add_node(content, origin, size)
    }

    /// Re-run the radial layout over `parent`'s full child set.
    fn relayout_children(&mut self, parent: NodeKey) {
        let Some(parent_rect) = self.node_rect(parent) else {
            return;
        };
        let grandparent_rect = self
            .graph
            .parent_of(parent)
            .and_then(|key| self.node_rect(key));
        let children: Vec<NodeRect> = self
            .graph
            .children_of(parent)
            .into_iter()
            .filter_map(|key| self.node_rect(key))
            .collect();

        let placements =
            layout::radial_child_layout(&parent_rect, &children, grandparent_rect.as_ref());
        for placement in placements {
            if let Some(key) = self.graph.get_node_key_by_id(placement.id) {
                self.graph.move_node(key, placement.origin);
            }
        }
    }

    fn node_rect(&self, key: NodeKey) -> Option<NodeRect> {
        self.graph.get_node(key).map(|node| NodeRect {
            id: node.id,
            origin: node.origin,
            size: node.size,
        })
    }

    /// Interactive re-link: drop any existing edge on the same ordered pair,
    /// then insert the new one.
    pub(crate) fn link_nodes(&mut self, from: NodeKey, to: NodeKey) {
        if from == to {
            return;
        }
        self.graph.remove_edges_between(from, to);
        self.graph.add_edge(from, to);
    }

    /// Remove one node: revoke its capture capability, cascade its edges,
    /// drop it from the selection.
    pub(crate) fn remove_node(&mut self, node: NodeKey) {
        let Some(node_id) = self.graph.get_node(node).map(|node| node.id) else {
            return;
        };
        self.captures.release_for_node(node_id);
        self.graph.remove_node(node);
        if self.selected_nodes.contains(&node) {
            self.selected_nodes.select(node, true);
        }
    }

    /// Remove every selected node and everything scoped to it.
    pub(crate) fn remove_selected_nodes(&mut self) {
        let nodes_to_remove: Vec<NodeKey> = self.selected_nodes.iter().copied().collect();
        debug!("removing {} selected nodes", nodes_to_remove.len());

        for node_key in nodes_to_remove {
            if let Some(node_id) = self.graph.get_node(node_key).map(|node| node.id) {
                self.captures.release_for_node(node_id);
            }
            self.graph.remove_node(node_key);
        }

        self.selected_nodes.clear();
    }

    fn fit_view_to_content(&mut self) {
        let bounds =
            ContentBounds::from_rects(self.graph.nodes().map(|(_, node)| (node.origin, node.size)));
        self.viewport.fit_to_content(self.view_size, bounds);
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
