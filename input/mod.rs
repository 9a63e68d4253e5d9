/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pointer and keyboard interaction for the canvas.
//!
//! Core structures:
//! - `DragGesture` / `ResizeGesture`: node manipulation machines
//! - `LinkGesture`: handle-to-handle edge drawing
//! - `KeyboardActions`: shell-collected key state mapped to intents
//!
//! Every machine captures the geometry it saw at press time and applies
//! pointer deltas to that capture, never to the live value — repeated moves
//! recompute from the start instead of accumulating rounding drift. Deltas
//! arrive in screen pixels and are divided by the viewport scale on the way
//! into logical space.
//!
//! Boundary: machines emit `CanvasIntent`s; only the reducer applies them.

use euclid::default::{Point2D, Size2D, Vector2D};

use crate::app::CanvasIntent;
use crate::model::graph::{MIN_NODE_HEIGHT, MIN_NODE_WIDTH, NodeKey};

/// Which side of a node a link gesture started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHandle {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragStart {
    node: NodeKey,
    pointer: Point2D<f32>,
    origin: Point2D<f32>,
}

/// Node move machine.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DragGesture {
    active: Option<DragStart>,
}

impl DragGesture {
    /// Begin dragging `node`: remember the pointer and the node's origin.
    pub fn press(&mut self, node: NodeKey, pointer: Point2D<f32>, origin: Point2D<f32>) {
        self.active = Some(DragStart {
            node,
            pointer,
            origin,
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// New pointer position while dragging. The screen delta since press is
    /// scaled into logical space and applied to the captured origin.
    pub fn drag_to(&self, pointer: Point2D<f32>, scale: f32) -> Option<CanvasIntent> {
        let start = self.active?;
        Some(CanvasIntent::MoveNode {
            node: start.node,
            origin: Point2D::new(
                start.origin.x + (pointer.x - start.pointer.x) / scale,
                start.origin.y + (pointer.y - start.pointer.y) / scale,
            ),
        })
    }

    pub fn release(&mut self) {
        self.active = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeStart {
    node: NodeKey,
    pointer: Point2D<f32>,
    size: Size2D<f32>,
}

/// Node resize machine, dragging the bottom-right corner.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResizeGesture {
    active: Option<ResizeStart>,
}

impl ResizeGesture {
    pub fn press(&mut self, node: NodeKey, pointer: Point2D<f32>, size: Size2D<f32>) {
        self.active = Some(ResizeStart {
            node,
            pointer,
            size,
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// New pointer position while resizing. The candidate size is floored
    /// here so the rectangle never visibly dips below the minimum; the graph
    /// store clamps again on apply.
    pub fn resize_to(&self, pointer: Point2D<f32>, scale: f32) -> Option<CanvasIntent> {
        let start = self.active?;
        Some(CanvasIntent::ResizeNode {
            node: start.node,
            size: Size2D::new(
                MIN_NODE_WIDTH.max(start.size.width + (pointer.x - start.pointer.x) / scale),
                MIN_NODE_HEIGHT.max(start.size.height + (pointer.y - start.pointer.y) / scale),
            ),
        })
    }

    pub fn release(&mut self) {
        self.active = None;
    }
}

/// Edge drawing machine: press on a node handle, float a line to the
/// pointer, release over another node to link.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LinkGesture {
    active: Option<LinkStart>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LinkStart {
    source: NodeKey,
    handle: LinkHandle,
    cursor: Point2D<f32>,
}

impl LinkGesture {
    pub fn press(&mut self, source: NodeKey, handle: LinkHandle, cursor_logical: Point2D<f32>) {
        self.active = Some(LinkStart {
            source,
            handle,
            cursor: cursor_logical,
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Track the floating endpoint (already converted to logical space) so
    /// the shell can draw the pending line.
    pub fn drag_to(&mut self, cursor_logical: Point2D<f32>) {
        if let Some(start) = &mut self.active {
            start.cursor = cursor_logical;
        }
    }

    /// Floating endpoint for rendering, while active.
    pub fn floating_endpoint(&self) -> Option<Point2D<f32>> {
        self.active.map(|start| start.cursor)
    }

    /// Source handle the gesture started from, while active.
    pub fn source(&self) -> Option<(NodeKey, LinkHandle)> {
        self.active.map(|start| (start.source, start.handle))
    }

    /// Release over a node. Self-links are discarded; a hit on another node
    /// yields the re-link intent (the reducer replaces any existing edge for
    /// the same ordered pair).
    pub fn release_over(&mut self, target: NodeKey) -> Option<CanvasIntent> {
        let start = self.active.take()?;
        if start.source == target {
            return None;
        }
        Some(CanvasIntent::LinkNodes {
            from: start.source,
            to: target,
        })
    }

    /// Release over empty canvas: discard.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

/// Keyboard actions collected from the host shell's input events.
///
/// This struct decouples input detection (requires the shell's event loop)
/// from action application (pure state mutation), making actions testable.
#[derive(Default)]
pub struct KeyboardActions {
    /// Delete or Backspace.
    pub delete_selected: bool,
    /// Escape.
    pub clear_selection: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub reset_view: bool,
    pub fit_to_content: bool,
}

/// Convert keyboard actions to canvas intents without applying them.
pub fn intents_from_actions(actions: &KeyboardActions) -> Vec<CanvasIntent> {
    let mut intents = Vec::new();
    if actions.delete_selected {
        intents.push(CanvasIntent::RemoveSelectedNodes);
    }
    if actions.clear_selection {
        intents.push(CanvasIntent::ClearSelection);
    }
    if actions.zoom_in {
        intents.push(CanvasIntent::ZoomIn);
    }
    if actions.zoom_out {
        intents.push(CanvasIntent::ZoomOut);
    }
    if actions.reset_view {
        intents.push(CanvasIntent::ResetView);
    }
    if actions.fit_to_content {
        intents.push(CanvasIntent::FitToContent);
    }
    intents
}

/// Wheel input from the shell, routed to pan or zoom by modifier state.
pub fn intent_from_wheel(
    delta: Vector2D<f32>,
    zoom_modifier: bool,
    cursor: Point2D<f32>,
) -> CanvasIntent {
    if zoom_modifier {
        CanvasIntent::WheelZoom {
            delta_y: delta.y,
            cursor,
        }
    } else {
        CanvasIntent::WheelPan { delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::stable_graph::NodeIndex;

    fn key(n: usize) -> NodeKey {
        NodeIndex::new(n)
    }

    #[test]
    fn test_drag_applies_scaled_delta_to_captured_origin() {
        let mut drag = DragGesture::default();
        drag.press(key(1), Point2D::new(100.0, 100.0), Point2D::new(10.0, 20.0));

        let intent = drag.drag_to(Point2D::new(150.0, 130.0), 1.0).unwrap();
        match intent {
            CanvasIntent::MoveNode { node, origin } => {
                assert_eq!(node, key(1));
                assert_eq!(origin, Point2D::new(60.0, 50.0));
            },
            _ => panic!("Expected MoveNode intent"),
        }

        // Each move recomputes from the press capture, not the last move.
        let intent = drag.drag_to(Point2D::new(160.0, 140.0), 1.0).unwrap();
        match intent {
            CanvasIntent::MoveNode { origin, .. } => {
                assert_eq!(origin, Point2D::new(70.0, 60.0));
            },
            _ => panic!("Expected MoveNode intent"),
        }
    }

    #[test]
    fn test_drag_divides_by_viewport_scale() {
        let mut drag = DragGesture::default();
        drag.press(key(2), Point2D::new(0.0, 0.0), Point2D::new(0.0, 0.0));

        let intent = drag.drag_to(Point2D::new(100.0, 50.0), 2.0).unwrap();
        match intent {
            CanvasIntent::MoveNode { origin, .. } => {
                assert_eq!(origin, Point2D::new(50.0, 25.0));
            },
            _ => panic!("Expected MoveNode intent"),
        }
    }

    #[test]
    fn test_drag_release_stops_emitting() {
        let mut drag = DragGesture::default();
        drag.press(key(1), Point2D::new(0.0, 0.0), Point2D::new(0.0, 0.0));
        assert!(drag.is_active());

        drag.release();
        assert!(!drag.is_active());
        assert!(drag.drag_to(Point2D::new(10.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_resize_floors_at_minimum_rectangle() {
        let mut resize = ResizeGesture::default();
        resize.press(key(3), Point2D::new(0.0, 0.0), Size2D::new(250.0, 120.0));

        let intent = resize.resize_to(Point2D::new(-500.0, -500.0), 1.0).unwrap();
        match intent {
            CanvasIntent::ResizeNode { size, .. } => {
                assert_eq!(size, Size2D::new(MIN_NODE_WIDTH, MIN_NODE_HEIGHT));
            },
            _ => panic!("Expected ResizeNode intent"),
        }
    }

    #[test]
    fn test_resize_grows_from_captured_size() {
        let mut resize = ResizeGesture::default();
        resize.press(key(3), Point2D::new(10.0, 10.0), Size2D::new(300.0, 200.0));

        let intent = resize.resize_to(Point2D::new(110.0, 60.0), 2.0).unwrap();
        match intent {
            CanvasIntent::ResizeNode { node, size } => {
                assert_eq!(node, key(3));
                assert_eq!(size, Size2D::new(350.0, 225.0));
            },
            _ => panic!("Expected ResizeNode intent"),
        }
    }

    #[test]
    fn test_link_release_on_other_node_yields_link_intent() {
        let mut link = LinkGesture::default();
        link.press(key(1), LinkHandle::Right, Point2D::new(0.0, 0.0));
        link.drag_to(Point2D::new(400.0, 300.0));
        assert_eq!(link.floating_endpoint(), Some(Point2D::new(400.0, 300.0)));

        let intent = link.release_over(key(2)).unwrap();
        assert!(matches!(
            intent,
            CanvasIntent::LinkNodes { from, to } if from == key(1) && to == key(2)
        ));
        assert!(!link.is_active());
    }

    #[test]
    fn test_link_release_on_source_discards() {
        let mut link = LinkGesture::default();
        link.press(key(1), LinkHandle::Left, Point2D::new(0.0, 0.0));

        assert!(link.release_over(key(1)).is_none());
        assert!(!link.is_active());
    }

    #[test]
    fn test_link_cancel_on_empty_canvas() {
        let mut link = LinkGesture::default();
        link.press(key(1), LinkHandle::Right, Point2D::new(0.0, 0.0));
        link.cancel();
        assert!(!link.is_active());
        assert!(link.release_over(key(2)).is_none());
    }

    #[test]
    fn test_delete_selected_action_maps_to_intent() {
        let intents = intents_from_actions(&KeyboardActions {
            delete_selected: true,
            ..Default::default()
        });
        assert!(
            intents
                .iter()
                .any(|i| matches!(i, CanvasIntent::RemoveSelectedNodes))
        );
    }

    #[test]
    fn test_clear_selection_action_maps_to_intent() {
        let intents = intents_from_actions(&KeyboardActions {
            clear_selection: true,
            ..Default::default()
        });
        assert!(
            intents
                .iter()
                .any(|i| matches!(i, CanvasIntent::ClearSelection))
        );
    }

    #[test]
    fn test_zoom_actions_map_to_intents() {
        let intents = intents_from_actions(&KeyboardActions {
            zoom_in: true,
            zoom_out: true,
            reset_view: true,
            fit_to_content: true,
            ..Default::default()
        });
        assert!(intents.iter().any(|i| matches!(i, CanvasIntent::ZoomIn)));
        assert!(intents.iter().any(|i| matches!(i, CanvasIntent::ZoomOut)));
        assert!(intents.iter().any(|i| matches!(i, CanvasIntent::ResetView)));
        assert!(
            intents
                .iter()
                .any(|i| matches!(i, CanvasIntent::FitToContent))
        );
    }

    #[test]
    fn test_no_actions_is_noop() {
        assert!(intents_from_actions(&KeyboardActions::default()).is_empty());
    }

    #[test]
    fn test_wheel_routes_by_modifier() {
        let intent = intent_from_wheel(Vector2D::new(5.0, -3.0), false, Point2D::new(0.0, 0.0));
        assert!(matches!(intent, CanvasIntent::WheelPan { .. }));

        let intent = intent_from_wheel(Vector2D::new(0.0, 2.0), true, Point2D::new(640.0, 360.0));
        assert!(matches!(
            intent,
            CanvasIntent::WheelZoom { delta_y, cursor }
                if delta_y == 2.0 && cursor == Point2D::new(640.0, 360.0)
        ));
    }
}
