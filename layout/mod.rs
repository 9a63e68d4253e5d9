/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Radial placement for mind-map children.
//!
//! Core structures:
//! - `NodeRect`: id + rectangle snapshot of a node, the only graph data layout sees
//! - `Placement`: computed top-left origin for one child
//!
//! Boundary: pure geometry. The reducer snapshots rectangles out of the graph,
//! calls `radial_child_layout`, and applies the placements as move intents —
//! layout itself never touches graph state.

use euclid::default::{Point2D, Size2D};
use uuid::Uuid;

/// Gap in logical units between the parent's bounding circle and the ring of
/// children.
const SIBLING_CLEARANCE: f32 = 80.0;

/// Rectangle snapshot of a node, in logical space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRect {
    pub id: Uuid,
    pub origin: Point2D<f32>,
    pub size: Size2D<f32>,
}

impl NodeRect {
    pub fn center(&self) -> Point2D<f32> {
        Point2D::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }
}

/// Computed top-left origin for one child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub id: Uuid,
    pub origin: Point2D<f32>,
}

/// Arrange `children` on a ring around `parent`.
///
/// Without a grandparent the ring is a full circle starting straight up from
/// the parent. With one, children fan across the half-circle facing away from
/// the grandparent, endpoints included, so new branches grow outward instead
/// of folding back over the path they came from.
///
/// The ring radius clears the parent's largest half-extent plus the largest
/// half-extent of any child, keeping siblings of mixed sizes on one circle.
pub fn radial_child_layout(
    parent: &NodeRect,
    children: &[NodeRect],
    grandparent: Option<&NodeRect>,
) -> Vec<Placement> {
    if children.is_empty() {
        return Vec::new();
    }

    let parent_center = parent.center();
    let max_child_extent = children
        .iter()
        .map(|child| child.size.width.max(child.size.height))
        .fold(0.0_f32, f32::max);
    let radius = parent.size.width.max(parent.size.height) / 2.0
        + max_child_extent / 2.0
        + SIBLING_CLEARANCE;

    let (start_angle, angle_step) = match grandparent {
        Some(grand) => {
            let grand_center = grand.center();
            let inbound = (parent_center.y - grand_center.y)
                .atan2(parent_center.x - grand_center.x);
            let step = if children.len() > 1 {
                std::f32::consts::PI / (children.len() - 1) as f32
            } else {
                0.0
            };
            (inbound - std::f32::consts::FRAC_PI_2, step)
        }
        None => (
            -std::f32::consts::FRAC_PI_2,
            std::f32::consts::TAU / children.len() as f32,
        ),
    };

    children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let angle = start_angle + i as f32 * angle_step;
            Placement {
                id: child.id,
                origin: Point2D::new(
                    parent_center.x + radius * angle.cos() - child.size.width / 2.0,
                    parent_center.y + radius * angle.sin() - child.size.height / 2.0,
                ),
            }
        })
        .collect()
}
