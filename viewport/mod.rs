/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Viewport transform engine for the infinite canvas.
//!
//! Core structures:
//! - `Viewport`: translation + scale mapping logical canvas space to screen space
//! - `ContentBounds`: axis-aligned bounding box over node rectangles
//! - `PanGesture`: background-drag pan tracking between press and release
//!
//! Boundary: all coordinate mapping goes through `screen_to_logical` /
//! `logical_to_screen` — callers that do their own arithmetic drift out of
//! sync with the zoom anchor math.

use euclid::default::{Point2D, Size2D, Vector2D};

/// Smallest permitted zoom factor.
pub const MIN_SCALE: f32 = 0.1;
/// Largest permitted zoom factor.
pub const MAX_SCALE: f32 = 2.0;
/// Fraction of the current scale applied per wheel unit when zooming.
const WHEEL_ZOOM_RATE: f32 = 0.05;
/// Multiplier used by the discrete zoom-in / zoom-out commands.
const STEP_ZOOM_FACTOR: f32 = 1.2;
/// Logical-space margin kept around content when fitting the view.
const FIT_PADDING: f32 = 100.0;

/// Canvas-to-screen transform.
///
/// A logical point `p` appears on screen at `p * scale + (x, y)`. Scale is
/// kept inside `[MIN_SCALE, MAX_SCALE]` by every mutation path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Horizontal translation in screen pixels.
    pub x: f32,
    /// Vertical translation in screen pixels.
    pub y: f32,
    /// Zoom factor mapping logical units to screen pixels.
    pub scale: f32,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }

    /// Clamp a zoom value to the allowed range.
    pub fn clamp_scale(scale: f32) -> f32 {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }

    /// Back to the identity transform (origin at top-left, 1:1 zoom).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Map a screen-space point into logical canvas space.
    pub fn screen_to_logical(&self, screen: Point2D<f32>) -> Point2D<f32> {
        Point2D::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    /// Map a logical canvas point into screen space.
    pub fn logical_to_screen(&self, logical: Point2D<f32>) -> Point2D<f32> {
        Point2D::new(logical.x * self.scale + self.x, logical.y * self.scale + self.y)
    }

    /// Scroll without a zoom modifier: translate opposite the wheel delta.
    pub fn wheel_pan(&mut self, delta: Vector2D<f32>) {
        self.x -= delta.x;
        self.y -= delta.y;
    }

    /// Drag-pan by a pointer delta in screen pixels.
    pub fn pan(&mut self, delta: Vector2D<f32>) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Zoom around a screen-space cursor so the logical point under it does
    /// not move. A positive `delta_y` (scrolling down) zooms out.
    pub fn wheel_zoom(&mut self, delta_y: f32, cursor: Point2D<f32>) {
        let next = Self::clamp_scale(self.scale - delta_y * WHEEL_ZOOM_RATE * self.scale);
        let ratio = next / self.scale;
        // ratio == 1 at a clamp boundary, leaving the translation untouched.
        self.x -= (cursor.x - self.x) * (ratio - 1.0);
        self.y -= (cursor.y - self.y) * (ratio - 1.0);
        self.scale = next;
    }

    /// Discrete zoom step in. Scale-only: the translation is left alone.
    pub fn zoom_in(&mut self) {
        self.scale = Self::clamp_scale(self.scale * STEP_ZOOM_FACTOR);
    }

    /// Discrete zoom step out.
    pub fn zoom_out(&mut self) {
        self.scale = Self::clamp_scale(self.scale / STEP_ZOOM_FACTOR);
    }

    /// Frame the given content inside a view of `view` size, with a fixed
    /// logical margin on every side. Fitting never zooms past 1:1; an empty
    /// canvas or degenerate view resets to the identity transform.
    pub fn fit_to_content(&mut self, view: Size2D<f32>, bounds: Option<ContentBounds>) {
        let Some(bounds) = bounds else {
            self.reset();
            return;
        };
        if view.width <= 0.0 || view.height <= 0.0 {
            self.reset();
            return;
        }
        let content_w = bounds.width();
        let content_h = bounds.height();
        if content_w <= 0.0 || content_h <= 0.0 {
            self.reset();
            return;
        }
        let scale_x = view.width / (content_w + 2.0 * FIT_PADDING);
        let scale_y = view.height / (content_h + 2.0 * FIT_PADDING);
        let scale = Self::clamp_scale(scale_x.min(scale_y).min(1.0));
        self.x = (view.width - content_w * scale) / 2.0 - bounds.min.x * scale;
        self.y = (view.height - content_h * scale) / 2.0 - bounds.min.y * scale;
        self.scale = scale;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned bounding box over node rectangles, in logical space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBounds {
    pub min: Point2D<f32>,
    pub max: Point2D<f32>,
}

impl ContentBounds {
    /// Accumulate `(origin, size)` rectangles into one box. `None` when the
    /// iterator is empty.
    pub fn from_rects<I>(rects: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Point2D<f32>, Size2D<f32>)>,
    {
        let mut acc: Option<ContentBounds> = None;
        for (origin, size) in rects {
            let far = Point2D::new(origin.x + size.width, origin.y + size.height);
            acc = Some(match acc {
                None => ContentBounds { min: origin, max: far },
                Some(b) => ContentBounds {
                    min: Point2D::new(b.min.x.min(origin.x), b.min.y.min(origin.y)),
                    max: Point2D::new(b.max.x.max(far.x), b.max.y.max(far.y)),
                },
            });
        }
        acc
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// Pan gesture between pointer press and release.
///
/// Hit-testing lives in the interaction layer: a press that lands on a node
/// never reaches this gesture, so only background drags pan the canvas.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PanGesture {
    anchor: Option<Point2D<f32>>,
}

impl PanGesture {
    /// Begin tracking from a screen-space press point.
    pub fn press(&mut self, at: Point2D<f32>) {
        self.anchor = Some(at);
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Move the viewport by the delta since the last tracked point.
    /// No-op unless a press is being tracked.
    pub fn drag_to(&mut self, at: Point2D<f32>, viewport: &mut Viewport) {
        if let Some(last) = self.anchor {
            viewport.pan(Vector2D::new(at.x - last.x, at.y - last.y));
            self.anchor = Some(at);
        }
    }

    /// End the gesture. Releases without a prior press are ignored.
    pub fn release(&mut self) {
        self.anchor = None;
    }
}
