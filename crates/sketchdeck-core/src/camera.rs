//! Viewport pan and zoom.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Multiplier applied by one zoom-in / zoom-out step.
pub const ZOOM_STEP: f64 = 1.2;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;
/// Wheel delta (in pixels) that doubles or halves the zoom.
const WHEEL_ZOOM_SPAN: f64 = 500.0;

/// The view onto the canvas. Viewport changes are never part of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Screen-space translation.
    pub offset: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Size of the visible area in screen pixels.
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            viewport: Size::new(1280.0, 800.0),
        }
    }
}

impl Camera {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// World to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to world.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// The world-space rectangle currently visible.
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(self.viewport.width, self.viewport.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// World-space point at the center of the viewport.
    pub fn center_world(&self) -> Point {
        self.screen_to_world(self.viewport_center())
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `anchor` (screen coordinates) fixed.
    /// Returns false when the zoom is already at its limit.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        let world = self.screen_to_world(anchor);
        self.zoom = new_zoom;
        let moved = self.world_to_screen(world);
        self.offset += anchor - moved;
        true
    }

    /// Zoom in one step around the viewport center.
    pub fn zoom_in(&mut self) -> bool {
        self.zoom_at(self.viewport_center(), ZOOM_STEP)
    }

    /// Zoom out one step around the viewport center.
    pub fn zoom_out(&mut self) -> bool {
        self.zoom_at(self.viewport_center(), 1.0 / ZOOM_STEP)
    }

    /// Zoom in response to a wheel delta. Scrolling up (negative) zooms in.
    pub fn zoom_wheel(&mut self, anchor: Point, delta_y: f64) -> bool {
        let factor = 2f64.powf(-delta_y / WHEEL_ZOOM_SPAN);
        self.zoom_at(anchor, factor)
    }

    /// Zoom as a whole percentage for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Fit `bounds` in the viewport with `padding` pixels on each side.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let available = Size::new(
            (self.viewport.width - padding * 2.0).max(1.0),
            (self.viewport.height - padding * 2.0).max(1.0),
        );
        let zoom = (available.width / bounds.width()).min(available.height / bounds.height());
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let center = self.viewport_center();
        self.offset = center.to_vec2() - bounds.center().to_vec2() * self.zoom;
    }
}
