//! Pan/zoom state: an affine `screen = world * scale + translate` map with clamped scale
//! and eased transitions.

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use tracing::debug;

use crate::config::ViewportConfig;
use crate::error::ViewportError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub translate: Vec2,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translate: Vec2::ZERO,
    };

    pub fn apply(self, world: Vec2) -> Pos2 {
        (world * self.scale + self.translate).to_pos2()
    }

    pub fn invert(self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

struct Transition {
    from_scale: f32,
    to_scale: f32,
    from_focus: Vec2,
    to_focus: Vec2,
    elapsed_ms: f32,
    duration_ms: f32,
}

/// Monotonic cubic in-out ease on `[0, 1]`.
fn ease_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - (u * u * u) / 2.0
    }
}

pub struct ZoomController {
    config: ViewportConfig,
    viewport: Vec2,
    transform: Transform,
    transition: Option<Transition>,
    on_change: Option<Box<dyn FnMut(Transform)>>,
}

impl ZoomController {
    pub fn new(config: &ViewportConfig, viewport: Vec2) -> Self {
        Self {
            config: *config,
            viewport,
            transform: Transform {
                scale: 1.0_f32.clamp(config.min_zoom, config.max_zoom),
                translate: viewport * 0.5,
            },
            transition: None,
            on_change: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn on_change(&mut self, callback: impl FnMut(Transform) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.config.min_zoom, self.config.max_zoom)
    }

    /// Screen point that focused world points are moved under.
    pub fn anchor(&self) -> Pos2 {
        pos2(
            self.viewport.x * self.config.anchor[0],
            self.viewport.y * self.config.anchor[1],
        )
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        self.transform.apply(world)
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        self.transform.invert(screen)
    }

    /// Replaces the transform outright, cancelling any running transition.
    pub fn set_transform(&mut self, transform: Transform) -> Result<(), ViewportError> {
        if !transform.scale.is_finite() || !transform.translate.is_finite() || transform.scale <= 0.0
        {
            return Err(ViewportError::NonFinite {
                x: transform.translate.x,
                y: transform.translate.y,
                scale: transform.scale,
            });
        }
        self.transition = None;
        self.commit(Transform {
            scale: self.clamp_scale(transform.scale),
            translate: transform.translate,
        });
        Ok(())
    }

    /// Moves world point `target` under the anchor at `scale` (clamped), over
    /// `duration_ms`. A zero duration applies immediately.
    pub fn zoom_to(&mut self, target: Vec2, scale: f32, duration_ms: f32) -> Result<(), ViewportError> {
        if !target.is_finite() || !scale.is_finite() || scale <= 0.0 {
            return Err(ViewportError::NonFinite {
                x: target.x,
                y: target.y,
                scale,
            });
        }

        let scale = self.clamp_scale(scale);
        let anchor = self.anchor().to_vec2();
        let to = Transform {
            scale,
            translate: anchor - target * scale,
        };
        debug!(x = target.x, y = target.y, scale, duration_ms, "zoom requested");

        if !(duration_ms > 0.0) {
            self.transition = None;
            self.commit(to);
            return Ok(());
        }

        self.transition = Some(Transition {
            from_scale: self.transform.scale,
            to_scale: scale,
            from_focus: self.transform.invert(anchor.to_pos2()),
            to_focus: target,
            elapsed_ms: 0.0,
            duration_ms,
        });
        Ok(())
    }

    /// Steps a running transition by `dt_ms`; returns whether one is still running.
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        let anchor = self.anchor().to_vec2();
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };

        transition.elapsed_ms += dt_ms.max(0.0);
        let t = (transition.elapsed_ms / transition.duration_ms).min(1.0);
        // The end frame is rebuilt against the current anchor, which a resize may have moved.
        if t >= 1.0 {
            let scale = transition.to_scale;
            let translate = anchor - transition.to_focus * scale;
            self.transition = None;
            self.commit(Transform { scale, translate });
            return false;
        }

        let eased = ease_cubic(t);
        let focus = transition.from_focus + (transition.to_focus - transition.from_focus) * eased;
        let scale = transition.from_scale * (transition.to_scale / transition.from_scale).powf(eased);
        self.commit(Transform {
            scale,
            translate: anchor - focus * scale,
        });
        true
    }

    /// Scales by `factor` while keeping the world point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 || !screen.is_finite() {
            return;
        }
        self.transition = None;
        let world_before = self.transform.invert(screen);
        let scale = self.clamp_scale(self.transform.scale * factor);
        self.commit(Transform {
            scale,
            translate: screen.to_vec2() - world_before * scale,
        });
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        self.transition = None;
        self.commit(Transform {
            scale: self.transform.scale,
            translate: self.transform.translate + delta,
        });
    }

    /// Fits `bounds` (world space) inside the viewport with `padding` screen pixels on
    /// every side.
    pub fn zoom_to_fit(&mut self, bounds: Rect, padding: f32) {
        if !bounds.is_finite() {
            return;
        }
        let available = (self.viewport - vec2(padding, padding) * 2.0).max(vec2(1.0, 1.0));
        let size = bounds.size().max(vec2(1.0, 1.0));
        let scale = self.clamp_scale((available.x / size.x).min(available.y / size.y));
        let center = bounds.center().to_vec2();
        self.transition = None;
        self.commit(Transform {
            scale,
            translate: self.viewport * 0.5 - center * scale,
        });
    }

    /// Keeps the world point under the anchor in place across a resize. A running
    /// transition keeps its world-space focus and follows the moved anchor.
    pub fn resize(&mut self, viewport: Vec2) {
        if !viewport.is_finite() || viewport == self.viewport {
            return;
        }
        let old_anchor = self.anchor();
        self.viewport = viewport;
        let shift = self.anchor() - old_anchor;
        self.commit(Transform {
            scale: self.transform.scale,
            translate: self.transform.translate + shift,
        });
    }

    /// Non-parent labels are hidden below the configured scale threshold.
    pub fn labels_visible(&self, scale: f32, is_parent: bool) -> bool {
        is_parent || scale >= self.config.label_threshold
    }

    fn commit(&mut self, transform: Transform) {
        self.transform = transform;
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn controller() -> ZoomController {
        ZoomController::new(&ViewportConfig::default(), vec2(800.0, 600.0))
    }

    #[test]
    fn zoom_requests_are_clamped() {
        let mut zoom = controller();
        zoom.zoom_to(vec2(10.0, 10.0), 40.0, 0.0).unwrap();
        assert_eq!(zoom.scale(), 12.0);
        zoom.zoom_to(vec2(10.0, 10.0), 0.01, 0.0).unwrap();
        assert_eq!(zoom.scale(), 0.25);
    }

    #[test]
    fn instant_zoom_puts_target_under_anchor() {
        let mut zoom = controller();
        zoom.zoom_to(vec2(30.0, -20.0), 3.0, 0.0).unwrap();
        let screen = zoom.world_to_screen(vec2(30.0, -20.0));
        assert!((screen - pos2(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn transition_ends_exactly_on_target() {
        let mut zoom = controller();
        zoom.zoom_to(vec2(120.0, 45.0), 3.0, 500.0).unwrap();
        let mut frames = 0;
        while zoom.advance(16.0) {
            frames += 1;
            assert!(zoom.scale() >= 1.0 - 1e-4 && zoom.scale() <= 3.0 + 1e-4);
        }
        assert!(frames > 20);
        assert_eq!(zoom.scale(), 3.0);
        assert_eq!(
            zoom.transform().translate,
            vec2(400.0, 300.0) - vec2(120.0, 45.0) * 3.0
        );
    }

    #[test]
    fn transition_scale_is_monotonic() {
        let mut zoom = controller();
        zoom.zoom_to(Vec2::ZERO, 8.0, 500.0).unwrap();
        let mut last = zoom.scale();
        while zoom.advance(10.0) {
            assert!(zoom.scale() >= last);
            last = zoom.scale();
        }
    }

    #[test]
    fn on_change_sees_every_frame() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut zoom = controller();
        let sink = Rc::clone(&seen);
        zoom.on_change(move |transform| sink.borrow_mut().push(transform.scale));
        zoom.zoom_to(Vec2::ZERO, 2.0, 100.0).unwrap();
        while zoom.advance(25.0) {}
        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen.last().copied(), Some(2.0));
    }

    #[test]
    fn zoom_at_keeps_the_cursor_point_fixed() {
        let mut zoom = controller();
        let cursor = pos2(620.0, 140.0);
        let before = zoom.screen_to_world(cursor);
        zoom.zoom_at(cursor, 1.15);
        let after = zoom.screen_to_world(cursor);
        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn screen_and_world_round_trip() {
        let mut zoom = controller();
        zoom.set_transform(Transform {
            scale: 2.5,
            translate: vec2(-40.0, 90.0),
        })
        .unwrap();
        let world = vec2(13.0, -7.0);
        let back = zoom.screen_to_world(zoom.world_to_screen(world));
        assert!((back - world).length() < 1e-4);
    }

    #[test]
    fn non_finite_requests_are_rejected() {
        let mut zoom = controller();
        let before = zoom.transform();
        assert!(zoom.zoom_to(vec2(f32::NAN, 0.0), 2.0, 0.0).is_err());
        assert!(zoom.zoom_to(Vec2::ZERO, f32::INFINITY, 0.0).is_err());
        assert_eq!(zoom.transform(), before);
    }

    #[test]
    fn fit_contains_the_bounds() {
        let mut zoom = controller();
        let bounds = Rect::from_min_max(pos2(-100.0, -50.0), pos2(300.0, 150.0));
        zoom.zoom_to_fit(bounds, 20.0);
        let min = zoom.world_to_screen(bounds.min.to_vec2());
        let max = zoom.world_to_screen(bounds.max.to_vec2());
        assert!(min.x >= 19.9 && min.y >= 19.9);
        assert!(max.x <= 780.1 && max.y <= 580.1);
    }

    #[test]
    fn labels_toggle_reversibly_with_scale() {
        let zoom = controller();
        assert!(zoom.labels_visible(1.0, false));
        assert!(!zoom.labels_visible(0.5, false));
        assert!(zoom.labels_visible(0.5, true));
        assert!(zoom.labels_visible(1.0, false));
    }

    fn side_panel_controller() -> ZoomController {
        let config = ViewportConfig {
            anchor: [0.25, 0.5],
            ..ViewportConfig::default()
        };
        ZoomController::new(&config, vec2(800.0, 600.0))
    }

    #[test]
    fn construction_respects_zoom_bounds() {
        let raised = ViewportConfig {
            min_zoom: 2.0,
            ..ViewportConfig::default()
        };
        let zoom = ZoomController::new(&raised, vec2(800.0, 600.0));
        assert_eq!(zoom.scale(), 2.0);
        assert_eq!(zoom.transform().translate, vec2(400.0, 300.0));

        let lowered = ViewportConfig {
            max_zoom: 0.5,
            ..ViewportConfig::default()
        };
        let mut zoom = ZoomController::new(&lowered, vec2(800.0, 600.0));
        assert_eq!(zoom.scale(), 0.5);
        zoom.zoom_at(pos2(100.0, 100.0), 1.5);
        assert_eq!(zoom.scale(), 0.5);
    }

    #[test]
    fn offset_anchor_receives_the_target() {
        let mut zoom = side_panel_controller();
        assert_eq!(zoom.anchor(), pos2(200.0, 300.0));

        zoom.zoom_to(vec2(50.0, 20.0), 3.0, 500.0).unwrap();
        while zoom.advance(16.0) {}
        assert_eq!(
            zoom.transform().translate,
            vec2(200.0, 300.0) - vec2(50.0, 20.0) * 3.0
        );
        assert!((zoom.world_to_screen(vec2(50.0, 20.0)) - pos2(200.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn resize_mid_transition_follows_the_moved_anchor() {
        let mut zoom = side_panel_controller();
        zoom.zoom_to(vec2(50.0, 20.0), 3.0, 500.0).unwrap();
        assert!(zoom.advance(100.0));

        let under_anchor = zoom.screen_to_world(pos2(200.0, 300.0));
        zoom.resize(vec2(1200.0, 600.0));
        assert_eq!(zoom.anchor(), pos2(300.0, 300.0));
        assert!((zoom.screen_to_world(pos2(300.0, 300.0)) - under_anchor).length() < 1e-3);

        let mut last = zoom.transform();
        while zoom.advance(16.0) {
            last = zoom.transform();
        }
        let end = zoom.transform();
        assert_eq!(end.scale, 3.0);
        assert_eq!(end.translate, vec2(300.0, 300.0) - vec2(50.0, 20.0) * 3.0);
        assert!((end.translate - last.translate).length() < 1.0);
    }

    #[test]
    fn resize_keeps_the_center_world_point() {
        let mut zoom = controller();
        let center_before = zoom.screen_to_world(pos2(400.0, 300.0));
        zoom.resize(vec2(1000.0, 700.0));
        let center_after = zoom.screen_to_world(pos2(500.0, 350.0));
        assert!((center_before - center_after).length() < 1e-3);
    }
}
