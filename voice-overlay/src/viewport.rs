use eframe::egui::{Pos2, Rect, Vec2};

/// Aspect ratio of the in-game meeting screen.
pub const HUD_ASPECT_RATIO: f32 = 854.0 / 579.0;
/// Share of the window height the meeting screen may occupy.
pub const HUD_HEIGHT_FRACTION: f32 = 0.96;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HudRect {
    pub width: f32,
    pub height: f32,
}

impl HudRect {
    pub const EMPTY: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Border radius of the meeting icons, also used as their glow size.
    pub fn corner_radius(&self) -> f32 {
        self.height / 100.0
    }

    pub fn centered_in(&self, window: Rect) -> Rect {
        Rect::from_center_size(window.center(), self.size())
    }
}

/// Largest 854:579 box inside the full window width and 96% of its height.
pub fn resolve_hud(width: f32, height: f32) -> HudRect {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return HudRect::EMPTY;
    }
    let usable_height = height * HUD_HEIGHT_FRACTION;
    if width / usable_height > HUD_ASPECT_RATIO {
        HudRect {
            width: usable_height * HUD_ASPECT_RATIO,
            height: usable_height,
        }
    } else {
        HudRect {
            width,
            height: width / HUD_ASPECT_RATIO,
        }
    }
}

/// Follows the window size and keeps the HUD rectangle in sync with it.
#[derive(Debug, Clone, Default)]
pub struct ViewportTracker {
    window: Option<Rect>,
    hud: HudRect,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the HUD was recomputed.
    pub fn observe(&mut self, window: Rect) -> bool {
        if self.window.is_some_and(|known| same_rect(known, window)) {
            return false;
        }
        self.window = Some(window);
        self.hud = resolve_hud(window.width(), window.height());
        true
    }

    pub fn window(&self) -> Rect {
        self.window
            .unwrap_or_else(|| Rect::from_min_size(Pos2::ZERO, Vec2::ZERO))
    }

    pub fn hud(&self) -> HudRect {
        self.hud
    }
}

fn same_rect(a: Rect, b: Rect) -> bool {
    (a.min - b.min).length_sq() < 0.25 && (a.max - b.max).length_sq() < 0.25
}
