use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    time::Duration,
};

use chrono::{DateTime, Local, Utc};
use crossbeam_channel::Receiver;
use eframe::egui::{
    self, Align2, Color32, FontId, Id, LayerId, Margin, Order, Painter, Rect, RichText, Rounding,
    Stroke,
};
use tracing::{debug, error};

use crate::{
    channel::StateFeed,
    composer::{compose, AvatarStripLayer, FrameInput, MeetingHudLayer, OverlayFrame},
    config::{OverlayConfig, OverlayStyle},
    palette::{player_color, STATUS_DISCONNECTED, STATUS_NO_VOICE},
    protocol::IncomingMessage,
    roster::ConnectionState,
    viewport::ViewportTracker,
};

const GLOW_FALLOFF_STEPS: usize = 4;

pub struct OverlayState {
    feed: StateFeed,
    viewport: ViewportTracker,
    config: OverlayConfig,
    style: OverlayStyle,
    /// Bumped each time the meeting grid appears; scopes the icon fades.
    meeting_epoch: u64,
    meeting_visible: bool,
}

impl OverlayState {
    pub fn new(events: Receiver<IncomingMessage>, config: OverlayConfig) -> Self {
        let style = config.style();
        Self {
            feed: StateFeed::new(events),
            viewport: ViewportTracker::new(),
            config,
            style,
            meeting_epoch: 0,
            meeting_visible: false,
        }
    }

    /// Applies pending pushes and the current window size.
    fn sync(&mut self, window: Rect) {
        self.feed.drain();
        if self.viewport.observe(window) {
            let hud = self.viewport.hud();
            debug!(
                width = window.width(),
                height = window.height(),
                hud_width = hud.width,
                hud_height = hud.height,
                "viewport resized"
            );
        }
    }

    fn compose_frame(&self) -> OverlayFrame {
        let input = FrameInput::new(
            &self.viewport,
            self.feed.game(),
            self.feed.voice(),
            &self.style,
        );
        catch_unwind(AssertUnwindSafe(|| compose(&input))).unwrap_or_else(|_| {
            error!("overlay composition panicked; blanking this frame");
            OverlayFrame::default()
        })
    }

    fn draw_overlay(&mut self, ctx: &egui::Context) {
        self.sync(ctx.screen_rect());

        // Keep the clear pass fully transparent.
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::TRANSPARENT))
            .show(ctx, |_ui| {});

        let frame = self.compose_frame();
        self.track_meeting(frame.meeting_hud.is_some());
        if self.config.debug_hud {
            self.draw_debug_hud(ctx, &frame);
            ctx.request_repaint_after(Duration::from_millis(250));
        }
        if frame.is_blank() {
            return;
        }

        let painter = ctx.layer_painter(LayerId::new(Order::Background, Id::new("voice_overlay")));
        if let Some(hud) = &frame.meeting_hud {
            if !self.viewport.hud().is_empty() {
                self.draw_meeting_hud(ctx, &painter, hud);
            }
        }
        if let Some(strip) = &frame.avatar_strip {
            draw_avatar_strip(&painter, strip);
        }
    }

    /// A new meeting gets fresh fade state, so icons start at their targets
    /// instead of resuming wherever the previous meeting left them.
    fn track_meeting(&mut self, visible: bool) {
        if visible && !self.meeting_visible {
            self.meeting_epoch += 1;
            debug!(epoch = self.meeting_epoch, "meeting grid shown");
        }
        self.meeting_visible = visible;
    }

    fn draw_meeting_hud(&self, ctx: &egui::Context, painter: &Painter, hud: &MeetingHudLayer) {
        let fade = self.config.meeting_fade_secs();
        let size = hud.corner_radius;
        for icon in &hud.icons {
            let opacity = ctx.animate_value_with_time(
                meeting_icon_id(self.meeting_epoch, icon.player_id),
                icon.opacity,
                fade,
            );
            let Some(glow) = icon.glow else {
                continue;
            };
            if opacity <= 0.0 || size <= 0.0 {
                continue;
            }
            draw_glow(painter, icon.rect, size, glow.gamma_multiply(opacity));
        }
    }

    fn draw_debug_hud(&self, ctx: &egui::Context, frame: &OverlayFrame) {
        let now = Utc::now();
        let game = self.feed.game();
        let phase = game.map(|game| game.game_state.label()).unwrap_or("NO GAME STATE");
        let players = game.map(|game| game.players().len()).unwrap_or(0);
        let talking = self
            .feed
            .voice()
            .map(|voice| voice.talking_count())
            .unwrap_or(0);
        let mut line = format!(
            "{phase} | PLAYERS {players} | TALKING {talking} | GAME {} | VOICE {}",
            age_label(self.feed.game_updated_at(), now),
            age_label(self.feed.voice_updated_at(), now),
        );
        if let Some(strip) = &frame.avatar_strip {
            for tile in &strip.tiles {
                line.push_str(&format!(
                    " | #{} {}",
                    tile.avatar.player.id,
                    tile.avatar.connection.label()
                ));
            }
        }

        egui::Area::new(Id::new("overlay_telemetry"))
            .order(Order::Foreground)
            .anchor(Align2::CENTER_TOP, [0.0, 8.0])
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(Color32::from_rgba_premultiplied(10, 18, 26, 160))
                    .inner_margin(Margin::symmetric(10.0, 6.0))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(
                                RichText::new(line)
                                    .small()
                                    .color(Color32::from_rgb(140, 220, 255)),
                            );
                            ui.add_space(18.0);
                            ui.label(
                                RichText::new(Local::now().format("%H:%M:%S").to_string())
                                    .small()
                                    .color(Color32::GRAY),
                            );
                        });
                    });
            });
    }
}

fn meeting_icon_id(epoch: u64, player_id: u32) -> Id {
    Id::new(("meeting_icon", epoch, player_id))
}

/// Outer glow around `rect`: a solid band of `size`, then a falloff of `size`.
fn draw_glow(painter: &Painter, rect: Rect, size: f32, color: Color32) {
    painter.rect_stroke(
        rect.expand(size / 2.0),
        Rounding::same(size * 1.5),
        Stroke::new(size, color),
    );
    let step = size / GLOW_FALLOFF_STEPS as f32;
    for index in 0..GLOW_FALLOFF_STEPS {
        let fade = 1.0 - (index as f32 + 0.5) / GLOW_FALLOFF_STEPS as f32;
        let expand = size + step * (index as f32 + 0.5);
        painter.rect_stroke(
            rect.expand(expand),
            Rounding::same(size + expand),
            Stroke::new(step, color.gamma_multiply(fade)),
        );
    }
}

fn draw_avatar_strip(painter: &Painter, strip: &AvatarStripLayer) {
    let radius = strip.corner_radius;
    painter.rect_filled(
        strip.panel,
        Rounding {
            nw: radius,
            ne: 0.0,
            sw: radius,
            se: 0.0,
        },
        strip.background,
    );

    for tile in &strip.tiles {
        let avatar = &tile.avatar;
        let center = tile.rect.center();
        let radius = tile.rect.width() / 2.0;
        let dim = if avatar.is_alive { 1.0 } else { 0.4 };
        let (body, shade) = player_color(avatar.player.color_id)
            .map(|color| (color.primary, color.secondary))
            .unwrap_or((Color32::GRAY, Color32::DARK_GRAY));

        painter.circle_filled(center, radius - 3.0, shade.gamma_multiply(dim));
        painter.circle_filled(center, radius - 7.0, body.gamma_multiply(dim));
        painter.circle_stroke(center, radius - 1.5, Stroke::new(3.0, strip.talking_border));

        if let Some(initial) = avatar
            .player
            .name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
        {
            painter.text(
                center,
                Align2::CENTER_CENTER,
                initial.to_uppercase().to_string(),
                FontId::proportional(radius * 0.8),
                Color32::WHITE.gamma_multiply(dim),
            );
        }

        let badge = match avatar.connection {
            ConnectionState::Connected => None,
            ConnectionState::NoVoice => Some(STATUS_NO_VOICE),
            ConnectionState::Disconnected => Some(STATUS_DISCONNECTED),
        };
        if let Some(badge) = badge {
            let at = tile.rect.right_bottom() - egui::vec2(radius * 0.3, radius * 0.3);
            painter.circle_filled(at, radius * 0.28, badge);
            painter.circle_stroke(at, radius * 0.28, Stroke::new(1.5, Color32::BLACK));
        }
    }
}

fn age_label(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match at {
        Some(at) => {
            let millis = (now - at).num_milliseconds().max(0);
            format!("{:.1}s", millis as f64 / 1000.0)
        }
        None => "--".to_owned(),
    }
}

pub struct OverlayApp {
    state: OverlayState,
}

impl OverlayApp {
    pub fn new(events: Receiver<IncomingMessage>, config: OverlayConfig) -> Self {
        Self {
            state: OverlayState::new(events, config),
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.draw_overlay(ctx);
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}

impl Drop for OverlayApp {
    fn drop(&mut self) {
        self.state.feed.detach();
    }
}
