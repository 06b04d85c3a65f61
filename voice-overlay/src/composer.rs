//! Turns the latest snapshots and the window geometry into drawable layers.
//!
//! Everything here is a pure function of its inputs so a frame can be
//! recomputed at any time from whatever state happens to be present.

use eframe::egui::{Color32, Pos2, Rect, Vec2};

use crate::{
    config::OverlayStyle,
    game_state::AmongUsState,
    roster::{meeting_slots, talking_avatars, TalkingAvatar},
    viewport::{HudRect, ViewportTracker},
    voice_state::VoiceState,
};

// Meeting grid geometry, as fractions of the HUD and of the icon container.
const ICONS_LEFT: f32 = 0.05;
const ICONS_TOP: f32 = 0.184703;
const ICONS_WIDTH: f32 = 0.8345;
const ICONS_HEIGHT: f32 = 0.632;
const ICON_WIDTH: f32 = 0.4851;
const ICON_HEIGHT: f32 = 0.1649;
// Horizontal and bottom margins are relative to the container width.
const ICON_COLUMN_MARGIN: f32 = 0.014885;
const ICON_ROW_MARGIN: f32 = 0.0225;

pub struct FrameInput<'a> {
    pub window: Rect,
    pub hud: HudRect,
    pub game: Option<&'a AmongUsState>,
    pub voice: Option<&'a VoiceState>,
    pub style: &'a OverlayStyle,
}

impl<'a> FrameInput<'a> {
    pub fn new(
        viewport: &ViewportTracker,
        game: Option<&'a AmongUsState>,
        voice: Option<&'a VoiceState>,
        style: &'a OverlayStyle,
    ) -> Self {
        Self {
            window: viewport.window(),
            hud: viewport.hud(),
            game,
            voice,
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingIcon {
    pub player_id: u32,
    pub rect: Rect,
    pub glow: Option<Color32>,
    /// Target opacity; the painter fades towards it.
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingHudLayer {
    pub hud: Rect,
    pub icons_area: Rect,
    /// Icon border radius, glow blur and glow spread.
    pub corner_radius: f32,
    pub icons: Vec<MeetingIcon>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarTile {
    pub avatar: TalkingAvatar,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarStripLayer {
    pub panel: Rect,
    pub background: Color32,
    pub corner_radius: f32,
    pub talking_border: Color32,
    pub tiles: Vec<AvatarTile>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub meeting_hud: Option<MeetingHudLayer>,
    pub avatar_strip: Option<AvatarStripLayer>,
}

impl OverlayFrame {
    pub fn is_blank(&self) -> bool {
        self.meeting_hud.is_none() && self.avatar_strip.is_none()
    }
}

pub fn compose(input: &FrameInput<'_>) -> OverlayFrame {
    OverlayFrame {
        meeting_hud: input
            .style
            .show_meeting_hud
            .then(|| compose_meeting_hud(input))
            .flatten(),
        avatar_strip: input
            .style
            .show_avatar_strip
            .then(|| compose_avatar_strip(input))
            .flatten(),
    }
}

fn compose_meeting_hud(input: &FrameInput<'_>) -> Option<MeetingHudLayer> {
    let slots = meeting_slots(input.game, input.voice, input.style.meeting_order)?;
    let hud = input.hud.centered_in(input.window);
    let icons_area = Rect::from_min_size(
        hud.min + Vec2::new(hud.width() * ICONS_LEFT, hud.height() * ICONS_TOP),
        Vec2::new(hud.width() * ICONS_WIDTH, hud.height() * ICONS_HEIGHT),
    );

    let icons = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| MeetingIcon {
            player_id: slot.player_id,
            rect: meeting_icon_rect(icons_area, index),
            glow: slot.glow.map(|color| color.primary),
            opacity: if slot.talking { 1.0 } else { 0.0 },
        })
        .collect();

    Some(MeetingHudLayer {
        hud,
        icons_area,
        corner_radius: input.hud.corner_radius(),
        icons,
    })
}

/// Two columns, rows packed from the top.
fn meeting_icon_rect(area: Rect, index: usize) -> Rect {
    let size = Vec2::new(area.width() * ICON_WIDTH, area.height() * ICON_HEIGHT);
    let column = (index % 2) as f32;
    let row = (index / 2) as f32;
    let column_step = size.x + 2.0 * ICON_COLUMN_MARGIN * area.width();
    let row_step = size.y + ICON_ROW_MARGIN * area.width();
    Rect::from_min_size(
        area.min + Vec2::new(column * column_step, row * row_step),
        size,
    )
}

fn compose_avatar_strip(input: &FrameInput<'_>) -> Option<AvatarStripLayer> {
    let avatars = talking_avatars(input.game, input.voice);
    if avatars.is_empty() {
        return None;
    }
    let style = input.style;
    let count = avatars.len() as f32;
    let content_width = (input.window.width() * style.strip_width_frac).max(style.avatar_size);
    let content_height = count * style.avatar_size + (count - 1.0) * style.avatar_gap;
    let panel_size = Vec2::new(
        content_width + 2.0 * style.strip_padding,
        content_height + 2.0 * style.strip_padding,
    );
    let panel = Rect::from_min_size(
        Pos2::new(
            input.window.max.x - panel_size.x,
            input.window.center().y - panel_size.y / 2.0,
        ),
        panel_size,
    );

    let left = panel.min.x + style.strip_padding;
    let top = panel.min.y + style.strip_padding;
    let tiles = avatars
        .into_iter()
        .enumerate()
        .map(|(index, avatar)| AvatarTile {
            avatar,
            rect: Rect::from_min_size(
                Pos2::new(
                    left,
                    top + index as f32 * (style.avatar_size + style.avatar_gap),
                ),
                Vec2::splat(style.avatar_size),
            ),
        })
        .collect();

    Some(AvatarStripLayer {
        panel,
        background: style.strip_background,
        corner_radius: style.strip_corner_radius,
        talking_border: style.talking_border,
        tiles,
    })
}
