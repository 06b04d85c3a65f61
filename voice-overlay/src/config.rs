use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use eframe::egui::Color32;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    palette::{parse_hex_color, strip_background, TALKING_BORDER},
    roster::MeetingOrder,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarStripConfig {
    pub size: f32,
    pub gap: f32,
    pub width_pct: f32,
    pub padding: f32,
    pub corner_radius: f32,
    pub background: String,
    pub talking_border: String,
}

impl Default for AvatarStripConfig {
    fn default() -> Self {
        Self {
            size: 50.0,
            gap: 0.0,
            width_pct: 5.0,
            padding: 16.0,
            corner_radius: 20.0,
            background: "#25232ac0".to_owned(),
            talking_border: "#2ecc71".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayWindowConfig {
    pub always_on_top: bool,
    pub mouse_passthrough: bool,
}

impl Default for OverlayWindowConfig {
    fn default() -> Self {
        Self {
            always_on_top: true,
            mouse_passthrough: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// `None` reads pushes from stdin, otherwise from this file or pipe.
    pub state_source: Option<String>,
    pub reopen_delay_ms: u64,
    pub show_meeting_hud: bool,
    pub show_avatar_strip: bool,
    pub meeting_order: MeetingOrder,
    pub meeting_fade_ms: u64,
    pub avatar: AvatarStripConfig,
    pub window: OverlayWindowConfig,
    pub debug_hud: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            state_source: None,
            reopen_delay_ms: 2_000,
            show_meeting_hud: true,
            show_avatar_strip: true,
            meeting_order: MeetingOrder::Roster,
            meeting_fade_ms: 100,
            avatar: AvatarStripConfig::default(),
            window: OverlayWindowConfig::default(),
            debug_hud: false,
        }
    }
}

/// Resolved drawing parameters handed to the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub meeting_order: MeetingOrder,
    pub show_meeting_hud: bool,
    pub show_avatar_strip: bool,
    pub avatar_size: f32,
    pub avatar_gap: f32,
    pub strip_width_frac: f32,
    pub strip_padding: f32,
    pub strip_corner_radius: f32,
    pub strip_background: Color32,
    pub talking_border: Color32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        OverlayConfig::default().style()
    }
}

impl OverlayConfig {
    pub fn load_or_create() -> Result<(Self, PathBuf)> {
        let config_dir = dirs::config_dir()
            .context("unable to locate OS config directory")?
            .join("voice-overlay");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed creating config dir at {}", config_dir.display()))?;

        let config_path = config_dir.join("config.json");
        if !config_path.exists() {
            let default = Self::default();
            default.save(&config_path)?;
            return Ok((default, config_path));
        }

        let text = fs::read_to_string(&config_path)
            .with_context(|| format!("failed reading {}", config_path.display()))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("invalid json in {}", config_path.display()))?;
        Ok((config, config_path))
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let payload = serde_json::to_string_pretty(self).context("failed serializing config")?;
        fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
        Ok(())
    }

    pub fn meeting_fade_secs(&self) -> f32 {
        self.meeting_fade_ms as f32 / 1000.0
    }

    pub fn style(&self) -> OverlayStyle {
        let avatar = &self.avatar;
        OverlayStyle {
            meeting_order: self.meeting_order,
            show_meeting_hud: self.show_meeting_hud,
            show_avatar_strip: self.show_avatar_strip,
            avatar_size: avatar.size.clamp(8.0, 256.0),
            avatar_gap: avatar.gap.max(0.0),
            strip_width_frac: (avatar.width_pct / 100.0).clamp(0.0, 1.0),
            strip_padding: avatar.padding.max(0.0),
            strip_corner_radius: avatar.corner_radius.max(0.0),
            strip_background: color_or(&avatar.background, "avatar.background", strip_background()),
            talking_border: color_or(&avatar.talking_border, "avatar.talking_border", TALKING_BORDER),
        }
    }
}

fn color_or(value: &str, field: &str, fallback: Color32) -> Color32 {
    parse_hex_color(value).unwrap_or_else(|| {
        warn!(field, value, "invalid color in config, using default");
        fallback
    })
}
