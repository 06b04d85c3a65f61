use eframe::egui::Color32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerColor {
    pub primary: Color32,
    pub secondary: Color32,
}

const fn pair(primary: Color32, secondary: Color32) -> PlayerColor {
    PlayerColor { primary, secondary }
}

/// Indexed by the game's `colorId`, in the game's own order.
pub const PLAYER_COLORS: [PlayerColor; 12] = [
    // red
    pair(Color32::from_rgb(0xC5, 0x11, 0x11), Color32::from_rgb(0x7A, 0x08, 0x38)),
    // blue
    pair(Color32::from_rgb(0x13, 0x2E, 0xD1), Color32::from_rgb(0x09, 0x15, 0x8E)),
    // green
    pair(Color32::from_rgb(0x11, 0x7F, 0x2D), Color32::from_rgb(0x0A, 0x4D, 0x2E)),
    // pink
    pair(Color32::from_rgb(0xED, 0x54, 0xBA), Color32::from_rgb(0xAB, 0x2B, 0xAD)),
    // orange
    pair(Color32::from_rgb(0xEF, 0x7D, 0x0D), Color32::from_rgb(0xB3, 0x3E, 0x15)),
    // yellow
    pair(Color32::from_rgb(0xF5, 0xF5, 0x57), Color32::from_rgb(0xC3, 0x88, 0x23)),
    // black
    pair(Color32::from_rgb(0x3F, 0x47, 0x4E), Color32::from_rgb(0x1E, 0x1F, 0x26)),
    // white
    pair(Color32::from_rgb(0x83, 0x94, 0xBF), Color32::from_rgb(0x83, 0x94, 0xBF)),
    // purple
    pair(Color32::from_rgb(0x6B, 0x2F, 0xBB), Color32::from_rgb(0x3B, 0x17, 0x7C)),
    // brown
    pair(Color32::from_rgb(0x71, 0x49, 0x1E), Color32::from_rgb(0x5E, 0x26, 0x15)),
    // cyan
    pair(Color32::from_rgb(0x38, 0xFE, 0xDC), Color32::from_rgb(0x24, 0xA8, 0xBE)),
    // lime
    pair(Color32::from_rgb(0x50, 0xEF, 0x39), Color32::from_rgb(0x15, 0xA7, 0x42)),
];

pub const TALKING_BORDER: Color32 = Color32::from_rgb(0x2E, 0xCC, 0x71); // #2ecc71
pub const STATUS_DISCONNECTED: Color32 = Color32::from_rgb(0xE7, 0x4C, 0x3C);
pub const STATUS_NO_VOICE: Color32 = Color32::from_rgb(0xF3, 0x9C, 0x12);

pub fn strip_background() -> Color32 {
    Color32::from_rgba_unmultiplied(0x25, 0x23, 0x2A, 0xC0) // #25232ac0
}

/// `colorId` comes straight from game memory and is not validated upstream.
pub fn player_color(color_id: i64) -> Option<PlayerColor> {
    let index = usize::try_from(color_id).ok()?;
    PLAYER_COLORS.get(index).copied()
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Option<Color32> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Color32::from_rgba_unmultiplied(r, g, b, a))
}
