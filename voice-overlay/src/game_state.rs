use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Phase of the match as reported by the game reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PhaseWire")]
pub enum GamePhase {
    Lobby,
    Tasks,
    Discussion,
    Menu,
    #[default]
    Unknown,
}

/// The reader sends the phase either as its numeric code or by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhaseWire {
    Code(i64),
    Name(String),
    Other(IgnoredAny),
}

impl From<PhaseWire> for GamePhase {
    fn from(wire: PhaseWire) -> Self {
        match wire {
            PhaseWire::Code(code) => Self::from_code(code),
            PhaseWire::Name(name) => Self::from_name(&name),
            PhaseWire::Other(_) => Self::Unknown,
        }
    }
}

impl GamePhase {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Lobby,
            1 => Self::Tasks,
            2 => Self::Discussion,
            3 => Self::Menu,
            _ => Self::Unknown,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "LOBBY" => Self::Lobby,
            "TASKS" => Self::Tasks,
            "DISCUSSION" => Self::Discussion,
            "MENU" => Self::Menu,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lobby => "LOBBY",
            Self::Tasks => "TASKS",
            Self::Discussion => "DISCUSSION",
            Self::Menu => "MENU",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: u32,
    #[serde(default)]
    pub color_id: i64,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub disconnected: bool,
    #[serde(default)]
    pub name: Option<String>,
}

impl Player {
    /// Still in the match from the game's point of view.
    pub fn is_present(&self) -> bool {
        !self.is_dead && !self.disconnected
    }
}

/// Full game snapshot pushed by the game reader. Only `game_state` and
/// `players` are consumed; everything else rides along in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmongUsState {
    #[serde(default)]
    pub game_state: GamePhase,
    #[serde(default, deserialize_with = "tolerant_players")]
    pub players: Option<Vec<Player>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AmongUsState {
    pub fn is_discussion(&self) -> bool {
        self.game_state == GamePhase::Discussion
    }

    pub fn players(&self) -> &[Player] {
        self.players.as_deref().unwrap_or_default()
    }
}

/// Drops roster entries that do not decode instead of rejecting the snapshot.
fn tolerant_players<'de, D>(deserializer: D) -> Result<Option<Vec<Player>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(entries) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let players = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Player>(entry) {
            Ok(player) => Some(player),
            Err(err) => {
                debug!(?err, "skipped malformed roster entry");
                None
            }
        })
        .collect();
    Ok(Some(players))
}
