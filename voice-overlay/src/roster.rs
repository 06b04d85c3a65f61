use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    game_state::{AmongUsState, Player},
    palette::{player_color, PlayerColor},
    voice_state::VoiceState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingOrder {
    /// As the game reader sent them.
    #[default]
    Roster,
    /// Players still in the match first, each group by id.
    Presence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// In the voice session but without a live audio channel.
    NoVoice,
}

impl ConnectionState {
    pub fn resolve(voice: &VoiceState, player_id: u32) -> Self {
        if !voice.has_socket_client(player_id) {
            return Self::Disconnected;
        }
        if voice.is_audio_connected(voice.peer_for(player_id)) {
            Self::Connected
        } else {
            Self::NoVoice
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::NoVoice => "novoice",
        }
    }
}

/// One tile of the meeting grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingSlot {
    pub player_id: u32,
    pub glow: Option<PlayerColor>,
    pub talking: bool,
}

/// One talking player in the side strip.
#[derive(Debug, Clone, PartialEq)]
pub struct TalkingAvatar {
    pub player: Player,
    pub connection: ConnectionState,
    /// Voice layer's belief, not `player.is_dead`.
    pub is_alive: bool,
}

pub fn presence_order(a: &Player, b: &Player) -> Ordering {
    b.is_present()
        .cmp(&a.is_present())
        .then_with(|| a.id.cmp(&b.id))
}

/// Slots for the discussion grid, or `None` outside a meeting.
pub fn meeting_slots(
    game: Option<&AmongUsState>,
    voice: Option<&VoiceState>,
    order: MeetingOrder,
) -> Option<Vec<MeetingSlot>> {
    let game = game?;
    let players = game.players.as_ref()?;
    if !game.is_discussion() {
        return None;
    }

    let mut ordered: Vec<&Player> = players.iter().collect();
    if order == MeetingOrder::Presence {
        ordered.sort_by(|a, b| presence_order(a, b));
    }

    Some(
        ordered
            .into_iter()
            .map(|player| MeetingSlot {
                player_id: player.id,
                glow: player_color(player.color_id),
                talking: voice.is_some_and(|voice| voice.is_talking(player.id)),
            })
            .collect(),
    )
}

/// Roster entries that are currently talking, with their voice status.
pub fn talking_avatars(
    game: Option<&AmongUsState>,
    voice: Option<&VoiceState>,
) -> Vec<TalkingAvatar> {
    let (Some(game), Some(voice)) = (game, voice) else {
        return Vec::new();
    };
    game.players()
        .iter()
        .filter(|player| voice.is_talking(player.id))
        .map(|player| TalkingAvatar {
            player: player.clone(),
            connection: ConnectionState::resolve(voice, player.id),
            is_alive: !voice.is_dead(player.id),
        })
        .collect()
}
