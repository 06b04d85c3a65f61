use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::{game_state::AmongUsState, protocol::IncomingMessage, voice_state::VoiceState};

/// Latest value of one stream plus when it arrived.
#[derive(Debug, Clone)]
pub struct Latest<T> {
    value: Option<T>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self {
            value: None,
            updated_at: None,
        }
    }
}

impl<T> Latest<T> {
    pub fn replace(&mut self, value: T, at: DateTime<Utc>) {
        self.value = Some(value);
        self.updated_at = Some(at);
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub game_pushes: usize,
    pub voice_pushes: usize,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.game_pushes == 0 && self.voice_pushes == 0
    }
}

/// The view's single subscription to both state streams.
pub struct StateFeed {
    events: Option<Receiver<IncomingMessage>>,
    game: Latest<AmongUsState>,
    voice: Latest<VoiceState>,
}

impl StateFeed {
    pub fn new(events: Receiver<IncomingMessage>) -> Self {
        Self {
            events: Some(events),
            game: Latest::default(),
            voice: Latest::default(),
        }
    }

    /// Applies every pending push in delivery order; the last one wins.
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let Some(events) = self.events.as_ref() else {
            return report;
        };
        while let Ok(message) = events.try_recv() {
            let now = Utc::now();
            match message {
                IncomingMessage::GameState(state) => {
                    self.game.replace(state, now);
                    report.game_pushes += 1;
                }
                IncomingMessage::VoiceState(state) => {
                    self.voice.replace(state, now);
                    report.voice_pushes += 1;
                }
            }
        }
        if !report.is_empty() {
            debug!(
                game = report.game_pushes,
                voice = report.voice_pushes,
                "applied state pushes"
            );
        }
        report
    }

    /// Drops the subscription; producers see a closed channel afterwards.
    pub fn detach(&mut self) {
        if self.events.take().is_some() {
            info!("state listeners deregistered");
        }
    }

    pub fn game(&self) -> Option<&AmongUsState> {
        self.game.get()
    }

    pub fn voice(&self) -> Option<&VoiceState> {
        self.voice.get()
    }

    pub fn game_updated_at(&self) -> Option<DateTime<Utc>> {
        self.game.updated_at()
    }

    pub fn voice_updated_at(&self) -> Option<DateTime<Utc>> {
        self.voice.updated_at()
    }
}

impl Drop for StateFeed {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;
    use serde_json::json;

    use super::StateFeed;
    use crate::{
        game_state::{AmongUsState, GamePhase},
        protocol::IncomingMessage,
        voice_state::VoiceState,
    };

    fn game(phase: u8) -> IncomingMessage {
        IncomingMessage::GameState(
            serde_json::from_value(json!({ "gameState": phase, "players": [] }))
                .expect("game fixture"),
        )
    }

    fn talking(id: &str) -> IncomingMessage {
        IncomingMessage::VoiceState(
            serde_json::from_value(json!({ "otherTalking": { id: true } })).expect("voice fixture"),
        )
    }

    #[test]
    fn starts_empty() {
        let (_tx, rx) = unbounded();
        let mut feed = StateFeed::new(rx);
        assert!(feed.drain().is_empty());
        assert!(feed.game().is_none());
        assert!(feed.voice().is_none());
        assert!(feed.game_updated_at().is_none());
    }

    #[test]
    fn last_push_wins_per_stream() {
        let (tx, rx) = unbounded();
        let mut feed = StateFeed::new(rx);
        tx.send(game(0)).expect("send");
        tx.send(talking("1")).expect("send");
        tx.send(game(2)).expect("send");
        tx.send(talking("3")).expect("send");

        let report = feed.drain();
        assert_eq!(report.game_pushes, 2);
        assert_eq!(report.voice_pushes, 2);
        assert_eq!(
            feed.game().map(|state| state.game_state),
            Some(GamePhase::Discussion)
        );
        let voice = feed.voice().expect("voice cell");
        assert!(voice.is_talking(3));
        assert!(!voice.is_talking(1));
    }

    #[test]
    fn streams_update_independently() {
        let (tx, rx) = unbounded();
        let mut feed = StateFeed::new(rx);
        tx.send(talking("2")).expect("send");
        feed.drain();
        let voice_at = feed.voice_updated_at();

        tx.send(game(1)).expect("send");
        let report = feed.drain();
        assert_eq!(report.voice_pushes, 0);
        assert_eq!(feed.voice_updated_at(), voice_at);
        assert!(feed.voice().is_some_and(|voice| voice.is_talking(2)));
        assert!(feed.game().is_some());
    }

    #[test]
    fn snapshots_are_replaced_not_merged() {
        let (tx, rx) = unbounded();
        let mut feed = StateFeed::new(rx);
        tx.send(talking("2")).expect("send");
        tx.send(IncomingMessage::VoiceState(VoiceState::default()))
            .expect("send");
        tx.send(IncomingMessage::GameState(AmongUsState::default()))
            .expect("send");
        feed.drain();
        assert!(!feed.voice().expect("voice").is_talking(2));
        assert!(feed.game().expect("game").players.is_none());
    }

    #[test]
    fn detach_closes_the_channel() {
        let (tx, rx) = unbounded();
        let mut feed = StateFeed::new(rx);
        feed.detach();
        assert!(tx.send(game(2)).is_err());
        assert!(feed.drain().is_empty());
    }

    #[test]
    fn dropping_the_feed_closes_the_channel() {
        let (tx, rx) = unbounded();
        drop(StateFeed::new(rx));
        assert!(tx.send(talking("1")).is_err());
    }
}
