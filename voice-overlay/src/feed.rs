use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    runtime::{Builder, Runtime},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, warn};

use crate::protocol::{parse_incoming_message, IncomingMessage};

/// Wakes the UI after a push so it redraws without polling.
pub type RepaintHook = Arc<dyn Fn() + Send + Sync>;

/// How long teardown waits for reads parked on the blocking pool. A silent
/// stdin or a pipe without a writer never returns on its own.
pub const FEED_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateSource {
    Stdin,
    Path(PathBuf),
}

impl StateSource {
    pub fn from_config(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(path) if path != "-" => Self::Path(PathBuf::from(path)),
            _ => Self::Stdin,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_owned(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedWorkerConfig {
    pub source: StateSource,
    pub reopen_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    Skipped,
    ReceiverGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpEnd {
    Eof,
    ReceiverGone,
}

/// Runtime that owns the feed worker, separate from the UI thread.
pub struct FeedRuntime {
    runtime: Runtime,
    worker: JoinHandle<()>,
}

impl FeedRuntime {
    pub fn start(
        config: FeedWorkerConfig,
        tx: Sender<IncomingMessage>,
        repaint: RepaintHook,
    ) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("voice-overlay-feed")
            .enable_all()
            .build()
            .context("failed building feed runtime")?;
        let worker = {
            let _guard = runtime.enter();
            spawn_feed_worker(config, tx, repaint)
        };
        Ok(Self { runtime, worker })
    }

    /// Stops the worker and returns within `FEED_SHUTDOWN_GRACE` even when a
    /// read is still blocked; the stuck read thread is left to process exit.
    pub fn shutdown(self) {
        self.worker.abort();
        self.runtime.shutdown_timeout(FEED_SHUTDOWN_GRACE);
        info!("state feed stopped");
    }
}

fn spawn_feed_worker(
    config: FeedWorkerConfig,
    tx: Sender<IncomingMessage>,
    repaint: RepaintHook,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_feed(config, tx, repaint).await;
    })
}

async fn run_feed(config: FeedWorkerConfig, tx: Sender<IncomingMessage>, repaint: RepaintHook) {
    info!(source = %config.source.describe(), "starting state feed");
    match &config.source {
        StateSource::Stdin => {
            let reader = BufReader::new(tokio::io::stdin());
            match pump_lines(reader, &tx, &repaint).await {
                Ok(PumpEnd::Eof) => info!("state producer closed stdin"),
                Ok(PumpEnd::ReceiverGone) => info!("overlay closed; stopping state feed"),
                Err(err) => error!(?err, "state feed read error on stdin"),
            }
        }
        StateSource::Path(path) => loop {
            match open_source(path).await {
                Ok(reader) => match pump_lines(reader, &tx, &repaint).await {
                    Ok(PumpEnd::ReceiverGone) => {
                        info!("overlay closed; stopping state feed");
                        return;
                    }
                    Ok(PumpEnd::Eof) => {
                        debug!(path = %path.display(), "state source reached end, reopening");
                    }
                    Err(err) => warn!(?err, path = %path.display(), "state source read error"),
                },
                Err(err) => warn!(?err, "failed to open state source, retrying"),
            }
            sleep(config.reopen_delay).await;
        },
    }
}

async fn open_source(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed opening state source {}", path.display()))?;
    Ok(BufReader::new(file))
}

async fn pump_lines<R>(
    reader: R,
    tx: &Sender<IncomingMessage>,
    repaint: &RepaintHook,
) -> Result<PumpEnd>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed reading push")? {
        if forward_line(&line, tx, repaint) == ForwardOutcome::ReceiverGone {
            return Ok(PumpEnd::ReceiverGone);
        }
    }
    Ok(PumpEnd::Eof)
}

pub fn forward_line(
    line: &str,
    tx: &Sender<IncomingMessage>,
    repaint: &RepaintHook,
) -> ForwardOutcome {
    let line = line.trim();
    if line.is_empty() {
        return ForwardOutcome::Skipped;
    }
    match parse_incoming_message(line) {
        Ok(message) => {
            let channel = message.channel_name();
            if tx.send(message).is_err() {
                return ForwardOutcome::ReceiverGone;
            }
            debug!(channel, "forwarded state push");
            repaint();
            ForwardOutcome::Forwarded
        }
        Err(err) => {
            warn!(?err, payload = %line, "ignored unknown payload");
            ForwardOutcome::Skipped
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use crossbeam_channel::unbounded;
    use tokio::io::BufReader;

    use super::{
        forward_line, pump_lines, FeedRuntime, FeedWorkerConfig, ForwardOutcome, PumpEnd,
        RepaintHook, StateSource,
    };
    use crate::protocol::IncomingMessage;

    fn counting_hook() -> (RepaintHook, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let hook: RepaintHook = Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hook, count)
    }

    #[test]
    fn source_from_config() {
        assert_eq!(StateSource::from_config(None), StateSource::Stdin);
        assert_eq!(StateSource::from_config(Some("  ")), StateSource::Stdin);
        assert_eq!(StateSource::from_config(Some("-")), StateSource::Stdin);
        assert_eq!(
            StateSource::from_config(Some("/run/overlay.pipe")),
            StateSource::Path(PathBuf::from("/run/overlay.pipe"))
        );
    }

    #[test]
    fn forward_line_sends_and_wakes_ui() {
        let (tx, rx) = unbounded();
        let (hook, count) = counting_hook();
        let outcome = forward_line(
            r#"{"channel":"notify_voice_state_changed","state":{"otherTalking":{"1":true}}}"#,
            &tx,
            &hook,
        );
        assert_eq!(outcome, ForwardOutcome::Forwarded);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(rx.try_recv(), Ok(IncomingMessage::VoiceState(_))));
    }

    #[test]
    fn forward_line_skips_noise_without_waking() {
        let (tx, rx) = unbounded();
        let (hook, count) = counting_hook();
        assert_eq!(forward_line("", &tx, &hook), ForwardOutcome::Skipped);
        assert_eq!(forward_line("{\"x\":1}", &tx, &hook), ForwardOutcome::Skipped);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn forward_line_reports_closed_overlay() {
        let (tx, rx) = unbounded();
        drop(rx);
        let (hook, count) = counting_hook();
        let outcome = forward_line(
            r#"{"channel":"notify_game_state_changed","state":{}}"#,
            &tx,
            &hook,
        );
        assert_eq!(outcome, ForwardOutcome::ReceiverGone);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pump_forwards_every_valid_line_until_eof() {
        let input = concat!(
            r#"{"channel":"notify_game_state_changed","state":{"gameState":2,"players":[]}}"#,
            "\n",
            "garbage\n",
            "\n",
            r#"{"channel":"notify_voice_state_changed","state":{}}"#,
            "\n"
        );
        let (tx, rx) = unbounded();
        let (hook, count) = counting_hook();
        let end = pump_lines(BufReader::new(input.as_bytes()), &tx, &hook)
            .await
            .expect("pump should finish");
        assert_eq!(end, PumpEnd::Eof);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(matches!(rx.try_recv(), Ok(IncomingMessage::GameState(_))));
        assert!(matches!(rx.try_recv(), Ok(IncomingMessage::VoiceState(_))));
    }

    #[tokio::test]
    async fn pump_stops_when_overlay_is_gone() {
        let input = "{\"channel\":\"notify_voice_state_changed\",\"state\":{}}\n".repeat(3);
        let (tx, rx) = unbounded();
        drop(rx);
        let (hook, _count) = counting_hook();
        let end = pump_lines(BufReader::new(input.as_bytes()), &tx, &hook)
            .await
            .expect("pump should finish");
        assert_eq!(end, PumpEnd::ReceiverGone);
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_returns_while_a_pipe_has_no_writer() {
        use std::{
            process::Command,
            time::{Duration, Instant, SystemTime, UNIX_EPOCH},
        };

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        let fifo = std::env::temp_dir().join(format!(
            "voice-overlay-feed-{}-{stamp}.pipe",
            std::process::id()
        ));
        let status = Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .expect("mkfifo should run");
        assert!(status.success());

        let (tx, _rx) = unbounded();
        let (hook, _count) = counting_hook();
        let feed = FeedRuntime::start(
            FeedWorkerConfig {
                source: StateSource::Path(fifo.clone()),
                reopen_delay: Duration::from_millis(100),
            },
            tx,
            hook,
        )
        .expect("feed runtime");
        // Opening a fifo for reading blocks until a writer shows up.
        std::thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        feed.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));

        let _ = std::fs::remove_file(&fifo);
    }

    #[test]
    fn shutdown_is_prompt_for_an_idle_worker() {
        use std::time::{Duration, Instant};

        let (tx, _rx) = unbounded();
        let (hook, _count) = counting_hook();
        let missing = std::env::temp_dir().join("voice-overlay-missing/never.pipe");
        let feed = FeedRuntime::start(
            FeedWorkerConfig {
                source: StateSource::Path(missing),
                reopen_delay: Duration::from_secs(30),
            },
            tx,
            hook,
        )
        .expect("feed runtime");
        std::thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        feed.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
