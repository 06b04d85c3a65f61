mod app;
mod channel;
mod composer;
mod config;
mod feed;
mod game_state;
mod palette;
mod protocol;
mod roster;
mod viewport;
mod voice_state;

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use anyhow::Result;
use eframe::egui;
use tracing::info;

use crate::{
    app::OverlayApp,
    config::OverlayConfig,
    feed::{FeedRuntime, FeedWorkerConfig, RepaintHook, StateSource},
    protocol::IncomingMessage,
};

// eframe owns the main thread; the feed runs on its own runtime so that
// teardown can bound how long it waits for a blocked read.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_path) = OverlayConfig::load_or_create()?;
    info!(path = %config_path.display(), "loaded overlay config");
    let (tx, rx) = crossbeam_channel::unbounded::<IncomingMessage>();

    // The UI context only exists once the window is up; pushes before that
    // wait in the channel and are drawn on the first frame.
    let ui_ctx: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
    let repaint: RepaintHook = {
        let ui_ctx = ui_ctx.clone();
        Arc::new(move || {
            if let Some(ctx) = ui_ctx.get() {
                ctx.request_repaint();
            }
        })
    };
    let feed = FeedRuntime::start(
        FeedWorkerConfig {
            source: StateSource::from_config(config.state_source.as_deref()),
            reopen_delay: Duration::from_millis(config.reopen_delay_ms.max(100)),
        },
        tx,
        repaint,
    )?;

    let mut viewport = egui::ViewportBuilder::default()
        .with_title("Voice Overlay")
        .with_transparent(true)
        .with_decorations(false)
        .with_maximized(true)
        .with_mouse_passthrough(config.window.mouse_passthrough)
        .with_taskbar(false);
    if config.window.always_on_top {
        viewport = viewport.with_always_on_top();
    }

    let native_options = eframe::NativeOptions {
        viewport,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Voice Overlay",
        native_options,
        Box::new(move |cc| {
            let _ = ui_ctx.set(cc.egui_ctx.clone());
            Ok(Box::new(OverlayApp::new(rx, config)))
        }),
    );
    feed.shutdown();
    result.map_err(|err| anyhow::anyhow!("failed starting overlay window: {err}"))?;

    Ok(())
}
