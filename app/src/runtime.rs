//! Scheduler thread hosting all network I/O.
//!
//! A dedicated OS thread runs a single-threaded tokio runtime with the
//! orchestrator actor. The UI thread talks to it only through the
//! [`OrchestratorHandle`] and drains the delivery queue on its own tick.

use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use kick_client::emotes::EmoteRegistry;
use kick_client::pusher::PusherListener;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::events::{EventReceiver, EventSender};
use crate::orchestrator::{Orchestrator, OrchestratorHandle, Services};
use crate::render::{RowRenderer, SharedEmotes};
use crate::services::http::SharedHttp;
use crate::services::image_cache::ImageCaches;

/// Running core: scheduler thread plus the handles the UI needs.
pub struct Core {
    handle: OrchestratorHandle,
    caches: ImageCaches,
    emotes: SharedEmotes,
    quit: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Core {
    /// Start the scheduler thread. Returns the core and the consumer end of
    /// the delivery queue.
    pub fn start(config: &AppConfig) -> Result<(Self, EventReceiver), anyhow::Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let http = SharedHttp::new();
        let emotes: SharedEmotes = Arc::new(RwLock::new(EmoteRegistry::new()));
        let caches = ImageCaches::new(
            &http,
            runtime.handle().clone(),
            config.emote_size,
            config.badge_size,
        );
        let (events, rx) = EventSender::channel();
        let (handle, commands) = OrchestratorHandle::channel();
        let services = Services {
            http,
            emotes: emotes.clone(),
            api_base: config.kick_api_base.clone(),
            seventv_base: config.seventv_api_base.clone(),
            global_set_id: config.seventv_global_set_id.clone(),
            listener: PusherListener::new(config.listener_config()),
        };
        let orchestrator = Orchestrator::new(services, events, &handle);

        let quit = CancellationToken::new();
        let signal_quit = quit.clone();
        let thread = std::thread::Builder::new()
            .name("kick-scheduler".into())
            .spawn(move || {
                runtime.block_on(async move {
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            tracing::info!("Interrupt received");
                            signal_quit.cancel();
                        }
                    });
                    orchestrator.run(commands).await;
                });
                tracing::info!("Scheduler thread exiting");
            })?;

        Ok((
            Self {
                handle,
                caches,
                emotes,
                quit,
                thread: Some(thread),
            },
            rx,
        ))
    }

    pub fn handle(&self) -> &OrchestratorHandle {
        &self.handle
    }

    /// Renderer bound to this core's caches and emote registry.
    pub fn renderer(&self) -> RowRenderer {
        RowRenderer::new(self.caches.clone(), self.emotes.clone())
    }

    /// True once Ctrl+C has been received.
    pub fn quit_requested(&self) -> bool {
        self.quit.is_cancelled()
    }

    /// Close every session, release the HTTP client and join the scheduler.
    /// Blocks the calling thread; never call from inside the runtime.
    pub fn shutdown(mut self) {
        let done = self.handle.shutdown();
        if done.blocking_recv().is_err() {
            tracing::warn!("Orchestrator stopped before acknowledging shutdown");
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Scheduler thread panicked");
            }
        }
    }
}
