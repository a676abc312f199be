//! Channel session orchestrator.
//!
//! A single actor task owns the session map. Connect, disconnect and shutdown
//! requests arrive as [`Command`]s from any thread; metadata results come back
//! the same way, so nothing else ever touches the map.

use std::collections::HashMap;

use kick_client::emotes::SevenTvClient;
use kick_client::pusher::PusherListener;
use kick_client::{ChannelInfo, KickApiClient, KickError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::app_config::parse_slug_list;
use crate::events::{EventSender, UiEvent};
use crate::render::SharedEmotes;
use crate::services::http::SharedHttp;
use crate::session::{CANCEL_GRACE, ChannelSession, TaskHandle};

/// Message handled by the orchestrator actor.
#[derive(Debug)]
pub enum Command {
    Connect {
        slug: String,
    },
    Disconnect {
        slug: String,
    },
    Sessions {
        reply: oneshot::Sender<Vec<String>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
    /// Result of a session's metadata fetch.
    MetadataReady {
        slug: String,
        session_id: u64,
        result: Result<ChannelInfo, KickError>,
    },
}

pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Thread-safe submission handle.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl OrchestratorHandle {
    pub fn channel() -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Request connections for a comma-separated slug list. Returns the
    /// normalized slugs that were submitted.
    pub fn connect(&self, input: &str) -> Vec<String> {
        let slugs = parse_slug_list(input);
        for slug in &slugs {
            self.submit(Command::Connect { slug: slug.clone() });
        }
        slugs
    }

    pub fn disconnect(&self, slug: &str) {
        self.submit(Command::Disconnect {
            slug: slug.trim().to_lowercase(),
        });
    }

    /// Ask the actor to close every session. The receiver resolves once done,
    /// or errors if the actor is already gone.
    pub fn shutdown(&self) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        self.submit(Command::Shutdown { done });
        rx
    }

    /// Slugs with a live session, sorted.
    pub async fn sessions(&self) -> Vec<String> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Sessions { reply });
        rx.await.unwrap_or_default()
    }

    fn submit(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Orchestrator is not running, command dropped");
        }
    }
}

/// Shared clients and settings used by sessions.
#[derive(Clone)]
pub struct Services {
    pub http: SharedHttp,
    pub emotes: SharedEmotes,
    pub api_base: String,
    pub seventv_base: String,
    pub global_set_id: String,
    pub listener: PusherListener,
}

pub struct Orchestrator {
    services: Services,
    events: EventSender,
    commands: mpsc::WeakUnboundedSender<Command>,
    sessions: HashMap<String, ChannelSession>,
    next_id: u64,
    global_emotes: Option<JoinHandle<()>>,
    root: CancellationToken,
}

impl Orchestrator {
    pub fn new(services: Services, events: EventSender, handle: &OrchestratorHandle) -> Self {
        Self {
            services,
            events,
            commands: handle.tx.downgrade(),
            sessions: HashMap::new(),
            next_id: 0,
            global_emotes: None,
            root: CancellationToken::new(),
        }
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self, mut rx: CommandReceiver) {
        tracing::info!("Orchestrator started");
        while let Some(command) = rx.recv().await {
            match command {
                Command::Connect { slug } => self.connect(slug).await,
                Command::Disconnect { slug } => self.disconnect(&slug).await,
                Command::MetadataReady {
                    slug,
                    session_id,
                    result,
                } => self.on_metadata(&slug, session_id, result).await,
                Command::Sessions { reply } => {
                    let mut slugs: Vec<String> = self.sessions.keys().cloned().collect();
                    slugs.sort();
                    let _ = reply.send(slugs);
                }
                Command::Shutdown { done } => {
                    self.shutdown().await;
                    let _ = done.send(());
                    return;
                }
            }
        }
        self.shutdown().await;
    }

    async fn connect(&mut self, slug: String) {
        if self.sessions.contains_key(&slug) {
            tracing::info!(slug = %slug, "Already connected or connecting");
            self.events.send(UiEvent::AlreadyConnected { slug });
            return;
        }

        let client = match self.services.http.client() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(slug = %slug, error = %e, "Failed to build HTTP client");
                self.events.send(UiEvent::ChannelError {
                    message: format!("Connection to {slug} failed: {e}"),
                    slug,
                });
                return;
            }
        };
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        self.ensure_global_emotes(&client);
        self.next_id += 1;
        let session_id = self.next_id;
        tracing::info!(slug = %slug, session_id, "Connecting channel");
        self.events.system(&slug, format!("Connecting to {slug}..."));

        let api = KickApiClient::with_base_url(client.clone(), &self.services.api_base);
        let seventv = SevenTvClient::with_base_url(client, &self.services.seventv_base);
        let emotes = self.services.emotes.clone();
        let events = self.events.clone();
        let task_slug = slug.clone();

        let task = TaskHandle::spawn("metadata", move |cancel| async move {
            let slug = task_slug;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(slug = %slug, "Metadata fetch cancelled");
                    events.system(&slug, format!("Connection to {slug} cancelled."));
                    return;
                }
                result = api.get_channel_info(&slug) => result,
            };
            let user_id = result.as_ref().ok().and_then(|info| info.user_id);
            let _ = commands.send(Command::MetadataReady {
                slug: slug.clone(),
                session_id,
                result,
            });
            drop(commands);

            let Some(user_id) = user_id else {
                return;
            };
            let records = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                records = seventv.get_channel_emotes(user_id, &slug) => records,
            };
            emotes
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .set_channel(&slug, records);
        });

        let mut session = ChannelSession::new(slug.clone(), session_id);
        session.set_metadata_task(task).await;
        self.sessions.insert(slug, session);
    }

    async fn on_metadata(
        &mut self,
        slug: &str,
        session_id: u64,
        result: Result<ChannelInfo, KickError>,
    ) {
        let Some(session) = self.sessions.get_mut(slug).filter(|s| s.id == session_id) else {
            tracing::debug!(slug, session_id, "Metadata for a closed session ignored");
            return;
        };

        let info = match result {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(slug, error = %e, kind = ?e.kind(), status = ?e.status(), "Channel metadata failed");
                self.events.send(UiEvent::ChannelError {
                    slug: slug.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        tracing::info!(
            slug,
            live = info.is_live,
            viewers = info.viewers,
            chatroom_id = ?info.chatroom_id,
            "Channel metadata received"
        );
        session.info = Some(info.clone());
        session.chatroom_id = info.chatroom_id;
        let name = if info.username.is_empty() {
            slug.to_string()
        } else {
            info.username.clone()
        };
        self.events.send(UiEvent::ChannelInfo {
            slug: slug.to_string(),
            info: info.clone(),
        });
        if !info.is_live {
            self.events.system(slug, format!("Channel {name} is offline."));
        }

        let Some(chatroom_id) = info.chatroom_id else {
            self.events
                .system(slug, format!("Could not find chatroom for {slug}."));
            return;
        };

        self.events.system(slug, format!("Joining chat for {name}..."));
        let listener = self.services.listener.clone();
        let sink = self.events.channel_sink(slug);
        let task_slug = slug.to_string();
        let task = TaskHandle::spawn("listener", move |cancel| async move {
            let reason = listener.listen(chatroom_id, &sink, &cancel).await;
            tracing::info!(slug = %task_slug, ?reason, "Listener task finished");
        });
        session.set_listener_task(task).await;
    }

    /// Every disconnect request is answered with exactly one
    /// `Disconnected`, emitted after the old session's last event.
    async fn disconnect(&mut self, slug: &str) {
        match self.sessions.remove(slug) {
            Some(session) => {
                tracing::info!(slug, "Disconnecting channel");
                session.close(CANCEL_GRACE).await;
                self.services
                    .emotes
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .remove_channel(slug);
            }
            None => tracing::debug!(slug, "Disconnect for unknown channel"),
        }
        self.events.send(UiEvent::Disconnected {
            slug: slug.to_string(),
        });
    }

    async fn shutdown(&mut self) {
        tracing::info!(sessions = self.sessions.len(), "Shutdown sequence started");
        self.root.cancel();

        let sessions: Vec<ChannelSession> = self.sessions.drain().map(|(_, s)| s).collect();
        futures_util::future::join_all(sessions.into_iter().map(|s| s.close(CANCEL_GRACE))).await;
        tracing::info!("Shutdown: sessions closed");

        if let Some(task) = self.global_emotes.take() {
            task.abort();
        }
        self.services.http.release();
        tracing::info!("Shutdown sequence completed");
    }

    /// Fetch the global 7TV set once per process, retrying on a later
    /// connect only if an earlier attempt failed.
    fn ensure_global_emotes(&mut self, client: &reqwest::Client) {
        let loaded = self
            .services
            .emotes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .has_global();
        let in_flight = self.global_emotes.as_ref().is_some_and(|t| !t.is_finished());
        if loaded || in_flight {
            return;
        }

        let seventv = SevenTvClient::with_base_url(client.clone(), &self.services.seventv_base);
        let set_id = self.services.global_set_id.clone();
        let emotes = self.services.emotes.clone();
        let cancel = self.root.clone();
        self.global_emotes = Some(tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = seventv.get_global_emotes(&set_id) => result,
            };
            match result {
                Ok(records) => emotes
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .set_global(records),
                Err(e) => tracing::warn!(set_id = %set_id, error = %e, "Failed to fetch 7TV global emotes"),
            }
        }));
    }
}
