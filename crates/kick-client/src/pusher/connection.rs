use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as Msg;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use super::frame::{PusherFrame, decode_frame, pong_frame, subscribe_frame};
use super::*;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a run ended, paired with the single notification it produces.
struct Terminal {
    reason: ExitReason,
    event: ListenerEvent,
}

impl Terminal {
    fn error(reason: ExitReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            event: ListenerEvent::Error(message.into()),
        }
    }

    fn cancelled() -> Self {
        Self {
            reason: ExitReason::Cancelled,
            event: ListenerEvent::System("Chat disconnected (cancelled).".into()),
        }
    }
}

impl PusherListener {
    /// Listen to a chatroom until cancelled or the connection ends.
    ///
    /// Events reach `sink` in frame order. Exactly one terminal event is
    /// emitted before returning, including on cancellation.
    pub async fn listen<S: EventSink + ?Sized>(
        &self,
        chatroom_id: u64,
        sink: &S,
        cancel: &CancellationToken,
    ) -> ExitReason {
        let terminal = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(chatroom_id, "Chat listener cancelled");
                Terminal::cancelled()
            }
            terminal = self.run(chatroom_id, sink) => terminal,
        };
        tracing::info!(
            chatroom_id,
            state = ?ListenerState::Closed,
            reason = ?terminal.reason,
            "Chat listener finished"
        );
        sink.emit(terminal.event);
        terminal.reason
    }

    async fn run<S: EventSink + ?Sized>(&self, chatroom_id: u64, sink: &S) -> Terminal {
        let url = self.config.url.as_str();
        let target = url::Url::parse(url).ok();
        tracing::info!(chatroom_id, url, state = ?ListenerState::Connecting, "Connecting to Pusher");

        let mut ws = match tokio::time::timeout(
            self.config.connect_timeout,
            Self::open(chatroom_id, url, target.as_ref()),
        )
        .await
        {
            Ok(Ok(ws)) => ws,
            Ok(Err(terminal)) => return terminal,
            Err(_) => {
                tracing::warn!(chatroom_id, "Pusher connect timed out");
                return Terminal::error(ExitReason::ConnectTimeout, "Chat connection timed out.");
            }
        };

        let host = target
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or("unknown");
        sink.emit(ListenerEvent::System(format!(
            "Connected to Pusher (Host: {host}) for chatroom {chatroom_id}"
        )));

        tracing::debug!(chatroom_id, state = ?ListenerState::Subscribing, "Subscribing");
        if let Err(e) = ws.send(Msg::Text(subscribe_frame(chatroom_id).into())).await {
            tracing::warn!(chatroom_id, error = %e, "Pusher subscribe send failed");
            return Terminal::error(ExitReason::Error, format!("Chat connection error: {e}"));
        }

        tracing::debug!(chatroom_id, state = ?ListenerState::Active, "Listening");
        self.receive_loop(chatroom_id, &mut ws, sink).await
    }

    /// Resolve the host, then run the WebSocket handshake.
    async fn open(chatroom_id: u64, url: &str, target: Option<&url::Url>) -> Result<WsStream, Terminal> {
        let endpoint = target.and_then(|u| Some((u.host_str()?, u.port_or_known_default()?)));
        if let Some((host, port)) = endpoint {
            if let Err(e) = tokio::net::lookup_host((host, port)).await {
                tracing::warn!(chatroom_id, host, error = %e, "Pusher host lookup failed");
                return Err(Terminal::error(
                    ExitReason::ConnectFailed,
                    format!("Cannot resolve chat server: {e}."),
                ));
            }
        }

        match connect_async(url).await {
            Ok((ws, _)) => Ok(ws),
            Err(e) => {
                tracing::warn!(chatroom_id, error = %e, "Pusher connect failed");
                Err(Terminal::error(ExitReason::ConnectFailed, describe_connect_error(&e)))
            }
        }
    }

    async fn receive_loop<S: EventSink + ?Sized>(
        &self,
        chatroom_id: u64,
        ws: &mut WsStream,
        sink: &S,
    ) -> Terminal {
        let mut idle_reads: u32 = 0;
        loop {
            let next = match tokio::time::timeout(self.config.read_timeout, ws.next()).await {
                Ok(next) => next,
                Err(_) => {
                    idle_reads += 1;
                    if idle_reads >= self.config.max_idle_reads.max(1) {
                        let silent = self.config.read_timeout * idle_reads;
                        tracing::warn!(chatroom_id, silent_secs = silent.as_secs(), "Pusher connection silent, giving up");
                        return Terminal::error(
                            ExitReason::IdleTimeout,
                            format!("Chat connection timed out (no data for {}s).", silent.as_secs()),
                        );
                    }
                    tracing::debug!(chatroom_id, idle_reads, "Pusher read timeout");
                    continue;
                }
            };
            idle_reads = 0;

            match next {
                Some(Ok(Msg::Text(text))) => {
                    if let Err(e) = Self::handle_text(chatroom_id, &text, ws, sink).await {
                        tracing::warn!(chatroom_id, error = %e, "Pusher pong send failed");
                        return Terminal::error(ExitReason::Error, format!("Chat connection error: {e}"));
                    }
                }
                Some(Ok(Msg::Ping(data))) => {
                    let _ = ws.send(Msg::Pong(data)).await;
                }
                Some(Ok(Msg::Close(frame))) => {
                    tracing::info!(chatroom_id, "Pusher closed the connection");
                    return Terminal::error(ExitReason::Closed, describe_close(frame.as_ref()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(chatroom_id, error = %e, "Pusher read failed");
                    return Terminal::error(ExitReason::Closed, format!("Chat connection error: {e}"));
                }
                None => {
                    tracing::info!(chatroom_id, "Pusher stream ended");
                    return Terminal::error(
                        ExitReason::Closed,
                        "Chat disconnected: stream ended (Code: 1006)",
                    );
                }
            }
        }
    }

    /// Decode and dispatch one text frame. Only a failed pong send is fatal.
    async fn handle_text<S: EventSink + ?Sized>(
        chatroom_id: u64,
        text: &str,
        ws: &mut WsStream,
        sink: &S,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                let preview: String = text.chars().take(200).collect();
                tracing::warn!(chatroom_id, error = %e, frame = %preview, "Malformed Pusher frame");
                return Ok(());
            }
        };

        match frame {
            PusherFrame::ConnectionEstablished {
                socket_id,
                activity_timeout,
            } => {
                tracing::info!(chatroom_id, ?socket_id, ?activity_timeout, "Pusher connection established");
                sink.emit(ListenerEvent::System(format!(
                    "Pusher connection established. Socket ID: {}",
                    socket_id.as_deref().unwrap_or("unknown")
                )));
            }
            PusherFrame::SubscriptionSucceeded { channel } => {
                sink.emit(ListenerEvent::System(format!(
                    "Subscribed to {}",
                    channel.unwrap_or_else(|| chatroom_topic(chatroom_id))
                )));
            }
            PusherFrame::Ping => {
                tracing::trace!(chatroom_id, "Pusher ping");
                ws.send(Msg::Text(pong_frame().into())).await?;
            }
            PusherFrame::ChatMessage(message) => {
                sink.emit(ListenerEvent::Chat(message));
            }
            PusherFrame::Error { code, message } => {
                tracing::warn!(chatroom_id, ?code, ?message, "Pusher error event");
            }
            PusherFrame::Other(event) => {
                tracing::debug!(chatroom_id, event, "Unhandled Pusher event");
            }
        }
        Ok(())
    }
}

fn describe_close(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) => {
            let reason = frame.reason.as_str();
            let reason = if reason.is_empty() { "connection closed" } else { reason };
            format!("Chat disconnected: {reason} (Code: {})", u16::from(frame.code))
        }
        None => "Chat disconnected: connection closed (Code: 1005)".into(),
    }
}

fn describe_connect_error(e: &tokio_tungstenite::tungstenite::Error) -> String {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match e {
        WsError::Url(_) => "Invalid chat server URI.".into(),
        WsError::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            "Chat server refused connection.".into()
        }
        other => format!("Chat connection error: {other}"),
    }
}
