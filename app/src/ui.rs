//! Terminal front-end.
//!
//! Stands in for a windowed UI: one line per event, prefixed with the
//! channel slug. Runs on the main thread and never blocks on I/O other than
//! writing to stdout.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc as std_mpsc;

use kick_client::ChannelInfo;
use tokio::sync::mpsc::error::TryRecvError;

use crate::config::AppConfig;
use crate::events::{EventReceiver, UiEvent};
use crate::render::{ChatRow, Piece, RowRenderer};
use crate::runtime::Core;
use crate::services::image_cache::{HttpImageSource, ImageSource};

const HELP: &str = "Commands: /join <slug[,slug...]>, /part <slug>, /list, /quit";

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Join(String),
    Part(String),
    List,
    Help,
    Quit,
}

/// Parse one input line. Bare text is treated as a join request.
pub fn parse_command(line: &str) -> Option<UserCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(UserCommand::Join(line.to_string()));
    };
    let (verb, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(v, a)| (v, a.trim()))
        .unwrap_or((rest, ""));
    match verb.to_lowercase().as_str() {
        "join" | "connect" if !arg.is_empty() => Some(UserCommand::Join(arg.to_string())),
        "part" | "close" | "leave" if !arg.is_empty() => {
            Some(UserCommand::Part(arg.to_lowercase()))
        }
        "list" => Some(UserCommand::List),
        "quit" | "exit" => Some(UserCommand::Quit),
        _ => Some(UserCommand::Help),
    }
}

/// Event consumer. Events for channels whose view is closed are dropped.
///
/// A part leaves the slug "parting" until the core's matching
/// `Disconnected` arrives; everything queued before it belongs to the old
/// session and is dropped, even if the view was reopened meanwhile.
pub struct TerminalUi<W, S = HttpImageSource> {
    out: W,
    renderer: RowRenderer<S>,
    open: BTreeSet<String>,
    parting: HashMap<String, usize>,
    color: bool,
}

impl<W: Write, S: ImageSource> TerminalUi<W, S> {
    pub fn new(out: W, renderer: RowRenderer<S>, color: bool) -> Self {
        Self {
            out,
            renderer,
            open: BTreeSet::new(),
            parting: HashMap::new(),
            color,
        }
    }

    pub fn open(&mut self, slugs: &[String]) {
        self.open.extend(slugs.iter().cloned());
    }

    /// Close the view ahead of a disconnect request. Returns whether it was
    /// open. The caller must send exactly one disconnect for each part.
    pub fn part(&mut self, slug: &str) -> bool {
        *self.parting.entry(slug.to_string()).or_default() += 1;
        self.open.remove(slug)
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn is_open(&self, slug: &str) -> bool {
        self.open.contains(slug)
    }

    /// Handle everything queued right now. Returns the number of events taken.
    pub fn drain(&mut self, events: &mut EventReceiver) -> io::Result<usize> {
        let mut taken = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    taken += 1;
                    self.handle(event)?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.out.flush()?;
        Ok(taken)
    }

    /// Render one event. Returns false if it was dropped.
    pub fn handle(&mut self, event: UiEvent) -> io::Result<bool> {
        if let Some(pending) = self.parting.get_mut(event.slug()) {
            if matches!(event, UiEvent::Disconnected { .. }) {
                *pending -= 1;
                if *pending == 0 {
                    self.parting.remove(event.slug());
                }
            }
            tracing::trace!(slug = event.slug(), "Event for parted session dropped");
            return Ok(false);
        }
        if !self.open.contains(event.slug()) {
            tracing::trace!(slug = event.slug(), "Event for closed view dropped");
            return Ok(false);
        }
        match event {
            UiEvent::ChannelInfo { slug, info } => {
                let line = format_info(&info);
                writeln!(self.out, "[{slug}] {line}")?;
            }
            UiEvent::ChannelError { slug, message } => {
                writeln!(self.out, "[{slug}] [ERROR] {message}")?;
            }
            UiEvent::AlreadyConnected { slug } => {
                writeln!(self.out, "[{slug}] [SYSTEM] Already connected or connecting to {slug}.")?;
            }
            UiEvent::System { slug, message } => {
                writeln!(self.out, "[{slug}] [SYSTEM] {message}")?;
            }
            UiEvent::Error { slug, message } => {
                writeln!(self.out, "[{slug}] [ERROR] Chat: {message}")?;
            }
            UiEvent::Chat { slug, message } => {
                let row = self.renderer.render(&slug, &message);
                let line = format_row(&row, self.color);
                writeln!(self.out, "[{slug}] {line}")?;
            }
            UiEvent::Disconnected { slug } => {
                writeln!(self.out, "[{slug}] [SYSTEM] Disconnected.")?;
                self.open.remove(&slug);
            }
        }
        Ok(true)
    }

    pub fn print(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    pub fn list(&mut self) -> io::Result<()> {
        let line = if self.open.is_empty() {
            "No open channels.".to_string()
        } else {
            format!(
                "Open channels: {}",
                self.open.iter().cloned().collect::<Vec<_>>().join(", ")
            )
        };
        self.print(&line)
    }
}

fn format_info(info: &ChannelInfo) -> String {
    let status = if info.is_live { "LIVE" } else { "OFFLINE" };
    format!(
        "{} | {status} | {} | {} | {} viewers",
        info.username, info.title, info.category, info.viewers
    )
}

/// Render a row as one terminal line. Images show as `:name:`.
pub fn format_row(row: &ChatRow, color: bool) -> String {
    let mut line = String::new();
    if let Some(time) = row.time {
        line.push_str(&time.with_timezone(&chrono::Local).format("%H:%M:%S ").to_string());
    }
    for piece in &row.badges {
        push_piece(&mut line, piece);
    }
    match hex_rgb(&row.color).filter(|_| color) {
        Some((r, g, b)) => line.push_str(&format!("\x1b[1;38;2;{r};{g};{b}m{}\x1b[0m", row.sender)),
        None => line.push_str(&row.sender),
    }
    line.push_str(": ");
    for piece in &row.body {
        push_piece(&mut line, piece);
    }
    line
}

fn push_piece(line: &mut String, piece: &Piece) {
    match piece {
        Piece::Text(text) => line.push_str(text),
        Piece::Image { label, .. } => {
            line.push(':');
            line.push_str(label);
            line.push(':');
        }
    }
}

fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Read stdin lines on a helper thread. EOF just ends the reader.
fn spawn_stdin_reader() -> io::Result<std_mpsc::Receiver<String>> {
    let (tx, rx) = std_mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            tracing::debug!("stdin closed");
        })?;
    Ok(rx)
}

/// Main UI loop: apply user commands, drain the delivery queue, sleep one tick.
pub fn run(core: Core, mut events: EventReceiver, config: &AppConfig) -> Result<(), anyhow::Error> {
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut ui = TerminalUi::new(stdout, core.renderer(), color);
    let input = spawn_stdin_reader()?;

    ui.print(HELP)?;
    if !config.channels.is_empty() {
        let slugs = core.handle().connect(&config.channels.join(","));
        ui.open(&slugs);
    }

    'ui: loop {
        while let Ok(line) = input.try_recv() {
            match parse_command(&line) {
                Some(UserCommand::Join(list)) => {
                    let slugs = core.handle().connect(&list);
                    ui.open(&slugs);
                }
                Some(UserCommand::Part(slug)) => {
                    let was_open = ui.part(&slug);
                    core.handle().disconnect(&slug);
                    if was_open {
                        ui.print(&format!("Closed {slug}."))?;
                    } else {
                        ui.print(&format!("{slug} is not open, disconnect sent."))?;
                    }
                }
                Some(UserCommand::List) => ui.list()?,
                Some(UserCommand::Help) => ui.print(HELP)?,
                Some(UserCommand::Quit) => break 'ui,
                None => {}
            }
        }
        ui.drain(&mut events)?;
        if core.quit_requested() {
            break;
        }
        std::thread::sleep(config.ui_tick);
    }

    ui.print("Shutting down...")?;
    core.shutdown();
    ui.drain(&mut events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::{Arc, RwLock};

    use kick_client::emotes::EmoteRegistry;
    use kick_client::{ChatMessage, KickError};
    use tokio::runtime::Handle;

    use super::*;
    use crate::events::EventSender;
    use crate::services::image_cache::ImageCaches;

    struct NoImages;

    impl ImageSource for NoImages {
        fn fetch(&self, _url: &str) -> impl Future<Output = Result<Vec<u8>, KickError>> + Send {
            async { Err(KickError::Unavailable("offline test".into())) }
        }
    }

    fn ui() -> TerminalUi<Vec<u8>, NoImages> {
        let caches = ImageCaches::with_sources(|| NoImages, Handle::current(), 28, 18);
        let renderer = RowRenderer::new(caches, Arc::new(RwLock::new(EmoteRegistry::new())));
        TerminalUi::new(Vec::new(), renderer, false)
    }

    fn output(ui: &TerminalUi<Vec<u8>, NoImages>) -> String {
        String::from_utf8_lossy(&ui.out).into_owned()
    }

    #[test]
    fn parses_user_commands() {
        assert_eq!(parse_command("xqc, amouranth"), Some(UserCommand::Join("xqc, amouranth".into())));
        assert_eq!(parse_command("/join a,b"), Some(UserCommand::Join("a,b".into())));
        assert_eq!(parse_command("/part XQC"), Some(UserCommand::Part("xqc".into())));
        assert_eq!(parse_command("/quit"), Some(UserCommand::Quit));
        assert_eq!(parse_command("/list"), Some(UserCommand::List));
        assert_eq!(parse_command("/part"), Some(UserCommand::Help));
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(hex_rgb("#6495ED"), Some((0x64, 0x95, 0xED)));
        assert_eq!(hex_rgb("6495ED"), None);
        assert_eq!(hex_rgb("#zzzzzz"), None);
    }

    #[tokio::test]
    async fn drops_events_for_closed_views() {
        let mut ui = ui();
        let (events, mut rx) = EventSender::channel();
        ui.open(&["xqc".to_string()]);

        events.system("xqc", "Joining chat for xQc...");
        events.system("other", "never shown");
        events.error("xqc", "Chat disconnected (cancelled).");
        assert_eq!(ui.drain(&mut rx).unwrap(), 3);

        let text = output(&ui);
        assert!(text.contains("[xqc] [SYSTEM] Joining chat for xQc..."));
        assert!(text.contains("[xqc] [ERROR] Chat: Chat disconnected (cancelled)."));
        assert!(!text.contains("never shown"));

        ui.part("xqc");
        events.system("xqc", "late");
        ui.drain(&mut rx).unwrap();
        assert!(!output(&ui).contains("late"));
    }

    #[tokio::test]
    async fn chat_rows_render_with_fallbacks() {
        let mut ui = ui();
        ui.open(&["xqc".to_string()]);
        let message: ChatMessage = serde_json::from_value(serde_json::json!({
            "content": "hi [emote:1:Kappa]",
            "emotes": [{"id": 1, "name": "Kappa", "url": "https://kick/1"}],
            "sender": {"username": "viewer", "identity": {"badges": [{"type": "vip", "text": "VIP"}]}}
        }))
        .unwrap();
        ui.handle(UiEvent::Chat {
            slug: "xqc".into(),
            message: Box::new(message),
        })
        .unwrap();
        assert_eq!(output(&ui), "[xqc] [VIP] viewer: hi [Kappa]\n");
    }

    #[tokio::test]
    async fn rejoin_in_same_tick_drops_only_the_old_session() {
        let mut ui = ui();
        let (events, mut rx) = EventSender::channel();
        ui.open(&["xqc".to_string()]);

        assert!(ui.part("xqc"));
        ui.open(&["xqc".to_string()]);
        events.system("xqc", "Chat disconnected (cancelled).");
        events.send(UiEvent::Disconnected { slug: "xqc".into() });
        events.system("xqc", "Connecting to xqc...");
        ui.drain(&mut rx).unwrap();

        assert!(ui.is_open("xqc"));
        assert_eq!(output(&ui), "[xqc] [SYSTEM] Connecting to xqc...\n");

        // a second part still has its own reply to wait for
        assert!(ui.part("xqc"));
        events.send(UiEvent::Disconnected { slug: "xqc".into() });
        ui.drain(&mut rx).unwrap();
        assert!(!ui.is_open("xqc"));
        ui.open(&["xqc".to_string()]);
        events.system("xqc", "fresh");
        ui.drain(&mut rx).unwrap();
        assert!(output(&ui).ends_with("[xqc] [SYSTEM] fresh\n"));
    }

    #[tokio::test]
    async fn disconnected_closes_the_view() {
        let mut ui = ui();
        ui.open(&["xqc".to_string()]);
        assert!(ui.handle(UiEvent::Disconnected { slug: "xqc".into() }).unwrap());
        assert!(!ui.is_open("xqc"));
    }
}
