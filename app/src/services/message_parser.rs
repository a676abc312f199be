//! Splits chat content into text runs and inline emotes.
//!
//! Kick sends its own emotes inline as `[emote:<id>:<name>]` placeholders with
//! metadata alongside the message. 7TV emotes are plain words resolved
//! against the emote registry, channel scope first.

use std::collections::HashMap;
use std::sync::LazyLock;

use kick_client::EmoteMeta;
use kick_client::emotes::{EmoteRecord, EmoteRegistry};
use regex::Regex;

static KICK_EMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[emote:(\d+):([^\]]+)\]").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// One rendering unit of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    KickEmote(EmoteMeta),
    SevenTvEmote(EmoteRecord),
}

/// Name lookup in the 7TV namespace.
pub trait EmoteLookup {
    fn lookup_emote(&self, name: &str, channel: Option<&str>) -> Option<EmoteRecord>;
}

impl EmoteLookup for EmoteRegistry {
    fn lookup_emote(&self, name: &str, channel: Option<&str>) -> Option<EmoteRecord> {
        self.lookup(name, channel).cloned()
    }
}

/// Parse `content` into ordered segments.
///
/// Unresolved placeholders stay as literal text. Whitespace is preserved
/// exactly, and adjacent text is merged into one run.
pub fn parse_content<L: EmoteLookup + ?Sized>(
    content: &str,
    metadata: &[EmoteMeta],
    emotes: &L,
    channel: Option<&str>,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    for segment in split_kick_placeholders(content, metadata) {
        match segment {
            Segment::Text(text) => split_words(&text, emotes, channel, &mut segments),
            other => segments.push(other),
        }
    }
    merge_text(segments)
}

fn split_kick_placeholders(content: &str, metadata: &[EmoteMeta]) -> Vec<Segment> {
    let by_id: HashMap<&str, &EmoteMeta> = metadata
        .iter()
        .filter(|m| !m.id.is_empty())
        .map(|m| (m.id.as_str(), m))
        .collect();

    let mut out = Vec::new();
    let mut last = 0;
    for caps in KICK_EMOTE.captures_iter(content) {
        let (Some(whole), Some(id), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Text(content[last..whole.start()].to_string()));
        }
        match by_id.get(id.as_str()) {
            Some(meta) => {
                let mut meta = (*meta).clone();
                if meta.name.is_empty() {
                    meta.name = name.as_str().to_string();
                }
                out.push(Segment::KickEmote(meta));
            }
            None => out.push(Segment::Text(whole.as_str().to_string())),
        }
        last = whole.end();
    }
    if last < content.len() {
        out.push(Segment::Text(content[last..].to_string()));
    }
    out
}

fn split_words<L: EmoteLookup + ?Sized>(
    text: &str,
    emotes: &L,
    channel: Option<&str>,
    out: &mut Vec<Segment>,
) {
    let push_word = |word: &str, out: &mut Vec<Segment>| {
        if word.is_empty() {
            return;
        }
        match emotes.lookup_emote(word, channel) {
            Some(record) => out.push(Segment::SevenTvEmote(record)),
            None => out.push(Segment::Text(word.to_string())),
        }
    };

    let mut last = 0;
    for space in WHITESPACE.find_iter(text) {
        push_word(&text[last..space.start()], out);
        out.push(Segment::Text(space.as_str().to_string()));
        last = space.end();
    }
    push_word(&text[last..], out);
}

fn merge_text(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let (Segment::Text(text), Some(Segment::Text(run))) = (&segment, merged.last_mut()) {
            run.push_str(text);
            continue;
        }
        merged.push(segment);
    }
    merged
}

#[cfg(test)]
mod tests {
    use kick_client::emotes::EmoteScope;

    use super::*;

    fn meta(id: &str, name: &str, url: Option<&str>) -> EmoteMeta {
        EmoteMeta {
            id: id.into(),
            name: name.into(),
            url: url.map(str::to_string),
        }
    }

    fn record(name: &str, url: &str, scope: EmoteScope) -> EmoteRecord {
        EmoteRecord {
            id: format!("7tv-{name}"),
            name: name.into(),
            url: url.into(),
            animated: false,
            scope,
        }
    }

    fn text(s: &str) -> Segment {
        Segment::Text(s.into())
    }

    #[test]
    fn kick_placeholder_round_trip() {
        let registry = EmoteRegistry::new();
        let parts = parse_content(
            "hello [emote:5:Kappa] world",
            &[meta("5", "Kappa", Some("u"))],
            &registry,
            Some("xqc"),
        );
        assert_eq!(
            parts,
            vec![
                text("hello "),
                Segment::KickEmote(meta("5", "Kappa", Some("u"))),
                text(" world"),
            ]
        );
    }

    #[test]
    fn unknown_placeholder_stays_literal() {
        let registry = EmoteRegistry::new();
        let alone = parse_content("[emote:9:Nope]", &[], &registry, None);
        assert_eq!(alone, vec![text("[emote:9:Nope]")]);

        let inline = parse_content(
            "a [emote:9:Nope] b",
            &[meta("5", "Kappa", None)],
            &registry,
            None,
        );
        assert_eq!(inline, vec![text("a [emote:9:Nope] b")]);
    }

    #[test]
    fn placeholder_name_fills_missing_metadata_name() {
        let registry = EmoteRegistry::new();
        let parts = parse_content("[emote:7:KEKW]", &[meta("7", "", None)], &registry, None);
        assert_eq!(parts, vec![Segment::KickEmote(meta("7", "KEKW", None))]);
    }

    #[test]
    fn adjacent_placeholders_have_no_text_between() {
        let registry = EmoteRegistry::new();
        let metas = [meta("1", "A", Some("a")), meta("2", "B", Some("b"))];
        let parts = parse_content("[emote:1:A][emote:2:B]", &metas, &registry, None);
        assert_eq!(
            parts,
            vec![Segment::KickEmote(metas[0].clone()), Segment::KickEmote(metas[1].clone())]
        );
    }

    #[test]
    fn seventv_words_use_channel_scope_first() {
        let mut registry = EmoteRegistry::new();
        registry.set_global(vec![
            record("Clap", "https://g/clap", EmoteScope::Global),
            record("EZ", "https://g/ez", EmoteScope::Global),
        ]);
        registry.set_channel("xqc", vec![record("Clap", "https://c/clap", EmoteScope::Channel)]);

        let parts = parse_content("gg Clap\tEZ  Clapping", &[], &registry, Some("xqc"));
        assert_eq!(
            parts,
            vec![
                text("gg "),
                Segment::SevenTvEmote(record("Clap", "https://c/clap", EmoteScope::Channel)),
                text("\t"),
                Segment::SevenTvEmote(record("EZ", "https://g/ez", EmoteScope::Global)),
                text("  Clapping"),
            ]
        );
    }

    #[test]
    fn whitespace_is_preserved_exactly() {
        let registry = EmoteRegistry::new();
        let input = "  spaced   out\ttext \n";
        assert_eq!(parse_content(input, &[], &registry, None), vec![text(input)]);
        assert!(parse_content("", &[], &registry, None).is_empty());
    }

    #[test]
    fn both_namespaces_in_one_message() {
        let mut registry = EmoteRegistry::new();
        registry.set_global(vec![record("OMEGALUL", "https://g/o", EmoteScope::Global)]);
        let parts = parse_content(
            "OMEGALUL [emote:5:Kappa]",
            &[meta("5", "Kappa", Some("u"))],
            &registry,
            None,
        );
        assert!(matches!(parts[0], Segment::SevenTvEmote(_)));
        assert_eq!(parts[1], text(" "));
        assert!(matches!(parts[2], Segment::KickEmote(_)));
        assert_eq!(parts.len(), 3);
    }
}
