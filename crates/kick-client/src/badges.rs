//! Known Kick badge types and their vector image URLs.

const BADGE_BASE: &str = "https://www.kickdatabase.com/kickBadges";

/// Badge type -> SVG file name.
const BADGE_FILES: &[(&str, &str)] = &[
    ("moderator", "moderator.svg"),
    ("subscriber", "subscriber.svg"),
    ("founder", "founder.svg"),
    ("vip", "vip.svg"),
    ("og", "og.svg"),
    ("staff", "staff.svg"),
    ("verified", "verified.svg"),
    ("broadcaster", "broadcaster.svg"),
    ("sub_gifter", "subGifter.svg"),
    ("sidekick", "sidekick.svg"),
    ("trainwreckstv", "trainwreckstv.svg"),
];

/// Vector image URL for a badge type, if the type is known.
pub fn badge_svg_url(badge_type: &str) -> Option<String> {
    BADGE_FILES
        .iter()
        .find(|(kind, _)| *kind == badge_type)
        .map(|(_, file)| format!("{BADGE_BASE}/{file}"))
}

/// All known badge types.
pub fn known_badge_types() -> impl Iterator<Item = &'static str> {
    BADGE_FILES.iter().map(|(kind, _)| *kind)
}
