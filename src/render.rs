use crate::api::models::{Message, MessageKind, UserId};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// One bubble of the visible transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub outgoing: bool,
    pub kind: MessageKind,
    pub content: String,
    pub time: String,
}

/// Messages between `me` and `partner`, in the order given.
pub fn conversation<'a>(
    messages: &'a [Message],
    me: &'a UserId,
    partner: &'a UserId,
) -> impl Iterator<Item = &'a Message> + 'a {
    messages.iter().filter(move |m| m.involves(me, partner))
}

// offset-less forms seeded by hand into db.json; read as wall time
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_timestamp<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(t.with_timezone(tz));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())?;
    tz.from_local_datetime(&naive).earliest()
}

/// `HH:mm` of an ISO-8601 timestamp in `tz`, or `--:--` if it does not parse.
pub fn format_clock_in<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    parse_timestamp(timestamp.trim(), tz)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub fn transcript_in<Tz: TimeZone>(
    messages: &[Message],
    me: &UserId,
    partner: &UserId,
    tz: &Tz,
) -> Vec<TranscriptLine>
where
    Tz::Offset: std::fmt::Display,
{
    conversation(messages, me, partner)
        .map(|m| TranscriptLine {
            outgoing: &m.sender_id == me,
            kind: m.kind,
            content: m.content.clone(),
            time: format_clock_in(&m.timestamp, tz),
        })
        .collect()
}

/// The visible transcript for (`me`, `partner`) with local clock times.
pub fn transcript(messages: &[Message], me: &UserId, partner: &UserId) -> Vec<TranscriptLine> {
    transcript_in(messages, me, partner, &Local)
}
