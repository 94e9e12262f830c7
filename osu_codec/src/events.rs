use beatmap_schema::{Beatmap, BreakPeriod, MediaEvent};
use tracing::warn;

use crate::DecodeError;
use crate::parse::{FieldSite, parse_f64, parse_int};
use crate::tokenizer::ContentLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventType {
    Background,
    Video,
    Break,
    /// Anything the model keeps as raw storyboard text.
    Other,
}

impl EventType {
    fn parse(tag: &str) -> Self {
        match tag {
            "0" | "Background" => EventType::Background,
            "1" | "Video" => EventType::Video,
            "2" | "Break" => EventType::Break,
            _ => EventType::Other,
        }
    }
}

pub(crate) fn decode_event(beatmap: &mut Beatmap, content: &ContentLine) -> Result<(), DecodeError> {
    let text = content.text.as_str();
    // Indented or underscore-prefixed lines are storyboard commands.
    if text.starts_with([' ', '_']) {
        beatmap.storyboard_lines.push(text.to_string());
        return Ok(());
    }

    let fields = split_fields(text);
    let site = FieldSite::new(content, "type");
    match EventType::parse(fields[0]) {
        EventType::Background => {
            require_fields(&fields, 3, site)?;
            beatmap.media_events.push(MediaEvent::Background {
                filename: clean_filename(fields[2]),
                x_offset: optional_int(&fields, 3, site.field("x_offset"))?,
                y_offset: optional_int(&fields, 4, site.field("y_offset"))?,
            });
        }
        EventType::Video => {
            require_fields(&fields, 3, site)?;
            beatmap.media_events.push(MediaEvent::Video {
                start_time: parse_f64(fields[1], site.field("start_time"))?,
                filename: clean_filename(fields[2]),
                x_offset: optional_int(&fields, 3, site.field("x_offset"))?,
                y_offset: optional_int(&fields, 4, site.field("y_offset"))?,
            });
        }
        EventType::Break => {
            require_fields(&fields, 3, site)?;
            let start_time = parse_f64(fields[1], site.field("start_time"))?;
            let end_time = parse_f64(fields[2], site.field("end_time"))?.max(start_time);
            let period = BreakPeriod {
                start_time,
                end_time,
            };
            if period.has_effect() {
                beatmap.breaks.push(period);
            } else {
                warn!(
                    line = content.line,
                    duration = period.duration(),
                    "dropping break too short to have an effect"
                );
            }
        }
        EventType::Other => beatmap.storyboard_lines.push(text.to_string()),
    }
    Ok(())
}

fn require_fields(fields: &[&str], count: usize, site: FieldSite<'_>) -> Result<(), DecodeError> {
    if fields.len() < count {
        return Err(site.error(
            "E1101",
            format!("event needs at least {count} fields, found {}", fields.len()),
        ));
    }
    Ok(())
}

fn optional_int(fields: &[&str], idx: usize, site: FieldSite<'_>) -> Result<i32, DecodeError> {
    match fields.get(idx) {
        Some(v) if !v.is_empty() => parse_int(v, site),
        _ => Ok(0),
    }
}

/// Comma split that leaves commas inside double quotes alone.
fn split_fields(text: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(text[start..].trim());
    fields
}

fn clean_filename(raw: &str) -> String {
    raw.trim().trim_matches('"').replace('\\', "/")
}
