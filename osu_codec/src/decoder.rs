use std::io::BufRead;

use beatmap_schema::{Beatmap, MediaEvent, Milliseconds, SkinConfiguration};
use tracing::{debug, info};

use crate::events::decode_event;
use crate::hit_objects::decode_hit_object;
use crate::line_source::LineReader;
use crate::sections::KeyValueDecoder;
use crate::timing::{ControlPointBuilder, parse_timing_record};
use crate::tokenizer::{Section, Tokenizer};
use crate::version::resolve_version;
use crate::{DecodeError, DecodeOptions, DecodedBeatmap};

/// Single pass over the input: version line, then every content line is
/// routed to the decoder of its section.
pub(crate) fn decode_reader<R: BufRead>(
    reader: R,
    options: &DecodeOptions,
) -> Result<DecodedBeatmap, DecodeError> {
    let mut lines = LineReader::new(reader);
    let version = resolve_version(&mut lines)?;
    debug!(%version, "format version resolved");

    let mut beatmap = Beatmap {
        format_version: version.number(),
        ..Beatmap::default()
    };
    let mut skin = SkinConfiguration::default();
    let mut key_values = KeyValueDecoder::new(version, &mut beatmap);
    let mut control_points = ControlPointBuilder::new();
    let mut skipped_objects = 0usize;

    let mut tokenizer = Tokenizer::new(lines);
    while let Some(content) = tokenizer.next_content()? {
        match content.section {
            Section::General => key_values.general(&mut beatmap, &mut skin, &content)?,
            Section::Editor => key_values.editor(&mut beatmap, &content)?,
            Section::Metadata => key_values.metadata(&mut beatmap, &content)?,
            Section::Difficulty => key_values.difficulty(&mut beatmap, &content)?,
            Section::Colours => key_values.colours(&mut skin, &content)?,
            Section::Events => decode_event(&mut beatmap, &content)?,
            Section::TimingPoints => {
                control_points.push(parse_timing_record(&content, &beatmap.general)?);
            }
            Section::HitObjects => match decode_hit_object(&content, version)? {
                Some(obj) => beatmap.hit_objects.push(obj),
                None => skipped_objects += 1,
            },
            // The tokenizer never yields lines outside a known section.
            Section::None | Section::Unknown(_) => {}
        }
    }

    key_values.finish(&mut beatmap);
    beatmap.control_points = control_points.finish();

    let offset = version.timing_offset();
    if options.apply_offsets && offset != 0.0 {
        debug!(offset, "applying early version timing offset");
        apply_offset(&mut beatmap, offset);
    }

    info!(
        version = version.number(),
        groups = beatmap.control_points.groups.len(),
        hit_objects = beatmap.hit_objects.len(),
        skipped_objects,
        "beatmap decoded"
    );
    Ok(DecodedBeatmap { beatmap, skin })
}

/// Moves every timed element by `offset`. Storyboard lines stay verbatim.
fn apply_offset(beatmap: &mut Beatmap, offset: Milliseconds) {
    beatmap.control_points.shift(offset);
    for obj in &mut beatmap.hit_objects {
        obj.shift(offset);
    }
    for period in &mut beatmap.breaks {
        period.start_time += offset;
        period.end_time += offset;
    }
    for event in &mut beatmap.media_events {
        if let MediaEvent::Video { start_time, .. } = event {
            *start_time += offset;
        }
    }
    if beatmap.general.preview_time >= 0 {
        beatmap.general.preview_time = beatmap.general.preview_time.saturating_add(offset as i32);
    }
}
