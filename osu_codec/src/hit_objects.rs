use beatmap_schema::hit_objects::MAX_COORDINATE_VALUE;
use beatmap_schema::{
    CurveType, EdgeSet, HitObject, HitObjectKind, HitSample, HitSound, PathVertex, Position,
    SampleSet, SliderData,
};
use tracing::warn;

use crate::parse::{FieldSite, parse_f32, parse_f64, parse_int};
use crate::tokenizer::ContentLine;
use crate::version::FormatVersion;
use crate::{DecodeError, DecodeErrorKind};

pub(crate) const TYPE_CIRCLE: u32 = 1;
pub(crate) const TYPE_SLIDER: u32 = 1 << 1;
pub(crate) const TYPE_NEW_COMBO: u32 = 1 << 2;
pub(crate) const TYPE_SPINNER: u32 = 1 << 3;
pub(crate) const TYPE_COMBO_SKIP_MASK: u32 = 0b0111_0000;
pub(crate) const TYPE_COMBO_SKIP_SHIFT: u32 = 4;
pub(crate) const TYPE_HOLD: u32 = 1 << 7;

const MAX_SLIDES: i64 = 9000;

/// Decodes one `[HitObjects]` record.
///
/// Structural problems (too few fields for the object type) fail the whole
/// decode. A value that does not convert skips only this record and returns
/// `Ok(None)`.
pub(crate) fn decode_hit_object(
    content: &ContentLine,
    version: FormatVersion,
) -> Result<Option<HitObject>, DecodeError> {
    match parse_hit_object(content, version) {
        Ok(obj) => Ok(Some(obj)),
        Err(e) if e.kind == DecodeErrorKind::Field => {
            warn!(line = content.line, error = %e, "skipping malformed hit object");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn parse_hit_object(content: &ContentLine, version: FormatVersion) -> Result<HitObject, DecodeError> {
    let fields: Vec<&str> = content.text.split(',').map(str::trim).collect();
    let site = FieldSite::new(content, "x");
    require_fields(&fields, 5, "hit object", site)?;

    let position = Position::new(
        clamp_coordinate(parse_f32(fields[0], site)?),
        clamp_coordinate(parse_f32(fields[1], site.field("y"))?),
    );
    let time = parse_f64(fields[2], site.field("time"))?;
    let type_bits: u32 = parse_int(fields[3], site.field("type"))?;
    let hit_sound = HitSound::from_bits(parse_int(fields[4], site.field("hit_sound"))?);

    let new_combo = type_bits & TYPE_NEW_COMBO != 0;
    let combo_skip = if version.has_combo_skip() {
        ((type_bits & TYPE_COMBO_SKIP_MASK) >> TYPE_COMBO_SKIP_SHIFT) as u8
    } else {
        0
    };

    let (kind, sample) = if type_bits & TYPE_CIRCLE != 0 {
        let sample = optional_sample(fields.get(5).copied(), site.field("hit_sample"))?;
        (HitObjectKind::Circle, sample)
    } else if type_bits & TYPE_SLIDER != 0 {
        require_fields(&fields, 7, "slider", site)?;
        parse_slider(&fields, hit_sound, site)?
    } else if type_bits & TYPE_SPINNER != 0 {
        require_fields(&fields, 6, "spinner", site)?;
        let end_time = parse_f64(fields[5], site.field("end_time"))?.max(time);
        let sample = optional_sample(fields.get(6).copied(), site.field("hit_sample"))?;
        (HitObjectKind::Spinner { end_time }, sample)
    } else if type_bits & TYPE_HOLD != 0 {
        parse_hold(fields.get(5).copied(), time, site)?
    } else {
        return Err(site
            .field("type")
            .error("E2004", format!("unknown hit object type {type_bits}")));
    };

    Ok(HitObject {
        position,
        time,
        new_combo,
        combo_skip,
        hit_sound,
        sample,
        kind,
    })
}

fn parse_slider(
    fields: &[&str],
    hit_sound: HitSound,
    site: FieldSite<'_>,
) -> Result<(HitObjectKind, HitSample), DecodeError> {
    let (curve_type, control_points) = parse_path(fields[5], site.field("curve"))?;

    let slides: i64 = parse_int(fields[6], site.field("slides"))?;
    if slides > MAX_SLIDES {
        return Err(site
            .field("slides")
            .error("E2004", format!("repeat count is way too high ({slides})")));
    }
    let repeat_count = (slides - 1).max(0) as u32;

    let pixel_length = match fields.get(7) {
        Some(v) if !v.is_empty() => {
            let length = parse_f64(v, site.field("length"))?.max(0.0);
            (length > 0.0).then_some(length)
        }
        _ => None,
    };

    let sample = optional_sample(fields.get(10).copied(), site.field("hit_sample"))?;

    let edges = repeat_count as usize + 2;
    let mut edge_sounds = vec![hit_sound; edges];
    if let Some(list) = fields.get(8).filter(|v| !v.is_empty()) {
        for (slot, part) in edge_sounds.iter_mut().zip(list.split('|')) {
            *slot = HitSound::from_bits(parse_int(part.trim(), site.field("edge_sounds"))?);
        }
    }

    let object_set = EdgeSet {
        normal_set: sample.normal_set,
        addition_set: sample.addition_set,
    };
    let mut edge_sets = vec![object_set; edges];
    if let Some(list) = fields.get(9).filter(|v| !v.is_empty()) {
        for (slot, part) in edge_sets.iter_mut().zip(list.split('|')) {
            *slot = parse_edge_set(part, site.field("edge_sets"))?;
        }
    }

    let slider = SliderData {
        curve_type,
        control_points,
        repeat_count,
        pixel_length,
        edge_sounds,
        edge_sets,
    };
    Ok((HitObjectKind::Slider(slider), sample))
}

/// `B|x:y|x:y`; a lone letter inside the list starts a new segment of that
/// type at the following vertex.
fn parse_path(
    text: &str,
    site: FieldSite<'_>,
) -> Result<(CurveType, Vec<PathVertex>), DecodeError> {
    let mut curve_type: Option<CurveType> = None;
    let mut pending_segment: Option<CurveType> = None;
    let mut vertices = Vec::new();

    for token in text.split('|').map(str::trim).filter(|t| !t.is_empty()) {
        let mut chars = token.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            if letter.is_ascii_alphabetic() {
                // Unknown letters behave like Catmull, as the format always did.
                let ty = CurveType::from_letter(letter).unwrap_or(CurveType::Catmull);
                if curve_type.is_none() && vertices.is_empty() {
                    curve_type = Some(ty);
                } else {
                    pending_segment = Some(ty);
                }
                continue;
            }
        }

        let (x, y) = token
            .split_once(':')
            .ok_or_else(|| site.error("E2002", format!("invalid path vertex '{token}'")))?;
        vertices.push(PathVertex {
            position: Position::new(
                clamp_coordinate(parse_f32(x, site)?),
                clamp_coordinate(parse_f32(y, site)?),
            ),
            segment_type: pending_segment.take(),
        });
    }

    Ok((curve_type.unwrap_or(CurveType::Catmull), vertices))
}

/// `endTime:normal:addition:index:volume:filename`
fn parse_hold(
    field: Option<&str>,
    time: f64,
    site: FieldSite<'_>,
) -> Result<(HitObjectKind, HitSample), DecodeError> {
    let Some(text) = field.filter(|t| !t.is_empty()) else {
        return Ok((HitObjectKind::Hold { end_time: time }, HitSample::default()));
    };
    let (end, rest) = text.split_once(':').unwrap_or((text, ""));
    let end_time = parse_f64(end, site.field("end_time"))?.max(time);
    let sample = optional_sample(Some(rest), site.field("hit_sample"))?;
    Ok((HitObjectKind::Hold { end_time }, sample))
}

fn optional_sample(field: Option<&str>, site: FieldSite<'_>) -> Result<HitSample, DecodeError> {
    match field {
        Some(text) if !text.is_empty() => parse_hit_sample(text, site),
        _ => Ok(HitSample::default()),
    }
}

fn parse_hit_sample(text: &str, site: FieldSite<'_>) -> Result<HitSample, DecodeError> {
    let parts: Vec<&str> = text.splitn(5, ':').collect();
    let mut sample = HitSample {
        normal_set: parse_sample_set(parts[0], site)?,
        ..HitSample::default()
    };
    if let Some(v) = parts.get(1) {
        sample.addition_set = parse_sample_set(v, site)?;
    }
    if let Some(v) = parts.get(2).filter(|v| !v.trim().is_empty()) {
        sample.index = parse_int(v, site)?;
    }
    if let Some(v) = parts.get(3).filter(|v| !v.trim().is_empty()) {
        sample.volume = parse_int::<i64>(v, site)?.clamp(0, 100) as u32;
    }
    if let Some(v) = parts.get(4) {
        sample.filename = v.to_string();
    }
    Ok(sample)
}

fn parse_edge_set(text: &str, site: FieldSite<'_>) -> Result<EdgeSet, DecodeError> {
    let (normal, addition) = text.split_once(':').unwrap_or((text, "0"));
    Ok(EdgeSet {
        normal_set: parse_sample_set(normal, site)?,
        addition_set: parse_sample_set(addition, site)?,
    })
}

fn parse_sample_set(text: &str, site: FieldSite<'_>) -> Result<SampleSet, DecodeError> {
    let index: u32 = parse_int(text, site)?;
    SampleSet::from_index(index)
        .ok_or_else(|| site.error("E2004", format!("unknown sample set {index}")))
}

fn require_fields(
    fields: &[&str],
    count: usize,
    what: &str,
    site: FieldSite<'_>,
) -> Result<(), DecodeError> {
    if fields.len() < count {
        return Err(site.error(
            "E1101",
            format!("{what} needs at least {count} fields, found {}", fields.len()),
        ));
    }
    Ok(())
}

fn clamp_coordinate(v: f32) -> f32 {
    v.clamp(-MAX_COORDINATE_VALUE, MAX_COORDINATE_VALUE)
}
