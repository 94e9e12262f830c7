use beatmap_schema::{
    ControlPoint, ControlPointInfo, ControlPointKind, DifficultyPoint, EffectPoint, GeneralSection,
    Milliseconds, SamplePoint, SampleSet, TimingPoint,
};
use tracing::trace;

use crate::DecodeError;
use crate::parse::{FieldSite, parse_f64, parse_int};
use crate::tokenizer::ContentLine;

pub(crate) const EFFECT_KIAI: u32 = 1;
pub(crate) const EFFECT_OMIT_FIRST_BAR_LINE: u32 = 8;

/// One `[TimingPoints]` line before it is split into typed control points.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TimingRecord {
    pub(crate) time: Milliseconds,
    /// Beat length when uninherited, `-100 / multiplier` otherwise.
    pub(crate) beat_length: f64,
    pub(crate) meter: u32,
    pub(crate) sample_set: SampleSet,
    pub(crate) sample_index: u32,
    pub(crate) volume: u32,
    pub(crate) uninherited: bool,
    pub(crate) effects: u32,
}

impl TimingRecord {
    /// Negative values encode a velocity multiplier; anything else means 1.
    pub(crate) fn speed_multiplier(&self) -> f64 {
        if self.beat_length < 0.0 {
            100.0 / -self.beat_length
        } else {
            1.0
        }
    }
}

pub(crate) fn parse_timing_record(
    content: &ContentLine,
    general: &GeneralSection,
) -> Result<TimingRecord, DecodeError> {
    let fields: Vec<&str> = content.text.split(',').map(str::trim).collect();
    let site = FieldSite::new(content, "time");
    if fields.len() < 2 {
        return Err(site.error(
            "E1101",
            format!("timing point needs at least 2 fields, found {}", fields.len()),
        ));
    }

    let time = parse_f64(fields[0], site)?;
    let beat_length = parse_f64(fields[1], site.field("beat_length"))?;

    let meter = match fields.get(2) {
        // A leading zero marks files written with an unset meter.
        Some(v) if v.starts_with('0') || v.is_empty() => 4,
        Some(v) => parse_int(v, site.field("meter"))?,
        None => 4,
    };
    let sample_set = match fields.get(3) {
        Some(v) => {
            let index: u32 = parse_int(v, site.field("sample_set"))?;
            SampleSet::from_index(index)
                .ok_or_else(|| site.field("sample_set").error("E2004", format!("unknown sample set {index}")))?
                .or_normal()
        }
        None => general.sample_set.or_normal(),
    };
    let sample_index = match fields.get(4) {
        Some(v) => parse_int(v, site.field("sample_index"))?,
        None => 0,
    };
    let volume = match fields.get(5) {
        Some(v) => parse_int::<i64>(v, site.field("volume"))?.clamp(0, 100) as u32,
        None => general.sample_volume,
    };
    let uninherited = match fields.get(6) {
        Some(v) => v.starts_with('1'),
        None => true,
    };
    let effects = match fields.get(7) {
        Some(v) => parse_int(v, site.field("effects"))?,
        None => 0,
    };

    Ok(TimingRecord {
        time,
        beat_length,
        meter,
        sample_set,
        sample_index,
        volume,
        uninherited,
        effects,
    })
}

/// Builds control point groups from timing records.
///
/// Records are stably sorted by time before anything is resolved, so a file
/// listing its timing points out of order decodes like the sorted file.
/// Points of one timestamp are staged in two lists: points implied by
/// uninherited records and points stated by inherited records. On flush the
/// inherited list is walked first, newest to oldest, and the first point of
/// each kind wins. Later records override earlier ones, and an inherited
/// record overrides the implicit values of an uninherited one at the same
/// time.
#[derive(Debug, Default)]
pub(crate) struct ControlPointBuilder {
    records: Vec<TimingRecord>,
}

impl ControlPointBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: TimingRecord) {
        self.records.push(record);
    }

    pub(crate) fn finish(mut self) -> ControlPointInfo {
        self.records.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut batch = Batch::default();
        for record in &self.records {
            if batch.time != Some(record.time) {
                batch.flush();
                batch.time = Some(record.time);
            }
            batch.stage(record);
        }
        batch.flush();
        batch.info
    }
}

/// Staging area for the records of a single timestamp.
#[derive(Debug, Default)]
struct Batch {
    info: ControlPointInfo,
    from_timing: Vec<ControlPoint>,
    from_inherited: Vec<ControlPoint>,
    time: Option<Milliseconds>,
}

impl Batch {
    fn stage(&mut self, record: &TimingRecord) {
        let effect = EffectPoint {
            kiai: record.effects & EFFECT_KIAI != 0,
            omit_first_bar_line: record.effects & EFFECT_OMIT_FIRST_BAR_LINE != 0,
        };
        let sample = SamplePoint {
            sample_set: record.sample_set,
            custom_sample_index: record.sample_index,
            volume: record.volume,
        };
        let derived = [
            ControlPoint::Difficulty(DifficultyPoint::new(record.speed_multiplier())),
            ControlPoint::Effect(effect),
            ControlPoint::Sample(sample),
        ];

        if record.uninherited {
            self.from_timing
                .push(ControlPoint::Timing(TimingPoint::new(record.beat_length, record.meter)));
            self.from_timing.extend(derived);
        } else {
            self.from_inherited.extend(derived);
        }
    }

    fn flush(&mut self) {
        let Some(time) = self.time.take() else {
            return;
        };
        let mut seen: Vec<ControlPointKind> = Vec::with_capacity(4);
        let staged = self.from_inherited.drain(..).rev().chain(self.from_timing.drain(..).rev());
        for point in staged {
            let kind = point.kind();
            if seen.contains(&kind) {
                continue;
            }
            seen.push(kind);
            if !self.info.add(time, point) {
                trace!(time, kind = kind.name(), "dropping redundant control point");
            }
        }
    }
}
