use serde::{Deserialize, Serialize};

use crate::{Milliseconds, SampleSet};

/// Coordinates beyond this are clamped on decode.
pub const MAX_COORDINATE_VALUE: f32 = 131_072.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitSound {
    pub normal: bool,
    pub whistle: bool,
    pub finish: bool,
    pub clap: bool,
}

impl HitSound {
    pub const NORMAL: u32 = 1;
    pub const WHISTLE: u32 = 2;
    pub const FINISH: u32 = 4;
    pub const CLAP: u32 = 8;

    /// Unknown bits are dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            normal: bits & Self::NORMAL != 0,
            whistle: bits & Self::WHISTLE != 0,
            finish: bits & Self::FINISH != 0,
            clap: bits & Self::CLAP != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.normal {
            bits |= Self::NORMAL;
        }
        if self.whistle {
            bits |= Self::WHISTLE;
        }
        if self.finish {
            bits |= Self::FINISH;
        }
        if self.clap {
            bits |= Self::CLAP;
        }
        bits
    }
}

/// Per-object sample override (`normal:addition:index:volume:filename`).
/// `Auto` sets and zero volume mean "inherit from the control point".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitSample {
    pub normal_set: SampleSet,
    pub addition_set: SampleSet,
    pub index: u32,
    pub volume: u32,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSet {
    pub normal_set: SampleSet,
    pub addition_set: SampleSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    Bezier,
    Catmull,
    Linear,
    PerfectCurve,
}

impl CurveType {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(CurveType::Bezier),
            'C' => Some(CurveType::Catmull),
            'L' => Some(CurveType::Linear),
            'P' => Some(CurveType::PerfectCurve),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            CurveType::Bezier => 'B',
            CurveType::Catmull => 'C',
            CurveType::Linear => 'L',
            CurveType::PerfectCurve => 'P',
        }
    }
}

/// One slider path vertex. `segment_type` is set when a new segment of that
/// curve type starts at this vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathVertex {
    pub position: Position,
    #[serde(default)]
    pub segment_type: Option<CurveType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderData {
    pub curve_type: CurveType,
    pub control_points: Vec<PathVertex>,
    pub repeat_count: u32,
    pub pixel_length: Option<f64>,
    /// One entry per edge (`repeat_count + 2`).
    pub edge_sounds: Vec<HitSound>,
    pub edge_sets: Vec<EdgeSet>,
}

impl SliderData {
    pub fn span_count(&self) -> u32 {
        self.repeat_count + 1
    }

    pub fn edge_count(&self) -> usize {
        self.repeat_count as usize + 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitObjectKind {
    Circle,
    Slider(SliderData),
    Spinner { end_time: Milliseconds },
    /// Mania only.
    Hold { end_time: Milliseconds },
}

impl HitObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            HitObjectKind::Circle => "circle",
            HitObjectKind::Slider(_) => "slider",
            HitObjectKind::Spinner { .. } => "spinner",
            HitObjectKind::Hold { .. } => "hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitObject {
    pub position: Position,
    pub time: Milliseconds,
    pub new_combo: bool,
    /// Number of combo colours skipped when a new combo starts (0..=7).
    pub combo_skip: u8,
    pub hit_sound: HitSound,
    pub sample: HitSample,
    #[serde(flatten)]
    pub kind: HitObjectKind,
}

impl HitObject {
    pub fn end_time(&self) -> Milliseconds {
        match &self.kind {
            HitObjectKind::Spinner { end_time } | HitObjectKind::Hold { end_time } => *end_time,
            HitObjectKind::Circle | HitObjectKind::Slider(_) => self.time,
        }
    }

    pub fn shift(&mut self, offset: Milliseconds) {
        self.time += offset;
        match &mut self.kind {
            HitObjectKind::Spinner { end_time } | HitObjectKind::Hold { end_time } => {
                *end_time += offset;
            }
            HitObjectKind::Circle | HitObjectKind::Slider(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_sound_bits_map_to_named_flags() {
        let s = HitSound::from_bits(2 | 8 | 64);
        assert!(!s.normal);
        assert!(s.whistle);
        assert!(!s.finish);
        assert!(s.clap);
        assert_eq!(s.bits(), 10);
    }

    #[test]
    fn kind_serialization_includes_type_tag() {
        let obj = HitObject {
            position: Position::new(256.0, 192.0),
            time: 1500.0,
            new_combo: true,
            combo_skip: 0,
            hit_sound: HitSound::default(),
            sample: HitSample::default(),
            kind: HitObjectKind::Spinner { end_time: 3000.0 },
        };

        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(json["type"], "spinner");
        assert_eq!(json["end_time"], 3000.0);
        assert_eq!(json["time"], 1500.0);
        assert_eq!(obj.end_time(), 3000.0);
    }

    #[test]
    fn shift_moves_start_and_end() {
        let mut obj = HitObject {
            position: Position::default(),
            time: 100.0,
            new_combo: false,
            combo_skip: 0,
            hit_sound: HitSound::default(),
            sample: HitSample::default(),
            kind: HitObjectKind::Hold { end_time: 400.0 },
        };
        obj.shift(24.0);
        assert_eq!(obj.time, 124.0);
        assert_eq!(obj.end_time(), 424.0);
    }
}
