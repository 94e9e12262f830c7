use serde::{Deserialize, Serialize};

pub mod control_points;
pub mod hit_objects;
pub mod skin;

pub use control_points::{
    ControlPoint, ControlPointGroup, ControlPointInfo, ControlPointKind, DifficultyPoint,
    EffectPoint, SamplePoint, TimingPoint,
};
pub use hit_objects::{
    CurveType, EdgeSet, HitObject, HitObjectKind, HitSample, HitSound, PathVertex, Position,
    SliderData,
};
pub use skin::{Colour, SkinConfiguration};

pub type Milliseconds = f64;

/// Newest format revision this model is known to represent.
pub const LATEST_FORMAT_VERSION: u32 = 14;

/// Breaks shorter than this have no gameplay effect.
pub const MIN_BREAK_DURATION: Milliseconds = 650.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleSet {
    /// Inherit from the active control point.
    #[default]
    Auto,
    Normal,
    Soft,
    Drum,
}

impl SampleSet {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(SampleSet::Auto),
            1 => Some(SampleSet::Normal),
            2 => Some(SampleSet::Soft),
            3 => Some(SampleSet::Drum),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            SampleSet::Auto => 0,
            SampleSet::Normal => 1,
            SampleSet::Soft => 2,
            SampleSet::Drum => 3,
        }
    }

    /// `None` is the legacy spelling of "no explicit set".
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(SampleSet::Auto),
            "Normal" => Some(SampleSet::Normal),
            "Soft" => Some(SampleSet::Soft),
            "Drum" => Some(SampleSet::Drum),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleSet::Auto => "None",
            SampleSet::Normal => "Normal",
            SampleSet::Soft => "Soft",
            SampleSet::Drum => "Drum",
        }
    }

    /// Control points never stay on `Auto`.
    pub fn or_normal(self) -> Self {
        match self {
            SampleSet::Auto => SampleSet::Normal,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Osu,
    Taiko,
    Catch,
    Mania,
}

impl GameMode {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(GameMode::Osu),
            1 => Some(GameMode::Taiko),
            2 => Some(GameMode::Catch),
            3 => Some(GameMode::Mania),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            GameMode::Osu => 0,
            GameMode::Taiko => 1,
            GameMode::Catch => 2,
            GameMode::Mania => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    pub audio_filename: String,
    pub audio_lead_in: i32,
    pub preview_time: i32,
    pub countdown: i32,
    pub countdown_offset: i32,
    pub sample_set: SampleSet,
    pub sample_volume: u32,
    pub stack_leniency: f32,
    pub mode: GameMode,
    pub letterbox_in_breaks: bool,
    pub special_style: bool,
    pub widescreen_storyboard: bool,
    pub epilepsy_warning: bool,
    pub samples_match_playback_rate: bool,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            audio_filename: String::new(),
            audio_lead_in: 0,
            preview_time: -1,
            countdown: 1,
            countdown_offset: 0,
            sample_set: SampleSet::Normal,
            sample_volume: 100,
            stack_leniency: 0.7,
            mode: GameMode::Osu,
            letterbox_in_breaks: false,
            special_style: false,
            widescreen_storyboard: false,
            epilepsy_warning: false,
            samples_match_playback_rate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSection {
    pub bookmarks: Vec<i32>,
    pub distance_spacing: f64,
    pub beat_divisor: i32,
    pub grid_size: i32,
    pub timeline_zoom: f64,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            bookmarks: Vec::new(),
            distance_spacing: 1.0,
            beat_divisor: 4,
            grid_size: 4,
            timeline_zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub title_unicode: String,
    pub artist: String,
    pub artist_unicode: String,
    pub creator: String,
    /// Difficulty name.
    pub version: String,
    pub source: String,
    pub tags: Vec<String>,
    pub beatmap_id: Option<i32>,
    pub beatmap_set_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultySection {
    pub hp_drain_rate: f32,
    pub circle_size: f32,
    pub overall_difficulty: f32,
    pub approach_rate: f32,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

impl Default for DifficultySection {
    fn default() -> Self {
        Self {
            hp_drain_rate: 5.0,
            circle_size: 5.0,
            overall_difficulty: 5.0,
            approach_rate: 5.0,
            slider_multiplier: 1.4,
            slider_tick_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    Background {
        filename: String,
        x_offset: i32,
        y_offset: i32,
    },
    Video {
        start_time: Milliseconds,
        filename: String,
        x_offset: i32,
        y_offset: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakPeriod {
    pub start_time: Milliseconds,
    pub end_time: Milliseconds,
}

impl BreakPeriod {
    pub fn duration(&self) -> Milliseconds {
        self.end_time - self.start_time
    }

    pub fn has_effect(&self) -> bool {
        self.duration() >= MIN_BREAK_DURATION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    pub format_version: u32,
    pub general: GeneralSection,
    pub editor: EditorSection,
    pub metadata: Metadata,
    pub difficulty: DifficultySection,
    /// Background and video events in file order.
    pub media_events: Vec<MediaEvent>,
    pub breaks: Vec<BreakPeriod>,
    /// Storyboard lines of the `[Events]` section, kept verbatim.
    pub storyboard_lines: Vec<String>,
    pub control_points: ControlPointInfo,
    pub hit_objects: Vec<HitObject>,
}

impl Default for Beatmap {
    fn default() -> Self {
        Self {
            format_version: LATEST_FORMAT_VERSION,
            general: GeneralSection::default(),
            editor: EditorSection::default(),
            metadata: Metadata::default(),
            difficulty: DifficultySection::default(),
            media_events: Vec::new(),
            breaks: Vec::new(),
            storyboard_lines: Vec::new(),
            control_points: ControlPointInfo::default(),
            hit_objects: Vec::new(),
        }
    }
}

impl Beatmap {
    /// Slider velocity in pixels per beat at `time`.
    pub fn slider_velocity_at(&self, time: Milliseconds) -> f64 {
        self.difficulty.slider_multiplier
            * self.control_points.difficulty_point_at(time).speed_multiplier
    }

    pub fn background_filename(&self) -> Option<&str> {
        self.media_events.iter().rev().find_map(|e| match e {
            MediaEvent::Background { filename, .. } => Some(filename.as_str()),
            MediaEvent::Video { .. } => None,
        })
    }

    pub fn has_events(&self) -> bool {
        !self.media_events.is_empty() || !self.breaks.is_empty() || !self.storyboard_lines.is_empty()
    }
}
