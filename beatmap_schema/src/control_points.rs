use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Milliseconds, SampleSet};

pub const MIN_BEAT_LENGTH: f64 = 6.0;
pub const MAX_BEAT_LENGTH: f64 = 60_000.0;
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;
pub const MAX_SPEED_MULTIPLIER: f64 = 10.0;

/// Beat length used before the first timing point when a map has none at all.
pub const DEFAULT_BEAT_LENGTH: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPointKind {
    Difficulty,
    Effect,
    Sample,
    Timing,
}

impl ControlPointKind {
    pub fn name(self) -> &'static str {
        match self {
            ControlPointKind::Difficulty => "Difficulty",
            ControlPointKind::Effect => "Effect",
            ControlPointKind::Sample => "Sample",
            ControlPointKind::Timing => "Timing",
        }
    }
}

/// Uninherited point: starts a new beat grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    pub beat_length: f64,
    pub time_signature: u32,
}

impl TimingPoint {
    pub fn new(beat_length: f64, time_signature: u32) -> Self {
        Self {
            beat_length: beat_length.clamp(MIN_BEAT_LENGTH, MAX_BEAT_LENGTH),
            time_signature,
        }
    }

    pub fn bpm(&self) -> f64 {
        60_000.0 / self.beat_length
    }
}

impl Default for TimingPoint {
    fn default() -> Self {
        Self {
            beat_length: DEFAULT_BEAT_LENGTH,
            time_signature: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPoint {
    pub speed_multiplier: f64,
}

impl DifficultyPoint {
    /// Clamps into the legal range and snaps to a precision of 0.01, so that
    /// `-100 / m` re-parsed from text lands on the same value.
    pub fn new(speed_multiplier: f64) -> Self {
        let clamped = speed_multiplier.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER);
        Self {
            speed_multiplier: (clamped * 100.0).round() / 100.0,
        }
    }
}

impl Default for DifficultyPoint {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub sample_set: SampleSet,
    pub custom_sample_index: u32,
    pub volume: u32,
}

impl Default for SamplePoint {
    fn default() -> Self {
        Self {
            sample_set: SampleSet::Normal,
            custom_sample_index: 0,
            volume: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectPoint {
    pub kiai: bool,
    pub omit_first_bar_line: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPoint {
    Timing(TimingPoint),
    Difficulty(DifficultyPoint),
    Sample(SamplePoint),
    Effect(EffectPoint),
}

impl ControlPoint {
    pub fn kind(&self) -> ControlPointKind {
        match self {
            ControlPoint::Timing(_) => ControlPointKind::Timing,
            ControlPoint::Difficulty(_) => ControlPointKind::Difficulty,
            ControlPoint::Sample(_) => ControlPointKind::Sample,
            ControlPoint::Effect(_) => ControlPointKind::Effect,
        }
    }
}

/// All control points sharing one exact timestamp, at most one per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPointGroup {
    pub time: Milliseconds,
    pub points: BTreeMap<ControlPointKind, ControlPoint>,
}

impl ControlPointGroup {
    pub fn new(time: Milliseconds) -> Self {
        Self {
            time,
            points: BTreeMap::new(),
        }
    }

    /// Returns the point previously stored under the same kind, if any.
    pub fn insert(&mut self, point: ControlPoint) -> Option<ControlPoint> {
        self.points.insert(point.kind(), point)
    }

    pub fn get(&self, kind: ControlPointKind) -> Option<&ControlPoint> {
        self.points.get(&kind)
    }

    pub fn timing(&self) -> Option<&TimingPoint> {
        match self.points.get(&ControlPointKind::Timing) {
            Some(ControlPoint::Timing(p)) => Some(p),
            _ => None,
        }
    }

    pub fn difficulty(&self) -> Option<&DifficultyPoint> {
        match self.points.get(&ControlPointKind::Difficulty) {
            Some(ControlPoint::Difficulty(p)) => Some(p),
            _ => None,
        }
    }

    pub fn sample(&self) -> Option<&SamplePoint> {
        match self.points.get(&ControlPointKind::Sample) {
            Some(ControlPoint::Sample(p)) => Some(p),
            _ => None,
        }
    }

    pub fn effect(&self) -> Option<&EffectPoint> {
        match self.points.get(&ControlPointKind::Effect) {
            Some(ControlPoint::Effect(p)) => Some(p),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Time-ordered control point groups plus "effective value at T" lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPointInfo {
    pub groups: Vec<ControlPointGroup>,
}

impl ControlPointInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Adds `point` at `time` unless it would not change the effective state
    /// there. A point of a kind the group already holds replaces it.
    /// Returns whether the point was stored.
    pub fn add(&mut self, time: Milliseconds, point: ControlPoint) -> bool {
        if self.is_redundant(time, &point) {
            return false;
        }
        let idx = self.group_index_or_insert(time);
        self.groups[idx].insert(point);
        true
    }

    fn is_redundant(&self, time: Milliseconds, point: &ControlPoint) -> bool {
        match point {
            ControlPoint::Timing(_) => false,
            ControlPoint::Difficulty(p) => *p == self.difficulty_point_at(time),
            ControlPoint::Effect(p) => {
                let existing = self.effect_point_at(time);
                !p.omit_first_bar_line && p.kiai == existing.kiai
            }
            // The first sample point is kept even when it matches the default,
            // it also seeds the General sample set.
            ControlPoint::Sample(p) => self
                .find_at(time, ControlPointKind::Sample)
                .is_some_and(|existing| *existing == ControlPoint::Sample(*p)),
        }
    }

    fn group_index_or_insert(&mut self, time: Milliseconds) -> usize {
        match self.search(time) {
            Ok(idx) => idx,
            Err(idx) => {
                self.groups.insert(idx, ControlPointGroup::new(time));
                idx
            }
        }
    }

    fn search(&self, time: Milliseconds) -> Result<usize, usize> {
        self.groups.binary_search_by(|g| g.time.total_cmp(&time))
    }

    pub fn group_at(&self, time: Milliseconds) -> Option<&ControlPointGroup> {
        self.search(time).ok().map(|idx| &self.groups[idx])
    }

    /// Nearest point of `kind` at or before `time`.
    fn find_at(&self, time: Milliseconds, kind: ControlPointKind) -> Option<&ControlPoint> {
        let end = match self.search(time) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.groups[..end].iter().rev().find_map(|g| g.get(kind))
    }

    /// Stable re-sort; groups added through [`Self::add`] are already ordered.
    pub fn sort(&mut self) {
        self.groups.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    pub fn shift(&mut self, offset: Milliseconds) {
        for group in &mut self.groups {
            group.time += offset;
        }
    }

    pub fn timing_points(&self) -> impl Iterator<Item = (Milliseconds, &TimingPoint)> + '_ {
        self.groups.iter().filter_map(|g| g.timing().map(|p| (g.time, p)))
    }

    pub fn difficulty_points(&self) -> impl Iterator<Item = (Milliseconds, &DifficultyPoint)> + '_ {
        self.groups.iter().filter_map(|g| g.difficulty().map(|p| (g.time, p)))
    }

    pub fn sample_points(&self) -> impl Iterator<Item = (Milliseconds, &SamplePoint)> + '_ {
        self.groups.iter().filter_map(|g| g.sample().map(|p| (g.time, p)))
    }

    pub fn effect_points(&self) -> impl Iterator<Item = (Milliseconds, &EffectPoint)> + '_ {
        self.groups.iter().filter_map(|g| g.effect().map(|p| (g.time, p)))
    }

    /// Before the first timing point the first one still applies; a map
    /// without any falls back to [`TimingPoint::default`].
    pub fn timing_point_at(&self, time: Milliseconds) -> TimingPoint {
        match self.find_at(time, ControlPointKind::Timing) {
            Some(ControlPoint::Timing(p)) => *p,
            _ => self
                .timing_points()
                .next()
                .map(|(_, p)| *p)
                .unwrap_or_default(),
        }
    }

    pub fn difficulty_point_at(&self, time: Milliseconds) -> DifficultyPoint {
        match self.find_at(time, ControlPointKind::Difficulty) {
            Some(ControlPoint::Difficulty(p)) => *p,
            _ => DifficultyPoint::default(),
        }
    }

    pub fn sample_point_at(&self, time: Milliseconds) -> SamplePoint {
        match self.find_at(time, ControlPointKind::Sample) {
            Some(ControlPoint::Sample(p)) => *p,
            _ => self
                .sample_points()
                .next()
                .map(|(_, p)| *p)
                .unwrap_or_default(),
        }
    }

    pub fn effect_point_at(&self, time: Milliseconds) -> EffectPoint {
        match self.find_at(time, ControlPointKind::Effect) {
            Some(ControlPoint::Effect(p)) => *p,
            _ => EffectPoint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(beat_length: f64) -> ControlPoint {
        ControlPoint::Timing(TimingPoint::new(beat_length, 4))
    }

    #[test]
    fn add_groups_by_exact_time_and_keeps_order() {
        let mut info = ControlPointInfo::new();
        assert!(info.add(1000.0, timing(400.0)));
        assert!(info.add(0.0, timing(500.0)));
        assert!(info.add(1000.0, ControlPoint::Difficulty(DifficultyPoint::new(1.5))));

        let times: Vec<f64> = info.groups.iter().map(|g| g.time).collect();
        assert_eq!(times, vec![0.0, 1000.0]);
        assert_eq!(info.groups[1].points.len(), 2);
    }

    #[test]
    fn same_kind_overwrites_within_group() {
        let mut info = ControlPointInfo::new();
        info.add(0.0, timing(500.0));
        info.add(0.0, timing(250.0));
        assert_eq!(info.groups.len(), 1);
        assert_eq!(info.groups[0].timing().unwrap().beat_length, 250.0);
    }

    #[test]
    fn redundant_difficulty_and_effect_are_dropped() {
        let mut info = ControlPointInfo::new();
        info.add(0.0, timing(500.0));
        assert!(!info.add(0.0, ControlPoint::Difficulty(DifficultyPoint::new(1.0))));
        assert!(!info.add(500.0, ControlPoint::Effect(EffectPoint::default())));
        assert!(info.add(
            500.0,
            ControlPoint::Effect(EffectPoint {
                kiai: false,
                omit_first_bar_line: true,
            })
        ));
        assert!(info.add(1000.0, ControlPoint::Difficulty(DifficultyPoint::new(2.0))));
        assert!(!info.add(2000.0, ControlPoint::Difficulty(DifficultyPoint::new(2.0))));
    }

    #[test]
    fn first_sample_point_is_always_kept() {
        let mut info = ControlPointInfo::new();
        assert!(info.add(0.0, ControlPoint::Sample(SamplePoint::default())));
        assert!(!info.add(100.0, ControlPoint::Sample(SamplePoint::default())));
    }

    #[test]
    fn lookups_fall_back_to_defaults_before_first_point() {
        let mut info = ControlPointInfo::new();
        info.add(1000.0, ControlPoint::Difficulty(DifficultyPoint::new(1.5)));
        assert_eq!(info.difficulty_point_at(0.0).speed_multiplier, 1.0);
        assert_eq!(info.difficulty_point_at(1000.0).speed_multiplier, 1.5);
        assert_eq!(info.difficulty_point_at(5000.0).speed_multiplier, 1.5);
        assert_eq!(info.timing_point_at(0.0), TimingPoint::default());
        assert_eq!(info.effect_point_at(0.0), EffectPoint::default());
        assert_eq!(info.sample_point_at(0.0), SamplePoint::default());
    }

    #[test]
    fn timing_lookup_before_first_uses_first_timing_point() {
        let mut info = ControlPointInfo::new();
        info.add(2000.0, timing(300.0));
        assert_eq!(info.timing_point_at(0.0).beat_length, 300.0);
    }

    #[test]
    fn speed_multiplier_is_clamped_and_snapped() {
        assert_eq!(DifficultyPoint::new(100.0 / 66.66666666666667).speed_multiplier, 1.5);
        assert_eq!(DifficultyPoint::new(50.0).speed_multiplier, MAX_SPEED_MULTIPLIER);
        assert_eq!(DifficultyPoint::new(0.0).speed_multiplier, MIN_SPEED_MULTIPLIER);
        assert_eq!(TimingPoint::new(1.0, 4).beat_length, MIN_BEAT_LENGTH);
    }
}
