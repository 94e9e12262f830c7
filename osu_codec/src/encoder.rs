use std::io::Write;

use beatmap_schema::{
    Beatmap, ControlPointGroup, HitObject, HitObjectKind, HitSample, MediaEvent, SkinConfiguration,
    SliderData,
};
use tracing::debug;

use crate::EncodeError;
use crate::hit_objects::{
    TYPE_CIRCLE, TYPE_COMBO_SKIP_SHIFT, TYPE_HOLD, TYPE_NEW_COMBO, TYPE_SLIDER, TYPE_SPINNER,
};
use crate::timing::{EFFECT_KIAI, EFFECT_OMIT_FIRST_BAR_LINE};
use crate::version::FormatVersion;

/// Serializes `beatmap` and `skin` back into legacy text.
pub fn encode(beatmap: &Beatmap, skin: &SkinConfiguration) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_to_writer(beatmap, skin, &mut out)?;
    Ok(out)
}

pub fn encode_to_writer<W: Write>(
    beatmap: &Beatmap,
    skin: &SkinConfiguration,
    writer: W,
) -> Result<(), EncodeError> {
    let mut encoder = LegacyEncoder {
        beatmap,
        skin,
        version: FormatVersion(beatmap.format_version),
        out: writer,
    };
    encoder.write_all()?;
    encoder.out.flush()?;
    debug!(
        version = beatmap.format_version,
        groups = beatmap.control_points.groups.len(),
        hit_objects = beatmap.hit_objects.len(),
        "beatmap encoded"
    );
    Ok(())
}

struct LegacyEncoder<'a, W> {
    beatmap: &'a Beatmap,
    skin: &'a SkinConfiguration,
    version: FormatVersion,
    out: W,
}

impl<W: Write> LegacyEncoder<'_, W> {
    fn write_all(&mut self) -> Result<(), EncodeError> {
        writeln!(self.out, "{}", self.version.header_line())?;

        self.general()?;
        self.editor()?;
        self.metadata()?;
        self.difficulty()?;
        if self.beatmap.has_events() {
            self.events()?;
        }
        if !self.beatmap.control_points.is_empty() {
            self.timing_points()?;
        }
        if self.skin.has_colours() {
            self.colours()?;
        }
        if !self.beatmap.hit_objects.is_empty() {
            self.hit_objects()?;
        }
        Ok(())
    }

    fn header(&mut self, name: &str) -> Result<(), EncodeError> {
        writeln!(self.out)?;
        writeln!(self.out, "[{name}]")?;
        Ok(())
    }

    fn general(&mut self) -> Result<(), EncodeError> {
        self.header("General")?;
        let g = &self.beatmap.general;
        let out = &mut self.out;
        writeln!(out, "AudioFilename: {}", g.audio_filename)?;
        writeln!(out, "AudioLeadIn: {}", g.audio_lead_in)?;
        writeln!(out, "PreviewTime: {}", g.preview_time)?;
        writeln!(out, "Countdown: {}", g.countdown)?;
        writeln!(out, "CountdownOffset: {}", g.countdown_offset)?;
        writeln!(out, "SampleSet: {}", g.sample_set.name())?;
        writeln!(out, "SampleVolume: {}", g.sample_volume)?;
        writeln!(out, "StackLeniency: {}", g.stack_leniency)?;
        writeln!(out, "Mode: {}", g.mode.id())?;
        writeln!(out, "LetterboxInBreaks: {}", flag(g.letterbox_in_breaks))?;
        writeln!(out, "SpecialStyle: {}", flag(g.special_style))?;
        writeln!(out, "WidescreenStoryboard: {}", flag(g.widescreen_storyboard))?;
        writeln!(out, "EpilepsyWarning: {}", flag(g.epilepsy_warning))?;
        writeln!(out, "SamplesMatchPlaybackRate: {}", flag(g.samples_match_playback_rate))?;
        for (key, value) in &self.skin.settings {
            writeln!(out, "{key}: {value}")?;
        }
        Ok(())
    }

    fn editor(&mut self) -> Result<(), EncodeError> {
        self.header("Editor")?;
        let e = &self.beatmap.editor;
        let out = &mut self.out;
        if !e.bookmarks.is_empty() {
            let bookmarks: Vec<String> = e.bookmarks.iter().map(ToString::to_string).collect();
            writeln!(out, "Bookmarks: {}", bookmarks.join(","))?;
        }
        writeln!(out, "DistanceSpacing: {}", e.distance_spacing)?;
        writeln!(out, "BeatDivisor: {}", e.beat_divisor)?;
        writeln!(out, "GridSize: {}", e.grid_size)?;
        writeln!(out, "TimelineZoom: {}", e.timeline_zoom)?;
        Ok(())
    }

    fn metadata(&mut self) -> Result<(), EncodeError> {
        self.header("Metadata")?;
        let m = &self.beatmap.metadata;
        let out = &mut self.out;
        writeln!(out, "Title:{}", m.title)?;
        writeln!(out, "TitleUnicode:{}", m.title_unicode)?;
        writeln!(out, "Artist:{}", m.artist)?;
        writeln!(out, "ArtistUnicode:{}", m.artist_unicode)?;
        writeln!(out, "Creator:{}", m.creator)?;
        writeln!(out, "Version:{}", m.version)?;
        writeln!(out, "Source:{}", m.source)?;
        writeln!(out, "Tags:{}", m.tags.join(" "))?;
        if let Some(id) = m.beatmap_id {
            writeln!(out, "BeatmapID:{id}")?;
        }
        if let Some(id) = m.beatmap_set_id {
            writeln!(out, "BeatmapSetID:{id}")?;
        }
        Ok(())
    }

    fn difficulty(&mut self) -> Result<(), EncodeError> {
        self.header("Difficulty")?;
        let d = &self.beatmap.difficulty;
        let out = &mut self.out;
        writeln!(out, "HPDrainRate:{}", d.hp_drain_rate)?;
        writeln!(out, "CircleSize:{}", d.circle_size)?;
        writeln!(out, "OverallDifficulty:{}", d.overall_difficulty)?;
        writeln!(out, "ApproachRate:{}", d.approach_rate)?;
        writeln!(out, "SliderMultiplier:{}", d.slider_multiplier)?;
        writeln!(out, "SliderTickRate:{}", d.slider_tick_rate)?;
        Ok(())
    }

    fn events(&mut self) -> Result<(), EncodeError> {
        self.header("Events")?;
        let beatmap = self.beatmap;
        for event in &beatmap.media_events {
            match event {
                MediaEvent::Background {
                    filename,
                    x_offset,
                    y_offset,
                } => writeln!(self.out, "0,0,\"{filename}\",{x_offset},{y_offset}")?,
                MediaEvent::Video {
                    start_time,
                    filename,
                    x_offset,
                    y_offset,
                } => writeln!(self.out, "Video,{start_time},\"{filename}\",{x_offset},{y_offset}")?,
            }
        }
        for period in &beatmap.breaks {
            writeln!(self.out, "2,{},{}", period.start_time, period.end_time)?;
        }
        for line in &beatmap.storyboard_lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn timing_points(&mut self) -> Result<(), EncodeError> {
        self.header("TimingPoints")?;
        let beatmap = self.beatmap;
        for group in &beatmap.control_points.groups {
            self.timing_group(group)?;
        }
        Ok(())
    }

    /// An uninherited line when the group starts a beat grid, then always an
    /// inherited line carrying the effective state at the group time.
    fn timing_group(&mut self, group: &ControlPointGroup) -> Result<(), EncodeError> {
        let info = &self.beatmap.control_points;
        let time = group.time;
        let timing = info.timing_point_at(time);
        let sample = info.sample_point_at(time);
        let speed = info.difficulty_point_at(time).speed_multiplier;

        let mut effects = 0;
        if info.effect_point_at(time).kiai {
            effects |= EFFECT_KIAI;
        }
        if group.effect().is_some_and(|e| e.omit_first_bar_line) {
            effects |= EFFECT_OMIT_FIRST_BAR_LINE;
        }

        let set = sample.sample_set.index();
        let index = sample.custom_sample_index;
        let volume = sample.volume;
        if let Some(point) = group.timing() {
            writeln!(
                self.out,
                "{time},{},{},{set},{index},{volume},1,{effects}",
                point.beat_length, point.time_signature
            )?;
        }
        writeln!(
            self.out,
            "{time},{},{},{set},{index},{volume},0,{effects}",
            -100.0 / speed,
            timing.time_signature
        )?;
        Ok(())
    }

    fn colours(&mut self) -> Result<(), EncodeError> {
        self.header("Colours")?;
        let skin = self.skin;
        for (i, colour) in skin.combo_colours.iter().enumerate() {
            writeln!(self.out, "Combo{}: {colour}", i + 1)?;
        }
        for (name, colour) in &skin.custom_colours {
            writeln!(self.out, "{name}: {colour}")?;
        }
        Ok(())
    }

    fn hit_objects(&mut self) -> Result<(), EncodeError> {
        self.header("HitObjects")?;
        let beatmap = self.beatmap;
        for obj in &beatmap.hit_objects {
            self.hit_object(obj)?;
        }
        Ok(())
    }

    fn hit_object(&mut self, obj: &HitObject) -> Result<(), EncodeError> {
        let mut type_bits = match obj.kind {
            HitObjectKind::Circle => TYPE_CIRCLE,
            HitObjectKind::Slider(_) => TYPE_SLIDER,
            HitObjectKind::Spinner { .. } => TYPE_SPINNER,
            HitObjectKind::Hold { .. } => TYPE_HOLD,
        };
        if obj.new_combo {
            type_bits |= TYPE_NEW_COMBO;
        }
        if self.version.has_combo_skip() {
            type_bits |= u32::from(obj.combo_skip & 0b111) << TYPE_COMBO_SKIP_SHIFT;
        }

        write!(
            self.out,
            "{},{},{},{type_bits},{}",
            obj.position.x,
            obj.position.y,
            obj.time,
            obj.hit_sound.bits()
        )?;
        let sample = sample_text(&obj.sample);
        match &obj.kind {
            HitObjectKind::Circle => writeln!(self.out, ",{sample}")?,
            HitObjectKind::Slider(slider) => {
                write!(self.out, ",{}", slider_text(slider))?;
                writeln!(self.out, ",{sample}")?;
            }
            HitObjectKind::Spinner { end_time } => writeln!(self.out, ",{end_time},{sample}")?,
            HitObjectKind::Hold { end_time } => writeln!(self.out, ",{end_time}:{sample}")?,
        }
        Ok(())
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn sample_text(sample: &HitSample) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        sample.normal_set.index(),
        sample.addition_set.index(),
        sample.index,
        sample.volume,
        sample.filename
    )
}

/// `C|x:y|L|x:y,slides,length,edgeSounds,edgeSets`
fn slider_text(slider: &SliderData) -> String {
    let mut path = slider.curve_type.letter().to_string();
    for vertex in &slider.control_points {
        if let Some(segment) = vertex.segment_type {
            path.push('|');
            path.push(segment.letter());
        }
        path.push_str(&format!("|{}:{}", vertex.position.x, vertex.position.y));
    }

    let sounds: Vec<String> = slider.edge_sounds.iter().map(|s| s.bits().to_string()).collect();
    let sets: Vec<String> = slider
        .edge_sets
        .iter()
        .map(|s| format!("{}:{}", s.normal_set.index(), s.addition_set.index()))
        .collect();

    format!(
        "{path},{},{},{},{}",
        slider.span_count(),
        slider.pixel_length.unwrap_or(0.0),
        sounds.join("|"),
        sets.join("|")
    )
}
