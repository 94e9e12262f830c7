use beatmap_schema::{Beatmap, Colour, GameMode, SampleSet, SkinConfiguration};
use tracing::debug;

use crate::DecodeError;
use crate::parse::{FieldSite, parse_bool, parse_f32, parse_f64, parse_int, split_key_value};
use crate::tokenizer::ContentLine;
use crate::version::FormatVersion;

/// Key-value sections: General, Editor, Metadata, Difficulty and Colours.
pub(crate) struct KeyValueDecoder {
    version: FormatVersion,
    has_approach_rate: bool,
}

impl KeyValueDecoder {
    pub(crate) fn new(version: FormatVersion, beatmap: &mut Beatmap) -> Self {
        beatmap.difficulty.slider_multiplier = version.default_slider_multiplier();
        beatmap.difficulty.slider_tick_rate = version.default_slider_tick_rate();
        Self {
            version,
            has_approach_rate: false,
        }
    }

    pub(crate) fn general(
        &mut self,
        beatmap: &mut Beatmap,
        skin: &mut SkinConfiguration,
        content: &ContentLine,
    ) -> Result<(), DecodeError> {
        let (key, value) = split_key_value(&content.text);
        let site = FieldSite::new(content, key);
        let general = &mut beatmap.general;
        match key {
            "AudioFilename" => general.audio_filename = value.to_string(),
            "AudioLeadIn" => general.audio_lead_in = parse_int(value, site)?,
            "PreviewTime" => general.preview_time = parse_int(value, site)?,
            "Countdown" => general.countdown = parse_int(value, site)?,
            "CountdownOffset" => general.countdown_offset = parse_int(value, site)?,
            "SampleSet" => {
                general.sample_set = SampleSet::from_name(value)
                    .ok_or_else(|| site.error("E2004", format!("unknown sample set '{value}'")))?
                    .or_normal();
            }
            "SampleVolume" => general.sample_volume = parse_int::<u32>(value, site)?.min(100),
            "StackLeniency" => general.stack_leniency = parse_f32(value, site)?,
            "Mode" => {
                let id: i32 = parse_int(value, site)?;
                general.mode = GameMode::from_id(id)
                    .ok_or_else(|| site.error("E2004", format!("unknown game mode {id}")))?;
            }
            "LetterboxInBreaks" => general.letterbox_in_breaks = parse_bool(value, site)?,
            "SpecialStyle" => general.special_style = parse_bool(value, site)?,
            "WidescreenStoryboard" => general.widescreen_storyboard = parse_bool(value, site)?,
            "EpilepsyWarning" => general.epilepsy_warning = parse_bool(value, site)?,
            "SamplesMatchPlaybackRate" => {
                general.samples_match_playback_rate = parse_bool(value, site)?;
            }
            _ => {
                debug!(key, line = content.line, "general key kept as skin setting");
                skin.settings.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    pub(crate) fn editor(
        &mut self,
        beatmap: &mut Beatmap,
        content: &ContentLine,
    ) -> Result<(), DecodeError> {
        let (key, value) = split_key_value(&content.text);
        let site = FieldSite::new(content, key);
        let editor = &mut beatmap.editor;
        match key {
            "Bookmarks" => {
                editor.bookmarks = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse_int(s, site))
                    .collect::<Result<_, _>>()?;
            }
            "DistanceSpacing" => editor.distance_spacing = parse_f64(value, site)?,
            "BeatDivisor" => editor.beat_divisor = parse_int(value, site)?,
            "GridSize" => editor.grid_size = parse_int(value, site)?,
            "TimelineZoom" => editor.timeline_zoom = parse_f64(value, site)?,
            _ => debug!(key, line = content.line, "ignoring unknown editor key"),
        }
        Ok(())
    }

    pub(crate) fn metadata(
        &mut self,
        beatmap: &mut Beatmap,
        content: &ContentLine,
    ) -> Result<(), DecodeError> {
        let (key, value) = split_key_value(&content.text);
        let site = FieldSite::new(content, key);
        let metadata = &mut beatmap.metadata;
        match key {
            "Title" => metadata.title = value.to_string(),
            "TitleUnicode" => metadata.title_unicode = value.to_string(),
            "Artist" => metadata.artist = value.to_string(),
            "ArtistUnicode" => metadata.artist_unicode = value.to_string(),
            "Creator" => metadata.creator = value.to_string(),
            "Version" => metadata.version = value.to_string(),
            "Source" => metadata.source = value.to_string(),
            "Tags" => metadata.tags = value.split_whitespace().map(str::to_string).collect(),
            "BeatmapID" => metadata.beatmap_id = Some(parse_int(value, site)?),
            "BeatmapSetID" => metadata.beatmap_set_id = Some(parse_int(value, site)?),
            _ => debug!(key, line = content.line, "ignoring unknown metadata key"),
        }
        Ok(())
    }

    pub(crate) fn difficulty(
        &mut self,
        beatmap: &mut Beatmap,
        content: &ContentLine,
    ) -> Result<(), DecodeError> {
        let (key, value) = split_key_value(&content.text);
        let site = FieldSite::new(content, key);
        let difficulty = &mut beatmap.difficulty;
        match key {
            "HPDrainRate" => difficulty.hp_drain_rate = parse_f32(value, site)?,
            "CircleSize" => difficulty.circle_size = parse_f32(value, site)?,
            "OverallDifficulty" => difficulty.overall_difficulty = parse_f32(value, site)?,
            "ApproachRate" => {
                difficulty.approach_rate = parse_f32(value, site)?;
                self.has_approach_rate = true;
            }
            "SliderMultiplier" => difficulty.slider_multiplier = parse_f64(value, site)?,
            "SliderTickRate" => difficulty.slider_tick_rate = parse_f64(value, site)?,
            _ => debug!(key, line = content.line, "ignoring unknown difficulty key"),
        }
        Ok(())
    }

    pub(crate) fn colours(
        &mut self,
        skin: &mut SkinConfiguration,
        content: &ContentLine,
    ) -> Result<(), DecodeError> {
        let (key, value) = split_key_value(&content.text);
        let site = FieldSite::new(content, key);
        let colour = parse_colour(value, site)?;

        let is_combo = key
            .strip_prefix("Combo")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if is_combo {
            skin.combo_colours.push(colour);
        } else {
            skin.custom_colours.insert(key.to_string(), colour);
        }
        Ok(())
    }

    /// Applies fallbacks that depend on the whole file.
    pub(crate) fn finish(self, beatmap: &mut Beatmap) {
        if !self.has_approach_rate {
            beatmap.difficulty.approach_rate = beatmap.difficulty.overall_difficulty;
        }
        debug!(version = %self.version, "key-value sections decoded");
    }
}

fn parse_colour(value: &str, site: FieldSite<'_>) -> Result<Colour, DecodeError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(site.error(
            "E2003",
            "colour must be specified as R,G,B or R,G,B,A",
        ));
    }

    let mut components = [255u8; 4];
    for (slot, part) in components.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| site.error("E2003", format!("invalid colour component '{part}'")))?;
    }
    let [r, g, b, a] = components;
    Ok(Colour::rgba(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Section;

    fn line(section: Section, text: &str) -> ContentLine {
        ContentLine {
            line: 3,
            section,
            text: text.to_string(),
        }
    }

    #[test]
    fn approach_rate_falls_back_to_overall_difficulty() {
        let mut beatmap = Beatmap::default();
        let mut decoder = KeyValueDecoder::new(FormatVersion(14), &mut beatmap);
        decoder
            .difficulty(&mut beatmap, &line(Section::Difficulty, "OverallDifficulty:7.5"))
            .unwrap();
        decoder.finish(&mut beatmap);
        assert_eq!(beatmap.difficulty.approach_rate, 7.5);
    }

    #[test]
    fn early_versions_use_old_slider_multiplier_default() {
        let mut beatmap = Beatmap::default();
        KeyValueDecoder::new(FormatVersion(4), &mut beatmap);
        assert_eq!(beatmap.difficulty.slider_multiplier, 1.0);
    }

    #[test]
    fn unknown_general_keys_become_skin_settings() {
        let mut beatmap = Beatmap::default();
        let mut skin = SkinConfiguration::default();
        let mut decoder = KeyValueDecoder::new(FormatVersion(14), &mut beatmap);
        decoder
            .general(&mut beatmap, &mut skin, &line(Section::General, "SkinPreference: Default"))
            .unwrap();
        decoder
            .general(&mut beatmap, &mut skin, &line(Section::General, "SampleSet: None"))
            .unwrap();
        assert_eq!(skin.settings.get("SkinPreference").map(String::as_str), Some("Default"));
        assert_eq!(beatmap.general.sample_set, SampleSet::Normal);
    }

    #[test]
    fn malformed_numeric_is_field_error() {
        let mut beatmap = Beatmap::default();
        let mut decoder = KeyValueDecoder::new(FormatVersion(14), &mut beatmap);
        let err = decoder
            .difficulty(&mut beatmap, &line(Section::Difficulty, "CircleSize:big"))
            .unwrap_err();
        assert_eq!(err.code, "E2002");
        assert_eq!(err.kind, crate::DecodeErrorKind::Field);
        assert_eq!(err.field.as_deref(), Some("CircleSize"));
    }

    #[test]
    fn colours_split_combo_palette_and_named() {
        let mut beatmap = Beatmap::default();
        let mut skin = SkinConfiguration::default();
        let mut decoder = KeyValueDecoder::new(FormatVersion(14), &mut beatmap);
        for text in [
            "Combo2 : 0,128,255",
            "Combo1 : 255,0,0",
            "SliderBorder : 10,20,30,40",
        ] {
            decoder.colours(&mut skin, &line(Section::Colours, text)).unwrap();
        }
        assert_eq!(skin.combo_colours, vec![Colour::rgb(0, 128, 255), Colour::rgb(255, 0, 0)]);
        assert_eq!(skin.custom_colours["SliderBorder"], Colour::rgba(10, 20, 30, 40));

        let err = decoder
            .colours(&mut skin, &line(Section::Colours, "Combo3 : 1,2"))
            .unwrap_err();
        assert_eq!(err.code, "E2003");
    }

    #[test]
    fn bookmarks_and_tags_are_lists() {
        let mut beatmap = Beatmap::default();
        let mut decoder = KeyValueDecoder::new(FormatVersion(14), &mut beatmap);
        decoder
            .editor(&mut beatmap, &line(Section::Editor, "Bookmarks: 100,2000, 3000"))
            .unwrap();
        decoder
            .metadata(&mut beatmap, &line(Section::Metadata, "Tags:a  b c"))
            .unwrap();
        assert_eq!(beatmap.editor.bookmarks, vec![100, 2000, 3000]);
        assert_eq!(beatmap.metadata.tags, vec!["a", "b", "c"]);
    }
}
