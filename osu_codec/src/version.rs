use std::fmt;
use std::io::BufRead;

use beatmap_schema::Milliseconds;

use crate::DecodeError;
use crate::line_source::LineReader;
use crate::tokenizer::is_comment;

pub const FORMAT_HEADER: &str = "osu file format v";

/// Files older than this were authored against a clock running 24 ms early.
const EARLY_TIMING_OFFSET_BEFORE: u32 = 5;
pub const EARLY_VERSION_TIMING_OFFSET: Milliseconds = 24.0;

/// First version whose `SliderMultiplier` defaults to 1.4.
const MODERN_SLIDER_DEFAULTS_FROM: u32 = 6;

/// First version that packs a combo colour skip count into type bits 4..=6.
const COMBO_SKIP_FROM: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FormatVersion(pub u32);

impl FormatVersion {
    pub fn number(self) -> u32 {
        self.0
    }

    pub fn timing_offset(self) -> Milliseconds {
        if self.0 < EARLY_TIMING_OFFSET_BEFORE {
            EARLY_VERSION_TIMING_OFFSET
        } else {
            0.0
        }
    }

    pub fn default_slider_multiplier(self) -> f64 {
        if self.0 < MODERN_SLIDER_DEFAULTS_FROM {
            1.0
        } else {
            1.4
        }
    }

    pub fn default_slider_tick_rate(self) -> f64 {
        1.0
    }

    pub fn has_combo_skip(self) -> bool {
        self.0 >= COMBO_SKIP_FROM
    }

    pub fn header_line(self) -> String {
        format!("{FORMAT_HEADER}{}", self.0)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Consumes leading blank and comment lines, then the version line.
pub(crate) fn resolve_version<R: BufRead>(
    reader: &mut LineReader<R>,
) -> Result<FormatVersion, DecodeError> {
    loop {
        let line_no = reader.line_number();
        let skip = match reader.peek_line()? {
            Some(line) => {
                let trimmed = line.trim();
                trimmed.is_empty() || is_comment(trimmed)
            }
            None => {
                return Err(DecodeError::new(
                    "E1001",
                    "missing format version line",
                    line_no,
                ));
            }
        };
        if !skip {
            break;
        }
        reader.next_line()?;
    }

    let line = reader.next_line()?.unwrap_or_default();
    let line_no = reader.line_number();
    parse_version_line(line.trim(), line_no)
}

fn parse_version_line(line: &str, line_no: usize) -> Result<FormatVersion, DecodeError> {
    let digits = line.strip_prefix(FORMAT_HEADER).ok_or_else(|| {
        DecodeError::new("E1002", format!("not a beatmap file (context={line})"), line_no)
            .with_context(line.to_string())
    })?;

    let version: u32 = digits.trim().parse().map_err(|_| {
        DecodeError::new(
            "E1002",
            format!("invalid format version (context={line})"),
            line_no,
        )
        .with_context(line.to_string())
    })?;
    Ok(FormatVersion(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(src: &str) -> Result<FormatVersion, DecodeError> {
        let mut reader = LineReader::new(src.as_bytes());
        resolve_version(&mut reader)
    }

    #[test]
    fn reads_version_after_blank_and_comment_lines() {
        let v = resolve("\n// generated\nosu file format v14\n[General]\n").unwrap();
        assert_eq!(v, FormatVersion(14));
    }

    #[test]
    fn missing_version_is_e1001() {
        let err = resolve("\n\n").unwrap_err();
        assert_eq!(err.code, "E1001");
        assert!(err.is_structural());
    }

    #[test]
    fn garbled_version_is_e1002() {
        let err = resolve("[General]\n").unwrap_err();
        assert_eq!(err.code, "E1002");
        assert_eq!(err.line, 1);

        let err = resolve("osu file format vX\n").unwrap_err();
        assert_eq!(err.code, "E1002");
    }

    #[test]
    fn version_gates() {
        assert_eq!(FormatVersion(4).timing_offset(), 24.0);
        assert_eq!(FormatVersion(5).timing_offset(), 0.0);
        assert_eq!(FormatVersion(5).default_slider_multiplier(), 1.0);
        assert_eq!(FormatVersion(6).default_slider_multiplier(), 1.4);
        assert!(!FormatVersion(7).has_combo_skip());
        assert!(FormatVersion(8).has_combo_skip());
        assert_eq!(FormatVersion(9).header_line(), "osu file format v9");
    }
}
