use std::fmt;
use std::io::BufRead;

use tracing::debug;

use crate::DecodeError;
use crate::line_source::LineReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Section {
    /// Content before the first header.
    None,
    General,
    Editor,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    Colours,
    HitObjects,
    Unknown(String),
}

impl Section {
    fn from_name(name: &str) -> Self {
        match name {
            "General" => Section::General,
            "Editor" => Section::Editor,
            "Metadata" => Section::Metadata,
            "Difficulty" => Section::Difficulty,
            "Events" => Section::Events,
            "TimingPoints" => Section::TimingPoints,
            "Colours" => Section::Colours,
            "HitObjects" => Section::HitObjects,
            other => Section::Unknown(other.to_string()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Section::None => "",
            Section::General => "General",
            Section::Editor => "Editor",
            Section::Metadata => "Metadata",
            Section::Difficulty => "Difficulty",
            Section::Events => "Events",
            Section::TimingPoints => "TimingPoints",
            Section::Colours => "Colours",
            Section::HitObjects => "HitObjects",
            Section::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content line of a known section. Leading whitespace is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentLine {
    pub(crate) line: usize,
    pub(crate) section: Section,
    pub(crate) text: String,
}

pub(crate) fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//")
}

/// Splits the input into content lines tagged with their section. Headers,
/// comments, blank lines and lines of unknown sections are consumed here.
pub(crate) struct Tokenizer<R> {
    reader: LineReader<R>,
    section: Section,
}

impl<R: BufRead> Tokenizer<R> {
    pub(crate) fn new(reader: LineReader<R>) -> Self {
        Self {
            reader,
            section: Section::None,
        }
    }

    pub(crate) fn next_content(&mut self) -> Result<Option<ContentLine>, DecodeError> {
        while let Some(raw) = self.reader.next_line()? {
            let line_no = self.reader.line_number();
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }

            if trimmed.starts_with('[') {
                self.section = parse_header(trimmed, line_no)?;
                debug!(section = %self.section, line = line_no, "entering section");
                continue;
            }

            match &self.section {
                Section::None => continue,
                Section::Unknown(name) => {
                    debug!(section = %name, line = line_no, "skipping line of unknown section");
                    continue;
                }
                section => {
                    return Ok(Some(ContentLine {
                        line: line_no,
                        section: section.clone(),
                        text: raw,
                    }));
                }
            }
        }
        Ok(None)
    }
}

fn parse_header(trimmed: &str, line_no: usize) -> Result<Section, DecodeError> {
    let name = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
        .ok_or_else(|| {
            DecodeError::new("E1003", format!("malformed section header: {trimmed}"), line_no)
                .with_context(trimmed.to_string())
        })?;

    if name.is_empty() || name.contains(['[', ']']) {
        return Err(
            DecodeError::new("E1003", format!("malformed section header: {trimmed}"), line_no)
                .with_context(trimmed.to_string()),
        );
    }
    Ok(Section::from_name(name))
}
