use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use beatmap_schema::{Beatmap, SkinConfiguration};

mod decoder;
mod encoder;
mod error;
mod events;
mod hit_objects;
mod line_source;
mod parse;
mod sections;
mod timing;
mod tokenizer;
mod version;

pub use encoder::{encode, encode_to_writer};
pub use error::{DecodeError, DecodeErrorKind, EncodeError};
pub use version::{EARLY_VERSION_TIMING_OFFSET, FORMAT_HEADER, FormatVersion};

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Shift every timed element of pre-v5 files by the early clock offset.
    pub apply_offsets: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            apply_offsets: true,
        }
    }
}

/// A beatmap together with the skin settings found in the same file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBeatmap {
    pub beatmap: Beatmap,
    pub skin: SkinConfiguration,
}

pub fn decode(reader: impl BufRead, options: DecodeOptions) -> Result<Beatmap, DecodeError> {
    decode_with_skin(reader, options).map(|decoded| decoded.beatmap)
}

pub fn decode_with_skin(
    reader: impl BufRead,
    options: DecodeOptions,
) -> Result<DecodedBeatmap, DecodeError> {
    decoder::decode_reader(reader, &options)
}

/// Only the skin half of a beatmap file.
pub fn decode_skin(reader: impl BufRead) -> Result<SkinConfiguration, DecodeError> {
    decode_with_skin(reader, DecodeOptions::default()).map(|decoded| decoded.skin)
}

pub fn decode_str(src: &str) -> Result<Beatmap, DecodeError> {
    decode(src.as_bytes(), DecodeOptions::default())
}

pub fn decode_file(
    path: impl AsRef<Path>,
    options: DecodeOptions,
) -> Result<DecodedBeatmap, DecodeError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        DecodeError::new("E3001", format!("failed to open beatmap: {e}"), 0)
            .with_context(path.display().to_string())
    })?;
    decode_with_skin(BufReader::new(file), options)
}
