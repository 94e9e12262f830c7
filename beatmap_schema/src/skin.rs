use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// `r,g,b`, with `,a` appended only when not fully opaque.
impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, ",{}", self.a)?;
        }
        Ok(())
    }
}

/// Skin settings a beatmap carries next to its gameplay data.
///
/// Maps compare as unordered key sets; the combo palette keeps file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinConfiguration {
    pub combo_colours: Vec<Colour>,
    /// Named colours such as `SliderTrackOverride` and `SliderBorder`.
    #[serde(default)]
    pub custom_colours: BTreeMap<String, Colour>,
    /// `[General]` entries the beatmap model does not own.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl SkinConfiguration {
    pub fn is_empty(&self) -> bool {
        self.combo_colours.is_empty() && self.custom_colours.is_empty() && self.settings.is_empty()
    }

    pub fn has_colours(&self) -> bool {
        !self.combo_colours.is_empty() || !self.custom_colours.is_empty()
    }
}
