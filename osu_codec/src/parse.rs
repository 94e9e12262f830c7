use std::str::FromStr;

use crate::DecodeError;
use crate::tokenizer::ContentLine;

/// Parsed values beyond this magnitude are rejected.
pub(crate) const MAX_PARSE_VALUE: f64 = i32::MAX as f64;

/// `Key: value` split on the first colon, both halves trimmed.
pub(crate) fn split_key_value(text: &str) -> (&str, &str) {
    match text.split_once(':') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (text.trim(), ""),
    }
}

/// Where a value came from, for error reporting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSite<'a> {
    pub(crate) line: usize,
    pub(crate) section: &'a str,
    pub(crate) field: &'a str,
    pub(crate) context: &'a str,
}

impl<'a> FieldSite<'a> {
    pub(crate) fn new(content: &'a ContentLine, field: &'a str) -> Self {
        Self {
            line: content.line,
            section: content.section.name(),
            field,
            context: content.text.as_str(),
        }
    }

    pub(crate) fn field(self, field: &'a str) -> Self {
        Self { field, ..self }
    }

    pub(crate) fn error(&self, code: &'static str, message: impl Into<String>) -> DecodeError {
        let message = message.into();
        DecodeError::new(
            code,
            format!("{message} (field={}, context={})", self.field, self.context.trim()),
            self.line,
        )
        .with_section(self.section)
        .with_field(self.field)
        .with_context(self.context.to_string())
    }
}

pub(crate) fn parse_int<T: FromStr>(value: &str, site: FieldSite<'_>) -> Result<T, DecodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| site.error("E2001", format!("invalid integer '{}'", value.trim())))
}

/// Locale-invariant float parse; non-finite and out-of-range values fail.
pub(crate) fn parse_f64(value: &str, site: FieldSite<'_>) -> Result<f64, DecodeError> {
    let v: f64 = value
        .trim()
        .parse()
        .map_err(|_| site.error("E2002", format!("invalid number '{}'", value.trim())))?;
    if !v.is_finite() {
        return Err(site.error("E2002", format!("invalid number '{}'", value.trim())));
    }
    if v.abs() > MAX_PARSE_VALUE {
        return Err(site.error("E2004", format!("value out of range '{}'", value.trim())));
    }
    Ok(v)
}

pub(crate) fn parse_f32(value: &str, site: FieldSite<'_>) -> Result<f32, DecodeError> {
    parse_f64(value, site).map(|v| v as f32)
}

/// `1`/`0`, also accepting `true`/`false`.
pub(crate) fn parse_bool(value: &str, site: FieldSite<'_>) -> Result<bool, DecodeError> {
    match value.trim() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        other => match other.parse::<i64>() {
            Ok(n) => Ok(n != 0),
            Err(_) => Err(site.error("E2001", format!("invalid boolean '{other}'"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Section;

    fn content(text: &str) -> ContentLine {
        ContentLine {
            line: 7,
            section: Section::Difficulty,
            text: text.to_string(),
        }
    }

    #[test]
    fn split_key_value_trims_both_sides() {
        assert_eq!(split_key_value("  Title  :  A: B "), ("Title", "A: B"));
        assert_eq!(split_key_value("NoColon"), ("NoColon", ""));
    }

    #[test]
    fn float_parse_rejects_nan_and_out_of_range() {
        let line = content("CircleSize:NaN");
        let site = FieldSite::new(&line, "CircleSize");
        assert_eq!(parse_f64("4.2", site).unwrap(), 4.2);
        assert_eq!(parse_f64("NaN", site).unwrap_err().code, "E2002");
        assert_eq!(parse_f64("inf", site).unwrap_err().code, "E2002");
        assert_eq!(parse_f64("1e12", site).unwrap_err().code, "E2004");
    }

    #[test]
    fn errors_carry_line_section_and_field() {
        let line = content("HPDrainRate:abc");
        let err = parse_f32("abc", FieldSite::new(&line, "HPDrainRate")).unwrap_err();
        assert_eq!(err.line, 7);
        assert_eq!(err.section.as_deref(), Some("Difficulty"));
        assert_eq!(err.field.as_deref(), Some("HPDrainRate"));
        assert!(err.to_string().starts_with("E2002: invalid number 'abc'"));
    }

    #[test]
    fn bool_parse() {
        let line = content("X: 1");
        let site = FieldSite::new(&line, "X");
        assert!(parse_bool("1", site).unwrap());
        assert!(!parse_bool("0", site).unwrap());
        assert!(parse_bool("yes", site).is_err());
    }
}
