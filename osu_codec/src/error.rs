use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    Structural,
    Field,
    Io,
}

impl DecodeErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            // Structural
            "E1001" | "E1002" | "E1003" | "E1101" => Self::Structural,

            // Field
            "E2001" | "E2002" | "E2003" | "E2004" => Self::Field,

            // Io
            "E3001" => Self::Io,

            _ => Self::Structural,
        }
    }
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message} (line {line})")]
pub struct DecodeError {
    pub code: &'static str,
    pub kind: DecodeErrorKind,
    pub message: String,
    /// 1-based; 0 when the failure is not tied to a line.
    pub line: usize,

    pub section: Option<String>,
    pub field: Option<String>,
    pub context: Option<String>,
}

impl DecodeError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            kind: DecodeErrorKind::from_code(code),
            message: message.into(),
            line,

            section: None,
            field: None,
            context: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_structural(&self) -> bool {
        self.kind == DecodeErrorKind::Structural
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to write beatmap: {0}")]
    Io(#[from] std::io::Error),
}
