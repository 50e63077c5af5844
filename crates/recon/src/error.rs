use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DulogError {
    /// File read/write failure (missing input, unwritable export target).
    Io(String),
    /// A cell could not be converted to its typed value.
    Parse {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },
    /// Header layout does not match the declared file format.
    Schema(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Job config validation error (bad dyad, duplicate output, bad window, etc.).
    ConfigValidation(String),
}

impl DulogError {
    pub fn parse(line: u64, column: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DulogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse { line, column, value, reason } => {
                write!(f, "line {line}, column '{column}': cannot parse '{value}': {reason}")
            }
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for DulogError {}
