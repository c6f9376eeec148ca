//! Domain error types.

use std::fmt;

/// An index or lookback window reached past the available data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index {index} out of range for series of length {len}")]
pub struct RangeError {
    pub index: usize,
    pub len: usize,
}

impl RangeError {
    pub fn new(index: usize, len: usize) -> Self {
        Self { index, len }
    }

    /// Ok when `index < len`.
    pub fn check(index: usize, len: usize) -> Result<(), RangeError> {
        if index < len {
            Ok(())
        } else {
            Err(Self::new(index, len))
        }
    }
}

/// Why a configuration node failed to compile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigErrorReason {
    #[error("unknown {kind} type '{tag}'")]
    UnknownTag { kind: NodeKind, tag: String },

    #[error("missing 'type' tag")]
    MissingTag,

    #[error("expected an object")]
    NotAnObject,

    #[error("missing parameter '{0}'")]
    MissingParam(String),

    #[error("parameter '{name}' must be {expected}")]
    InvalidParam { name: String, expected: String },

    #[error("nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
}

/// The grammar category a node was compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Method,
    Filter,
    Exit,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Method => write!(f, "method"),
            NodeKind::Filter => write!(f, "filter"),
            NodeKind::Exit => write!(f, "exit rule"),
        }
    }
}

/// A compilation failure located at `path` (e.g. `$.entry.args[1].lhs`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error at {path}: {reason}")]
pub struct ConfigError {
    pub path: String,
    pub reason: ConfigErrorReason,
}

impl ConfigError {
    pub fn new(path: impl Into<String>, reason: ConfigErrorReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

/// Top-level error type for quantscreen.
#[derive(Debug, thiserror::Error)]
pub enum QuantscreenError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("strategy document {file} is not valid JSON: {reason}")]
    StrategySyntax { file: String, reason: String },

    #[error(transparent)]
    Compile(#[from] ConfigError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no quotes for {symbol}")]
    NoData { symbol: String },

    #[error("evaluation failed for {symbol}: {source}")]
    Evaluation {
        symbol: String,
        #[source]
        source: RangeError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantscreenError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            QuantscreenError::Io(_) => 1,
            QuantscreenError::ConfigParse { .. }
            | QuantscreenError::ConfigMissing { .. }
            | QuantscreenError::ConfigInvalid { .. } => 2,
            QuantscreenError::Data { .. } | QuantscreenError::NoData { .. } => 3,
            QuantscreenError::StrategySyntax { .. } | QuantscreenError::Compile(_) => 4,
            QuantscreenError::Evaluation { .. } => 5,
        }
    }
}

impl From<&QuantscreenError> for std::process::ExitCode {
    fn from(err: &QuantscreenError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_check() {
        assert!(RangeError::check(0, 1).is_ok());
        assert_eq!(RangeError::check(1, 1), Err(RangeError::new(1, 1)));
        assert_eq!(RangeError::check(0, 0), Err(RangeError::new(0, 0)));
    }

    #[test]
    fn range_error_message() {
        let err = RangeError::new(7, 5);
        assert_eq!(err.to_string(), "index 7 out of range for series of length 5");
    }

    #[test]
    fn config_error_names_path_and_tag() {
        let err = ConfigError::new(
            "$.entry.lhs",
            ConfigErrorReason::UnknownTag {
                kind: NodeKind::Method,
                tag: "bogus".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "config error at $.entry.lhs: unknown method type 'bogus'"
        );
    }

    #[test]
    fn compile_error_converts_to_top_level() {
        let err: QuantscreenError =
            ConfigError::new("$", ConfigErrorReason::MissingTag).into();
        assert!(matches!(err, QuantscreenError::Compile(_)));
    }

    #[test]
    fn exit_codes_by_category() {
        let io = QuantscreenError::Io(std::io::Error::other("disk"));
        let config = QuantscreenError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        };
        let data = QuantscreenError::NoData {
            symbol: "BHP".into(),
        };
        let compile: QuantscreenError = ConfigError::new("$", ConfigErrorReason::NotAnObject).into();
        let eval = QuantscreenError::Evaluation {
            symbol: "BHP".into(),
            source: RangeError::new(3, 2),
        };
        assert_eq!(io.exit_code(), 1);
        assert_eq!(config.exit_code(), 2);
        assert_eq!(data.exit_code(), 3);
        assert_eq!(compile.exit_code(), 4);
        assert_eq!(eval.exit_code(), 5);
    }
}
