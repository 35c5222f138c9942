use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::geofile::feature::AttributeValue;

/// Errors raised while reading, transforming or simplifying features.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The source dataset is missing, corrupt or cannot be read.
    #[error("Could not read source dataset {path:?}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    /// A property used for filtering is absent (or null) on a feature.
    #[error("Feature {feature_index} is missing required property '{key}'")]
    MissingProperty { key: String, feature_index: usize },

    /// A property used for numeric filtering holds a non-numeric value.
    #[error("Feature {feature_index} has non-numeric property '{key}': {value:?}")]
    NonNumericProperty {
        key: String,
        feature_index: usize,
        value: AttributeValue,
    },

    /// No point can be derived from the geometry of a feature, e.g. it is empty.
    #[error("Feature {feature_index} has an empty geometry")]
    EmptyGeometry { feature_index: usize },

    #[error("Could not start {command}: {source}")]
    ExternalToolSpawn {
        command: String,
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully. `code` is None if it was terminated by a signal.
    #[error("{command} exited with {}. {stderr}", exit_code_display(.code))]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{command} did not finish within {timeout:?}")]
    ExternalToolTimeout { command: String, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "no exit code".to_string(),
    }
}

impl ExtractError {
    pub fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExtractError;

    #[test]
    fn test_external_tool_message_contains_code_and_stderr() {
        let err = ExtractError::ExternalTool {
            command: "geo2topo".to_string(),
            code: Some(2),
            stderr: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "geo2topo exited with 2. unexpected token");

        let err = ExtractError::ExternalTool {
            command: "geo2topo".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("no exit code"));
    }
}
