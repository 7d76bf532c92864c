//! Reading parameter records written by `xvr` runs.
//!
//! A record is a JSON object mapping entry names to tensors (numbers or nested
//! arrays of numbers) or arbitrary metadata. Only the pose entries are
//! interpreted here; everything else is carried along untouched.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PoseError, ReadFailure, Result};
use crate::tensor::Tensor;

pub const FINAL_POSE_KEY: &str = "final_pose";
pub const ROTATIONS_KEY: &str = "rotations";
pub const TRANSLATIONS_KEY: &str = "translations";

/// An associative record read once from disk and never modified.
#[derive(Debug, Clone)]
pub struct ParameterRecord {
    entries: Map<String, Value>,
}

/// The two ways a record can carry a pose.
#[derive(Debug, Clone, PartialEq)]
pub enum PoseSource {
    /// A ready-made homogeneous matrix, expected to squeeze to 4×4.
    Composed(Tensor),
    /// Euler angles (radians, Z-X-Y) and a translation (mm), each expected to
    /// squeeze to length 3.
    Separate { rotations: Tensor, translations: Tensor },
}

impl ParameterRecord {
    /// Reads a record from `path`.
    ///
    /// Every failure is reported as [`PoseError::Read`]: a missing file, an I/O
    /// error, invalid JSON, a top level that is not an object, or a pose entry
    /// holding a ragged or mixed array. Other entries are never inspected.
    pub fn read(path: &Path) -> Result<ParameterRecord> {
        if !path.is_file() {
            return Err(PoseError::read(path, ReadFailure::Missing));
        }
        let text = fs::read_to_string(path).map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                ReadFailure::Missing
            } else {
                ReadFailure::Io(e)
            };
            PoseError::read(path, reason)
        })?;
        let record = ParameterRecord::parse(&text)
            .map_err(|message| PoseError::read(path, ReadFailure::Malformed(message)))?;
        debug!("Keys found in parameters file: {:?}", record.keys());
        Ok(record)
    }

    /// Parses a record from JSON text. The error is a human readable message.
    pub fn parse(text: &str) -> std::result::Result<ParameterRecord, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        ParameterRecord::from_value(value)
    }

    pub fn from_value(value: Value) -> std::result::Result<ParameterRecord, String> {
        match value {
            Value::Object(entries) => {
                for key in [FINAL_POSE_KEY, ROTATIONS_KEY, TRANSLATIONS_KEY] {
                    if let Some(entry) = entries.get(key) {
                        Tensor::from_json(entry).map_err(|e| format!("entry '{}': {}", key, e))?;
                    }
                }
                Ok(ParameterRecord { entries })
            }
            other => Err(format!(
                "top level is {}, expected an object",
                json_kind(&other)
            )),
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// The entry `key` as a tensor, if present and numeric.
    pub fn tensor(&self, key: &str) -> Option<Tensor> {
        self.entries
            .get(key)
            .and_then(|value| Tensor::from_json(value).ok().flatten())
    }

    /// Picks the pose variant this record carries.
    ///
    /// `final_pose` wins when it holds a tensor. Otherwise both `rotations` and
    /// `translations` must be tensors. Anything else is [`PoseError::NotFound`].
    pub fn pose_source(&self) -> Result<PoseSource> {
        if let Some(matrix) = self.tensor(FINAL_POSE_KEY) {
            debug!("Found '{}' in parameters file", FINAL_POSE_KEY);
            return Ok(PoseSource::Composed(matrix));
        }
        match (self.tensor(ROTATIONS_KEY), self.tensor(TRANSLATIONS_KEY)) {
            (Some(rotations), Some(translations)) => Ok(PoseSource::Separate {
                rotations,
                translations,
            }),
            _ => Err(PoseError::NotFound),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn final_pose_takes_precedence() {
        let record = ParameterRecord::parse(
            r#"{"final_pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]],
                "rotations": [0,0,0], "translations": [1,2,3]}"#,
        )
        .unwrap();
        match record.pose_source().unwrap() {
            PoseSource::Composed(t) => assert_eq!(t.shape, vec![4, 4]),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn non_tensor_final_pose_falls_through() {
        let record = ParameterRecord::parse(
            r#"{"final_pose": "pending", "rotations": [0,0,0], "translations": [1,2,3]}"#,
        )
        .unwrap();
        assert!(matches!(
            record.pose_source().unwrap(),
            PoseSource::Separate { .. }
        ));
    }

    #[test]
    fn missing_pose_entries_is_not_found() {
        let record = ParameterRecord::parse(r#"{"loss": 0.25, "rotations": [0,0,0]}"#).unwrap();
        assert!(matches!(record.pose_source(), Err(PoseError::NotFound)));
    }

    #[test]
    fn unrelated_metadata_does_not_block_the_pose() {
        let record = ParameterRecord::parse(
            r#"{"final_pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]],
                "labels": ["spine", "pelvis"], "flags": [true, false],
                "history": [[1, 2], [3]]}"#,
        )
        .unwrap();
        assert!(matches!(
            record.pose_source().unwrap(),
            PoseSource::Composed(_)
        ));
        assert!(record.tensor("labels").is_none());
    }

    #[test]
    fn mixed_rotations_are_malformed() {
        assert!(ParameterRecord::parse(r#"{"rotations": [0, "x", 0], "translations": [0,0,0]}"#)
            .is_err());
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        assert!(ParameterRecord::parse("[1, 2, 3]").is_err());
        assert!(ParameterRecord::parse("not json").is_err());
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ParameterRecord::read(&dir.path().join("parameters.json")).unwrap_err();
        assert!(matches!(
            err,
            PoseError::Read {
                reason: ReadFailure::Missing,
                ..
            }
        ));
    }

    #[test]
    fn read_reports_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"final_pose\": [[1, 0], [0]]}}").unwrap();
        let err = ParameterRecord::read(file.path()).unwrap_err();
        assert!(matches!(
            err,
            PoseError::Read {
                reason: ReadFailure::Malformed(_),
                ..
            }
        ));
    }
}
