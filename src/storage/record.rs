//! Per-row result records and the artifact document that holds them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InferenceError;
use crate::pipeline::RowOutcome;

/// Outcome of one dataset row under one (task, condition) pair.
///
/// Exactly one of `raw_response` / `error` is set. `parsed` is always written
/// as `null`; filling it is left to the external scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Zero-based position of the row in the (limited) dataset.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Relabel-stage output, present only under `code+relabel`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relabeled: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub parsed: Option<Value>,
}

impl ResultRecord {
    pub fn success(index: usize, outcome: RowOutcome) -> Self {
        Self {
            index,
            raw_response: Some(outcome.raw_response),
            relabeled: outcome.relabeled,
            error: None,
            parsed: None,
        }
    }

    pub fn failure(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            raw_response: None,
            relabeled: None,
            error: Some(error.into()),
            parsed: None,
        }
    }

    /// Build the record for a row from its pipeline result.
    pub fn from_outcome(index: usize, outcome: Result<RowOutcome, InferenceError>) -> Self {
        match outcome {
            Ok(outcome) => Self::success(index, outcome),
            Err(e) => Self::failure(index, e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Artifact document for one (task, condition, model) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    /// Full model identifier the results were generated with.
    pub model: String,
    pub results: Vec<ResultRecord>,
}

impl ResultFile {
    pub fn new(model: impl Into<String>, results: Vec<ResultRecord>) -> Self {
        Self {
            model: model.into(),
            results,
        }
    }

    /// Number of rows that ended in an error record.
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_record_json_shape() {
        let record = ResultRecord::success(
            0,
            RowOutcome {
                raw_response: "2".to_string(),
                relabeled: None,
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"index": 0, "rawResponse": "2", "parsed": null})
        );
    }

    #[test]
    fn test_relabel_record_json_shape() {
        let record = ResultRecord::success(
            3,
            RowOutcome {
                raw_response: "yes".to_string(),
                relabeled: Some("ring = Fragment('c1ccccc1')".to_string()),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["relabeled"], "ring = Fragment('c1ccccc1')");
        assert_eq!(json["rawResponse"], "yes");
        assert!(json["parsed"].is_null());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_record_json_shape() {
        let record = ResultRecord::from_outcome(7, Err(InferenceError::EmptyResponse));
        assert!(record.is_error());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"index": 7, "error": "Engine returned no content", "parsed": null})
        );
    }

    #[test]
    fn test_result_file_error_count() {
        let file = ResultFile::new(
            "m",
            vec![
                ResultRecord::failure(0, "x"),
                ResultRecord::success(
                    1,
                    RowOutcome {
                        raw_response: String::new(),
                        relabeled: None,
                    },
                ),
            ],
        );
        assert_eq!(file.error_count(), 1);
    }

    #[test]
    fn test_result_file_deserializes_scored_artifact() {
        let file: ResultFile = serde_json::from_str(
            r#"{"model":"m","results":[{"index":0,"rawResponse":"3","parsed":3}]}"#,
        )
        .unwrap();
        assert_eq!(file.results[0].parsed, Some(Value::from(3)));
    }
}
