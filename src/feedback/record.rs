// Feedback record - sidecar metadata and the file naming convention
//
// Audio copies are named `{YYYYmmdd_HHMMSS_ffffff}_{status}[_user{id}]{.ext}`
// and the sidecar shares the stem with a `.json` extension. The status is
// always the fourth `_`-separated token of the stem.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in feedback file names (microsecond resolution)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Whether the prediction matched the label the user confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Correct,
    Corrected,
}

impl FeedbackStatus {
    pub fn from_labels(predicted_label: u32, correct_label: u32) -> Self {
        if predicted_label == correct_label {
            FeedbackStatus::Correct
        } else {
            FeedbackStatus::Corrected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Correct => "correct",
            FeedbackStatus::Corrected => "corrected",
        }
    }

    /// Parse the status token of a feedback file stem
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        match stem.split('_').nth(3)? {
            "correct" => Some(FeedbackStatus::Correct),
            "corrected" => Some(FeedbackStatus::Corrected),
            _ => None,
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON sidecar stored next to every feedback audio copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: String,
    #[serde(default)]
    pub request_id: Option<String>,
    pub predicted_label: u32,
    pub predicted_class: String,
    pub correct_label: u32,
    pub correct_class: String,
    pub status: FeedbackStatus,
    pub user_id: Option<String>,
    pub confidence: Option<f64>,
    pub original_path: PathBuf,
    pub saved_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Build the audio file name for a record
///
/// `extension` is taken from the source file and may be empty.
pub fn feedback_file_name(
    timestamp: &str,
    status: FeedbackStatus,
    user_id: Option<&str>,
    extension: &str,
) -> String {
    let user_suffix = user_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("_user{}", id))
        .unwrap_or_default();
    let extension = if extension.is_empty() {
        String::new()
    } else {
        format!(".{}", extension)
    };
    format!("{}_{}{}{}", timestamp, status, user_suffix, extension)
}

/// Sidecar path for an audio copy
pub fn sidecar_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_labels() {
        assert_eq!(FeedbackStatus::from_labels(1, 1), FeedbackStatus::Correct);
        assert_eq!(FeedbackStatus::from_labels(0, 1), FeedbackStatus::Corrected);
    }

    #[test]
    fn test_file_name_convention() {
        let ts = "20240131_235959_000123";
        assert_eq!(
            feedback_file_name(ts, FeedbackStatus::Correct, None, "wav"),
            "20240131_235959_000123_correct.wav"
        );
        assert_eq!(
            feedback_file_name(ts, FeedbackStatus::Corrected, Some("42"), "WAV"),
            "20240131_235959_000123_corrected_user42.WAV"
        );
        assert_eq!(
            feedback_file_name(ts, FeedbackStatus::Correct, Some(""), ""),
            "20240131_235959_000123_correct"
        );
    }

    #[test]
    fn test_status_parsed_with_and_without_user_suffix() {
        assert_eq!(
            FeedbackStatus::from_file_stem("20240131_235959_000123_correct"),
            Some(FeedbackStatus::Correct)
        );
        assert_eq!(
            FeedbackStatus::from_file_stem("20240131_235959_000123_corrected_user_a_b"),
            Some(FeedbackStatus::Corrected)
        );
        assert_eq!(FeedbackStatus::from_file_stem("random_name"), None);
    }

    #[test]
    fn test_timestamp_layout() {
        let ts = current_timestamp();
        let parts: Vec<&str> = ts.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_sidecar_schema() {
        let record = FeedbackRecord {
            timestamp: "20240101_000000_000001".to_string(),
            request_id: Some("req-1".to_string()),
            predicted_label: 0,
            predicted_class: "Female".to_string(),
            correct_label: 1,
            correct_class: "Male".to_string(),
            status: FeedbackStatus::Corrected,
            user_id: None,
            confidence: Some(0.75),
            original_path: PathBuf::from("/tmp/in.wav"),
            saved_path: PathBuf::from("feedback_data/male/x.wav"),
            updated_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "corrected");
        assert_eq!(json["user_id"], serde_json::Value::Null);
        assert!(json.get("updated_at").is_none());

        let back: FeedbackRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
