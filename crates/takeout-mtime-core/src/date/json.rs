use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Error;

#[derive(Deserialize)]
struct GoogleMetadata {
    #[serde(rename = "photoTakenTime")]
    photo_taken_time: Option<TakenTime>,
}

#[derive(Deserialize)]
struct TakenTime {
    timestamp: Option<EpochValue>,
}

/// Takeout writes the epoch as a string; accept a bare integer too.
#[derive(Deserialize)]
#[serde(untagged)]
enum EpochValue {
    Integer(i64),
    Text(String),
    Other(serde_json::Value),
}

/// Extract `photoTakenTime.timestamp` as epoch seconds.
/// The error string says what was wrong with the document.
pub fn parse_photo_taken_time(json_bytes: &[u8]) -> Result<i64, String> {
    let data: GoogleMetadata =
        serde_json::from_slice(json_bytes).map_err(|e| format!("invalid JSON: {}", e))?;

    let taken = data
        .photo_taken_time
        .ok_or_else(|| "missing photoTakenTime".to_string())?;

    match taken.timestamp {
        None => Err("missing photoTakenTime.timestamp".to_string()),
        Some(EpochValue::Integer(epoch)) => Ok(epoch),
        Some(EpochValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("timestamp is not an integer: {:?}", s)),
        Some(EpochValue::Other(v)) => Err(format!("timestamp is not an integer: {}", v)),
    }
}

/// Read a sidecar and return its capture time as a UTC instant.
pub fn read_sidecar_timestamp(path: &Path) -> Result<DateTime<Utc>, Error> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let malformed = |reason: String| Error::MalformedSidecar {
        path: path.to_path_buf(),
        reason,
    };

    let epoch = parse_photo_taken_time(&bytes).map_err(malformed)?;
    DateTime::from_timestamp(epoch, 0)
        .ok_or_else(|| malformed(format!("timestamp {} out of range", epoch)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_integer_timestamps() {
        let text = br#"{"title":"a.jpg","photoTakenTime":{"timestamp":"1609459200","formatted":"Jan 1, 2021"}}"#;
        assert_eq!(parse_photo_taken_time(text), Ok(1609459200));

        let number = br#"{"photoTakenTime":{"timestamp":1700000000}}"#;
        assert_eq!(parse_photo_taken_time(number), Ok(1700000000));
    }

    #[test]
    fn test_malformed_documents() {
        let missing = parse_photo_taken_time(br#"{"photoTakenTime": {}}"#).unwrap_err();
        assert!(missing.contains("photoTakenTime.timestamp"));

        let no_key = parse_photo_taken_time(br#"{"creationTime": {"timestamp": "1"}}"#).unwrap_err();
        assert_eq!(no_key, "missing photoTakenTime");

        let words = parse_photo_taken_time(br#"{"photoTakenTime": {"timestamp": "yesterday"}}"#).unwrap_err();
        assert!(words.contains("not an integer"));

        let float = parse_photo_taken_time(br#"{"photoTakenTime": {"timestamp": 1.5}}"#).unwrap_err();
        assert!(float.contains("not an integer"));

        let broken = parse_photo_taken_time(b"{not json").unwrap_err();
        assert!(broken.starts_with("invalid JSON"));
    }

    #[test]
    fn test_read_sidecar_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.jpg.json");
        std::fs::write(&good, br#"{"photoTakenTime":{"timestamp":"1700000000"}}"#).unwrap();
        assert_eq!(read_sidecar_timestamp(&good).unwrap().timestamp(), 1700000000);

        let bad = dir.path().join("b.jpg.json");
        std::fs::write(&bad, br#"{"photoTakenTime":{}}"#).unwrap();
        let err = read_sidecar_timestamp(&bad).unwrap_err();
        assert!(matches!(err, Error::MalformedSidecar { .. }));
        assert!(err.is_fallback());
    }
}
