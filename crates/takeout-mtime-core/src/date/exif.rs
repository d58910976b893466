use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};

use crate::error::Error;

/// Tags holding the moment of capture, most specific first.
const CAPTURE_TAGS: [Tag; 2] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// Read the capture time stored inside a JPEG or HEIC file.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn read_capture_time(path: &Path) -> Result<NaiveDateTime, Error> {
    let no_capture_time = |reason: String| Error::NoCaptureTime {
        file: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|e| no_capture_time(e.to_string()))?;

    for tag in CAPTURE_TAGS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };
        if let Value::Ascii(ref parts) = field.value {
            let parsed = parts
                .first()
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .and_then(parse_exif_datetime);
            if let Some(dt) = parsed {
                return Ok(dt);
            }
        }
    }

    Err(no_capture_time("no DateTimeOriginal tag".to_string()))
}

/// Parse `YYYY:MM:DD HH:MM:SS`.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(cleaned, "%Y:%m:%d %H:%M:%S").ok()
}
