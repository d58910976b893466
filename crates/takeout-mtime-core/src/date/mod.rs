pub mod exif;
pub mod json;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use filetime::FileTime;
use serde::Serialize;

use crate::error::Error;
use crate::media::{MediaFile, MediaKind};

/// Where a capture time came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TimeSource {
    /// `photoTakenTime` of a JSON sidecar
    Sidecar(PathBuf),
    /// Embedded still-image metadata
    Exif,
    /// The file's own modification time, re-applied unchanged
    FileMtime,
}

/// The single authoritative capture time of a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTimestamp {
    pub time: DateTime<Utc>,
    pub source: TimeSource,
}

/// Recover the capture time of `media`.
///
/// With a sidecar, its epoch (UTC) is authoritative. Without one, JPEG and
/// HEIC files fall back to their EXIF capture time (naive local time) and
/// MP4 files keep their current mtime. Other types are refused.
pub fn recover(media: &MediaFile, sidecar: Option<&Path>) -> Result<CaptureTimestamp, Error> {
    if let Some(path) = sidecar {
        let time = json::read_sidecar_timestamp(path)?;
        return Ok(CaptureTimestamp {
            time,
            source: TimeSource::Sidecar(path.to_path_buf()),
        });
    }

    let path = media.path();
    match media.kind {
        Some(MediaKind::Jpeg | MediaKind::Heic) => {
            let naive = exif::read_capture_time(&path)?;
            // Local-time interpretation; this can disagree with the sidecar path by the UTC offset.
            let time = local_to_utc(naive).ok_or_else(|| Error::NoCaptureTime {
                file: path.clone(),
                reason: format!("{} does not exist in the local timezone", naive),
            })?;
            Ok(CaptureTimestamp {
                time,
                source: TimeSource::Exif,
            })
        }
        Some(MediaKind::Mp4) => {
            let meta = fs::metadata(&path).map_err(|e| Error::io(&path, e))?;
            let mtime = FileTime::from_last_modification_time(&meta);
            let time = DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds())
                .ok_or_else(|| Error::NoCaptureTime {
                    file: path.clone(),
                    reason: "modification time out of range".to_string(),
                })?;
            Ok(CaptureTimestamp {
                time,
                source: TimeSource::FileMtime,
            })
        }
        None => Err(Error::UnsupportedMediaType { file: path }),
    }
}

/// Set both access and modification time of `path` to the capture time.
pub fn apply(path: &Path, ts: &CaptureTimestamp) -> Result<(), Error> {
    let ft = FileTime::from_unix_time(ts.time.timestamp(), ts.time.timestamp_subsec_nanos());
    filetime::set_file_times(path, ft, ft).map_err(|e| Error::io(path, e))
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
