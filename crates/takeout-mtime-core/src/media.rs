use std::fs;
use std::path::{Path, PathBuf};

/// Every sidecar name ends with this.
pub const SIDECAR_EXT: &str = ".json";

/// Still-image extensions probed for a live-photo partner, in priority order.
pub const PAIRED_IMAGE_EXTENSIONS: &[&str] = &["JPG", "jpg", "HEIC", "heic"];

/// Formats that can be dated without a sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Heic,
    Mp4,
}

impl MediaKind {
    /// Classify by extension, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" => Some(Self::Jpeg),
            "heic" => Some(Self::Heic),
            "mp4" => Some(Self::Mp4),
            _ => None,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::Mp4)
    }
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Directory holding the file and its sidecars
    pub dir: PathBuf,
    /// Just the filename
    pub filename: String,
    /// None for extensions outside the supported set
    pub kind: Option<MediaKind>,
}

impl MediaFile {
    pub fn new(dir: &Path, filename: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            filename: filename.to_string(),
            kind: MediaKind::from_filename(filename),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

pub fn is_sidecar_name(filename: &str) -> bool {
    filename.ends_with(SIDECAR_EXT)
}

/// Everything before the first dot (the whole name if there is none).
pub fn stem_before_first_dot(filename: &str) -> &str {
    filename.split('.').next().unwrap_or(filename)
}

/// The first-dot stem minus its last character.
/// Takeout sometimes drops one character when naming sidecars.
pub fn truncated_stem(filename: &str) -> Option<String> {
    let mut stem = stem_before_first_dot(filename).to_string();
    stem.pop()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Pieces of a name carrying a "(N)" collision index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionParts<'a> {
    /// Text before the opening parenthesis
    pub base: &'a str,
    /// The digits between the parentheses
    pub index: &'a str,
    /// Text after the last dot
    pub ext: &'a str,
}

pub fn collision_parts(filename: &str) -> Option<CollisionParts<'_>> {
    let open = filename.find('(')?;
    let close = open + filename[open..].find(')')?;
    let index = &filename[open + 1..close];
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (_, ext) = filename.rsplit_once('.')?;
    Some(CollisionParts {
        base: &filename[..open],
        index,
        ext,
    })
}

/// Regular files directly inside a directory.
#[derive(Debug, Default)]
pub struct FileListing {
    /// Sorted UTF-8 names
    pub names: Vec<String>,
    /// Files whose names are not valid UTF-8; never matched or touched
    pub non_utf8: Vec<PathBuf>,
}

pub fn scan_files(dir: &Path) -> std::io::Result<FileListing> {
    let mut listing = FileListing::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => listing.names.push(name),
            Err(_) => listing.non_utf8.push(entry.path()),
        }
    }
    listing.names.sort();
    listing.non_utf8.sort();
    Ok(listing)
}

/// Sorted names of the regular files directly inside `dir`.
/// Subdirectories and non UTF-8 names are left out.
pub fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    scan_files(dir).map(|listing| listing.names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::from_filename("IMG_0001.JPG"), Some(MediaKind::Jpeg));
        assert_eq!(MediaKind::from_filename("IMG_0001.jpg"), Some(MediaKind::Jpeg));
        assert_eq!(MediaKind::from_filename("IMG_0001.Heic"), Some(MediaKind::Heic));
        assert_eq!(MediaKind::from_filename("VID.mp4"), Some(MediaKind::Mp4));
        assert_eq!(MediaKind::from_filename("clip.mov"), None);
        assert_eq!(MediaKind::from_filename("README"), None);
        assert!(MediaKind::Mp4.is_video());
        assert!(!MediaKind::Heic.is_video());
    }

    #[test]
    fn test_stems() {
        assert_eq!(stem_before_first_dot("IMG_1234.JPG"), "IMG_1234");
        assert_eq!(stem_before_first_dot("a.b.c"), "a");
        assert_eq!(stem_before_first_dot("noext"), "noext");
        assert_eq!(truncated_stem("IMG_1234.JPG").as_deref(), Some("IMG_123"));
        assert_eq!(truncated_stem("写真.jpg").as_deref(), Some("写"));
        assert_eq!(truncated_stem("A.jpg"), None);
        assert_eq!(truncated_stem(".hidden"), None);
    }

    #[test]
    fn test_collision_parts() {
        let parts = collision_parts("IMG_1234(1).JPG").unwrap();
        assert_eq!(parts.base, "IMG_1234");
        assert_eq!(parts.index, "1");
        assert_eq!(parts.ext, "JPG");

        assert!(collision_parts("IMG_1234.JPG").is_none());
        assert!(collision_parts("IMG(a).JPG").is_none());
        assert!(collision_parts("IMG()1.JPG").is_none());
        assert!(collision_parts("IMG(12)").is_none());
    }

    #[test]
    fn test_list_files_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.jpg.json"), b"{}").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let names = list_files(dir.path()).unwrap();
        assert_eq!(names, vec!["a.jpg.json".to_string(), "b.jpg".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_files_reports_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join(OsStr::from_bytes(b"IMG_\xff.jpg"));
        if fs::write(&odd, b"x").is_err() {
            // filesystem refuses non UTF-8 names
            return;
        }
        fs::write(dir.path().join("ok.jpg"), b"x").unwrap();

        let listing = scan_files(dir.path()).unwrap();
        assert_eq!(listing.names, vec!["ok.jpg".to_string()]);
        assert_eq!(listing.non_utf8, vec![odd]);
    }
}
