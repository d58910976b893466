use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Error;
use crate::media::{self, MediaKind, PAIRED_IMAGE_EXTENSIONS};

pub const SUPPLEMENTAL_SUFFIX: &str = ".supplemental-metadata.json";

/// One way Takeout may have named the sidecar of a media file.
pub struct NamingRule {
    pub name: &'static str,
    candidate: fn(&str) -> Option<String>,
}

impl NamingRule {
    /// Sidecar filename this rule proposes for `filename`, if it applies.
    pub fn candidate(&self, filename: &str) -> Option<String> {
        (self.candidate)(filename)
    }
}

/// Probed in order; the first existing file wins.
pub static NAMING_RULES: &[NamingRule] = &[
    NamingRule { name: "exact", candidate: exact },
    NamingRule { name: "truncated", candidate: truncated },
    NamingRule { name: "supplemental", candidate: supplemental },
    NamingRule { name: "truncated-supplemental", candidate: truncated_supplemental },
    NamingRule { name: "stem-supplemental", candidate: stem_supplemental },
    NamingRule { name: "collision-supplemental", candidate: collision_supplemental },
    NamingRule { name: "suppl", candidate: suppl },
    NamingRule { name: "supplemen", candidate: supplemen },
];

fn exact(filename: &str) -> Option<String> {
    Some(format!("{}.json", filename))
}

fn truncated(filename: &str) -> Option<String> {
    media::truncated_stem(filename).map(|stem| format!("{}.json", stem))
}

fn supplemental(filename: &str) -> Option<String> {
    Some(format!("{}{}", filename, SUPPLEMENTAL_SUFFIX))
}

fn truncated_supplemental(filename: &str) -> Option<String> {
    media::truncated_stem(filename).map(|stem| format!("{}{}", stem, SUPPLEMENTAL_SUFFIX))
}

fn stem_supplemental(filename: &str) -> Option<String> {
    Some(format!("{}{}", media::stem_before_first_dot(filename), SUPPLEMENTAL_SUFFIX))
}

// IMG(1).JPG -> IMG.JPG(1).supplemental-metadata.json
fn collision_supplemental(filename: &str) -> Option<String> {
    let parts = media::collision_parts(filename)?;
    Some(format!(
        "{}.{}({}){}",
        parts.base, parts.ext, parts.index, SUPPLEMENTAL_SUFFIX
    ))
}

fn suppl(filename: &str) -> Option<String> {
    Some(format!("{}.suppl.json", filename))
}

fn supplemen(filename: &str) -> Option<String> {
    Some(format!("{}.supplemen.json", filename))
}

/// Candidate sidecar names for `filename`, lazily, in priority order.
pub fn candidates(filename: &str) -> impl Iterator<Item = (&'static NamingRule, String)> + '_ {
    NAMING_RULES
        .iter()
        .filter_map(move |rule| rule.candidate(filename).map(|name| (rule, name)))
}

/// A sidecar located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarMatch {
    pub path: PathBuf,
    /// Name of the rule that produced the hit
    pub rule: &'static str,
    /// Still image whose sidecar stands in for a video
    pub paired_image: Option<String>,
}

/// Find the sidecar for `filename` inside `dir`.
///
/// Videos only ever borrow the sidecar of a same-stem still image; without
/// one they are `SidecarNotFound`. `SidecarNotFound` is recoverable.
pub fn resolve(dir: &Path, filename: &str) -> Result<SidecarMatch, Error> {
    let is_video = MediaKind::from_filename(filename).is_some_and(MediaKind::is_video);

    let found = if is_video {
        resolve_paired(dir, filename)
    } else {
        resolve_by_rules(dir, filename)
    };

    found.ok_or_else(|| Error::SidecarNotFound {
        file: dir.join(filename),
    })
}

fn resolve_by_rules(dir: &Path, filename: &str) -> Option<SidecarMatch> {
    candidates(filename).find_map(|(rule, name)| {
        let path = dir.join(name);
        debug!("probe {} [{}]", path.display(), rule.name);
        path.is_file().then(|| SidecarMatch {
            path,
            rule: rule.name,
            paired_image: None,
        })
    })
}

/// Same-stem still image next to a video, e.g. IMG_0001.JPG for IMG_0001.MP4.
pub fn paired_image(dir: &Path, video_filename: &str) -> Option<String> {
    let stem = Path::new(video_filename).file_stem()?.to_str()?;
    PAIRED_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| format!("{}.{}", stem, ext))
        .find(|name| dir.join(name).is_file())
}

fn resolve_paired(dir: &Path, video_filename: &str) -> Option<SidecarMatch> {
    let image = paired_image(dir, video_filename)?;
    debug!("{} pairs with {}", video_filename, image);

    let fixed = dir.join(format!("{}{}", image, SUPPLEMENTAL_SUFFIX));
    let found = if fixed.is_file() {
        Some(SidecarMatch {
            path: fixed,
            rule: "paired-supplemental",
            paired_image: None,
        })
    } else {
        resolve_by_rules(dir, &image)
    };

    found.map(|m| SidecarMatch {
        paired_image: Some(image),
        ..m
    })
}
