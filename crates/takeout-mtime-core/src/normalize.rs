use std::path::Path;
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::error::Error;
use crate::media;
use crate::ThrottledProgress;

/// `{stem}.{subext}({index}).json`, the shape re-extraction leaves behind.
static MISPLACED_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\.(.*)\((\d+)\)\.json$").unwrap());

/// Outcome of one normalizer pass over a directory.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// (old name, new name) for every rename performed
    pub renamed: Vec<(String, String)>,
    /// Renames refused or failed; the files keep their old names
    pub failures: Vec<Error>,
}

/// Move a misplaced collision index in front of the sub-extension:
/// `IMG.JPG(1).json` becomes `IMG(1).JPG.json`.
/// Returns None when the name is already in the expected shape.
pub fn normalize_name(filename: &str) -> Option<String> {
    if !media::is_sidecar_name(filename) || !filename.contains('(') || !filename.contains(')') {
        return None;
    }
    let caps = MISPLACED_INDEX_RE.captures(filename)?;
    let renamed = format!("{}({}).{}.json", &caps[1], &caps[3], &caps[2]);
    (renamed != filename).then_some(renamed)
}

/// Rename every malformed sidecar in `dir`. Never overwrites an existing file.
pub fn normalize_directory(dir: &Path, progress: &ThrottledProgress) -> Result<NormalizeReport, Error> {
    let names = media::list_files(dir).map_err(|e| Error::io(dir, e))?;
    let total = names.len() as u64;
    let mut report = NormalizeReport::default();

    for (i, name) in names.iter().enumerate() {
        progress.report("normalize", i as u64, total, name);

        let Some(target) = normalize_name(name) else {
            continue;
        };
        let from = dir.join(name);
        let to = dir.join(&target);

        if to.exists() {
            let err = Error::RenameConflict { from, to };
            warn!("{}", err);
            report.failures.push(err);
            continue;
        }

        debug!("rename {} -> {}", from.display(), to.display());
        match std::fs::rename(&from, &to) {
            Ok(()) => {
                info!("Renamed {} to {}", name, target);
                report.renamed.push((name.clone(), target));
            }
            Err(e) => {
                let err = Error::io(&from, e);
                warn!("{}", err);
                report.failures.push(err);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn quiet() -> impl Fn(&str, u64, u64, &str) + Send + Sync {
        |_: &str, _: u64, _: u64, _: &str| {}
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(
            normalize_name("IMG_1234.JPG(1).json").as_deref(),
            Some("IMG_1234(1).JPG.json")
        );
        assert_eq!(
            normalize_name("IMG_1234.JPG.supplemental-metadata(2).json").as_deref(),
            Some("IMG_1234.JPG(2).supplemental-metadata.json")
        );
        assert_eq!(normalize_name("IMG_1234(1).JPG.json"), None);
        assert_eq!(normalize_name("IMG_1234.JPG.json"), None);
        assert_eq!(normalize_name("IMG_1234(1).json"), None);
        assert_eq!(normalize_name("IMG_1234.JPG(a).json"), None);
        assert_eq!(normalize_name("IMG_1234.JPG(1)"), None);
    }

    #[test]
    fn test_normalize_name_is_stable() {
        for name in [
            "IMG_1234.JPG(1).json",
            "IMG_1234.JPG.supplemental-metadata(2).json",
            "a.b.c(10).json",
        ] {
            let once = normalize_name(name).unwrap();
            assert_eq!(normalize_name(&once), None, "{} rewritten twice", name);
        }
    }

    #[test]
    fn test_normalize_directory_twice() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG_1234.JPG(1).json"), b"{}").unwrap();
        fs::write(dir.path().join("IMG_1234(1).JPG"), b"x").unwrap();
        fs::write(dir.path().join("other.jpg.json"), b"{}").unwrap();

        let cb = quiet();
        let tp = ThrottledProgress::new(&cb);

        let first = normalize_directory(dir.path(), &tp).unwrap();
        assert_eq!(first.renamed.len(), 1);
        assert!(first.failures.is_empty());
        let after_once = media::list_files(dir.path()).unwrap();

        let second = normalize_directory(dir.path(), &tp).unwrap();
        assert!(second.renamed.is_empty());
        assert_eq!(media::list_files(dir.path()).unwrap(), after_once);
        assert!(dir.path().join("IMG_1234(1).JPG.json").exists());
    }

    #[test]
    fn test_normalize_conflict_keeps_both() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG_1.JPG(1).json"), b"old").unwrap();
        fs::write(dir.path().join("IMG_1(1).JPG.json"), b"new").unwrap();

        let cb = quiet();
        let tp = ThrottledProgress::new(&cb);
        let report = normalize_directory(dir.path(), &tp).unwrap();

        assert!(report.renamed.is_empty());
        assert!(matches!(report.failures[0], Error::RenameConflict { .. }));
        assert_eq!(fs::read(dir.path().join("IMG_1.JPG(1).json")).unwrap(), b"old");
        assert_eq!(fs::read(dir.path().join("IMG_1(1).JPG.json")).unwrap(), b"new");
    }
}
