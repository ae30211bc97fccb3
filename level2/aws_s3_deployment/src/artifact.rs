use std::path::{Path, PathBuf};

use portal_lib::SynthError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// version of the asset manifest layout.
pub const MANIFEST_VERSION: u32 = 1;

/// a local directory that gets copied into a bucket once the stack is deployed.
/// This is recorded into the asset manifest as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentArtifact {
    pub id: String,
    /// absolute path of the directory the keys are relative to.
    pub source_dir: PathBuf,
    /// every object key, `/` separated and sorted.
    pub keys: Vec<String>,
    /// sha256 over every key and the contents of its file.
    pub source_hash: String,
    pub destination_bucket_logical_id: String,
    /// the stack output that resolves to the physical bucket name.
    pub destination_bucket_output: String,
    /// delete objects from the bucket that no longer exist locally.
    pub prune: bool,
}

impl DeploymentArtifact {
    pub fn local_path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.source_dir.clone(), |mut path, component| {
            path.push(component);
            path
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub version: u32,
    pub artifacts: Vec<DeploymentArtifact>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self { version: MANIFEST_VERSION, artifacts: vec![] }
    }
}

impl AssetManifest {
    pub fn new(artifacts: Vec<DeploymentArtifact>) -> Self {
        Self { version: MANIFEST_VERSION, artifacts }
    }
}

fn read_err(path: &Path) -> impl FnOnce(std::io::Error) -> SynthError {
    let path = path.to_path_buf();
    move |source| SynthError::AssetRead { path, source }
}

/// walks `start_dir`, following symlinks. `ancestors` holds the canonical
/// paths of the directories being walked, so a link back into one of them
/// is reported instead of recursing forever.
fn iter_files_recursively(
    start_dir: &Path,
    ancestors: &mut Vec<PathBuf>,
    callback: &mut impl FnMut(PathBuf) -> Result<(), SynthError>,
) -> Result<(), SynthError> {
    let canonical = std::fs::canonicalize(start_dir).map_err(read_err(start_dir))?;
    if ancestors.contains(&canonical) {
        return Err(SynthError::AssetRead {
            path: start_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "symlink loops back into a parent directory"),
        });
    }
    ancestors.push(canonical);
    let readdir = std::fs::read_dir(start_dir).map_err(read_err(start_dir))?;
    for entry in readdir {
        let direntry = entry.map_err(read_err(start_dir))?;
        let path = direntry.path();
        // fs::metadata follows links, DirEntry::file_type does not
        let metadata = std::fs::metadata(&path).map_err(read_err(&path))?;
        if metadata.is_dir() {
            iter_files_recursively(&path, ancestors, callback)?;
        } else {
            callback(path)?;
        }
    }
    ancestors.pop();
    Ok(())
}

fn key_for(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let components: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(components?.join("/"))
}

/// list every file under `source_dir` as object keys, and hash them.
/// `source_dir` must already be absolute.
pub fn scan_source_dir(source_dir: &Path) -> Result<(Vec<String>, String), SynthError> {
    let metadata = match std::fs::metadata(source_dir) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SynthError::MissingAssets { path: source_dir.to_path_buf() })
        }
        Err(source) => return Err(SynthError::AssetRead { path: source_dir.to_path_buf(), source }),
    };
    if !metadata.is_dir() {
        return Err(SynthError::AssetsNotDirectory { path: source_dir.to_path_buf() });
    }

    let mut files = vec![];
    iter_files_recursively(source_dir, &mut vec![], &mut |path| {
        let key = key_for(source_dir, &path).ok_or_else(|| SynthError::AssetRead {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "file name is not valid utf-8"),
        })?;
        files.push((key, path));
        Ok(())
    })?;
    files.sort();

    let mut hasher = Sha256::new();
    for (key, path) in files.iter() {
        let contents = std::fs::read(path).map_err(|source| SynthError::AssetRead { path: path.clone(), source })?;
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    let hash = hex::encode(hasher.finalize());
    Ok((files.into_iter().map(|(key, _)| key).collect(), hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn keys_are_sorted_and_slash_separated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<html></html>");
        write(dir.path(), "static/js/app.js", "console.log(1)");
        write(dir.path(), "favicon.ico", "ico");
        let (keys, hash) = scan_source_dir(dir.path()).unwrap();
        assert_eq!(keys, vec!["favicon.ico", "index.html", "static/js/app.js"]);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn hash_tracks_contents_and_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "a");
        let (_, first) = scan_source_dir(dir.path()).unwrap();
        let (_, again) = scan_source_dir(dir.path()).unwrap();
        assert_eq!(first, again);

        write(dir.path(), "a.html", "b");
        let (_, changed) = scan_source_dir(dir.path()).unwrap();
        assert_ne!(first, changed);

        std::fs::rename(dir.path().join("a.html"), dir.path().join("c.html")).unwrap();
        let (_, renamed) = scan_source_dir(dir.path()).unwrap();
        assert_ne!(changed, renamed);
    }

    #[test]
    fn missing_or_file_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(scan_source_dir(&missing), Err(SynthError::MissingAssets { .. })));

        write(dir.path(), "file.txt", "x");
        assert!(matches!(
            scan_source_dir(&dir.path().join("file.txt")),
            Err(SynthError::AssetsNotDirectory { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_followed() {
        let outside = tempfile::tempdir().unwrap();
        write(outside.path(), "shared/logo.svg", "<svg/>");
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<html></html>");
        std::os::unix::fs::symlink(outside.path().join("shared"), dir.path().join("img")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("shared/logo.svg"), dir.path().join("logo.svg")).unwrap();

        let (keys, _) = scan_source_dir(dir.path()).unwrap();
        assert_eq!(keys, vec!["img/logo.svg", "index.html", "logo.svg"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "static/app.js", "1");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("static").join("up")).unwrap();

        let err = scan_source_dir(dir.path()).unwrap_err();
        match err {
            SynthError::AssetRead { path, source } => {
                assert_eq!(path, dir.path().join("static").join("up"));
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn local_path_joins_key_components() {
        let artifact = DeploymentArtifact {
            id: "Assets".into(),
            source_dir: PathBuf::from("/srv/site"),
            keys: vec![],
            source_hash: String::new(),
            destination_bucket_logical_id: "Bucket".into(),
            destination_bucket_output: "portalBucketName".into(),
            prune: false,
        };
        assert_eq!(artifact.local_path("static/app.js"), Path::new("/srv/site/static/app.js"));
    }
}
