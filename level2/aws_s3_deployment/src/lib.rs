//! copies a local directory of built assets into a bucket after the stack
//! that owns the bucket is deployed. Synthesis only records what to copy
//! (`DeploymentArtifact`), the copy itself happens in `sync_artifact`.

use std::path::PathBuf;

use portal_lib::{L0Core, SynthError};

mod artifact;
mod s3_store;
mod store;
mod sync;

pub use artifact::*;
pub use s3_store::*;
pub use store::*;
pub use sync::*;

#[derive(Debug, Clone, Default)]
pub struct Input {
    /// the directory to upload. Relative paths are resolved against the
    /// current working directory.
    pub source_dir: PathBuf,
    pub destination_bucket_logical_id: String,
    /// the stack output that resolves to the physical name of the destination bucket.
    pub destination_bucket_output: String,
    /// by default objects that no longer exist locally are left in the bucket,
    /// so clients holding an older index.html can still load its assets.
    pub prune: bool,
}

pub fn config(myinput: &Input, l0core: &mut L0Core) -> Result<DeploymentArtifact, SynthError> {
    if myinput.destination_bucket_logical_id.is_empty() || myinput.destination_bucket_output.is_empty() {
        return Err(SynthError::InvalidConfig(
            "a deployment requires a destination bucket and the output that names it".into(),
        ));
    }
    let source_dir = if myinput.source_dir.is_absolute() {
        myinput.source_dir.clone()
    } else {
        let cwd = std::env::current_dir().map_err(|source| SynthError::AssetRead {
            path: myinput.source_dir.clone(),
            source,
        })?;
        cwd.join(&myinput.source_dir)
    };
    let (keys, source_hash) = scan_source_dir(&source_dir)?;
    if keys.is_empty() {
        l0core.compiler_warning(&format!("asset directory {} is empty", source_dir.display()));
    }

    let id = l0core.allocate_logical_id("Deployment")?;
    tracing::debug!(%id, files = keys.len(), hash = %source_hash, "recorded deployment artifact");
    Ok(DeploymentArtifact {
        id,
        source_dir,
        keys,
        source_hash,
        destination_bucket_logical_id: myinput.destination_bucket_logical_id.clone(),
        destination_bucket_output: myinput.destination_bucket_output.clone(),
        prune: myinput.prune,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_artifact_in_scope() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let mut core = L0Core::new();
        let input = Input {
            source_dir: dir.path().to_path_buf(),
            destination_bucket_logical_id: "Bucket".into(),
            destination_bucket_output: "portalBucketName".into(),
            prune: false,
        };
        let artifact = core.scoped("Portal", |core| config(&input, core)).unwrap();
        assert!(artifact.id.starts_with("PortalDeployment"));
        assert_eq!(artifact.keys, vec!["index.html"]);
        assert!(!artifact.prune);
        assert!(core.warnings().is_empty());
    }

    #[test]
    fn empty_directories_warn() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = L0Core::new();
        let input = Input {
            source_dir: dir.path().to_path_buf(),
            destination_bucket_logical_id: "Bucket".into(),
            destination_bucket_output: "portalBucketName".into(),
            prune: false,
        };
        config(&input, &mut core).unwrap();
        assert_eq!(core.warnings().len(), 1);
    }

    #[test]
    fn requires_destination() {
        let dir = tempfile::tempdir().unwrap();
        let input = Input { source_dir: dir.path().to_path_buf(), ..Default::default() };
        assert!(matches!(config(&input, &mut L0Core::new()), Err(SynthError::InvalidConfig(_))));
    }
}
