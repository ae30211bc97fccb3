use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::{content_type_for, DeploymentArtifact, ObjectStore};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to read asset {}\n{source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {operation} object {key:?} in bucket {bucket}\n{message}")]
    Store {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Stack has no output named {output} for artifact {artifact}")]
    MissingBucketOutput { artifact: String, output: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
    /// remote objects that no longer exist locally but were kept because
    /// the artifact does not prune.
    pub retained: Vec<String>,
}

/// look up the physical bucket name of an artifact in the deployed stack outputs.
pub fn resolve_bucket<'a>(
    artifact: &DeploymentArtifact,
    stack_outputs: &'a BTreeMap<String, String>,
) -> Result<&'a str, SyncError> {
    stack_outputs
        .get(&artifact.destination_bucket_output)
        .map(|s| s.as_str())
        .ok_or_else(|| SyncError::MissingBucketOutput {
            artifact: artifact.id.clone(),
            output: artifact.destination_bucket_output.clone(),
        })
}

/// upload every key of the artifact, then, only if the artifact prunes,
/// delete remote keys that are not part of it.
pub async fn sync_artifact(artifact: &DeploymentArtifact, store: &dyn ObjectStore) -> Result<SyncReport, SyncError> {
    let remote: BTreeSet<String> = store.list_keys().await?.into_iter().collect();
    let local: BTreeSet<&str> = artifact.keys.iter().map(|k| k.as_str()).collect();
    let mut report = SyncReport::default();

    for key in artifact.keys.iter() {
        let path = artifact.local_path(key);
        let body = tokio::fs::read(&path)
            .await
            .map_err(|source| SyncError::Read { path: path.clone(), source })?;
        store.put_object(key, body, content_type_for(key)).await?;
        tracing::debug!(key = %key, "uploaded object");
        report.uploaded.push(key.clone());
    }

    for key in remote.iter().filter(|k| !local.contains(k.as_str())) {
        if artifact.prune {
            store.delete_object(key).await?;
            tracing::debug!(key = %key, "deleted stale object");
            report.deleted.push(key.clone());
        } else {
            report.retained.push(key.clone());
        }
    }

    tracing::info!(
        artifact = %artifact.id,
        uploaded = report.uploaded.len(),
        deleted = report.deleted.len(),
        retained = report.retained.len(),
        "synced assets"
    );
    Ok(report)
}
