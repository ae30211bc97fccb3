use std::collections::BTreeSet;

use crate::{SynthError, MAX_LOGICAL_ID_LEN};

/// length of the hex digest appended to every generated logical id.
const HASH_LEN: usize = 8;

/// Core synthesis context shared by every module during one synthesis pass.
/// This is where modules:
/// - learn which construct scope they are being defined in
/// - allocate unique logical ids for the resources they emit
/// - leave compiler warnings for the user
#[derive(Debug, Default)]
pub struct L0Core {
    scope: Vec<String>,
    allocated_ids: BTreeSet<String>,
    compiler_warning_messages: Vec<String>,
}

pub fn validate_construct_id(id: &str) -> Result<(), SynthError> {
    let reason = if id.is_empty() {
        "Must contain at least 1 character"
    } else if id.contains('/') {
        "May not contain the path separator '/'"
    } else {
        return Ok(());
    };
    Err(SynthError::InvalidConstructId { id: id.to_string(), reason: reason.to_string() })
}

pub fn verify_logical_id(id: &str) -> Result<(), SynthError> {
    let reason = if id.is_empty() {
        "Must contain at least 1 character".to_string()
    } else if id.len() > MAX_LOGICAL_ID_LEN {
        format!("must be at most {MAX_LOGICAL_ID_LEN} characters")
    } else if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        "Must contain only alphanumeric characters [A-Za-z0-9]".to_string()
    } else {
        return Ok(());
    };
    Err(SynthError::InvalidLogicalId { id: id.to_string(), reason })
}

/// derive a stable logical id from a construct path. The human readable part
/// is every path component stripped to alphanumerics, and the suffix is an
/// adler32 digest of the full path so that `a/bc` and `ab/c` never collide.
pub fn logical_id_for(path: &[&str]) -> String {
    let digest = adler::adler32_slice(path.join("/").as_bytes());
    let mut human: String = path
        .iter()
        .flat_map(|component| component.chars())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    human.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);
    format!("{human}{digest:08X}")
}

impl L0Core {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `f` inside a child scope named `id`.
    pub fn scoped<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Self) -> Result<T, SynthError>,
    ) -> Result<T, SynthError> {
        validate_construct_id(id)?;
        self.scope.push(id.to_string());
        let out = f(self);
        self.scope.pop();
        out
    }

    /// the `/` separated path of the current scope.
    pub fn path(&self) -> String {
        self.scope.join("/")
    }

    /// allocate the logical id for a resource named `id` in the current scope.
    pub fn allocate_logical_id(&mut self, id: &str) -> Result<String, SynthError> {
        validate_construct_id(id)?;
        let (logical_id, path) = {
            let mut path: Vec<&str> = self.scope.iter().map(|s| s.as_str()).collect();
            path.push(id);
            (logical_id_for(&path), path.join("/"))
        };
        self.reserve_logical_id(&logical_id)?;
        tracing::debug!(%path, %logical_id, "allocated logical id");
        Ok(logical_id)
    }

    /// claim an exact logical id, for resources/outputs whose id must stay fixed
    /// across deployments.
    pub fn reserve_logical_id(&mut self, logical_id: &str) -> Result<(), SynthError> {
        verify_logical_id(logical_id)?;
        if !self.allocated_ids.insert(logical_id.to_string()) {
            return Err(SynthError::DuplicateLogicalId(logical_id.to_string()));
        }
        Ok(())
    }

    pub fn release_logical_id(&mut self, logical_id: &str) {
        self.allocated_ids.remove(logical_id);
    }

    pub fn compiler_warning(&mut self, msg: &str) {
        tracing::warn!(scope = %self.path(), "{msg}");
        self.compiler_warning_messages.push(msg.to_string());
    }

    pub fn warnings(&self) -> &[String] {
        &self.compiler_warning_messages
    }
}
