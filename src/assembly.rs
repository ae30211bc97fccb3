use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_cfn_stack::SavedStack;
use aws_s3_deployment::AssetManifest;

use crate::root_stack::StackProps;

pub const DEFAULT_OUT_DIR: &str = "portal.out";

/// the result of one synthesis pass: a template, and the assets that have
/// to be uploaded once the template is deployed.
#[derive(Debug)]
pub struct CloudAssembly {
    pub stack: SavedStack,
    pub assets: AssetManifest,
    pub props: StackProps,
    pub warnings: Vec<String>,
}

impl CloudAssembly {
    pub fn template_json(&self) -> Result<String> {
        self.stack
            .to_json_pretty()
            .with_context(|| format!("Failed to serialize template of stack {}", self.stack.stack_name))
    }

    pub fn assets_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.assets)
            .with_context(|| format!("Failed to serialize asset manifest of stack {}", self.stack.stack_name))
    }

    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack.stack_name)
    }

    pub fn assets_file_name(&self) -> String {
        format!("{}.assets.json", self.stack.stack_name)
    }

    /// write the template and asset manifest into `out_dir`, creating it if
    /// needed. Returns the paths that were written.
    pub fn write_to(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        let files = [
            (self.template_file_name(), self.template_json()?),
            (self.assets_file_name(), self.assets_json()?),
        ];
        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = out_dir.join(name);
            std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!(path = %path.display(), "wrote assembly file");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;

    #[test]
    fn writes_template_and_manifest() {
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("index.html"), "hi").unwrap();
        let mut config = PortalConfig::default();
        config.portal.source_dir = assets.path().to_path_buf();
        let assembly = crate::root_stack::synth(&config).unwrap();

        let out = tempfile::tempdir().unwrap();
        let written = assembly.write_to(&out.path().join("nested")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("DeployUiWithCdkStack.template.json"));
        assert!(written[1].ends_with("DeployUiWithCdkStack.assets.json"));

        let manifest: AssetManifest = serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(manifest, assembly.assets);
        assert_eq!(manifest.artifacts[0].keys, vec!["index.html".to_string()]);
    }
}
