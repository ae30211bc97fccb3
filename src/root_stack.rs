use std::collections::BTreeMap;

use aws_s3_deployment::AssetManifest;
use portal_lib::{L0Core, SynthError};

use crate::assembly::CloudAssembly;
use crate::config::{PortalConfig, StackSettings};
use crate::portal::Portal;

/// stack level properties. These are passed through unchanged, the stack
/// itself does not interpret them beyond validating the name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackProps {
    pub stack_name: String,
    pub account: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl From<&StackSettings> for StackProps {
    fn from(settings: &StackSettings) -> Self {
        Self {
            stack_name: settings.name.clone(),
            account: settings.account.clone(),
            region: settings.region.clone(),
            description: settings.description.clone(),
            tags: settings.tags.clone(),
        }
    }
}

/// synthesize the whole stack: a single portal construct under
/// `config.portal.construct_id`, and nothing else.
pub fn synth(config: &PortalConfig) -> Result<CloudAssembly, SynthError> {
    let props = StackProps::from(&config.stack);
    let mut core = L0Core::new();
    let mut stackinp = aws_cfn_stack::Input {
        stack_name: props.stack_name.clone(),
        description: props.description.clone(),
        tags: props.tags.clone(),
        ..Default::default()
    };

    let portal = core.scoped(&config.portal.construct_id, |core| {
        Portal::new(&config.portal, &mut stackinp, core)
    })?;
    let stack = aws_cfn_stack::config(&stackinp, &config.portal.construct_id)?;

    Ok(CloudAssembly {
        stack,
        assets: AssetManifest::new(vec![portal.artifact]),
        props,
        warnings: core.warnings().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_name_must_be_valid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "hi").unwrap();
        let mut config = PortalConfig::default();
        config.portal.source_dir = dir.path().to_path_buf();
        config.stack.name = "bad_name".into();
        let err = synth(&config).unwrap_err();
        assert!(matches!(err, SynthError::InvalidStackName { .. }));
    }

    #[test]
    fn props_are_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "hi").unwrap();
        let mut config = PortalConfig::default();
        config.portal.source_dir = dir.path().to_path_buf();
        config.stack.account = Some("123456789012".into());
        config.stack.region = Some("us-west-2".into());
        config.stack.description = Some("web console".into());
        config.stack.tags.insert("team".into(), "photos".into());

        let assembly = synth(&config).unwrap();
        assert_eq!(assembly.props.account.as_deref(), Some("123456789012"));
        assert_eq!(assembly.props.region.as_deref(), Some("us-west-2"));
        assert_eq!(assembly.stack.stack_name, "DeployUiWithCdkStack");
        assert_eq!(assembly.stack.template.description.as_deref(), Some("web console"));
        for (_, bucket) in assembly.stack.template.resources_of_type("AWS::S3::Bucket") {
            assert_eq!(bucket.properties["Tags"][0]["Key"], "team");
            assert_eq!(bucket.properties["Tags"][0]["Value"], "photos");
        }
        for (_, distribution) in assembly.stack.template.resources_of_type("AWS::CloudFront::Distribution") {
            assert_eq!(distribution.properties["Tags"], serde_json::json!([{ "Key": "team", "Value": "photos" }]));
        }
    }
}
