use aws_cfn_stack::Output;
use aws_cloudfront_distribution::s3_origin_distribution;
use aws_cloudfront_distribution::{
    apply_cache_behavior_override, CacheBehaviorOverride, CustomDomainSettings, DistributionHandle, PriceClass,
    SecurityPolicyProtocol,
};
use aws_s3_deployment::DeploymentArtifact;
use portal_lib::intrinsics::sub;
use portal_lib::{L0Core, SynthError};
use serde_json::Value;

use crate::config::PortalSettings;

/// logical ids of the outputs every portal publishes.
pub mod outputs {
    pub const PORTAL_URL: &str = "portalUrl";
    pub const DISTRIBUTION_ID: &str = "cloudFrontDistributionId";
    pub const BUCKET_NAME: &str = "portalBucketName";
}

pub const CONSOLE_URL_DESCRIPTION: &str = "Magic Photo Web Console URL (front-end)";

/// A private encrypted bucket, served through cloudfront, filled with the
/// built web console assets.
#[derive(Debug)]
pub struct Portal {
    pub bucket_logical_id: String,
    pub distribution: DistributionHandle,
    /// the distribution domain name, resolved at deploy time.
    pub portal_url: Value,
    pub cloudfront_distribution_id: Value,
    pub artifact: DeploymentArtifact,
    pub console_url_output: String,
}

fn invalid_config(field: &str) -> impl FnOnce(String) -> SynthError + '_ {
    move |reason| SynthError::InvalidConfig(format!("portal.{field}: {reason}"))
}

impl Portal {
    /// define the portal in the current scope of `core`. The order below
    /// matters: the cache override can only patch a distribution that exists.
    pub fn new(
        settings: &PortalSettings,
        stackinp: &mut aws_cfn_stack::Input,
        core: &mut L0Core,
    ) -> Result<Self, SynthError> {
        let price_class: PriceClass = settings.price_class.parse().map_err(invalid_config("price_class"))?;
        let min_tls_version: SecurityPolicyProtocol =
            settings.min_tls_version.parse().map_err(invalid_config("min_tls_version"))?;
        let distr_input = s3_origin_distribution::Input {
            error_document: settings.error_document.clone(),
            comment: Some(sub("${AWS::StackName} - Web Console Distribution (${AWS::Region})")),
            price_class,
            min_tls_version,
            enable_logging: settings.enable_logging,
            custom_domain_settings: settings.custom_domain.as_ref().map(|d| CustomDomainSettings {
                aliases: d.aliases.clone(),
                acm_certificate_arn: d.certificate_arn.clone(),
            }),
            ..Default::default()
        };

        // 1. + 2. the bucket and the distribution in front of it
        let (bucket_logical_id, bucket_name, distribution) = core.scoped("UI", |core| {
            let mut bucket = core.scoped("S3Bucket", |core| aws_s3::config(&aws_s3::Input::default(), stackinp, core))?;
            let cdn = s3_origin_distribution::config(&distr_input, &mut bucket, stackinp, core)?;
            let bucket_logical_id = bucket.logical_id().to_string();
            let bucket_name = bucket.bucket_name();
            bucket.emit_policy(stackinp)?;
            Ok((bucket_logical_id, bucket_name, cdn.distribution))
        })?;

        // 3.
        apply_cache_behavior_override(
            stackinp,
            distribution.logical_id(),
            &CacheBehaviorOverride::no_cookies_no_query_string(),
        )?;

        // 4.
        let portal_url = distribution.domain_name();
        let cloudfront_distribution_id = distribution.distribution_id();

        // 5.
        let deployment = aws_s3_deployment::Input {
            source_dir: settings.source_dir.clone(),
            destination_bucket_logical_id: bucket_logical_id.clone(),
            destination_bucket_output: outputs::BUCKET_NAME.to_string(),
            prune: false,
        };
        let artifact = core.scoped("DeployWebAssets", |core| aws_s3_deployment::config(&deployment, core))?;

        // 6.
        let fixed_outputs = [
            (outputs::PORTAL_URL, "Domain name of the web console distribution", portal_url.clone()),
            (outputs::DISTRIBUTION_ID, "Id of the web console distribution", cloudfront_distribution_id.clone()),
            (outputs::BUCKET_NAME, "Bucket holding the web console assets", bucket_name),
        ];
        for (id, description, value) in fixed_outputs {
            let mut output = Output::new(core, id, description, value)?;
            output.override_logical_id(core, id)?;
            stackinp.add_output(output);
        }
        let mut console_url = Output::new(core, "MagicPhotoWebConsoleUrl", CONSOLE_URL_DESCRIPTION, portal_url.clone())?;
        console_url.override_logical_id(core, &settings.console_url_output)?;
        stackinp.add_output(console_url);

        tracing::debug!(scope = %core.path(), distribution = %distribution.logical_id(), "defined portal");
        Ok(Self {
            bucket_logical_id,
            distribution,
            portal_url,
            cloudfront_distribution_id,
            artifact,
            console_url_output: settings.console_url_output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &std::path::Path) -> PortalSettings {
        PortalSettings { source_dir: dir.to_path_buf(), ..Default::default() }
    }

    #[test]
    fn portal_attributes_are_distribution_intrinsics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let portal = core
            .scoped("MagicPhotoWebUI", |core| Portal::new(&settings(dir.path()), &mut stackinp, core))
            .unwrap();
        assert_eq!(portal.portal_url, portal.distribution.domain_name());
        assert_eq!(portal.cloudfront_distribution_id, portal.distribution.distribution_id());
        assert_eq!(portal.artifact.destination_bucket_logical_id, portal.bucket_logical_id);
        assert!(!portal.artifact.prune);
        assert!(portal.bucket_logical_id.starts_with("MagicPhotoWebUIUIS3BucketResource"));
    }

    #[test]
    fn bad_price_class_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let mut settings = settings(dir.path());
        settings.price_class = "PriceClass_1".into();
        let err = Portal::new(&settings, &mut stackinp, &mut core).unwrap_err();
        assert!(matches!(err, SynthError::InvalidConfig(_)));
        assert!(stackinp.resources.is_empty());
    }

    #[test]
    fn missing_assets_fail_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let err = Portal::new(&settings(&dir.path().join("missing")), &mut stackinp, &mut core).unwrap_err();
        assert!(matches!(err, SynthError::MissingAssets { .. }));
    }
}
