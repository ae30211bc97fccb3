// Configuration validation
//
// Validates that values are usable before anything is synthesized

use anyhow::{bail, Context, Result};
use aws_cloudfront_distribution::{PriceClass, SecurityPolicyProtocol};
use portal_lib::level0::{validate_construct_id, verify_logical_id};
use tracing::warn;

use super::{CustomDomainConfig, PortalConfig, PortalSettings, StackSettings};

pub fn validate_config(config: &PortalConfig) -> Result<()> {
    validate_stack_settings(&config.stack)?;
    validate_portal_settings(&config.portal)?;
    Ok(())
}

fn validate_stack_settings(config: &StackSettings) -> Result<()> {
    aws_cfn_stack::validate_stack_name("", &config.name).context("stack.name is invalid")?;

    if let Some(account) = &config.account {
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            bail!("stack.account must be a 12 digit AWS account id, got {account:?}");
        }
    }
    if let Some(region) = &config.region {
        let looks_like_region = region.split('-').count() >= 3
            && region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !looks_like_region {
            bail!("stack.region {region:?} is not a valid AWS region code");
        }
    }
    for (key, value) in config.tags.iter() {
        if key.is_empty() || key.len() > 128 {
            bail!("stack.tags key {key:?} must be between 1 and 128 characters");
        }
        if value.len() > 256 {
            bail!("stack.tags value for {key:?} cannot be longer than 256 characters");
        }
        if key.starts_with("aws:") {
            bail!("stack.tags key {key:?} uses the reserved aws: prefix");
        }
    }
    Ok(())
}

fn validate_portal_settings(config: &PortalSettings) -> Result<()> {
    validate_construct_id(&config.construct_id).context("portal.construct_id is invalid")?;

    if config.source_dir.as_os_str().is_empty() {
        bail!("portal.source_dir must not be empty");
    }
    if !config.error_document.starts_with('/') {
        bail!("portal.error_document must start with '/', got {:?}", config.error_document);
    }
    config
        .price_class
        .parse::<PriceClass>()
        .map_err(anyhow::Error::msg)
        .context("portal.price_class is invalid")?;
    let tls = config
        .min_tls_version
        .parse::<SecurityPolicyProtocol>()
        .map_err(anyhow::Error::msg)
        .context("portal.min_tls_version is invalid")?;
    if tls < SecurityPolicyProtocol::TlsV1_2_2018 {
        warn!(min_tls_version = %tls, "portal.min_tls_version allows TLS versions older than 1.2");
    }
    verify_logical_id(&config.console_url_output).context("portal.console_url_output is invalid")?;

    if let Some(domain) = &config.custom_domain {
        validate_custom_domain(domain)?;
    }
    if !config.enable_logging {
        tracing::debug!("distribution access logging is disabled");
    }
    Ok(())
}

fn validate_custom_domain(domain: &CustomDomainConfig) -> Result<()> {
    let settings = aws_cloudfront_distribution::CustomDomainSettings {
        aliases: domain.aliases.clone(),
        acm_certificate_arn: domain.certificate_arn.clone(),
    };
    settings
        .validate()
        .map_err(anyhow::Error::msg)
        .context("portal.custom_domain is invalid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_portal(f: impl FnOnce(&mut PortalSettings)) -> Result<()> {
        let mut config = PortalConfig::default();
        f(&mut config.portal);
        validate_config(&config)
    }

    #[test]
    fn rejects_bad_portal_values() {
        assert!(with_portal(|p| p.error_document = "index.html".into()).is_err());
        assert!(with_portal(|p| p.price_class = "PriceClass_300".into()).is_err());
        assert!(with_portal(|p| p.min_tls_version = "TLSv9".into()).is_err());
        assert!(with_portal(|p| p.source_dir = "".into()).is_err());
        assert!(with_portal(|p| p.console_url_output = "console-url".into()).is_err());
        assert!(with_portal(|p| p.construct_id = "a/b".into()).is_err());
        assert!(with_portal(|p| p.min_tls_version = "TLSv1".into()).is_ok());
    }

    #[test]
    fn rejects_bad_stack_values() {
        let mut config = PortalConfig::default();
        config.stack.name = "1-stack".into();
        assert!(validate_config(&config).is_err());

        let mut config = PortalConfig::default();
        config.stack.account = Some("1234".into());
        assert!(validate_config(&config).is_err());

        let mut config = PortalConfig::default();
        config.stack.region = Some("Moon".into());
        assert!(validate_config(&config).is_err());

        let mut config = PortalConfig::default();
        config.stack.tags.insert("aws:cloudformation".into(), "x".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn custom_domain_must_be_usable() {
        let domain = CustomDomainConfig {
            aliases: vec!["console.example.com".into()],
            certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc".into(),
        };
        assert!(with_portal(|p| p.custom_domain = Some(domain.clone())).is_ok());
        let no_aliases = CustomDomainConfig { aliases: vec![], ..domain };
        assert!(with_portal(|p| p.custom_domain = Some(no_aliases)).is_err());
    }
}
