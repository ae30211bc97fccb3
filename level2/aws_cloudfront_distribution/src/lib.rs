//! cloudfront distributions. `config` creates a distribution in front of a
//! single origin, and `s3_origin_distribution` wires that origin to a private
//! bucket through an origin access control.

use aws_cfn_stack::{tags_from, CfnResource, Resource};
use portal_lib::intrinsics::{get_att, get_ref, sub};
use portal_lib::{L0Core, SynthError};
use serde_json::Value;

pub mod s3_origin_distribution;
mod types;

pub use types::*;

/// the id of the only origin of a distribution created by `config`.
pub const DEFAULT_ORIGIN_ID: &str = "origin0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDomainSettings {
    /// the domain names the distribution answers for, eg: `console.example.com`
    pub aliases: Vec<String>,
    /// must be a certificate in us-east-1 that covers every alias.
    pub acm_certificate_arn: String,
}

impl CustomDomainSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.aliases.is_empty() {
            return Err("custom domain must list at least one alias".into());
        }
        if !self.acm_certificate_arn.starts_with("arn:") || !self.acm_certificate_arn.contains(":acm:us-east-1:") {
            return Err(format!(
                "certificate {:?} must be an ACM certificate arn in us-east-1",
                self.acm_certificate_arn
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Input {
    /// By default set to redirect-to-https.
    pub viewer_protocol_policy: ViewerProtocolPolicy,

    /// the origin every request is sent to. Its id is replaced with `DEFAULT_ORIGIN_ID`.
    pub default_origin: Option<Origin>,

    pub comment: Option<Value>,
    pub default_root_object: Option<String>,
    pub price_class: PriceClass,
    pub min_tls_version: SecurityPolicyProtocol,
    pub ipv6_enabled: bool,
    pub http_version: HttpVersion,
    pub custom_error_responses: Vec<CustomErrorResponse>,
    pub logging: Option<Logging>,

    /// optionally provide settings to configure your distribution with a custom domain name + https cert
    pub custom_domain_settings: Option<CustomDomainSettings>,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            default_origin: None,
            comment: None,
            default_root_object: None,
            price_class: PriceClass::PriceClassAll,
            min_tls_version: SecurityPolicyProtocol::TlsV1_2_2019,
            ipv6_enabled: false,
            http_version: HttpVersion::Http2,
            custom_error_responses: vec![],
            logging: None,
            custom_domain_settings: None,
        }
    }
}

/// a distribution that was added to a stack. Every accessor returns an
/// intrinsic that resolves at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionHandle {
    logical_id: String,
}

impl DistributionHandle {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// eg: `d111111abcdef8.cloudfront.net`
    pub fn domain_name(&self) -> Value {
        get_att(&self.logical_id, "DomainName")
    }

    pub fn distribution_id(&self) -> Value {
        get_ref(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        sub(&format!(
            "arn:${{AWS::Partition}}:cloudfront::${{AWS::AccountId}}:distribution/${{{}}}",
            self.logical_id
        ))
    }
}

/// replaces whatever caching the default cache behavior has with legacy
/// forwarded values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheBehaviorOverride {
    pub forwarded_values: ForwardedValues,
}

impl CacheBehaviorOverride {
    /// forward neither cookies nor the query string to the origin.
    pub fn no_cookies_no_query_string() -> Self {
        Self {
            forwarded_values: ForwardedValues {
                query_string: false,
                cookies: Cookies { forward: CookieForward::None },
            },
        }
    }
}

/// patch the default cache behavior of an already created distribution.
/// the assigned cache policy is removed first and the forwarded values are
/// then set in its place, so the two never coexist. Applying an override
/// twice to the same distribution is an error.
pub fn apply_cache_behavior_override(
    stackinp: &mut aws_cfn_stack::Input,
    logical_distr_name: &str,
    ov: &CacheBehaviorOverride,
) -> Result<(), SynthError> {
    let distribution = stackinp.default_child_mut::<CfnDistribution>(logical_distr_name)?;
    let behavior = &mut distribution.distribution_config.default_cache_behavior;
    if behavior.override_applied {
        return Err(SynthError::OverrideAlreadyApplied(logical_distr_name.to_string()));
    }
    let replaced = behavior.cache.take();
    behavior.cache = Some(CacheMode::ForwardedValues(ov.forwarded_values.clone()));
    behavior.override_applied = true;
    tracing::debug!(distribution = logical_distr_name, ?replaced, "applied cache behavior override");
    Ok(())
}

/// add a distribution to the stack in the current scope.
pub fn config(
    myinput: &Input,
    stackinp: &mut aws_cfn_stack::Input,
    l0core: &mut L0Core,
) -> Result<DistributionHandle, SynthError> {
    let logical_distr_name = l0core.allocate_logical_id("Resource")?;
    let invalid = |reason: String| SynthError::InvalidResource {
        resource: logical_distr_name.clone(),
        reason,
    };

    let mut default_origin = myinput
        .default_origin
        .clone()
        .ok_or_else(|| invalid("a distribution requires a default origin".into()))?;
    default_origin.id = DEFAULT_ORIGIN_ID.to_string();

    let (aliases, viewer_certificate) = match &myinput.custom_domain_settings {
        Some(domain) => {
            domain.validate().map_err(invalid)?;
            (
                domain.aliases.clone(),
                ViewerCertificate::acm(&domain.acm_certificate_arn, myinput.min_tls_version),
            )
        }
        None => (vec![], ViewerCertificate::cloudfront_default(myinput.min_tls_version)),
    };
    if myinput.logging.is_none() {
        tracing::debug!(scope = %l0core.path(), "access logging is disabled for this distribution");
    }

    let distribution = CfnDistribution {
        distribution_config: DistributionConfig {
            aliases,
            comment: myinput.comment.clone(),
            custom_error_responses: myinput.custom_error_responses.clone(),
            default_cache_behavior: DefaultCacheBehavior::new(DEFAULT_ORIGIN_ID, myinput.viewer_protocol_policy),
            default_root_object: myinput.default_root_object.clone(),
            enabled: true,
            http_version: myinput.http_version,
            ipv6_enabled: myinput.ipv6_enabled,
            logging: myinput.logging.clone(),
            origins: vec![default_origin],
            price_class: myinput.price_class,
            viewer_certificate,
        },
        tags: tags_from(&stackinp.tags),
    };
    distribution.validate().map_err(invalid)?;

    stackinp.add_resource(Resource::new(logical_distr_name.clone(), distribution));
    Ok(DistributionHandle { logical_id: logical_distr_name })
}
