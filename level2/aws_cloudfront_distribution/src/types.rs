use std::fmt;
use std::str::FromStr;

use aws_cfn_stack::{CfnResource, Tag};
use serde::Serialize;
use serde_json::Value;

/// https://docs.aws.amazon.com/AmazonCloudFront/latest/DeveloperGuide/using-managed-cache-policies.html#managed-cache-caching-optimized
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ViewerProtocolPolicy {
    #[serde(rename = "allow-all")]
    AllowAll,
    #[default]
    #[serde(rename = "redirect-to-https")]
    RedirectToHttps,
    #[serde(rename = "https-only")]
    HttpsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PriceClass {
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
    #[serde(rename = "PriceClass_200")]
    PriceClass200,
    #[default]
    #[serde(rename = "PriceClass_All")]
    PriceClassAll,
}

impl PriceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceClass::PriceClass100 => "PriceClass_100",
            PriceClass::PriceClass200 => "PriceClass_200",
            PriceClass::PriceClassAll => "PriceClass_All",
        }
    }
}

impl FromStr for PriceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PriceClass_100" => Ok(PriceClass::PriceClass100),
            "PriceClass_200" => Ok(PriceClass::PriceClass200),
            "PriceClass_All" => Ok(PriceClass::PriceClassAll),
            other => Err(format!(
                "unknown price class {other:?}, must be one of PriceClass_100, PriceClass_200, PriceClass_All"
            )),
        }
    }
}

impl fmt::Display for PriceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// the minimum TLS version viewers may use to connect. Ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum SecurityPolicyProtocol {
    #[serde(rename = "SSLv3")]
    SslV3,
    #[serde(rename = "TLSv1")]
    TlsV1,
    #[serde(rename = "TLSv1_2016")]
    TlsV1_2016,
    #[serde(rename = "TLSv1.1_2016")]
    TlsV1_1_2016,
    #[serde(rename = "TLSv1.2_2018")]
    TlsV1_2_2018,
    #[default]
    #[serde(rename = "TLSv1.2_2019")]
    TlsV1_2_2019,
    #[serde(rename = "TLSv1.2_2021")]
    TlsV1_2_2021,
}

impl SecurityPolicyProtocol {
    const ALL: [SecurityPolicyProtocol; 7] = [
        SecurityPolicyProtocol::SslV3,
        SecurityPolicyProtocol::TlsV1,
        SecurityPolicyProtocol::TlsV1_2016,
        SecurityPolicyProtocol::TlsV1_1_2016,
        SecurityPolicyProtocol::TlsV1_2_2018,
        SecurityPolicyProtocol::TlsV1_2_2019,
        SecurityPolicyProtocol::TlsV1_2_2021,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityPolicyProtocol::SslV3 => "SSLv3",
            SecurityPolicyProtocol::TlsV1 => "TLSv1",
            SecurityPolicyProtocol::TlsV1_2016 => "TLSv1_2016",
            SecurityPolicyProtocol::TlsV1_1_2016 => "TLSv1.1_2016",
            SecurityPolicyProtocol::TlsV1_2_2018 => "TLSv1.2_2018",
            SecurityPolicyProtocol::TlsV1_2_2019 => "TLSv1.2_2019",
            SecurityPolicyProtocol::TlsV1_2_2021 => "TLSv1.2_2021",
        }
    }
}

impl FromStr for SecurityPolicyProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown TLS security policy {s:?}, must be one of {}", valid.join(", "))
            })
    }
}

impl fmt::Display for SecurityPolicyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HttpVersion {
    #[serde(rename = "http1.1")]
    Http1_1,
    #[default]
    #[serde(rename = "http2")]
    Http2,
    #[serde(rename = "http2and3")]
    Http2And3,
    #[serde(rename = "http3")]
    Http3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieForward {
    #[default]
    None,
    All,
    Whitelist,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cookies {
    pub forward: CookieForward,
}

/// the legacy cache settings. Setting these on a cache behavior means no
/// cache policy may be set on it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardedValues {
    pub query_string: bool,
    pub cookies: Cookies,
}

/// cloudformation accepts either a cache policy or forwarded values on a
/// cache behavior, never both. Flattened into the behavior, so only one of
/// `CachePolicyId`/`ForwardedValues` is ever rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CacheMode {
    #[serde(rename = "CachePolicyId")]
    ManagedPolicy(String),
    #[serde(rename = "ForwardedValues")]
    ForwardedValues(ForwardedValues),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultCacheBehavior {
    pub target_origin_id: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub compress: bool,
    #[serde(flatten)]
    pub cache: Option<CacheMode>,
    #[serde(skip)]
    pub(crate) override_applied: bool,
}

impl DefaultCacheBehavior {
    pub fn new(target_origin_id: &str, viewer_protocol_policy: ViewerProtocolPolicy) -> Self {
        Self {
            target_origin_id: target_origin_id.to_string(),
            viewer_protocol_policy,
            compress: true,
            cache: Some(CacheMode::ManagedPolicy(CACHING_OPTIMIZED_POLICY_ID.to_string())),
            override_applied: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomErrorResponse {
    #[serde(rename = "ErrorCode")]
    pub error_code: u16,
    #[serde(rename = "ResponseCode", skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    #[serde(rename = "ResponsePagePath", skip_serializing_if = "Option::is_none")]
    pub response_page_path: Option<String>,
    #[serde(rename = "ErrorCachingMinTTL", skip_serializing_if = "Option::is_none")]
    pub error_caching_min_ttl: Option<u64>,
}

impl CustomErrorResponse {
    /// answer `error_code` with `page` and a 200, which lets a single page app
    /// route paths the origin does not know about.
    pub fn serve_page(error_code: u16, page: &str) -> Self {
        Self {
            error_code,
            response_code: Some(200),
            response_page_path: Some(page.to_string()),
            error_caching_min_ttl: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Logging {
    /// the domain name of the log bucket, eg: `GetAtt Bucket.DomainName`
    pub bucket: Value,
    pub include_cookies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerCertificate {
    #[serde(rename = "CloudFrontDefaultCertificate", skip_serializing_if = "Option::is_none")]
    pub cloudfront_default_certificate: Option<bool>,
    #[serde(rename = "AcmCertificateArn", skip_serializing_if = "Option::is_none")]
    pub acm_certificate_arn: Option<String>,
    #[serde(rename = "SslSupportMethod", skip_serializing_if = "Option::is_none")]
    pub ssl_support_method: Option<String>,
    #[serde(rename = "MinimumProtocolVersion")]
    pub minimum_protocol_version: SecurityPolicyProtocol,
}

impl ViewerCertificate {
    pub fn cloudfront_default(minimum_protocol_version: SecurityPolicyProtocol) -> Self {
        Self {
            cloudfront_default_certificate: Some(true),
            acm_certificate_arn: None,
            ssl_support_method: None,
            minimum_protocol_version,
        }
    }

    pub fn acm(arn: &str, minimum_protocol_version: SecurityPolicyProtocol) -> Self {
        Self {
            cloudfront_default_certificate: None,
            acm_certificate_arn: Some(arn.to_string()),
            ssl_support_method: Some("sni-only".to_string()),
            minimum_protocol_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3OriginConfig {
    /// must be empty when the origin uses an origin access control.
    pub origin_access_identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Origin {
    pub id: String,
    pub domain_name: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_access_control_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_origin_config: Option<S3OriginConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionConfig {
    #[serde(rename = "Aliases", skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<Value>,
    #[serde(rename = "CustomErrorResponses", skip_serializing_if = "Vec::is_empty")]
    pub custom_error_responses: Vec<CustomErrorResponse>,
    #[serde(rename = "DefaultCacheBehavior")]
    pub default_cache_behavior: DefaultCacheBehavior,
    #[serde(rename = "DefaultRootObject", skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,
    #[serde(rename = "Enabled")]
    pub enabled: bool,
    #[serde(rename = "HttpVersion")]
    pub http_version: HttpVersion,
    #[serde(rename = "IPV6Enabled")]
    pub ipv6_enabled: bool,
    #[serde(rename = "Logging", skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,
    #[serde(rename = "Origins")]
    pub origins: Vec<Origin>,
    #[serde(rename = "PriceClass")]
    pub price_class: PriceClass,
    #[serde(rename = "ViewerCertificate")]
    pub viewer_certificate: ViewerCertificate,
}

/// `AWS::CloudFront::Distribution`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnDistribution {
    pub distribution_config: DistributionConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl CfnResource for CfnDistribution {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn properties(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn validate(&self) -> Result<(), String> {
        let config = &self.distribution_config;
        if config.origins.is_empty() {
            return Err("distribution must have at least one origin".into());
        }
        let target = &config.default_cache_behavior.target_origin_id;
        if !config.origins.iter().any(|o| &o.id == target) {
            return Err(format!("default cache behavior targets unknown origin {target:?}"));
        }
        if config.default_cache_behavior.cache.is_none() {
            return Err("default cache behavior must set either a cache policy or forwarded values".into());
        }
        for (i, response) in config.custom_error_responses.iter().enumerate() {
            if config.custom_error_responses[..i].iter().any(|r| r.error_code == response.error_code) {
                return Err(format!("duplicate custom error response for {}", response.error_code));
            }
            if let Some(path) = &response.response_page_path {
                if !path.starts_with('/') {
                    return Err(format!("custom error response page {path:?} must start with '/'"));
                }
                if response.response_code.is_none() {
                    return Err(format!("custom error response page {path:?} requires a response code"));
                }
            }
        }
        if let Some(Value::String(comment)) = &config.comment {
            if comment.len() > 128 {
                return Err("distribution comment cannot be longer than 128 characters".into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginAccessControlConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub origin_access_control_origin_type: String,
    pub signing_behavior: String,
    pub signing_protocol: String,
}

/// `AWS::CloudFront::OriginAccessControl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnOriginAccessControl {
    pub origin_access_control_config: OriginAccessControlConfig,
}

impl CfnOriginAccessControl {
    /// sign every request to an s3 origin with sigv4.
    pub fn s3_always_sign(name: &str) -> Self {
        let mut name = name.to_string();
        name.truncate(64);
        Self {
            origin_access_control_config: OriginAccessControlConfig {
                name,
                description: None,
                origin_access_control_origin_type: "s3".to_string(),
                signing_behavior: "always".to_string(),
                signing_protocol: "sigv4".to_string(),
            },
        }
    }
}

impl CfnResource for CfnOriginAccessControl {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::OriginAccessControl"
    }

    fn properties(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn validate(&self) -> Result<(), String> {
        let name = &self.origin_access_control_config.name;
        if name.is_empty() || name.len() > 64 {
            return Err(format!("origin access control name {name:?} must be between 1 and 64 characters"));
        }
        Ok(())
    }
}
