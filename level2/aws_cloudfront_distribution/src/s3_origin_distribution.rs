use aws_cfn_stack::Resource;
use aws_s3::{Bucket, ObjectOwnership, PolicyStatement};
use portal_lib::{L0Core, SynthError};
use serde_json::{json, Value};

use crate::*;

/// a higher level construct for serving a private S3 bucket through
/// cloudfront. The bucket is read through an origin access control, and the
/// bucket only grants `s3:GetObject` to this one distribution.
#[derive(Debug, Clone)]
pub struct Input {
    /// the object served for `/`.
    pub default_root_object: String,
    /// served with a 200 whenever the bucket answers 403, which is what a
    /// private bucket returns for keys that do not exist.
    pub error_document: String,
    pub comment: Option<Value>,
    pub price_class: PriceClass,
    pub min_tls_version: SecurityPolicyProtocol,
    /// if enabled, a separate log bucket is created and the distribution
    /// writes standard logs into it.
    pub enable_logging: bool,
    pub log_prefix: Option<String>,
    pub custom_domain_settings: Option<CustomDomainSettings>,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            default_root_object: "index.html".to_string(),
            error_document: "/index.html".to_string(),
            comment: None,
            price_class: PriceClass::PriceClassAll,
            min_tls_version: SecurityPolicyProtocol::TlsV1_2_2019,
            enable_logging: false,
            log_prefix: None,
            custom_domain_settings: None,
        }
    }
}

#[derive(Debug)]
pub struct S3OriginDistribution {
    pub distribution: DistributionHandle,
    pub origin_access_control: String,
    /// logical id of the log bucket, if logging is enabled.
    pub log_bucket: Option<String>,
}

pub fn config(
    inp: &Input,
    bucket: &mut Bucket,
    stackinp: &mut aws_cfn_stack::Input,
    l0core: &mut L0Core,
) -> Result<S3OriginDistribution, SynthError> {
    let logging = if inp.enable_logging {
        let log_bucket = l0core.scoped("LoggingBucket", |core| {
            let log_input = aws_s3::Input {
                object_ownership: Some(ObjectOwnership::BucketOwnerPreferred),
                ..Default::default()
            };
            aws_s3::config(&log_input, stackinp, core)
        })?;
        let logging = Logging {
            bucket: log_bucket.domain_name(),
            include_cookies: false,
            prefix: inp.log_prefix.clone(),
        };
        let log_bucket_id = log_bucket.logical_id().to_string();
        log_bucket.emit_policy(stackinp)?;
        Some((log_bucket_id, logging))
    } else {
        None
    };

    let oac_logical_id = l0core.allocate_logical_id("OriginAccessControl")?;
    let oac = CfnOriginAccessControl::s3_always_sign(&oac_logical_id);
    stackinp.add_resource(Resource::new(oac_logical_id.clone(), oac));

    let distr_input = crate::Input {
        default_origin: Some(Origin {
            id: DEFAULT_ORIGIN_ID.to_string(),
            domain_name: bucket.regional_domain_name(),
            origin_access_control_id: Some(portal_lib::intrinsics::get_att(&oac_logical_id, "Id")),
            s3_origin_config: Some(S3OriginConfig { origin_access_identity: String::new() }),
        }),
        comment: inp.comment.clone(),
        default_root_object: Some(inp.default_root_object.clone()),
        price_class: inp.price_class,
        min_tls_version: inp.min_tls_version,
        ipv6_enabled: false,
        custom_error_responses: vec![CustomErrorResponse::serve_page(403, &inp.error_document)],
        logging: logging.as_ref().map(|(_, logging)| logging.clone()),
        custom_domain_settings: inp.custom_domain_settings.clone(),
        ..Default::default()
    };
    let distribution = l0core.scoped("CloudFrontDistribution", |core| crate::config(&distr_input, stackinp, core))?;

    let grant = PolicyStatement::allow_service("cloudfront.amazonaws.com", &["s3:GetObject"], vec![bucket.objects_arn()])
        .with_condition(json!({ "StringEquals": { "AWS:SourceArn": distribution.arn() } }));
    bucket.add_to_resource_policy(grant);

    tracing::debug!(
        distribution = %distribution.logical_id(),
        bucket = %bucket.logical_id(),
        "created s3 origin distribution"
    );
    Ok(S3OriginDistribution {
        distribution,
        origin_access_control: oac_logical_id,
        log_bucket: logging.map(|(id, _)| id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(inp: &Input) -> (serde_json::Value, S3OriginDistribution, String) {
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let mut bucket = core
            .scoped("Bucket", |core| aws_s3::config(&aws_s3::Input::default(), &mut stackinp, core))
            .unwrap();
        let out = config(inp, &mut bucket, &mut stackinp, &mut core).unwrap();
        let bucket_id = bucket.logical_id().to_string();
        bucket.emit_policy(&mut stackinp).unwrap();
        let stack = aws_cfn_stack::config(&stackinp, "site").unwrap();
        (serde_json::to_value(&stack.template).unwrap(), out, bucket_id)
    }

    #[test]
    fn bucket_is_reached_through_origin_access_control() {
        let (template, out, bucket_id) = synth(&Input::default());
        let config = &template["Resources"][out.distribution.logical_id()]["Properties"]["DistributionConfig"];
        let origin = &config["Origins"][0];
        assert_eq!(origin["DomainName"], json!({ "Fn::GetAtt": [bucket_id, "RegionalDomainName"] }));
        assert_eq!(origin["OriginAccessControlId"], json!({ "Fn::GetAtt": [out.origin_access_control.clone(), "Id"] }));
        assert_eq!(origin["S3OriginConfig"]["OriginAccessIdentity"], "");
        assert_eq!(config["DefaultRootObject"], "index.html");
        assert_eq!(
            config["CustomErrorResponses"],
            json!([{ "ErrorCode": 403, "ResponseCode": 200, "ResponsePagePath": "/index.html" }])
        );
        assert!(config.get("Logging").is_none());

        let oac = &template["Resources"][&out.origin_access_control]["Properties"]["OriginAccessControlConfig"];
        assert_eq!(oac["OriginAccessControlOriginType"], "s3");
        assert_eq!(oac["SigningBehavior"], "always");
        assert_eq!(oac["SigningProtocol"], "sigv4");
    }

    #[test]
    fn bucket_grants_read_to_this_distribution_only() {
        let (template, out, _) = synth(&Input::default());
        let (_, policy) = template["Resources"]
            .as_object()
            .unwrap()
            .iter()
            .find(|(_, r)| r["Type"] == "AWS::S3::BucketPolicy")
            .unwrap();
        let statements = policy["Properties"]["PolicyDocument"]["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);
        let grant = &statements[1];
        assert_eq!(grant["Effect"], "Allow");
        assert_eq!(grant["Action"], json!(["s3:GetObject"]));
        assert_eq!(grant["Principal"], json!({ "Service": "cloudfront.amazonaws.com" }));
        assert_eq!(grant["Condition"]["StringEquals"]["AWS:SourceArn"], out.distribution.arn());
    }

    #[test]
    fn logging_creates_a_log_bucket() {
        let inp = Input { enable_logging: true, ..Default::default() };
        let (template, out, _) = synth(&inp);
        let log_bucket = out.log_bucket.unwrap();
        let log_props = &template["Resources"][&log_bucket]["Properties"];
        assert_eq!(log_props["OwnershipControls"]["Rules"][0]["ObjectOwnership"], "BucketOwnerPreferred");
        assert_eq!(log_props["AccessControl"], "Private");
        let logging = &template["Resources"][out.distribution.logical_id()]["Properties"]["DistributionConfig"]["Logging"];
        assert_eq!(logging["Bucket"], json!({ "Fn::GetAtt": [log_bucket, "DomainName"] }));
        assert_eq!(logging["IncludeCookies"], false);
    }
}
