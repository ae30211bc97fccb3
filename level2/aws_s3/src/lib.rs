//! this is a higher level module for creating S3 buckets that are only ever
//! reachable through something else in the stack. Every bucket it creates:
//! - is private and has every public access block turned on
//! - is encrypted with S3 managed keys
//! - is kept when the stack is deleted
//! - denies any request not made over TLS
//!
//! No cleanup resource is created, so a non-empty bucket outlives its stack.

use aws_cfn_stack::{tags_from, CfnResource, Resource};
use portal_lib::intrinsics::{get_att, get_ref, sub};
use portal_lib::{L0Core, SynthError};
use serde_json::Value;

pub mod policy;
mod types;

pub use policy::*;
pub use types::*;

#[derive(Debug, Clone, Default)]
pub struct Input {
    /// leave empty to let cloudformation generate the bucket name
    /// from the logical id.
    pub bucket_name: Option<String>,
    /// only needed when another service writes objects into this bucket,
    /// eg: cloudfront standard logs require `BucketOwnerPreferred`.
    pub object_ownership: Option<ObjectOwnership>,
}

/// a bucket that was added to a stack. Its resource policy is assembled here
/// and only written into the stack by `emit_policy`, so that modules created
/// after the bucket can still grant themselves access.
#[derive(Debug)]
pub struct Bucket {
    logical_id: String,
    policy_logical_id: String,
    statements: Vec<PolicyStatement>,
}

impl Bucket {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Ref` of a bucket resolves to its physical name.
    pub fn bucket_name(&self) -> Value {
        get_ref(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        get_att(&self.logical_id, "Arn")
    }

    /// the arn matching every object in the bucket.
    pub fn objects_arn(&self) -> Value {
        sub(&format!("${{{}.Arn}}/*", self.logical_id))
    }

    pub fn regional_domain_name(&self) -> Value {
        get_att(&self.logical_id, "RegionalDomainName")
    }

    pub fn domain_name(&self) -> Value {
        get_att(&self.logical_id, "DomainName")
    }

    pub fn add_to_resource_policy(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    /// write the bucket policy with every statement added so far.
    /// returns the logical id of the policy resource.
    pub fn emit_policy(self, stackinp: &mut aws_cfn_stack::Input) -> Result<String, SynthError> {
        let policy = CfnBucketPolicy {
            bucket: get_ref(&self.logical_id),
            policy_document: PolicyDocument::new(self.statements),
        };
        stackinp.add_resource(Resource::new(self.policy_logical_id.clone(), policy));
        Ok(self.policy_logical_id)
    }
}

pub fn validate_bucket_name(bucket_name: &str) -> Result<(), String> {
    if bucket_name.len() > 63 || bucket_name.len() < 3 {
        return Err(format!("Invalid bucket name {bucket_name:?}\nMust be between 3 and 63 characters"));
    }
    let valid_char_check = |c: char| -> bool { c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' };
    if !bucket_name.chars().all(valid_char_check) {
        return Err(format!(
            "Invalid bucket name {bucket_name:?}\nMay only contain lowercase letters, numbers, dots, and dashes"
        ));
    }
    let first_ok = bucket_name.chars().next().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
    let last_ok = bucket_name.chars().last().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
    if !first_ok || !last_ok {
        return Err(format!(
            "Invalid bucket name {bucket_name:?}\nFirst and last character must be either lowercase letter, or number"
        ));
    }
    if bucket_name.contains("..") {
        return Err(format!("Invalid bucket name {bucket_name:?}\nMay not contain two consecutive dots"));
    }
    Ok(())
}

/// deny every request that was not sent over https.
pub fn tls_only_statement(bucket_arn: Value, objects_arn: Value) -> PolicyStatement {
    PolicyStatement {
        sid: None,
        effect: Effect::Deny,
        principal: serde_json::json!({ "AWS": "*" }),
        action: vec!["s3:*".to_string()],
        resource: vec![bucket_arn, objects_arn],
        condition: Some(serde_json::json!({ "Bool": { "aws:SecureTransport": "false" } })),
    }
}

/// add a bucket to the stack in the current scope. Call this from within
/// `L0Core::scoped` so the bucket gets a logical id derived from its construct.
pub fn config(myinput: &Input, stackinp: &mut aws_cfn_stack::Input, l0core: &mut L0Core) -> Result<Bucket, SynthError> {
    let logical_bucket_name = l0core.allocate_logical_id("Resource")?;
    let policy_logical_id = l0core.allocate_logical_id("Policy")?;

    let bucket = CfnBucket {
        bucket_name: myinput.bucket_name.clone(),
        ownership_controls: myinput.object_ownership.map(OwnershipControls::single),
        tags: tags_from(&stackinp.tags),
        ..CfnBucket::private_encrypted()
    };
    if let Err(reason) = bucket.validate() {
        return Err(SynthError::InvalidResource { resource: logical_bucket_name, reason });
    }
    stackinp.add_resource(Resource::new(logical_bucket_name.clone(), bucket).retain());

    let mut handle = Bucket {
        logical_id: logical_bucket_name,
        policy_logical_id,
        statements: vec![],
    };
    let statement = tls_only_statement(handle.arn(), handle.objects_arn());
    handle.add_to_resource_policy(statement);
    tracing::debug!(logical_id = %handle.logical_id, scope = %l0core.path(), "created bucket");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn synth(myinput: Input, tags: &[(&str, &str)]) -> (Value, String) {
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        for (k, v) in tags {
            stackinp.tags.insert(k.to_string(), v.to_string());
        }
        let bucket = core
            .scoped("Site", |core| config(&myinput, &mut stackinp, core))
            .unwrap();
        let id = bucket.logical_id().to_string();
        bucket.emit_policy(&mut stackinp).unwrap();
        let stack = aws_cfn_stack::config(&stackinp, "test").unwrap();
        (serde_json::to_value(&stack.template).unwrap(), id)
    }

    #[test]
    fn bucket_is_private_encrypted_and_retained() {
        let (template, id) = synth(Input::default(), &[]);
        let bucket = &template["Resources"][&id];
        assert_eq!(bucket["Type"], "AWS::S3::Bucket");
        assert_eq!(bucket["DeletionPolicy"], "Retain");
        assert_eq!(bucket["UpdateReplacePolicy"], "Retain");
        let props = &bucket["Properties"];
        assert_eq!(props["AccessControl"], "Private");
        assert_eq!(
            props["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]["ServerSideEncryptionByDefault"]
                ["SSEAlgorithm"],
            "AES256"
        );
        assert_eq!(
            props["PublicAccessBlockConfiguration"],
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            })
        );
        assert!(props.get("VersioningConfiguration").is_none());
        assert!(props.get("BucketName").is_none());
        assert!(props.get("Tags").is_none());
    }

    #[test]
    fn policy_denies_insecure_transport() {
        let (template, id) = synth(Input::default(), &[]);
        let (_, policy) = template["Resources"]
            .as_object()
            .unwrap()
            .iter()
            .find(|(_, r)| r["Type"] == "AWS::S3::BucketPolicy")
            .unwrap();
        assert_eq!(policy["Properties"]["Bucket"], json!({ "Ref": id }));
        let statement = &policy["Properties"]["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Effect"], "Deny");
        assert_eq!(statement["Condition"]["Bool"]["aws:SecureTransport"], "false");
        assert_eq!(statement["Resource"][1], json!({ "Fn::Sub": format!("${{{id}.Arn}}/*") }));
    }

    #[test]
    fn tags_and_ownership_are_forwarded() {
        let input = Input {
            object_ownership: Some(ObjectOwnership::BucketOwnerPreferred),
            ..Default::default()
        };
        let (template, id) = synth(input, &[("project", "photo")]);
        let props = &template["Resources"][&id]["Properties"];
        assert_eq!(props["Tags"], json!([{ "Key": "project", "Value": "photo" }]));
        assert_eq!(props["OwnershipControls"]["Rules"][0]["ObjectOwnership"], "BucketOwnerPreferred");
    }

    #[test]
    fn bucket_attributes_are_intrinsics() {
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let bucket = core
            .scoped("Site", |core| config(&Input::default(), &mut stackinp, core))
            .unwrap();
        let id = bucket.logical_id().to_string();
        assert_eq!(bucket.bucket_name(), json!({ "Ref": id }));
        assert_eq!(bucket.regional_domain_name(), json!({ "Fn::GetAtt": [id, "RegionalDomainName"] }));
        assert_eq!(bucket.objects_arn(), json!({ "Fn::Sub": format!("${{{id}.Arn}}/*") }));
    }

    #[test]
    fn invalid_bucket_names_fail() {
        let mut core = L0Core::new();
        let mut stackinp = aws_cfn_stack::Input::default();
        let input = Input { bucket_name: Some("Bad_Name".into()), ..Default::default() };
        let err = config(&input, &mut stackinp, &mut core).unwrap_err();
        assert!(err.to_string().contains("lowercase"));
        assert!(stackinp.resources.is_empty());

        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("-abc").is_err());
        assert!(validate_bucket_name("a..b").is_err());
        assert!(validate_bucket_name("photo-magic.ui").is_ok());
    }

    #[test]
    fn weakened_buckets_fail_validation() {
        let mut bucket = CfnBucket::private_encrypted();
        bucket.bucket_encryption = None;
        assert!(bucket.validate().is_err());
        let mut bucket = CfnBucket::private_encrypted();
        bucket.access_control = Some(AccessControl::PublicRead);
        assert!(bucket.validate().is_err());
    }
}
