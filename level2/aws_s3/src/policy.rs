use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sid: Option<String>,
    pub effect: Effect,
    pub principal: Value,
    pub action: Vec<String>,
    pub resource: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub condition: Option<Value>,
}

impl PolicyStatement {
    /// allow `service` (eg: `cloudfront.amazonaws.com`) to perform `actions`.
    pub fn allow_service(service: &str, actions: &[&str], resource: Vec<Value>) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: serde_json::json!({ "Service": service }),
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self { version: POLICY_VERSION.to_string(), statement }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_grant_renders() {
        let statement = PolicyStatement::allow_service("cloudfront.amazonaws.com", &["s3:GetObject"], vec![json!("arn")])
            .with_condition(json!({ "StringEquals": { "AWS:SourceArn": "dist" } }));
        let doc = serde_json::to_value(PolicyDocument::new(vec![statement])).unwrap();
        assert_eq!(
            doc,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "cloudfront.amazonaws.com" },
                    "Action": ["s3:GetObject"],
                    "Resource": ["arn"],
                    "Condition": { "StringEquals": { "AWS:SourceArn": "dist" } },
                }],
            })
        );
    }
}
