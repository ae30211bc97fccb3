//! Helpers for the cloudformation intrinsic functions our modules emit.
//! Values that may be resolved only at deploy time are carried as
//! `serde_json::Value` so they can sit anywhere a literal could.

use serde_json::{json, Value};

/// `{ "Ref": logical_id }`
pub fn get_ref(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{ "Fn::GetAtt": [logical_id, attribute] }`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{ "Fn::Sub": template }`. `${Name}` placeholders are resolved by cloudformation.
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// true if the value is an intrinsic function call rather than a literal.
pub fn is_intrinsic(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if map.len() == 1 => map
            .keys()
            .next()
            .map(|k| k == "Ref" || k.starts_with("Fn::"))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_intrinsics() {
        assert_eq!(get_ref("Bucket"), json!({ "Ref": "Bucket" }));
        assert_eq!(get_att("Dist", "DomainName"), json!({ "Fn::GetAtt": ["Dist", "DomainName"] }));
        assert_eq!(sub("${AWS::Region}"), json!({ "Fn::Sub": "${AWS::Region}" }));
    }

    #[test]
    fn detects_intrinsics() {
        assert!(is_intrinsic(&get_ref("A")));
        assert!(is_intrinsic(&sub("${AWS::Region}")));
        assert!(!is_intrinsic(&json!("plain")));
        assert!(!is_intrinsic(&json!({ "Ref": "A", "Other": 1 })));
    }
}
