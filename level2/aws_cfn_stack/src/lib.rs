use std::any::Any;
use std::collections::BTreeMap;

use portal_lib::level0::verify_logical_id;
use portal_lib::{intrinsics, L0Core, SynthError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod deploy;
mod template;

pub use template::*;

/// lets the stack hand back a concrete resource after it was boxed,
/// which is how modules patch a resource another module created.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait CfnResource: AsAny + std::fmt::Debug {
    /// the cloudformation resource type, eg: `AWS::S3::Bucket`
    fn type_string(&self) -> &'static str;
    fn properties(&self) -> Result<Value, serde_json::Error>;
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

pub fn tags_from(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag { key: key.clone(), value: value.clone() })
        .collect()
}

#[derive(Debug)]
pub struct Resource {
    /// the logical id of this resource within the template.
    pub name: String,
    pub properties: Box<dyn CfnResource>,
    pub deletion_policy: Option<DeletionPolicy>,
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(name: impl Into<String>, properties: impl CfnResource) -> Self {
        Self {
            name: name.into(),
            properties: Box::new(properties),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// keep the physical resource when it is removed from the stack,
    /// or when the stack itself is deleted.
    pub fn retain(mut self) -> Self {
        self.deletion_policy = Some(DeletionPolicy::Retain);
        self.update_replace_policy = Some(DeletionPolicy::Retain);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    pub logical_id: String,
    pub description: String,
    pub value: Value,
}

impl Output {
    /// create an output whose logical id is derived from the current scope.
    pub fn new(core: &mut L0Core, id: &str, description: &str, value: Value) -> Result<Self, SynthError> {
        let logical_id = core.allocate_logical_id(id)?;
        Ok(Self {
            logical_id,
            description: description.to_string(),
            value,
        })
    }

    /// pin this output to an exact logical id so that tooling can look it up
    /// by a constant name across deployments.
    pub fn override_logical_id(&mut self, core: &mut L0Core, logical_id: &str) -> Result<(), SynthError> {
        if self.logical_id == logical_id {
            return Ok(());
        }
        core.reserve_logical_id(logical_id)?;
        core.release_logical_id(&self.logical_id);
        self.logical_id = logical_id.to_string();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Input {
    /// if left empty, the default name passed to `config` is used.
    pub stack_name: String,
    pub description: Option<String>,
    /// stack level tags. Modules copy these onto every taggable resource they emit.
    pub tags: BTreeMap<String, String>,
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
}

impl Input {
    pub fn add_resource(&mut self, resource: Resource) {
        tracing::debug!(logical_id = %resource.name, ty = resource.properties.type_string(), "adding resource");
        self.resources.push(resource);
    }

    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    /// look up the concrete resource behind `logical_id` so that it can be
    /// patched after the module that created it has returned.
    pub fn default_child_mut<T: CfnResource>(&mut self, logical_id: &str) -> Result<&mut T, SynthError> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.name == logical_id)
            .ok_or_else(|| SynthError::MissingResource(logical_id.to_string()))?;
        AsAny::as_any_mut(resource.properties.as_mut())
            .downcast_mut::<T>()
            .ok_or_else(|| SynthError::UnexpectedResourceType {
                resource: logical_id.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn default_child<T: CfnResource>(&self, logical_id: &str) -> Result<&T, SynthError> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.name == logical_id)
            .ok_or_else(|| SynthError::MissingResource(logical_id.to_string()))?;
        AsAny::as_any(resource.properties.as_ref())
            .downcast_ref::<T>()
            .ok_or_else(|| SynthError::UnexpectedResourceType {
                resource: logical_id.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

fn validate_resources_to_template(resources: &[Resource]) -> Result<SavedTemplate, SynthError> {
    let mut out_template = SavedTemplate::default();
    for resource in resources.iter() {
        verify_logical_id(&resource.name)?;
        if let Err(reason) = resource.properties.validate() {
            return Err(SynthError::InvalidResource { resource: resource.name.clone(), reason });
        }
        let saved_resource = SavedResource {
            ty: resource.properties.type_string().to_string(),
            properties: resource.properties.properties()?,
            deletion_policy: resource.deletion_policy,
            update_replace_policy: resource.update_replace_policy,
        };
        if out_template.resources.insert(resource.name.clone(), saved_resource).is_some() {
            return Err(SynthError::DuplicateLogicalId(resource.name.clone()));
        }
    }
    Ok(out_template)
}

fn validate_outputs(template: &mut SavedTemplate, outputs: &[Output]) -> Result<(), SynthError> {
    for output in outputs.iter() {
        verify_logical_id(&output.logical_id)?;
        if template.resources.contains_key(&output.logical_id) {
            return Err(SynthError::DuplicateLogicalId(output.logical_id.clone()));
        }
        if !output.value.is_string() && !intrinsics::is_intrinsic(&output.value) {
            return Err(SynthError::InvalidResource {
                resource: output.logical_id.clone(),
                reason: "output values must be a string or an intrinsic function".into(),
            });
        }
        let saved = ResourceOutput {
            description: output.description.clone(),
            value: output.value.clone(),
        };
        if template.outputs.insert(output.logical_id.clone(), saved).is_some() {
            return Err(SynthError::DuplicateLogicalId(output.logical_id.clone()));
        }
    }
    Ok(())
}

pub fn validate_stack_name(default_name: &str, current_stack_name: &str) -> Result<String, SynthError> {
    let stack_name = if current_stack_name.is_empty() {
        let mut stack_name = default_name.replace('_', "-");
        stack_name.truncate(128);
        stack_name
    } else {
        current_stack_name.to_string()
    };
    // A stack name can contain only alphanumeric characters (case sensitive) and hyphens.
    // It must start with an alphabetical character and can't be longer than 128 characters.
    let restriction = "Must only consist of alphanumeric characters and hyphens, Must start with an alphabetical character, and cannot be longer than 128 characters.";
    let invalid = || SynthError::InvalidStackName {
        name: stack_name.clone(),
        reason: restriction.to_string(),
    };
    match stack_name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if !stack_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid());
    }
    if stack_name.len() > 128 {
        return Err(invalid());
    }
    Ok(stack_name)
}

/// turn every resource and output added to `input` into a template.
/// `default_name` is used as the stack name when the input leaves it empty.
pub fn config(input: &Input, default_name: &str) -> Result<SavedStack, SynthError> {
    let stack_name = validate_stack_name(default_name, &input.stack_name)?;
    let mut template = validate_resources_to_template(&input.resources)?;
    validate_outputs(&mut template, &input.outputs)?;
    template.description = input.description.clone();
    tracing::info!(
        stack = %stack_name,
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "synthesized stack template"
    );
    Ok(SavedStack { stack_name, template })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Queue {
        queue_name: String,
    }

    impl CfnResource for Queue {
        fn type_string(&self) -> &'static str {
            "AWS::SQS::Queue"
        }
        fn properties(&self) -> Result<Value, serde_json::Error> {
            serde_json::to_value(self)
        }
        fn validate(&self) -> Result<(), String> {
            if self.queue_name.is_empty() {
                return Err("queue name must not be empty".into());
            }
            Ok(())
        }
    }

    fn queue(name: &str) -> Queue {
        Queue { queue_name: name.into() }
    }

    #[test]
    fn stack_name_defaults_to_module_name() {
        assert_eq!(validate_stack_name("my_portal", "").unwrap(), "my-portal");
        assert_eq!(validate_stack_name("ignored", "Custom-1").unwrap(), "Custom-1");
    }

    #[test]
    fn stack_name_restrictions() {
        assert!(validate_stack_name("", "1abc").is_err());
        assert!(validate_stack_name("", "abc.def").is_err());
        assert!(validate_stack_name("", &"a".repeat(129)).is_err());
        assert!(validate_stack_name("", "").is_err());
        assert!(validate_stack_name("", &"a".repeat(128)).is_ok());
    }

    #[test]
    fn renders_resources_with_policies() {
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("jobs")).retain());
        input.add_resource(Resource::new("Queue2", queue("dead")));
        let stack = config(&input, "jobs").unwrap();
        let rendered = serde_json::to_value(&stack.template).unwrap();
        assert_eq!(rendered["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(rendered["Resources"]["Queue1"]["Type"], "AWS::SQS::Queue");
        assert_eq!(rendered["Resources"]["Queue1"]["Properties"], json!({ "QueueName": "jobs" }));
        assert_eq!(rendered["Resources"]["Queue1"]["DeletionPolicy"], "Retain");
        assert_eq!(rendered["Resources"]["Queue1"]["UpdateReplacePolicy"], "Retain");
        assert!(rendered["Resources"]["Queue2"].get("DeletionPolicy").is_none());
        assert!(rendered.get("Outputs").is_none());
    }

    #[test]
    fn resources_can_be_filtered_by_type() {
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("a")));
        input.add_resource(Resource::new("Queue2", queue("b")));
        let stack = config(&input, "jobs").unwrap();
        let found: Vec<&String> = {
            let ty = format!("AWS::SQS::{}", "Queue");
            stack.template.resources_of_type(&ty).map(|(id, _)| id).collect()
        };
        assert_eq!(found, vec!["Queue1", "Queue2"]);
        assert_eq!(stack.template.resources_of_type("AWS::S3::Bucket").count(), 0);
    }

    #[test]
    fn resource_validation_errors_name_the_resource() {
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("")));
        let err = config(&input, "jobs").unwrap_err();
        assert!(err.to_string().contains("Queue1"));
        assert!(err.to_string().contains("queue name must not be empty"));
    }

    #[test]
    fn rejects_duplicate_logical_ids() {
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("a")));
        input.add_resource(Resource::new("Queue1", queue("b")));
        assert!(matches!(config(&input, "jobs"), Err(SynthError::DuplicateLogicalId(_))));
    }

    #[test]
    fn outputs_can_be_pinned() {
        let mut core = L0Core::new();
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("a")));
        let mut output = Output::new(&mut core, "QueueUrl", "url of the queue", intrinsics::get_ref("Queue1")).unwrap();
        assert!(output.logical_id.starts_with("QueueUrl"));
        output.override_logical_id(&mut core, "JobsQueueUrl").unwrap();
        input.add_output(output);
        let stack = config(&input, "jobs").unwrap();
        let out = &stack.template.outputs["JobsQueueUrl"];
        assert_eq!(out.value, json!({ "Ref": "Queue1" }));
        assert_eq!(out.description, "url of the queue");
    }

    #[test]
    fn output_values_must_resolve_to_strings() {
        let mut core = L0Core::new();
        let mut input = Input::default();
        input.add_output(Output::new(&mut core, "Bad", "", json!({ "a": 1 })).unwrap());
        assert!(config(&input, "jobs").is_err());
    }

    #[test]
    fn default_child_downcasts() {
        let mut input = Input::default();
        input.add_resource(Resource::new("Queue1", queue("a")));
        input.default_child_mut::<Queue>("Queue1").unwrap().queue_name = "patched".into();
        assert_eq!(input.default_child::<Queue>("Queue1").unwrap().queue_name, "patched");
        assert!(matches!(
            input.default_child_mut::<Queue>("Missing"),
            Err(SynthError::MissingResource(_))
        ));

        #[derive(Debug)]
        struct Other;
        impl CfnResource for Other {
            fn type_string(&self) -> &'static str {
                "AWS::Other"
            }
            fn properties(&self) -> Result<Value, serde_json::Error> {
                Ok(json!({}))
            }
        }
        assert!(matches!(
            input.default_child_mut::<Other>("Queue1"),
            Err(SynthError::UnexpectedResourceType { .. })
        ));
    }

    #[test]
    fn tags_keep_order() {
        let mut map = BTreeMap::new();
        map.insert("team".to_string(), "photo".to_string());
        map.insert("env".to_string(), "prod".to_string());
        let tags = tags_from(&map);
        assert_eq!(tags[0], Tag { key: "env".into(), value: "prod".into() });
        assert_eq!(serde_json::to_value(&tags[1]).unwrap(), json!({ "Key": "team", "Value": "photo" }));
    }
}
