use std::collections::BTreeMap;
use std::time::Duration;

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Stack, StackStatus};
use aws_sdk_cloudformation::Client;

use crate::SavedStack;

const POLL_INTERVAL: Duration = Duration::from_millis(700);

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Failed to serialize template for stack {stack}\n{source}")]
    Serialize {
        stack: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cloudformation request for stack {stack} failed\n{message}")]
    Api { stack: String, message: String },

    #[error("Stack {0} not found")]
    NotFound(String),

    #[error("Stack {stack} ended in status {status}\n{reason}")]
    Failed { stack: String, status: String, reason: String },
}

/// where a stack is in its lifecycle, as far as a deploy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    Complete,
    InProgress,
    Failed,
}

/// a rollback that completed still means our template was not applied,
/// so only the plain complete states count as success.
pub fn classify_status(status: &StackStatus) -> StackProgress {
    match status {
        StackStatus::CreateComplete | StackStatus::UpdateComplete | StackStatus::ImportComplete => {
            StackProgress::Complete
        }

        StackStatus::CreateInProgress
        | StackStatus::DeleteInProgress
        | StackStatus::ImportInProgress
        | StackStatus::ImportRollbackInProgress
        | StackStatus::ReviewInProgress
        | StackStatus::RollbackInProgress
        | StackStatus::UpdateCompleteCleanupInProgress
        | StackStatus::UpdateInProgress
        | StackStatus::UpdateRollbackCompleteCleanupInProgress
        | StackStatus::UpdateRollbackInProgress => StackProgress::InProgress,

        _ => StackProgress::Failed,
    }
}

fn api_error(stack: &str, e: impl std::error::Error) -> DeployError {
    DeployError::Api { stack: stack.to_string(), message: format!("{}", DisplayErrorContext(e)) }
}

pub async fn does_stack_exist(client: &Client, name: &str) -> Result<bool, DeployError> {
    match client.describe_stacks().stack_name(name).send().await {
        Ok(_) => Ok(true),
        Err(e) => {
            let e_str = format!("{}", DisplayErrorContext(&e));
            if e_str.contains("does not exist") {
                return Ok(false);
            }
            Err(DeployError::Api { stack: name.to_string(), message: e_str })
        }
    }
}

/// returns the stack once it reached a terminal success state, `None` while it
/// is still in progress.
pub async fn describe_stack(client: &Client, name: &str) -> Result<Option<Stack>, DeployError> {
    let resp = client
        .describe_stacks()
        .stack_name(name)
        .send()
        .await
        .map_err(|e| api_error(name, e))?;
    let stack = resp.stacks().first().ok_or_else(|| DeployError::NotFound(name.to_string()))?;
    let status = stack.stack_status().ok_or_else(|| DeployError::NotFound(name.to_string()))?;
    match classify_status(status) {
        StackProgress::Complete => Ok(Some(stack.clone())),
        StackProgress::InProgress => {
            tracing::debug!(stack = name, status = status.as_str(), "stack still in progress");
            Ok(None)
        }
        StackProgress::Failed => Err(DeployError::Failed {
            stack: name.to_string(),
            status: status.as_str().to_string(),
            reason: stack
                .stack_status_reason()
                .unwrap_or("Failed to get stack failure reason")
                .to_string(),
        }),
    }
}

pub async fn wait_for_output(client: &Client, name: &str) -> Result<BTreeMap<String, String>, DeployError> {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let Some(stack) = describe_stack(client, name).await? else {
            continue;
        };
        let mut out = BTreeMap::new();
        for output in stack.outputs() {
            if let (Some(key), Some(val)) = (output.output_key(), output.output_value()) {
                out.insert(key.to_string(), val.to_string());
            }
        }
        return Ok(out);
    }
}

pub async fn create_or_update_stack(client: &Client, name: &str, body: &str) -> Result<(), DeployError> {
    if does_stack_exist(client, name).await? {
        tracing::info!(stack = name, "updating stack");
        match client
            .update_stack()
            .capabilities(Capability::CapabilityNamedIam)
            .capabilities(Capability::CapabilityIam)
            .stack_name(name)
            .template_body(body)
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) => {
                let e_str = format!("{}", DisplayErrorContext(&e));
                if e_str.contains("No updates are to be performed") {
                    tracing::info!(stack = name, "stack is already up to date");
                    return Ok(());
                }
                return Err(DeployError::Api { stack: name.to_string(), message: e_str });
            }
        }
    } else {
        tracing::info!(stack = name, "creating stack");
        client
            .create_stack()
            .on_failure(OnFailure::Delete)
            .capabilities(Capability::CapabilityNamedIam)
            .capabilities(Capability::CapabilityIam)
            .stack_name(name)
            .template_body(body)
            .send()
            .await
            .map_err(|e| api_error(name, e))?;
    }
    Ok(())
}

/// submit the stack and block until cloudformation reports a terminal state.
/// returns the stack outputs keyed by logical id.
pub async fn deploy_stack(client: &Client, stack: &SavedStack) -> Result<BTreeMap<String, String>, DeployError> {
    let name = &stack.stack_name;
    // pretty so the template reads well in the cloudformation console
    let body = stack.to_json_pretty().map_err(|source| DeployError::Serialize {
        stack: name.clone(),
        source,
    })?;
    create_or_update_stack(client, name, &body).await?;
    let outputs = wait_for_output(client, name).await?;
    tracing::info!(stack = %name, outputs = outputs.len(), "stack deployed");
    Ok(outputs)
}
