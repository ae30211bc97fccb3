use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{ObjectStore, SyncError};

/// a real S3 bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: &str) -> Self {
        Self { client, bucket: bucket.to_string() }
    }

    fn store_err(&self, operation: &'static str, key: &str, e: impl std::error::Error) -> SyncError {
        SyncError::Store {
            operation,
            bucket: self.bucket.clone(),
            key: key.to_string(),
            message: format!("{}", DisplayErrorContext(e)),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_keys(&self) -> Result<Vec<String>, SyncError> {
        let mut keys = vec![];
        let mut continuation_token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| self.store_err("list", "", e))?;
            keys.extend(resp.contents().iter().filter_map(|obj| obj.key().map(|k| k.to_string())));
            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(keys)
    }

    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), SyncError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| self.store_err("put", key, e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), SyncError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.store_err("delete", key, e))?;
        Ok(())
    }
}
