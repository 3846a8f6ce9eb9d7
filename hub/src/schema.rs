use std::time::Duration;

use anyhow::Context;
use serde_json::value::RawValue;

use crate::protocol::RelayError;

/// Fetches the command-schema document a display advertises at registration.
/// The document stays opaque; the hub only checks that the response is a
/// 200 with a well-formed JSON body.
pub struct SchemaFetcher {
    client: reqwest::Client,
}

impl SchemaFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build schema fetch client")?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, command_url: &str) -> Result<Box<RawValue>, RelayError> {
        let response = self
            .client
            .get(command_url)
            .send()
            .await
            .map_err(|e| RelayError::CommandUrlUnreachable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RelayError::CommandUrlUnreachable(format!(
                "{command_url} returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::CommandUrlUnreachable(e.to_string()))?;

        // Well-formedness check only; the bytes ride through untouched.
        serde_json::from_str::<Box<RawValue>>(&body)
            .map_err(|e| RelayError::MalformedSchema(e.to_string()))
    }
}
