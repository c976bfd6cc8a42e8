// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP client for the gateway management API.
//!
//! Lists functions, reads replica status, submits scale requests and reads
//! the gateway version. In dry-run mode scale requests are only logged.

use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use idler_core::{
    Credentials, FunctionDescriptor, FunctionName, GatewayClient, GatewayInfo,
    HardValidationError, IdlerError, IdlerResult, ReplicaStatus,
};

/// Function status as returned by `system/functions` and `system/function/{name}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFunctionStatus {
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    invocation_count: Option<f64>,
    #[serde(default)]
    replicas: Option<u64>,
    #[serde(default)]
    available_replicas: Option<u64>,
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

impl RawFunctionStatus {
    fn into_descriptor(self) -> Result<FunctionDescriptor, HardValidationError> {
        Ok(FunctionDescriptor {
            name: FunctionName::new(self.name)?,
            labels: self.labels,
            available_replicas: self.available_replicas.unwrap_or(0),
            replicas: self.replicas,
            image: self.image,
            invocation_count: self.invocation_count.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScaleServiceRequest<'a> {
    service_name: &'a str,
    replicas: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawProvider {
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVersion {
    #[serde(default)]
    release: String,
    #[serde(default)]
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    provider: Option<RawProvider>,
    #[serde(default)]
    version: Option<RawVersion>,
}

/// Gateway client over HTTP with optional basic auth.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
    dry_run: bool,
}

impl HttpGateway {
    /// API paths are joined under `base_url`, so its path should end with `/`.
    /// Validated configuration guarantees it.
    pub fn new(
        base_url: Url,
        timeout: Duration,
        credentials: Option<Credentials>,
        dry_run: bool,
    ) -> IdlerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| gateway_error("build_client", e))?;

        Ok(Self {
            client,
            base_url,
            credentials,
            dry_run,
        })
    }

    fn request(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
    ) -> IdlerResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| gateway_error(operation, e))?;

        let request = self.client.request(method, url);
        Ok(match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> IdlerResult<T> {
        let response = self
            .request(operation, Method::GET, path)?
            .send()
            .await
            .map_err(|e| gateway_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(gateway_error(operation, format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| gateway_error(operation, e))
    }
}

#[async_trait]
impl GatewayClient for HttpGateway {
    async fn list_functions(&self) -> IdlerResult<Vec<FunctionDescriptor>> {
        let raw: Vec<RawFunctionStatus> = self.get_json("list_functions", "system/functions").await?;

        let mut functions = Vec::with_capacity(raw.len());
        for status in raw {
            match status.into_descriptor() {
                Ok(function) => functions.push(function),
                Err(e) => tracing::warn!(error = %e, "Skipping function with invalid name"),
            }
        }
        Ok(functions)
    }

    async fn replica_status(&self, name: &FunctionName) -> IdlerResult<ReplicaStatus> {
        let path = format!("system/function/{}", name);
        let raw: RawFunctionStatus = self.get_json("replica_status", &path).await?;
        Ok(ReplicaStatus::new(raw.available_replicas.unwrap_or(0)))
    }

    async fn scale_to(&self, name: &FunctionName, replicas: u64) -> IdlerResult<()> {
        if self.dry_run {
            tracing::info!(function = %name, replicas, "dry-run: Scaling function");
            return Ok(());
        }

        let body = ScaleServiceRequest {
            service_name: name.as_str(),
            replicas,
        };
        let response = self
            .request("scale_to", Method::POST, &format!("system/scale-function/{}", name))?
            .json(&body)
            .send()
            .await
            .map_err(|e| gateway_error("scale_to", e))?;

        let status = response.status();
        tracing::info!(function = %name, replicas, status = status.as_u16(), "Scale request sent");

        if !status.is_success() {
            return Err(gateway_error("scale_to", format!("HTTP {}", status)));
        }
        Ok(())
    }

    async fn info(&self) -> IdlerResult<GatewayInfo> {
        let raw: RawInfo = self.get_json("info", "system/info").await?;
        let version = raw.version.unwrap_or_default();

        Ok(GatewayInfo {
            provider: raw.provider.and_then(|p| p.provider),
            release: version.release,
            sha: version.sha,
        })
    }
}

fn gateway_error(operation: &'static str, e: impl Display) -> IdlerError {
    IdlerError::Gateway {
        operation,
        message: e.to_string(),
    }
}
