//! Compute Engine REST client.
//!
//! [`GceCompute`] implements [`ComputeApi`] over the `compute/v1` REST
//! surface using a bearer token resolved once at start-up. List calls follow
//! `nextPageToken` until the provider stops returning one.

mod token;
mod wire;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::compute::{
    AcceleratorType, ComputeApi, ComputeError, ComputeFuture, InstanceSummary, Operation,
};
use crate::instance::InstanceSpec;

use wire::{InstanceResource, ListPage, NamedResource, OperationResource};

pub use token::{TokenError, TokenSource};

/// Default REST endpoint for Compute Engine.
pub const DEFAULT_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Compute Engine client authenticated with a bearer token.
#[derive(Clone, Debug)]
pub struct GceCompute {
    client: Client,
    base_url: String,
    token: String,
}

impl GceCompute {
    /// Creates a client against the public endpoint.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
        }
    }

    /// Points the client at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Endpoint in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        format!("{}/projects/{project}/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ComputeError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ComputeError::Transport {
                message: err.to_string(),
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ComputeError::Transport {
                message: err.to_string(),
            })?;
        debug!(resource, status = status.as_u16(), "compute API response");
        if !status.is_success() {
            return Err(wire::status_error(status.as_u16(), resource, &body));
        }
        serde_json::from_str(&body).map_err(|err| ComputeError::Decode {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    async fn list_all<T: DeserializeOwned>(
        &self,
        project: &str,
        path: &str,
    ) -> Result<Vec<T>, ComputeError> {
        let url = self.project_url(project, path);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let page: ListPage<T> = self.send(request, path).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => return Ok(items),
            }
        }
    }
}

impl ComputeApi for GceCompute {
    fn list_zones<'a>(&'a self, project: &'a str) -> ComputeFuture<'a, Vec<String>> {
        Box::pin(async move {
            let zones: Vec<NamedResource> = self.list_all(project, "zones").await?;
            Ok(zones.into_iter().map(|zone| zone.name).collect())
        })
    }

    fn list_accelerator_types<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<AcceleratorType>> {
        Box::pin(async move {
            let path = format!("zones/{zone}/acceleratorTypes");
            let types: Vec<NamedResource> = self.list_all(project, &path).await?;
            Ok(types.into_iter().map(AcceleratorType::from).collect())
        })
    }

    fn list_instances<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<InstanceSummary>> {
        Box::pin(async move {
            let path = format!("zones/{zone}/instances");
            let instances: Vec<InstanceResource> = self.list_all(project, &path).await?;
            Ok(instances.into_iter().map(InstanceSummary::from).collect())
        })
    }

    fn get_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, InstanceSummary> {
        Box::pin(async move {
            let path = format!("zones/{zone}/instances/{name}");
            let request = self.client.get(self.project_url(project, &path));
            let instance: InstanceResource = self.send(request, &path).await?;
            Ok(instance.into())
        })
    }

    fn insert_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        spec: &'a InstanceSpec,
    ) -> ComputeFuture<'a, Operation> {
        Box::pin(async move {
            let path = format!("zones/{zone}/instances");
            let request = self.client.post(self.project_url(project, &path)).json(spec);
            let operation: OperationResource = self.send(request, &path).await?;
            Ok(operation.into())
        })
    }

    fn delete_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, Operation> {
        Box::pin(async move {
            let path = format!("zones/{zone}/instances/{name}");
            let request = self.client.delete(self.project_url(project, &path));
            let operation: OperationResource = self.send(request, &path).await?;
            Ok(operation.into())
        })
    }

    fn get_operation<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        operation: &'a str,
    ) -> ComputeFuture<'a, Operation> {
        Box::pin(async move {
            let path = format!("zones/{zone}/operations/{operation}");
            let request = self.client.get(self.project_url(project, &path));
            let current: OperationResource = self.send(request, &path).await?;
            Ok(current.into())
        })
    }
}
