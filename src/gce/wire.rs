//! JSON payloads exchanged with the Compute Engine REST API.

use serde::Deserialize;

use crate::compute::{
    AcceleratorType, ComputeError, InstanceSummary, Operation, OperationErrorDetail,
    OperationStatus,
};

/// One page of a list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub(super) items: Vec<T>,
    #[serde(default)]
    pub(super) next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NamedResource {
    pub(super) name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct InstanceResource {
    pub(super) name: String,
    #[serde(default)]
    pub(super) status: Option<String>,
}

impl From<InstanceResource> for InstanceSummary {
    fn from(resource: InstanceResource) -> Self {
        Self {
            name: resource.name,
            status: resource.status,
        }
    }
}

impl From<NamedResource> for AcceleratorType {
    fn from(resource: NamedResource) -> Self {
        Self::new(resource.name)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OperationResource {
    name: String,
    status: String,
    #[serde(default)]
    error: Option<OperationErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorBody {
    #[serde(default)]
    errors: Vec<OperationErrorItem>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorItem {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

impl From<OperationResource> for Operation {
    fn from(resource: OperationResource) -> Self {
        let errors = resource
            .error
            .map(|body| {
                body.errors
                    .into_iter()
                    .map(|item| OperationErrorDetail {
                        code: item.code,
                        message: item.message,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: resource.name,
            status: OperationStatus::parse(&resource.status),
            errors,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extracts the provider message from an error body, falling back to the raw
/// text when the body is not the standard Google error envelope.
pub(super) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.trim().to_owned(),
        |envelope| envelope.error.message,
    )
}

/// Maps a non-success HTTP response to a [`ComputeError`].
pub(super) fn status_error(status: u16, resource: &str, body: &str) -> ComputeError {
    if status == 404 {
        return ComputeError::NotFound {
            resource: resource.to_owned(),
        };
    }
    ComputeError::Provider {
        status: Some(status),
        message: error_message(body),
    }
}
