use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use slotd_common::views::{ApiErrorResponse, BatchCapacityRejection};
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Registry(re) => match re {
                RegistryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                RegistryError::LimitExceeded { .. } => StatusCode::FORBIDDEN,
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::CapacityExceeded { .. } => StatusCode::CONFLICT,
                RegistryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        ApiErrorResponse {
            code: match &err {
                ApiError::MalformedBody(_) => Some("InvalidRequest".into()),
                ApiError::Registry(re) => match re {
                    RegistryError::InvalidRequest(_) => Some("InvalidRequest".into()),
                    RegistryError::LimitExceeded { .. } => Some("LimitExceeded".into()),
                    RegistryError::CapacityExceeded { .. } => Some("CapacityExceeded".into()),
                    RegistryError::NotFound(_) => Some("NotFound".into()),
                    RegistryError::Store(_) => Some("InternalError".into()),
                },
            },

            message: match &err {
                ApiError::MalformedBody(_) => "The request body is not valid JSON.".into(),
                ApiError::Registry(re) => match re {
                    RegistryError::InvalidRequest(reason) => format!("Invalid request: {reason}."),
                    RegistryError::LimitExceeded { .. } => "License limit exceeded.".into(),
                    RegistryError::CapacityExceeded { .. } => {
                        "Adding these devices would exceed license limit.".into()
                    }
                    RegistryError::NotFound(_) => "Device not found.".into(),
                    RegistryError::Store(_) => {
                        "Something went wrong on our end. Please try again later.".into()
                    }
                },
            },

            #[cfg(debug_assertions)]
            details: Some(err.to_string()),

            #[cfg(not(debug_assertions))]
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!("Error returned by handler: {self}");
        } else {
            tracing::debug!("Request rejected: {self}");
        }

        // Batch clients read the counts from the rejection body.
        if let Self::Registry(RegistryError::CapacityExceeded {
            current_active,
            max_devices,
            requested,
        }) = self
        {
            let body = BatchCapacityRejection {
                ok: false,
                reason: "limit_reached".into(),
                message: "Adding these devices would exceed license limit".into(),
                current_active,
                max_devices,
                requested,
            };
            return (status_code, Json(body)).into_response();
        }

        (status_code, Json(Into::<ApiErrorResponse>::into(self))).into_response()
    }
}
