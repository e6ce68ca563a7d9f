use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use ticket_booking_config::ConfigError;
use ticket_booking_store::StoreError;
use tracing::{error, warn};

use crate::form::FormError;
use crate::profile::ProfileError;
use crate::submission::SubmitError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Submit(#[from] SubmitError),
    #[error("{0}")]
    Form(#[from] FormError),
    #[error("{0}")]
    Profile(#[from] ProfileError),
    #[error("session state is poisoned")]
    Poisoned,
    #[error("this form is busy, try again once the current request finished")]
    Busy,
    #[error("no profile is open, look one up by email or phone first")]
    NoProfile,
    #[error("the document needs a file name")]
    MissingFileName,
    #[error("enter an email address or phone number")]
    MissingContact,
    #[error("{0} passengers can not travel on one booking")]
    InvalidPassengerCount(usize),
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(error) | Self::Profile(ProfileError::Store(error)) => store_status(error),
            Self::Submit(SubmitError::Invalid { .. })
            | Self::Form(_)
            | Self::MissingFileName
            | Self::MissingContact
            | Self::InvalidPassengerCount(_)
            | Self::Profile(ProfileError::NotEditing) => StatusCode::BAD_REQUEST,
            Self::Submit(SubmitError::UploadFailed(_) | SubmitError::PersistenceFailed(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Submit(SubmitError::AlreadySubmitting) | Self::Busy => StatusCode::CONFLICT,
            Self::NoProfile
            | Self::Profile(
                ProfileError::UnknownBooking(_) | ProfileError::NoSuchPassenger { .. },
            ) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::File(_) | Self::Json(_) | Self::Poisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("request rejected: {self}");
        }
        let body = match &self {
            Self::Submit(SubmitError::Invalid { step, errors }) => json!({
                "error": self.to_string(),
                "step": step,
                "fields": errors,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use ticket_booking_store::StoreError;

    use super::AppError;
    use crate::profile::ProfileError;
    use crate::submission::SubmitError;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(AppError::Busy.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Submit(SubmitError::AlreadySubmitting).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Submit(SubmitError::UploadFailed(StoreError::Unavailable("down".into())))
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Profile(ProfileError::Store(StoreError::NotFound(3))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Profile(ProfileError::NotEditing).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Poisoned.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
