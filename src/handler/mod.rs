use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub mod frame;
pub mod ingest;
pub mod stats;

pub type ApiResult<T> = Result<T, ApiError>;
pub type ApiJsonResult<T> = ApiResult<Json<T>>;

pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: anyhow::anyhow!(message.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("ApiError: {:?}", self.error);
            (
                self.status,
                "relay went wrong because of an internal error".to_string(),
            )
                .into_response()
        } else {
            log::debug!("ApiError {}: {}", self.status, self.error);
            (self.status, self.error.to_string()).into_response()
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}
