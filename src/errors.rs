use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::srcei::ScrapeError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Scrape(e) => match e {
                ScrapeError::Authentication(_) => StatusCode::SERVICE_UNAVAILABLE,
                ScrapeError::Navigation(_) => StatusCode::SERVICE_UNAVAILABLE,
                ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ScrapeError::Launch(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ScrapeError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), 400),
            (ScrapeError::Authentication("x".into()).into(), 503),
            (ScrapeError::Navigation("x".into()).into(), 503),
            (ScrapeError::Timeout("x".into()).into(), 504),
            (ScrapeError::Launch("x".into()).into(), 500),
            (ScrapeError::Unclassified("x".into()).into(), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status().as_u16(), code, "{err}");
        }
    }
}
