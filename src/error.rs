use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;

/// The error taxonomy surfaced to clients. Internal causes are logged
/// but never forwarded in the response body — auth failures in
/// particular always collapse to one opaque message.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    TooLarge(String),
    RateLimited { retry_after_secs: u64, limit: usize },
    Internal(String),
    BadGateway(String),
}

impl AppError {
    fn status(&self) -> Status {
        match self {
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::Forbidden(_) => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Conflict(_) => Status::Conflict,
            AppError::TooLarge(_) => Status::PayloadTooLarge,
            AppError::RateLimited { .. } => Status::TooManyRequests,
            AppError::Internal(_) => Status::InternalServerError,
            AppError::BadGateway(_) => Status::BadGateway,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::BadRequest(m) => m.clone(),
            AppError::Unauthorized => "unauthorized".to_string(),
            AppError::Forbidden(m) => m.clone(),
            AppError::NotFound(m) => m.clone(),
            AppError::Conflict(m) => m.clone(),
            AppError::TooLarge(m) => m.clone(),
            AppError::RateLimited { .. } => "rate limited".to_string(),
            AppError::Internal(_) => "internal error".to_string(),
            AppError::BadGateway(m) => m.clone(),
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let AppError::Internal(ref cause) = self {
            eprintln!("internal error: {cause}");
        }
        let status = self.status();
        let mut body = json!({ "error": self.message() });
        if let AppError::RateLimited { retry_after_secs, limit } = &self {
            body["retry_after_secs"] = json!(retry_after_secs);
            body["limit"] = json!(limit);
            body["remaining"] = json!(0);
        }
        Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}

pub type AppResult<T> = Result<T, AppError>;
