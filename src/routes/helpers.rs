use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpResponse, ResponseError};

use crate::authentication::AuthError;
use crate::context::RequestContext;
use crate::errors::ErrorKind;
use crate::lifecycle::LifecycleError;
use crate::listing::ListingError;

#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

impl RequestTimeout {
    pub fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.0)
    }
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(kind: ErrorKind, message: String) -> HttpResponse {
    // Collaborator failures stay in the logs.
    let message = match kind {
        ErrorKind::Internal => "internal server error".to_string(),
        _ => message,
    };
    let mut response = HttpResponse::build(status_for(kind)).json(ErrorBody { error: &message });
    if kind == ErrorKind::Unauthorized {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Bearer realm="subscribers""#),
        );
    }
    response
}

impl ResponseError for LifecycleError {
    fn status_code(&self) -> StatusCode {
        status_for(self.kind())
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.kind(), self.to_string())
    }
}

impl ResponseError for ListingError {
    fn status_code(&self) -> StatusCode {
        status_for(self.kind())
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.kind(), self.to_string())
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        status_for(self.kind())
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.kind(), self.to_string())
    }
}
