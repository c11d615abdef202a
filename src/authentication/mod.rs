mod jwt;

pub use jwt::{EditorClaims, JwtVerifier};

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use anyhow::Context;

use crate::errors::{ErrorKind, error_chain_fmt};

#[derive(thiserror::Error)]
pub enum AuthError {
    #[error("No bearer credential was provided.")]
    MissingCredentials(#[source] anyhow::Error),
    #[error("The bearer credential is invalid.")]
    InvalidCredentials(#[source] anyhow::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthorized
    }
}

impl std::fmt::Debug for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<String, AuthError>;
}

pub fn bearer_credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header_value = headers
        .get(AUTHORIZATION)
        .context("The 'Authorization' header is missing.")
        .map_err(AuthError::MissingCredentials)?
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string.")
        .map_err(AuthError::InvalidCredentials)?;

    let credential = header_value
        .strip_prefix("Bearer ")
        .context("The authorization scheme is not 'Bearer'.")
        .map_err(AuthError::InvalidCredentials)?
        .trim();

    if credential.is_empty() {
        return Err(AuthError::MissingCredentials(anyhow::anyhow!(
            "The bearer credential is empty."
        )));
    }
    Ok(credential)
}
