use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};

use super::{AuthError, IdentityVerifier};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct EditorClaims {
    pub sub: String,
    pub exp: i64,
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<String, AuthError> {
        let claims = decode::<EditorClaims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidCredentials(e.into()))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(anyhow::anyhow!(
                "The credential has an empty subject."
            )));
        }
        Ok(claims.sub)
    }
}
