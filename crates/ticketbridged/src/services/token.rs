use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use super::{Claims, ServiceError, TokenVerifier};

const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Verifies HMAC-signed tokens (HS256, HS384 and HS512).
#[derive(Debug, Clone, Copy)]
pub struct HmacTokenVerifier {
    leeway_secs: u64,
}

impl HmacTokenVerifier {
    /// Builds a verifier tolerating `leeway_secs` of clock skew on `exp`.
    #[must_use]
    pub fn with_leeway(leeway_secs: u64) -> Self {
        Self { leeway_secs }
    }
}

impl Default for HmacTokenVerifier {
    fn default() -> Self {
        Self::with_leeway(DEFAULT_LEEWAY_SECS)
    }
}

impl TokenVerifier for HmacTokenVerifier {
    fn verify_signed_token(&self, raw: &str, secret: &str) -> Result<Claims, ServiceError> {
        let header = decode_header(raw)?;
        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ServiceError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_secs;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = decode::<Claims>(raw, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
        Ok(data.claims)
    }
}
