// crates/siac-gate-mcp/src/jwt.rs
// ============================================================================
// Module: JWT Claims Source
// Description: Local JWS signature verification with jsonwebtoken.
// Purpose: Decode self-contained access tokens without a network hop.
// Dependencies: jsonwebtoken, serde, siac-gate-config, thiserror
// ============================================================================

//! ## Overview
//! [`JwtClaimsSource`] checks the header `alg` against an allow-list, selects
//! the decoding key (a shared secret, a PEM public key, or a JWKS entry chosen
//! by `kid`), and verifies the signature. The library's own `exp`, `aud`, and
//! `iss` checks are disabled; the verifier applies them in its fixed order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::JwkSet;
use serde::Deserialize;
use siac_gate_config::JwtAlgorithm;
use siac_gate_config::JwtVerifierConfig;
use thiserror::Error;

use crate::verifier::AudienceClaim;
use crate::verifier::ClaimsError;
use crate::verifier::ClaimsSource;
use crate::verifier::TokenClaims;
use crate::verifier::TokenShape;
use crate::verifier::assemble_claims;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JWT key setup errors.
#[derive(Debug, Error)]
pub enum JwtSourceError {
    /// Key material could not be read.
    #[error("jwt key io error: {0}")]
    Io(String),
    /// Key material is invalid or inconsistent with the algorithms.
    #[error("jwt key error: {0}")]
    Key(String),
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Decoding keys held by the source.
enum JwtKeys {
    /// One key for every token.
    Single(DecodingKey),
    /// Keys indexed by `kid`.
    ById(BTreeMap<String, DecodingKey>),
}

/// Claims source for locally verifiable JWTs.
pub struct JwtClaimsSource {
    /// Key material.
    keys: JwtKeys,
    /// Accepted header algorithms.
    algorithms: Vec<Algorithm>,
}

impl JwtClaimsSource {
    /// Builds the source from `[auth.verifier]`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtSourceError`] when key material is missing or invalid.
    pub fn from_config(config: &JwtVerifierConfig) -> Result<Self, JwtSourceError> {
        let algorithms = config.algorithms.iter().copied().map(algorithm).collect::<Vec<_>>();
        if let Some(path) = &config.jwks_path {
            let json = read_key_file(path)?;
            return Self::from_jwks(&json, algorithms);
        }
        if let Some(path) = &config.public_key_path {
            let pem = read_key_file(path)?;
            return Self::from_public_key_pem(pem.as_bytes(), algorithms);
        }
        let env = config
            .secret_env
            .as_deref()
            .ok_or_else(|| JwtSourceError::Key("no key source configured".to_string()))?;
        let secret = std::env::var(env)
            .map_err(|_| JwtSourceError::Key(format!("environment variable {env} is not set")))?;
        if secret.is_empty() {
            return Err(JwtSourceError::Key(format!("environment variable {env} is empty")));
        }
        Ok(Self::from_secret(secret.as_bytes(), algorithms))
    }

    /// Shared-secret source for HMAC algorithms.
    #[must_use]
    pub fn from_secret(secret: &[u8], algorithms: Vec<Algorithm>) -> Self {
        Self {
            keys: JwtKeys::Single(DecodingKey::from_secret(secret)),
            algorithms,
        }
    }

    /// Single PEM public key source (RSA or EC, chosen by algorithm family).
    ///
    /// # Errors
    ///
    /// Returns [`JwtSourceError::Key`] when the PEM does not parse or the
    /// algorithms span both key families.
    pub fn from_public_key_pem(
        pem: &[u8],
        algorithms: Vec<Algorithm>,
    ) -> Result<Self, JwtSourceError> {
        let rsa = algorithms.iter().any(|alg| is_rsa(*alg));
        let ec = algorithms.iter().any(|alg| matches!(alg, Algorithm::ES256 | Algorithm::ES384));
        let key = match (rsa, ec) {
            (true, false) => DecodingKey::from_rsa_pem(pem),
            (false, true) => DecodingKey::from_ec_pem(pem),
            _ => {
                return Err(JwtSourceError::Key(
                    "a single public key requires algorithms from one key family".to_string(),
                ));
            }
        }
        .map_err(|err| JwtSourceError::Key(format!("invalid public key: {err}")))?;
        Ok(Self {
            keys: JwtKeys::Single(key),
            algorithms,
        })
    }

    /// JWKS source; keys without `kid` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`JwtSourceError::Key`] when the set does not parse or holds no
    /// usable keys.
    pub fn from_jwks(json: &str, algorithms: Vec<Algorithm>) -> Result<Self, JwtSourceError> {
        let set: JwkSet = serde_json::from_str(json)
            .map_err(|err| JwtSourceError::Key(format!("invalid jwks: {err}")))?;
        let mut keys = BTreeMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!("skipping jwks entry without kid");
                continue;
            };
            let key = DecodingKey::from_jwk(jwk)
                .map_err(|err| JwtSourceError::Key(format!("invalid jwk {kid}: {err}")))?;
            keys.insert(kid, key);
        }
        if keys.is_empty() {
            return Err(JwtSourceError::Key("jwks contains no keys with kid".to_string()));
        }
        Ok(Self {
            keys: JwtKeys::ById(keys),
            algorithms,
        })
    }

    /// Selects the key for a token header.
    fn key_for(&self, kid: Option<&str>) -> Result<&DecodingKey, ClaimsError> {
        match &self.keys {
            JwtKeys::Single(key) => Ok(key),
            JwtKeys::ById(keys) => {
                let kid =
                    kid.ok_or_else(|| ClaimsError::Malformed("token header lacks kid".to_string()))?;
                keys.get(kid).ok_or_else(|| ClaimsError::Malformed("unknown signing key".to_string()))
            }
        }
    }
}

/// Registered claims read from the payload.
#[derive(Debug, Clone, Deserialize)]
struct JwtPayload {
    /// Issuer.
    #[serde(default)]
    iss: Option<String>,
    /// Audience.
    #[serde(default)]
    aud: Option<AudienceClaim>,
    /// Subject.
    #[serde(default)]
    sub: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    exp: Option<i64>,
    /// Space-delimited scopes.
    #[serde(default)]
    scope: Option<String>,
}

#[async_trait]
impl ClaimsSource for JwtClaimsSource {
    fn token_shape(&self) -> TokenShape {
        TokenShape::Jws
    }

    async fn claims(&self, token: &str) -> Result<TokenClaims, ClaimsError> {
        let header = decode_header(token)
            .map_err(|_| ClaimsError::Malformed("token header is not decodable".to_string()))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(ClaimsError::Malformed("token algorithm is not accepted".to_string()));
        }
        let key = self.key_for(header.kid.as_deref())?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<JwtPayload>(token, key, &validation).map_err(|err| {
            tracing::debug!(error = %err, "jwt decode failed");
            ClaimsError::Malformed("signature or payload is invalid".to_string())
        })?;
        let payload = data.claims;
        assemble_claims(payload.iss, payload.aud, payload.sub, payload.exp, payload.scope.as_deref())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps the configured algorithm to the library enum.
const fn algorithm(value: JwtAlgorithm) -> Algorithm {
    match value {
        JwtAlgorithm::HS256 => Algorithm::HS256,
        JwtAlgorithm::HS384 => Algorithm::HS384,
        JwtAlgorithm::HS512 => Algorithm::HS512,
        JwtAlgorithm::RS256 => Algorithm::RS256,
        JwtAlgorithm::RS384 => Algorithm::RS384,
        JwtAlgorithm::RS512 => Algorithm::RS512,
        JwtAlgorithm::ES256 => Algorithm::ES256,
        JwtAlgorithm::ES384 => Algorithm::ES384,
    }
}

/// True for RSA PKCS#1 algorithms.
const fn is_rsa(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512)
}

/// Reads a key file as UTF-8.
fn read_key_file(path: &Path) -> Result<String, JwtSourceError> {
    std::fs::read_to_string(path)
        .map_err(|err| JwtSourceError::Io(format!("{}: {err}", path.display())))
}
