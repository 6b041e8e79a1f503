//! Token Decoder
//!
//! Local JWT decoding. Verified decoding checks the signature against the
//! realm's published keys and validates `exp`/`nbf`; the audience is not
//! enforced. Unverified decoding is a structural parse only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::RealmMetadataClient;
use crate::error::{DecodeError, KeycloakResult};
use crate::types::{CertKey, CertResponse};

/// Untyped claims.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Decoded JWT.
#[derive(Debug, Clone)]
pub struct DecodedToken<C = Claims> {
    pub header: Header,
    pub claims: C,
}

/// Decoder verifying tokens against realm signing keys.
pub struct TokenDecoder {
    metadata: Arc<dyn RealmMetadataClient>,
}

impl TokenDecoder {
    pub fn new(metadata: Arc<dyn RealmMetadataClient>) -> Self {
        Self { metadata }
    }

    /// Verify and decode an access token issued by `realm`.
    pub async fn decode_access_token(
        &self,
        token: &str,
        realm: &str,
    ) -> KeycloakResult<DecodedToken<Claims>> {
        self.decode_access_token_custom_claims(token, realm).await
    }

    /// Verify and decode an access token into caller-defined claims.
    pub async fn decode_access_token_custom_claims<C: DeserializeOwned>(
        &self,
        token: &str,
        realm: &str,
    ) -> KeycloakResult<DecodedToken<C>> {
        // Reject garbage before touching the network.
        parse_header(token)?;
        let certs = self.metadata.get_certs(realm).await?;
        Self::decode_with_certs(token, &certs)
    }

    /// Verify and decode against a caller-supplied key set.
    pub fn decode_with_certs<C: DeserializeOwned>(
        token: &str,
        certs: &CertResponse,
    ) -> KeycloakResult<DecodedToken<C>> {
        let header = parse_header(token)?;
        let key = select_key(certs, header.kid.as_deref())?;

        if let Some(alg) = key.alg.as_deref() {
            match Algorithm::from_str(alg) {
                Ok(expected) if expected != header.alg => {
                    return Err(DecodeError::UnsupportedKey {
                        message: format!(
                            "token signed with {:?} but key {} is {}",
                            header.alg,
                            key.kid.as_deref().unwrap_or("<none>"),
                            alg
                        ),
                    }
                    .into());
                }
                _ => {}
            }
        }

        let decoding_key = decoding_key(key)?;
        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.validate_nbf = true;

        let data = decode::<C>(token, &decoding_key, &validation).map_err(DecodeError::from)?;
        Ok(DecodedToken {
            header: data.header,
            claims: data.claims,
        })
    }

    /// Structural parse without any signature or time validation.
    pub fn decode_unverified<C: DeserializeOwned>(token: &str) -> KeycloakResult<DecodedToken<C>> {
        let header = parse_header(token)?;

        let mut validation = Validation::new(header.alg);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<C>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(DecodeError::from)?;
        Ok(DecodedToken {
            header: data.header,
            claims: data.claims,
        })
    }
}

fn parse_header(token: &str) -> Result<Header, DecodeError> {
    if token.split('.').count() != 3 {
        return Err(DecodeError::Malformed {
            message: "expected three dot-separated segments".to_string(),
        });
    }

    decode_header(token).map_err(|e| DecodeError::Malformed {
        message: e.to_string(),
    })
}

/// Key named by `kid`, or the only signing key when the token names none.
fn select_key<'a>(certs: &'a CertResponse, kid: Option<&str>) -> Result<&'a CertKey, DecodeError> {
    let not_found = || DecodeError::KeyNotFound {
        kid: kid.map(str::to_string),
    };

    match kid {
        Some(kid) => certs.find(kid).ok_or_else(not_found),
        None => {
            let mut signing = certs.signing_keys();
            match (signing.next(), signing.next()) {
                (Some(key), None) => Ok(key),
                _ => Err(not_found()),
            }
        }
    }
}

fn decoding_key(key: &CertKey) -> Result<DecodingKey, DecodeError> {
    let missing = |what: &str| DecodeError::UnsupportedKey {
        message: format!("{} key without {}", key.kty, what),
    };

    match key.kty.as_str() {
        "RSA" => {
            let n = key.n.as_deref().ok_or_else(|| missing("modulus"))?;
            let e = key.e.as_deref().ok_or_else(|| missing("exponent"))?;
            Ok(DecodingKey::from_rsa_components(n, e)?)
        }
        "EC" => {
            let x = key.x.as_deref().ok_or_else(|| missing("x coordinate"))?;
            let y = key.y.as_deref().ok_or_else(|| missing("y coordinate"))?;
            Ok(DecodingKey::from_ec_components(x, y)?)
        }
        "oct" => {
            let k = key.k.as_deref().ok_or_else(|| missing("secret"))?;
            let secret = URL_SAFE_NO_PAD
                .decode(k.trim_end_matches('='))
                .map_err(|e| DecodeError::UnsupportedKey {
                    message: format!("invalid oct key: {}", e),
                })?;
            Ok(DecodingKey::from_secret(&secret))
        }
        other => Err(DecodeError::UnsupportedKey {
            message: format!("key type {:?}", other),
        }),
    }
}
