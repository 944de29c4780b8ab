//! Signed assertions which authenticate calls made as the Github App itself.
//!
//! Github App-level endpoints (listing installations, exchanging installation tokens)
//! expect a short lived RS256 JWT whose issuer is the App ID. A fresh assertion is
//! signed for every outbound call; nothing is cached.

use std::sync::Arc;

use api_client::{set_authorization, Authentication, Secret, SecretBytes};
use chrono::{DateTime, Duration, Utc};
use jaws::claims::{Claims, RegisteredClaims};
use jaws::crypto::{rsa, signature};
use jaws::token::{Token, TokenFormattingError, TokenSigningError};
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::sha2::Sha256;
use thiserror::Error;

/// How long an App assertion stays valid.
pub const ASSERTION_LIFETIME_SECONDS: i64 = 60;

/// The private key could not be read as an RSA private key.
#[derive(Debug, Error)]
pub enum KeyParseError {
    /// PEM is text; these bytes aren't.
    #[error("key is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Neither of the PEM encodings Github hands out matched.
    #[error("key is neither a PKCS1 ({pkcs1}) nor a PKCS8 ({pkcs8}) RSA private key")]
    Pem {
        /// Error reading the key as PKCS1 (`BEGIN RSA PRIVATE KEY`).
        pkcs1: rsa::pkcs1::Error,
        /// Error reading the key as PKCS8 (`BEGIN PRIVATE KEY`).
        pkcs8: rsa::pkcs8::Error,
    },
}

/// The claims could not be signed or rendered.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The signature algorithm failed.
    #[error("signature: {0}")]
    Signature(#[from] signature::Error),

    /// The header or claims could not be serialized.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signed token could not be rendered in compact form.
    #[error("formatting: {0}")]
    Formatting(String),
}

impl From<TokenSigningError> for SigningError {
    fn from(err: TokenSigningError) -> Self {
        match err {
            TokenSigningError::Signing(err) => err.into(),
            TokenSigningError::Serialization(err) => err.into(),
        }
    }
}

impl From<TokenFormattingError> for SigningError {
    fn from(err: TokenFormattingError) -> Self {
        match err {
            TokenFormattingError::Serialization(err) => err.into(),
            other => SigningError::Formatting(format!("{other:?}")),
        }
    }
}

/// Credentials supplied for the App could not be turned into an assertion.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The private key is unusable.
    #[error("failed to parse secret into RSA private key: {0}")]
    KeyParse(#[from] KeyParseError),

    /// Signing the assertion failed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] SigningError),
}

/// Who the App is: its numeric ID and the PEM encoded private key Github issued for it.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    issuer_id: u64,
    private_key: SecretBytes,
}

impl AppIdentity {
    /// Create an identity from an App ID and PEM key bytes.
    ///
    /// The key is not parsed until an assertion is signed.
    pub fn new(issuer_id: u64, private_key: impl Into<SecretBytes>) -> Self {
        Self {
            issuer_id,
            private_key: private_key.into(),
        }
    }

    /// The Github App ID.
    pub fn issuer_id(&self) -> u64 {
        self.issuer_id
    }

    fn signing_key(&self) -> Result<rsa::RsaPrivateKey, KeyParseError> {
        let pem = std::str::from_utf8(self.private_key.revealed())?;
        match rsa::RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(key) => Ok(key),
            Err(pkcs1) => rsa::RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|pkcs8| KeyParseError::Pem { pkcs1, pkcs8 }),
        }
    }
}

/// A signed, short lived JWT identifying the App.
#[derive(Debug, Clone)]
pub struct AppAssertion {
    /// Issued-at claim.
    pub issued_at: DateTime<Utc>,

    /// Expiration claim.
    pub expires_at: DateTime<Utc>,

    /// Issuer claim: the App ID.
    pub issuer: u64,

    token: Secret,
}

impl AppAssertion {
    /// The compact JWT.
    pub fn token(&self) -> &Secret {
        &self.token
    }
}

/// Sign an assertion for `identity`, valid from `now` for [`ASSERTION_LIFETIME_SECONDS`].
pub fn sign(identity: &AppIdentity, now: DateTime<Utc>) -> Result<AppAssertion, CredentialError> {
    let key = identity.signing_key()?;

    let issued_at = now;
    let expires_at = now + Duration::seconds(ASSERTION_LIFETIME_SECONDS);
    let issuer = identity.issuer_id.to_string();

    let claims: Claims<(), &str> = Claims {
        registered: RegisteredClaims {
            issuer: Some(issuer.as_str()),
            issued_at: Some(issued_at),
            expiration: Some(expires_at),
            ..Default::default()
        },
        claims: (),
    };

    let jwt = Token::compact((), claims);
    let algorithm: rsa::pkcs1v15::SigningKey<Sha256> = rsa::pkcs1v15::SigningKey::new(key);
    let token = jwt
        .sign::<rsa::pkcs1v15::SigningKey<Sha256>, rsa::pkcs1v15::Signature>(&algorithm)
        .map_err(SigningError::from)?;

    let token: Secret = token.rendered().map_err(SigningError::from)?.into();
    tracing::trace!(app = identity.issuer_id, expires = %expires_at, "Signed Github App assertion");

    Ok(AppAssertion {
        issued_at,
        expires_at,
        issuer: identity.issuer_id,
        token,
    })
}

/// Authenticates App-level requests with a freshly signed assertion per request.
#[derive(Debug, Clone)]
pub struct AppAuthenticator {
    identity: Arc<AppIdentity>,
}

impl AppAuthenticator {
    /// Share `identity` between every request this authenticator signs for.
    pub fn new(identity: AppIdentity) -> Self {
        Self {
            identity: Arc::new(identity),
        }
    }

    /// The identity requests are signed as.
    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }
}

/// Errors attaching an App assertion to a request.
#[derive(Debug, Error)]
pub enum AuthenticateError {
    /// The assertion couldn't be produced.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The assertion isn't a valid header value.
    #[error("invalid authorization header: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
}

impl Authentication for AppAuthenticator {
    type Error = AuthenticateError;

    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error> {
        let assertion = sign(&self.identity, Utc::now())?;
        Ok(set_authorization(req, assertion.token().bearer()?))
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use chrono::TimeZone;

    use super::*;

    const PKCS1_KEY: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test/app-key.pem"
    ));
    const PKCS8_KEY: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test/app-key.pk8.pem"
    ));
    const PUBLIC_KEY: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test/app-key.pub.pem"
    ));

    fn claims(assertion: &AppAssertion) -> serde_json::Value {
        let token = assertion.token().revealed();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3, "compact JWT has three parts");
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap()
    }

    fn header(assertion: &AppAssertion) -> serde_json::Value {
        let token = assertion.token().revealed();
        let encoded = token.split('.').next().unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn assertion_claims_cover_one_minute() {
        let now = Utc.with_ymd_and_hms(2014, 7, 8, 9, 10, 11).unwrap();
        let identity = AppIdentity::new(1235, PKCS1_KEY.as_bytes());

        let assertion = sign(&identity, now).unwrap();
        assert_eq!(assertion.issued_at, now);
        assert_eq!(assertion.expires_at - assertion.issued_at, Duration::seconds(60));
        assert_eq!(assertion.issuer, 1235);

        let claims = claims(&assertion);
        assert_eq!(claims["iat"].as_i64(), Some(now.timestamp()));
        assert_eq!(claims["exp"].as_i64(), Some(now.timestamp() + 60));
        assert_eq!(claims["iss"].as_str(), Some("1235"));
    }

    #[test]
    fn assertion_is_rs256() {
        let identity = AppIdentity::new(42, PKCS1_KEY.as_bytes());
        let assertion = sign(&identity, Utc::now()).unwrap();
        assert_eq!(header(&assertion)["alg"].as_str(), Some("RS256"));
    }

    #[test]
    fn pkcs8_keys_are_accepted() {
        let identity = AppIdentity::new(7, PKCS8_KEY.as_bytes());
        let assertion = sign(&identity, Utc::now()).unwrap();
        assert_eq!(claims(&assertion)["iss"].as_str(), Some("7"));
    }

    fn assert_key_parse_error(key: &[u8]) {
        let identity = AppIdentity::new(1, key);
        match sign(&identity, Utc::now()) {
            Err(CredentialError::KeyParse(_)) => {}
            other => panic!("expected a key parse error, got {other:?}"),
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_key_parse_error(b"");
    }

    #[test]
    fn truncated_key_is_rejected() {
        let truncated = &PKCS1_KEY.as_bytes()[..PKCS1_KEY.len() / 2];
        assert_key_parse_error(truncated);
    }

    #[test]
    fn public_key_is_rejected() {
        assert_key_parse_error(PUBLIC_KEY.as_bytes());
    }

    #[test]
    fn binary_key_is_rejected() {
        assert_key_parse_error(&[0xff, 0xfe, 0x00, 0x80]);
    }

    #[test]
    fn authenticator_signs_each_request() {
        let auth = AppAuthenticator::new(AppIdentity::new(1235, PKCS1_KEY.as_bytes()));
        let req = http::Request::get("https://api.github.com/app/installations")
            .body(())
            .unwrap();
        let req = auth.authenticate(req).unwrap();

        let header = req.headers().get(http::header::AUTHORIZATION).unwrap();
        assert!(header.is_sensitive());
        let value = header.to_str().unwrap();
        assert!(value.starts_with("Bearer "));
        assert_eq!(value.matches('.').count(), 2);
    }

    #[test]
    fn authenticator_reports_bad_keys() {
        let auth = AppAuthenticator::new(AppIdentity::new(1235, b"nope".as_slice()));
        let req = http::Request::get("https://api.github.com/app/installations")
            .body(())
            .unwrap();
        assert!(matches!(
            auth.authenticate(req),
            Err(AuthenticateError::Credential(CredentialError::KeyParse(_)))
        ));
    }
}
