//! Request signing for the image generation API
//!
//! Implements the vendor's SigV4-flavored scheme: a canonical request is
//! hashed into a string-to-sign, a four-step HMAC-SHA256 chain derives a
//! scoped signing key from the secret, and the resulting signature is
//! assembled into an `Authorization` header. Unlike stock SigV4 the chain
//! starts from the bare secret key (no "AWS4" prefix) and the scope ends
//! in the literal `request`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// Algorithm literal used in the string-to-sign and Authorization header
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Final message of the signing key chain and last scope segment
const REQUEST_SUFFIX: &str = "request";

/// Headers covered by the signature, lowercase, in canonical order
const SIGNED_HEADER_NAMES: &str = "content-type;host;x-content-sha256;x-date";

const CONTENT_TYPE_JSON: &str = "application/json";

/// API credentials for the image generation service
///
/// Both keys must be non-empty; `validate` is checked before any signing
/// work so an unsigned request is never sent.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Fail fast when either key is empty
    pub fn validate(&self) -> Result<()> {
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(Error::MissingCredentials);
        }
        Ok(())
    }
}

// Keys never appear in logs or debug output in full.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &"***")
            .finish()
    }
}

// Suffix is counted in characters so a multi-byte key cannot split.
fn redact(key: &str) -> String {
    let length = key.chars().count();
    if length <= 4 {
        "***".to_string()
    } else {
        let suffix: String = key.chars().skip(length - 4).collect();
        format!("***{suffix}")
    }
}

/// Per-request signing context
///
/// Built fresh for every request. The timestamp is sampled once and both
/// renderings (full `YYYYMMDDTHHMMSSZ` and date-only `YYYYMMDD`) come from
/// that single instant; the credential-scope date must match the `X-Date`
/// header or the verifier rejects the signature. The verifier also owns
/// the accepted clock-skew window, nothing here enforces one.
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub method: String,
    pub host: String,
    pub canonical_uri: String,
    pub region: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

impl SigningContext {
    /// Context for a POST to the service root at the current instant
    pub fn new(host: impl Into<String>, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            host: host.into(),
            canonical_uri: "/".to_string(),
            region: region.into(),
            service: service.into(),
            timestamp: Utc::now(),
        }
    }

    /// Pin the context to a fixed instant
    pub fn at(mut self, instant: DateTime<Utc>) -> Self {
        self.timestamp = instant;
        self
    }

    fn x_date(&self) -> String {
        self.timestamp.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn date_stamp(&self) -> String {
        self.timestamp.format("%Y%m%d").to_string()
    }
}

/// Headers produced by signing, attached verbatim to the outgoing request
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub x_date: String,
    pub x_content_sha256: String,
    pub content_type: String,
}

/// Signs requests against the image generation API
///
/// Signing is a pure function of credentials, context, query, and body:
/// no I/O, no retries, no shared state. Concurrent calls each carry their
/// own context and are independently valid.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Sign a request, producing the Authorization header and companions
    ///
    /// `body` must be the exact bytes that will be transmitted; any
    /// re-serialization after signing invalidates the payload hash.
    /// Duplicate query keys are unrepresentable by the map type, which
    /// also supplies the bytewise key ordering the canonical form needs.
    pub fn sign(
        &self,
        context: &SigningContext,
        query: &BTreeMap<String, String>,
        body: &str,
    ) -> Result<SignedHeaders> {
        self.credentials.validate()?;

        let x_date = context.x_date();
        let date_stamp = context.date_stamp();
        let canonical_query = canonical_query_string(query);
        let payload_hash = sha256_hex(body.as_bytes());

        let request = canonical_request(context, &canonical_query, &payload_hash, &x_date);
        let scope = credential_scope(&date_stamp, &context.region, &context.service);
        let to_sign = string_to_sign(&x_date, &scope, &sha256_hex(request.as_bytes()));

        let signing_key = derive_signing_key(
            &self.credentials.secret_key,
            &date_stamp,
            &context.region,
            &context.service,
        );
        let signature = hex::encode(hmac_sha256(&signing_key, to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADER_NAMES}, Signature={signature}",
            self.credentials.access_key
        );

        debug!(scope = %scope, x_date = %x_date, "signed request");

        Ok(SignedHeaders {
            authorization,
            x_date,
            x_content_sha256: payload_hash,
            content_type: CONTENT_TYPE_JSON.to_string(),
        })
    }
}

/// Returns HMAC-SHA256 of `data` keyed by `key`
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Returns hex encoded SHA-256 of `data`
fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Canonical query string: keys bytewise-sorted, `key=value` joined by `&`
///
/// Values are used as the caller supplied them, no extra URL-encoding.
/// Callers reuse this for the request URL so the signed string and the
/// wire string cannot drift apart.
pub fn canonical_query_string(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical request per the vendor scheme
///
/// Header lines each end in `\n`, and a blank line separates them from the
/// signed-header list. Any change to body, query set, or covered headers
/// changes this string.
fn canonical_request(
    context: &SigningContext,
    canonical_query: &str,
    payload_hash: &str,
    x_date: &str,
) -> String {
    let canonical_headers = format!(
        "content-type:{CONTENT_TYPE_JSON}\nhost:{}\nx-content-sha256:{payload_hash}\nx-date:{x_date}\n",
        context.host
    );
    format!(
        "{}\n{}\n{canonical_query}\n{canonical_headers}\n{SIGNED_HEADER_NAMES}\n{payload_hash}",
        context.method, context.canonical_uri
    )
}

/// Returns scope value of given date, region and service
fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{REQUEST_SUFFIX}")
}

/// Returns string-to-sign for given date, scope and canonical request hash
fn string_to_sign(x_date: &str, scope: &str, canonical_request_hash: &str) -> String {
    format!("{ALGORITHM}\n{x_date}\n{scope}\n{canonical_request_hash}")
}

/// Four-step signing key chain
///
/// Each step's raw output keys the next HMAC; the chain starts from the
/// bare secret key and ends on the literal request class.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(secret_key.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, REQUEST_SUFFIX.as_bytes())
}
