//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! X's v2 posting endpoints accept OAuth 1.0a user-context authorization.
//! Each request carries an `Authorization: OAuth ...` header whose signature
//! covers the method, the normalized URL, the query string, any form body
//! parameters and the `oauth_*` parameters themselves. JSON bodies are not
//! part of the signature.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{PlatformError, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters are left alone, everything else is encoded
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Per-request values that make a signature unique
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: u64,
}

impl Nonce {
    /// Fresh random nonce stamped with the current time
    pub fn generate() -> Self {
        let nonce = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }
}

/// Scheme, host, non-default port and path, without query or fragment
pub fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

/// Build the signature base string
///
/// `params` holds every parameter covered by the signature: query string,
/// form body and `oauth_*` values, unencoded.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(&base_url(url)),
        percent_encode(&parameter_string)
    )
}

/// HMAC-SHA1 over the base string, base64 encoded
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| PlatformError::Authentication(format!("Invalid signing key: {}", e)))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization` header value for one request
///
/// `extra_params` are form body parameters to cover; query parameters are
/// taken from `url`.
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    url: &Url,
    extra_params: &[(String, String)],
    nonce: &Nonce,
) -> Result<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), credentials.consumer_key().to_string()),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), credentials.token().to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut signed_params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    signed_params.extend_from_slice(extra_params);
    signed_params.extend_from_slice(&oauth_params);

    let base_string = signature_base_string(method, url, &signed_params);
    let signature = sign(
        &base_string,
        credentials.consumer_secret(),
        credentials.token_secret(),
    )?;
    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}
