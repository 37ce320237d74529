//! CEA HMAC-SHA256 request signing for the affiliate gateway.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{DealflowError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hex signature over `signed_date + method + path + query`.
///
/// `path_with_query` is split on the first `?`; the `?` itself is not signed.
pub fn sign_request(
    secret_key: &str,
    signed_date: &str,
    method: &str,
    path_with_query: &str,
) -> Result<String> {
    let (path, query) = path_with_query
        .split_once('?')
        .unwrap_or((path_with_query, ""));
    let message = format!("{signed_date}{method}{path}{query}");

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| DealflowError::config(format!("unusable secret key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// The `Authorization` header value for a request.
pub fn authorization_header(
    access_key: &str,
    secret_key: &str,
    signed_date: &str,
    method: &str,
    path_with_query: &str,
) -> Result<String> {
    let signature = sign_request(secret_key, signed_date, method, path_with_query)?;
    Ok(format!(
        "CEA algorithm=HmacSHA256, access-key={access_key}, signed-date={signed_date}, signature={signature}"
    ))
}
