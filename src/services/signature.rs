use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Serialize a gateway payload to its canonical base64(JSON) wire form.
pub fn encode_payload(payload: &serde_json::Value) -> String {
    BASE64.encode(payload.to_string())
}

/// Checksum-style authentication code: `SHA256(data + endpoint + salt_key)`
/// in hex, suffixed with the salt index. For status polls `data` is empty
/// and the endpoint path alone is covered.
pub fn checksum_sign(data: &str, endpoint: &str, salt_key: &str, salt_index: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.update(endpoint.as_bytes());
    hasher.update(salt_key.as_bytes());
    format!("{}###{}", hex::encode(hasher.finalize()), salt_index)
}

pub fn checksum_verify(
    data: &str,
    endpoint: &str,
    salt_key: &str,
    salt_index: &str,
    signature: &str,
) -> bool {
    checksum_sign(data, endpoint, salt_key, salt_index) == signature
}

/// HMAC-SHA256 over the raw request body, hex encoded.
pub fn hmac_sign(secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn hmac_verify(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() || signature.is_empty() {
        return false;
    }
    hmac_sign(secret, body) == signature
}
