use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Re-serializes the IPN body with every object's keys in ascending order,
/// which is the form the gateway signs.
pub fn canonical_body(body: &Value) -> String {
    sort_keys(body).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Hex-encoded HMAC-SHA512 of the canonical body.
pub fn sign(body: &Value, key: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(canonical_body(body).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `signature` against every key in turn. Comparison is constant-time
/// per key; the signature length (128 hex chars) is not secret.
pub fn verify(body: &Value, signature: &str, keys: &[&str]) -> bool {
    let provided = signature.trim().to_lowercase();
    keys.iter().any(|key| {
        let expected = sign(body, key);
        expected.len() == provided.len() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
    })
}
