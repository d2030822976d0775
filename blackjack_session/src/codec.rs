//! Signing and verification of round state.
//!
//! A token is the JSON object `{"p": <payload>, "s": <signature>}` where `p` is the round
//! state serialized canonically (sorted keys, no whitespace, non-ASCII escaped as `\uXXXX`)
//! and `s` is the lowercase hex HMAC-SHA256 of `p` under the server secret. The same state
//! always produces the same payload bytes, so tokens minted by any compatible server verify.

use crate::SessionError;
use blackjack_lib::RoundState;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use sha2::Sha256;
use std::io::{self, Write};

type HmacSha256 = Hmac<Sha256>;

/// Secret used when none is configured. Only suitable for local development.
pub const DEV_SECRET: &str = "dev_secret_change_me";

/// The two halves of a state token as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateToken {
    #[serde(rename = "p")]
    pub payload: String,
    #[serde(rename = "s")]
    pub signature: String,
}

impl StateToken {
    /// Parses the outer token text. Says nothing about whether the signature is valid.
    pub fn parse(token: &str) -> Result<StateToken, SessionError> {
        serde_json::from_str(token).map_err(|_| SessionError::MalformedToken)
    }

    pub fn encode(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The process-wide signing secret, keyed once at start up and read-only afterwards.
/// Replacing it invalidates every token issued under the old one.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl SigningKey {
    pub fn new(secret: impl AsRef<[u8]>) -> SigningKey {
        // HMAC pads or hashes the key, so every length is accepted
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .expect("HMAC accepts keys of any length");
        SigningKey { mac }
    }

    /// Serializes `state` canonically and returns the signed token text.
    pub fn sign(&self, state: &RoundState) -> Result<String, SessionError> {
        let payload = canonical_json(state)?;
        let signature = hex::encode(self.digest(payload.as_bytes()));
        StateToken { payload, signature }.encode()
    }

    /// Checks the token's signature and decodes the round it carries.
    ///
    /// Fails with `MalformedToken` when the token is not a `{p, s}` object or the signed
    /// payload is not a round, and with `InvalidSignature` when the signature does not match.
    pub fn verify(&self, token: &str) -> Result<RoundState, SessionError> {
        let token = StateToken::parse(token)?;
        // only the exact lowercase form is accepted, so one round has one token text
        if token.signature.len() != 64
            || !token
                .signature
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(SessionError::InvalidSignature);
        }
        let signature =
            hex::decode(&token.signature).map_err(|_| SessionError::InvalidSignature)?;

        let mut mac = self.mac.clone();
        mac.update(token.payload.as_bytes());
        // constant time comparison
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        serde_json::from_str(&token.payload).map_err(|_| SessionError::MalformedToken)
    }

    fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(bytes);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Serializes `value` with object keys sorted at every level, `,` and `:` separators,
/// and every character outside printable ASCII written as a `\uXXXX` escape.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, SessionError> {
    let value = sort_keys(serde_json::to_value(value)?);
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, AsciiFormatter);
    value.serialize(&mut serializer)?;
    // the formatter only ever writes ASCII
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Compact output with non-ASCII text escaped as UTF-16 code units.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        for c in fragment.chars() {
            if c.is_ascii() && c != '\x7f' {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
