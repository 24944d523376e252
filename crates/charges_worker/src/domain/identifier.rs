use base64::{engine::general_purpose::URL_SAFE, Engine};
use sha1::{Digest, Sha1};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierSaltError {
    #[error("{0} salt must not be empty")]
    Empty(&'static str),

    #[error("charge id and transaction id salts must differ")]
    Identical,
}

/// Derives the public charge and transaction identifiers from their raw
/// delta values. Holds both salts so callers cannot mix them up.
#[derive(Clone)]
pub struct IdentifierEncoder {
    charge_id_salt: String,
    transaction_id_salt: String,
}

impl IdentifierEncoder {
    pub fn new(
        charge_id_salt: impl Into<String>,
        transaction_id_salt: impl Into<String>,
    ) -> Result<Self, IdentifierSaltError> {
        let charge_id_salt = charge_id_salt.into();
        let transaction_id_salt = transaction_id_salt.into();

        if charge_id_salt.is_empty() {
            return Err(IdentifierSaltError::Empty("charge id"));
        }
        if transaction_id_salt.is_empty() {
            return Err(IdentifierSaltError::Empty("transaction id"));
        }
        if charge_id_salt == transaction_id_salt {
            return Err(IdentifierSaltError::Identical);
        }

        Ok(Self {
            charge_id_salt,
            transaction_id_salt,
        })
    }

    /// Opaque public charge id: url-safe base64 of `sha1(id + salt)`
    pub fn encode_charge_id(&self, raw: &str) -> String {
        encode_with_hash(raw, &self.charge_id_salt)
    }

    /// Reversible public transaction id used in filing links
    pub fn encode_transaction_id(&self, raw: &str) -> String {
        encode_without_hash(raw, &self.transaction_id_salt)
    }
}

impl std::fmt::Debug for IdentifierEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierEncoder").finish_non_exhaustive()
    }
}

pub fn encode_with_hash(raw: &str, salt: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(raw.trim().as_bytes());
    hasher.update(salt.as_bytes());
    URL_SAFE.encode(hasher.finalize())
}

/// Blank input is returned unchanged.
pub fn encode_without_hash(raw: &str, salt: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }
    URL_SAFE.encode(format!("{trimmed}{salt}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_hash() {
        assert_eq!(
            encode_with_hash("3000117455", "sometest"),
            "2e6X44GGkwsvYqCd5HF6a42mWZs="
        );
        assert_eq!(
            encode_with_hash(" 3000117455 ", "sometest"),
            "2e6X44GGkwsvYqCd5HF6a42mWZs="
        );
    }

    #[test]
    fn test_encode_without_hash() {
        assert_eq!(
            encode_without_hash("3000117455", "sometest2"),
            "MzAwMDExNzQ1NXNvbWV0ZXN0Mg=="
        );
        assert_eq!(encode_without_hash("", "sometest2"), "");
    }

    #[test]
    fn test_encoder_uses_matching_salts() {
        let encoder = IdentifierEncoder::new("sometest", "sometest2").unwrap();

        assert_eq!(
            encoder.encode_charge_id("3000117455"),
            "2e6X44GGkwsvYqCd5HF6a42mWZs="
        );
        assert_eq!(
            encoder.encode_transaction_id("3000117455"),
            "MzAwMDExNzQ1NXNvbWV0ZXN0Mg=="
        );
    }

    #[test]
    fn test_encoder_rejects_bad_salts() {
        assert_eq!(
            IdentifierEncoder::new("", "b").unwrap_err(),
            IdentifierSaltError::Empty("charge id")
        );
        assert_eq!(
            IdentifierEncoder::new("a", "").unwrap_err(),
            IdentifierSaltError::Empty("transaction id")
        );
        assert_eq!(
            IdentifierEncoder::new("same", "same").unwrap_err(),
            IdentifierSaltError::Identical
        );
    }
}
