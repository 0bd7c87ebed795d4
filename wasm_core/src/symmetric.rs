//! Passphrase-based text encryption with a versioned JSON envelope.
//!
//! Keys come from one PBKDF2-HMAC-SHA256 derivation split into a cipher
//! half and a MAC half. Ciphertext is produced with CBC/PKCS#7 and then
//! authenticated with HMAC-SHA256 over the envelope fields (encrypt-then-MAC).
//! Decryption verifies the MAC before the cipher ever runs.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use log::{debug, warn};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::fill_random;

pub const ENVELOPE_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 100_000;
const KEY_HALF: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Why an envelope could not be opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("payload is not a valid encrypted envelope")]
    InvalidPayload,

    /// Carries the offending `v` as compact JSON.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(String),

    /// Wrong passphrase and tampered data are deliberately indistinguishable.
    #[error("integrity check failed: wrong passphrase or modified data")]
    IntegrityFailed,

    #[error("decryption failed")]
    DecryptionFailed,
}

impl CryptoError {
    /// Stable name the page can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::InvalidPayload => "InvalidPayload",
            CryptoError::UnsupportedVersion(_) => "UnsupportedVersion",
            CryptoError::IntegrityFailed => "IntegrityFailed",
            CryptoError::DecryptionFailed => "DecryptionFailed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Aes,
    Des,
    TripleDes,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Aes, Algorithm::Des, Algorithm::TripleDes];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Aes => "AES",
            Algorithm::Des => "DES",
            Algorithm::TripleDes => "TripleDES",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|algo| algo.name() == name)
    }

    /// Bytes of the 32-byte cipher key and 16-byte IV this cipher consumes.
    fn key_and_iv_len(self) -> (usize, usize) {
        match self {
            Algorithm::Aes => (32, 16),
            Algorithm::Des => (8, 8),
            Algorithm::TripleDes => (24, 8),
        }
    }

    fn encrypt(self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (key_len, iv_len) = self.key_and_iv_len();
        let (key, iv) = (&key[..key_len], &iv[..iv_len]);
        let ciphertext = match self {
            Algorithm::Aes => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            Algorithm::Des => cbc::Encryptor::<des::Des>::new_from_slices(key, iv)
                .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            Algorithm::TripleDes => cbc::Encryptor::<des::TdesEde3>::new_from_slices(key, iv)
                .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        };
        ciphertext.map_err(|_| CryptoError::DecryptionFailed)
    }

    fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (key_len, iv_len) = self.key_and_iv_len();
        if iv.len() < iv_len {
            return Err(CryptoError::DecryptionFailed);
        }
        let (key, iv) = (&key[..key_len], &iv[..iv_len]);
        let plaintext = match self {
            Algorithm::Aes => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            Algorithm::Des => cbc::Decryptor::<des::Des>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            Algorithm::TripleDes => cbc::Decryptor::<des::TdesEde3>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::DecryptionFailed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };
        plaintext.map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// The serialized envelope. Field names are part of the exchange format.
///
/// `v` stays raw JSON so that any present value, whatever its type, reaches
/// the version check instead of failing the parse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub v: Value,
    pub a: String,
    pub s: String,
    pub iv: String,
    pub ct: String,
    pub mac: String,
}

impl EncryptedPayload {
    fn is_supported_version(&self) -> bool {
        self.v.as_u64() == Some(u64::from(ENVELOPE_VERSION))
    }

    fn mac_input(&self) -> String {
        format!("{}|{}|{}|{}|{}", self.v, self.a, self.s, self.iv, self.ct)
    }
}

struct DerivedKeys {
    cipher: [u8; KEY_HALF],
    mac: [u8; KEY_HALF],
}

/// One PBKDF2 call, split positionally into cipher and MAC keys.
fn derive_keys(passphrase: &str, salt: &[u8]) -> DerivedKeys {
    let mut out = [0u8; KEY_HALF * 2];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    let mut keys = DerivedKeys {
        cipher: [0u8; KEY_HALF],
        mac: [0u8; KEY_HALF],
    };
    keys.cipher.copy_from_slice(&out[..KEY_HALF]);
    keys.mac.copy_from_slice(&out[KEY_HALF..]);
    keys
}

fn mac_for(key: &[u8], payload: &EncryptedPayload) -> Result<HmacSha256, CryptoError> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::IntegrityFailed)?;
    mac.update(payload.mac_input().as_bytes());
    Ok(mac)
}

/// Encrypts `plaintext` and returns the envelope as compact JSON.
pub fn encrypt_text(
    plaintext: &str,
    passphrase: &str,
    algorithm: Algorithm,
) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    fill_random(&mut salt);
    fill_random(&mut iv);
    let keys = derive_keys(passphrase, &salt);

    let ciphertext = algorithm.encrypt(&keys.cipher, &iv, plaintext.as_bytes())?;
    let mut payload = EncryptedPayload {
        v: Value::from(ENVELOPE_VERSION),
        a: algorithm.name().to_string(),
        s: hex::encode(salt),
        iv: hex::encode(iv),
        ct: STANDARD.encode(ciphertext),
        mac: String::new(),
    };
    payload.mac = hex::encode(mac_for(&keys.mac, &payload)?.finalize().into_bytes());
    debug!(
        "encrypted {} bytes with {}",
        plaintext.len(),
        algorithm.name()
    );
    serde_json::to_string(&payload).map_err(|_| CryptoError::InvalidPayload)
}

/// Opens an envelope produced by [`encrypt_text`].
///
/// Checks run in order: shape, version, MAC, then the cipher itself. The MAC
/// covers the raw field text, so a rewritten algorithm name or salt fails
/// integrity like any other modification.
pub fn decrypt_text(envelope: &str, passphrase: &str) -> Result<String, CryptoError> {
    let result = open_envelope(envelope, passphrase);
    if let Err(err) = &result {
        warn!("decryption rejected: {}", err.kind());
    }
    result
}

fn open_envelope(envelope: &str, passphrase: &str) -> Result<String, CryptoError> {
    let payload: EncryptedPayload =
        serde_json::from_str(envelope.trim()).map_err(|_| CryptoError::InvalidPayload)?;
    if !payload.is_supported_version() {
        return Err(CryptoError::UnsupportedVersion(payload.v.to_string()));
    }

    // Salt text that is not hex still keys the MAC, which then cannot match.
    let salt = hex::decode(&payload.s);
    let keys = derive_keys(
        passphrase,
        salt.as_deref().unwrap_or(payload.s.as_bytes()),
    );
    let expected = hex::decode(&payload.mac).map_err(|_| CryptoError::IntegrityFailed)?;
    mac_for(&keys.mac, &payload)?
        .verify_slice(&expected)
        .map_err(|_| CryptoError::IntegrityFailed)?;

    salt.map_err(|_| CryptoError::DecryptionFailed)?;
    let algorithm = Algorithm::from_name(&payload.a).ok_or(CryptoError::DecryptionFailed)?;
    let iv = hex::decode(&payload.iv).map_err(|_| CryptoError::DecryptionFailed)?;
    let ciphertext = STANDARD
        .decode(payload.ct.as_bytes())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = algorithm.decrypt(&keys.cipher, &iv, &ciphertext)?;
    match String::from_utf8(plaintext) {
        Ok(text) if !text.is_empty() => Ok(text),
        _ => Err(CryptoError::DecryptionFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn tamper(envelope: &str, field: &str, edit: impl FnOnce(&mut Value)) -> String {
        let mut value: Value = serde_json::from_str(envelope).expect("envelope json");
        edit(value.get_mut(field).expect("field present"));
        serde_json::to_string(&value).expect("serialize")
    }

    /// Builds an envelope with a valid MAC around arbitrary ciphertext bytes.
    fn forge(passphrase: &str, algorithm: Algorithm, ciphertext: &[u8]) -> String {
        forge_fields(passphrase, algorithm.name(), &hex::encode([7u8; SALT_LEN]), ciphertext)
    }

    /// Like [`forge`], with the algorithm and salt fields taken verbatim.
    fn forge_fields(passphrase: &str, algorithm: &str, salt: &str, ciphertext: &[u8]) -> String {
        let key_salt = hex::decode(salt).unwrap_or_else(|_| salt.as_bytes().to_vec());
        let keys = derive_keys(passphrase, &key_salt);
        let mut payload = EncryptedPayload {
            v: Value::from(ENVELOPE_VERSION),
            a: algorithm.into(),
            s: salt.into(),
            iv: hex::encode([9u8; IV_LEN]),
            ct: STANDARD.encode(ciphertext),
            mac: String::new(),
        };
        payload.mac = hex::encode(mac_for(&keys.mac, &payload).unwrap().finalize().into_bytes());
        serde_json::to_string(&payload).unwrap()
    }

    fn with_version(v: &str) -> String {
        format!(r#"{{"v":{v},"a":"AES","s":"00","iv":"00","ct":"","mac":""}}"#)
    }

    #[test]
    fn test_round_trip_all_algorithms() {
        for algorithm in Algorithm::ALL {
            let envelope = encrypt_text("attack at dawn ☀", "hunter2", algorithm).unwrap();
            assert_eq!(
                decrypt_text(&envelope, "hunter2").unwrap(),
                "attack at dawn ☀"
            );
        }
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = encrypt_text("hello", "pw", Algorithm::Aes).unwrap();
        let value: Value = serde_json::from_str(&envelope).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in ["v", "a", "s", "iv", "ct", "mac"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 6);
        assert_eq!(value["v"], 1);
        assert_eq!(value["a"], "AES");
        assert_eq!(value["s"].as_str().unwrap().len(), SALT_LEN * 2);
        assert_eq!(value["iv"].as_str().unwrap().len(), IV_LEN * 2);
        assert_eq!(value["mac"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_fresh_salt_and_iv_per_call() {
        let first = encrypt_text("same", "pw", Algorithm::Aes).unwrap();
        let second = encrypt_text("same", "pw", Algorithm::Aes).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_key_split_is_deterministic_per_salt() {
        let a = derive_keys("pw", &[1u8; SALT_LEN]);
        let b = derive_keys("pw", &[1u8; SALT_LEN]);
        assert_eq!(a.cipher, b.cipher);
        assert_eq!(a.mac, b.mac);
        assert_ne!(a.cipher, a.mac);
    }

    #[test]
    fn test_tampered_ciphertext_fails_integrity() {
        let envelope = encrypt_text("secret message", "pw", Algorithm::Aes).unwrap();
        let value: Value = serde_json::from_str(&envelope).unwrap();
        let ct = value["ct"].as_str().unwrap().to_string();
        for (pos, original) in ct.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let tampered = tamper(&envelope, "ct", |field| {
                let mut text = ct.clone();
                text.replace_range(pos..pos + 1, &replacement.to_string());
                *field = Value::String(text);
            });
            assert_eq!(
                decrypt_text(&tampered, "pw"),
                Err(CryptoError::IntegrityFailed),
                "ct position {pos}"
            );
        }
    }

    #[test]
    fn test_tampered_algorithm_fails_integrity() {
        let envelope = encrypt_text("secret", "pw", Algorithm::Aes).unwrap();
        let tampered = tamper(&envelope, "a", |a| *a = Value::String("DES".into()));
        assert_eq!(
            decrypt_text(&tampered, "pw"),
            Err(CryptoError::IntegrityFailed)
        );
    }

    #[test]
    fn test_tampered_algorithm_name_fails_integrity() {
        let envelope = encrypt_text("secret", "pw", Algorithm::Aes).unwrap();
        let tampered = tamper(&envelope, "a", |a| *a = Value::String("RC4".into()));
        assert_eq!(
            decrypt_text(&tampered, "pw"),
            Err(CryptoError::IntegrityFailed)
        );
    }

    #[test]
    fn test_tampered_salt_fails_integrity() {
        let envelope = encrypt_text("secret", "pw", Algorithm::Aes).unwrap();
        let tampered = tamper(&envelope, "s", |s| *s = Value::String("zz".into()));
        assert_eq!(
            decrypt_text(&tampered, "pw"),
            Err(CryptoError::IntegrityFailed)
        );
        assert_eq!(
            decrypt_text(r#"{"v":1,"a":"AES","s":"zz","iv":"00","ct":"","mac":"00"}"#, "pw"),
            Err(CryptoError::IntegrityFailed)
        );
    }

    #[test]
    fn test_wrong_passphrase_fails_integrity() {
        let envelope = encrypt_text("secret", "right", Algorithm::TripleDes).unwrap();
        assert_eq!(
            decrypt_text(&envelope, "wrong"),
            Err(CryptoError::IntegrityFailed)
        );
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(
            decrypt_text("not json", "pw"),
            Err(CryptoError::InvalidPayload)
        );
        assert_eq!(
            decrypt_text(r#"{"v":1,"a":"AES","s":"00","iv":"00","ct":""}"#, "pw"),
            Err(CryptoError::InvalidPayload)
        );
        assert_eq!(
            decrypt_text(
                r#"{"v":1,"a":7,"s":"00","iv":"00","ct":"","mac":""}"#,
                "pw"
            ),
            Err(CryptoError::InvalidPayload)
        );
    }

    #[test]
    fn test_any_other_version_value_is_unsupported() {
        for (raw, reported) in [
            (r#""1""#, r#""1""#),
            ("2.0", "2.0"),
            ("-1", "-1"),
            ("1.0", "1.0"),
            ("null", "null"),
        ] {
            assert_eq!(
                decrypt_text(&with_version(raw), "pw"),
                Err(CryptoError::UnsupportedVersion(reported.into())),
                "v = {raw}"
            );
        }
    }

    #[test]
    fn test_unknown_algorithm_is_rejected_after_integrity() {
        let unsigned = r#"{"v":1,"a":"RC4","s":"00","iv":"00","ct":"","mac":""}"#;
        assert_eq!(
            decrypt_text(unsigned, "pw"),
            Err(CryptoError::IntegrityFailed)
        );
        let signed = forge_fields("pw", "RC4", &hex::encode([7u8; SALT_LEN]), &[0u8; 16]);
        assert_eq!(
            decrypt_text(&signed, "pw"),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_authenticated_non_hex_salt_fails_decryption() {
        let envelope = forge_fields("pw", "AES", "not-hex", &[0u8; 16]);
        assert_eq!(
            decrypt_text(&envelope, "pw"),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_version_checked_before_integrity() {
        let envelope = encrypt_text("secret", "pw", Algorithm::Aes).unwrap();
        let bumped = tamper(&envelope, "v", |v| *v = Value::from(2));
        assert_eq!(
            decrypt_text(&bumped, "pw"),
            Err(CryptoError::UnsupportedVersion("2".into()))
        );
    }

    #[test]
    fn test_authenticated_garbage_fails_decryption() {
        // Not a multiple of the block size, so padding removal must fail.
        let envelope = forge("pw", Algorithm::Aes, &[1, 2, 3]);
        assert_eq!(
            decrypt_text(&envelope, "pw"),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_empty_plaintext_is_decryption_failure() {
        let envelope = encrypt_text("", "pw", Algorithm::Des).unwrap();
        assert_eq!(
            decrypt_text(&envelope, "pw"),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(CryptoError::InvalidPayload.kind(), "InvalidPayload");
        assert_eq!(CryptoError::UnsupportedVersion("3".into()).kind(), "UnsupportedVersion");
        assert_eq!(CryptoError::IntegrityFailed.kind(), "IntegrityFailed");
        assert_eq!(CryptoError::DecryptionFailed.kind(), "DecryptionFailed");
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::from_name(algorithm.name()), Some(algorithm));
        }
        assert_eq!(Algorithm::from_name("aes"), None);
    }
}
