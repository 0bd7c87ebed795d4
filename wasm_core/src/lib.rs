use console_error_panic_hook::set_once as set_panic_hook;
use log::LevelFilter;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod diff;
mod logging;
pub mod password;
pub mod symmetric;

use diff::{render_unified, DiffConfig, DiffResult, NormalizationSettings};
use password::PasswordRequest;
use symmetric::{Algorithm, CryptoError};

#[wasm_bindgen(start)]
pub fn wasm_start() {
    set_panic_hook();
    logging::init(LevelFilter::Info);
}

/// Adjusts console verbosity: off, error, warn, info, debug or trace.
#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    logging::init(logging::parse_level(level));
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

pub(crate) fn normalization_from_js(value: JsValue) -> Result<NormalizationSettings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(NormalizationSettings::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn password_request_from_js(value: JsValue) -> Result<PasswordRequest, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(PasswordRequest::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

#[wasm_bindgen]
pub fn compute_text_diff(
    old_text: &str,
    new_text: &str,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    let settings = normalization_from_js(settings)?;
    to_js(&compute_text_diff_internal(old_text, new_text, &settings))
}

fn compute_text_diff_internal(
    old_text: &str,
    new_text: &str,
    settings: &NormalizationSettings,
) -> DiffResult {
    DiffResult::new(diff::compute_diff(old_text, new_text, settings))
}

#[wasm_bindgen]
pub fn generate_unified_text_diff(
    old_text: &str,
    new_text: &str,
    old_name: &str,
    new_name: &str,
    settings: JsValue,
) -> Result<String, JsValue> {
    let settings = normalization_from_js(settings)?;
    Ok(unified_text_diff_internal(
        old_text, new_text, old_name, new_name, &settings,
    ))
}

fn unified_text_diff_internal(
    old_text: &str,
    new_text: &str,
    old_name: &str,
    new_name: &str,
    settings: &NormalizationSettings,
) -> String {
    let lines = diff::compute_diff(old_text, new_text, settings);
    render_unified(&lines, old_name, new_name, &DiffConfig::default())
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PasswordBatch {
    passwords: Vec<String>,
    entropy_bits: u32,
}

#[wasm_bindgen]
pub fn generate_password(request: JsValue) -> Result<JsValue, JsValue> {
    let request = password_request_from_js(request)?;
    to_js(&password::generate_password(&request))
}

#[wasm_bindgen]
pub fn generate_passwords(request: JsValue, count: usize) -> Result<JsValue, JsValue> {
    let request = password_request_from_js(request)?;
    to_js(&generate_passwords_internal(&request, count))
}

fn generate_passwords_internal(request: &PasswordRequest, count: usize) -> PasswordBatch {
    PasswordBatch {
        passwords: password::generate_batch(request, count),
        entropy_bits: password::estimate_entropy_bits(request),
    }
}

#[wasm_bindgen]
pub fn supported_algorithms() -> Result<JsValue, JsValue> {
    let names: Vec<&str> = Algorithm::ALL.iter().map(|algo| algo.name()).collect();
    to_js(&names)
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct CryptoFailure {
    kind: &'static str,
    message: String,
}

impl From<&CryptoError> for CryptoFailure {
    fn from(err: &CryptoError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn crypto_error_to_js(err: CryptoError) -> JsValue {
    to_js(&CryptoFailure::from(&err)).unwrap_or_else(|_| JsValue::from_str(err.kind()))
}

#[wasm_bindgen]
pub fn encrypt_text(plaintext: &str, passphrase: &str, algorithm: &str) -> Result<String, JsValue> {
    let algorithm = parse_algorithm(algorithm).map_err(|err| JsValue::from_str(&err))?;
    symmetric::encrypt_text(plaintext, passphrase, algorithm).map_err(crypto_error_to_js)
}

fn parse_algorithm(name: &str) -> Result<Algorithm, String> {
    Algorithm::from_name(name.trim()).ok_or_else(|| format!("unsupported algorithm {}", name))
}

#[wasm_bindgen]
pub fn decrypt_text(envelope: &str, passphrase: &str) -> Result<String, JsValue> {
    symmetric::decrypt_text(envelope, passphrase).map_err(crypto_error_to_js)
}

pub(crate) fn fill_random(buf: &mut [u8]) {
    getrandom::fill(buf).expect("randomness available");
}

#[cfg(test)]
mod lib_tests;
