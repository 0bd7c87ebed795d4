use super::*;
use crate::diff::{ChangeKind, DiffStats};
use crate::password::{CharClass, MAX_BATCH};

#[test]
fn compute_text_diff_internal_counts_lines() {
    let result = compute_text_diff_internal(
        "line 1\nline 2\nline 3",
        "line 1\nline 2\nline 4",
        &NormalizationSettings::default(),
    );
    assert_eq!(
        result.stats,
        DiffStats {
            additions: 1,
            deletions: 1,
            unchanged: 2,
        }
    );
    assert_eq!(result.lines.len(), 4);
}

#[test]
fn compute_text_diff_internal_serializes_camel_case() {
    let result = compute_text_diff_internal("a", "b", &NormalizationSettings::default());
    let json = serde_json::to_value(&result).expect("serialize diff");
    let first = &json["lines"][0];
    assert_eq!(first["kind"], "removed");
    assert_eq!(first["oldLine"], 1);
    assert!(first["newLine"].is_null());
    assert_eq!(first["spans"][0]["kind"], "removed");
    assert_eq!(first["spans"][0]["text"], "a");
}

#[test]
fn unchanged_lines_omit_spans_in_json() {
    let result = compute_text_diff_internal("same", "same", &NormalizationSettings::default());
    let json = serde_json::to_value(&result).expect("serialize diff");
    assert!(json["lines"][0].get("spans").is_none());
}

#[test]
fn normalization_settings_deserialize_with_defaults() {
    let settings: NormalizationSettings =
        serde_json::from_str(r#"{"ignoreCase":true}"#).expect("settings");
    assert!(settings.ignore_case);
    assert!(!settings.ignore_punctuation);
    assert!(!settings.ignore_whitespace);
}

#[test]
fn ignore_punctuation_end_to_end() {
    let settings = NormalizationSettings {
        ignore_punctuation: true,
        ..Default::default()
    };
    let result = compute_text_diff_internal("Hello, world!", "Hello world", &settings);
    assert_eq!(result.lines.len(), 1);
    assert_eq!(result.lines[0].kind, ChangeKind::Unchanged);
}

#[test]
fn fullwidth_text_matches_halfwidth() {
    let result =
        compute_text_diff_internal("ＡＢＣ", "ABC", &NormalizationSettings::default());
    assert_eq!(result.stats.unchanged, 1);
}

#[test]
fn unified_text_diff_internal_marks_changes() {
    let diff = unified_text_diff_internal(
        "line 1\nline 2\nline 3",
        "line 1\nline 2\nline 4",
        "a/file.txt",
        "b/file.txt",
        &NormalizationSettings::default(),
    );
    assert!(diff.contains("--- a/file.txt"));
    assert!(diff.contains("+++ b/file.txt"));
    assert!(diff.contains("-line 3"));
    assert!(diff.contains("+line 4"));
}

#[test]
fn password_request_deserializes_from_page_shape() {
    let request: PasswordRequest = serde_json::from_str(
        r#"{"length":24,"classes":["lowercase","digits"],"excludeAmbiguous":true}"#,
    )
    .expect("request");
    assert_eq!(request.length, 24);
    assert_eq!(request.classes, vec![CharClass::Lowercase, CharClass::Digits]);
    assert!(request.exclude_ambiguous);

    let defaults: PasswordRequest = serde_json::from_str("{}").expect("defaults");
    assert_eq!(defaults, PasswordRequest::default());
}

#[test]
fn generate_passwords_internal_shares_entropy() {
    let request = PasswordRequest {
        length: 16,
        classes: vec![CharClass::Uppercase, CharClass::Lowercase, CharClass::Digits],
        exclude_ambiguous: false,
    };
    let batch = generate_passwords_internal(&request, 3);
    assert_eq!(batch.passwords.len(), 3);
    assert_eq!(batch.entropy_bits, 95);
    assert!(batch.passwords.iter().all(|p| p.len() == 16));
}

#[test]
fn generate_passwords_internal_caps_count() {
    let batch = generate_passwords_internal(&PasswordRequest::default(), MAX_BATCH + 1);
    assert_eq!(batch.passwords.len(), MAX_BATCH);
}

#[test]
fn parse_algorithm_accepts_envelope_names() {
    assert_eq!(parse_algorithm("AES"), Ok(Algorithm::Aes));
    assert_eq!(parse_algorithm(" TripleDES "), Ok(Algorithm::TripleDes));
    let err = parse_algorithm("Blowfish").unwrap_err();
    assert!(err.contains("unsupported"));
}

#[test]
fn crypto_failure_carries_kind_and_message() {
    let failure = CryptoFailure::from(&CryptoError::UnsupportedVersion("7".into()));
    assert_eq!(failure.kind, "UnsupportedVersion");
    assert!(failure.message.contains('7'));
}

#[test]
fn encrypt_then_decrypt_via_module_api() {
    let envelope =
        symmetric::encrypt_text("payload", "passphrase", Algorithm::Des).expect("encrypt ok");
    let plain = symmetric::decrypt_text(&envelope, "passphrase").expect("decrypt ok");
    assert_eq!(plain, "payload");
}
