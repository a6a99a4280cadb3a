// ABOUTME: Data-driven conformance runner for the PackStream decoder.
// ABOUTME: Loads JSON vectors from tests/conformance/ and checks value, consumed length or error type.

use regex::Regex;
use serde_json::Value as JsonValue;
use serde_packstream::{
    decode, decode_with_config, DecoderConfig, DuplicateKeyMode, Error, Map, Struct, Utf8Mode,
    Value,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Known option names that this test runner supports.
const KNOWN_OPTIONS: &[&str] = &[
    "max_depth",
    "max_container_size",
    "max_string_length",
    "duplicate_key",
    "utf8",
];

/// Known error types produced by the decoder.
const KNOWN_ERROR_TYPES: &[&str] = &[
    "truncated",
    "unknown_marker",
    "invalid_map_key",
    "recursion_limit_exceeded",
    "invalid_utf8",
    "duplicate_key",
    "max_string_length_exceeded",
    "max_container_size_exceeded",
];

fn vector_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/conformance")
        .join(file)
}

/// Convert a hex string (with optional spaces) to bytes.
fn hex_to_bytes(s: &str) -> Vec<u8> {
    let hex: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

/// Convert an expected value from its JSON notation.
///
/// `{"$bytes": "<hex>"}` and `{"$struct": {"tag": n, "fields": [...]}}` mark
/// the types JSON cannot express directly.
fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap()),
        },
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        JsonValue::Object(obj) => {
            if obj.len() == 1 {
                if let Some(hex) = obj.get("$bytes").and_then(JsonValue::as_str) {
                    return Value::Bytes(hex_to_bytes(hex));
                }
                if let Some(s) = obj.get("$struct") {
                    let tag = s["tag"].as_u64().unwrap();
                    let fields = s["fields"].as_array().unwrap();
                    return Value::Struct(Struct::new(
                        u8::try_from(tag).unwrap(),
                        fields.iter().map(json_to_value).collect(),
                    ));
                }
            }
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.clone(), json_to_value(v));
            }
            Value::Map(map)
        }
    }
}

/// Structural problems in a vector file, reported before any test runs.
#[derive(Debug)]
struct ValidationError(String);

fn validate_version(doc: &JsonValue) -> Result<(), ValidationError> {
    let version = doc["version"]
        .as_str()
        .ok_or_else(|| ValidationError("missing version".into()))?;
    let semver = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
    if !semver.is_match(version) {
        return Err(ValidationError(format!("invalid version: {version}")));
    }
    Ok(())
}

fn validate_test(
    test: &JsonValue,
    name_pattern: &Regex,
    hex_pattern: &Regex,
    seen_names: &mut HashSet<String>,
) -> Result<(), ValidationError> {
    let name = test["name"]
        .as_str()
        .ok_or_else(|| ValidationError("test without name".into()))?;
    if !name_pattern.is_match(name) {
        return Err(ValidationError(format!("invalid test name: {name}")));
    }
    if !seen_names.insert(name.to_string()) {
        return Err(ValidationError(format!("duplicate test name: {name}")));
    }
    if test["type"].as_str() != Some("decode") {
        return Err(ValidationError(format!("{name}: unsupported test type")));
    }

    let input = test["input"]
        .as_str()
        .ok_or_else(|| ValidationError(format!("{name}: missing input")))?;
    if !hex_pattern.is_match(input) {
        return Err(ValidationError(format!("{name}: input is not hex")));
    }

    let has_value = test.get("expected_value").is_some();
    let has_error = test.get("expected_error").is_some();
    if has_value == has_error {
        return Err(ValidationError(format!(
            "{name}: needs exactly one of expected_value and expected_error"
        )));
    }
    if has_value && test["expected_consumed"].as_u64().is_none() {
        return Err(ValidationError(format!("{name}: missing expected_consumed")));
    }
    if let Some(err) = test.get("expected_error") {
        let err = err.as_str().unwrap_or_default();
        if !KNOWN_ERROR_TYPES.contains(&err) {
            return Err(ValidationError(format!("{name}: unknown error type {err}")));
        }
    }
    if let Some(options) = test.get("options").and_then(JsonValue::as_object) {
        for key in options.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                return Err(ValidationError(format!("{name}: unknown option {key}")));
            }
        }
    }
    Ok(())
}

fn config_from_options(options: Option<&JsonValue>) -> DecoderConfig {
    let mut config = DecoderConfig::default();
    let Some(options) = options else {
        return config;
    };
    if let Some(max_depth) = options.get("max_depth").and_then(JsonValue::as_u64) {
        config.max_depth = max_depth as usize;
    }
    if let Some(max_size) = options.get("max_container_size").and_then(JsonValue::as_u64) {
        config.max_container_size = max_size as usize;
    }
    if let Some(max_len) = options.get("max_string_length").and_then(JsonValue::as_u64) {
        config.max_string_length = max_len as usize;
    }
    match options.get("duplicate_key").and_then(JsonValue::as_str) {
        Some("error") => config.duplicate_key_mode = DuplicateKeyMode::Error,
        Some("keep_first") => config.duplicate_key_mode = DuplicateKeyMode::KeepFirst,
        Some("keep_last") => config.duplicate_key_mode = DuplicateKeyMode::KeepLast,
        _ => {}
    }
    if options.get("utf8").and_then(JsonValue::as_str) == Some("lossy") {
        config.utf8 = Utf8Mode::Lossy;
    }
    config
}

/// Run a single test case.
fn run_test(test: &JsonValue) -> Result<(), String> {
    let name = test["name"].as_str().unwrap_or("unnamed");
    let input = hex_to_bytes(test["input"].as_str().unwrap_or_default());
    let config = config_from_options(test.get("options"));

    let result = decode_with_config(&input, 0, config);

    if let Some(expected_error) = test.get("expected_error").and_then(JsonValue::as_str) {
        return match result {
            Err(err) if err.error_type() == expected_error => Ok(()),
            Err(err) => Err(format!("{name}: expected {expected_error}, got {}", err.error_type())),
            Ok((value, _)) => Err(format!("{name}: expected {expected_error}, decoded {value:?}")),
        };
    }

    let expected = json_to_value(&test["expected_value"]);
    let expected_consumed = test["expected_consumed"].as_u64().unwrap_or_default() as usize;
    match result {
        Ok((value, consumed)) if value == expected && consumed == expected_consumed => Ok(()),
        Ok((value, consumed)) => Err(format!(
            "{name}: expected ({expected:?}, {expected_consumed}), got ({value:?}, {consumed})"
        )),
        Err(err) => Err(format!("{name}: unexpected error {err}")),
    }
}

/// Truncating a successful vector by its last consumed byte must fail with `Truncated`.
fn run_truncation_check(test: &JsonValue) -> Result<(), String> {
    if test.get("expected_value").is_none() || test.get("options").is_some() {
        return Ok(());
    }
    let name = test["name"].as_str().unwrap_or("unnamed");
    let input = hex_to_bytes(test["input"].as_str().unwrap_or_default());
    let consumed = test["expected_consumed"].as_u64().unwrap_or_default() as usize;
    match decode(&input[..consumed - 1], 0) {
        Err(Error::Truncated) => Ok(()),
        other => Err(format!("{name}: truncated input gave {other:?}")),
    }
}

/// Validate and run every test in a vector file; returns (passed, failures).
fn run_test_file(path: &Path) -> (usize, Vec<String>) {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()));
    let doc: JsonValue = serde_json::from_str(&text)
        .unwrap_or_else(|err| panic!("invalid JSON in {}: {err}", path.display()));

    validate_version(&doc)
        .unwrap_or_else(|ValidationError(msg)| panic!("{}: {msg}", path.display()));
    let tests = doc["tests"].as_array().expect("tests array");

    let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    let hex_pattern = Regex::new(r"^(\s*[0-9a-fA-F]{2})*\s*$").unwrap();
    let mut seen_names = HashSet::new();
    for test in tests {
        validate_test(test, &name_pattern, &hex_pattern, &mut seen_names)
            .unwrap_or_else(|ValidationError(msg)| panic!("{}: {msg}", path.display()));
    }

    let mut passed = 0;
    let mut failures = Vec::new();
    for test in tests {
        match run_test(test).and_then(|()| run_truncation_check(test)) {
            Ok(()) => passed += 1,
            Err(msg) => failures.push(msg),
        }
    }
    (passed, failures)
}

fn assert_file_passes(file: &str) {
    let (passed, failures) = run_test_file(&vector_path(file));
    for failure in &failures {
        eprintln!("{failure}");
    }
    assert!(failures.is_empty(), "{} failures in {file}", failures.len());
    assert!(passed > 0, "no tests in {file}");
    eprintln!("{file}: {passed} passed");
}

#[test]
fn test_conformance_scalars() {
    assert_file_passes("scalars.json");
}

#[test]
fn test_conformance_strings() {
    assert_file_passes("strings.json");
}

#[test]
fn test_conformance_containers() {
    assert_file_passes("containers.json");
}

#[test]
fn test_conformance_structs() {
    assert_file_passes("structs.json");
}

#[test]
fn test_conformance_errors() {
    assert_file_passes("errors.json");
}

#[test]
fn test_runner_validation_rejects_bad_vectors() {
    let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    let hex_pattern = Regex::new(r"^(\s*[0-9a-fA-F]{2})*\s*$").unwrap();
    let mut seen = HashSet::new();

    let bad_name = serde_json::json!({"name": "Bad-Name", "type": "decode", "input": "00", "expected_error": "truncated"});
    assert!(validate_test(&bad_name, &name_pattern, &hex_pattern, &mut seen).is_err());

    let bad_hex = serde_json::json!({"name": "bad_hex", "type": "decode", "input": "0g", "expected_error": "truncated"});
    assert!(validate_test(&bad_hex, &name_pattern, &hex_pattern, &mut seen).is_err());

    let both = serde_json::json!({
        "name": "both", "type": "decode", "input": "00",
        "expected_value": 0, "expected_consumed": 1, "expected_error": "truncated"
    });
    assert!(validate_test(&both, &name_pattern, &hex_pattern, &mut seen).is_err());

    let unknown_option = serde_json::json!({
        "name": "unknown_option", "type": "decode", "input": "00",
        "options": {"allow_nan": true}, "expected_value": 0, "expected_consumed": 1
    });
    assert!(validate_test(&unknown_option, &name_pattern, &hex_pattern, &mut seen).is_err());

    let good = serde_json::json!({"name": "good", "type": "decode", "input": "c8 45", "expected_value": 69, "expected_consumed": 2});
    assert!(validate_test(&good, &name_pattern, &hex_pattern, &mut seen).is_ok());
    assert!(validate_test(&good, &name_pattern, &hex_pattern, &mut seen).is_err());
}

#[test]
fn test_every_undefined_marker_is_rejected() {
    for byte in 0..=u8::MAX {
        let defined = serde_packstream::Marker::classify(byte).is_some();
        match decode(&[byte], 0) {
            Err(Error::UnknownMarker(b)) => {
                assert!(!defined, "0x{byte:02x} is defined but was rejected");
                assert_eq!(b, byte);
            }
            _ => assert!(defined, "0x{byte:02x} is undefined but was accepted"),
        }
    }
}
