//! Table-driven tests for configuration loading and validation.

use gradeflow::config::{load_config_from_str, EmbedderKind};
use gradeflow::model::Severity;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "database_path": "/var/lib/gradeflow/gradeflow.db",
            "worker_count": 4,
            "queue_capacity": 16,
            "ocr": { "languages": ["eng", "deu"], "dpi": 300 },
            "scoring": {
                "correct_threshold": 0.85,
                "partially_correct_threshold": 0.55,
                "embedder": { "kind": "hashing", "dimension": 512 }
            },
            "detection": {
                "num_permutations": 64,
                "exact_copy_threshold": 0.9,
                "paraphrase_threshold": 0.75,
                "max_features": 2000,
                "stopwords": ["essay", "answer"]
            },
            "penalties": { "easy": 0.1, "medium": 0.3, "hard": 0.6 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "missing_version",
        config_json: r#"{ "worker_count": 2 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_field",
        config_json: r#"{ "version": "1.0", "input_directory": "/in" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "zero_workers",
        config_json: r#"{ "version": "1.0", "worker_count": 0 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "penalty_above_one",
        config_json: r#"{ "version": "1.0", "penalties": { "hard": 1.5 } }"#,
        should_succeed: false,
        expected_error: Some("penalties.hard must be within [0, 1]"),
    },
    ConfigTestCase {
        name: "inverted_correctness_thresholds",
        config_json: r#"{
            "version": "1.0",
            "scoring": { "correct_threshold": 0.4, "partially_correct_threshold": 0.6 }
        }"#,
        should_succeed: false,
        expected_error: Some("exceeds scoring.correct_threshold"),
    },
    ConfigTestCase {
        name: "too_few_permutations",
        config_json: r#"{ "version": "1.0", "detection": { "num_permutations": 1 } }"#,
        should_succeed: false,
        expected_error: Some("num_permutations must be at least 2"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0", "#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_json_config_loading() {
    for test_case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}' should succeed but failed: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            let error = match result {
                Ok(_) => panic!("Test '{}' should fail but succeeded", test_case.name),
                Err(e) => e.to_string(),
            };
            if let Some(expected) = test_case.expected_error {
                assert!(
                    error.contains(expected),
                    "Test '{}': expected error containing '{}', got '{}'",
                    test_case.name,
                    expected,
                    error
                );
            }
        }
    }
}

#[test]
fn test_full_config_values() {
    let config = load_config_from_str(JSON_CONFIG_TESTS[1].config_json).unwrap();

    assert_eq!(config.worker_count, 4);
    assert_eq!(config.queue_capacity(), 16);
    assert_eq!(config.ocr.languages, vec!["eng", "deu"]);
    assert_eq!(config.scoring.embedder.kind, EmbedderKind::Hashing);
    assert_eq!(config.scoring.embedder.dimension, 512);
    assert_eq!(config.detection.num_permutations, 64);
    assert_eq!(
        config.detection.stopwords,
        Some(vec!["essay".to_string(), "answer".to_string()])
    );
    assert_eq!(config.penalties.fraction(Severity::Medium), 0.3);
    assert_eq!(config.penalties.fraction(Severity::Hard), 0.6);
}

#[test]
fn test_minimal_config_defaults() {
    let config = load_config_from_str(JSON_CONFIG_TESTS[0].config_json).unwrap();

    assert!(config.database_path.is_none());
    assert_eq!(config.queue_capacity(), config.worker_count * 2);
    assert_eq!(config.detection.exact_copy_threshold, 0.5);
    assert_eq!(config.penalties.fraction(Severity::Easy), 0.1);
    assert_eq!(config.penalties.fraction(Severity::Medium), 0.25);
    assert_eq!(config.penalties.fraction(Severity::Hard), 0.5);
}
