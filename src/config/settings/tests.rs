use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.matching.top_k, 3);
    assert!((config.matching.threshold - 0.5).abs() < f32::EPSILON);
    assert!((config.matching.high_score - 0.8).abs() < f32::EPSILON);
    assert!((config.classifier.confidence_threshold - 0.7).abs() < f32::EPSILON);
    assert!((config.classifier.zero_shot_floor - 0.3).abs() < f32::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.matching.threshold = 1.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.matching.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.classifier.zero_shot_floor = -0.1;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.actions.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_falls_back_to_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [ollama]
        host = "embeddings.internal"

        [matching]
        top_k = 5
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.ollama.host, "embeddings.internal");
    assert_eq!(parsed.ollama.port, 11434);
    assert_eq!(parsed.matching.top_k, 5);
    assert!((parsed.matching.threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(parsed.classifier, ClassifierConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load_from(&temp_dir.path().join("config.toml"))
        .expect("should load config successfully");
    assert_eq!(config, Config::default());
}

#[test]
fn base_dir_override_controls_paths() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config {
        base_dir: Some(temp_dir.path().to_path_buf()),
        ..Config::default()
    };

    let db_path = config.metadata_db_path().expect("path resolves");
    assert!(db_path.starts_with(temp_dir.path()));
    assert!(db_path.ends_with("metadata.db"));

    let log_path = config.query_log_path().expect("path resolves");
    assert!(log_path.ends_with("logs/query_log.csv"));

    let dataset_path = config.weekly_dataset_path().expect("path resolves");
    assert!(dataset_path.ends_with("retrain/weekly_dataset.csv"));
}
