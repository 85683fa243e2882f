use gallery_rotator::config::{Configuration, SearchOptions};
use std::io::Write;
use std::time::Duration;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.default_query, "Elton John");
    assert_eq!(cfg.search.endpoint, "https://itunes.apple.com/search");
    assert_eq!(cfg.search.limit, SearchOptions::MAX_LIMIT);
    assert_eq!(cfg.search.media, "music");
    assert_eq!(cfg.search.image_field, "artworkUrl100");
    assert_eq!(cfg.rotation.interval, Duration::from_secs(2));
    assert_eq!(cfg.rotation.seed, None);
    assert!(cfg.validated().is_ok());
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
default-query: "Radiohead"
search:
  endpoint: "http://localhost:8080/search"
  limit: 100
  image-field: "artworkUrl60"
  timeout: 750ms
  user-agent: "frame/1"
rotation:
  interval: 1s 500ms
  seed: 7
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.default_query, "Radiohead");
    assert_eq!(cfg.search.limit, 100);
    assert_eq!(cfg.search.media, "music");
    assert_eq!(cfg.search.image_field, "artworkUrl60");
    assert_eq!(cfg.search.timeout, Duration::from_millis(750));
    assert_eq!(cfg.search.user_agent, "frame/1");
    assert_eq!(cfg.rotation.interval, Duration::from_millis(1500));
    assert_eq!(cfg.rotation.seed, Some(7));
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.search.endpoint_url().unwrap().port(), Some(8080));
}

#[test]
fn unparseable_duration_is_rejected() {
    let yaml = r#"
rotation:
  interval: "soon"
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn blank_default_query_fails_validation() {
    let yaml = r#"
default-query: "   "
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("default-query"), "{err}");
}

#[test]
fn zero_interval_fails_validation() {
    let yaml = r#"
rotation:
  interval: 0s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn limit_outside_provider_range_fails_validation() {
    for limit in [0, SearchOptions::MAX_LIMIT + 1] {
        let yaml = format!("search:\n  limit: {limit}\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "limit {limit} accepted");
    }
}

#[test]
fn non_http_endpoint_fails_validation() {
    for endpoint in ["ftp://itunes.apple.com/search", "not a url"] {
        let yaml = format!("search:\n  endpoint: \"{endpoint}\"\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "{endpoint} accepted");
    }
}

#[test]
fn loads_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "default-query: \"Daft Punk\"").unwrap();
    writeln!(file, "rotation:\n  interval: 3s").unwrap();

    let cfg = Configuration::from_yaml_file(file.path())
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.default_query, "Daft Punk");
    assert_eq!(cfg.rotation.interval, Duration::from_secs(3));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Configuration::from_yaml_file(dir.path().join("absent.yaml")).is_err());
}
