use crate::errors::ConfigError;
use crate::model::SuiteConfig;
use std::collections::HashSet;
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

pub fn load_config(path: &Path, strict: bool) -> Result<SuiteConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)
        .map_err(|ConfigError(msg)| ConfigError(format!("{} (file: {})", msg, path.display())))?;
    normalize_paths(&mut cfg, path);
    Ok(cfg)
}

/// Parses and checks a suite without touching the filesystem.
pub fn parse_config(raw: &str, strict: bool) -> Result<SuiteConfig, ConfigError> {
    let mut ignored_keys = HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: SuiteConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // YAML anchors conventionally live under x-* / _* keys
    let mut unknown: Vec<_> = ignored_keys
        .into_iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    unknown.sort();
    if !unknown.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?}",
                unknown
            )));
        }
        tracing::warn!(event = "config_unknown_fields", fields = ?unknown, "ignored unknown config fields");
    }

    if cfg.version != 0 && cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: 0, {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    if cfg.is_legacy() {
        tracing::warn!(
            event = "config_legacy_version",
            suite = %cfg.suite,
            "configVersion missing; add `configVersion: {}`",
            SUPPORTED_CONFIG_VERSION
        );
    }

    check_suite(&cfg)?;
    Ok(cfg)
}

fn check_suite(cfg: &SuiteConfig) -> Result<(), ConfigError> {
    if cfg.suite.trim().is_empty() {
        return Err(ConfigError("suite name must not be empty".into()));
    }
    if cfg.snapshot.from.trim().is_empty() || cfg.snapshot.to.trim().is_empty() {
        return Err(ConfigError("snapshot.from and snapshot.to are required".into()));
    }
    if cfg.scenarios.is_empty() {
        return Err(ConfigError("config has no scenarios".into()));
    }
    if cfg.settings.timeout_seconds == Some(0) || cfg.settings.setup_timeout_seconds == Some(0) {
        return Err(ConfigError("timeouts must be at least 1 second".into()));
    }

    let mut seen = HashSet::new();
    for sc in &cfg.scenarios {
        if sc.id.trim().is_empty() {
            return Err(ConfigError("scenario id must not be empty".into()));
        }
        if !seen.insert(sc.id.as_str()) {
            return Err(ConfigError(format!("duplicate scenario id '{}'", sc.id)));
        }
        if sc.timeout_seconds == Some(0) {
            return Err(ConfigError(format!(
                "scenario '{}': timeout must be at least 1 second",
                sc.id
            )));
        }
    }
    Ok(())
}

/// Relative snapshot directories are anchored at the config file's directory.
fn normalize_paths(cfg: &mut SuiteConfig, config_path: &Path) {
    if cfg.snapshot.dir.is_relative() {
        let base = config_path.parent().unwrap_or(Path::new("."));
        cfg.snapshot.dir = base.join(&cfg.snapshot.dir);
    }
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

pub const SAMPLE_CONFIG: &str = r#"configVersion: 1
suite: demo
snapshot:
  dir: db
  file: "demo-{stage}.db"
  from: "01"
  to: "02"
settings:
  timeout_seconds: 60
  setup_timeout_seconds: 60
tables:
  GENRES: genres
scenarios:
  - id: genre_count
    name: should count all genres
    query: SELECT COUNT(*) AS count FROM {{GENRES}}
    expect:
      row: { count: 20 }
  - id: first_genres
    name: should list the first three genres alphabetically
    query: |
      SELECT genre
      FROM {{GENRES}}
      ORDER BY genre
      LIMIT 3
    expect:
      rows:
        - { genre: Action }
        - { genre: Adventure }
        - { genre: Animation }
"#;
