//! Configuration loading and schema definitions for regtest-collector.
//!
//! Configuration lives in a TOML file (`regtest.toml` by default). The
//! schema is described in [`schema`]; path fields accept `~` and `$VAR`.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Loads configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or does
/// not match the schema.
///
/// # Example
///
/// ```no_run
/// use regtest_collector::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("regtest.toml"))?;
/// println!("Interpreter: {}", config.collector.interpreter);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.expand_paths();

    Ok(config)
}

/// Loads configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("No config file at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Loads configuration from a TOML string.
///
/// # Example
///
/// ```
/// use regtest_collector::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [collector]
///     interpreter = "python3"
///     timeout_secs = 30
/// "#)?;
///
/// assert_eq!(config.collector.interpreter, "python3");
/// assert_eq!(config.collector.timeout_secs, Some(30));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content).context("Failed to parse config")?;
    config.expand_paths();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::paths::PathStyle;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_str("").unwrap();

        assert_eq!(config.collector.interpreter, "python");
        assert_eq!(config.collector.batch_pattern, "RegressionTest*.bat");
        assert_eq!(config.collector.script_pattern, "RegTest*.py");
        assert_eq!(config.collector.qualifier, "regtest.exe");
        assert!(config.collector.timeout().is_none());
        assert!(matches!(
            config.strategy,
            StrategyConfig::InProcess { ref root } if root == &PathBuf::from(".")
        ));
        assert_eq!(config.command.linux_home, "/home/user/.vs");
        assert_eq!(config.report.output, PathBuf::from("regtest-results.json"));
    }

    #[test]
    fn test_delegated_strategy() {
        let config = load_config_str(
            r#"
            [strategy]
            type = "delegated"
            script = "tools/collect.py"
            read_results_file = true

            [strategy.markers]
            command = "runner.exe"
            "#,
        )
        .unwrap();

        match config.strategy {
            StrategyConfig::Delegated {
                script,
                markers,
                read_results_file,
            } => {
                assert_eq!(script, PathBuf::from("tools/collect.py"));
                assert_eq!(markers.command, "runner.exe");
                assert_eq!(markers.test, "Test: ");
                assert!(read_results_file);
            }
            other => panic!("unexpected strategy {}", other.name()),
        }
    }

    #[test]
    fn test_delegated_requires_script() {
        assert!(load_config_str("[strategy]\ntype = \"delegated\"\n").is_err());
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = load_config_str("[strategy]\ntype = \"remote\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }

    #[test]
    fn test_transform_overrides() {
        let config = load_config_str(
            r#"
            [collector.transform]
            replace = ["run(command)"]
            remove_patterns = []
            "#,
        )
        .unwrap();

        let transform = &config.collector.transform;
        assert_eq!(transform.replacement, "print(command)");
        assert_eq!(transform.replace, ["run(command)"]);
        assert!(transform.remove_patterns.is_empty());
    }

    #[test]
    fn test_command_section_builds_builder() {
        let config = load_config_str(
            r#"
            [command]
            path_style = "posix"
            linux_home = "/opt/vs"
            "#,
        )
        .unwrap();

        assert_eq!(config.command.path_style, PathStyle::Posix);
        assert_eq!(config.command.builder().style(), PathStyle::Posix);
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = load_config_str(
            r#"
            [strategy]
            type = "in_process"
            root = "~/regression"
            "#,
        )
        .unwrap();

        let StrategyConfig::InProcess { root } = config.strategy else {
            panic!("expected in_process strategy");
        };
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with("regression"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_or_default(&dir.path().join("regtest.toml")).unwrap();
        assert_eq!(config.collector.interpreter, "python");
    }

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("regtest.toml");
        std::fs::write(&path, "[collector\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("regtest.toml"));
    }
}
