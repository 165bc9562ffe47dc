//! Configuration file management for `digestd`.
//!
//! Provides a TOML-based config file at `~/.config/digestd/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default. Mirrors
//! the options enumerated in the wire-level configuration table: batch
//! sizing, retry ceiling, outbound-call budget, scheduler cadence, the
//! stuck-`processing` reclaim window, and the news-source story limit and
//! time window, plus the endpoints for every external collaborator.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use digest_core::budget::{BudgetConfig, BudgetGuard};
use digest_core::handlers::HandlerConfig;
use digest_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub tunables: TunablesSection,
    pub collaborators: CollaboratorsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunablesSection {
    pub task_batch_size: i32,
    pub max_retry_count: i32,
    pub subrequest_limit: u32,
    pub subrequest_buffer: u32,
    pub cron_interval_minutes: u32,
    pub processing_timeout_seconds: i64,
    pub hn_story_limit: usize,
    pub hn_time_window_hours: i64,
}

impl Default for TunablesSection {
    fn default() -> Self {
        let budget = BudgetConfig::default();
        let handler = HandlerConfig::default();
        Self {
            task_batch_size: handler.batch_size,
            max_retry_count: handler.max_retry_count,
            subrequest_limit: budget.subrequest_limit,
            subrequest_buffer: budget.subrequest_buffer,
            cron_interval_minutes: 10,
            processing_timeout_seconds: handler.processing_timeout_secs,
            hn_story_limit: handler.hn_story_limit,
            hn_time_window_hours: handler.hn_time_window_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsSection {
    /// Base URL of the news aggregator's JSON API, e.g.
    /// `https://hacker-news.firebaseio.com/v0`.
    pub news_source_base_url: String,
    /// Endpoint of the headless-browser article-rendering service.
    pub article_fetcher_endpoint: String,
    /// Chat-completion endpoint used for both translation and summarization.
    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,
    /// Local checkout to commit the rendered digest into. `None` disables
    /// the git publisher.
    pub git_repo_path: Option<String>,
    pub git_content_dir: Option<String>,
    pub git_commit_author: Option<String>,
    /// Chat-channel webhook URL. `None` disables the webhook publisher.
    pub webhook_url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the `digestd` config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/digestd` or
/// `~/.config/digestd`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support` on
/// macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("digestd");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("digestd")
}

/// Return the path to the `digestd` config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use by every `digestd` command.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub db_config: DbConfig,
    pub tunables: TunablesSection,
    pub collaborators: CollaboratorsSection,
}

impl DigestConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default, then validate the batch size against the outbound
    /// call budget (spec scenario 4: a batch size whose estimated cost
    /// exceeds `safeLimit` is rejected at startup, before any task is
    /// touched).
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("DIGEST_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let mut tunables = file_config
            .as_ref()
            .map(|c| c.tunables.clone())
            .unwrap_or_default();
        override_from_env(&mut tunables);

        let collaborators = match file_config {
            Some(cfg) => cfg.collaborators,
            None => bail!(
                "no collaborator endpoints configured; run `digestd init` to create a config file"
            ),
        };

        if !(1..=10).contains(&tunables.task_batch_size) {
            bail!(
                "TASK_BATCH_SIZE must be in 1..=10, got {}",
                tunables.task_batch_size
            );
        }

        let budget = BudgetGuard::new(BudgetConfig {
            subrequest_limit: tunables.subrequest_limit,
            subrequest_buffer: tunables.subrequest_buffer,
        });
        budget
            .validate_batch_size(tunables.task_batch_size as u32)
            .context("startup config validation failed")?;

        Ok(Self {
            db_config,
            tunables,
            collaborators,
        })
    }

    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            batch_size: self.tunables.task_batch_size,
            max_retry_count: self.tunables.max_retry_count,
            processing_timeout_secs: self.tunables.processing_timeout_seconds,
            hn_story_limit: self.tunables.hn_story_limit,
            hn_time_window_hours: self.tunables.hn_time_window_hours,
        }
    }

    pub fn budget_config(&self) -> BudgetConfig {
        BudgetConfig {
            subrequest_limit: self.tunables.subrequest_limit,
            subrequest_buffer: self.tunables.subrequest_buffer,
        }
    }
}

/// Apply environment-variable overrides on top of config-file/default
/// tunables, per the resolution chain (CLI flags for tunables are not
/// exposed; env vars are the documented override mechanism).
fn override_from_env(tunables: &mut TunablesSection) {
    fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|v| v.parse().ok())
    }

    if let Some(v) = parse_env::<i32>("TASK_BATCH_SIZE") {
        tunables.task_batch_size = v;
    }
    if let Some(v) = parse_env::<i32>("MAX_RETRY_COUNT") {
        tunables.max_retry_count = v;
    }
    if let Some(v) = parse_env::<u32>("SUBREQUEST_LIMIT") {
        tunables.subrequest_limit = v;
    }
    if let Some(v) = parse_env::<u32>("SUBREQUEST_BUFFER") {
        tunables.subrequest_buffer = v;
    }
    if let Some(v) = parse_env::<u32>("CRON_INTERVAL_MINUTES") {
        tunables.cron_interval_minutes = v;
    }
    if let Some(v) = parse_env::<i64>("PROCESSING_TIMEOUT_SECONDS") {
        tunables.processing_timeout_seconds = v;
    }
    if let Some(v) = parse_env::<usize>("HN_STORY_LIMIT") {
        tunables.hn_story_limit = v;
    }
    if let Some(v) = parse_env::<i64>("HN_TIME_WINDOW_HOURS") {
        tunables.hn_time_window_hours = v;
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sample_collaborators() -> CollaboratorsSection {
        CollaboratorsSection {
            news_source_base_url: "https://hacker-news.firebaseio.com/v0".to_owned(),
            article_fetcher_endpoint: "https://fetcher.example.com/fetch".to_owned(),
            llm_endpoint: "https://llm.example.com/v1/chat/completions".to_owned(),
            llm_api_key: "sk-test".to_owned(),
            llm_model: "gpt-4o-mini".to_owned(),
            git_repo_path: Some("/tmp/digest-repo".to_owned()),
            git_content_dir: Some("_posts".to_owned()),
            git_commit_author: Some("digestd".to_owned()),
            webhook_url: None,
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_owned(),
            },
            tunables: TunablesSection::default(),
            collaborators: sample_collaborators(),
        };
        save_config(&original).unwrap();

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(
            loaded.collaborators.news_source_base_url,
            original.collaborators.news_source_base_url
        );

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn resolve_with_cli_flag_overrides_env_and_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        unsafe { std::env::set_var("DIGEST_DATABASE_URL", "postgresql://env:5432/envdb") };

        save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://file:5432/filedb".to_owned(),
            },
            tunables: TunablesSection::default(),
            collaborators: sample_collaborators(),
        })
        .unwrap();

        let config = DigestConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
        unsafe { std::env::remove_var("DIGEST_DATABASE_URL") };
    }

    #[test]
    fn resolve_rejects_batch_size_exceeding_budget() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        unsafe { std::env::remove_var("DIGEST_DATABASE_URL") };
        unsafe { std::env::set_var("TASK_BATCH_SIZE", "12") };

        let mut tunables = TunablesSection::default();
        tunables.task_batch_size = 6; // file value, overridden by env below
        save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://localhost:5432/digest".to_owned(),
            },
            tunables,
            collaborators: sample_collaborators(),
        })
        .unwrap();

        let result = DigestConfig::resolve(None);

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
        unsafe { std::env::remove_var("TASK_BATCH_SIZE") };

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("startup config validation failed")
                || format!("{err:#}").contains("BatchSizeExceedsBudget"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn resolve_errors_without_config_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        unsafe { std::env::remove_var("DIGEST_DATABASE_URL") };

        let result = DigestConfig::resolve(None);

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("digestd/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
