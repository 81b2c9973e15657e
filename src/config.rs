//! Configuration for the vodhub server.
//!
//! Loaded from a TOML file. Every section falls back to defaults for
//! missing fields, so an empty file is a valid (if source-less)
//! configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vodhub_search::{CharFoldNormalizer, KeywordPolicy, SearchConfig, Source};

use crate::error::{Result, ServerError};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "VODHUB_CONFIG";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VodhubConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Search behaviour.
    pub search: SearchSettings,
    /// Upstream content-index sources, in priority order.
    pub sources: Vec<Source>,
    /// Content policy term lists.
    pub policy: PolicyConfig,
    /// Query locale normalization.
    pub locale: LocaleConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// Search behaviour shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Deadline for each upstream call, in seconds.
    pub per_call_timeout_secs: u64,
    /// `max-age`/`s-maxage` for cacheable responses, in seconds.
    pub cache_time_secs: u64,
    /// Whether the content policy applies when a request does not say.
    pub adult_filter: bool,
    /// Fixed User-Agent for upstream calls (rotated when unset).
    pub user_agent: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            per_call_timeout_secs: 20,
            cache_time_secs: 7200,
            adult_filter: true,
            user_agent: None,
        }
    }
}

/// Keyword lists for the content policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Matched against an item's category label.
    pub category_terms: Vec<String>,
    /// Matched against an item's title and category label.
    pub blocked_terms: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| (*t).to_owned()).collect();
        Self {
            category_terms: owned(&[
                "伦理片", "倫理片", "理论片", "福利", "里番动漫", "写真热舞", "三级片",
                "港台三级", "韩国伦理", "日本伦理",
            ]),
            blocked_terms: owned(&[
                "伦理片", "福利", "里番动漫", "门事件", "萝莉少女", "制服诱惑", "国产传媒",
                "cosplay", "黑丝诱惑", "无码", "日本无码", "有码", "日本有码", "SWAG",
                "网红主播", "色情片", "同性片", "福利视频", "福利片", "写真热舞", "倫理片",
                "理论片", "韩国伦理", "港台三级", "三级", "三级片", "电影解说", "伦理",
                "日本伦理", "赌博", "博彩", "赌场", "彩票", "棋牌", "老虎机", "百家乐",
                "真人视讯", "菠菜", "六合彩", "时时彩", "捕鱼", "斗地主", "德州扑克", "BBIN",
                "沙巴", "开元", "皇冠", "罪恶之渊",
            ]),
        }
    }
}

/// Query locale normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Single-character folding table, e.g. `"劇" = "剧"`. Empty disables
    /// normalization.
    pub fold: std::collections::BTreeMap<String, String>,
}

impl VodhubConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `$VODHUB_CONFIG` if set, else `vodhub/config.toml` under the user's
    /// config directory.
    pub fn default_config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("vodhub")
            .join("config.toml")
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for a zero timeout, duplicate or
    /// empty source keys, or a malformed fold table.
    pub fn validate(&self) -> Result<()> {
        if self.search.per_call_timeout_secs == 0 {
            return Err(ServerError::Config(
                "search.per_call_timeout_secs must be greater than 0".into(),
            ));
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.key.trim().is_empty() || source.api.trim().is_empty() {
                return Err(ServerError::Config(format!(
                    "source `{}` needs both a key and an api",
                    source.name
                )));
            }
            if !seen.insert(source.key.as_str()) {
                return Err(ServerError::Config(format!(
                    "duplicate source key `{}`",
                    source.key
                )));
            }
        }
        self.normalizer()?;
        Ok(())
    }

    /// Engine settings derived from the `[search]` section.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            per_call_timeout: Duration::from_secs(self.search.per_call_timeout_secs),
            user_agent: self.search.user_agent.clone(),
            ..SearchConfig::default()
        }
    }

    /// The keyword content policy from the `[policy]` section.
    pub fn keyword_policy(&self) -> KeywordPolicy {
        KeywordPolicy::new(&self.policy.category_terms, &self.policy.blocked_terms)
    }

    /// The fold normalizer from the `[locale]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if an entry is not one character to
    /// one character.
    pub fn normalizer(&self) -> Result<CharFoldNormalizer> {
        CharFoldNormalizer::from_pairs(
            self.locale
                .fold
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str())),
        )
        .map_err(|e| ServerError::Config(e.to_string()))
    }
}
