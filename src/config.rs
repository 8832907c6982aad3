use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for the wrap command, loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WrapConfig {
    /// Syntax assumed when the view has none
    pub default_syntax: String,
    /// Syntaxes treated as HTML-like markup (tag context lookup applies)
    pub markup_syntaxes: Vec<String>,
    /// Markup syntaxes with XML rules (case-sensitive, self-closing voids)
    pub xml_syntaxes: Vec<String>,
    pub stylesheet_syntaxes: Vec<String>,
    /// One level of indentation in expanded output
    pub indent: String,
    pub preview_cache_size: usize,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            default_syntax: "html".to_string(),
            markup_syntaxes: ["html", "xml", "xsl", "jsx", "vue", "svelte"]
                .map(String::from)
                .to_vec(),
            xml_syntaxes: ["xml", "xsl", "jsx"].map(String::from).to_vec(),
            stylesheet_syntaxes: ["css", "scss", "sass", "less", "sss", "stylus"]
                .map(String::from)
                .to_vec(),
            indent: "\t".to_string(),
            preview_cache_size: 32,
        }
    }
}

impl WrapConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: WrapConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Default location: `<config dir>/wrapabbr/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wrapabbr").join("config.toml"))
    }

    /// Load from `path` if given, else from the default location when it
    /// exists, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
