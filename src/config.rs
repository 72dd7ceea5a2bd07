//! Configuration file support.
//!
//! A `.phpantom-docblock.toml` file lets a project adjust the tag factory
//! without code:
//!
//! ```toml
//! [tags]
//! # tag name = standard handler id
//! "phan-param" = "param"
//! "my-note" = "generic"
//!
//! [parameters]
//! resolve_types = true
//!
//! [context]
//! namespace = "App\\Models"
//!
//! [context.aliases]
//! Carbon = "Carbon\\Carbon"
//! ```
//!
//! # Lookup
//!
//! [`Config::discover`] checks, in order:
//!   1. `<workspace>/.phpantom-docblock.toml`
//!   2. `<user config dir>/phpantom/docblock.toml`
//!
//! A missing file means the default (empty) configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};

use crate::docblock::TagFactory;
use crate::error::{Error, Result};
use crate::types::TypeContext;

/// Name of the per-workspace configuration file.
pub const CONFIG_FILE_NAME: &str = ".phpantom-docblock.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tag name -> standard handler id.
    pub tags: BTreeMap<String, String>,
    /// Parameters passed to every handler.
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub namespace: String,
    pub aliases: BTreeMap<String, String>,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the configuration at `path`.  A file that does not exist yields
    /// the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        Self::from_toml_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Find and load the configuration for a workspace.
    pub fn discover(workspace_root: &Path) -> Result<Self> {
        let local = workspace_root.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load(&local);
        }
        if let Some(user) = Self::user_config_path()
            && user.is_file()
        {
            return Self::load(&user);
        }
        Ok(Self::default())
    }

    /// `<user config dir>/phpantom/docblock.toml`, if a home directory
    /// can be determined.
    pub fn user_config_path() -> Option<PathBuf> {
        let strategy = etcetera::choose_base_strategy().ok()?;
        Some(strategy.config_dir().join("phpantom").join("docblock.toml"))
    }

    /// Register the configured handlers and parameters on `factory`.
    ///
    /// Entries naming an unknown handler id are skipped with a warning so
    /// that one typo does not disable the rest of the file.
    pub fn apply(&self, factory: &TagFactory) {
        for (tag_name, handler_id) in &self.tags {
            if let Err(err) = factory.register_tag_handler_by_id(tag_name.as_str(), handler_id) {
                tracing::warn!(tag = %tag_name, %err, "ignoring tag mapping");
            }
        }
        for (name, value) in &self.parameters {
            factory.add_parameter(name.as_str(), value.clone());
        }
    }

    /// The configured type context, if any namespace or alias is set.
    pub fn type_context(&self) -> Option<TypeContext> {
        if self.context.namespace.is_empty() && self.context.aliases.is_empty() {
            return None;
        }
        let context = self
            .context
            .aliases
            .iter()
            .fold(TypeContext::new(&self.context.namespace), |ctx, (alias, fqn)| {
                ctx.with_alias(alias, fqn)
            });
        Some(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[tags]
"phan-param" = "param"
"broken" = "no-such-handler"

[parameters]
resolve_types = false
label = "x"

[context]
namespace = "App\\Models"

[context.aliases]
Carbon = "Carbon\\Carbon"
"#;

    #[test]
    fn parses_all_sections() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.tags.get("phan-param").map(String::as_str), Some("param"));
        assert_eq!(
            config.parameters.get("resolve_types"),
            Some(&serde_json::Value::Bool(false))
        );
        assert_eq!(config.context.namespace, "App\\Models");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[tagz]\n").is_err());
    }

    #[test]
    fn apply_registers_known_handlers_only() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let factory = TagFactory::new();
        config.apply(&factory);
        assert!(factory.has_handler("phan-param"));
        assert!(!factory.has_handler("broken"));
        assert_eq!(factory.parameter("label"), Some(serde_json::Value::from("x")));
    }

    #[test]
    fn type_context_from_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let ctx = config.type_context().unwrap();
        assert_eq!(ctx.resolve_class_name("User"), "\\App\\Models\\User");
        assert_eq!(ctx.resolve_class_name("Carbon"), "\\Carbon\\Carbon");
        assert_eq!(Config::default().type_context(), None);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "tags = 3").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn discover_prefers_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[tags]\n\"x\" = \"generic\"\n",
        )
        .unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.tags.len(), 1);
    }
}
