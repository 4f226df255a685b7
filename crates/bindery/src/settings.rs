use bindery_core::{CommentStyle, NameStyle};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[bindery_derive::bindery_error]
pub enum SettingsError {
    #[error("Settings error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Host-level knobs applied through [`crate::BinderyBuilder::settings`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BinderySettings {
    pub directory: PathBuf,
    pub name_style: NameStyle,
    pub comment_style: CommentStyle,
    pub translate_colors: bool,
}

impl Default for BinderySettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("config"),
            name_style: NameStyle::default(),
            comment_style: CommentStyle::default(),
            translate_colors: false,
        }
    }
}

impl BinderySettings {
    /// Layers an optional settings file under `BINDERY__`-prefixed environment variables
    /// (`BINDERY__NAME_STYLE=snake-case` maps to `name_style`).
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Config`] when the file is missing or unreadable, or when a value
    /// does not deserialize.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = &path {
            info!("Loading settings from {}", path.as_ref().display());
            builder = builder.add_source(File::from(path.as_ref()).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("BINDERY")
                    .separator("__")
                    .convert_case(config::Case::Snake)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build settings")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize settings")?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_values_override_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bindery.toml");
        std::fs::write(
            &path,
            "directory = \"plugins/demo\"\nname_style = \"snake-case\"\ntranslate_colors = true\n",
        )
        .unwrap();

        let settings = BinderySettings::load(Some(&path)).unwrap();
        assert_eq!(settings.directory, PathBuf::from("plugins/demo"));
        assert_eq!(settings.name_style, NameStyle::SnakeCase);
        assert_eq!(settings.comment_style, CommentStyle::Above);
        assert!(settings.translate_colors);
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let result = BinderySettings::load(Some(temp.path().join("absent.toml")));
        assert!(matches!(result, Err(SettingsError::Config { .. })));
    }
}
