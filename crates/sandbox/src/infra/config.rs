//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".sandbox/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "Server::default_base_url")]
    pub base_url: String,
    #[serde(default = "Server::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Server {
    fn default_base_url() -> String {
        "http://127.0.0.1:8080".to_owned()
    }

    fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default = "EditorSettings::default_flash_millis")]
    pub flash_millis: u64,
    #[serde(default = "EditorSettings::default_drop_empty_variables")]
    pub drop_empty_variables: bool,
    #[serde(default)]
    pub update_builds: bool,
}

impl EditorSettings {
    fn default_flash_millis() -> u64 {
        500
    }

    fn default_drop_empty_variables() -> bool {
        true
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            flash_millis: Self::default_flash_millis(),
            drop_empty_variables: Self::default_drop_empty_variables(),
            update_builds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybindings {
    #[serde(default = "Keybindings::default_up")]
    pub up: String,
    #[serde(default = "Keybindings::default_down")]
    pub down: String,
    #[serde(default = "Keybindings::default_check")]
    pub check: String,
    #[serde(default = "Keybindings::default_save")]
    pub save: String,
}

impl Keybindings {
    fn default_up() -> String {
        "k".into()
    }

    fn default_down() -> String {
        "j".into()
    }

    fn default_check() -> String {
        "ctrl+b".into()
    }

    fn default_save() -> String {
        "ctrl+s".into()
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: Self::default_up(),
            down: Self::default_down(),
            check: Self::default_check(),
            save: Self::default_save(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    base_url: Option<String>,
    update_builds: Option<bool>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            base_url: env::var("SANDBOX_SERVER_URL").ok(),
            update_builds: env::var("SANDBOX_UPDATE_BUILDS")
                .ok()
                .and_then(|value| parse_flag(&value)),
        }
    }

    #[cfg(test)]
    fn for_tests(base_url: &str, update_builds: bool) -> Self {
        Self {
            base_url: Some(base_url.to_owned()),
            update_builds: Some(update_builds),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            server: merge_server(self.server, other.server),
            editor: merge_editor(self.editor, other.editor),
            keybindings: merge_keybindings(self.keybindings, other.keybindings),
        }
    }

    /// Replace the backend URL, e.g. from a `--server` flag.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.server.base_url = base_url;
        }
        self
    }
}

fn merge_server(base: Server, overlay: Server) -> Server {
    Server {
        base_url: if overlay.base_url != Server::default_base_url() {
            overlay.base_url
        } else {
            base.base_url
        },
        timeout_secs: if overlay.timeout_secs != Server::default_timeout_secs() {
            overlay.timeout_secs
        } else {
            base.timeout_secs
        },
    }
}

fn merge_editor(base: EditorSettings, overlay: EditorSettings) -> EditorSettings {
    EditorSettings {
        flash_millis: if overlay.flash_millis != EditorSettings::default_flash_millis() {
            overlay.flash_millis
        } else {
            base.flash_millis
        },
        drop_empty_variables: overlay.drop_empty_variables && base.drop_empty_variables,
        update_builds: overlay.update_builds || base.update_builds,
    }
}

fn merge_keybindings(base: Keybindings, overlay: Keybindings) -> Keybindings {
    Keybindings {
        up: choose_keybinding(base.up, overlay.up, Keybindings::default_up),
        down: choose_keybinding(base.down, overlay.down, Keybindings::default_down),
        check: choose_keybinding(base.check, overlay.check, Keybindings::default_check),
        save: choose_keybinding(base.save, overlay.save, Keybindings::default_save),
    }
}

fn choose_keybinding(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("sandbox/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(base_url) = env.base_url {
        config.server.base_url = base_url;
    }
    if let Some(update_builds) = env.update_builds {
        config.editor.update_builds = update_builds;
    }
    config
}
