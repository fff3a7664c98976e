use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use toml::Value;
use log::{debug, info};
use crate::plugin::config::AttributeSource;
use crate::plugin::traits::parse_bool;

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

pub const LAUNCH_SEQUENCE: &str = "launch_sequence";
pub const EXIT_SEQUENCE: &str = "exit_sequence";

const DEFAULT_LAUNCH_SEQUENCE: &[&str] = &[
    "Controller-Mapper",
    "Monitor-Config",
    "No-TB",
    "Pre1",
    "Pre2",
    "Pre3",
    "Borderless",
];

const DEFAULT_EXIT_SEQUENCE: &[&str] = &[
    "Post1",
    "Post2",
    "Post3",
    "Monitor-Config",
    "Taskbar",
    "Controller-Mapper",
];

const DEFAULT_TERMINATE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_MAX_BACKUPS: u64 = 5;

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Parse configuration held in memory
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(Self::from_config(parse_toml_config(content)?))
    }

    /// Load configuration using the discovery hierarchy.
    ///
    /// An explicit path must exist. Finding no configuration at all is an
    /// error: there is nothing to launch without one.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            return Self::load_from_file(path.to_path_buf());
        }

        debug!("Starting configuration discovery");
        let config_paths = discover_config_files();

        for path in &config_paths {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path.clone());
            }
        }

        let searched: Vec<String> = config_paths.iter().map(|p| p.display().to_string()).collect();
        bail!("No configuration file found (searched: {})", searched.join(", "))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Select the profile overlay for --profile
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration profile: {}", section);
        self.selected_section = Some(section);
    }

    pub fn selected_section(&self) -> Option<&str> {
        self.selected_section.as_deref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: profile.section -> profile -> section -> base
        if let Some(selected) = &self.selected_section {
            let overlay = format!("{}.{}", selected, section);
            if let Some(value) = self.config.get(&overlay).and_then(|s| s.get(key)) {
                return Some(value);
            }
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => parse_bool(value)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            None => Ok(None),
        }
    }

    /// Get unsigned integer value with type conversion
    pub fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>> {
        match self.get_value(section, key) {
            Some(value) => value.trim().parse::<u64>()
                .map(Some)
                .with_context(|| format!("Invalid number for {}.{}: {}", section, key, value)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key)
            .filter(|value| !value.trim().is_empty())
            .map(|value| expand_home(value.trim()))
    }

    /// Get a list from either a TOML array or a comma-separated string.
    /// Items are returned untrimmed.
    pub fn get_list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>> {
        match self.get_value(section, key) {
            Some(value) => parse_list(value)
                .map(Some)
                .with_context(|| format!("Invalid list for {}.{}", section, key)),
            None => Ok(None),
        }
    }

    /// All keys of a section with the profile overlay applied on top
    pub fn section_values(&self, section: &str) -> HashMap<String, String> {
        let mut values = self.config.get(section).cloned().unwrap_or_default();
        if let Some(selected) = &self.selected_section {
            if let Some(overlay) = self.config.get(&format!("{}.{}", selected, section)) {
                values.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        values
    }

    /// Ordered step names of a named sequence. The defaults apply only when
    /// the key is absent or its value is empty; blank entries are kept.
    pub fn sequence(&self, name: &str) -> Result<Vec<String>> {
        let configured = match self.get_value("sequences", name) {
            Some(raw) if !raw.is_empty() => self.get_list("sequences", name)?
                .filter(|items| !items.is_empty()),
            _ => None,
        };
        if let Some(items) = configured {
            return Ok(items);
        }

        let defaults = match name {
            LAUNCH_SEQUENCE => DEFAULT_LAUNCH_SEQUENCE,
            EXIT_SEQUENCE => DEFAULT_EXIT_SEQUENCE,
            _ => &[],
        };
        Ok(defaults.iter().map(|s| s.to_string()).collect())
    }

    /// Custom `[steps]` mappings
    pub fn step_overrides(&self) -> HashMap<String, String> {
        self.section_values("steps")
    }

    pub fn game_info(&self) -> GameInfo {
        let executable = self.get_path("game", "executable");
        let directory = self.get_path("game", "directory")
            .or_else(|| executable.as_ref().and_then(|exe| exe.parent()).map(Path::to_path_buf));
        let name = self.get_value("game", "name")
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .or_else(|| executable.as_ref()
                .and_then(|exe| exe.file_stem())
                .map(|stem| stem.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "Game".to_string());

        GameInfo {
            name,
            executable,
            directory,
            iso_path: self.get_path("game", "iso-path"),
        }
    }

    pub fn launcher_options(&self) -> Result<LauncherOptions> {
        let kill_list = self.get_list("options", "kill-list")?
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let timeout = self.get_u64("options", "terminate-timeout")?
            .unwrap_or(DEFAULT_TERMINATE_TIMEOUT_SECS);
        let max_backups = self.get_u64("options", "max-backups")?
            .unwrap_or(DEFAULT_MAX_BACKUPS);

        Ok(LauncherOptions {
            hide_taskbar: self.get_bool("options", "hide-taskbar")?.unwrap_or(false),
            use_kill_list: self.get_bool("options", "use-kill-list")?.unwrap_or(false),
            kill_list,
            terminate_timeout: Duration::from_secs(timeout),
            bin_root: self.get_path("options", "bin-root"),
            plugin_dir: self.get_path("options", "plugin-dir"),
            recursive_plugins: self.get_bool("options", "recursive-plugins")?.unwrap_or(false),
            taskbar_hide_command: self.non_empty("options", "taskbar-hide-command"),
            taskbar_show_command: self.non_empty("options", "taskbar-show-command"),
            mount_command: self.non_empty("options", "mount-command"),
            unmount_command: self.non_empty("options", "unmount-command"),
            multi_instance: self.get_bool("options", "multi-instance")?.unwrap_or(false),
            run_as_admin: self.get_bool("options", "run-as-admin")?.unwrap_or(false),
            backup_saves: self.get_bool("options", "backup-saves")?.unwrap_or(false),
            max_backups: usize::try_from(max_backups).unwrap_or(usize::MAX),
            save_dir: self.get_path("options", "save-dir"),
            backup_dir: self.get_path("options", "backup-dir"),
        })
    }

    /// Directory holding this game's profile: the configuration file's
    /// directory, else the game directory
    pub fn profile_dir(&self) -> Option<PathBuf> {
        self.config_file_path
            .as_ref()
            .and_then(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| self.game_info().directory)
    }

    /// Per-step attribute bundles with path variables bound to this game
    pub fn step_attributes(&self) -> StepAttributes {
        StepAttributes::new(self.section_values("attributes"), &self.game_info())
    }

    fn non_empty(&self, section: &str, key: &str) -> Option<String> {
        self.get_value(section, key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }
}

/// The `[game]` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameInfo {
    pub name: String,
    pub executable: Option<PathBuf>,
    /// Working directory, defaults to the executable's parent
    pub directory: Option<PathBuf>,
    pub iso_path: Option<PathBuf>,
}

/// The `[options]` section
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherOptions {
    pub hide_taskbar: bool,
    pub use_kill_list: bool,
    pub kill_list: Vec<String>,
    pub terminate_timeout: Duration,
    pub bin_root: Option<PathBuf>,
    pub plugin_dir: Option<PathBuf>,
    /// Also load descriptors from subdirectories of `plugin_dir`
    pub recursive_plugins: bool,
    pub taskbar_hide_command: Option<String>,
    pub taskbar_show_command: Option<String>,
    pub mount_command: Option<String>,
    pub unmount_command: Option<String>,
    pub multi_instance: bool,
    /// Start the game elevated (Windows only)
    pub run_as_admin: bool,
    /// Zip the save directory before launching
    pub backup_saves: bool,
    pub max_backups: usize,
    pub save_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            hide_taskbar: false,
            use_kill_list: false,
            kill_list: Vec::new(),
            terminate_timeout: Duration::from_secs(DEFAULT_TERMINATE_TIMEOUT_SECS),
            bin_root: None,
            plugin_dir: None,
            recursive_plugins: false,
            taskbar_hide_command: None,
            taskbar_show_command: None,
            mount_command: None,
            unmount_command: None,
            multi_instance: false,
            run_as_admin: false,
            backup_saves: false,
            max_backups: DEFAULT_MAX_BACKUPS as usize,
            save_dir: None,
            backup_dir: None,
        }
    }
}

/// Tool path variables and the attribute each one is read from
const TOOL_VARIABLES: &[(&str, &str)] = &[
    ("MAPPER", "controller_mapper_path"),
    ("BORDERLESS", "borderless_app_path"),
    ("MMONAPP", "multimonitor_tool_path"),
    ("CLOUDAPP", "cloud_app_path"),
];

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$([A-Z]+)").expect("valid variable pattern"))
}

/// The `[attributes]` bundle plus `$VAR` path expansion
#[derive(Debug, Clone, Default)]
pub struct StepAttributes {
    attributes: HashMap<String, String>,
    variables: HashMap<String, String>,
}

impl StepAttributes {
    pub fn new(attributes: HashMap<String, String>, game: &GameInfo) -> Self {
        let mut variables = HashMap::new();
        if let Some(home) = dirs::home_dir() {
            variables.insert("HOME".to_string(), home.to_string_lossy().into_owned());
        }
        if let Some(dir) = &game.directory {
            variables.insert("GAMEDIR".to_string(), dir.to_string_lossy().into_owned());
        }
        if let Some(exe) = &game.executable {
            variables.insert("GAMEEXE".to_string(), exe.to_string_lossy().into_owned());
        }
        variables.insert("GAMENAME".to_string(), game.name.clone());

        let mut resolved = Self { attributes, variables };

        // Tool variables may themselves use the game variables
        let tools: Vec<(String, String)> = TOOL_VARIABLES.iter()
            .filter_map(|(var, key)| {
                resolved.non_empty_attribute(key)
                    .map(|raw| (var.to_string(), resolved.expand(raw.trim())))
            })
            .collect();
        resolved.variables.extend(tools);
        resolved
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Substitute known `$VARS` and a leading `~`; unknown variables stay as written
    pub fn expand(&self, raw: &str) -> String {
        let substituted = variable_pattern().replace_all(raw, |caps: &Captures| {
            self.variables.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        expand_home(&substituted).to_string_lossy().into_owned()
    }
}

impl AttributeSource for StepAttributes {
    fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).cloned()
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        PathBuf::from(self.expand(raw))
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") || path.starts_with("~\\") {
        if let Some(home_dir) = dirs::home_dir() {
            let rest = path[1..].trim_start_matches(['/', '\\']);
            return if rest.is_empty() { home_dir } else { home_dir.join(rest) };
        }
    }
    PathBuf::from(path)
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $GAMEWRAP_CONFIG
    if let Ok(env_path) = env::var("GAMEWRAP_CONFIG") {
        if !env_path.trim().is_empty() {
            paths.push(PathBuf::from(env_path));
        }
    }

    // 2. Next to the shortcut
    paths.push(PathBuf::from("./Game.toml"));

    // 3. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("gamewrap").join("config.toml"));
    }

    // 4. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".gamewrap.toml"));
    }

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: toml::Table = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    flatten_toml_table(&toml_value, String::new(), &mut config);

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format.
/// Scalars of a table that also holds subtables stay in that table's section.
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        match value {
            Value::Table(subtable) => {
                let section_name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                let section = config.entry(section_name.clone()).or_default();
                for (subkey, subvalue) in subtable {
                    if !matches!(subvalue, Value::Table(_)) {
                        section.insert(subkey.clone(), toml_value_to_string(subvalue));
                    }
                }
                flatten_toml_table(subtable, section_name, config);
            }
            _ if prefix.is_empty() => {
                // Top-level keys belong to [base]
                config.entry("base".to_string())
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
            _ => {}
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => {
            // For complex types, use TOML representation
            value.to_string()
        }
    }
}

/// Decode a list kept as TOML array text, or split a comma-separated string
fn parse_list(value: &str) -> Result<Vec<String>> {
    let trimmed = value.trim_start();
    if !trimmed.starts_with('[') {
        return Ok(value.split(',').map(str::to_string).collect());
    }

    let table: toml::Table = format!("list = {}", trimmed).parse()
        .context("Failed to parse TOML array")?;
    match table.get("list") {
        Some(Value::Array(items)) => Ok(items.iter().map(toml_value_to_string).collect()),
        _ => bail!("Expected an array, got '{}'", value),
    }
}
