//! Runtime settings: where the external tools live and how library code is
//! compiled.
//!
//! Settings come from an optional TOML file. Every field has a default, so
//! an empty file (or no file at all) is valid:
//!
//! ```toml
//! [tools]
//! java = "java"
//! apktool = "libs/apktool_2.4.1.jar"
//! d8 = "libs/d8.jar"
//! baksmali = "libs/baksmali-2.0.6.jar"
//! jetifier = "libs/jetifier"
//!
//! [compile]
//! flavor = "release"
//! min_api = 1
//! # jetifier_config = "mapping.json"
//! ```

use crate::tools::jetifier::MAIN_CLASS as JETIFIER_MAIN_CLASS;
use crate::tools::{
    Apktool, Baksmali, BuildFlavor, Jetifier, Launcher, ProcessRunner, Toolchain, D8,
};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "APK_PATCHER_CONFIG";
/// Environment variable holding the debug flag, as a JSON boolean.
pub const DEBUG_ENV: &str = "DEBUG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tools: ToolSettings,
    pub compile: CompileSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    /// Java launcher used for every jar-based tool.
    pub java: PathBuf,
    pub apktool: PathBuf,
    pub d8: PathBuf,
    pub baksmali: PathBuf,
    /// Directory holding the standalone jetifier jars.
    pub jetifier: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            apktool: PathBuf::from("libs/apktool_2.4.1.jar"),
            d8: PathBuf::from("libs/d8.jar"),
            baksmali: PathBuf::from("libs/baksmali-2.0.6.jar"),
            jetifier: PathBuf::from("libs/jetifier"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileSettings {
    pub flavor: BuildFlavor,
    /// Minimum Android API level passed to d8.
    pub min_api: u32,
    pub proguard_config: Option<PathBuf>,
    /// API level passed to baksmali, if any.
    pub api_level: Option<u32>,
    /// Custom jetifier mapping file, replacing the built-in mapping.
    pub jetifier_config: Option<PathBuf>,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            flavor: BuildFlavor::Release,
            min_api: 1,
            proguard_config: None,
            api_level: None,
            jetifier_config: None,
        }
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Invalid {
        path: Option<PathBuf>,
        message: String,
    },
}

impl SettingsError {
    fn with_path(self, path: &Path) -> Self {
        let path = Some(path.to_path_buf());
        match self {
            SettingsError::Toml { path: None, source } => SettingsError::Toml { path, source },
            SettingsError::Invalid {
                path: None,
                message,
            } => SettingsError::Invalid { path, message },
            other => other,
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "failed to read settings from {}: {}", path.display(), source)
            }
            SettingsError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse settings ({}): {}", path.display(), source),
                None => write!(f, "failed to parse settings: {}", source),
            },
            SettingsError::Invalid { path, message } => match path {
                Some(path) => write!(f, "invalid settings ({}): {}", path.display(), message),
                None => write!(f, "invalid settings: {}", message),
            },
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io { source, .. } => Some(source),
            SettingsError::Toml { source, .. } => Some(source),
            SettingsError::Invalid { .. } => None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |message: &str| SettingsError::Invalid {
            path: None,
            message: message.to_string(),
        };

        if self.compile.min_api == 0 {
            return Err(invalid("compile.min_api must be at least 1"));
        }
        let tools = &self.tools;
        for (name, path) in [
            ("tools.java", &tools.java),
            ("tools.apktool", &tools.apktool),
            ("tools.d8", &tools.d8),
            ("tools.baksmali", &tools.baksmali),
            ("tools.jetifier", &tools.jetifier),
        ] {
            if path.as_os_str().is_empty() {
                return Err(invalid(&format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Resolve relative tool and config paths against `base`.
    ///
    /// `tools.java` is left alone when it is a bare program name, so it is
    /// still looked up on `PATH`.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        if self.tools.java.components().count() > 1 {
            resolve(&mut self.tools.java);
        }
        resolve(&mut self.tools.apktool);
        resolve(&mut self.tools.d8);
        resolve(&mut self.tools.baksmali);
        resolve(&mut self.tools.jetifier);
        if let Some(path) = self.compile.proguard_config.as_mut() {
            resolve(path);
        }
        if let Some(path) = self.compile.jetifier_config.as_mut() {
            resolve(path);
        }
        self
    }

    /// Build the process-backed toolchain these settings describe.
    pub fn toolchain(&self) -> Toolchain {
        let tools = &self.tools;
        let jar = |name: &str, path: &Path| {
            Box::new(ProcessRunner::new(name, Launcher::jar(&tools.java, path)))
        };

        Toolchain {
            apktool: Apktool::new(jar("apktool", &tools.apktool)),
            d8: D8::new(jar("d8", &tools.d8)),
            baksmali: Baksmali::new(jar("baksmali", &tools.baksmali)),
            jetifier: Jetifier::new(Box::new(ProcessRunner::new(
                "jetifier",
                Launcher::ClassPath {
                    java: tools.java.clone(),
                    dir: tools.jetifier.clone(),
                    main_class: JETIFIER_MAIN_CLASS.to_string(),
                },
            ))),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml_edit::de::from_str(input)
        .map_err(|source| SettingsError::Toml { path: None, source })?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path`, resolving relative paths against the file's
/// directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = load_from_str(&contents).map_err(|error| error.with_path(path))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(settings.resolve_relative_to(base))
}

/// Locate and load settings.
///
/// Discovery order:
/// 1. `explicit` (the `--config` flag)
/// 2. the `APK_PATCHER_CONFIG` environment variable
/// 3. `~/.config/apk-patcher/config.toml`, if it exists
/// 4. built-in defaults, resolved against the current directory
pub fn discover(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    if let Some(path) = env::var_os(CONFIG_ENV) {
        return load_from_path(PathBuf::from(path));
    }

    if let Some(home) = home::home_dir() {
        let user_config = home.join(".config/apk-patcher/config.toml");
        if user_config.is_file() {
            return load_from_path(user_config);
        }
    }

    let cwd = env::current_dir().map_err(|source| SettingsError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    Ok(Settings::default().resolve_relative_to(&cwd))
}

/// Parse the debug flag. Only the JSON literal `true` enables it.
pub fn parse_debug_flag(value: Option<&str>) -> bool {
    value
        .and_then(|raw| serde_json::from_str::<bool>(raw.trim()).ok())
        .unwrap_or(false)
}

/// Read the debug flag from the `DEBUG` environment variable.
pub fn debug_from_env() -> bool {
    parse_debug_flag(env::var(DEBUG_ENV).ok().as_deref())
}
