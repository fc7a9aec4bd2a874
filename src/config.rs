//! Configuration management for h8-emu.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (`H8EMU_MODE`, `H8EMU_MEMORY_SIZE`, `H8EMU_INITIAL_SP`)
//! 2. Project-local config file (`./h8-emu.toml`)
//! 3. User config file (`~/.config/h8-emu/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # h8-emu.toml
//!
//! # CPU operating mode: "advanced" (16 MB) or "normal" (64 KB)
//! mode = "advanced"
//!
//! # Emulated memory window
//! memory_base = 0x000000
//! memory_size = 0x10000
//!
//! # Stack pointer after reset
//! initial_sp = 0xFF00
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::interpreter::CpuMode;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

const DEFAULT_MEMORY_SIZE: u32 = 0x1_0000;
const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// h8-emu configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// CPU operating mode.
    pub mode: Option<CpuMode>,

    /// Lowest address of the emulated memory.
    pub memory_base: Option<u32>,

    /// Size of the emulated memory in bytes.
    pub memory_size: Option<u32>,

    /// Stack pointer loaded at reset.
    /// Defaults to the top of memory.
    pub initial_sp: Option<u32>,

    /// PC used at reset when the reset vector cannot be read.
    pub reset_pc: Option<u32>,

    /// Instruction limit for a single `run`.
    pub max_steps: Option<u64>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `h8-emu.toml`
    /// 3. User config `~/.config/h8-emu/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        config.apply_overrides(|name| std::env::var(name).ok());

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    pub fn mode(&self) -> CpuMode {
        self.mode.unwrap_or_default()
    }

    pub fn memory_base(&self) -> u32 {
        self.memory_base.unwrap_or(0)
    }

    pub fn memory_size(&self) -> u32 {
        self.memory_size.unwrap_or(DEFAULT_MEMORY_SIZE)
    }

    /// Initial SP, defaulting to the word-aligned top of memory.
    pub fn initial_sp(&self) -> u32 {
        self.initial_sp.unwrap_or_else(|| {
            self.memory_base().wrapping_add(self.memory_size()) & self.mode().address_mask() & !1
        })
    }

    pub fn reset_pc(&self) -> u32 {
        self.reset_pc.unwrap_or(0)
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps.unwrap_or(DEFAULT_MAX_STEPS)
    }

    /// Read and parse one config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load user configuration from ~/.config/h8-emu/config.toml
    fn load_user_config() -> Option<Self> {
        Self::load_from_file(&Self::user_config_path()?)
    }

    /// Load project-local configuration from ./h8-emu.toml
    fn load_local_config() -> Option<Self> {
        let local_path = Path::new("h8-emu.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("h8-emu.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load a config file if it exists; unreadable files are logged and skipped.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match Self::from_file(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!("{:#}", e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    pub fn merge(&mut self, other: Self) {
        if other.mode.is_some() {
            self.mode = other.mode;
        }
        if other.memory_base.is_some() {
            self.memory_base = other.memory_base;
        }
        if other.memory_size.is_some() {
            self.memory_size = other.memory_size;
        }
        if other.initial_sp.is_some() {
            self.initial_sp = other.initial_sp;
        }
        if other.reset_pc.is_some() {
            self.reset_pc = other.reset_pc;
        }
        if other.max_steps.is_some() {
            self.max_steps = other.max_steps;
        }
    }

    /// Apply overrides looked up by variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("H8EMU_MODE") {
            match value.parse::<CpuMode>() {
                Ok(mode) => {
                    log::info!("Using H8EMU_MODE from environment: {}", mode);
                    self.mode = Some(mode);
                }
                Err(e) => log::warn!("Ignoring H8EMU_MODE: {}", e),
            }
        }
        if let Some(value) = lookup("H8EMU_MEMORY_SIZE") {
            match parse_number(&value) {
                Some(size) => {
                    log::info!("Using H8EMU_MEMORY_SIZE from environment: 0x{:X}", size);
                    self.memory_size = Some(size);
                }
                None => log::warn!("Ignoring H8EMU_MEMORY_SIZE: bad number '{}'", value),
            }
        }
        if let Some(value) = lookup("H8EMU_INITIAL_SP") {
            match parse_number(&value) {
                Some(sp) => {
                    log::info!("Using H8EMU_INITIAL_SP from environment: 0x{:X}", sp);
                    self.initial_sp = Some(sp);
                }
                None => log::warn!("Ignoring H8EMU_INITIAL_SP: bad number '{}'", value),
            }
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("h8-emu").join("config.toml"))
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mode(), CpuMode::Advanced);
        assert_eq!(config.memory_base(), 0);
        assert_eq!(config.memory_size(), 0x1_0000);
        assert_eq!(config.initial_sp(), 0x1_0000);
        assert_eq!(config.reset_pc(), 0);
        assert_eq!(config.max_steps(), 1_000_000);
    }

    #[test]
    fn test_initial_sp_wraps_in_normal_mode() {
        let config = Config { mode: Some(CpuMode::Normal), ..Config::default() };
        assert_eq!(config.initial_sp(), 0);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config {
            mode: Some(CpuMode::Normal),
            memory_size: Some(0x8000),
            initial_sp: Some(0x7F00),
            ..Config::default()
        };

        let overlay = Config {
            memory_size: Some(0x4000),
            reset_pc: Some(0x100),
            ..Config::default()
        };

        base.merge(overlay);

        // mode unchanged (overlay was None)
        assert_eq!(base.mode, Some(CpuMode::Normal));
        // memory_size overridden by overlay
        assert_eq!(base.memory_size, Some(0x4000));
        // reset_pc set from overlay
        assert_eq!(base.reset_pc, Some(0x100));
        assert_eq!(base.initial_sp, Some(0x7F00));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            "H8EMU_MODE" => Some("normal".to_string()),
            "H8EMU_MEMORY_SIZE" => Some("0x2000".to_string()),
            "H8EMU_INITIAL_SP" => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(config.mode, Some(CpuMode::Normal));
        assert_eq!(config.memory_size, Some(0x2000));
        assert_eq!(config.initial_sp, None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4096"), Some(4096));
        assert_eq!(parse_number(" 0xFF00 "), Some(0xFF00));
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number("-1"), None);
    }

    #[test]
    fn test_config_file_format() {
        let config: Config = toml::from_str(
            "mode = \"normal\"\nmemory_size = 0x8000\ninitial_sp = 0x7F00\n",
        )
        .expect("config should parse");
        assert_eq!(config.mode, Some(CpuMode::Normal));
        assert_eq!(config.memory_size, Some(0x8000));
        assert_eq!(config.initial_sp(), 0x7F00);
        assert_eq!(config.reset_pc, None);
    }

    #[test]
    fn test_from_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/h8-emu.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/h8-emu.toml"));
    }
}
