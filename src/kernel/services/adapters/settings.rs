//! 配置与数据目录
//!
//! - macOS: ~/Library/Application Support/zscan
//! - Linux: $XDG_DATA_HOME/zscan 或 ~/.local/share/zscan
//! - Windows: %APPDATA%\zscan

use crate::kernel::services::ports::search::Result;
use crate::kernel::services::ports::SearchSettings;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "zscan";
const LOG_DIR: &str = "logs";
const SETTINGS_FILE: &str = "settings.json";

/// 获取应用数据目录
fn get_app_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_NAME)
        })
    }

    #[cfg(target_os = "linux")]
    {
        // 优先使用 XDG_DATA_HOME，否则使用 ~/.local/share
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            Some(PathBuf::from(xdg).join(APP_NAME))
        } else {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share").join(APP_NAME))
        }
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(LOG_DIR))
}

pub fn get_settings_path() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

/// 确保日志目录存在
pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    let dir = get_log_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Cannot determine log directory",
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

/// 配置文件不存在时写入默认配置
pub fn ensure_settings_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&SearchSettings::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<SearchSettings> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// 读取配置；文件缺失时返回默认值，格式错误时返回错误
pub fn load_settings_or_default(path: &Path) -> Result<SearchSettings> {
    match load_settings(path) {
        Err(crate::kernel::services::ports::SearchError::Io(e))
            if e.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(SearchSettings::default())
        }
        other => other,
    }
}

/// 默认配置路径使用：缺失时先写入默认配置再读取，写入失败只记录日志
pub fn load_or_init_settings(path: &Path) -> Result<SearchSettings> {
    if let Err(e) = ensure_settings_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "cannot write default settings");
    }
    load_settings_or_default(path)
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/settings.rs"]
mod tests;
