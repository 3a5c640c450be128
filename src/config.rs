use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub df_dir: Option<PathBuf>,
    #[serde(default)]
    pub hide_utility_path: bool,
    #[serde(default = "default_true")]
    pub confirm_delete: bool,
    #[serde(default = "default_true")]
    pub confirm_graphics_install: bool,
    /// Write the launcher's settings into a graphics pack's init files
    /// instead of taking the pack's values.
    #[serde(default)]
    pub patch_inits: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            df_dir: None,
            hide_utility_path: false,
            confirm_delete: true,
            confirm_graphics_install: true,
            patch_inits: false,
        }
    }
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            if config
                .df_dir
                .as_ref()
                .is_some_and(|dir| !crate::game::looks_like_df_dir(dir))
            {
                config.df_dir = None;
                config.save()?;
            }
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("dflaunch"))
}
