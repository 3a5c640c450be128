use anyhow::{bail, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const GAME_NAME: &str = "Dwarf Fortress";

#[derive(Debug, Clone)]
pub struct GamePaths {
    pub df_dir: PathBuf,
    pub init_dir: PathBuf,
    pub lnp_dir: PathBuf,
}

impl GamePaths {
    pub fn resolve(df_dir: &Path) -> Result<Self> {
        if !looks_like_df_dir(df_dir) {
            bail!(
                "invalid {GAME_NAME} folder: expected data/init/init.txt in {}",
                df_dir.display()
            );
        }
        let lnp_dir = df_dir
            .parent()
            .map(|parent| parent.join("LNP"))
            .filter(|candidate| candidate.is_dir())
            .unwrap_or_else(|| df_dir.join("LNP"));
        Ok(Self {
            df_dir: df_dir.to_path_buf(),
            init_dir: df_dir.join("data").join("init"),
            lnp_dir,
        })
    }

    pub fn keybinds_dir(&self) -> PathBuf {
        self.lnp_dir.join("Keybinds")
    }

    pub fn graphics_dir(&self) -> PathBuf {
        self.lnp_dir.join("Graphics")
    }

    pub fn utilities_dir(&self) -> PathBuf {
        self.lnp_dir.join("Utilities")
    }

    pub fn colors_dir(&self) -> PathBuf {
        self.lnp_dir.join("Colors")
    }

    pub fn embarks_dir(&self) -> PathBuf {
        self.lnp_dir.join("Embarks")
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.df_dir.join("data").join("save")
    }

    pub fn hacks_path(&self) -> PathBuf {
        self.lnp_dir.join("hacks.json")
    }

    /// Candidate executables, most specific first.
    pub fn game_executables(&self) -> Vec<PathBuf> {
        vec![
            self.df_dir.join("df"),
            self.df_dir.join("Dwarf Fortress.exe"),
            self.df_dir.join("dwarfort"),
        ]
    }
}

pub fn looks_like_df_dir(path: &Path) -> bool {
    path.join("data").join("init").join("init.txt").is_file()
}

/// Finds game folders directly below `base`, including `base` itself.
pub fn find_df_folders(base: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if looks_like_df_dir(base) {
        found.push(base.to_path_buf());
    }
    let Ok(entries) = fs::read_dir(base) else {
        return found;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && looks_like_df_dir(path))
        .collect();
    children.sort();
    found.extend(children);
    found
}
