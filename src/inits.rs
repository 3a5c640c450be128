//! `[TOKEN:VALUE]` entries in the game's `init.txt` and `d_init.txt`.

use crate::settings::{SettingKey, Settings};
use anyhow::{Context, Result};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFile {
    Init,
    DInit,
}

impl InitFile {
    pub fn file_name(self) -> &'static str {
        match self {
            InitFile::Init => "init.txt",
            InitFile::DInit => "d_init.txt",
        }
    }

    /// Older game versions keep every token in `init.txt`.
    pub fn path(self, init_dir: &Path) -> PathBuf {
        let path = init_dir.join(self.file_name());
        if self == InitFile::DInit && !path.exists() {
            return init_dir.join(InitFile::Init.file_name());
        }
        path
    }
}

/// The init file and token a setting is stored under. Aquifers live in the
/// world generation raws, and the graphics pack and close-on-launch flag are
/// launcher state, so those have no token.
pub fn token_for(key: SettingKey) -> Option<(InitFile, &'static str)> {
    use InitFile::{DInit, Init};
    let entry = match key {
        SettingKey::Sound => (Init, "SOUND"),
        SettingKey::Volume => (Init, "VOLUME"),
        SettingKey::IntroMovie => (Init, "INTRO"),
        SettingKey::StartWindowed => (Init, "WINDOWED"),
        SettingKey::FpsCounter => (Init, "FPS"),
        SettingKey::FpsCap => (Init, "FPS_CAP"),
        SettingKey::GpsCap => (Init, "G_FPS_CAP"),
        SettingKey::TrueType => (Init, "TRUETYPE"),
        SettingKey::ProcPriority => (Init, "PRIORITY"),
        SettingKey::PopCap => (DInit, "POPULATION_CAP"),
        SettingKey::ChildCap => (DInit, "BABY_CHILD_CAP"),
        SettingKey::Invaders => (DInit, "INVADERS"),
        SettingKey::CaveIns => (DInit, "CAVEINS"),
        SettingKey::Temperature => (DInit, "TEMPERATURE"),
        SettingKey::Weather => (DInit, "WEATHER"),
        SettingKey::LiquidDepth => (DInit, "SHOW_FLOW_AMOUNTS"),
        SettingKey::VariedGround => (DInit, "VARIED_GROUND_TILES"),
        SettingKey::LaborLists => (DInit, "SET_LABOR_LISTS"),
        SettingKey::AutoSave => (DInit, "AUTOSAVE"),
        SettingKey::InitialSave => (DInit, "INITIAL_SAVE"),
        SettingKey::AutoSavePause => (DInit, "AUTOSAVE_PAUSE"),
        SettingKey::PauseOnLoad => (DInit, "PAUSE_ON_LOAD"),
        SettingKey::AutoBackup => (DInit, "AUTOBACKUP"),
        SettingKey::CompressSaves => (DInit, "COMPRESSED_SAVES"),
        SettingKey::Aquifers | SettingKey::GraphicsPack | SettingKey::AutoClose => return None,
    };
    Some(entry)
}

/// Every `[TOKEN:VALUE]` in `text`. Values may contain `:`; the token ends at
/// the first one. A repeated token keeps its last value.
pub fn read_tokens(text: &str) -> BTreeMap<String, String> {
    let mut tokens = BTreeMap::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(len) = rest[open..].find(']') else {
            break;
        };
        let inner = &rest[open + 1..open + len];
        if let Some((token, value)) = inner.split_once(':') {
            tokens.insert(token.to_string(), value.to_string());
        }
        rest = &rest[open + len + 1..];
    }
    tokens
}

/// Rewrites the values of `updates` in place and appends tokens the text
/// does not have yet. Everything else is left byte for byte.
pub fn patch_tokens(text: &str, updates: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut seen = BTreeSet::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(len) = rest[open..].find(']') else {
            break;
        };
        let inner = &rest[open + 1..open + len];
        out.push_str(&rest[..=open]);
        let update = inner
            .split_once(':')
            .and_then(|(token, _)| updates.iter().find(|(name, _)| *name == token));
        match update {
            Some((name, value)) => {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
                seen.insert(*name);
            }
            None => out.push_str(inner),
        }
        out.push(']');
        rest = &rest[open + len + 1..];
    }
    out.push_str(rest);
    for (name, value) in updates {
        if seen.contains(name) {
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("[{name}:{value}]\n"));
    }
    out
}

/// Writes every mapped setting into the init files under `init_dir`.
pub fn write_settings(init_dir: &Path, settings: &Settings) -> Result<()> {
    let mut per_file: BTreeMap<PathBuf, Vec<(&str, String)>> = BTreeMap::new();
    for key in SettingKey::ALL {
        let (Some((file, token)), Some(value)) = (token_for(key), settings.get(key)) else {
            continue;
        };
        per_file
            .entry(file.path(init_dir))
            .or_default()
            .push((token, value.to_string()));
    }
    for (path, updates) in per_file {
        let current = if path.exists() {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };
        fs::write(&path, patch_tokens(&current, &updates))
            .with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

/// Copies values found in the init files into `settings`. Tokens that are
/// missing or hold a value the setting does not accept are skipped. Returns
/// how many settings were read.
pub fn overlay_settings(init_dir: &Path, settings: &mut Settings) -> Result<usize> {
    let mut cache: BTreeMap<PathBuf, BTreeMap<String, String>> = BTreeMap::new();
    let mut applied = 0;
    for key in SettingKey::ALL {
        let Some((file, token)) = token_for(key) else {
            continue;
        };
        let path = file.path(init_dir);
        if !path.exists() {
            continue;
        }
        if !cache.contains_key(&path) {
            let raw =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            cache.insert(path.clone(), read_tokens(&raw));
        }
        let Some(raw) = cache.get(&path).and_then(|tokens| tokens.get(token)) else {
            continue;
        };
        let Ok(value) = key.parse(raw) else {
            continue;
        };
        if settings.set(key, value).is_ok() {
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::write;
    use tempfile::TempDir;

    #[test]
    fn values_split_at_the_first_colon() {
        let tokens = read_tokens("junk [BABY_CHILD_CAP:100:1000]\n[SOUND:NO] [bare] [VOLUME:9");
        assert_eq!(tokens.get("BABY_CHILD_CAP").map(String::as_str), Some("100:1000"));
        assert_eq!(tokens.get("SOUND").map(String::as_str), Some("NO"));
        assert!(!tokens.contains_key("bare"));
        assert!(!tokens.contains_key("VOLUME"));
    }

    #[test]
    fn patch_keeps_surrounding_text_and_appends_new_tokens() {
        let text = "Sound settings\n[SOUND:YES] keep\n[VOLUME:255]";
        let patched = patch_tokens(
            text,
            &[("SOUND", "NO".to_string()), ("FPS", "YES".to_string())],
        );
        assert_eq!(patched, "Sound settings\n[SOUND:NO] keep\n[VOLUME:255]\n[FPS:YES]\n");
    }

    #[test]
    fn fortress_tokens_fall_back_to_init_when_d_init_is_missing() {
        let temp = TempDir::new().unwrap();
        let init_dir = temp.path();
        write(&init_dir.join("init.txt"), "[SOUND:YES]\n");

        let mut settings = Settings::default();
        settings.popcap = 80;
        write_settings(init_dir, &settings).unwrap();

        let raw = fs::read_to_string(init_dir.join("init.txt")).unwrap();
        assert!(raw.contains("[POPULATION_CAP:80]"));
        assert!(!init_dir.join("d_init.txt").exists());
    }

    #[test]
    fn overlay_reads_back_what_was_written() {
        let temp = TempDir::new().unwrap();
        let init_dir = temp.path();
        write(&init_dir.join("init.txt"), "[SOUND:YES]\n[PRIORITY:bogus]\n");
        write(&init_dir.join("d_init.txt"), "[POPULATION_CAP:200]\n");

        let mut written = Settings::default();
        written.sound = "NO".to_string();
        written.childcap = "5:20".to_string();
        written.popcap = 42;
        write_settings(init_dir, &written).unwrap();

        let mut read = Settings::default();
        overlay_settings(init_dir, &mut read).unwrap();
        assert_eq!(read.sound, "NO");
        assert_eq!(read.childcap, "5:20");
        assert_eq!(read.popcap, 42);
        assert_eq!(read.aquifers, Settings::default().aquifers);
    }

    #[test]
    fn overlay_skips_values_the_setting_rejects() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("init.txt"), "[VOLUME:900][PRIORITY:bogus]");
        let mut settings = Settings::default();
        assert_eq!(overlay_settings(temp.path(), &mut settings).unwrap(), 0);
        assert_eq!(settings, Settings::default());
    }
}
