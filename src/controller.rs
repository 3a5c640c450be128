use crate::{
    colors::ColorScheme,
    error::{BindingError, StatusLookupError, WriteRejected},
    game::GamePaths,
    inits,
    settings::{SettingKey, SettingValue, Settings},
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use walkdir::WalkDir;

const UTILITY_EXTENSIONS: &[&str] = &["exe", "jar", "sh", "bat", "py", "app"];
const HACKS_INIT: &str = "dfhack_launcher.init";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Keybinds,
    Graphics,
    Utilities,
    Colors,
    Embarks,
    Hacks,
}

impl ListKind {
    pub fn label(self) -> &'static str {
        match self {
            ListKind::Keybinds => "key bindings",
            ListKind::Graphics => "graphics packs",
            ListKind::Utilities => "utilities",
            ListKind::Colors => "color schemes",
            ListKind::Embarks => "embark profiles",
            ListKind::Hacks => "hacks",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Yes,
    No,
}

impl DisplayStatus {
    pub fn label(self) -> &'static str {
        match self {
            DisplayStatus::Yes => "Yes",
            DisplayStatus::No => "No",
        }
    }
}

impl From<bool> for DisplayStatus {
    fn from(value: bool) -> Self {
        if value {
            DisplayStatus::Yes
        } else {
            DisplayStatus::No
        }
    }
}

/// The collaborator that owns persisted settings and list sources. The
/// display layer only reads through this trait and writes through
/// [`Controller::set_value`].
pub trait Controller {
    fn value(&self, key: SettingKey) -> Result<SettingValue, BindingError>;
    fn set_value(&mut self, key: SettingKey, value: SettingValue) -> Result<(), WriteRejected>;
    fn list_items(&self, kind: ListKind) -> Result<Vec<String>>;
    fn status(&self, kind: ListKind, item: &str) -> Result<DisplayStatus, StatusLookupError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackDefinition {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub tooltip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LauncherState {
    #[serde(default)]
    autorun: BTreeSet<String>,
    #[serde(default)]
    enabled_hacks: BTreeSet<String>,
    #[serde(default)]
    current_pack: Option<String>,
    #[serde(default)]
    auto_close: bool,
}

/// File-backed controller over a game folder and the launcher data directory.
pub struct LocalController {
    paths: GamePaths,
    data_dir: PathBuf,
    settings: Settings,
    state: LauncherState,
    hacks: Vec<HackDefinition>,
}

impl LocalController {
    pub fn open(paths: GamePaths, data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context("create launcher data dir")?;
        let mut controller = Self {
            paths,
            data_dir: data_dir.to_path_buf(),
            settings: Settings::default(),
            state: LauncherState::default(),
            hacks: Vec::new(),
        };
        controller.reload()?;
        Ok(controller)
    }

    /// Re-reads the launcher files and hack definitions, then takes every
    /// value the game's init files hold. Nothing changes when a read fails.
    pub fn reload(&mut self) -> Result<()> {
        let mut settings = Settings::load_or_default(&self.settings_path())?;
        inits::overlay_settings(&self.paths.init_dir, &mut settings)?;
        let state_path = self.data_dir.join("launcher.json");
        let state = if state_path.exists() {
            let raw = fs::read_to_string(&state_path).context("read launcher state")?;
            serde_json::from_str(&raw).context("parse launcher state")?
        } else {
            LauncherState::default()
        };
        let hacks = load_hacks(&self.paths.hacks_path())?;
        self.settings = settings;
        self.state = state;
        self.hacks = hacks;
        Ok(())
    }

    /// Writes the current settings and launcher state out again.
    pub fn save_params(&self) -> Result<()> {
        self.settings.save(&self.settings_path())?;
        inits::write_settings(&self.paths.init_dir, &self.settings)?;
        self.save_state(&self.state)
    }

    pub fn paths(&self) -> &GamePaths {
        &self.paths
    }

    pub fn has_hacks(&self) -> bool {
        !self.hacks.is_empty()
    }

    pub fn auto_close(&self) -> bool {
        self.state.auto_close
    }

    pub fn hack_tooltip(&self, name: &str) -> Option<&str> {
        self.hacks
            .iter()
            .find(|hack| hack.name == name)
            .map(|hack| hack.tooltip.as_str())
    }

    pub fn cycle_option(&mut self, key: SettingKey) -> Result<SettingValue, WriteRejected> {
        let mut next = self.settings.clone();
        let value = next
            .cycle(key)
            .map_err(|reason| WriteRejected::new(key, reason))?;
        self.commit_settings(next)
            .map_err(|err| WriteRejected::new(key, format!("{err:#}")))?;
        Ok(value)
    }

    pub fn toggle_auto_close(&mut self) -> Result<bool, WriteRejected> {
        let next = !self.state.auto_close;
        self.set_value(SettingKey::AutoClose, SettingValue::Flag(next))?;
        Ok(next)
    }

    pub fn restore_defaults(&mut self) -> Result<()> {
        self.commit_settings(Settings::default())
    }

    pub fn toggle_autorun(&mut self, item: &str) -> Result<bool> {
        self.update_state(|state| toggle_member(&mut state.autorun, item))
    }

    pub fn toggle_hack(&mut self, name: &str) -> Result<bool> {
        if !self.hacks.iter().any(|hack| hack.name == name) {
            bail!("unknown hack: {name}");
        }
        let mut next = self.state.clone();
        let enabled = toggle_member(&mut next.enabled_hacks, name);
        self.write_hacks_init(&next.enabled_hacks)?;
        if let Err(err) = self.save_state(&next) {
            let _ = self.write_hacks_init(&self.state.enabled_hacks);
            return Err(err);
        }
        self.state = next;
        Ok(enabled)
    }

    pub fn file_exists(&self, kind: ListKind, name: &str) -> bool {
        self.list_file_path(kind, name)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Installs a saved key-binding set or color scheme over the active one.
    pub fn load_file(&mut self, kind: ListKind, name: &str) -> Result<()> {
        let source = self.list_file_path(kind, name)?;
        let target = self.installed_path(kind)?;
        fs::copy(&source, &target)
            .with_context(|| format!("install {} {name}", kind.label()))?;
        Ok(())
    }

    /// Saves the active key bindings or color scheme under `name`.
    pub fn save_file(&mut self, kind: ListKind, name: &str) -> Result<()> {
        let source = self.installed_path(kind)?;
        let target = self.list_file_path(kind, name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).context("create list dir")?;
        }
        fs::copy(&source, &target).with_context(|| format!("save {} {name}", kind.label()))?;
        Ok(())
    }

    pub fn delete_file(&mut self, kind: ListKind, name: &str) -> Result<()> {
        let path = self.list_file_path(kind, name)?;
        fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))
    }

    /// Appends the selected embark profiles to the game's profile file.
    pub fn install_embarks(&mut self, names: &[String]) -> Result<usize> {
        let target = self.paths.init_dir.join("embark_profiles.txt");
        let mut combined = if target.exists() {
            fs::read_to_string(&target).context("read embark profiles")?
        } else {
            String::new()
        };
        let mut installed = 0;
        for name in names {
            let source = self.list_file_path(ListKind::Embarks, name)?;
            let profile = fs::read_to_string(&source)
                .with_context(|| format!("read embark profile {name}"))?;
            if combined.contains(profile.trim()) {
                continue;
            }
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&profile);
            installed += 1;
        }
        fs::write(&target, combined).context("write embark profiles")?;
        Ok(installed)
    }

    /// Copies a graphics pack over the game folder. Returns the number of
    /// files written.
    ///
    /// With `patch_inits` the launcher's settings are written back into the
    /// init files the pack replaced. Without it the pack's init files win and
    /// the settings are read from them.
    pub fn install_graphics(&mut self, pack: &str, patch_inits: bool) -> Result<usize> {
        let root = self.paths.graphics_dir().join(pack);
        if !root.is_dir() {
            bail!("graphics pack not found: {}", root.display());
        }
        if WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .all(|entry| !entry.file_type().is_file())
        {
            bail!("graphics pack {pack} has no files");
        }
        let copied = copy_tree(&root, &self.paths.df_dir)?;
        if patch_inits {
            inits::write_settings(&self.paths.init_dir, &self.settings)?;
        } else {
            let mut next = self.settings.clone();
            inits::overlay_settings(&self.paths.init_dir, &mut next)?;
            next.save(&self.settings_path())?;
            self.settings = next;
        }
        self.update_state(|state| state.current_pack = Some(pack.to_string()))?;
        Ok(copied)
    }

    /// Replaces the graphics raws of every save with the game's current
    /// ones. Returns the number of saves updated.
    pub fn update_savegames(&self) -> Result<usize> {
        let source = self.paths.df_dir.join("raw").join("graphics");
        let saves = self.paths.saves_dir();
        if !source.is_dir() || !saves.is_dir() {
            return Ok(0);
        }
        let mut updated = 0;
        for save in list_subdirs(&saves)? {
            if save == "current" {
                continue;
            }
            let target = saves.join(&save).join("raw").join("graphics");
            if target.exists() {
                fs::remove_dir_all(&target)
                    .with_context(|| format!("remove {}", target.display()))?;
            }
            copy_tree(&source, &target)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Colors of a saved scheme, or of the installed one for `None`.
    pub fn color_scheme(&self, name: Option<&str>) -> Result<ColorScheme> {
        let path = match name {
            Some(name) => self.list_file_path(ListKind::Colors, name)?,
            None => self.installed_path(ListKind::Colors)?,
        };
        let raw =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(ColorScheme::parse(&raw))
    }

    pub fn run_program(&self, item: &str) -> Result<()> {
        let path = self.paths.utilities_dir().join(item);
        if !path.is_file() {
            bail!("utility not found: {}", path.display());
        }
        let (program, args) = program_command(&path);
        Command::new(program)
            .args(args)
            .current_dir(path.parent().unwrap_or(&self.paths.df_dir))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch {item}"))?;
        Ok(())
    }

    /// Launches the game, then every auto-run utility. Returns the utilities
    /// that failed to start.
    pub fn run_game(&self) -> Result<Vec<String>> {
        let executable = self
            .paths
            .game_executables()
            .into_iter()
            .find(|path| path.is_file())
            .context("no game executable found")?;
        Command::new(&executable)
            .current_dir(&self.paths.df_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch {}", executable.display()))?;

        let mut failed = Vec::new();
        for item in &self.state.autorun {
            if self.run_program(item).is_err() {
                failed.push(item.clone());
            }
        }
        Ok(failed)
    }

    fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Persists `next` to the settings file and the init files, and only
    /// then makes it current. A failed init write puts the old settings file
    /// back.
    fn commit_settings(&mut self, next: Settings) -> Result<()> {
        let path = self.settings_path();
        next.save(&path)?;
        if let Err(err) = inits::write_settings(&self.paths.init_dir, &next) {
            let _ = self.settings.save(&path);
            return Err(err);
        }
        self.settings = next;
        Ok(())
    }

    fn update_state<T>(&mut self, change: impl FnOnce(&mut LauncherState) -> T) -> Result<T> {
        let mut next = self.state.clone();
        let out = change(&mut next);
        self.save_state(&next)?;
        self.state = next;
        Ok(out)
    }

    fn save_state(&self, state: &LauncherState) -> Result<()> {
        let raw = serde_json::to_string_pretty(state).context("serialize launcher state")?;
        fs::write(self.data_dir.join("launcher.json"), raw).context("write launcher state")?;
        Ok(())
    }

    fn write_hacks_init(&self, enabled: &BTreeSet<String>) -> Result<()> {
        let lines: Vec<&str> = self
            .hacks
            .iter()
            .filter(|hack| enabled.contains(&hack.name))
            .map(|hack| hack.command.as_str())
            .collect();
        let mut raw = lines.join("\n");
        raw.push('\n');
        fs::write(self.paths.df_dir.join(HACKS_INIT), raw).context("write hack init")?;
        Ok(())
    }

    fn list_dir(&self, kind: ListKind) -> Result<PathBuf> {
        Ok(match kind {
            ListKind::Keybinds => self.paths.keybinds_dir(),
            ListKind::Colors => self.paths.colors_dir(),
            ListKind::Embarks => self.paths.embarks_dir(),
            _ => bail!("{} are not stored as files", kind.label()),
        })
    }

    fn list_file_path(&self, kind: ListKind, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            bail!("invalid name: {name:?}");
        }
        let file_name = if name.ends_with(".txt") {
            name.to_string()
        } else {
            format!("{name}.txt")
        };
        Ok(self.list_dir(kind)?.join(file_name))
    }

    fn installed_path(&self, kind: ListKind) -> Result<PathBuf> {
        Ok(match kind {
            ListKind::Keybinds => self.paths.init_dir.join("interface.txt"),
            ListKind::Colors => self.paths.init_dir.join("colors.txt"),
            _ => bail!("{} cannot be installed as a single file", kind.label()),
        })
    }

    fn file_matches_installed(&self, kind: ListKind, item: &str) -> Result<bool, String> {
        let installed = match self.installed_path(kind) {
            Ok(path) => path,
            Err(err) => return Err(err.to_string()),
        };
        if !installed.exists() {
            return Ok(false);
        }
        let source = self.list_file_path(kind, item).map_err(|err| err.to_string())?;
        let left = fs::read(&source).map_err(|err| format!("read {}: {err}", source.display()))?;
        let right =
            fs::read(&installed).map_err(|err| format!("read {}: {err}", installed.display()))?;
        Ok(left == right)
    }

    fn embark_installed(&self, item: &str) -> Result<bool, String> {
        let source = self
            .list_file_path(ListKind::Embarks, item)
            .map_err(|err| err.to_string())?;
        let profile =
            fs::read_to_string(&source).map_err(|err| format!("read {}: {err}", source.display()))?;
        let target = self.paths.init_dir.join("embark_profiles.txt");
        if !target.exists() {
            return Ok(false);
        }
        let installed = fs::read_to_string(&target)
            .map_err(|err| format!("read {}: {err}", target.display()))?;
        Ok(installed.contains(profile.trim()))
    }
}

impl Controller for LocalController {
    fn value(&self, key: SettingKey) -> Result<SettingValue, BindingError> {
        match key {
            SettingKey::GraphicsPack => self
                .state
                .current_pack
                .clone()
                .map(SettingValue::Text)
                .ok_or(BindingError::MissingValue {
                    key,
                    reason: "no graphics pack installed".to_string(),
                }),
            SettingKey::AutoClose => Ok(SettingValue::Flag(self.state.auto_close)),
            _ => self.settings.get(key).ok_or(BindingError::MissingValue {
                key,
                reason: "not stored in settings".to_string(),
            }),
        }
    }

    fn set_value(&mut self, key: SettingKey, value: SettingValue) -> Result<(), WriteRejected> {
        match (key, value) {
            (SettingKey::GraphicsPack, _) => Err(WriteRejected::new(
                key,
                "graphics packs change through installation",
            )),
            (SettingKey::AutoClose, SettingValue::Flag(flag)) => self
                .update_state(|state| state.auto_close = flag)
                .map_err(|err| WriteRejected::new(key, format!("{err:#}"))),
            (key, value) => {
                let mut next = self.settings.clone();
                next.set(key, value)
                    .map_err(|reason| WriteRejected::new(key, reason))?;
                self.commit_settings(next)
                    .map_err(|err| WriteRejected::new(key, format!("{err:#}")))
            }
        }
    }

    fn list_items(&self, kind: ListKind) -> Result<Vec<String>> {
        match kind {
            ListKind::Keybinds | ListKind::Colors | ListKind::Embarks => {
                list_text_files(&self.list_dir(kind)?)
            }
            ListKind::Graphics => list_subdirs(&self.paths.graphics_dir()),
            ListKind::Utilities => list_utilities(&self.paths.utilities_dir()),
            ListKind::Hacks => Ok(self.hacks.iter().map(|hack| hack.name.clone()).collect()),
        }
    }

    fn status(&self, kind: ListKind, item: &str) -> Result<DisplayStatus, StatusLookupError> {
        let result = match kind {
            ListKind::Keybinds | ListKind::Colors => self.file_matches_installed(kind, item),
            ListKind::Embarks => self.embark_installed(item),
            ListKind::Graphics => Ok(self.state.current_pack.as_deref() == Some(item)),
            ListKind::Utilities => Ok(self.state.autorun.contains(item)),
            ListKind::Hacks => {
                if self.hacks.iter().any(|hack| hack.name == item) {
                    Ok(self.state.enabled_hacks.contains(item))
                } else {
                    Err("hack is not defined".to_string())
                }
            }
        };
        result.map(DisplayStatus::from).map_err(|reason| StatusLookupError {
            kind,
            item: item.to_string(),
            reason,
        })
    }
}

fn toggle_member(set: &mut BTreeSet<String>, item: &str) -> bool {
    if set.remove(item) {
        false
    } else {
        set.insert(item.to_string());
        true
    }
}

/// Copies every file below `source` to the same relative path below `dest`.
fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.with_context(|| format!("walk {}", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(source).context("rel path")?;
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(entry.path(), &target).with_context(|| format!("copy {}", rel.display()))?;
        copied += 1;
    }
    Ok(copied)
}

fn load_hacks(path: &Path) -> Result<Vec<HackDefinition>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).context("read hacks.json")?;
    serde_json::from_str(&raw).context("parse hacks.json")
}

fn list_text_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry.context("read dir entry")?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn list_subdirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry.context("read dir entry")?.path();
        if path.is_dir() {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Utility paths relative to the utilities folder, with `/` separators.
fn list_utilities(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.context("walk utilities")?;
        if !entry.file_type().is_file() || !is_utility(entry.path()) {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).context("rel path")?;
        let parts: Vec<String> = rel
            .components()
            .map(|part| part.as_os_str().to_string_lossy().to_string())
            .collect();
        items.push(parts.join("/"));
    }
    Ok(items)
}

fn is_utility(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| UTILITY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn program_command(path: &Path) -> (PathBuf, Vec<PathBuf>) {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("jar") => (
            PathBuf::from("java"),
            vec![PathBuf::from("-jar"), path.to_path_buf()],
        ),
        Some("sh") => (PathBuf::from("sh"), vec![path.to_path_buf()]),
        Some("py") => (PathBuf::from("python3"), vec![path.to_path_buf()]),
        _ => (path.to_path_buf(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{fake_install, write};
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> LocalController {
        let df = fake_install(temp.path());
        let paths = GamePaths::resolve(&df).unwrap();
        LocalController::open(paths, &temp.path().join("launcher-data")).unwrap()
    }

    #[test]
    fn lists_come_from_the_lnp_folder() {
        let temp = TempDir::new().unwrap();
        let controller = open(&temp);
        assert_eq!(
            controller.list_items(ListKind::Keybinds).unwrap(),
            vec!["classic", "laptop"]
        );
        assert_eq!(
            controller.list_items(ListKind::Graphics).unwrap(),
            vec!["Phoebus", "Spacefox"]
        );
        assert_eq!(
            controller.list_items(ListKind::Utilities).unwrap(),
            vec!["Therapist/Therapist.sh"]
        );
        assert_eq!(
            controller.list_items(ListKind::Hacks).unwrap(),
            vec!["Tweak temperature"]
        );
    }

    #[test]
    fn keybind_status_tracks_installed_file() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        assert_eq!(
            controller.status(ListKind::Keybinds, "classic").unwrap(),
            DisplayStatus::Yes
        );
        assert_eq!(
            controller.status(ListKind::Keybinds, "laptop").unwrap(),
            DisplayStatus::No
        );

        controller.load_file(ListKind::Keybinds, "laptop").unwrap();
        assert_eq!(
            controller.status(ListKind::Keybinds, "laptop").unwrap(),
            DisplayStatus::Yes
        );

        let err = controller.status(ListKind::Keybinds, "missing").unwrap_err();
        assert_eq!(err.item, "missing");
    }

    #[test]
    fn save_and_delete_list_files() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        assert!(!controller.file_exists(ListKind::Colors, "mine"));
        controller.save_file(ListKind::Colors, "mine").unwrap();
        assert!(controller.file_exists(ListKind::Colors, "mine.txt"));
        controller.delete_file(ListKind::Colors, "mine").unwrap();
        assert!(!controller.file_exists(ListKind::Colors, "mine"));
        assert!(controller.save_file(ListKind::Colors, "../escape").is_err());
    }

    #[test]
    fn settings_writes_persist_and_reject_bad_values() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        controller
            .set_value(SettingKey::PopCap, SettingValue::Int(150))
            .unwrap();
        let err = controller
            .set_value(SettingKey::Volume, SettingValue::Int(999))
            .unwrap_err();
        assert_eq!(err.key, SettingKey::Volume);
        assert!(controller
            .set_value(SettingKey::GraphicsPack, SettingValue::Text("x".to_string()))
            .is_err());

        let reopened = open(&temp);
        assert_eq!(reopened.value(SettingKey::PopCap), Ok(SettingValue::Int(150)));
    }

    #[test]
    fn graphics_value_is_missing_until_installed() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        assert!(matches!(
            controller.value(SettingKey::GraphicsPack),
            Err(BindingError::MissingValue { .. })
        ));
        assert_eq!(controller.install_graphics("Phoebus", false).unwrap(), 1);
        assert_eq!(
            controller.value(SettingKey::GraphicsPack),
            Ok(SettingValue::Text("Phoebus".to_string()))
        );
        assert_eq!(
            controller.status(ListKind::Graphics, "Phoebus").unwrap(),
            DisplayStatus::Yes
        );
        assert!(controller.install_graphics("Nope", false).is_err());
    }

    #[test]
    fn toggles_autorun_and_hacks() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        assert!(controller.toggle_autorun("Therapist/Therapist.sh").unwrap());
        assert_eq!(
            controller
                .status(ListKind::Utilities, "Therapist/Therapist.sh")
                .unwrap(),
            DisplayStatus::Yes
        );
        assert!(!controller.toggle_autorun("Therapist/Therapist.sh").unwrap());

        assert!(controller.toggle_hack("Tweak temperature").unwrap());
        let init = fs::read_to_string(controller.paths().df_dir.join(HACKS_INIT)).unwrap();
        assert_eq!(init, "tweak temp\n");
        assert!(controller.toggle_hack("Unknown").is_err());
        assert!(controller.status(ListKind::Hacks, "Unknown").is_err());
        assert_eq!(controller.hack_tooltip("Tweak temperature"), Some("Fixes temperature"));
    }

    #[test]
    fn embarks_install_once() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        write(
            &controller.paths().embarks_dir().join("miner.txt"),
            "[PROFILE:miner]",
        );
        let names = vec!["default".to_string(), "miner".to_string()];
        assert_eq!(controller.install_embarks(&names).unwrap(), 2);
        assert_eq!(controller.install_embarks(&names).unwrap(), 0);
        assert_eq!(
            controller.status(ListKind::Embarks, "miner").unwrap(),
            DisplayStatus::Yes
        );
    }

    #[test]
    fn auto_close_round_trips() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        assert_eq!(controller.value(SettingKey::AutoClose), Ok(SettingValue::Flag(false)));
        assert!(controller.toggle_auto_close().unwrap());
        assert!(controller.auto_close());
    }

    #[test]
    fn failed_writes_leave_values_unchanged() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        fs::remove_dir_all(temp.path().join("launcher-data")).unwrap();

        assert!(controller
            .set_value(SettingKey::PopCap, SettingValue::Int(7))
            .is_err());
        assert_eq!(controller.value(SettingKey::PopCap), Ok(SettingValue::Int(200)));

        assert!(controller.cycle_option(SettingKey::Weather).is_err());
        assert_eq!(
            controller.value(SettingKey::Weather),
            Ok(SettingValue::Choice("YES".to_string()))
        );

        assert!(controller.toggle_auto_close().is_err());
        assert_eq!(controller.value(SettingKey::AutoClose), Ok(SettingValue::Flag(false)));

        assert!(controller.toggle_autorun("Therapist/Therapist.sh").is_err());
        assert_eq!(
            controller
                .status(ListKind::Utilities, "Therapist/Therapist.sh")
                .unwrap(),
            DisplayStatus::No
        );

        assert!(controller.toggle_hack("Tweak temperature").is_err());
        assert_eq!(
            controller.status(ListKind::Hacks, "Tweak temperature").unwrap(),
            DisplayStatus::No
        );
        let init = fs::read_to_string(controller.paths().df_dir.join(HACKS_INIT)).unwrap();
        assert_eq!(init, "\n");
    }

    #[test]
    fn setting_writes_reach_the_init_files() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        controller
            .set_value(SettingKey::Sound, SettingValue::Choice("NO".to_string()))
            .unwrap();
        controller
            .set_value(SettingKey::ChildCap, SettingValue::Text("5:20".to_string()))
            .unwrap();
        let init_dir = &controller.paths().init_dir;
        let init = fs::read_to_string(init_dir.join("init.txt")).unwrap();
        let d_init = fs::read_to_string(init_dir.join("d_init.txt")).unwrap();
        assert!(init.starts_with("[SOUND:NO]"));
        assert!(d_init.contains("[BABY_CHILD_CAP:5:20]"));
        assert!(d_init.contains("[POPULATION_CAP:200]"));
    }

    #[test]
    fn reload_picks_up_hand_edited_init_files() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        let d_init = controller.paths().init_dir.join("d_init.txt");
        write(&d_init, "[POPULATION_CAP:35]\n[WEATHER:NO]\n");
        assert_eq!(controller.value(SettingKey::PopCap), Ok(SettingValue::Int(200)));

        controller.reload().unwrap();
        assert_eq!(controller.value(SettingKey::PopCap), Ok(SettingValue::Int(35)));
        assert_eq!(
            controller.value(SettingKey::Weather),
            Ok(SettingValue::Choice("NO".to_string()))
        );

        controller.save_params().unwrap();
        let reopened = LocalController::open(
            controller.paths().clone(),
            &temp.path().join("launcher-data"),
        )
        .unwrap();
        assert_eq!(reopened.value(SettingKey::PopCap), Ok(SettingValue::Int(35)));
    }

    #[test]
    fn graphics_install_either_keeps_or_patches_pack_inits() {
        let temp = TempDir::new().unwrap();
        let mut controller = open(&temp);
        write(
            &controller
                .paths()
                .graphics_dir()
                .join("Phoebus/data/init/init.txt"),
            "[SOUND:NO][TRUETYPE:NO]",
        );
        let init_path = controller.paths().init_dir.join("init.txt");

        controller.install_graphics("Phoebus", false).unwrap();
        assert_eq!(
            controller.value(SettingKey::Sound),
            Ok(SettingValue::Choice("NO".to_string()))
        );
        assert_eq!(fs::read_to_string(&init_path).unwrap(), "[SOUND:NO][TRUETYPE:NO]");

        controller
            .set_value(SettingKey::Sound, SettingValue::Choice("YES".to_string()))
            .unwrap();
        controller.install_graphics("Phoebus", true).unwrap();
        let init = fs::read_to_string(&init_path).unwrap();
        assert!(init.starts_with("[SOUND:YES][TRUETYPE:NO]"));
    }

    #[test]
    fn savegames_receive_the_installed_graphics_raws() {
        let temp = TempDir::new().unwrap();
        let controller = open(&temp);
        assert_eq!(controller.update_savegames().unwrap(), 0);

        let df = &controller.paths().df_dir;
        write(&df.join("raw/graphics/graphics_dwarf.txt"), "new");
        write(&df.join("data/save/region1/raw/graphics/stale.txt"), "old");
        write(&df.join("data/save/current/raw/graphics/stale.txt"), "old");
        assert_eq!(controller.update_savegames().unwrap(), 1);

        let region = df.join("data/save/region1/raw/graphics");
        assert!(region.join("graphics_dwarf.txt").is_file());
        assert!(!region.join("stale.txt").exists());
        assert!(df.join("data/save/current/raw/graphics/stale.txt").is_file());
    }

    #[test]
    fn color_schemes_read_saved_and_installed_files() {
        let temp = TempDir::new().unwrap();
        let controller = open(&temp);
        let dark = controller.color_scheme(Some("dark")).unwrap();
        assert_eq!(dark.colors[0].r, 10);
        let installed = controller.color_scheme(None).unwrap();
        assert_eq!(installed.colors[0].r, 0);
        assert!(controller.color_scheme(Some("missing")).is_err());
    }
}
