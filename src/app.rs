use crate::{
    colors::ColorScheme,
    config::AppConfig,
    controller::{Controller, ListKind, LocalController},
    error::{BindingError, SyncError},
    game::GamePaths,
    listview::{utility_label, ListView},
    registry::{Control, ControlKind, ControlRegistry, Projection},
    settings::{split_child_cap, SettingKey, SettingValue},
    tooltip::{HoverNotifier, HoverTracker, Point},
};
use anyhow::{bail, Context, Result};
use ratatui::layout::Rect;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use time::{macros::format_description, OffsetDateTime};

const LOG_CAPACITY: usize = 400;
const TOOLTIP_CELL_OFFSET: (u16, u16) = (2, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Options,
    Graphics,
    Utilities,
    Advanced,
    Hacks,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Tab::Options => "Options",
            Tab::Graphics => "Graphics",
            Tab::Utilities => "Utilities",
            Tab::Advanced => "Advanced",
            Tab::Hacks => "DFHack",
        }
    }

    pub fn controls(self) -> &'static [SettingKey] {
        match self {
            Tab::Options => &[
                SettingKey::PopCap,
                SettingKey::Invaders,
                SettingKey::ChildCap,
                SettingKey::CaveIns,
                SettingKey::Temperature,
                SettingKey::LiquidDepth,
                SettingKey::Weather,
                SettingKey::VariedGround,
                SettingKey::LaborLists,
                SettingKey::Aquifers,
            ],
            Tab::Graphics => &[SettingKey::GraphicsPack, SettingKey::TrueType],
            Tab::Utilities | Tab::Hacks => &[],
            Tab::Advanced => &[
                SettingKey::Sound,
                SettingKey::Volume,
                SettingKey::FpsCounter,
                SettingKey::FpsCap,
                SettingKey::GpsCap,
                SettingKey::IntroMovie,
                SettingKey::StartWindowed,
                SettingKey::AutoSave,
                SettingKey::InitialSave,
                SettingKey::AutoSavePause,
                SettingKey::PauseOnLoad,
                SettingKey::AutoBackup,
                SettingKey::CompressSaves,
                SettingKey::ProcPriority,
                SettingKey::AutoClose,
            ],
        }
    }

    pub fn lists(self) -> &'static [ListKind] {
        match self {
            Tab::Options => &[ListKind::Keybinds, ListKind::Embarks],
            Tab::Graphics => &[ListKind::Graphics, ListKind::Colors],
            Tab::Utilities => &[ListKind::Utilities],
            Tab::Advanced => &[],
            Tab::Hacks => &[ListKind::Hacks],
        }
    }

    fn panes(self) -> Vec<Focus> {
        let mut panes = Vec::new();
        if !self.controls().is_empty() {
            panes.push(Focus::Controls);
        }
        panes.extend(self.lists().iter().map(|kind| Focus::List(*kind)));
        panes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Controls,
    List(ListKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoverTarget {
    Control(SettingKey),
    List(ListKind),
    Play,
}

/// Screen areas recorded by the last draw, used for mouse hit-testing.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    pub tabs: Vec<(Tab, Rect)>,
    pub controls: Vec<(SettingKey, Rect)>,
    pub lists: Vec<ListHit>,
    pub play: Option<Rect>,
}

#[derive(Debug, Clone, Copy)]
pub struct ListHit {
    pub kind: ListKind,
    /// Area holding the rows, header excluded.
    pub rows: Rect,
    pub offset: usize,
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x
        && y >= area.y
        && x < area.x.saturating_add(area.width)
        && y < area.y.saturating_add(area.height)
}

impl HitMap {
    fn tab_at(&self, x: u16, y: u16) -> Option<Tab> {
        self.tabs
            .iter()
            .find(|(_, area)| contains(*area, x, y))
            .map(|(tab, _)| *tab)
    }

    fn control_at(&self, x: u16, y: u16) -> Option<SettingKey> {
        self.controls
            .iter()
            .find(|(_, area)| contains(*area, x, y))
            .map(|(key, _)| *key)
    }

    fn row_at(&self, x: u16, y: u16) -> Option<(ListKind, usize)> {
        self.lists
            .iter()
            .find(|hit| contains(hit.rows, x, y))
            .map(|hit| (hit.kind, hit.offset + (y - hit.rows.y) as usize))
    }

    fn regions(&self) -> Vec<(HoverTarget, Rect)> {
        let mut regions: Vec<(HoverTarget, Rect)> = self
            .controls
            .iter()
            .map(|(key, area)| (HoverTarget::Control(*key), *area))
            .collect();
        regions.extend(
            self.lists
                .iter()
                .map(|hit| (HoverTarget::List(hit.kind), hit.rows)),
        );
        if let Some(play) = self.play {
            regions.push((HoverTarget::Play, play));
        }
        regions
    }
}

/// Every list display, owned in one place and rebuilt from the controller.
#[derive(Debug, Default)]
pub struct Lists {
    pub keybinds: ListView,
    pub graphics: ListView,
    pub utilities: ListView,
    pub colors: ListView,
    pub embarks: ListView,
    pub hacks: ListView,
}

impl Lists {
    pub fn get(&self, kind: ListKind) -> &ListView {
        match kind {
            ListKind::Keybinds => &self.keybinds,
            ListKind::Graphics => &self.graphics,
            ListKind::Utilities => &self.utilities,
            ListKind::Colors => &self.colors,
            ListKind::Embarks => &self.embarks,
            ListKind::Hacks => &self.hacks,
        }
    }

    pub fn get_mut(&mut self, kind: ListKind) -> &mut ListView {
        match kind {
            ListKind::Keybinds => &mut self.keybinds,
            ListKind::Graphics => &mut self.graphics,
            ListKind::Utilities => &mut self.utilities,
            ListKind::Colors => &mut self.colors,
            ListKind::Embarks => &mut self.embarks,
            ListKind::Hacks => &mut self.hacks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    PopCap,
    ChildCapAbsolute,
    ChildCapPercent { absolute: String },
    SaveListFile(ListKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    DeleteListFile { kind: ListKind, name: String },
    OverwriteListFile { kind: ListKind, name: String },
    InstallGraphics { pack: String },
    UpdateSavegames,
    RestoreDefaults,
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

/// Swatches for the color scheme selected in the list, or the installed one
/// when nothing is selected.
#[derive(Debug, Clone)]
pub struct ColorPreview {
    pub source: Option<String>,
    pub scheme: Option<ColorScheme>,
}

pub struct App {
    pub config: AppConfig,
    pub controller: LocalController,
    pub registry: ControlRegistry,
    pub lists: Lists,
    pub tab: Tab,
    pub focus: Focus,
    pub control_selected: usize,
    /// Entry control receiving typed digits. Set by activating the entry.
    pub editing_entry: Option<SettingKey>,
    pub input_mode: InputMode,
    pub dialog: Option<Dialog>,
    pub status: String,
    pub toast: Option<Toast>,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub should_quit: bool,
    pub hover: HoverTracker<HoverTarget>,
    pub color_preview: Option<ColorPreview>,
    hit_map: HitMap,
    last_refresh_failures: Vec<BindingError>,
    log_path: PathBuf,
}

impl App {
    pub fn initialize(config: AppConfig, df_dir: &Path) -> Result<Self> {
        let data_dir = crate::config::base_data_dir()?;
        let paths = GamePaths::resolve(df_dir)?;
        let controller = LocalController::open(paths, &data_dir)?;
        Self::new(config, controller, &data_dir)
    }

    pub fn new(config: AppConfig, controller: LocalController, data_dir: &Path) -> Result<Self> {
        let registry = build_registry().context("register controls")?;
        let mut hover = HoverTracker::new();
        for key in registry.keys() {
            hover.attach(HoverTarget::Control(key), cell_notifier(control_tooltip(key)));
        }
        for kind in [
            ListKind::Keybinds,
            ListKind::Graphics,
            ListKind::Utilities,
            ListKind::Colors,
            ListKind::Embarks,
            ListKind::Hacks,
        ] {
            hover.attach(HoverTarget::List(kind), cell_notifier(list_tooltip(kind)));
        }
        hover.attach(HoverTarget::Play, cell_notifier("Play the game!"));

        let mut app = Self {
            config,
            controller,
            registry,
            lists: Lists::default(),
            tab: Tab::Options,
            focus: Focus::Controls,
            control_selected: 0,
            editing_entry: None,
            input_mode: InputMode::Normal,
            dialog: None,
            status: "Ready".to_string(),
            toast: None,
            logs: Vec::new(),
            log_scroll: 0,
            should_quit: false,
            hover,
            color_preview: None,
            hit_map: HitMap::default(),
            last_refresh_failures: Vec::new(),
            log_path: data_dir.join("dflaunch.log"),
        };
        app.log_info(format!(
            "Using game folder {} ({} controls bound)",
            app.controller.paths().df_dir.display(),
            app.registry.len()
        ));
        app.read_all_lists();
        app.refresh_displays();
        Ok(app)
    }

    pub fn tabs(&self) -> Vec<Tab> {
        let mut tabs = vec![Tab::Options, Tab::Graphics, Tab::Utilities, Tab::Advanced];
        if self.controller.has_hacks() {
            tabs.push(Tab::Hacks);
        }
        tabs
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= now {
                self.toast = None;
            }
        }
        self.hover.tick(now);
        self.sync_color_preview();
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel, duration: Duration) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + duration,
        });
    }

    pub fn hint(&self) -> &'static str {
        if self.editing_entry.is_some() {
            return "Digits edit | Left/Right move | Enter or Esc done";
        }
        match self.focus {
            Focus::Controls => {
                "Enter toggle/edit | Tab pane | 1-5 tab | Ctrl+L reload | Ctrl+S save | q quit"
            }
            Focus::List(ListKind::Keybinds) | Focus::List(ListKind::Colors) => {
                "Enter load | s save | Del delete | r refresh"
            }
            Focus::List(ListKind::Embarks) => "Enter install | r refresh",
            Focus::List(ListKind::Graphics) => "Enter install | I init patching | r refresh",
            Focus::List(ListKind::Utilities) => "Enter run | a auto-run | h paths | r refresh",
            Focus::List(ListKind::Hacks) => "Enter toggle hack",
        }
    }

    // Navigation

    pub fn select_tab(&mut self, tab: Tab) {
        if !self.tabs().contains(&tab) {
            return;
        }
        self.tab = tab;
        self.control_selected = 0;
        self.editing_entry = None;
        self.focus = tab.panes().first().copied().unwrap_or(Focus::Controls);
        if let Focus::List(kind) = self.focus {
            self.ensure_list_selection(kind);
        }
    }

    pub fn select_tab_index(&mut self, index: usize) {
        if let Some(tab) = self.tabs().get(index).copied() {
            self.select_tab(tab);
        }
    }

    pub fn cycle_focus(&mut self) {
        let panes = self.tab.panes();
        if panes.is_empty() {
            return;
        }
        self.editing_entry = None;
        let current = panes.iter().position(|pane| *pane == self.focus).unwrap_or(0);
        self.focus = panes[(current + 1) % panes.len()];
        if let Focus::List(kind) = self.focus {
            self.ensure_list_selection(kind);
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.editing_entry = None;
        match self.focus {
            Focus::Controls => {
                let count = self.tab.controls().len();
                if count == 0 {
                    return;
                }
                let next = (self.control_selected as isize + delta).clamp(0, count as isize - 1);
                self.control_selected = next as usize;
            }
            Focus::List(kind) => {
                let list = self.lists.get_mut(kind);
                if delta < 0 {
                    list.select_prev();
                } else {
                    list.select_next();
                }
            }
        }
    }

    pub fn selected_control(&self) -> Option<SettingKey> {
        if self.focus != Focus::Controls {
            return None;
        }
        self.tab.controls().get(self.control_selected).copied()
    }

    fn ensure_list_selection(&mut self, kind: ListKind) {
        let list = self.lists.get_mut(kind);
        if list.selected().is_none() {
            list.select(Some(0));
        }
    }

    // Display synchronization

    /// Re-renders every control from the controller. Failures are logged
    /// once per change so a persistent gap does not flood the log.
    pub fn refresh_displays(&mut self) {
        let report = self.registry.refresh(&self.controller);
        if report.is_clean() && self.last_refresh_failures.is_empty() {
            return;
        }
        let mut failures = report.failures;
        failures.sort_by_key(|err| match err {
            BindingError::DuplicateKey(key)
            | BindingError::UnboundKey(key)
            | BindingError::MissingValue { key, .. } => *key,
        });
        if failures != self.last_refresh_failures {
            for failure in &failures {
                self.log_warn(format!("Display refresh: {failure}"));
            }
            self.last_refresh_failures = failures;
        }
    }

    pub fn read_list(&mut self, kind: ListKind) {
        let items = match self.controller.list_items(kind) {
            Ok(items) => items,
            Err(err) => {
                self.log_error(format!("Reading {} failed: {err:#}", kind.label()));
                Vec::new()
            }
        };
        let hide_path = self.config.hide_utility_path;
        let controller = &self.controller;
        let failures = self.lists.get_mut(kind).project(
            &items,
            |item| controller.status(kind, item),
            |item| match kind {
                ListKind::Utilities => utility_label(item, hide_path),
                _ => item.to_string(),
            },
        );
        for failure in failures {
            self.log_warn(failure.to_string());
        }
        if kind == ListKind::Colors {
            self.color_preview = None;
        }
    }

    /// Reloads the colors for the scheme under the cursor when it changed.
    pub fn sync_color_preview(&mut self) {
        let source = self
            .lists
            .colors
            .selected_row()
            .map(|row| row.source.clone());
        if self
            .color_preview
            .as_ref()
            .is_some_and(|preview| preview.source == source)
        {
            return;
        }
        let scheme = match self.controller.color_scheme(source.as_deref()) {
            Ok(scheme) => Some(scheme),
            Err(err) => {
                self.log_warn(format!("Color preview unavailable: {err:#}"));
                None
            }
        };
        self.color_preview = Some(ColorPreview { source, scheme });
    }

    pub fn read_all_lists(&mut self) {
        for kind in [
            ListKind::Keybinds,
            ListKind::Graphics,
            ListKind::Utilities,
            ListKind::Colors,
            ListKind::Embarks,
        ] {
            self.read_list(kind);
        }
        if self.controller.has_hacks() {
            self.read_list(ListKind::Hacks);
        }
    }

    /// Rebuilds a list after a command and puts the cursor back on the same
    /// index; row identity does not survive the rebuild.
    fn reread_list_keeping_cursor(&mut self, kind: ListKind) {
        let cursor = self.lists.get(kind).selected();
        self.read_list(kind);
        self.lists.get_mut(kind).select(cursor);
    }

    // Control commands

    pub fn activate_selected(&mut self) -> Result<()> {
        match self.focus {
            Focus::Controls => match self.selected_control() {
                Some(key) => self.activate_control(key),
                None => Ok(()),
            },
            Focus::List(kind) => self.activate_list(kind),
        }
    }

    pub fn activate_control(&mut self, key: SettingKey) -> Result<()> {
        self.editing_entry = None;
        let kind = self
            .registry
            .control_for(key)
            .map(|control| control.kind)
            .context("control not registered")?;
        match (key, kind) {
            (SettingKey::PopCap, _) => {
                let current = self
                    .controller
                    .value(key)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                self.start_input("Population cap", current, InputPurpose::PopCap);
            }
            (SettingKey::ChildCap, _) => {
                let current = self
                    .controller
                    .value(key)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                let (absolute, _) = split_child_cap(&current);
                self.start_input(
                    "Absolute cap on babies + children",
                    absolute,
                    InputPurpose::ChildCapAbsolute,
                );
            }
            (SettingKey::AutoClose, _) => {
                let enabled = self.controller.toggle_auto_close()?;
                self.status = format!("Close on launch: {}", if enabled { "on" } else { "off" });
                self.refresh_displays();
            }
            (_, ControlKind::Entry) => {
                self.editing_entry = Some(key);
                self.status = format!("Editing {key}; Enter or Esc to finish");
            }
            (_, ControlKind::Label) => {
                if key == SettingKey::GraphicsPack {
                    self.status = "Install a pack from the list below".to_string();
                }
            }
            (key, ControlKind::Button) if key.is_cyclable() => {
                let value = self.controller.cycle_option(key)?;
                self.log_info(format!("{key} set to {value}"));
                self.refresh_displays();
                if let Some(control) = self.registry.control_for(key) {
                    self.status = control.display_text();
                }
            }
            (key, ControlKind::Button) => bail!("{key} has no action"),
        }
        Ok(())
    }

    /// Applies a keystroke to the focused entry and writes the result through
    /// without a full refresh, so the cursor stays where the user left it.
    pub fn edit_entry(&mut self, key: SettingKey, edit: EntryEdit) {
        let Some(control) = self.registry.control_mut(key) else {
            return;
        };
        if control.kind != ControlKind::Entry {
            return;
        }
        let changed = match edit {
            EntryEdit::Insert(c) => control.insert_char(c),
            EntryEdit::Backspace => control.backspace(),
            EntryEdit::Left => {
                control.move_cursor(-1);
                false
            }
            EntryEdit::Right => {
                control.move_cursor(1);
                false
            }
        };
        if !changed || control.value().is_empty() {
            return;
        }
        match self.registry.set_from_control(key, &mut self.controller) {
            Ok(value) => self.status = format!("{key} set to {value}"),
            Err(err) => self.report_sync_error(err),
        }
    }

    pub fn finish_entry_edit(&mut self) {
        if let Some(key) = self.editing_entry.take() {
            self.status = format!("Finished editing {key}");
        }
    }

    fn report_sync_error(&mut self, err: SyncError) {
        self.status = err.to_string();
        self.log_error(err.to_string());
        self.set_toast(&err.to_string(), ToastLevel::Error, Duration::from_secs(3));
    }

    fn write_value(&mut self, key: SettingKey, value: SettingValue) {
        match self.controller.set_value(key, value.clone()) {
            Ok(()) => {
                self.log_info(format!("{key} set to {value}"));
                self.refresh_displays();
            }
            Err(err) => self.report_sync_error(err.into()),
        }
    }

    // Input prompts

    pub fn start_input(&mut self, prompt: &str, initial: String, purpose: InputPurpose) {
        self.input_mode = InputMode::Editing {
            prompt: prompt.to_string(),
            buffer: initial,
            purpose,
        };
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) -> Result<()> {
        match purpose {
            InputPurpose::PopCap => {
                let cap = parse_cap(&value)?;
                self.write_value(SettingKey::PopCap, SettingValue::Int(cap));
            }
            InputPurpose::ChildCapAbsolute => {
                let absolute = parse_cap(&value)?.to_string();
                let current = self
                    .controller
                    .value(SettingKey::ChildCap)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                let (_, percent) = split_child_cap(&current);
                self.start_input(
                    "Max percentage of children in fort",
                    percent,
                    InputPurpose::ChildCapPercent { absolute },
                );
            }
            InputPurpose::ChildCapPercent { absolute } => {
                let percent = parse_cap(&value)?;
                self.write_value(
                    SettingKey::ChildCap,
                    SettingValue::Text(format!("{absolute}:{percent}")),
                );
            }
            InputPurpose::SaveListFile(kind) => {
                let name = value.trim().to_string();
                if self.controller.file_exists(kind, &name) {
                    self.open_dialog(Dialog {
                        title: "Overwrite file?".to_string(),
                        message: format!("Overwrite {name}?"),
                        yes_label: "Overwrite".to_string(),
                        no_label: "Cancel".to_string(),
                        choice: DialogChoice::No,
                        kind: DialogKind::OverwriteListFile { kind, name },
                    });
                } else {
                    self.save_list_file(kind, &name)?;
                }
            }
        }
        Ok(())
    }

    // List commands

    pub fn activate_list(&mut self, kind: ListKind) -> Result<()> {
        let Some(row) = self.lists.get(kind).selected_row().cloned() else {
            self.status = format!("No {} selected", kind.label());
            return Ok(());
        };
        match kind {
            ListKind::Keybinds | ListKind::Colors => {
                self.controller.load_file(kind, &row.source)?;
                self.status = format!("Loaded {}", row.source);
                self.log_info(format!("Loaded {} {}", kind.label(), row.source));
                self.reread_list_keeping_cursor(kind);
            }
            ListKind::Embarks => {
                let installed = self.controller.install_embarks(&[row.source.clone()])?;
                self.status = if installed == 0 {
                    format!("{} already installed", row.source)
                } else {
                    format!("Installed {}", row.source)
                };
                self.reread_list_keeping_cursor(kind);
            }
            ListKind::Graphics => {
                if self.config.confirm_graphics_install {
                    self.open_dialog(Dialog {
                        title: "Are you sure?".to_string(),
                        message: "Your graphics, settings and raws will be changed.".to_string(),
                        yes_label: "Install".to_string(),
                        no_label: "Cancel".to_string(),
                        choice: DialogChoice::Yes,
                        kind: DialogKind::InstallGraphics { pack: row.source },
                    });
                } else {
                    self.install_graphics(&row.source)?;
                }
            }
            ListKind::Utilities => {
                self.controller.run_program(&row.source)?;
                self.status = format!("Started {}", row.label);
                self.log_info(format!("Started utility {}", row.source));
            }
            ListKind::Hacks => self.toggle_hack()?,
        }
        Ok(())
    }

    pub fn toggle_autorun(&mut self) -> Result<()> {
        let Some(row) = self.lists.utilities.selected_row().cloned() else {
            return Ok(());
        };
        let enabled = self.controller.toggle_autorun(&row.source)?;
        self.status = format!(
            "Auto-run {} for {}",
            if enabled { "enabled" } else { "disabled" },
            row.label
        );
        self.reread_list_keeping_cursor(ListKind::Utilities);
        Ok(())
    }

    pub fn toggle_hack(&mut self) -> Result<()> {
        let Some(row) = self.lists.hacks.selected_row().cloned() else {
            return Ok(());
        };
        let enabled = self.controller.toggle_hack(&row.source)?;
        self.log_info(format!(
            "Hack {} {}",
            row.source,
            if enabled { "enabled" } else { "disabled" }
        ));
        self.reread_list_keeping_cursor(ListKind::Hacks);
        Ok(())
    }

    pub fn request_save(&mut self, kind: ListKind) {
        if !matches!(kind, ListKind::Keybinds | ListKind::Colors) {
            return;
        }
        let prompt = match kind {
            ListKind::Keybinds => "Save current keybindings as",
            _ => "Save current color scheme as",
        };
        self.start_input(prompt, String::new(), InputPurpose::SaveListFile(kind));
    }

    pub fn request_delete(&mut self, kind: ListKind) -> Result<()> {
        if !matches!(kind, ListKind::Keybinds | ListKind::Colors) {
            return Ok(());
        }
        let Some(row) = self.lists.get(kind).selected_row().cloned() else {
            return Ok(());
        };
        if !self.config.confirm_delete {
            return self.delete_list_file(kind, &row.source);
        }
        self.open_dialog(Dialog {
            title: "Delete file?".to_string(),
            message: format!("Are you sure you want to delete {}?", row.source),
            yes_label: "Delete".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::DeleteListFile {
                kind,
                name: row.source,
            },
        });
        Ok(())
    }

    pub fn request_restore_defaults(&mut self) {
        self.open_dialog(Dialog {
            title: "Restore defaults?".to_string(),
            message: "Reset everything to default settings?".to_string(),
            yes_label: "Reset".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::RestoreDefaults,
        });
    }

    pub fn toggle_utility_paths(&mut self) -> Result<()> {
        self.config.hide_utility_path = !self.config.hide_utility_path;
        self.config.save()?;
        self.reread_list_keeping_cursor(ListKind::Utilities);
        Ok(())
    }

    pub fn toggle_patch_inits(&mut self) -> Result<()> {
        self.config.patch_inits = !self.config.patch_inits;
        self.config.save()?;
        self.status = if self.config.patch_inits {
            "Graphics installs will patch init.txt and d_init.txt".to_string()
        } else {
            "Graphics installs will replace init.txt and d_init.txt".to_string()
        };
        self.log_info(self.status.clone());
        Ok(())
    }

    /// Takes settings again from disk, including hand edits to the init files.
    pub fn reload_params(&mut self) -> Result<()> {
        self.controller.reload()?;
        self.read_all_lists();
        self.refresh_displays();
        self.status = "Settings reloaded".to_string();
        self.log_info("Settings reloaded from disk".to_string());
        Ok(())
    }

    pub fn save_params(&mut self) -> Result<()> {
        self.controller.save_params()?;
        self.status = "Settings saved".to_string();
        self.log_info("Settings written to the init files".to_string());
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        let failed = self.controller.run_game()?;
        self.log_info("Game launched".to_string());
        for item in failed {
            self.log_warn(format!("Auto-run utility failed to start: {item}"));
        }
        self.status = "Game launched".to_string();
        if self.controller.auto_close() {
            self.should_quit = true;
        }
        Ok(())
    }

    fn save_list_file(&mut self, kind: ListKind, name: &str) -> Result<()> {
        self.controller.save_file(kind, name)?;
        self.status = format!("Saved {name}");
        self.log_info(format!("Saved {} {name}", kind.label()));
        self.read_list(kind);
        Ok(())
    }

    fn delete_list_file(&mut self, kind: ListKind, name: &str) -> Result<()> {
        self.controller.delete_file(kind, name)?;
        self.status = format!("Deleted {name}");
        self.log_info(format!("Deleted {} {name}", kind.label()));
        self.read_list(kind);
        Ok(())
    }

    fn restore_defaults(&mut self) -> Result<()> {
        self.controller.restore_defaults()?;
        self.log_info("Settings restored to defaults".to_string());
        self.refresh_displays();
        Ok(())
    }

    fn install_graphics(&mut self, pack: &str) -> Result<()> {
        let copied = self
            .controller
            .install_graphics(pack, self.config.patch_inits)?;
        self.status = format!("Installed {pack}");
        self.log_info(format!("Installed graphics pack {pack} ({copied} files)"));
        self.refresh_displays();
        self.reread_list_keeping_cursor(ListKind::Graphics);
        self.open_dialog(Dialog {
            title: "Update savegames?".to_string(),
            message: "Copy the new graphics raws into existing saves?\n\
                      Saves keep their old graphics otherwise."
                .to_string(),
            yes_label: "Update".to_string(),
            no_label: "Skip".to_string(),
            choice: DialogChoice::Yes,
            kind: DialogKind::UpdateSavegames,
        });
        Ok(())
    }

    fn update_savegames(&mut self) -> Result<()> {
        let updated = self.controller.update_savegames()?;
        self.status = if updated == 0 {
            "No savegames to update".to_string()
        } else {
            format!("{updated} savegames updated")
        };
        self.log_info(self.status.clone());
        Ok(())
    }

    // Dialogs

    fn open_dialog(&mut self, dialog: Dialog) {
        self.dialog = Some(dialog);
        self.input_mode = InputMode::Normal;
    }

    pub fn dialog_choice_left(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::Yes;
        }
    }

    pub fn dialog_choice_right(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::No;
        }
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
    }

    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        if dialog.choice != DialogChoice::Yes {
            self.status = format!("{} cancelled", dialog.title.trim_end_matches('?'));
            return;
        }
        let result = match dialog.kind {
            DialogKind::DeleteListFile { kind, name } => self.delete_list_file(kind, &name),
            DialogKind::OverwriteListFile { kind, name } => self.save_list_file(kind, &name),
            DialogKind::InstallGraphics { pack } => self.install_graphics(&pack),
            DialogKind::UpdateSavegames => self.update_savegames(),
            DialogKind::RestoreDefaults => self.restore_defaults(),
        };
        if let Err(err) = result {
            self.status = format!("Action failed: {err}");
            self.log_error(format!("Action failed: {err:#}"));
        }
    }

    // Mouse

    pub fn set_hit_map(&mut self, hit_map: HitMap) {
        self.hover.set_regions(hit_map.regions());
        self.hit_map = hit_map;
    }

    pub fn pointer_moved(&mut self, x: u16, y: u16, now: Instant) {
        self.hover.pointer_moved(Point::new(x, y), now);
        if let Some((ListKind::Hacks, index)) = self.hit_map.row_at(x, y) {
            let tooltip = self
                .lists
                .hacks
                .rows()
                .get(index)
                .and_then(|row| self.controller.hack_tooltip(&row.source))
                .unwrap_or("")
                .to_string();
            self.hover.set_text(HoverTarget::List(ListKind::Hacks), &tooltip);
        }
    }

    pub fn pointer_left(&mut self) {
        self.hover.pointer_left();
    }

    pub fn click(&mut self, x: u16, y: u16) -> Result<()> {
        if let Some(tab) = self.hit_map.tab_at(x, y) {
            self.select_tab(tab);
            return Ok(());
        }
        if self.hit_map.play.is_some_and(|area| contains(area, x, y)) {
            return self.play();
        }
        if let Some(key) = self.hit_map.control_at(x, y) {
            self.focus = Focus::Controls;
            if let Some(index) = self.tab.controls().iter().position(|k| *k == key) {
                self.control_selected = index;
            }
            return self.activate_control(key);
        }
        if let Some((kind, index)) = self.hit_map.row_at(x, y) {
            self.focus = Focus::List(kind);
            self.editing_entry = None;
            let list = self.lists.get_mut(kind);
            if index < list.len() {
                list.select(Some(index));
                if kind == ListKind::Hacks {
                    return self.toggle_hack();
                }
            }
        }
        Ok(())
    }

    pub fn right_click(&mut self, x: u16, y: u16) -> Result<()> {
        if let Some((ListKind::Utilities, index)) = self.hit_map.row_at(x, y) {
            self.focus = Focus::List(ListKind::Utilities);
            if index < self.lists.utilities.len() {
                self.lists.utilities.select(Some(index));
                return self.toggle_autorun();
            }
        }
        Ok(())
    }

    // Log

    pub fn scroll_log_up(&mut self, lines: usize) {
        let max = self.logs.len().saturating_sub(1);
        self.log_scroll = (self.log_scroll + lines).min(max);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        self.logs.push(LogEntry {
            level,
            message: message.clone(),
        });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }

        let _ = append_log_file(&self.log_path, level, &message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEdit {
    Insert(char),
    Backspace,
    Left,
    Right,
}

fn cell_notifier(text: &str) -> HoverNotifier {
    HoverNotifier::new(text).with_offset(TOOLTIP_CELL_OFFSET.0, TOOLTIP_CELL_OFFSET.1)
}

fn parse_cap(value: &str) -> Result<i64> {
    let cap: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("not a whole number: {value:?}"))?;
    if cap < 0 {
        bail!("cap must not be negative");
    }
    Ok(cap)
}

fn yes_no_projection() -> Projection {
    Box::new(|value| match value.as_flag() {
        Some(true) => "YES".to_string(),
        _ => "NO".to_string(),
    })
}

fn control_for_key(key: SettingKey) -> (Control, Option<Projection>) {
    match key {
        SettingKey::PopCap => (Control::button("Population Cap"), None),
        SettingKey::ChildCap => (Control::button("Child Cap"), None),
        SettingKey::Invaders => (Control::button("Invaders"), None),
        SettingKey::CaveIns => (Control::button("Cave-ins"), None),
        SettingKey::Temperature => (Control::button("Temperature"), None),
        SettingKey::LiquidDepth => (Control::button("Liquid Depth"), None),
        SettingKey::Weather => (Control::button("Weather"), None),
        SettingKey::VariedGround => (Control::button("Varied Ground"), None),
        SettingKey::LaborLists => (Control::button("Starting Labors"), None),
        SettingKey::Aquifers => (Control::button("Aquifers"), None),
        SettingKey::GraphicsPack => (Control::label("Current Graphics"), None),
        SettingKey::TrueType => (Control::button("TrueType Fonts"), None),
        SettingKey::Sound => (Control::button("Sound"), None),
        SettingKey::Volume => (Control::entry("Volume"), None),
        SettingKey::FpsCounter => (Control::button("FPS Counter"), None),
        SettingKey::FpsCap => (Control::entry("Calculation FPS Cap"), None),
        SettingKey::GpsCap => (Control::entry("Graphical FPS Cap"), None),
        SettingKey::IntroMovie => (Control::button("Intro Movie"), None),
        SettingKey::StartWindowed => (Control::button("Windowed"), None),
        SettingKey::AutoSave => (Control::button("Autosave"), None),
        SettingKey::InitialSave => (Control::button("Initial Save"), None),
        SettingKey::AutoSavePause => (Control::button("Pause on Save"), None),
        SettingKey::PauseOnLoad => (Control::button("Pause on Load"), None),
        SettingKey::AutoBackup => (Control::button("Backup Saves"), None),
        SettingKey::CompressSaves => (Control::button("Compress Saves"), None),
        SettingKey::ProcPriority => (Control::button("Processor Priority"), None),
        SettingKey::AutoClose => (
            Control::button("Close GUI on launch"),
            Some(yes_no_projection()),
        ),
    }
}

fn build_registry() -> Result<ControlRegistry, BindingError> {
    let mut registry = ControlRegistry::new();
    for key in SettingKey::ALL {
        let (control, projection) = control_for_key(key);
        registry.register(key, control, projection)?;
    }
    Ok(registry)
}

fn control_tooltip(key: SettingKey) -> &'static str {
    match key {
        SettingKey::PopCap => "Maximum population in your fort",
        SettingKey::ChildCap => "Maximum children in your fort",
        SettingKey::Invaders => "Toggles whether invaders (goblins, etc.) show up",
        SettingKey::CaveIns => "Toggles whether unsupported bits of terrain will collapse",
        SettingKey::Temperature => "Toggles whether things will burn, melt, freeze, etc.",
        SettingKey::LiquidDepth => "Displays the depth of liquids with numbers 1-7",
        SettingKey::Weather => "Rain, snow, etc.",
        SettingKey::VariedGround => "If ground tiles use a variety of punctuation, or only periods",
        SettingKey::LaborLists => {
            "Which labors are enabled by default: by skill level, by unit type, or none"
        }
        SettingKey::Aquifers => "Whether newly created worlds will have aquifers in them",
        SettingKey::GraphicsPack => "The graphics pack installed in the game folder",
        SettingKey::TrueType => "Toggles whether to use TrueType fonts for text",
        SettingKey::Sound => "Turn game music on/off",
        SettingKey::Volume => "Music volume (0 to 255)",
        SettingKey::FpsCounter => "Whether or not to display your FPS",
        SettingKey::FpsCap => "How fast the game runs",
        SettingKey::GpsCap => "How fast the game visually updates",
        SettingKey::IntroMovie => "Do you want to see the intro movie?",
        SettingKey::StartWindowed => "Start windowed or fullscreen",
        SettingKey::AutoSave => "How often the game will automatically save",
        SettingKey::InitialSave => "Saves as soon as you embark",
        SettingKey::AutoSavePause => "Pauses the game after auto-saving",
        SettingKey::PauseOnLoad => "Pauses the game as soon as it loads",
        SettingKey::AutoBackup => "Makes a backup of every autosave",
        SettingKey::CompressSaves => "Whether to compress the savegames",
        SettingKey::ProcPriority => "Adjusts the priority given to the game by your OS",
        SettingKey::AutoClose => "Whether this launcher should close when the game is launched",
    }
}

fn list_tooltip(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Keybinds => "Saved keybindings; Enter loads the selected set",
        ListKind::Graphics => "Available graphics packs",
        ListKind::Utilities => "Right-click or press a to toggle auto-run",
        ListKind::Colors => "Saved color schemes",
        ListKind::Embarks => "Embark profiles to add to the game",
        ListKind::Hacks => "",
    }
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn log_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{} [{label}] {message}", log_timestamp())
}
