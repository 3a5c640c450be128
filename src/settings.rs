use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};

const YES_NO: &[&str] = &["YES", "NO"];
const LABOR_LISTS: &[&str] = &["SKILLS", "BY_UNIT_TYPE", "NONE"];
const AUTO_SAVE: &[&str] = &["NONE", "SEASONAL", "YEARLY"];
const PROC_PRIORITY: &[&str] = &[
    "REALTIME",
    "HIGH",
    "ABOVE_NORMAL",
    "NORMAL",
    "BELOW_NORMAL",
    "IDLE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    PopCap,
    ChildCap,
    Invaders,
    CaveIns,
    Temperature,
    LiquidDepth,
    Weather,
    VariedGround,
    LaborLists,
    Aquifers,
    GraphicsPack,
    TrueType,
    Sound,
    Volume,
    FpsCounter,
    FpsCap,
    GpsCap,
    IntroMovie,
    StartWindowed,
    AutoSave,
    InitialSave,
    AutoSavePause,
    PauseOnLoad,
    AutoBackup,
    CompressSaves,
    ProcPriority,
    AutoClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Text,
    Choice(&'static [&'static str]),
    Flag,
}

impl SettingKey {
    pub const ALL: [SettingKey; 27] = [
        SettingKey::PopCap,
        SettingKey::ChildCap,
        SettingKey::Invaders,
        SettingKey::CaveIns,
        SettingKey::Temperature,
        SettingKey::LiquidDepth,
        SettingKey::Weather,
        SettingKey::VariedGround,
        SettingKey::LaborLists,
        SettingKey::Aquifers,
        SettingKey::GraphicsPack,
        SettingKey::TrueType,
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
    ];

    /// Stable name used in persisted files and log messages.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::PopCap => "popcap",
            SettingKey::ChildCap => "childcap",
            SettingKey::Invaders => "invaders",
            SettingKey::CaveIns => "caveins",
            SettingKey::Temperature => "temperature",
            SettingKey::LiquidDepth => "liquidDepth",
            SettingKey::Weather => "weather",
            SettingKey::VariedGround => "variedGround",
            SettingKey::LaborLists => "laborLists",
            SettingKey::Aquifers => "aquifers",
            SettingKey::GraphicsPack => "FONT",
            SettingKey::TrueType => "truetype",
            SettingKey::Sound => "sound",
            SettingKey::Volume => "volume",
            SettingKey::FpsCounter => "fpsCounter",
            SettingKey::FpsCap => "fpsCap",
            SettingKey::GpsCap => "gpsCap",
            SettingKey::IntroMovie => "introMovie",
            SettingKey::StartWindowed => "startWindowed",
            SettingKey::AutoSave => "autoSave",
            SettingKey::InitialSave => "initialSave",
            SettingKey::AutoSavePause => "autoSavePause",
            SettingKey::PauseOnLoad => "pauseOnLoad",
            SettingKey::AutoBackup => "autoBackup",
            SettingKey::CompressSaves => "compressSaves",
            SettingKey::ProcPriority => "procPriority",
            SettingKey::AutoClose => "autoClose",
        }
    }

    #[cfg(test)]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            SettingKey::PopCap | SettingKey::Volume | SettingKey::FpsCap | SettingKey::GpsCap => {
                ValueKind::Int
            }
            SettingKey::ChildCap | SettingKey::GraphicsPack => ValueKind::Text,
            SettingKey::LaborLists => ValueKind::Choice(LABOR_LISTS),
            SettingKey::AutoSave => ValueKind::Choice(AUTO_SAVE),
            SettingKey::ProcPriority => ValueKind::Choice(PROC_PRIORITY),
            SettingKey::AutoClose => ValueKind::Flag,
            _ => ValueKind::Choice(YES_NO),
        }
    }

    pub fn is_cyclable(self) -> bool {
        matches!(self.kind(), ValueKind::Choice(_))
    }

    /// Parses text shown by a control back into a value of this key's kind.
    pub fn parse(self, raw: &str) -> Result<SettingValue, String> {
        let raw = raw.trim();
        match self.kind() {
            ValueKind::Int => raw
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| format!("expected a whole number, got {raw:?}")),
            ValueKind::Text => Ok(SettingValue::Text(raw.to_string())),
            ValueKind::Choice(choices) => choices
                .iter()
                .find(|choice| choice.eq_ignore_ascii_case(raw))
                .map(|choice| SettingValue::Choice(choice.to_string()))
                .ok_or_else(|| format!("expected one of {}, got {raw:?}", choices.join("/"))),
            ValueKind::Flag => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(SettingValue::Flag(true)),
                "false" | "no" | "0" => Ok(SettingValue::Flag(false)),
                _ => Err(format!("expected yes/no, got {raw:?}")),
            },
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Int(i64),
    Text(String),
    Choice(String),
    Flag(bool),
}

impl SettingValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(value) => Some(*value),
            SettingValue::Choice(choice) => match choice.as_str() {
                "YES" => Some(true),
                "NO" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn matches_kind(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (SettingValue::Int(_), ValueKind::Int) => true,
            (SettingValue::Text(_), ValueKind::Text) => true,
            (SettingValue::Choice(choice), ValueKind::Choice(choices)) => {
                choices.contains(&choice.as_str())
            }
            (SettingValue::Flag(_), ValueKind::Flag) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(value) => write!(f, "{value}"),
            SettingValue::Text(value) | SettingValue::Choice(value) => f.write_str(value),
            SettingValue::Flag(value) => write!(f, "{value}"),
        }
    }
}

/// Persisted game settings, one field per stored [`SettingKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub popcap: i64,
    pub childcap: String,
    pub invaders: String,
    pub caveins: String,
    pub temperature: String,
    pub liquid_depth: String,
    pub weather: String,
    pub varied_ground: String,
    pub labor_lists: String,
    pub aquifers: String,
    pub truetype: String,
    pub sound: String,
    pub volume: i64,
    pub fps_counter: String,
    pub fps_cap: i64,
    pub gps_cap: i64,
    pub intro_movie: String,
    pub start_windowed: String,
    pub auto_save: String,
    pub initial_save: String,
    pub auto_save_pause: String,
    pub pause_on_load: String,
    pub auto_backup: String,
    pub compress_saves: String,
    pub proc_priority: String,
}

impl Default for Settings {
    fn default() -> Self {
        let yes = || "YES".to_string();
        let no = || "NO".to_string();
        Self {
            popcap: 200,
            childcap: "100:1000".to_string(),
            invaders: yes(),
            caveins: yes(),
            temperature: yes(),
            liquid_depth: no(),
            weather: yes(),
            varied_ground: yes(),
            labor_lists: "SKILLS".to_string(),
            aquifers: yes(),
            truetype: yes(),
            sound: yes(),
            volume: 255,
            fps_counter: no(),
            fps_cap: 100,
            gps_cap: 50,
            intro_movie: yes(),
            start_windowed: yes(),
            auto_save: "SEASONAL".to_string(),
            initial_save: yes(),
            auto_save_pause: no(),
            pause_on_load: yes(),
            auto_backup: no(),
            compress_saves: yes(),
            proc_priority: "NORMAL".to_string(),
        }
    }
}

impl Settings {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).context("read settings")?;
        serde_json::from_str(&raw).context("parse settings")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serialize settings")?;
        fs::write(path, raw).context("write settings")?;
        Ok(())
    }

    /// Reads the value stored for `key`. Keys that are not owned by the
    /// settings record (current graphics pack, launcher flags) yield `None`.
    pub fn get(&self, key: SettingKey) -> Option<SettingValue> {
        let choice = |value: &String| Some(SettingValue::Choice(value.clone()));
        match key {
            SettingKey::PopCap => Some(SettingValue::Int(self.popcap)),
            SettingKey::ChildCap => Some(SettingValue::Text(self.childcap.clone())),
            SettingKey::Invaders => choice(&self.invaders),
            SettingKey::CaveIns => choice(&self.caveins),
            SettingKey::Temperature => choice(&self.temperature),
            SettingKey::LiquidDepth => choice(&self.liquid_depth),
            SettingKey::Weather => choice(&self.weather),
            SettingKey::VariedGround => choice(&self.varied_ground),
            SettingKey::LaborLists => choice(&self.labor_lists),
            SettingKey::Aquifers => choice(&self.aquifers),
            SettingKey::TrueType => choice(&self.truetype),
            SettingKey::Sound => choice(&self.sound),
            SettingKey::Volume => Some(SettingValue::Int(self.volume)),
            SettingKey::FpsCounter => choice(&self.fps_counter),
            SettingKey::FpsCap => Some(SettingValue::Int(self.fps_cap)),
            SettingKey::GpsCap => Some(SettingValue::Int(self.gps_cap)),
            SettingKey::IntroMovie => choice(&self.intro_movie),
            SettingKey::StartWindowed => choice(&self.start_windowed),
            SettingKey::AutoSave => choice(&self.auto_save),
            SettingKey::InitialSave => choice(&self.initial_save),
            SettingKey::AutoSavePause => choice(&self.auto_save_pause),
            SettingKey::PauseOnLoad => choice(&self.pause_on_load),
            SettingKey::AutoBackup => choice(&self.auto_backup),
            SettingKey::CompressSaves => choice(&self.compress_saves),
            SettingKey::ProcPriority => choice(&self.proc_priority),
            SettingKey::GraphicsPack | SettingKey::AutoClose => None,
        }
    }

    /// Stores `value` for `key`. The value must already match the key's kind.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), String> {
        if !value.matches_kind(key.kind()) {
            return Err(format!("{value} is not valid for {key}"));
        }
        match (key, value) {
            (SettingKey::PopCap, SettingValue::Int(v)) => store_int(&mut self.popcap, v),
            (SettingKey::Volume, SettingValue::Int(v)) => {
                if !(0..=255).contains(&v) {
                    return Err(format!("volume must be between 0 and 255, got {v}"));
                }
                store_int(&mut self.volume, v)
            }
            (SettingKey::FpsCap, SettingValue::Int(v)) => store_int(&mut self.fps_cap, v),
            (SettingKey::GpsCap, SettingValue::Int(v)) => store_int(&mut self.gps_cap, v),
            (SettingKey::ChildCap, SettingValue::Text(v)) => {
                validate_child_cap(&v)?;
                self.childcap = v;
                Ok(())
            }
            (key, SettingValue::Choice(v)) => {
                let Some(slot) = self.choice_slot(key) else {
                    return Err(format!("{key} is not stored in settings"));
                };
                *slot = v;
                Ok(())
            }
            (key, _) => Err(format!("{key} is not stored in settings")),
        }
    }

    fn choice_slot(&mut self, key: SettingKey) -> Option<&mut String> {
        let slot = match key {
            SettingKey::Invaders => &mut self.invaders,
            SettingKey::CaveIns => &mut self.caveins,
            SettingKey::Temperature => &mut self.temperature,
            SettingKey::LiquidDepth => &mut self.liquid_depth,
            SettingKey::Weather => &mut self.weather,
            SettingKey::VariedGround => &mut self.varied_ground,
            SettingKey::LaborLists => &mut self.labor_lists,
            SettingKey::Aquifers => &mut self.aquifers,
            SettingKey::TrueType => &mut self.truetype,
            SettingKey::Sound => &mut self.sound,
            SettingKey::FpsCounter => &mut self.fps_counter,
            SettingKey::IntroMovie => &mut self.intro_movie,
            SettingKey::StartWindowed => &mut self.start_windowed,
            SettingKey::AutoSave => &mut self.auto_save,
            SettingKey::InitialSave => &mut self.initial_save,
            SettingKey::AutoSavePause => &mut self.auto_save_pause,
            SettingKey::PauseOnLoad => &mut self.pause_on_load,
            SettingKey::AutoBackup => &mut self.auto_backup,
            SettingKey::CompressSaves => &mut self.compress_saves,
            SettingKey::ProcPriority => &mut self.proc_priority,
            _ => return None,
        };
        Some(slot)
    }

    /// Advances a cycled option to its next choice, wrapping at the end.
    /// Unknown stored values restart at the first choice.
    pub fn cycle(&mut self, key: SettingKey) -> Result<SettingValue, String> {
        let ValueKind::Choice(choices) = key.kind() else {
            return Err(format!("{key} cannot be cycled"));
        };
        let Some(slot) = self.choice_slot(key) else {
            return Err(format!("{key} is not stored in settings"));
        };
        let next = choices
            .iter()
            .position(|choice| *choice == slot.as_str())
            .map(|index| (index + 1) % choices.len())
            .unwrap_or(0);
        *slot = choices[next].to_string();
        Ok(SettingValue::Choice(slot.clone()))
    }
}

fn store_int(slot: &mut i64, value: i64) -> Result<(), String> {
    if value < 0 {
        return Err(format!("value must not be negative, got {value}"));
    }
    *slot = value;
    Ok(())
}

/// Child caps are stored as `absolute:percentage`.
fn validate_child_cap(value: &str) -> Result<(), String> {
    let mut parts = value.split(':');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(absolute), Some(percent), None)
            if absolute.parse::<u32>().is_ok() && percent.parse::<u32>().is_ok()
    );
    if valid {
        Ok(())
    } else {
        Err(format!("child cap must look like 100:1000, got {value:?}"))
    }
}

/// Splits a stored child cap into its two numbers, padding with zero when the
/// stored text is malformed.
pub fn split_child_cap(value: &str) -> (String, String) {
    let mut parts = value.split(':').map(str::to_string);
    let absolute = parts.next().unwrap_or_else(|| "0".to_string());
    let percent = parts.next().unwrap_or_else(|| "0".to_string());
    (absolute, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::from_name("nope"), None);
    }

    #[test]
    fn cycle_wraps_and_recovers_from_unknown_values() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.cycle(SettingKey::AutoSave).unwrap(),
            SettingValue::Choice("YEARLY".to_string())
        );
        assert_eq!(
            settings.cycle(SettingKey::AutoSave).unwrap(),
            SettingValue::Choice("NONE".to_string())
        );

        settings.weather = "MAYBE".to_string();
        assert_eq!(
            settings.cycle(SettingKey::Weather).unwrap(),
            SettingValue::Choice("YES".to_string())
        );
        assert!(settings.cycle(SettingKey::PopCap).is_err());
    }

    #[test]
    fn set_rejects_mismatched_kinds_and_ranges() {
        let mut settings = Settings::default();
        assert!(settings
            .set(SettingKey::PopCap, SettingValue::Text("lots".to_string()))
            .is_err());
        assert!(settings.set(SettingKey::Volume, SettingValue::Int(300)).is_err());
        assert!(settings
            .set(SettingKey::ChildCap, SettingValue::Text("10".to_string()))
            .is_err());
        settings
            .set(SettingKey::ChildCap, SettingValue::Text("10:50".to_string()))
            .unwrap();
        assert_eq!(settings.childcap, "10:50");
        settings.set(SettingKey::PopCap, SettingValue::Int(80)).unwrap();
        assert_eq!(settings.get(SettingKey::PopCap), Some(SettingValue::Int(80)));
    }

    #[test]
    fn parse_follows_value_kind() {
        assert_eq!(SettingKey::FpsCap.parse(" 60 "), Ok(SettingValue::Int(60)));
        assert!(SettingKey::FpsCap.parse("6.5").is_err());
        assert_eq!(
            SettingKey::Sound.parse("no"),
            Ok(SettingValue::Choice("NO".to_string()))
        );
        assert_eq!(SettingKey::AutoClose.parse("YES"), Ok(SettingValue::Flag(true)));
    }

    #[test]
    fn split_child_cap_pads_malformed_values() {
        assert_eq!(
            split_child_cap("100:1000"),
            ("100".to_string(), "1000".to_string())
        );
        assert_eq!(split_child_cap("7"), ("7".to_string(), "0".to_string()));
    }
}
