use crate::{
    controller::Controller,
    error::{BindingError, SyncError, WriteRejected},
    settings::{SettingKey, SettingValue},
};
use std::{collections::HashMap, fmt};

/// Text shown by a control whose value could not be read.
pub const SENTINEL: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub SettingKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Activating it runs a command; shows `caption: value`.
    Button,
    /// Read-only; shows `caption: value`.
    Label,
    /// Numeric text input.
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub caption: String,
    value: String,
    cursor: usize,
    unknown: bool,
}

impl Control {
    pub fn button(caption: &str) -> Self {
        Self::new(ControlKind::Button, caption)
    }

    pub fn label(caption: &str) -> Self {
        Self::new(ControlKind::Label, caption)
    }

    pub fn entry(caption: &str) -> Self {
        Self::new(ControlKind::Entry, caption)
    }

    fn new(kind: ControlKind, caption: &str) -> Self {
        Self {
            kind,
            caption: caption.to_string(),
            value: String::new(),
            cursor: 0,
            unknown: false,
        }
    }

    /// The value part of what the control shows.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown
    }

    pub fn display_text(&self) -> String {
        match self.kind {
            ControlKind::Entry => self.value.clone(),
            ControlKind::Button | ControlKind::Label => format!("{}: {}", self.caption, self.value),
        }
    }

    /// Replaces the shown value. Entry content is fully replaced and the
    /// cursor moves to the end.
    fn show(&mut self, value: String) {
        self.cursor = value.chars().count();
        self.value = value;
        self.unknown = false;
    }

    fn show_unknown(&mut self) {
        self.show(SENTINEL.to_string());
        self.unknown = true;
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        if self.kind != ControlKind::Entry || self.unknown {
            return false;
        }
        let byte = byte_index(&self.value, self.cursor);
        let mut candidate = self.value.clone();
        candidate.insert(byte, c);
        if !is_numeric_input(&candidate) {
            return false;
        }
        self.value = candidate;
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.kind != ControlKind::Entry || self.cursor == 0 {
            return false;
        }
        if self.unknown {
            self.value.clear();
            self.cursor = 0;
            self.unknown = false;
            return true;
        }
        let byte = byte_index(&self.value, self.cursor - 1);
        self.value.remove(byte);
        self.cursor -= 1;
        true
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.value.chars().count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }
}

/// Accepts empty text or anything that reads as a number.
pub fn is_numeric_input(value: &str) -> bool {
    value.is_empty() || value.parse::<f64>().is_ok()
}

fn byte_index(value: &str, chars: usize) -> usize {
    value
        .char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(value.len())
}

pub type Projection = Box<dyn Fn(&SettingValue) -> String>;

pub struct Binding {
    pub target: ControlId,
    projection: Option<Projection>,
}

impl Binding {
    pub fn render(&self, value: &SettingValue) -> String {
        match &self.projection {
            Some(projection) => projection(value),
            None => value.to_string(),
        }
    }

    #[cfg(test)]
    pub fn has_projection(&self) -> bool {
        self.projection.is_some()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &self.target)
            .field("projection", &self.projection.is_some())
            .finish()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: usize,
    pub failures: Vec<BindingError>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Binds setting keys to controls and re-renders every control from the
/// controller on [`ControlRegistry::refresh`].
#[derive(Debug, Default)]
pub struct ControlRegistry {
    bindings: HashMap<SettingKey, Binding>,
    controls: HashMap<ControlId, Control>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        key: SettingKey,
        control: Control,
        projection: Option<Projection>,
    ) -> Result<ControlId, BindingError> {
        if self.bindings.contains_key(&key) {
            return Err(BindingError::DuplicateKey(key));
        }
        let target = ControlId(key);
        self.controls.insert(target, control);
        self.bindings.insert(key, Binding { target, projection });
        Ok(target)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = SettingKey> + '_ {
        self.bindings.keys().copied()
    }

    #[cfg(test)]
    pub fn binding(&self, key: SettingKey) -> Option<&Binding> {
        self.bindings.get(&key)
    }

    pub fn control_for(&self, key: SettingKey) -> Option<&Control> {
        let binding = self.bindings.get(&key)?;
        self.controls.get(&binding.target)
    }

    pub fn control_mut(&mut self, key: SettingKey) -> Option<&mut Control> {
        let binding = self.bindings.get(&key)?;
        self.controls.get_mut(&binding.target)
    }

    /// Re-renders every bound control. A key the controller cannot supply
    /// shows [`SENTINEL`] and is reported; the other keys still update.
    pub fn refresh(&mut self, controller: &dyn Controller) -> RefreshReport {
        let mut report = RefreshReport::default();
        for (key, binding) in &self.bindings {
            let Some(control) = self.controls.get_mut(&binding.target) else {
                report.failures.push(BindingError::UnboundKey(*key));
                continue;
            };
            match controller.value(*key) {
                Ok(value) => {
                    control.show(binding.render(&value));
                    report.updated += 1;
                }
                Err(err) => {
                    control.show_unknown();
                    report.failures.push(err);
                }
            }
        }
        report
    }

    /// Forwards the value currently shown by the control bound to `key` to
    /// the controller.
    pub fn set_from_control(
        &self,
        key: SettingKey,
        controller: &mut dyn Controller,
    ) -> Result<SettingValue, SyncError> {
        let control = self
            .control_for(key)
            .ok_or(BindingError::UnboundKey(key))?;
        if control.is_unknown() {
            return Err(WriteRejected::new(key, "control shows no value").into());
        }
        let value = key
            .parse(control.value())
            .map_err(|reason| WriteRejected::new(key, reason))?;
        controller.set_value(key, value.clone())?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::{DisplayStatus, ListKind},
        error::StatusLookupError,
    };
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeController {
        values: HashMap<SettingKey, SettingValue>,
        writes: Vec<(SettingKey, SettingValue)>,
        reject: bool,
    }

    impl Controller for FakeController {
        fn value(&self, key: SettingKey) -> Result<SettingValue, BindingError> {
            self.values
                .get(&key)
                .cloned()
                .ok_or(BindingError::MissingValue {
                    key,
                    reason: "unset".to_string(),
                })
        }

        fn set_value(&mut self, key: SettingKey, value: SettingValue) -> Result<(), WriteRejected> {
            if self.reject {
                return Err(WriteRejected::new(key, "read-only"));
            }
            self.writes.push((key, value.clone()));
            self.values.insert(key, value);
            Ok(())
        }

        fn list_items(&self, _kind: ListKind) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn status(&self, kind: ListKind, item: &str) -> Result<DisplayStatus, StatusLookupError> {
            Err(StatusLookupError {
                kind,
                item: item.to_string(),
                reason: "unused".to_string(),
            })
        }
    }

    fn yes_no() -> Projection {
        Box::new(|value| {
            if value.as_flag().unwrap_or(false) {
                "YES".to_string()
            } else {
                "NO".to_string()
            }
        })
    }

    #[test]
    fn refresh_renders_raw_values_and_projections() {
        let mut registry = ControlRegistry::new();
        assert!(registry.is_empty());
        registry
            .register(SettingKey::PopCap, Control::button("Population Cap"), None)
            .unwrap();
        registry
            .register(
                SettingKey::AutoClose,
                Control::button("Close GUI on launch"),
                Some(yes_no()),
            )
            .unwrap();

        let mut controller = FakeController::default();
        controller.values.insert(SettingKey::PopCap, SettingValue::Int(200));
        controller.values.insert(SettingKey::AutoClose, SettingValue::Flag(true));

        let report = registry.refresh(&controller);
        assert!(report.is_clean());
        assert_eq!(report.updated, 2);
        assert_eq!(registry.control_for(SettingKey::PopCap).unwrap().value(), "200");
        assert_eq!(
            registry.control_for(SettingKey::PopCap).unwrap().display_text(),
            "Population Cap: 200"
        );
        assert_eq!(registry.control_for(SettingKey::AutoClose).unwrap().value(), "YES");
    }

    #[test]
    fn projection_never_passes_the_raw_value_through() {
        let mut registry = ControlRegistry::new();
        registry
            .register(
                SettingKey::GraphicsPack,
                Control::label("Current Graphics"),
                Some(Box::new(|_| "Phoebus".to_string())),
            )
            .unwrap();
        let mut controller = FakeController::default();
        controller
            .values
            .insert(SettingKey::GraphicsPack, SettingValue::Text("raw".to_string()));
        registry.refresh(&controller);
        assert_eq!(
            registry.control_for(SettingKey::GraphicsPack).unwrap().value(),
            "Phoebus"
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ControlRegistry::new();
        registry
            .register(SettingKey::Sound, Control::button("Sound"), None)
            .unwrap();
        let err = registry
            .register(SettingKey::Sound, Control::button("Sound again"), Some(yes_no()))
            .unwrap_err();
        assert_eq!(err, BindingError::DuplicateKey(SettingKey::Sound));
        assert_eq!(registry.len(), 1);
        assert!(!registry.binding(SettingKey::Sound).unwrap().has_projection());
    }

    #[test]
    fn missing_value_is_isolated_to_its_control() {
        let mut registry = ControlRegistry::new();
        registry
            .register(SettingKey::PopCap, Control::button("Population Cap"), None)
            .unwrap();
        registry
            .register(SettingKey::GraphicsPack, Control::label("Current Graphics"), None)
            .unwrap();
        let mut controller = FakeController::default();
        controller.values.insert(SettingKey::PopCap, SettingValue::Int(0));

        let report = registry.refresh(&controller);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failures.len(), 1);
        let pack = registry.control_for(SettingKey::GraphicsPack).unwrap();
        assert!(pack.is_unknown());
        assert_eq!(pack.value(), SENTINEL);
        let popcap = registry.control_for(SettingKey::PopCap).unwrap();
        assert!(!popcap.is_unknown());
        assert_eq!(popcap.value(), "0");
    }

    #[test]
    fn refresh_replaces_entry_content_and_resets_cursor() {
        let mut registry = ControlRegistry::new();
        registry
            .register(SettingKey::Volume, Control::entry("Volume"), None)
            .unwrap();
        let mut controller = FakeController::default();
        controller.values.insert(SettingKey::Volume, SettingValue::Int(255));
        registry.refresh(&controller);

        let entry = registry.control_mut(SettingKey::Volume).unwrap();
        entry.move_cursor(-3);
        assert!(entry.insert_char('1'));
        assert_eq!(entry.value(), "1255");

        controller.values.insert(SettingKey::Volume, SettingValue::Int(80));
        registry.refresh(&controller);
        let entry = registry.control_for(SettingKey::Volume).unwrap();
        assert_eq!(entry.value(), "80");
        assert_eq!(entry.cursor(), 2);
    }

    #[test]
    fn entry_rejects_non_numeric_input() {
        let mut entry = Control::entry("FPS");
        assert!(entry.insert_char('6'));
        assert!(entry.insert_char('0'));
        assert!(!entry.insert_char('x'));
        assert!(entry.insert_char('.'));
        assert!(entry.backspace());
        assert_eq!(entry.value(), "60");
        let mut button = Control::button("Sound");
        assert!(!button.insert_char('1'));
    }

    #[test]
    fn set_from_control_forwards_the_shown_value() {
        let mut registry = ControlRegistry::new();
        registry
            .register(SettingKey::FpsCap, Control::entry("Calculation FPS Cap"), None)
            .unwrap();
        let mut controller = FakeController::default();
        controller.values.insert(SettingKey::FpsCap, SettingValue::Int(100));
        registry.refresh(&controller);
        let entry = registry.control_mut(SettingKey::FpsCap).unwrap();
        entry.backspace();
        entry.backspace();

        let written = registry
            .set_from_control(SettingKey::FpsCap, &mut controller)
            .unwrap();
        assert_eq!(written, SettingValue::Int(1));
        assert_eq!(controller.writes, vec![(SettingKey::FpsCap, SettingValue::Int(1))]);
    }

    #[test]
    fn set_from_control_surfaces_rejections() {
        let mut registry = ControlRegistry::new();
        registry
            .register(SettingKey::GpsCap, Control::entry("Graphical FPS Cap"), None)
            .unwrap();
        let mut controller = FakeController {
            reject: true,
            ..FakeController::default()
        };
        controller.values.insert(SettingKey::GpsCap, SettingValue::Int(50));
        registry.refresh(&controller);

        let err = registry
            .set_from_control(SettingKey::GpsCap, &mut controller)
            .unwrap_err();
        assert!(matches!(err, SyncError::Write(_)));
        let err = registry
            .set_from_control(SettingKey::Sound, &mut controller)
            .unwrap_err();
        assert_eq!(err, SyncError::Binding(BindingError::UnboundKey(SettingKey::Sound)));

        let entry = registry.control_mut(SettingKey::GpsCap).unwrap();
        entry.backspace();
        entry.backspace();
        assert!(registry
            .set_from_control(SettingKey::GpsCap, &mut controller)
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_refresh_is_idempotent_and_exact(
            popcap in 0i64..10_000,
            volume in proptest::option::of(0i64..=255),
            auto_close in any::<bool>(),
        ) {
            let mut registry = ControlRegistry::new();
            registry.register(SettingKey::PopCap, Control::button("Population Cap"), None).unwrap();
            registry.register(SettingKey::Volume, Control::entry("Volume"), None).unwrap();
            registry
                .register(SettingKey::AutoClose, Control::button("Close GUI on launch"), Some(yes_no()))
                .unwrap();

            let mut controller = FakeController::default();
            controller.values.insert(SettingKey::PopCap, SettingValue::Int(popcap));
            if let Some(volume) = volume {
                controller.values.insert(SettingKey::Volume, SettingValue::Int(volume));
            }
            controller.values.insert(SettingKey::AutoClose, SettingValue::Flag(auto_close));

            let first = registry.refresh(&controller);
            let snapshot: Vec<Control> = SettingKey::ALL
                .iter()
                .filter_map(|key| registry.control_for(*key).cloned())
                .collect();
            let second = registry.refresh(&controller);
            let again: Vec<Control> = SettingKey::ALL
                .iter()
                .filter_map(|key| registry.control_for(*key).cloned())
                .collect();

            prop_assert_eq!(snapshot, again);
            prop_assert_eq!(first.updated, second.updated);
            let popcap_text = popcap.to_string();
            prop_assert_eq!(registry.control_for(SettingKey::PopCap).unwrap().value(), popcap_text.as_str());
            prop_assert_eq!(
                registry.control_for(SettingKey::AutoClose).unwrap().value(),
                if auto_close { "YES" } else { "NO" }
            );
            prop_assert_eq!(
                registry.control_for(SettingKey::Volume).unwrap().is_unknown(),
                volume.is_none()
            );
        }
    }
}
