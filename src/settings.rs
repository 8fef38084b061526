use crate::errors::AppResult;
use crate::models::{
    PageColor, PageSettings, PageTitleFormat, RuleLinesColor, RuleLinesMarginColor,
    RuleLinesSpacing, SettingField,
};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Receives one call per effective settings change, in the order the
/// changes were applied. Must not change settings from inside the callback.
pub trait SettingsObserver: Send + Sync {
    fn on_setting_changed(&self, field: SettingField, settings: &PageSettings);
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> AppResult<PageSettings>;
    fn save(&self, settings: &PageSettings) -> AppResult<()>;
}

/// Page settings persisted as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<PageSettings> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", self.path.display()))
    }
}

impl SettingsStore for JsonSettingsStore {
    /// Missing or unreadable files yield the defaults.
    fn load(&self) -> AppResult<PageSettings> {
        if !self.path.exists() {
            return Ok(PageSettings::default());
        }
        match self.read() {
            Ok(settings) => Ok(settings),
            Err(error) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %format!("{:#}", error),
                    "unable to load page settings; using defaults"
                );
                Ok(PageSettings::default())
            }
        }
    }

    fn save(&self, settings: &PageSettings) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write settings file {}", self.path.display()))?;
        Ok(())
    }
}

/// Observable page settings with a single observer slot.
pub struct SettingsModel {
    state: RwLock<PageSettings>,
    /// Held from mutation through notification so observers see changes in
    /// the order the state recorded them.
    order: Mutex<()>,
    modified: AtomicBool,
    observer: RwLock<Option<Arc<dyn SettingsObserver>>>,
}

impl SettingsModel {
    pub fn new(settings: PageSettings) -> Self {
        Self {
            state: RwLock::new(settings),
            order: Mutex::new(()),
            modified: AtomicBool::new(false),
            observer: RwLock::new(None),
        }
    }

    pub fn load(store: &dyn SettingsStore) -> AppResult<Self> {
        Ok(Self::new(store.load()?))
    }

    pub fn save(&self, store: &dyn SettingsStore) -> AppResult<()> {
        store.save(&self.snapshot())?;
        self.modified.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn snapshot(&self) -> PageSettings {
        self.state.read().expect("settings lock poisoned").clone()
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::SeqCst)
    }

    /// Installs `observer`, returning the one it replaced. The swap happens
    /// under one lock, so no notification is delivered to both.
    pub fn bind(&self, observer: Arc<dyn SettingsObserver>) -> Option<Arc<dyn SettingsObserver>> {
        self.observer
            .write()
            .expect("settings observer lock poisoned")
            .replace(observer)
    }

    pub fn set_color(&self, value: PageColor) {
        self.update(SettingField::Color, |s| replace(&mut s.color, value));
    }

    pub fn set_rule_lines_visible(&self, value: bool) {
        self.update(SettingField::RuleLinesVisible, |s| {
            replace(&mut s.rule_lines_visible, value)
        });
    }

    pub fn set_rule_lines_horizontal_color(&self, value: RuleLinesColor) {
        self.update(SettingField::RuleLinesHorizontalColor, |s| {
            replace(&mut s.rule_lines_horizontal_color, value)
        });
    }

    pub fn set_rule_lines_horizontal_spacing(&self, value: RuleLinesSpacing) {
        self.update(SettingField::RuleLinesHorizontalSpacing, |s| {
            replace(&mut s.rule_lines_horizontal_spacing, value)
        });
    }

    pub fn set_rule_lines_margin_color(&self, value: RuleLinesMarginColor) {
        self.update(SettingField::RuleLinesMarginColor, |s| {
            replace(&mut s.rule_lines_margin_color, value)
        });
    }

    pub fn set_title(&self, value: PageTitleFormat) {
        self.update(SettingField::Title, |s| replace(&mut s.title, value));
    }

    /// Notifies the bound observer of `field` with the current settings, as
    /// if it had just changed.
    pub fn publish(&self, field: SettingField) {
        let _order = self.order.lock().expect("settings order lock poisoned");
        let snapshot = self.snapshot();
        self.notify(field, &snapshot);
    }

    fn update(&self, field: SettingField, mutate: impl FnOnce(&mut PageSettings) -> bool) {
        let _order = self.order.lock().expect("settings order lock poisoned");
        let snapshot = {
            let mut state = self.state.write().expect("settings lock poisoned");
            if !mutate(&mut *state) {
                return;
            }
            state.clone()
        };
        self.modified.store(true, Ordering::SeqCst);
        tracing::debug!(field = field.as_str(), "page setting changed");
        self.notify(field, &snapshot);
    }

    fn notify(&self, field: SettingField, snapshot: &PageSettings) {
        let observer = self
            .observer
            .read()
            .expect("settings observer lock poisoned")
            .clone();
        if let Some(observer) = observer {
            observer.on_setting_changed(field, snapshot);
        }
    }
}

impl Default for SettingsModel {
    fn default() -> Self {
        Self::new(PageSettings::default())
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
