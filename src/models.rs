use crate::errors::{AppResult, JournalError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Notebook,
    SectionGroup,
    Section,
    Page,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::SectionGroup => "section-group",
            Self::Section => "section",
            Self::Page => "page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageColor {
    Blue,
    Yellow,
    Green,
    Red,
    Purple,
    Cyan,
    Orange,
    Magenta,
    BlueMist,
    PurpleMist,
    Tan,
    Lemon,
    Apple,
    Teal,
    RedChalk,
    Silver,
    None,
}

impl PageColor {
    pub fn xml_value(self) -> &'static str {
        match self {
            Self::Blue => "#EDF5FE",
            Self::Yellow => "#FFFADF",
            Self::Green => "#ECF0E5",
            Self::Red => "#FFEEEF",
            Self::Purple => "#F3E9FF",
            Self::Cyan => "#E5EFEB",
            Self::Orange => "#FBF2E1",
            Self::Magenta => "#FBEDF6",
            Self::BlueMist => "#E5EDF3",
            Self::PurpleMist => "#E8E3EB",
            Self::Tan => "#F9F4E7",
            Self::Lemon => "#FDFDDD",
            Self::Apple => "#ECF9E5",
            Self::Teal => "#D4F9F2",
            Self::RedChalk => "#EFDEDE",
            Self::Silver => "#E9E9ED",
            Self::None => "automatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleLinesColor {
    LightBlue,
}

impl RuleLinesColor {
    pub fn xml_value(self) -> &'static str {
        match self {
            Self::LightBlue => "#CAEBFD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleLinesMarginColor {
    Red,
}

impl RuleLinesMarginColor {
    pub fn xml_value(self) -> &'static str {
        match self {
            Self::Red => "#FF5050",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleLinesSpacing {
    NarrowRuled,
    CollegeRuled,
    StandardRuled,
    WideRuled,
}

impl RuleLinesSpacing {
    /// Line spacing in points.
    pub fn xml_value(self) -> &'static str {
        match self {
            Self::NarrowRuled => "13.42771530151367",
            Self::CollegeRuled => "23.76000022888184",
            Self::StandardRuled => "33.11999893188476",
            Self::WideRuled => "46.79999923706054",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageTitleFormat {
    DashDayMonthYear,
    DashMonthDayYear,
    DashYearMonthDay,
    SlashDayMonthYear,
    SlashMonthDayYear,
    SlashYearMonthDay,
    ShortWeekdayDay,
    WeekdayDay,
    MonthDay,
}

impl PageTitleFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            Self::DashDayMonthYear => "%d-%m-%Y",
            Self::DashMonthDayYear => "%m-%d-%Y",
            Self::DashYearMonthDay => "%Y-%m-%d",
            Self::SlashDayMonthYear => "%d/%m/%Y",
            Self::SlashMonthDayYear => "%m/%d/%Y",
            Self::SlashYearMonthDay => "%Y/%m/%d",
            Self::ShortWeekdayDay => "%a %-d",
            Self::WeekdayDay => "%A %-d",
            Self::MonthDay => "%B %-d",
        }
    }

    pub fn is_day_of_month(self) -> bool {
        matches!(self, Self::ShortWeekdayDay | Self::WeekdayDay | Self::MonthDay)
    }

    /// Renders the page title for `date`. Day-of-month formats carry an
    /// English ordinal suffix ("March 15th").
    pub fn format(self, date: NaiveDate) -> String {
        let rendered = date.format(self.pattern()).to_string();
        if self.is_day_of_month() {
            format!("{}{}", rendered, ordinal_suffix(date.day()))
        } else {
            rendered
        }
    }
}

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Persisted page preferences. Change notifications are raised by
/// [`crate::settings::SettingsModel`], not by this plain record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSettings {
    pub color: PageColor,
    pub rule_lines_visible: bool,
    pub rule_lines_horizontal_color: RuleLinesColor,
    pub rule_lines_horizontal_spacing: RuleLinesSpacing,
    pub rule_lines_margin_color: RuleLinesMarginColor,
    pub title: PageTitleFormat,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            color: PageColor::Apple,
            rule_lines_visible: true,
            rule_lines_horizontal_color: RuleLinesColor::LightBlue,
            rule_lines_horizontal_spacing: RuleLinesSpacing::NarrowRuled,
            rule_lines_margin_color: RuleLinesMarginColor::Red,
            title: PageTitleFormat::MonthDay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingField {
    Color,
    RuleLinesVisible,
    RuleLinesHorizontalColor,
    RuleLinesHorizontalSpacing,
    RuleLinesMarginColor,
    Title,
}

impl SettingField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Color => "ColorChanged",
            Self::RuleLinesVisible => "RuleLinesVisibleChanged",
            Self::RuleLinesHorizontalColor => "RuleLinesHorizontalColorChanged",
            Self::RuleLinesHorizontalSpacing => "RuleLinesHorizontalSpacingChanged",
            Self::RuleLinesMarginColor => "RuleLinesMarginColorChanged",
            Self::Title => "TitleChanged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateVariant {
    #[default]
    Default,
    Bullet,
    OrdinalDay,
    HappyDay,
    Retro,
}

impl TemplateVariant {
    pub const ALL: [TemplateVariant; 5] = [
        Self::Default,
        Self::Bullet,
        Self::OrdinalDay,
        Self::HappyDay,
        Self::Retro,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Bullet => "Bullet",
            Self::OrdinalDay => "OrdinalDay",
            Self::HappyDay => "HappyDay",
            Self::Retro => "Retro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperSize {
    #[default]
    Automatic,
    Letter,
    Legal,
    A4,
}

const REMOTE_NOTEBOOK_ROOT: &str = "https://d.docs.live.net";
const DEFAULT_NOTEBOOK_FOLDER: &str = "Documents";

/// Where the journal notebook lives. Remote notebooks are slower to answer,
/// which scales the retry delay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum StorageAccount {
    #[default]
    Local,
    #[serde(rename_all = "camelCase")]
    Remote { cid: String, folder: Option<String> },
}

impl StorageAccount {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Location handed to the store when opening the notebook.
    pub fn notebook_location(&self, notebook_name: &str) -> AppResult<String> {
        match self {
            Self::Local => Ok(notebook_name.to_string()),
            Self::Remote { cid, folder } => {
                let folder = folder
                    .as_deref()
                    .map(|value| value.replace('\\', "/").trim().trim_matches('/').trim().to_string())
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| DEFAULT_NOTEBOOK_FOLDER.to_string());

                let segments = [cid.as_str(), folder.as_str(), notebook_name];
                let escapes_root = segments.iter().any(|segment| {
                    segment.is_empty() || segment.split('/').any(|part| part == ".." || part == ".")
                });
                if escapes_root || cid.contains('/') {
                    return Err(JournalError::InvalidName(format!(
                        "Notebook URI is invalid: /{}/{}/{}/",
                        cid, folder, notebook_name
                    )));
                }

                Ok(format!(
                    "{}/{}/{}/{}/",
                    REMOTE_NOTEBOOK_ROOT, cid, folder, notebook_name
                ))
            }
        }
    }
}

/// Host-level configuration for the journal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalConfig {
    /// Notebook display name; also the ownership marker stamped on pages.
    pub notebook_name: String,
    pub template: TemplateVariant,
    pub paper_size: PaperSize,
    pub bullet_symbol: u32,
    pub storage: StorageAccount,
    pub retry_limit: u32,
    pub retry_base_delay_ms: u64,
    pub remote_latency_factor: u32,
    pub queue_capacity: usize,
    pub screen_dpi: f32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            notebook_name: "My Journal".to_string(),
            template: TemplateVariant::Default,
            paper_size: PaperSize::Automatic,
            bullet_symbol: 2,
            storage: StorageAccount::Local,
            retry_limit: 5,
            retry_base_delay_ms: 500,
            remote_latency_factor: 10,
            queue_capacity: 64,
            screen_dpi: 96.0,
        }
    }
}

impl JournalConfig {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let config: JournalConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the YAML config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "journal config not found; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.notebook_name.trim().is_empty() {
            return Err(JournalError::Config("notebookName must not be empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(JournalError::Config("queueCapacity must be at least 1".to_string()));
        }
        if !(self.screen_dpi.is_finite() && self.screen_dpi > 0.0) {
            return Err(JournalError::Config(format!(
                "screenDpi must be positive (got {})",
                self.screen_dpi
            )));
        }
        self.storage.notebook_location(&self.notebook_name)?;
        Ok(())
    }

    pub fn latency_factor(&self) -> u32 {
        if self.storage.is_local() {
            1
        } else {
            self.remote_latency_factor.max(1)
        }
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
