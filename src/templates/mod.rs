//! The journal page templates.
//!
//! Every variant shares one set of operations; what differs is looked up in
//! [`Behaviors`], so a variant states which base behaviour it reuses instead
//! of overriding methods.

pub mod layout;
pub mod retro;
pub mod title;

use crate::errors::{AppResult, JournalError};
use crate::models::{JournalConfig, PageSettings, PaperSize, SettingField, TemplateVariant};
use crate::page::document::{PAGE_SIZE, T};
use crate::page::{Element, PageDocument};
use chrono::NaiveDate;
use retro::BannerPainter;

pub use retro::{EncodedImage, ImageEncoder, SvgPassthrough, TextMeasurer};

const BULLET_FONT_SIZE: &str = "11";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSeed {
    Empty,
    Bullet,
    /// "[Happy Friday]" behind a bullet.
    HappyDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStyle {
    Plain,
    Ordinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    None,
    RetroBanner,
}

/// Where the view lands after a new page has been navigated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
    EndOfPage,
    SelectSeedLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behaviors {
    pub content: ContentSeed,
    pub title: TitleStyle,
    pub decoration: Decoration,
    pub cursor: CursorPlacement,
}

impl Behaviors {
    const DEFAULT: Behaviors = Behaviors {
        content: ContentSeed::Empty,
        title: TitleStyle::Plain,
        decoration: Decoration::None,
        cursor: CursorPlacement::EndOfPage,
    };

    pub const fn for_variant(variant: TemplateVariant) -> Self {
        match variant {
            TemplateVariant::Default => Self::DEFAULT,
            // Default with a bullet in the first line.
            TemplateVariant::Bullet => Behaviors {
                content: ContentSeed::Bullet,
                ..Self::DEFAULT
            },
            // Default with the ordinal title.
            TemplateVariant::OrdinalDay => Behaviors {
                title: TitleStyle::Ordinal,
                ..Self::DEFAULT
            },
            // OrdinalDay with a seeded, selected first line.
            TemplateVariant::HappyDay => Behaviors {
                content: ContentSeed::HappyDay,
                cursor: CursorPlacement::SelectSeedLine,
                ..Self::for_variant(TemplateVariant::OrdinalDay)
            },
            // OrdinalDay with the banner behind the title.
            TemplateVariant::Retro => Behaviors {
                decoration: Decoration::RetroBanner,
                ..Self::for_variant(TemplateVariant::OrdinalDay)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub page_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOperation {
    InitializeContent(PageContext),
    ChangeColor,
    ChangeRuleLinesColor,
    ChangeRuleLinesSpacing,
    ChangeRuleLinesMarginColor,
    ChangeRuleLinesVisible,
    ChangeTitle,
}

impl TemplateOperation {
    pub fn for_field(field: SettingField) -> Self {
        match field {
            SettingField::Color => Self::ChangeColor,
            SettingField::RuleLinesVisible => Self::ChangeRuleLinesVisible,
            SettingField::RuleLinesHorizontalColor => Self::ChangeRuleLinesColor,
            SettingField::RuleLinesHorizontalSpacing => Self::ChangeRuleLinesSpacing,
            SettingField::RuleLinesMarginColor => Self::ChangeRuleLinesMarginColor,
            SettingField::Title => Self::ChangeTitle,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeContent(_) => "InitializeContent",
            Self::ChangeColor => "ChangePageColor",
            Self::ChangeRuleLinesColor => "ChangeRuleLinesColor",
            Self::ChangeRuleLinesSpacing => "ChangeRuleLinesSpacing",
            Self::ChangeRuleLinesMarginColor => "ChangeRuleLinesMarginColor",
            Self::ChangeRuleLinesVisible => "ChangeRuleLinesVisible",
            Self::ChangeTitle => "ChangePageTitle",
        }
    }

    /// Whether the ruled-lines view needs a refresh after this commit.
    pub fn refreshes_rule_lines_view(&self) -> bool {
        matches!(
            self,
            Self::ChangeColor
                | Self::ChangeRuleLinesColor
                | Self::ChangeRuleLinesSpacing
                | Self::ChangeRuleLinesVisible
                | Self::ChangeTitle
        )
    }
}

#[derive(Debug, Clone)]
pub struct PageTemplate {
    variant: TemplateVariant,
    behaviors: Behaviors,
    paper_size: PaperSize,
    bullet_symbol: u32,
    banner: BannerPainter,
}

impl PageTemplate {
    pub fn new(variant: TemplateVariant, config: &JournalConfig) -> Self {
        Self {
            variant,
            behaviors: Behaviors::for_variant(variant),
            paper_size: config.paper_size,
            bullet_symbol: config.bullet_symbol,
            banner: BannerPainter::new(config.screen_dpi),
        }
    }

    pub fn with_banner(mut self, banner: BannerPainter) -> Self {
        self.banner = banner;
        self
    }

    pub fn variant(&self) -> TemplateVariant {
        self.variant
    }

    pub fn behaviors(&self) -> Behaviors {
        self.behaviors
    }

    pub fn cursor_placement(&self) -> CursorPlacement {
        self.behaviors.cursor
    }

    /// Applies `operation` to the page in memory. Committing is up to the
    /// caller.
    pub fn apply(
        &self,
        operation: &TemplateOperation,
        page: &mut PageDocument,
        settings: &PageSettings,
    ) -> AppResult<()> {
        let op = operation.name();
        tracing::debug!(
            template = self.variant.as_str(),
            operation = op,
            page_id = page.id(),
            "applying template operation"
        );

        match operation {
            TemplateOperation::InitializeContent(context) => {
                self.initialize_content(page, settings, context)
            }
            TemplateOperation::ChangeColor => {
                page.page_settings_mut(op)?
                    .set_attr("color", settings.color.xml_value());
                Ok(())
            }
            TemplateOperation::ChangeRuleLinesColor => {
                let rule_lines = page.rule_lines_mut(op)?;
                match rule_lines.child_mut("Horizontal") {
                    Some(horizontal) => horizontal
                        .set_attr("color", settings.rule_lines_horizontal_color.xml_value()),
                    None => tracing::debug!("rule lines hidden; nothing to recolor"),
                }
                Ok(())
            }
            TemplateOperation::ChangeRuleLinesSpacing => {
                let rule_lines = page.rule_lines_mut(op)?;
                if layout::rule_lines_visible(rule_lines) {
                    let horizontal =
                        rule_lines
                            .child_mut("Horizontal")
                            .ok_or(JournalError::MissingElement {
                                operation: op,
                                element: "Horizontal",
                            })?;
                    horizontal.set_attr(
                        "spacing",
                        settings.rule_lines_horizontal_spacing.xml_value(),
                    );
                } else {
                    layout::apply_rule_lines(rule_lines, settings);
                }
                Ok(())
            }
            TemplateOperation::ChangeRuleLinesMarginColor => Err(JournalError::Unsupported(op)),
            TemplateOperation::ChangeRuleLinesVisible => {
                layout::apply_rule_lines(page.rule_lines_mut(op)?, settings);
                Ok(())
            }
            TemplateOperation::ChangeTitle => {
                let title = settings.title.format(page.created_on()?);
                self.set_title(page, &title, op)
            }
        }
    }

    fn initialize_content(
        &self,
        page: &mut PageDocument,
        settings: &PageSettings,
        context: &PageContext,
    ) -> AppResult<()> {
        let op = "InitializeContent";

        let page_settings = page.page_settings_mut(op)?;
        page_settings.set_attr("color", settings.color.xml_value());
        let page_size = page_settings
            .child_mut(PAGE_SIZE)
            .ok_or(JournalError::MissingElement {
                operation: op,
                element: PAGE_SIZE,
            })?;
        layout::apply_page_size(page_size, self.paper_size);
        layout::apply_rule_lines(page.rule_lines_mut(op)?, settings);

        self.set_title(page, &context.page_name, op)?;
        page.push_outline(layout::outline(self.paper_size, self.seed_entry(context)));

        if self.behaviors.decoration == Decoration::RetroBanner {
            let image = self.banner.image_element(&context.page_name)?;
            page.insert_after_title(image, op)?;
        }

        page.select_outline_cursor();
        Ok(())
    }

    fn seed_entry(&self, context: &PageContext) -> Element {
        match self.behaviors.content {
            ContentSeed::Empty => layout::text_entry(""),
            ContentSeed::Bullet => self.with_bullet(layout::text_entry("")),
            ContentSeed::HappyDay => {
                let seed = format!("[Happy {}]", context.date.format("%A"));
                self.with_bullet(layout::text_entry(&seed))
            }
        }
    }

    fn with_bullet(&self, mut entry: Element) -> Element {
        entry.insert(
            0,
            Element::new("List").with_child(
                Element::new("Bullet")
                    .with_attr("bullet", self.bullet_symbol.to_string())
                    .with_attr("fontSize", BULLET_FONT_SIZE),
            ),
        );
        entry
    }

    /// Writes `title` into the last title run and styles its container.
    fn set_title(&self, page: &mut PageDocument, title: &str, op: &'static str) -> AppResult<()> {
        let (markup, style) = match self.behaviors.title {
            TitleStyle::Plain => (title.to_string(), title::DEFAULT_TITLE_STYLE),
            TitleStyle::Ordinal => title::stylize_title(title),
        };

        let title_element = page.title_mut(op)?;
        let missing_run = JournalError::MissingElement {
            operation: op,
            element: T,
        };
        let path = title_element.path_to_last(T).ok_or(missing_run)?;
        if let Some(run) = title_element.at_path_mut(&path) {
            run.set_cdata(markup);
        }
        if let Some(container) = title_element.at_path_mut(&path[..path.len() - 1]) {
            container.set_attr("style", style);
        }

        page.set_name(title);
        Ok(())
    }
}
