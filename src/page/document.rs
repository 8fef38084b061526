use super::xml::{Element, Node, NAMESPACE_PREFIX};
use crate::errors::{AppResult, JournalError};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const PAGE: &str = "Page";
pub const PAGE_SETTINGS: &str = "PageSettings";
pub const PAGE_SIZE: &str = "PageSize";
pub const RULE_LINES: &str = "RuleLines";
pub const TITLE: &str = "Title";
pub const OUTLINE: &str = "Outline";
pub const OE_CHILDREN: &str = "OEChildren";
pub const OE: &str = "OE";
pub const T: &str = "T";

const STATIONERY_NAME: &str = "stationeryName";
const LAST_MODIFIED_TIME: &str = "lastModifiedTime";
const DATE_TIME: &str = "dateTime";
const SELECTED: &str = "selected";

pub const PAGE_NAMESPACE: &str = "http://schemas.microsoft.com/office/onenote/2013/onenote";

/// Timestamp echoed back to the store on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStamp {
    Expected(DateTime<Utc>),
    /// First commit of a freshly created page; the store skips its check.
    SkipCheck,
}

/// A page as read from, and written back to, the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    root: Element,
}

impl PageDocument {
    pub fn from_root(root: Element) -> AppResult<Self> {
        if root.name != PAGE {
            return Err(JournalError::Malformed(format!(
                "document root element is one:{}, expected one:{}",
                root.name, PAGE
            )));
        }
        Ok(Self { root })
    }

    /// Reads a page as returned by the store's page content call.
    pub fn from_xml(raw: &str) -> AppResult<Self> {
        Self::from_root(super::xml::parse(raw)?)
    }

    /// The page a store hands back for a new blank page with a title: empty
    /// title text, automatic page size, hidden rule lines.
    pub fn blank(id: &str, created: DateTime<Utc>) -> Self {
        let stamp = format_timestamp(created);
        let root = Element::new(PAGE)
            .with_attr("ID", id)
            .with_attr("name", "")
            .with_attr(DATE_TIME, stamp.clone())
            .with_attr(LAST_MODIFIED_TIME, stamp)
            .with_attr("pageLevel", "1")
            .with_attr("lang", "en-US")
            .with_child(
                Element::new(PAGE_SETTINGS)
                    .with_attr("RTL", "false")
                    .with_attr("color", "automatic")
                    .with_child(Element::new(PAGE_SIZE).with_child(Element::new("Automatic")))
                    .with_child(Element::new(RULE_LINES).with_attr("visible", "false")),
            )
            .with_child(
                Element::new(TITLE).with_attr("lang", "en-US").with_child(
                    Element::new(OE)
                        .with_attr("alignment", "left")
                        .with_child(Element::new(T).with_cdata("")),
                ),
            );
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn id(&self) -> &str {
        self.root.attr("ID").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.root.attr("name").unwrap_or_default()
    }

    pub fn set_name(&mut self, name: &str) {
        self.root.set_attr("name", name);
    }

    pub fn stationery_name(&self) -> Option<&str> {
        self.root.attr(STATIONERY_NAME)
    }

    pub fn set_stationery_name(&mut self, marker: &str) {
        self.root.set_attr(STATIONERY_NAME, marker);
    }

    pub fn is_managed_by(&self, marker: &str) -> bool {
        self.stationery_name() == Some(marker)
    }

    pub fn created_at(&self) -> AppResult<DateTime<Utc>> {
        self.timestamp_attr(DATE_TIME)
    }

    /// Creation date in the local calendar, which is what titles render.
    pub fn created_on(&self) -> AppResult<NaiveDate> {
        Ok(self.created_at()?.with_timezone(&Local).date_naive())
    }

    pub fn last_modified_time(&self) -> AppResult<DateTime<Utc>> {
        self.timestamp_attr(LAST_MODIFIED_TIME)
    }

    pub fn set_last_modified_time(&mut self, at: DateTime<Utc>) {
        self.root.set_attr(LAST_MODIFIED_TIME, format_timestamp(at));
    }

    /// Stamp for committing this document after it was read from the store.
    pub fn update_stamp(&self) -> AppResult<UpdateStamp> {
        Ok(UpdateStamp::Expected(self.last_modified_time()?))
    }

    fn timestamp_attr(&self, key: &'static str) -> AppResult<DateTime<Utc>> {
        let raw = self
            .root
            .attr(key)
            .ok_or_else(|| JournalError::Malformed(format!("one:{} has no {} attribute", PAGE, key)))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|error| JournalError::Malformed(format!("invalid {} '{}': {}", key, raw, error)))
    }

    pub fn page_settings(&self, operation: &'static str) -> AppResult<&Element> {
        required(self.root.child(PAGE_SETTINGS), operation, PAGE_SETTINGS)
    }

    pub fn page_settings_mut(&mut self, operation: &'static str) -> AppResult<&mut Element> {
        required(self.root.child_mut(PAGE_SETTINGS), operation, PAGE_SETTINGS)
    }

    pub fn rule_lines_mut(&mut self, operation: &'static str) -> AppResult<&mut Element> {
        let settings = self.page_settings_mut(operation)?;
        required(settings.child_mut(RULE_LINES), operation, RULE_LINES)
    }

    pub fn title(&self) -> Option<&Element> {
        self.root.child(TITLE)
    }

    pub fn title_mut(&mut self, operation: &'static str) -> AppResult<&mut Element> {
        required(self.root.child_mut(TITLE), operation, TITLE)
    }

    /// Text of the last `T` node in the title.
    pub fn title_text(&self) -> Option<&str> {
        self.title()?
            .descendants_named(T)
            .into_iter()
            .last()
            .and_then(|t| t.text())
    }

    pub fn outline(&self) -> Option<&Element> {
        self.root.child(OUTLINE)
    }

    pub fn push_outline(&mut self, outline: Element) {
        self.root.remove_children_named(OUTLINE);
        self.root.push(outline);
    }

    /// Inserts `element` directly after the title, replacing any previous
    /// element of the same name in that slot.
    pub fn insert_after_title(&mut self, element: Element, operation: &'static str) -> AppResult<()> {
        let index = self
            .root
            .child_index(TITLE)
            .ok_or(JournalError::MissingElement {
                operation,
                element: TITLE,
            })?;
        if let Some(Node::Element(existing)) = self.root.children.get(index + 1) {
            if existing.name == element.name {
                self.root.children.remove(index + 1);
            }
        }
        self.root.insert(index + 1, element);
        Ok(())
    }

    pub fn outline_is_empty(&self) -> bool {
        outline_is_empty(self.outline())
    }

    /// Places the input cursor in an empty outline. Pages with content are
    /// left alone.
    pub fn select_outline_cursor(&mut self) {
        if self.outline_is_empty() && self.outline().is_some() {
            self.root.set_attr(SELECTED, "partial");
            let Some(outline) = self.root.child_mut(OUTLINE) else {
                return;
            };
            outline.set_attr(SELECTED, "partial");
            let Some(children) = outline.child_mut(OE_CHILDREN) else {
                return;
            };
            children.set_attr(SELECTED, "partial");
            let Some(oe) = children.child_mut(OE) else {
                return;
            };
            oe.set_attr(SELECTED, "partial");
            if let Some(t) = oe.child_mut(T) {
                t.set_attr(SELECTED, "all");
            }
        }
    }

    pub fn to_xml(&self) -> String {
        let mut root = self.root.clone();
        root.set_attr(&format!("xmlns:{}", NAMESPACE_PREFIX), PAGE_NAMESPACE);
        let mut out = String::from("<?xml version=\"1.0\"?>");
        root.write_xml(&mut out);
        out
    }
}

/// An outline is empty when it is absent or its first entry starts with an
/// empty text run. A leading bullet counts as content.
pub fn outline_is_empty(outline: Option<&Element>) -> bool {
    let Some(outline) = outline else {
        return true;
    };
    let Some(oe) = outline.child(OE_CHILDREN).and_then(|children| children.child(OE)) else {
        return false;
    };
    match oe.first_child_node() {
        Some(Node::Element(t)) if t.name == T => match t.first_child_node() {
            Some(Node::CData(text)) => text.is_empty(),
            None => true,
            _ => false,
        },
        _ => false,
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required<E>(element: Option<E>, operation: &'static str, name: &'static str) -> AppResult<E> {
    element.ok_or(JournalError::MissingElement {
        operation,
        element: name,
    })
}
