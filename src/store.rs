//! Seams to the collaborators the engine drives but does not own.

use crate::errors::AppResult;
use crate::models::{HierarchyNode, NodeId, NodeKind, RuleLinesSpacing};
use crate::page::{PageDocument, UpdateStamp};

pub use crate::templates::{EncodedImage, ImageEncoder, SvgPassthrough, TextMeasurer};

/// Blocking client for the external document store.
///
/// Failures carry the store's HRESULT in [`crate::JournalError::Store`];
/// lookups of absent objects return [`crate::JournalError::NotFound`].
pub trait DocumentStoreClient: Send + Sync {
    /// Finds the child of `parent` with this kind and exact name, creating
    /// it when `create_if_absent` is set. Notebooks have no parent and are
    /// addressed by location.
    fn resolve_or_create(
        &self,
        parent: Option<&str>,
        kind: NodeKind,
        name: &str,
        create_if_absent: bool,
    ) -> AppResult<NodeId>;

    /// Immediate children of `id`, as the store currently knows them.
    fn sync_children(&self, id: &str) -> AppResult<Vec<HierarchyNode>>;

    fn read_page(&self, id: &str) -> AppResult<PageDocument>;

    /// Creates a blank titled page at the end of the section.
    fn create_page(&self, section_id: &str) -> AppResult<NodeId>;

    /// Commits the page. With [`UpdateStamp::Expected`] the store rejects
    /// the write if the page changed since that time.
    fn update_page(&self, page: &PageDocument, stamp: UpdateStamp) -> AppResult<()>;

    fn navigate_to(&self, id: &str) -> AppResult<()>;

    /// The page shown in the active window, if any.
    fn current_page_id(&self) -> AppResult<Option<NodeId>>;
}

/// User-facing failure reporting.
pub trait NotifyUser: Send + Sync {
    fn warn(&self, lines: &[String]);
    fn error(&self, lines: &[String]);
}

/// Writes user notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotifyUser for TracingNotifier {
    fn warn(&self, lines: &[String]) {
        tracing::warn!(notice = %lines.join(" "), "journal notice");
    }

    fn error(&self, lines: &[String]) {
        tracing::error!(notice = %lines.join(" "), "journal failure");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPosition {
    EndOfPage,
    TopOfPage,
    /// Selects the last line of the outline.
    SelectLastLine,
}

/// The window showing the journal page.
pub trait ViewController: Send + Sync {
    fn position(&self, position: ViewPosition) -> AppResult<()>;

    /// Shows ruled lines at `spacing`, or hides them for `None`.
    fn show_rule_lines(&self, spacing: Option<RuleLinesSpacing>) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopView;

impl ViewController for NoopView {
    fn position(&self, _position: ViewPosition) -> AppResult<()> {
        Ok(())
    }

    fn show_rule_lines(&self, _spacing: Option<RuleLinesSpacing>) -> AppResult<()> {
        Ok(())
    }
}
