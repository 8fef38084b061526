use crate::errors::{AppResult, JournalError, HR_FILE_DOES_NOT_EXIST, HR_OBJECT_DOES_NOT_EXIST};
use crate::models::{JournalConfig, NodeId, NodeKind, PageTitleFormat};
use crate::store::DocumentStoreClient;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

/// Where today's page lives, or would live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub notebook_id: NodeId,
    pub group_id: NodeId,
    pub section_id: NodeId,
    pub page_id: Option<NodeId>,
    pub page_name: String,
}

/// Walks notebook, year group and month section, creating what is missing.
#[derive(Clone)]
pub struct HierarchyResolver {
    store: Arc<dyn DocumentStoreClient>,
    notebook_location: String,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn DocumentStoreClient>, config: &JournalConfig) -> AppResult<Self> {
        let notebook_location = config.storage.notebook_location(&config.notebook_name)?;
        Ok(Self {
            store,
            notebook_location,
        })
    }

    pub fn notebook_location(&self) -> &str {
        &self.notebook_location
    }

    /// Blocking; run it off the async runtime.
    pub fn resolve_path(&self, date: NaiveDate, title_format: PageTitleFormat) -> AppResult<ResolvedPath> {
        let notebook_id = self.open_or_create(None, NodeKind::Notebook, &self.notebook_location)?;

        let group_name = date.year().to_string();
        let group_id = self.open_or_create(Some(&notebook_id), NodeKind::SectionGroup, &group_name)?;

        let section_name = date.format("%B").to_string();
        let section_id = self.open_or_create(Some(&group_id), NodeKind::Section, &section_name)?;

        let page_name = title_format.format(date);
        let page_id = self.find_page(&section_id, &page_name)?;

        tracing::debug!(
            notebook_id = %notebook_id,
            group = %group_name,
            section = %section_name,
            page = %page_name,
            exists = page_id.is_some(),
            "resolved journal path"
        );

        Ok(ResolvedPath {
            notebook_id,
            group_id,
            section_id,
            page_id,
            page_name,
        })
    }

    /// Page lookup never creates.
    pub fn find_page(&self, section_id: &str, page_name: &str) -> AppResult<Option<NodeId>> {
        match self
            .store
            .resolve_or_create(Some(section_id), NodeKind::Page, page_name, false)
        {
            Ok(id) => Ok(Some(id)),
            Err(error) if is_not_found(&error) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn open_or_create(&self, parent: Option<&str>, kind: NodeKind, name: &str) -> AppResult<NodeId> {
        match self.store.resolve_or_create(parent, kind, name, false) {
            Ok(id) => {
                self.ensure_synchronized(kind, &id)?;
                Ok(id)
            }
            Err(error) if is_not_found(&error) => {
                let id = self.store.resolve_or_create(parent, kind, name, true)?;
                tracing::info!(kind = kind.as_str(), name, id = %id, "created journal container");
                Ok(id)
            }
            Err(error) => Err(error),
        }
    }

    /// An opened notebook or section group that reports no children has not
    /// finished syncing yet. A section without pages is a normal month.
    fn ensure_synchronized(&self, kind: NodeKind, id: &str) -> AppResult<()> {
        let children = self.store.sync_children(id)?;
        if children.is_empty() && kind != NodeKind::Section {
            return Err(JournalError::NotSynchronized(format!("{} {}", kind.as_str(), id)));
        }
        Ok(())
    }
}

fn is_not_found(error: &JournalError) -> bool {
    match error {
        JournalError::NotFound(_) => true,
        JournalError::Store { code, .. } => {
            *code == HR_OBJECT_DOES_NOT_EXIST || *code == HR_FILE_DOES_NOT_EXIST
        }
        _ => false,
    }
}
