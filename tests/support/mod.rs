#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use journal_notebook::errors::{HResult, HR_LAST_MODIFIED_DATE_DID_NOT_MATCH};
use journal_notebook::models::{HierarchyNode, NodeId, NodeKind, RuleLinesSpacing};
use journal_notebook::store::{DocumentStoreClient, NotifyUser, ViewController, ViewPosition};
use journal_notebook::{
    AppResult, JournalConfig, JournalError, JournalHost, JournalService, PageDocument, SettingsModel,
    UpdateStamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Resolve,
    CreatePage,
    Read,
    Update,
    Navigate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created { kind: NodeKind, name: String },
    CreatePage(NodeId),
    Read(NodeId),
    Update { page_id: NodeId, stamp: UpdateStamp },
    Navigate(NodeId),
}

#[derive(Debug, Clone)]
struct NodeRecord {
    parent: Option<NodeId>,
    kind: NodeKind,
    name: String,
}

#[derive(Default)]
struct StoreState {
    nodes: HashMap<NodeId, NodeRecord>,
    pages: HashMap<NodeId, PageDocument>,
    current: Option<NodeId>,
    next_id: u64,
    ticks: i64,
    failures: HashMap<FailPoint, (HResult, u32)>,
    events: Vec<StoreEvent>,
}

/// Document store double keeping the whole hierarchy in memory.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    created_on: DateTime<Utc>,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(created_on: NaiveDate) -> Self {
        let noon = created_on.and_hms_opt(12, 0, 0).expect("valid time");
        Self {
            state: Mutex::new(StoreState::default()),
            created_on: Utc.from_utc_datetime(&noon),
            in_flight: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
        }
    }

    /// The next `count` calls at `point` fail with `code`.
    pub fn fail(&self, point: FailPoint, code: HResult, count: u32) {
        self.lock().failures.insert(point, (code, count));
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.lock().events.clone()
    }

    pub fn updates(&self) -> Vec<(NodeId, UpdateStamp)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StoreEvent::Update { page_id, stamp } => Some((page_id, stamp)),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self, kind: NodeKind) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, StoreEvent::Created { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn page(&self, id: &str) -> Option<PageDocument> {
        self.lock().pages.get(id).cloned()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.lock().current.clone()
    }

    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Adds a page the journal did not create and shows it.
    pub fn show_foreign_page(&self, section_id: &str, name: &str) -> NodeId {
        let mut state = self.lock();
        let id = next_id(&mut state, "page");
        let mut page = PageDocument::blank(&id, self.created_on);
        page.set_name(name);
        state.nodes.insert(
            id.clone(),
            NodeRecord {
                parent: Some(section_id.to_string()),
                kind: NodeKind::Page,
                name: name.to_string(),
            },
        );
        state.pages.insert(id.clone(), page);
        state.current = Some(id.clone());
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("store state lock")
    }

    fn enter(&self, point: FailPoint) -> AppResult<CallGuard<'_>> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let guard = CallGuard { store: self };

        let mut state = self.lock();
        if let Some((code, remaining)) = state.failures.get_mut(&point) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(JournalError::Store {
                    code: *code,
                    message: format!("injected failure at {:?}", point),
                });
            }
        }
        Ok(guard)
    }
}

struct CallGuard<'a> {
    store: &'a InMemoryStore,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn next_id(state: &mut StoreState, prefix: &str) -> NodeId {
    state.next_id += 1;
    format!("{{{}-{}}}", prefix, state.next_id)
}

impl DocumentStoreClient for InMemoryStore {
    fn resolve_or_create(
        &self,
        parent: Option<&str>,
        kind: NodeKind,
        name: &str,
        create_if_absent: bool,
    ) -> AppResult<NodeId> {
        let _call = self.enter(FailPoint::Resolve)?;
        let mut state = self.lock();

        let existing = if kind == NodeKind::Page {
            state
                .pages
                .iter()
                .filter(|(id, page)| {
                    page.name() == name
                        && state.nodes.get(*id).and_then(|n| n.parent.as_deref()) == parent
                })
                .map(|(id, _)| id.clone())
                .next()
        } else {
            state
                .nodes
                .iter()
                .filter(|(_, node)| {
                    node.kind == kind && node.name == name && node.parent.as_deref() == parent
                })
                .map(|(id, _)| id.clone())
                .next()
        };

        if let Some(id) = existing {
            return Ok(id);
        }
        if !create_if_absent {
            return Err(JournalError::NotFound(format!("{} {}", kind.as_str(), name)));
        }

        let id = next_id(&mut state, kind.as_str());
        state.nodes.insert(
            id.clone(),
            NodeRecord {
                parent: parent.map(str::to_string),
                kind,
                name: name.to_string(),
            },
        );
        state.events.push(StoreEvent::Created {
            kind,
            name: name.to_string(),
        });
        Ok(id)
    }

    fn sync_children(&self, id: &str) -> AppResult<Vec<HierarchyNode>> {
        let _call = self.enter(FailPoint::Resolve)?;
        let state = self.lock();
        Ok(state
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(id))
            .map(|(child_id, node)| HierarchyNode {
                id: child_id.clone(),
                name: node.name.clone(),
                kind: node.kind,
            })
            .collect())
    }

    fn read_page(&self, id: &str) -> AppResult<PageDocument> {
        let _call = self.enter(FailPoint::Read)?;
        let mut state = self.lock();
        state.events.push(StoreEvent::Read(id.to_string()));
        state
            .pages
            .get(id)
            .cloned()
            .ok_or_else(|| JournalError::NotFound(format!("page {}", id)))
    }

    fn create_page(&self, section_id: &str) -> AppResult<NodeId> {
        let _call = self.enter(FailPoint::CreatePage)?;
        let mut state = self.lock();
        let id = next_id(&mut state, "page");
        state.nodes.insert(
            id.clone(),
            NodeRecord {
                parent: Some(section_id.to_string()),
                kind: NodeKind::Page,
                name: String::new(),
            },
        );
        state
            .pages
            .insert(id.clone(), PageDocument::blank(&id, self.created_on));
        state.events.push(StoreEvent::CreatePage(id.clone()));
        Ok(id)
    }

    fn update_page(&self, page: &PageDocument, stamp: UpdateStamp) -> AppResult<()> {
        let _call = self.enter(FailPoint::Update)?;
        std::thread::sleep(std::time::Duration::from_millis(1));

        let mut state = self.lock();
        let id = page.id().to_string();
        let stored = state
            .pages
            .get(&id)
            .ok_or_else(|| JournalError::NotFound(format!("page {}", id)))?;

        if let UpdateStamp::Expected(expected) = stamp {
            if stored.last_modified_time()? != expected {
                return Err(JournalError::Store {
                    code: HR_LAST_MODIFIED_DATE_DID_NOT_MATCH,
                    message: format!("page {} changed since it was read", id),
                });
            }
        }

        state.ticks += 1;
        let mut committed = PageDocument::from_xml(&page.to_xml())?;
        committed.set_last_modified_time(self.created_on + Duration::seconds(state.ticks));
        if let Some(node) = state.nodes.get_mut(&id) {
            node.name = committed.name().to_string();
        }
        state.pages.insert(id.clone(), committed);
        state.events.push(StoreEvent::Update { page_id: id, stamp });
        Ok(())
    }

    fn navigate_to(&self, id: &str) -> AppResult<()> {
        let _call = self.enter(FailPoint::Navigate)?;
        let mut state = self.lock();
        if !state.pages.contains_key(id) && !state.nodes.contains_key(id) {
            return Err(JournalError::NotFound(format!("object {}", id)));
        }
        state.current = Some(id.to_string());
        state.events.push(StoreEvent::Navigate(id.to_string()));
        Ok(())
    }

    fn current_page_id(&self) -> AppResult<Option<NodeId>> {
        Ok(self.lock().current.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<Vec<String>>>,
    errors: Mutex<Vec<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn warnings(&self) -> Vec<Vec<String>> {
        self.warnings.lock().expect("warnings lock").clone()
    }

    pub fn errors(&self) -> Vec<Vec<String>> {
        self.errors.lock().expect("errors lock").clone()
    }
}

impl NotifyUser for RecordingNotifier {
    fn warn(&self, lines: &[String]) {
        self.warnings.lock().expect("warnings lock").push(lines.to_vec());
    }

    fn error(&self, lines: &[String]) {
        self.errors.lock().expect("errors lock").push(lines.to_vec());
    }
}

#[derive(Default)]
pub struct RecordingView {
    positions: Mutex<Vec<ViewPosition>>,
    rule_lines: Mutex<Vec<Option<RuleLinesSpacing>>>,
}

impl RecordingView {
    pub fn positions(&self) -> Vec<ViewPosition> {
        self.positions.lock().expect("positions lock").clone()
    }

    pub fn rule_lines(&self) -> Vec<Option<RuleLinesSpacing>> {
        self.rule_lines.lock().expect("rule lines lock").clone()
    }
}

impl ViewController for RecordingView {
    fn position(&self, position: ViewPosition) -> AppResult<()> {
        self.positions.lock().expect("positions lock").push(position);
        Ok(())
    }

    fn show_rule_lines(&self, spacing: Option<RuleLinesSpacing>) -> AppResult<()> {
        self.rule_lines.lock().expect("rule lines lock").push(spacing);
        Ok(())
    }
}

pub struct Harness {
    pub service: Arc<JournalService>,
    pub store: Arc<InMemoryStore>,
    pub settings: Arc<SettingsModel>,
    pub notifier: Arc<RecordingNotifier>,
    pub view: Arc<RecordingView>,
}

pub fn journal_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub fn fast_config() -> JournalConfig {
    JournalConfig {
        retry_base_delay_ms: 1,
        ..JournalConfig::default()
    }
}

pub fn harness(config: JournalConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let settings = Arc::new(SettingsModel::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let view = Arc::new(RecordingView::default());

    let host = JournalHost {
        notifier: notifier.clone(),
        view: view.clone(),
        ..JournalHost::default()
    };
    let service = JournalService::new(config, store.clone(), settings.clone(), host)
        .expect("journal service");

    Harness {
        service,
        store,
        settings,
        notifier,
        view,
    }
}
