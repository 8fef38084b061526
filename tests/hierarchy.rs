mod support;

use journal_notebook::models::{NodeKind, StorageAccount};
use journal_notebook::store::DocumentStoreClient;
use journal_notebook::{
    HierarchyResolver, JournalConfig, JournalError, PageTitleFormat, UpdateStamp,
};
use std::sync::Arc;
use support::{journal_date, InMemoryStore};

fn resolver(store: &Arc<InMemoryStore>, config: &JournalConfig) -> HierarchyResolver {
    HierarchyResolver::new(store.clone(), config).expect("resolver")
}

#[test]
fn resolution_creates_each_container_once() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let resolver = resolver(&store, &JournalConfig::default());

    let first = resolver
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect("first resolution");
    assert_eq!(first.page_id, None);
    assert_eq!(first.page_name, "March 15th");

    let page_id = store.create_page(&first.section_id).expect("page");
    let mut page = store.read_page(&page_id).expect("blank page");
    page.set_name(&first.page_name);
    store.update_page(&page, UpdateStamp::SkipCheck).expect("named");

    let second = resolver
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect("second resolution");
    assert_eq!(second.notebook_id, first.notebook_id);
    assert_eq!(second.group_id, first.group_id);
    assert_eq!(second.section_id, first.section_id);
    assert_eq!(second.page_id, Some(page_id));

    assert_eq!(store.created(NodeKind::Notebook), 1);
    assert_eq!(store.created(NodeKind::SectionGroup), 1);
    assert_eq!(store.created(NodeKind::Section), 1);
}

#[test]
fn repeated_resolution_without_pages_is_stable() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let resolver = resolver(&store, &JournalConfig::default());

    let first = resolver
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect("first resolution");
    let second = resolver
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect("empty month section still resolves");

    assert_eq!(second, first);
    assert_eq!(second.page_id, None);
    assert_eq!(store.created(NodeKind::Section), 1);
}

#[test]
fn opened_empty_section_group_is_not_yet_synchronized() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let notebook = store
        .resolve_or_create(None, NodeKind::Notebook, "My Journal", true)
        .expect("notebook");
    store
        .resolve_or_create(Some(&notebook), NodeKind::SectionGroup, "2024", true)
        .expect("empty group");

    let error = resolver(&store, &JournalConfig::default())
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect_err("empty group");

    assert!(matches!(error, JournalError::NotSynchronized(_)));
    assert_eq!(store.created(NodeKind::Section), 0);
}

#[test]
fn containers_are_named_by_year_and_month() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    resolver(&store, &JournalConfig::default())
        .resolve_path(journal_date(), PageTitleFormat::DashYearMonthDay)
        .expect("resolution");

    let names: Vec<(NodeKind, String)> = store
        .events()
        .into_iter()
        .filter_map(|event| match event {
            support::StoreEvent::Created { kind, name } => Some((kind, name)),
            _ => None,
        })
        .collect();
    assert_eq!(
        names,
        vec![
            (NodeKind::Notebook, "My Journal".to_string()),
            (NodeKind::SectionGroup, "2024".to_string()),
            (NodeKind::Section, "March".to_string()),
        ]
    );
}

#[test]
fn remote_account_addresses_notebook_by_uri() {
    let config = JournalConfig {
        storage: StorageAccount::Remote {
            cid: "4a3f9c".to_string(),
            folder: Some("\\Shared\\Journals/ ".to_string()),
        },
        ..JournalConfig::default()
    };
    let store = Arc::new(InMemoryStore::new(journal_date()));
    assert_eq!(
        resolver(&store, &config).notebook_location(),
        "https://d.docs.live.net/4a3f9c/Shared/Journals/My Journal/"
    );

    let default_folder = JournalConfig {
        storage: StorageAccount::Remote {
            cid: "4a3f9c".to_string(),
            folder: None,
        },
        ..JournalConfig::default()
    };
    assert_eq!(
        resolver(&store, &default_folder).notebook_location(),
        "https://d.docs.live.net/4a3f9c/Documents/My Journal/"
    );
}

#[test]
fn remote_folder_cannot_escape_the_account() {
    let config = JournalConfig {
        storage: StorageAccount::Remote {
            cid: "4a3f9c".to_string(),
            folder: Some("../other".to_string()),
        },
        ..JournalConfig::default()
    };
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let result = HierarchyResolver::new(store, &config);
    assert!(matches!(result, Err(JournalError::InvalidName(_))));
}

#[test]
fn opened_empty_notebook_is_not_yet_synchronized() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    store
        .resolve_or_create(None, NodeKind::Notebook, "My Journal", true)
        .expect("empty notebook");

    let error = resolver(&store, &JournalConfig::default())
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect_err("empty notebook");

    assert!(matches!(error, JournalError::NotSynchronized(_)));
    assert!(error.is_transient());
    assert_eq!(store.created(NodeKind::SectionGroup), 0);
}

#[test]
fn page_lookup_never_creates() {
    let store = Arc::new(InMemoryStore::new(journal_date()));
    let resolver = resolver(&store, &JournalConfig::default());
    let path = resolver
        .resolve_path(journal_date(), PageTitleFormat::MonthDay)
        .expect("resolution");

    let found = resolver
        .find_page(&path.section_id, "March 16th")
        .expect("lookup");

    assert_eq!(found, None);
    assert!(store
        .events()
        .iter()
        .all(|event| !matches!(event, support::StoreEvent::CreatePage(_))));
}
