use crate::binding::TemplateBinding;
use crate::error_codes;
use crate::errors::{classify, format_hresult, AppResult, JournalError};
use crate::hierarchy::HierarchyResolver;
use crate::models::{JournalConfig, NodeId, PageSettings, SettingField, TemplateVariant};
use crate::page::{PageDocument, UpdateStamp};
use crate::retry::{RetryError, RetryPolicy};
use crate::scheduler::{DocumentLane, ExecutorFuture, MutationJob, MutationScheduler};
use crate::settings::SettingsModel;
use crate::store::{
    DocumentStoreClient, NoopView, NotifyUser, TracingNotifier, ViewController, ViewPosition,
};
use crate::templates::retro::BannerPainter;
use crate::templates::{
    CursorPlacement, ImageEncoder, PageContext, PageTemplate, TemplateOperation, TextMeasurer,
};
use chrono::{Local, NaiveDate};
use std::sync::{Arc, RwLock};

const BUSY_NOTICE: [&str; 2] = ["The journal notebook is busy.", "Please try again in a moment."];
const ERROR_NOTICE_TITLE: &str = "Journal notebook error";

/// Host-side collaborators. Everything defaults to a headless setup.
#[derive(Clone)]
pub struct JournalHost {
    pub notifier: Arc<dyn NotifyUser>,
    pub view: Arc<dyn ViewController>,
    pub measurer: Option<Arc<dyn TextMeasurer>>,
    pub encoder: Option<Arc<dyn ImageEncoder>>,
}

impl Default for JournalHost {
    fn default() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            view: Arc::new(NoopView),
            measurer: None,
            encoder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Created(NodeId),
    Opened(NodeId),
}

impl OpenOutcome {
    pub fn page_id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Opened(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationOutcome {
    Skipped,
    Committed { outline_empty: bool },
}

/// Opens today's journal page and keeps it in step with the page settings.
pub struct JournalService {
    config: JournalConfig,
    store: Arc<dyn DocumentStoreClient>,
    resolver: HierarchyResolver,
    retry: RetryPolicy,
    lane: DocumentLane,
    scheduler: MutationScheduler,
    settings: Arc<SettingsModel>,
    active_variant: RwLock<TemplateVariant>,
    notifier: Arc<dyn NotifyUser>,
    view: Arc<dyn ViewController>,
    banner: BannerPainter,
}

impl JournalService {
    pub fn new(
        config: JournalConfig,
        store: Arc<dyn DocumentStoreClient>,
        settings: Arc<SettingsModel>,
        host: JournalHost,
    ) -> AppResult<Arc<Self>> {
        config.validate()?;
        error_codes::init();

        let resolver = HierarchyResolver::new(store.clone(), &config)?;
        let lane = DocumentLane::new();
        let scheduler = MutationScheduler::new(lane.clone(), config.queue_capacity);

        let mut banner = BannerPainter::new(config.screen_dpi);
        if let Some(measurer) = host.measurer {
            banner = banner.with_measurer(measurer);
        }
        if let Some(encoder) = host.encoder {
            banner = banner.with_encoder(encoder);
        }

        let this = Arc::new(Self {
            retry: RetryPolicy::from_config(&config),
            active_variant: RwLock::new(config.template),
            config,
            store,
            resolver,
            lane,
            scheduler: scheduler.clone(),
            settings,
            notifier: host.notifier,
            view: host.view,
            banner,
        });

        let weak = Arc::downgrade(&this);
        scheduler.set_executor(Arc::new(move |job: MutationJob| -> ExecutorFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(strong) = weak.upgrade() {
                    strong.run_mutation(job).await
                } else {
                    true
                }
            })
        }));

        this.rebind(this.config.template);
        tracing::info!(
            notebook = %this.resolver.notebook_location(),
            template = this.config.template.as_str(),
            "journal service ready"
        );
        Ok(this)
    }

    /// Starts the mutation worker. Needs a running tokio runtime.
    pub fn start(&self) {
        self.scheduler.start();
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn settings(&self) -> &Arc<SettingsModel> {
        &self.settings
    }

    pub fn active_variant(&self) -> TemplateVariant {
        *self.active_variant.read().expect("active variant lock")
    }

    pub fn lane(&self) -> &DocumentLane {
        &self.lane
    }

    /// Resolves once every queued settings change has been written.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    /// Swaps the template that settings changes are applied with. Pages
    /// that already exist keep their content.
    pub fn rebind(self: &Arc<Self>, variant: TemplateVariant) {
        let binding = Arc::new(TemplateBinding::new(variant, Arc::downgrade(self)));
        *self.active_variant.write().expect("active variant lock") = variant;
        let previous = self.settings.bind(binding);
        tracing::info!(
            template = variant.as_str(),
            replaced = previous.is_some(),
            "bound journal template"
        );
    }

    /// Queues a rewrite of the current page for `field` with the active
    /// template and the current settings. Goes through the settings model so
    /// it is ordered with concurrent setting changes.
    pub fn apply_setting_change(&self, field: SettingField) {
        self.settings.publish(field);
    }

    pub(crate) fn submit_change(&self, field: SettingField, variant: TemplateVariant, settings: PageSettings) {
        let job = MutationJob::new(field, variant, settings);
        if let Err(error) = self.scheduler.enqueue(job) {
            tracing::warn!(field = field.as_str(), error = %error, "dropping settings change");
            self.notify_busy();
        }
    }

    pub async fn open_or_create_today(&self) -> Option<OpenOutcome> {
        self.open_or_create_on(Local::now().date_naive()).await
    }

    /// Navigates to the page for `date`, creating and filling it first when
    /// it does not exist. Failures are reported to the user, not returned.
    pub async fn open_or_create_on(&self, date: NaiveDate) -> Option<OpenOutcome> {
        let _lane = self.lane.acquire().await;
        let settings = self.settings.snapshot();
        let template = self.template_for(self.active_variant());

        match self.create_or_open(date, &template, &settings).await {
            Ok(outcome) => {
                tracing::info!(?outcome, %date, "journal page ready");
                self.settle_view(&outcome, &template, &settings);
                Some(outcome)
            }
            Err(error) => {
                self.report_failure("creation", error);
                None
            }
        }
    }

    async fn create_or_open(
        &self,
        date: NaiveDate,
        template: &PageTemplate,
        settings: &PageSettings,
    ) -> Result<OpenOutcome, RetryError<JournalError>> {
        let title_format = settings.title;
        let path = self
            .retry
            .run(
                move || {
                    let resolver = self.resolver.clone();
                    self.blocking(move || resolver.resolve_path(date, title_format))
                },
                classify,
            )
            .await?;

        if let Some(page_id) = path.page_id {
            self.navigate(&page_id).await?;
            return Ok(OpenOutcome::Opened(page_id));
        }

        let section_id = path.section_id;
        let page_id = self
            .retry
            .run(
                || {
                    let store = self.store.clone();
                    let section_id = section_id.clone();
                    self.blocking(move || store.create_page(&section_id))
                },
                classify,
            )
            .await?;

        let context = PageContext {
            page_name: path.page_name,
            date,
        };
        self.retry
            .run(
                || {
                    let store = self.store.clone();
                    let template = template.clone();
                    let operation = TemplateOperation::InitializeContent(context.clone());
                    let settings = settings.clone();
                    let marker = self.config.notebook_name.clone();
                    let page_id = page_id.clone();
                    self.blocking(move || {
                        let mut page = store.read_page(&page_id)?;
                        page.set_stationery_name(&marker);
                        template.apply(&operation, &mut page, &settings)?;
                        store.update_page(&page, UpdateStamp::SkipCheck)
                    })
                },
                classify,
            )
            .await?;

        self.navigate(&page_id).await?;
        Ok(OpenOutcome::Created(page_id))
    }

    async fn navigate(&self, page_id: &str) -> Result<(), RetryError<JournalError>> {
        self.retry
            .run(
                || {
                    let store = self.store.clone();
                    let page_id = page_id.to_string();
                    self.blocking(move || store.navigate_to(&page_id))
                },
                classify,
            )
            .await
    }

    fn settle_view(&self, outcome: &OpenOutcome, template: &PageTemplate, settings: &PageSettings) {
        let position = match outcome {
            OpenOutcome::Opened(_) => ViewPosition::EndOfPage,
            OpenOutcome::Created(_) => {
                self.refresh_rule_lines_view(settings);
                match template.cursor_placement() {
                    CursorPlacement::EndOfPage => ViewPosition::EndOfPage,
                    CursorPlacement::SelectSeedLine => ViewPosition::SelectLastLine,
                }
            }
        };
        self.position_view(position);
    }

    /// Executor body for one queued mutation. Returns `true` on failure.
    async fn run_mutation(&self, job: MutationJob) -> bool {
        let template = self.template_for(job.variant);
        let operation = TemplateOperation::for_field(job.field);

        let result = self
            .retry
            .run(
                || {
                    let store = self.store.clone();
                    let template = template.clone();
                    let operation = operation.clone();
                    let settings = job.settings.clone();
                    let marker = self.config.notebook_name.clone();
                    self.blocking(move || {
                        mutate_current_page(store.as_ref(), &marker, operation.name(), |page| {
                            template.apply(&operation, page, &settings)
                        })
                    })
                },
                classify,
            )
            .await;

        match result {
            Ok(MutationOutcome::Skipped) => false,
            Ok(MutationOutcome::Committed { outline_empty }) => {
                tracing::info!(
                    job_id = %job.job_id,
                    operation = operation.name(),
                    template = job.variant.as_str(),
                    "journal page updated"
                );
                if !outline_empty {
                    self.position_view(ViewPosition::TopOfPage);
                }
                if operation.refreshes_rule_lines_view() {
                    self.refresh_rule_lines_view(&job.settings);
                }
                false
            }
            Err(error) => {
                self.report_failure("mutation", error);
                true
            }
        }
    }

    fn template_for(&self, variant: TemplateVariant) -> PageTemplate {
        PageTemplate::new(variant, &self.config).with_banner(self.banner.clone())
    }

    async fn blocking<T, F>(&self, task: F) -> AppResult<T>
    where
        F: FnOnce() -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(task).await?
    }

    fn refresh_rule_lines_view(&self, settings: &PageSettings) {
        let spacing = settings
            .rule_lines_visible
            .then_some(settings.rule_lines_horizontal_spacing);
        if let Err(error) = self.view.show_rule_lines(spacing) {
            tracing::warn!(error = %error, "unable to refresh ruled lines view");
        }
    }

    fn position_view(&self, position: ViewPosition) {
        if let Err(error) = self.view.position(position) {
            tracing::warn!(?position, error = %error, "unable to position journal view");
        }
    }

    fn notify_busy(&self) {
        let lines: Vec<String> = BUSY_NOTICE.iter().map(|line| line.to_string()).collect();
        self.notifier.warn(&lines);
    }

    /// One notification per failed lane run.
    fn report_failure(&self, lane: &'static str, error: RetryError<JournalError>) {
        match error {
            RetryError::Exhausted { attempts } => {
                tracing::warn!(lane, attempts, "journal store stayed busy");
                self.notify_busy();
            }
            RetryError::Fatal(error) => {
                let code = error.hresult();
                let description = error_codes::describe(code);
                tracing::error!(
                    lane,
                    hresult = %format_hresult(code),
                    description = description.unwrap_or("unknown"),
                    error = %error,
                    "journal operation failed"
                );

                let mut lines = vec![ERROR_NOTICE_TITLE.to_string(), format_hresult(code)];
                if let Some(description) = description {
                    lines.push(description.to_string());
                }
                self.notifier.error(&lines);
            }
        }
    }
}

/// Read, ownership check, `apply`, commit. Pages the journal does not own are
/// left alone and `apply` is never called for them.
fn mutate_current_page(
    store: &dyn DocumentStoreClient,
    marker: &str,
    operation: &'static str,
    apply: impl FnOnce(&mut PageDocument) -> AppResult<()>,
) -> AppResult<MutationOutcome> {
    let Some(page_id) = store.current_page_id()? else {
        tracing::debug!(operation, "no current page; skipping");
        return Ok(MutationOutcome::Skipped);
    };

    let mut page = store.read_page(&page_id)?;
    if !page.is_managed_by(marker) {
        tracing::debug!(page_id = %page_id, operation, "page is not a journal page; skipping");
        return Ok(MutationOutcome::Skipped);
    }

    let stamp = page.update_stamp()?;
    apply(&mut page)?;
    store.update_page(&page, stamp)?;

    Ok(MutationOutcome::Committed {
        outline_empty: page.outline_is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::{mutate_current_page, MutationOutcome};
    use crate::errors::{AppResult, JournalError};
    use crate::models::{HierarchyNode, NodeId, NodeKind};
    use crate::page::{PageDocument, UpdateStamp};
    use crate::store::DocumentStoreClient;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Serves one current page and records commits.
    struct SinglePageStore {
        page: Option<PageDocument>,
        commits: Mutex<Vec<UpdateStamp>>,
    }

    impl SinglePageStore {
        fn showing(marker: Option<&str>) -> Self {
            let created = Utc
                .with_ymd_and_hms(2024, 3, 15, 12, 0, 0)
                .single()
                .expect("timestamp");
            let mut page = PageDocument::blank("{page-1}", created);
            if let Some(marker) = marker {
                page.set_stationery_name(marker);
            }
            Self {
                page: Some(page),
                commits: Mutex::new(Vec::new()),
            }
        }

        fn commits(&self) -> Vec<UpdateStamp> {
            self.commits.lock().expect("commits lock").clone()
        }
    }

    impl DocumentStoreClient for SinglePageStore {
        fn resolve_or_create(
            &self,
            _parent: Option<&str>,
            kind: NodeKind,
            name: &str,
            _create_if_absent: bool,
        ) -> AppResult<NodeId> {
            Err(JournalError::NotFound(format!("{} {}", kind.as_str(), name)))
        }

        fn sync_children(&self, _id: &str) -> AppResult<Vec<HierarchyNode>> {
            Ok(Vec::new())
        }

        fn read_page(&self, id: &str) -> AppResult<PageDocument> {
            self.page
                .clone()
                .ok_or_else(|| JournalError::NotFound(format!("page {}", id)))
        }

        fn create_page(&self, section_id: &str) -> AppResult<NodeId> {
            Err(JournalError::NotFound(format!("section {}", section_id)))
        }

        fn update_page(&self, _page: &PageDocument, stamp: UpdateStamp) -> AppResult<()> {
            self.commits.lock().expect("commits lock").push(stamp);
            Ok(())
        }

        fn navigate_to(&self, _id: &str) -> AppResult<()> {
            Ok(())
        }

        fn current_page_id(&self) -> AppResult<Option<NodeId>> {
            Ok(self.page.as_ref().map(|page| page.id().to_string()))
        }
    }

    #[test]
    fn foreign_page_is_neither_templated_nor_committed() {
        let store = SinglePageStore::showing(Some("Meeting notes"));
        let mut applied = 0;

        let outcome = mutate_current_page(&store, "My Journal", "ChangePageColor", |_| {
            applied += 1;
            Ok(())
        })
        .expect("mutation");

        assert_eq!(outcome, MutationOutcome::Skipped);
        assert_eq!(applied, 0);
        assert!(store.commits().is_empty());
    }

    #[test]
    fn unmarked_page_is_foreign_too() {
        let store = SinglePageStore::showing(None);
        let mut applied = 0;

        let outcome = mutate_current_page(&store, "My Journal", "ChangePageTitle", |_| {
            applied += 1;
            Ok(())
        })
        .expect("mutation");

        assert_eq!(outcome, MutationOutcome::Skipped);
        assert_eq!(applied, 0);
        assert!(store.commits().is_empty());
    }

    #[test]
    fn journal_page_is_templated_once_and_committed_with_its_timestamp() {
        let store = SinglePageStore::showing(Some("My Journal"));
        let expected = store
            .page
            .as_ref()
            .and_then(|page| page.update_stamp().ok())
            .expect("stamp");
        let mut applied = 0;

        let outcome = mutate_current_page(&store, "My Journal", "ChangePageColor", |page| {
            applied += 1;
            page.page_settings_mut("ChangePageColor")?.set_attr("color", "#EDF5FE");
            Ok(())
        })
        .expect("mutation");

        assert!(matches!(outcome, MutationOutcome::Committed { .. }));
        assert_eq!(applied, 1);
        assert_eq!(store.commits(), vec![expected]);
    }

    #[test]
    fn no_current_page_is_skipped() {
        let store = SinglePageStore {
            page: None,
            commits: Mutex::new(Vec::new()),
        };

        let outcome = mutate_current_page(&store, "My Journal", "ChangePageColor", |_| {
            panic!("no page to template")
        })
        .expect("mutation");

        assert_eq!(outcome, MutationOutcome::Skipped);
        assert!(store.commits().is_empty());
    }
}
