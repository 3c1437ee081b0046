use medbill_core::config::CoreConfig;
use medbill_core::suggestions::GenerativeModel;
use medbill_core::{BillService, CoreResult, RecordRepository, Renderer, SuggestionGateway};
use medbill_files::ArtifactStore;
use std::sync::Arc;

/// Application state shared across REST handlers.
///
/// Built once at startup: the renderer backends, the model client and the artifact
/// directories are all fixed for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub repository: Arc<RecordRepository>,
    pub gateway: SuggestionGateway,
    pub bills: BillService,
    pub uploads: ArtifactStore,
    /// Deployment label reported by the storage status endpoint.
    pub environment: String,
}

impl AppState {
    /// Creates the artifact directories under the configured data directory and wires the
    /// services together.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Storage` if either artifact directory cannot be created.
    pub fn new(
        cfg: Arc<CoreConfig>,
        model: Arc<dyn GenerativeModel>,
        environment: impl Into<String>,
    ) -> CoreResult<Self> {
        let uploads = ArtifactStore::open_or_create(&cfg.uploads_dir())?;
        let bill_store = ArtifactStore::open_or_create(&cfg.bills_dir())?;

        tracing::info!(
            "artifact directories ready: uploads={} bills={}",
            uploads.directory().display(),
            bill_store.directory().display()
        );

        Ok(Self {
            gateway: SuggestionGateway::new(model, cfg.gateway_timeout()),
            bills: BillService::new(Renderer::standard(cfg.render_timeout()), bill_store),
            repository: Arc::new(RecordRepository::new()),
            uploads,
            environment: environment.into(),
            cfg,
        })
    }
}
