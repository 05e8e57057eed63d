use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::RunId,
    protocol::{HealthResponse, ModelSettings, RunRecord},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub mod conversation;
pub mod draft;
pub mod error;
pub mod history;
pub mod markup;
pub mod remote;
pub mod run_cache;
pub mod views;

pub use conversation::{ConversationPresenter, ConversationView, MessageOrigin};
pub use draft::{ParticipantCard, ParticipantField, ParticipantId, ScenarioDraft};
pub use error::{ClientError, RequestFailure, TagIndexOutOfRange, ValidationFailure};
pub use history::{FilterMode, HistoryRow, HistoryView};
pub use remote::{HttpRemoteService, Method, RemoteService, SimulationApi};
pub use run_cache::{BulkDeleteOutcome, RunCache};
pub use views::{Transition, ViewController, ViewName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    ViewChanged(Transition),
    ParticipantAdded(ParticipantCard),
    ParticipantsRenumbered(Vec<ParticipantCard>),
    /// Followed by exactly one of `HistoryRendered` or `HistoryLoadFailed`.
    HistoryLoading,
    HistoryRendered(HistoryView),
    HistoryLoadFailed,
    ConversationReady(Box<ConversationView>),
    Notice(Notice),
    /// `Some` shows the loading indicator with a message, `None` hides it.
    /// Overlapping operations share one indicator; the last call wins.
    Loading(Option<String>),
}

struct LabState {
    draft: ScenarioDraft,
    views: ViewController,
    filter: FilterMode,
    conversation: Option<ConversationView>,
    default_settings: ModelSettings,
}

/// Application context: one per process, shared by handle.
///
/// State sits behind a mutex that is released before every remote call, so
/// a new action can start while another is still in flight.
pub struct SimulationLab {
    api: SimulationApi,
    runs: RunCache,
    presenter: ConversationPresenter,
    inner: Mutex<LabState>,
    events: broadcast::Sender<AppEvent>,
}

impl SimulationLab {
    pub fn new(remote: Arc<dyn RemoteService>, default_settings: ModelSettings) -> Arc<Self> {
        let api = SimulationApi::new(remote);
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            runs: RunCache::new(api.clone()),
            presenter: ConversationPresenter::new(api.clone()),
            api,
            inner: Mutex::new(LabState {
                draft: ScenarioDraft::new(default_settings.clone()),
                views: ViewController::default(),
                filter: FilterMode::default(),
                conversation: None,
                default_settings,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "lab: notice");
        self.emit(AppEvent::Notice(Notice { level, message }));
    }

    fn set_loading(&self, message: Option<&str>) {
        self.emit(AppEvent::Loading(message.map(ToString::to_string)));
    }

    pub async fn start(&self) {
        self.show(ViewName::ScenarioBuilder).await;
    }

    pub async fn active_view(&self) -> ViewName {
        self.inner.lock().await.views.active()
    }

    pub async fn show_view(&self, name: &str) -> bool {
        let transition = self.inner.lock().await.views.show_view(name);
        match transition {
            Some(transition) => {
                self.enter(transition).await;
                true
            }
            None => {
                debug!(view = name, "lab: unknown view ignored");
                false
            }
        }
    }

    pub async fn show(&self, view: ViewName) {
        let transition = self.inner.lock().await.views.activate(view);
        self.enter(transition).await;
    }

    async fn enter(&self, transition: Transition) {
        info!(from = %transition.from, to = %transition.to, "lab: view changed");
        self.emit(AppEvent::ViewChanged(transition));
        match transition.to {
            ViewName::History => {
                let _ = self.refresh_history().await;
            }
            ViewName::ScenarioBuilder => {
                let cards = self.inner.lock().await.draft.cards();
                self.emit(AppEvent::ParticipantsRenumbered(cards));
            }
            ViewName::ConversationViewer => {}
        }
    }

    // ---- scenario draft ----

    pub async fn draft_snapshot(&self) -> ScenarioDraft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn participant_cards(&self) -> Vec<ParticipantCard> {
        self.inner.lock().await.draft.cards()
    }

    pub async fn add_participant(&self) -> ParticipantCard {
        let card = self.inner.lock().await.draft.add_participant();
        self.emit(AppEvent::ParticipantAdded(card));
        card
    }

    pub async fn remove_participant(&self, id: ParticipantId) -> bool {
        let (removed, cards) = {
            let mut state = self.inner.lock().await;
            let removed = state.draft.remove_participant(id);
            (removed, state.draft.cards())
        };
        self.emit(AppEvent::ParticipantsRenumbered(cards));
        removed
    }

    pub async fn update_participant(
        &self,
        id: ParticipantId,
        field: ParticipantField,
        value: &str,
    ) -> bool {
        self.inner.lock().await.draft.update_field(id, field, value)
    }

    pub async fn update_meta_tag(
        &self,
        id: ParticipantId,
        index: usize,
        value: &str,
    ) -> Result<bool, TagIndexOutOfRange> {
        self.inner
            .lock()
            .await
            .draft
            .update_meta_tag(id, index, value)
    }

    pub async fn set_scenario_name(&self, name: &str) {
        self.inner.lock().await.draft.name = name.to_string();
    }

    pub async fn set_system_prompt(&self, prompt: &str) {
        self.inner.lock().await.draft.system_prompt = prompt.to_string();
    }

    pub async fn set_settings(&self, settings: ModelSettings) {
        self.inner.lock().await.draft.settings = settings;
    }

    pub async fn discard_draft(&self) {
        let cards = {
            let mut state = self.inner.lock().await;
            state.draft = state.draft.restart(state.default_settings.clone());
            state.draft.cards()
        };
        self.emit(AppEvent::ParticipantsRenumbered(cards));
    }

    pub async fn submit_draft(&self) -> Result<RunRecord, ClientError> {
        let request = {
            let state = self.inner.lock().await;
            if !state.draft.validate() {
                let failure = ValidationFailure {
                    issues: state.draft.issues(),
                };
                drop(state);
                self.notify(NoticeLevel::Error, "Please fill in all required fields");
                return Err(failure.into());
            }
            state.draft.serialize()
        };

        self.set_loading(Some("Creating scenario and running simulation..."));
        let outcome = async {
            let scenario = self.api.create_scenario(&request).await?;
            info!(scenario_id = %scenario.id, "lab: scenario saved");
            let run = self.api.start_run(scenario.id).await?;
            info!(run_id = %run.id, "lab: simulation finished");
            Ok::<_, RequestFailure>(run)
        }
        .await;

        let result = match outcome {
            Ok(run) => {
                self.notify(NoticeLevel::Success, "Simulation completed successfully!");
                self.discard_draft().await;
                let _ = self.show_conversation(run.clone()).await;
                Ok(run)
            }
            Err(err) => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Failed to run simulation: {err}"),
                );
                Err(err.into())
            }
        };
        self.set_loading(None);
        result
    }

    // ---- conversation ----

    pub async fn current_conversation(&self) -> Option<ConversationView> {
        self.inner.lock().await.conversation.clone()
    }

    pub async fn show_conversation(&self, run: RunRecord) -> Result<ConversationView, ClientError> {
        self.set_loading(Some("Loading conversation..."));
        let result = match self.presenter.resolve(run).await {
            Ok(view) => {
                self.inner.lock().await.conversation = Some(view.clone());
                self.emit(AppEvent::ConversationReady(Box::new(view.clone())));
                self.show(ViewName::ConversationViewer).await;
                Ok(view)
            }
            Err(err @ ClientError::NotFound { .. }) => {
                self.notify(NoticeLevel::Error, "Scenario not found");
                Err(err)
            }
            Err(err) => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Failed to load conversation: {err}"),
                );
                Err(err)
            }
        };
        self.set_loading(None);
        result
    }

    pub async fn view_run(&self, id: RunId) -> Result<ConversationView, ClientError> {
        let run = match self.runs.get(id).await {
            Some(run) => run,
            None => match self.api.fetch_run(id).await {
                Ok(run) => run,
                Err(err) => {
                    self.notify(
                        NoticeLevel::Error,
                        format!("Failed to load conversation: {err}"),
                    );
                    return Err(err.into());
                }
            },
        };
        self.show_conversation(run).await
    }

    pub async fn close_conversation(&self) {
        self.show(ViewName::History).await;
    }

    // ---- history ----

    pub async fn history_filter(&self) -> FilterMode {
        self.inner.lock().await.filter
    }

    pub async fn cached_runs(&self) -> Option<Vec<RunRecord>> {
        self.runs.snapshot().await
    }

    pub async fn unstarred_count(&self) -> usize {
        self.runs.unstarred_count().await
    }

    pub async fn history_view(&self) -> Option<HistoryView> {
        let runs = self.runs.snapshot().await?;
        let filter = self.inner.lock().await.filter;
        Some(history::render_history(&runs, filter, Utc::now()))
    }

    async fn rerender_history(&self) {
        if let Some(view) = self.history_view().await {
            self.emit(AppEvent::HistoryRendered(view));
        }
    }

    pub async fn refresh_history(&self) -> Result<HistoryView, ClientError> {
        self.emit(AppEvent::HistoryLoading);
        match self.runs.load().await {
            Ok(runs) => {
                let filter = self.inner.lock().await.filter;
                let view = history::render_history(&runs, filter, Utc::now());
                self.emit(AppEvent::HistoryRendered(view.clone()));
                Ok(view)
            }
            Err(err) => {
                self.emit(AppEvent::HistoryLoadFailed);
                self.notify(
                    NoticeLevel::Error,
                    format!("Failed to load history: {err}"),
                );
                Err(err.into())
            }
        }
    }

    pub async fn set_history_filter(&self, filter: FilterMode) {
        self.inner.lock().await.filter = filter;
        self.rerender_history().await;
    }

    pub async fn toggle_star(&self, id: RunId, starred: bool) -> Result<(), ClientError> {
        match self.runs.set_starred(id, starred).await {
            Ok(()) => {
                self.rerender_history().await;
                self.notify(
                    NoticeLevel::Success,
                    if starred { "Run starred!" } else { "Star removed" },
                );
                Ok(())
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Failed to update star: {err}"));
                Err(err.into())
            }
        }
    }

    pub async fn delete_run(&self, id: RunId) -> Result<(), ClientError> {
        match self.runs.delete(id).await {
            Ok(()) => {
                self.rerender_history().await;
                self.notify(NoticeLevel::Success, "Run deleted successfully");
                Ok(())
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Failed to delete run: {err}"));
                Err(err.into())
            }
        }
    }

    pub async fn delete_all_unstarred(&self) -> Result<BulkDeleteOutcome, ClientError> {
        if self.runs.unstarred_count().await == 0 {
            self.notify(NoticeLevel::Info, "No unstarred runs to delete");
            return Ok(BulkDeleteOutcome::NothingToDelete);
        }

        self.set_loading(Some("Deleting unstarred runs..."));
        let result = match self.runs.delete_all_unstarred().await {
            Ok(outcome) => {
                self.rerender_history().await;
                match outcome {
                    BulkDeleteOutcome::Deleted { deleted_count, .. } => self.notify(
                        NoticeLevel::Success,
                        format!("Deleted {deleted_count} unstarred runs"),
                    ),
                    BulkDeleteOutcome::NothingToDelete => {
                        self.notify(NoticeLevel::Info, "No unstarred runs to delete")
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Failed to delete runs: {err}"));
                Err(err.into())
            }
        };
        self.set_loading(None);
        result
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.api.health().await.map_err(|err| {
            self.notify(NoticeLevel::Error, format!("Backend unavailable: {err}"));
            ClientError::from(err)
        })
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
