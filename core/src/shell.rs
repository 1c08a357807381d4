//! Dashboard shell: navigation, filters, and the editor around the live
//! candidate list.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::binding::{BindingError, CandidateBinding, ChangeHook, FailedWrite};
use crate::config::AppConfig;
use crate::editor::{CandidateEditor, EditorError, EditorView, FieldKey, Tab};
use crate::export::candidates_to_csv;
use crate::filter::{filter_candidates, FilterCriteria};
use crate::identity::{AuthError, Credentials, IdentityProvider};
use crate::lock;
use crate::model::{Candidate, CandidatePatch, User};
use crate::session::SessionGate;
use crate::stage::{Direction, StageModel};
use crate::stats::StatsStrip;
use crate::store::DocumentStore;
use crate::views::{CandidateTable, KanbanBoard};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShellError {
    #[error("creating candidates is not available yet")]
    CreateUnavailable,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Kanban,
    List,
    Settings,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Kanban => "Pipeline de Talentos",
            View::List => "Lista de Candidatos",
            View::Settings => "Configurações",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub app_id: String,
    pub collection_path: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub user: Option<User>,
    pub auth_loading: bool,
    pub loading: bool,
    pub auth_error: Option<String>,
    pub error: Option<String>,
    pub failed_writes: Vec<FailedWrite>,
    pub view: View,
    pub title: &'static str,
    pub show_filters: bool,
    pub criteria: FilterCriteria,
    pub stats: StatsStrip,
    pub visible: usize,
    pub board: Option<KanbanBoard>,
    pub table: Option<CandidateTable>,
    pub settings: Option<SettingsView>,
    pub editor: Option<EditorView>,
    pub can_create: bool,
}

struct UiState {
    view: View,
    criteria: FilterCriteria,
    editor: CandidateEditor,
}

pub struct Dashboard {
    gate: SessionGate,
    binding: Arc<CandidateBinding>,
    ui: Arc<Mutex<UiState>>,
    stages: StageModel,
    app_id: String,
}

impl Dashboard {
    /// Wires the session gate to the candidate binding. `hook` runs whenever
    /// the candidate list, its flags, or the session changes.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        config: &AppConfig,
        hook: Option<ChangeHook>,
    ) -> Self {
        let stages = StageModel::default();
        let mut binding = CandidateBinding::new(store, config.candidates_path());
        if let Some(hook) = hook {
            binding = binding.with_change_hook(hook);
        }
        let binding = Arc::new(binding);
        let ui = Arc::new(Mutex::new(UiState {
            view: View::default(),
            criteria: FilterCriteria::default(),
            editor: CandidateEditor::new(stages),
        }));

        let gate = {
            let binding = Arc::clone(&binding);
            let ui = Arc::clone(&ui);
            SessionGate::attach(identity, move |user| {
                if user.is_none() {
                    lock(&ui).editor.cancel();
                }
                binding.bind(user);
            })
        };

        Self {
            gate,
            binding,
            ui,
            stages,
            app_id: config.app_id.trim().to_string(),
        }
    }

    pub fn sign_in(&self, credentials: &Credentials) -> Result<User, ShellError> {
        Ok(self.gate.sign_in(credentials)?)
    }

    pub fn sign_out(&self) -> Result<(), ShellError> {
        self.gate.sign_out()?;
        info!("signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.gate.current_user()
    }

    pub fn navigate(&self, view: View) {
        lock(&self.ui).view = view;
        debug!(?view, "navigated");
    }

    pub fn set_criteria(&self, criteria: FilterCriteria) {
        lock(&self.ui).criteria = criteria;
    }

    pub fn candidate(&self, id: &str) -> Option<Candidate> {
        self.binding.candidate(id)
    }

    /// Moves one stage forward or back. Returns `None` at either end of the
    /// pipeline or for a stage outside it, without writing.
    pub fn move_candidate(&self, id: &str, direction: Direction) -> Result<Option<Candidate>, ShellError> {
        let candidate = self
            .binding
            .candidate(id)
            .ok_or_else(|| BindingError::UnknownCandidate(id.to_string()))?;
        let Some(next) = self.stages.advance(&candidate.stage, direction) else {
            debug!(id, stage = %candidate.stage, ?direction, "move ignored");
            return Ok(None);
        };
        let updated = self.binding.update_candidate(id, CandidatePatch::stage(next.id))?;
        Ok(Some(updated))
    }

    pub fn open_candidate(&self, id: &str) -> Result<(), ShellError> {
        let candidate = self
            .binding
            .candidate(id)
            .ok_or_else(|| BindingError::UnknownCandidate(id.to_string()))?;
        lock(&self.ui).editor.open(candidate);
        Ok(())
    }

    pub fn edit_field(&self, key: FieldKey, value: &str) -> Result<(), ShellError> {
        Ok(lock(&self.ui).editor.set_field(key, value)?)
    }

    pub fn edit_stage(&self, stage_id: &str) -> Result<(), ShellError> {
        Ok(lock(&self.ui).editor.set_stage(stage_id)?)
    }

    pub fn select_tab(&self, tab: Tab) -> Result<(), ShellError> {
        Ok(lock(&self.ui).editor.select_tab(tab)?)
    }

    // Lock order is ui then binding; the binding never reaches back into ui.
    pub fn save_editor(&self) -> Result<Candidate, ShellError> {
        let mut ui = lock(&self.ui);
        Ok(ui.editor.save(&self.binding)?)
    }

    pub fn cancel_editor(&self) {
        lock(&self.ui).editor.cancel();
    }

    /// Clears the subscription banner and the sign-in alert.
    pub fn dismiss_error(&self) {
        self.gate.dismiss_auth_error();
        self.binding.dismiss_error();
    }

    pub fn retry_write(&self, id: &str) -> Result<Candidate, ShellError> {
        Ok(self.binding.retry_write(id)?)
    }

    pub fn discard_write(&self, id: &str) -> Result<(), ShellError> {
        Ok(self.binding.discard_failed_write(id)?)
    }

    pub fn create_candidate(&self) -> Result<Candidate, ShellError> {
        info!("candidate creation requested");
        Err(ShellError::CreateUnavailable)
    }

    pub fn visible_candidates(&self) -> Vec<Candidate> {
        let criteria = lock(&self.ui).criteria.clone();
        filter_candidates(&self.binding.candidates(), &criteria)
    }

    /// CSV of the candidates matching the current filters.
    pub fn export_csv(&self) -> String {
        candidates_to_csv(&self.visible_candidates(), &self.stages)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let candidates = self.binding.candidates();
        let error = self.binding.error();
        let connected = self.binding.is_subscribed() && error.is_none();
        let ui = lock(&self.ui);
        let view = ui.view;
        let visible = filter_candidates(&candidates, &ui.criteria);

        let (board, table, settings) = match view {
            View::Kanban => (Some(KanbanBoard::build(&visible, &self.stages)), None, None),
            View::List => (None, Some(CandidateTable::build(&visible, &self.stages)), None),
            View::Settings => (
                None,
                None,
                Some(SettingsView {
                    app_id: self.app_id.clone(),
                    collection_path: self.binding.path().to_string(),
                    connected,
                }),
            ),
        };

        DashboardSnapshot {
            user: self.gate.current_user(),
            auth_loading: self.gate.auth_loading(),
            loading: self.binding.loading(),
            auth_error: self.gate.auth_error(),
            error,
            failed_writes: self.binding.failed_writes(),
            view,
            title: view.title(),
            show_filters: view != View::Settings,
            criteria: ui.criteria.clone(),
            stats: StatsStrip::build(&candidates, &self.stages),
            visible: visible.len(),
            board,
            table,
            settings,
            editor: ui.editor.view(),
            can_create: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentityConfig;
    use crate::demo::seed_if_empty;
    use crate::identity::LocalIdentityProvider;
    use crate::store::LocalDocumentStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        dashboard: Dashboard,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default();
        let identity = Arc::new(LocalIdentityProvider::open(
            dir.path(),
            &IdentityConfig {
                allowed_domains: vec!["young.com.br".into()],
                pbkdf2_iterations: 10,
            },
        ));
        identity
            .register("rh@young.com.br", "Equipe RH", "segredo")
            .unwrap();
        let store = Arc::new(LocalDocumentStore::open(dir.path(), None));
        seed_if_empty(store.as_ref(), &config.candidates_path()).unwrap();
        let dashboard = Dashboard::new(identity, store, &config, None);
        Fixture { _dir: dir, dashboard }
    }

    fn credentials(email: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: "segredo".into(),
        }
    }

    fn id_of(dashboard: &Dashboard, name: &str) -> String {
        dashboard
            .visible_candidates()
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| c.id)
            .unwrap()
    }

    #[test]
    fn signed_out_dashboard_is_empty() {
        let fx = fixture();
        let snapshot = fx.dashboard.snapshot();
        assert!(snapshot.user.is_none());
        assert!(!snapshot.auth_loading);
        assert_eq!(snapshot.stats.total, 0);
        assert_eq!(snapshot.title, "Pipeline de Talentos");
        assert!(!snapshot.can_create);
    }

    #[test]
    fn sign_in_loads_board_and_stats() {
        let fx = fixture();
        fx.dashboard.sign_in(&credentials("rh@young.com.br")).unwrap();
        let snapshot = fx.dashboard.snapshot();
        assert_eq!(snapshot.user.unwrap().display_name, "Equipe RH");
        assert_eq!(snapshot.stats.total, 3);
        let board = snapshot.board.unwrap();
        assert_eq!(board.column("Entrevista I").unwrap().count, 1);
        assert!(snapshot.table.is_none());
    }

    #[test]
    fn filters_narrow_views_but_not_stats() {
        let fx = fixture();
        fx.dashboard.sign_in(&credentials("rh@young.com.br")).unwrap();
        fx.dashboard.set_criteria(FilterCriteria {
            city: "rio".into(),
            ..FilterCriteria::default()
        });
        fx.dashboard.navigate(View::List);
        let snapshot = fx.dashboard.snapshot();
        assert_eq!(snapshot.title, "Lista de Candidatos");
        assert_eq!(snapshot.visible, 1);
        assert_eq!(snapshot.table.unwrap().rows[0].name, "Carlos Oliveira");
        assert_eq!(snapshot.stats.total, 3);
        assert_eq!(fx.dashboard.export_csv().lines().count(), 2);
    }

    #[test]
    fn settings_hide_filters_and_report_connection() {
        let fx = fixture();
        fx.dashboard.sign_in(&credentials("rh@young.com.br")).unwrap();
        fx.dashboard.navigate(View::Settings);
        let snapshot = fx.dashboard.snapshot();
        assert!(!snapshot.show_filters);
        let settings = snapshot.settings.unwrap();
        assert_eq!(settings.app_id, "young-ats");
        assert_eq!(settings.collection_path, "artifacts/young-ats/public/data/candidates");
        assert!(settings.connected);
    }

    #[test]
    fn move_respects_pipeline_ends() {
        let fx = fixture();
        fx.dashboard.sign_in(&credentials("rh@young.com.br")).unwrap();
        let mariana = id_of(&fx.dashboard, "Mariana Costa");
        assert!(fx.dashboard.move_candidate(&mariana, Direction::Next).unwrap().is_none());
        let moved = fx.dashboard.move_candidate(&mariana, Direction::Prev).unwrap().unwrap();
        assert_eq!(moved.stage, "Entrevista II");
    }

    #[test]
    fn editor_save_writes_and_sign_out_closes() {
        let fx = fixture();
        fx.dashboard.sign_in(&credentials("rh@young.com.br")).unwrap();
        let ana = id_of(&fx.dashboard, "Ana Silva");
        fx.dashboard.open_candidate(&ana).unwrap();
        fx.dashboard.edit_field(FieldKey::City, "Campinas").unwrap();
        fx.dashboard.edit_stage("Testes realizados").unwrap();
        let saved = fx.dashboard.save_editor().unwrap();
        assert_eq!(saved.city.as_deref(), Some("Campinas"));
        assert!(fx.dashboard.snapshot().editor.is_none());
        assert_eq!(fx.dashboard.candidate(&ana).unwrap().stage, "Testes realizados");

        fx.dashboard.open_candidate(&ana).unwrap();
        fx.dashboard.sign_out().unwrap();
        let snapshot = fx.dashboard.snapshot();
        assert!(snapshot.editor.is_none());
        assert!(snapshot.user.is_none());
        assert_eq!(snapshot.stats.total, 0);
    }

    #[test]
    fn unauthorized_domain_shows_alert_until_dismissed() {
        let fx = fixture();
        let err = fx.dashboard.sign_in(&credentials("ana@gmail.com")).unwrap_err();
        assert!(matches!(err, ShellError::Auth(AuthError::UnauthorizedDomain { .. })));
        assert!(fx.dashboard.snapshot().auth_error.is_some());
        fx.dashboard.dismiss_error();
        assert!(fx.dashboard.snapshot().auth_error.is_none());
    }

    #[test]
    fn create_is_a_stub() {
        let fx = fixture();
        assert!(matches!(
            fx.dashboard.create_candidate(),
            Err(ShellError::CreateUnavailable)
        ));
    }
}
