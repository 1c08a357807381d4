#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use talent_core::binding::ChangeHook;
use talent_core::demo::seed_if_empty;
use talent_core::export::sanitize_filename;
use talent_core::{
    AppConfig, Credentials, Dashboard, DashboardSnapshot, Direction, FieldKey, FilterCriteria,
    LocalDocumentStore, LocalIdentityProvider, Tab, View,
};
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_opener::OpenerExt;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STORAGE_DIR: &str = "YoungTalents";
const CHANGED_EVENT: &str = "dashboard://changed";
const DEFAULT_EXPORT_NAME: &str = "candidatos.csv";

struct AppState {
    dashboard: Dashboard,
    identity: Arc<LocalIdentityProvider>,
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    display_name: String,
    password: String,
}

#[derive(Deserialize)]
struct NavigateRequest {
    view: View,
}

#[derive(Deserialize)]
struct FilterSetRequest {
    criteria: FilterCriteria,
}

#[derive(Deserialize)]
struct CandidateRequest {
    id: String,
}

#[derive(Deserialize)]
struct CandidateMoveRequest {
    id: String,
    direction: Direction,
}

#[derive(Deserialize)]
struct EditorFieldRequest {
    key: FieldKey,
    value: String,
}

#[derive(Deserialize)]
struct EditorStageRequest {
    stage: String,
}

#[derive(Deserialize)]
struct EditorTabRequest {
    tab: Tab,
}

#[derive(Deserialize)]
struct ExportCsvRequest {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize)]
struct SaveCsvResult {
    ok: bool,
    canceled: bool,
    filename: String,
    path: Option<String>,
    rows: usize,
}

#[tauri::command]
fn app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
fn dashboard_snapshot(state: State<'_, AppState>) -> DashboardSnapshot {
    state.dashboard.snapshot()
}

#[tauri::command]
fn auth_sign_in(state: State<'_, AppState>, payload: SignInRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .sign_in(&Credentials {
            email: payload.email,
            password: payload.password,
        })
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn auth_sign_out(state: State<'_, AppState>) -> Result<DashboardSnapshot, String> {
    state.dashboard.sign_out().map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn auth_register(state: State<'_, AppState>, payload: RegisterRequest) -> Result<bool, String> {
    state
        .identity
        .register(
            payload.email.as_str(),
            payload.display_name.as_str(),
            payload.password.as_str(),
        )
        .map_err(|err| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn shell_navigate(state: State<'_, AppState>, payload: NavigateRequest) -> DashboardSnapshot {
    state.dashboard.navigate(payload.view);
    state.dashboard.snapshot()
}

#[tauri::command]
fn filter_set(state: State<'_, AppState>, payload: FilterSetRequest) -> DashboardSnapshot {
    state.dashboard.set_criteria(payload.criteria);
    state.dashboard.snapshot()
}

#[tauri::command]
fn candidate_move(state: State<'_, AppState>, payload: CandidateMoveRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .move_candidate(payload.id.as_str(), payload.direction)
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn candidate_open(state: State<'_, AppState>, payload: CandidateRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .open_candidate(payload.id.as_str())
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn candidate_create(state: State<'_, AppState>) -> Result<DashboardSnapshot, String> {
    state.dashboard.create_candidate().map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn editor_set_field(state: State<'_, AppState>, payload: EditorFieldRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .edit_field(payload.key, payload.value.as_str())
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn editor_set_stage(state: State<'_, AppState>, payload: EditorStageRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .edit_stage(payload.stage.as_str())
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn editor_select_tab(state: State<'_, AppState>, payload: EditorTabRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .select_tab(payload.tab)
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn editor_save(state: State<'_, AppState>) -> Result<DashboardSnapshot, String> {
    state.dashboard.save_editor().map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn editor_cancel(state: State<'_, AppState>) -> DashboardSnapshot {
    state.dashboard.cancel_editor();
    state.dashboard.snapshot()
}

#[tauri::command]
fn banner_dismiss(state: State<'_, AppState>) -> DashboardSnapshot {
    state.dashboard.dismiss_error();
    state.dashboard.snapshot()
}

#[tauri::command]
fn write_retry(state: State<'_, AppState>, payload: CandidateRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .retry_write(payload.id.as_str())
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn write_discard(state: State<'_, AppState>, payload: CandidateRequest) -> Result<DashboardSnapshot, String> {
    state
        .dashboard
        .discard_write(payload.id.as_str())
        .map_err(|err| err.to_string())?;
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
fn candidates_export_csv(state: State<'_, AppState>, payload: ExportCsvRequest) -> Result<SaveCsvResult, String> {
    let default_name = sanitize_filename(payload.filename.as_deref().unwrap_or(DEFAULT_EXPORT_NAME));
    let rows = state.dashboard.visible_candidates().len();
    let path = rfd::FileDialog::new()
        .add_filter("CSV", &["csv"])
        .set_file_name(default_name.as_str())
        .save_file();

    let Some(path) = path else {
        return Ok(SaveCsvResult {
            ok: false,
            canceled: true,
            filename: default_name,
            path: None,
            rows,
        });
    };

    write_text_file(path.as_path(), state.dashboard.export_csv().as_str())?;
    info!(path = %path.display(), rows, "candidates exported");
    Ok(SaveCsvResult {
        ok: true,
        canceled: false,
        filename: default_name,
        path: Some(path.to_string_lossy().to_string()),
        rows,
    })
}

#[tauri::command]
fn candidate_copy_email(app: AppHandle, state: State<'_, AppState>, payload: CandidateRequest) -> Result<bool, String> {
    let email = candidate_email(&state, payload.id.as_str())?;
    app.clipboard()
        .write_text(email)
        .map_err(|err| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn candidate_email_draft(app: AppHandle, state: State<'_, AppState>, payload: CandidateRequest) -> Result<bool, String> {
    let email = candidate_email(&state, payload.id.as_str())?;
    app.opener()
        .open_url(format!("mailto:{email}"), Option::<String>::None)
        .map_err(|err: tauri_plugin_opener::Error| err.to_string())?;
    Ok(true)
}

fn candidate_email(state: &AppState, id: &str) -> Result<String, String> {
    let candidate = state
        .dashboard
        .candidate(id)
        .ok_or_else(|| format!("candidate not found: {id}"))?;
    candidate
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| "candidate has no e-mail".to_string())
}

fn write_text_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    fs::write(path, content).map_err(|err| err.to_string())
}

fn storage_root_dir(app: &AppHandle) -> Result<PathBuf, String> {
    static RESOLVED_ROOT: OnceLock<PathBuf> = OnceLock::new();
    if let Some(root) = RESOLVED_ROOT.get() {
        return Ok(root.clone());
    }

    let base = app.path().app_data_dir().map_err(|err| err.to_string())?;
    let root = base.join(STORAGE_DIR);
    fs::create_dir_all(root.as_path()).map_err(|err| err.to_string())?;
    let _ = RESOLVED_ROOT.set(root.clone());
    Ok(root)
}

fn init_logging(config: &AppConfig, root: &Path) -> Result<(), String> {
    let filter = EnvFilter::try_new(config.log_level.as_str()).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &config.log_file {
        let path = if log_file.is_absolute() {
            log_file.clone()
        } else {
            root.join(log_file)
        };
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_path())
            .map_err(|err| format!("failed to open log file {}: {err}", path.display()))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init()
            .map_err(|err| err.to_string())
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|err| err.to_string())
    }
}

fn build_state(app: &AppHandle) -> Result<AppState, String> {
    let root = storage_root_dir(app)?;
    let config = AppConfig::load(root.as_path()).map_err(|err| err.to_string())?;
    init_logging(&config, root.as_path())?;
    info!(root = %root.display(), app_id = %config.app_id, "starting");

    let identity = Arc::new(LocalIdentityProvider::open(root.as_path(), &config.identity));
    let store = Arc::new(LocalDocumentStore::with_iterations(
        root.as_path(),
        config.store.passphrase.clone(),
        config.identity.pbkdf2_iterations,
    ));
    if config.store.seed_demo {
        if let Err(err) = seed_if_empty(store.as_ref(), &config.candidates_path()) {
            warn!(error = %err, "demo seed skipped");
        }
    }

    let handle = app.clone();
    let hook: ChangeHook = Arc::new(move || {
        if let Err(err) = handle.emit(CHANGED_EVENT, ()) {
            warn!(error = %err, "failed to emit dashboard change");
        }
    });
    let dashboard = Dashboard::new(identity.clone(), store, &config, Some(hook));
    Ok(AppState { dashboard, identity })
}

fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let state = build_state(app.handle())?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            app_version,
            dashboard_snapshot,
            auth_sign_in,
            auth_sign_out,
            auth_register,
            shell_navigate,
            filter_set,
            candidate_move,
            candidate_open,
            candidate_create,
            editor_set_field,
            editor_set_stage,
            editor_select_tab,
            editor_save,
            editor_cancel,
            banner_dismiss,
            write_retry,
            write_discard,
            candidates_export_csv,
            candidate_copy_email,
            candidate_email_draft
        ])
        .run(tauri::generate_context!())
        .expect("failed to run Young Talents");
}
