// Desktop front end: a single URL field driving the same pipeline as the CLI

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::downloader::naming::derive_output_name;
use crate::downloader::tools::ToolInfo;
use crate::downloader::{
    DownloadError, DownloadOptions, DownloadSession, Downloader, OutputMode, ToolManager, ToolType,
};

const STATUS_EVENT: &str = "download-status";
const FINISHED_EVENT: &str = "download-finished";

pub struct GuiState {
    downloader: Arc<Downloader>,
    tools: ToolManager,
    session: DownloadSession,
}

impl GuiState {
    pub fn new(config: &AppConfig) -> Result<Self, DownloadError> {
        Ok(Self {
            downloader: Arc::new(Downloader::from_config(config, OutputMode::Capture)?),
            tools: ToolManager::new(config),
            session: DownloadSession::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct DownloadFinished {
    success: bool,
    message: String,
    output: Option<String>,
    file_size: Option<u64>,
}

/// "auto" (or nothing) lets the orchestrator pick.
fn parse_tool_choice(tool: Option<&str>) -> Result<Option<ToolType>, String> {
    match tool.map(str::trim) {
        None | Some("") | Some("auto") => Ok(None),
        Some(name) => name.parse::<ToolType>().map(Some),
    }
}

fn warn_dialog(app: &AppHandle, message: String) {
    app.dialog()
        .message(message)
        .title("m3u8 grabber")
        .kind(MessageDialogKind::Warning)
        .show(|_| {});
}

#[tauri::command]
async fn get_tools_status(state: State<'_, GuiState>) -> Result<Vec<ToolInfo>, String> {
    Ok(state.tools.get_all_tools().await)
}

/// The derived file name inside the user's download directory (or the home
/// directory when there is none).
fn default_output_path(options: &DownloadOptions) -> PathBuf {
    let name = derive_output_name(
        options.page_url().unwrap_or(""),
        options.manifest_url().unwrap_or(""),
    );
    match dirs::download_dir().or_else(dirs::home_dir) {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Default save path for `input`.
#[tauri::command]
fn suggest_output_name(input: String) -> String {
    default_output_path(&DownloadOptions::from_single_input(&input))
        .to_string_lossy()
        .to_string()
}

#[tauri::command]
async fn pick_output_file(app: AppHandle, suggested: String) -> Result<Option<String>, String> {
    let suggested = PathBuf::from(suggested);
    let mut dialog = app.dialog().file().add_filter("MP4 video", &["mp4"]);
    if let Some(name) = suggested.file_name() {
        dialog = dialog.set_file_name(name.to_string_lossy());
    }
    if let Some(dir) = suggested.parent().filter(|d| d.is_dir()) {
        dialog = dialog.set_directory(dir);
    }

    let (tx, rx) = oneshot::channel();
    dialog.save_file(move |picked| {
        let _ = tx.send(picked);
    });

    match rx.await.map_err(|e| e.to_string())? {
        Some(path) => path
            .into_path()
            .map(|p| Some(p.to_string_lossy().to_string()))
            .map_err(|e| e.to_string()),
        None => Ok(None),
    }
}

/// Start a download in the background. Progress arrives as
/// `download-status` events, the outcome as one `download-finished` event.
#[tauri::command]
async fn start_download(
    app: AppHandle,
    state: State<'_, GuiState>,
    input: String,
    output: Option<String>,
    tool: Option<String>,
) -> Result<(), String> {
    let tool = parse_tool_choice(tool.as_deref())?;
    let mut options = DownloadOptions::from_single_input(&input)
        .with_output(output.map(|o| PathBuf::from(o.trim())))
        .with_tool(tool);
    if options.output.is_none() {
        options.output = Some(default_output_path(&options));
    }

    if !options.has_target() {
        warn_dialog(&app, "Please enter a video page URL or an m3u8 URL.".to_string());
        return Err(DownloadError::NoTargetSpecified.to_string());
    }

    let availability = state.tools.probe().await;
    if !availability.any() {
        let err = DownloadError::NoToolAvailable;
        warn_dialog(&app, err.to_string());
        return Err(err.to_string());
    }

    let handle = state
        .session
        .spawn_download(state.downloader.clone(), options, availability)
        .map_err(|e| e.to_string())?;
    info!(input = %input.trim(), "download started from GUI");

    tauri::async_runtime::spawn(async move {
        let mut events = handle.events;
        while let Some(event) = events.recv().await {
            if let Err(e) = app.emit(STATUS_EVENT, &event) {
                warn!(error = %e, "failed to forward status event");
            }
        }

        let finished = match handle.task.await {
            Ok(Ok(result)) => DownloadFinished {
                success: true,
                message: format!("Saved to {}", result.output.display()),
                output: Some(result.output.to_string_lossy().to_string()),
                file_size: result.file_size,
            },
            Ok(Err(e)) => DownloadFinished {
                success: false,
                file_size: match &e {
                    DownloadError::DownloadFailed { file_size, .. } => *file_size,
                    _ => None,
                },
                message: e.to_string(),
                output: None,
            },
            Err(e) => {
                error!(error = %e, "download task panicked");
                DownloadFinished {
                    success: false,
                    message: format!("download task failed: {}", e),
                    output: None,
                    file_size: None,
                }
            }
        };
        let _ = app.emit(FINISHED_EVENT, finished);
    });

    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config = AppConfig::from_env();
    let state = match GuiState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to initialise downloader");
            return;
        }
    };

    if let Err(e) = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            get_tools_status,
            suggest_output_name,
            pick_output_file,
            start_download,
        ])
        .run(tauri::generate_context!())
    {
        error!(error = %e, "error while running tauri application");
    }
}
