use runw::api::GraphQlClient;
use runw::app::{self, AppConfig, AppState, DialogOwner};
use runw::cli::Cli;
use runw::events::{AppEvent, EventHandler, EventSink};
use runw::input::{self, Action};
use runw::launch::{self, LaunchBehavior, LaunchOutcome, NavTarget};
use runw::menu::MenuAction;
use runw::notify;
use runw::platform;
use runw::poller::{self, Poller};
use runw::reexecution::{ReexecutionRequest, ReexecutionStyle};
use runw::traits::OrchestratorApi;
use runw::tui;
use runw::workflow::{self, ConfirmationWorkflow, WorkflowKind};

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

type EventTx = mpsc::UnboundedSender<AppEvent>;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = state_dir();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "runw v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn state_dir() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("runw")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("runw")
    } else {
        std::path::PathBuf::from("/tmp/runw")
    }
}

/// Spawn `fut` and report a panic as an error event instead of losing it.
fn spawn_monitored(tx: EventTx, label: &'static str, fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Error(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    let api: Arc<dyn OrchestratorApi> = Arc::new(GraphQlClient::new(&args.server)?);

    // Panic hook goes in before the terminal switches modes.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let startup = match tui::startup::run_startup(
        &mut terminal,
        api.as_ref(),
        &args.server,
        args.limit,
        args.pipeline.as_deref(),
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            restore_terminal(&mut terminal)?;
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    execute!(io::stdout(), SetTitle(format!("runw {}", args.server)))?;

    let mut state = AppState::new(AppConfig {
        server_root: args.server.clone(),
        limit: args.limit,
        pipeline_filter: args.pipeline.clone(),
        launch_behavior: if args.no_open {
            LaunchBehavior::Toast
        } else {
            LaunchBehavior::Open
        },
        version_string: format!(
            "runw v{}+{}",
            env!("CARGO_PKG_VERSION"),
            env!("BUILD_NUMBER")
        ),
    });
    state.poll_interval = args.interval;
    state.desktop_notify = !args.no_notify;
    state.workspace = startup.workspace;
    state.permissions = startup.permissions;
    state.update_runs(startup.runs);

    let events = EventHandler::new(Duration::from_millis(100));
    let tx = events.sender();

    // The poller exits when this sender is dropped, so it lives until shutdown.
    let (interval_tx, interval_rx) = watch::channel(args.interval);

    let poller = Poller::new(
        api.clone(),
        args.limit,
        args.pipeline.clone(),
        tx.clone(),
        interval_rx,
    );
    let poller_handle = tokio::spawn(poller.run());

    let result = run_app(&mut terminal, &mut state, events, &tx, &api, &poller_handle).await;

    poller_handle.abort();
    drop(interval_tx);
    restore_terminal(&mut terminal)?;

    result
}

/// Visible line count of the config overlay for the current terminal size.
fn config_overlay_height(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> usize {
    let height = terminal.size().map(|s| s.height).unwrap_or_else(|e| {
        tracing::warn!("terminal size query failed: {e}");
        24
    });
    tui::config_overlay::visible_height(height)
}

fn open_in_browser(state: &mut AppState, url: &str) {
    tracing::debug!(url, "opening browser");
    if let Err(e) = platform::open_url(url) {
        state.set_error(e.to_string());
    }
}

fn desktop_notify(state: &mut AppState, body: &str, failed: bool) {
    if !state.desktop_notify {
        return;
    }
    if let Some(err) = notify::send_desktop("runw", body, failed) {
        state.set_error(err);
    }
}

/// Fetch the run list outside the poller's schedule. A manual refresh also
/// reloads the workspace and permissions.
fn spawn_refresh(state: &mut AppState, api: &Arc<dyn OrchestratorApi>, tx: &EventTx, manual: bool) {
    if manual {
        state.begin_loading();
    }
    let api = api.clone();
    let tx2 = tx.clone();
    let limit = state.config.limit;
    let pipeline = state.config.pipeline_filter.clone();
    spawn_monitored(tx.clone(), "refresh", async move {
        let event = match api.fetch_runs(limit, pipeline.as_deref()).await {
            Ok(runs) => AppEvent::PollResult { runs, manual },
            Err(e) if manual => AppEvent::RefreshFailed(e.to_string()),
            Err(e) => AppEvent::Error(e.to_string()),
        };
        if tx2.send(event).is_err() {
            tracing::warn!("refresh: channel closed");
            return;
        }
        if manual {
            poller::fetch_context(api.as_ref(), &tx2).await;
        }
    });
}

fn spawn_launch(
    api: &Arc<dyn OrchestratorApi>,
    tx: &EventTx,
    request: ReexecutionRequest,
    behavior: LaunchBehavior,
) {
    let api = api.clone();
    let sink = EventSink::new(tx.clone());
    spawn_monitored(tx.clone(), "launch", async move {
        let outcome = api
            .launch_reexecution(&request)
            .await
            .unwrap_or_else(LaunchOutcome::from);
        launch::handle_launch_result(&request.pipeline_name, &outcome, &sink, &sink, behavior);
    });
}

fn workflow_kind(action: MenuAction) -> Option<WorkflowKind> {
    match action {
        MenuAction::Terminate => Some(WorkflowKind::Terminate),
        MenuAction::Delete => Some(WorkflowKind::Delete),
        _ => None,
    }
}

fn activate_menu_item(
    state: &mut AppState,
    owner: DialogOwner,
    action: MenuAction,
    api: &Arc<dyn OrchestratorApi>,
    tx: &EventTx,
) {
    let id = match owner {
        DialogOwner::Bulk => {
            if let Some(kind) = workflow_kind(action) {
                state.open_dialog(DialogOwner::Bulk, kind);
            }
            return;
        }
        DialogOwner::Run(id) => id,
    };
    if let Some(kind) = workflow_kind(action) {
        state.open_dialog(DialogOwner::Run(id), kind);
        return;
    }
    let Some(menu) = state.run_menus.get_mut(&id) else {
        return;
    };

    match action {
        MenuAction::ViewConfiguration => {
            if let Some(yaml) = menu.config_yaml().map(str::to_string) {
                let title = format!("{} · {}", menu.run().pipeline_name, menu.run().short_id());
                state.open_config_overlay(title, &yaml);
            }
        }
        MenuAction::OpenInLaunchpad => {
            let url = menu.launchpad_target().url(&state.config.server_root);
            open_in_browser(state, &url);
        }
        MenuAction::Reexecute | MenuAction::ReexecuteFromFailure => {
            let style = if action == MenuAction::ReexecuteFromFailure {
                ReexecutionStyle::FromFailure
            } else {
                ReexecutionStyle::All
            };
            match menu.reexecute_request(style) {
                Ok(request) => {
                    tracing::debug!(parent = %request.parent_run_id, "launching re-execution");
                    spawn_launch(api, tx, request, state.config.launch_behavior);
                }
                Err(e) => state.set_error(e.to_string()),
            }
        }
        MenuAction::DownloadDebugFile => {
            let url = menu.debug_file_url(&state.config.server_root);
            open_in_browser(state, &url);
        }
        MenuAction::Terminate | MenuAction::Delete => {}
    }
}

/// Submit the visible dialog's batch in the background.
fn confirm_dialog(state: &mut AppState, api: &Arc<dyn OrchestratorApi>, tx: &EventTx) {
    let Some(owner) = state.visible_dialog.clone() else {
        return;
    };
    let Some(plan) = state
        .visible_workflow_mut()
        .and_then(ConfirmationWorkflow::begin_submit)
    else {
        return;
    };

    let api = api.clone();
    let tx2 = tx.clone();
    spawn_monitored(tx.clone(), "batch", async move {
        let progress_tx = tx2.clone();
        let progress_owner = owner.clone();
        let report = workflow::run_batch(api.as_ref(), &plan, move |done, total| {
            let event = AppEvent::BatchProgress {
                owner: progress_owner.clone(),
                done,
                total,
            };
            if progress_tx.send(event).is_err() {
                tracing::warn!("batch progress: channel closed");
            }
        })
        .await;
        if tx2.send(AppEvent::BatchFinished { owner, report }).is_err() {
            tracing::warn!("batch finished: channel closed");
        }
    });
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
    tx: &EventTx,
    api: &Arc<dyn OrchestratorApi>,
    poller_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut poll_start = Instant::now();
    let mut poller_reported = false;

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        let elapsed = poll_start.elapsed().as_secs();
        state.next_poll_in = state.poll_interval.saturating_sub(elapsed);

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            return Ok(());
        };
        match event {
            AppEvent::Key(key) => match input::map_key(key, &state.input_context()) {
                Action::Quit => state.should_quit = true,
                Action::DismissError => state.clear_error(),
                Action::MoveUp => state.move_cursor_up(),
                Action::MoveDown => state.move_cursor_down(),
                Action::Refresh => {
                    spawn_refresh(state, api, tx, true);
                    poll_start = Instant::now();
                }
                Action::OpenMenu => {
                    if let Some(id) = state.open_run_menu() {
                        if let Some(run_id) = state.run_menus.get(&id).map(|m| m.run().run_id.clone()) {
                            let api2 = api.clone();
                            let tx2 = tx.clone();
                            spawn_monitored(tx.clone(), "run_details", async move {
                                poller::fetch_run_details(api2.as_ref(), id, &run_id, &tx2).await;
                            });
                        }
                    }
                }
                Action::OpenBulkMenu => {
                    state.open_bulk_menu();
                }
                Action::ToggleSelect => state.toggle_current_selection(),
                Action::SelectAll => state.select_all(),
                Action::ClearSelection => state.clear_selection(),
                Action::OpenBrowser => {
                    if let Some(run) = state.current_run() {
                        let url = NavTarget::Run {
                            run_id: run.run_id.clone(),
                        }
                        .url(&state.config.server_root);
                        open_in_browser(state, &url);
                    }
                }
                Action::MenuUp => state.popover_move(-1),
                Action::MenuDown => state.popover_move(1),
                Action::MenuActivate => {
                    if let (Some(action), Some(owner)) = (state.popover_selection(), state.popover_owner()) {
                        state.close_popover();
                        activate_menu_item(state, owner, action, api, tx);
                    }
                }
                Action::CloseMenu => state.close_popover(),
                Action::Confirm => confirm_dialog(state, api, tx),
                Action::CancelDialog => state.close_dialog(),
                Action::ToggleForce => {
                    if let Some(wf) = state.visible_workflow_mut() {
                        wf.toggle_force();
                    }
                }
                Action::TerminateInstead => {
                    state.terminate_instead();
                }
                Action::Acknowledge => state.acknowledge_dialog(),
                Action::CloseOverlay => state.close_overlay(),
                Action::ScrollUp => state.scroll_config_up(1),
                Action::ScrollDown => {
                    let h = config_overlay_height(terminal);
                    state.scroll_config_down(1, h);
                }
                Action::PageUp => state.scroll_config_up(20),
                Action::PageDown => {
                    let h = config_overlay_height(terminal);
                    state.scroll_config_down(20, h);
                }
                Action::ScrollToTop => state.scroll_config_to_top(),
                Action::ScrollToBottom => {
                    let h = config_overlay_height(terminal);
                    state.scroll_config_to_bottom(h);
                }
                Action::CopyToClipboard => {
                    if let Some(text) = state.config_overlay_text() {
                        let tx2 = tx.clone();
                        spawn_monitored(tx.clone(), "clipboard", async move {
                            let result = platform::copy_to_clipboard(&text)
                                .await
                                .map_err(|e| e.to_string());
                            if tx2.send(AppEvent::ClipboardResult(result)).is_err() {
                                tracing::warn!("clipboard: channel closed");
                            }
                        });
                    }
                }
                Action::None => {}
            },
            AppEvent::Tick => {
                if last_tick.elapsed() >= Duration::from_millis(100) {
                    state.advance_spinner();
                    last_tick = Instant::now();
                }
                if poller_handle.is_finished() && !poller_reported {
                    poller_reported = true;
                    state.set_error(
                        "Poller stopped unexpectedly. Press r to refresh manually.".to_string(),
                    );
                }
            }
            AppEvent::PollResult { runs, manual } => {
                if manual {
                    state.end_loading();
                }
                tracing::debug!(count = runs.len(), manual, "run list updated");
                state.update_runs(runs);
                poll_start = Instant::now();
            }
            AppEvent::RefreshFailed(e) => {
                state.end_loading();
                state.set_error(e);
            }
            AppEvent::WorkspaceLoaded(workspace) => {
                state.workspace = workspace;
                for menu in state.run_menus.values_mut() {
                    menu.rematch(&state.workspace);
                }
            }
            AppEvent::PermissionsLoaded(permissions) => state.permissions = permissions,
            AppEvent::RunDetailsLoaded { id, result } => {
                if let Some(menu) = state.run_menus.get_mut(&id) {
                    menu.config_loaded(result, &state.workspace);
                }
            }
            AppEvent::Navigate(target) => {
                let url = target.url(&state.config.server_root);
                if let NavTarget::Run { run_id } = &target {
                    state.focus_run = Some(run_id.clone());
                    let message = format!("Launched run {run_id}");
                    desktop_notify(state, &message, false);
                    state.add_notification(message);
                    spawn_refresh(state, api, tx, false);
                }
                open_in_browser(state, &url);
            }
            AppEvent::Alert { title, body } => {
                state.close_popover();
                state.open_alert(title, body);
            }
            AppEvent::Toast(message) => {
                desktop_notify(state, &message, false);
                state.add_notification(message);
                spawn_refresh(state, api, tx, false);
            }
            AppEvent::BatchProgress { owner, done, .. } => state.batch_progress(&owner, done),
            AppEvent::BatchFinished { owner, report } => {
                let notify_body = (!report.is_transport_failure())
                    .then(|| (app::summarize(&report), report.failure_count() > 0));
                if state.batch_finished(&owner, report) {
                    spawn_refresh(state, api, tx, false);
                }
                if let Some((body, failed)) = notify_body {
                    desktop_notify(state, &body, failed);
                }
            }
            AppEvent::ClipboardResult(Ok(())) => {
                state.add_notification("Copied to clipboard".to_string());
            }
            AppEvent::ClipboardResult(Err(e)) => state.set_error(e),
            AppEvent::Error(e) => state.set_error(e),
        }

        if state.should_quit {
            events.stop();
            return Ok(());
        }
    }
}
