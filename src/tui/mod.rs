// File: src/tui/mod.rs
pub mod action;
pub mod handlers;
pub mod state;
pub mod view;

use crate::client::ApiClient;
use crate::config::Config;
use crate::logging;
use crate::model::TaskStatus;
use crate::paths::AppPaths;
use crate::prefs::Preferences;
use crate::push;
use crate::session::ClientSession;

use action::{Action, AppEvent};
use state::AppState;
use view::draw;

use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    env, io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

const IDLE_POLL: Duration = Duration::from_millis(50);

fn print_help() {
    println!("Usage: duedeck [OPTIONS]");
    println!();
    println!("Terminal board, calendar and AI chat for the deadline tracker backend.");
    println!();
    println!("Options:");
    println!("  -h, --help    Print this help");
    println!();
    match Config::get_path_string() {
        Ok(path) => println!("Config file: {}", path),
        Err(_) => println!("Config file: [Could not determine config path]"),
    }
    println!("Log level:   set {}=debug for verbose logs", logging::LOG_ENV);
}

pub async fn run() -> Result<()> {
    // --- 1. PREAMBLE & CONFIG ---
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_help();
        return Ok(());
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        use std::io::Write;
        let path = AppPaths::get_panic_log_path()
            .unwrap_or_else(|| std::path::PathBuf::from("duedeck_panic.log"));
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            let _ = writeln!(file, "PANIC: {:?}", info);
        }
        default_hook(info);
    }));

    if let Err(e) = logging::init_file_logging() {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            let path_str = Config::get_path_string()
                .unwrap_or_else(|_| "[Could not determine config path]".to_string());
            eprintln!("Could not read the configuration: {:#}", e);
            eprintln!("Please fix or remove the file at:");
            eprintln!("  {}", path_str);
            return Ok(());
        }
    };

    let client = match ApiClient::new(&config.api_url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid api_url in config: {}", e);
            return Ok(());
        }
    };
    let prefs = Preferences::load();
    tracing::info!(api = client.base_url(), push = config.enable_push, "starting");

    // --- 2. TERMINAL SETUP ---
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // --- 3. STATE INIT ---
    let session = ClientSession::new(prefs.theme, config.reveal_chunk_chars, Utc::now());
    let mut app_state = AppState::new(session, config.confirm_delete);

    let (action_tx, action_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::channel(32);

    // --- NETWORK TASK ---
    tokio::spawn(network_loop(client, action_rx, event_tx.clone()));

    // --- PUSH TASK ---
    if config.enable_push {
        let (push_tx, mut push_rx) = mpsc::channel(16);
        tokio::spawn(push::listen(config.effective_push_url(), push_tx));
        let push_events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = push_rx.recv().await {
                if push_events.send(AppEvent::Push(event)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(event_tx);

    let _ = action_tx
        .send(Action::Refresh(app_state.session.begin_fetch()))
        .await;

    // --- 4. UI LOOP ---
    let reveal_interval = config.reveal_interval();
    let mut last_reveal = Instant::now();
    loop {
        terminal.draw(|f| draw(f, &mut app_state))?;

        let mut pending = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            if let Some(action) = handlers::handle_app_event(&mut app_state, event) {
                pending.push(action);
            }
        }

        let streaming = app_state.session.chat().is_streaming();
        if streaming && last_reveal.elapsed() >= reveal_interval {
            app_state.session.chat_mut().tick();
            last_reveal = Instant::now();
        }

        let now = Utc::now();
        if app_state.session.deadline_crossed(now) {
            tracing::debug!("deadline passed, re-rendering board");
            app_state.session.rerender(now);
        }

        let timeout = if streaming { reveal_interval } else { IDLE_POLL };
        if event::poll(timeout)? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handlers::handle_key_event(key, &mut app_state)
                }
                Event::Mouse(mouse) => handlers::handle_mouse_event(mouse, &mut app_state),
                _ => None,
            };
            pending.extend(action);
        }

        let mut quit = false;
        for action in pending {
            quit |= matches!(action, Action::Quit);
            let _ = action_tx.send(action).await;
        }
        if quit {
            break;
        }
    }

    // --- 5. CLEANUP ---
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    tracing::info!("bye");
    Ok(())
}

fn saved_message(msg: String, fallback: &str) -> String {
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}

/// Runs actions in the order they were issued. AI questions are the one
/// exception: they can take a long time, so each gets its own task.
async fn network_loop(
    client: ApiClient,
    mut action_rx: mpsc::Receiver<Action>,
    event_tx: mpsc::Sender<AppEvent>,
) {
    while let Some(action) = action_rx.recv().await {
        let event = match action {
            Action::Quit => break,

            Action::Refresh(ticket) => {
                let result = client.list_tasks().await;
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "refresh failed");
                }
                AppEvent::TasksFetched(ticket, result)
            }

            Action::CreateTask(fields) => match client.create_task(&fields).await {
                Ok(msg) => AppEvent::Saved(saved_message(msg, "Task created.")),
                Err(e) => AppEvent::SaveFailed(e.to_string()),
            },

            Action::UpdateTask(id, fields) => match client.update_task(&id, &fields).await {
                Ok(msg) => AppEvent::Saved(saved_message(msg, "Task updated.")),
                Err(e) => AppEvent::SaveFailed(e.to_string()),
            },

            Action::CompleteTask(id) => {
                match client.patch_status(&id, &TaskStatus::Completed).await {
                    Ok(()) => AppEvent::Changed("Task completed.".to_string()),
                    Err(e) => AppEvent::Failed(format!("Could not complete task: {}", e)),
                }
            }

            Action::DeleteTask(id) => match client.delete_task(&id).await {
                Ok(()) => AppEvent::Changed("Task deleted.".to_string()),
                Err(e) => AppEvent::Failed(format!("Could not delete task: {}", e)),
            },

            Action::Sync => {
                let _ = event_tx
                    .send(AppEvent::Status("Syncing...".to_string()))
                    .await;
                AppEvent::Synced(client.sync().await)
            }

            Action::LoadSettings => match client.get_settings().await {
                Ok(settings) => AppEvent::SettingsLoaded(settings),
                Err(e) => AppEvent::Failed(format!("Could not load settings: {}", e)),
            },

            Action::SaveSettings(settings) => match client.save_settings(&settings).await {
                Ok(msg) => AppEvent::SettingsSaved(msg),
                Err(e) => AppEvent::Failed(format!("Could not save settings: {}", e)),
            },

            Action::AskAi {
                prompt,
                context,
                loading_id,
            } => {
                let client = client.clone();
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let result = client.ask_ai(&prompt, &context).await;
                    let _ = event_tx
                        .send(AppEvent::AiReplied { loading_id, result })
                        .await;
                });
                continue;
            }
        };
        if event_tx.send(event).await.is_err() {
            break;
        }
    }
    tracing::debug!("network loop stopped");
}
