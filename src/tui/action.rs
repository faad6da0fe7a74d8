use crate::cache::FetchTicket;
use crate::error::ApiError;
use crate::model::{Settings, Task, TaskFields};
use crate::push::PushEvent;

/// Requests from the UI loop to the network task.
#[derive(Debug)]
pub enum Action {
    Refresh(FetchTicket),
    CreateTask(TaskFields),
    UpdateTask(String, TaskFields),
    CompleteTask(String),
    DeleteTask(String),
    Sync,
    LoadSettings,
    SaveSettings(Settings),
    AskAi {
        prompt: String,
        context: String,
        loading_id: String,
    },
    Quit,
}

#[derive(Debug)]
pub enum AppEvent {
    TasksFetched(FetchTicket, Result<Vec<Task>, ApiError>),
    /// A write went through; the board needs a fresh fetch.
    Changed(String),
    /// Create or update accepted. Drops the form kept for a retry.
    Saved(String),
    /// Create or update rejected. The submitted form comes back with this
    /// message.
    SaveFailed(String),
    /// A write failed. Shown as a popup.
    Failed(String),
    /// Sync endpoint answered (or not); refetch either way.
    Synced(Result<String, ApiError>),
    SettingsLoaded(Settings),
    SettingsSaved(String),
    AiReplied {
        loading_id: String,
        result: Result<String, ApiError>,
    },
    Push(PushEvent),
    Status(String),
}
