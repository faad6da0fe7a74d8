// File: src/chat.rs
use crate::error::ApiError;
use crate::model::Task;
use crate::stream::{LOADING_ID_PREFIX, MessageContent};

pub const LOADING_TEXT: &str = "Thinking...";
pub const TRANSPORT_FAILURE_TEXT: &str = "Failed to reach the AI server.";
pub const GREETING: &str = "Hi! Pick a task and ask me anything about it.";

/// Canned prompts offered while a task is selected: (chip label, prompt).
pub const SUGGESTIONS: [(&str, &str); 4] = [
    ("Explain", "Explain what this task is asking me to do."),
    ("Plan", "Make me a study plan so I finish this before the deadline."),
    ("Steps", "Break this task down into small concrete steps."),
    ("Resources", "What references or resources should I look at for this task?"),
];

const LABEL_DESCRIPTION_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub sender: Sender,
    pub id: String,
    pub content: MessageContent,
}

/// The chat transcript. Lives for the whole session and is never persisted.
#[derive(Debug)]
pub struct ChatLog {
    messages: Vec<Message>,
    chunk: usize,
    next_id: u64,
    /// Rows scrolled up from the bottom; 0 means pinned to the newest line.
    scroll_back: u16,
}

impl ChatLog {
    pub fn new(chunk: usize) -> Self {
        let mut log = Self {
            messages: Vec::new(),
            chunk,
            next_id: 0,
            scroll_back: 0,
        };
        let id = log.fresh_id();
        log.push(Sender::Ai, id, MessageContent::plain(GREETING));
        log
    }

    fn fresh_id(&mut self) -> String {
        let id = format!("msg-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, sender: Sender, id: String, content: MessageContent) {
        self.messages.push(Message {
            sender,
            id,
            content,
        });
        self.scroll_to_bottom();
    }

    pub fn push_user(&mut self, text: &str) {
        let id = self.fresh_id();
        self.push(Sender::User, id, MessageContent::plain(text));
    }

    /// Appends an AI reply, starting its reveal unless it is plain.
    pub fn push_ai(&mut self, text: &str) {
        let id = self.fresh_id();
        let content = MessageContent::for_reply(text, Some(&id), self.chunk);
        self.push(Sender::Ai, id, content);
    }

    /// Appends the placeholder shown while waiting and returns its id.
    pub fn push_loading(&mut self) -> String {
        let id = format!("{}-{}", LOADING_ID_PREFIX, uuid::Uuid::new_v4());
        let content = MessageContent::for_reply(LOADING_TEXT, Some(&id), self.chunk);
        self.push(Sender::Ai, id.clone(), content);
        id
    }

    /// Removes a loading placeholder. The rest of the log is append-only.
    pub fn remove(&mut self, id: &str) -> bool {
        if !id.starts_with(LOADING_ID_PREFIX) {
            return false;
        }
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Swaps a loading placeholder for the outcome of the request.
    pub fn resolve(&mut self, loading_id: &str, outcome: Result<String, ApiError>) {
        if !self.remove(loading_id) {
            tracing::debug!(loading_id, "placeholder already gone");
        }
        self.push_ai(&reply_text(outcome));
    }

    /// Advances every active reveal by one chunk. Returns whether anything
    /// changed; a change pins the view to the bottom again.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        for message in &mut self.messages {
            changed |= message.content.advance();
        }
        if changed {
            self.scroll_to_bottom();
        }
        changed
    }

    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|m| m.content.is_streaming())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    /// Code of the newest finished code block, for the copy shortcut.
    pub fn latest_code_block(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .flat_map(|m| m.content.code_blocks().iter().rev())
            .map(|b| b.content.as_str())
            .next()
    }
}

/// Message shown for a finished AI request.
pub fn reply_text(outcome: Result<String, ApiError>) -> String {
    match outcome {
        Ok(answer) => answer,
        Err(e) if e.is_transport() => TRANSPORT_FAILURE_TEXT.to_string(),
        Err(e) => format!("Error: {}", e),
    }
}

/// Tasks the AI selector offers: pending and notified only.
pub fn selectable_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status.is_upcoming()).collect()
}

pub fn selector_label(task: &Task) -> String {
    let mut short: String = task.description.chars().take(LABEL_DESCRIPTION_CHARS).collect();
    if task.description.chars().count() > LABEL_DESCRIPTION_CHARS {
        short.push_str("...");
    }
    format!("{} - {}", task.title, short)
}

/// Context string sent along with every prompt.
pub fn build_context(selected: Option<&Task>) -> String {
    match selected {
        Some(task) => format!(
            "Subject: {}\nDescription: {}\nDeadline: {}",
            task.title, task.description, task.deadline_display
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    #[test]
    fn test_loading_placeholder_lifecycle() {
        let mut log = ChatLog::new(3);
        log.push_user("What is due?");
        let loading = log.push_loading();
        assert!(loading.starts_with("loading"));
        assert!(!log.is_streaming());

        log.resolve(&loading, Ok("**Nothing** today".into()));
        assert!(log.messages().iter().all(|m| m.id != loading));
        assert!(log.is_streaming());

        while log.tick() {}
        let last = log.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.content.rich().lines[0].text(), "Nothing today");
    }

    #[test]
    fn test_failures_are_plain_messages() {
        let mut log = ChatLog::new(3);
        let loading = log.push_loading();
        log.resolve(
            &loading,
            Err(ApiError::Application {
                status: 500,
                message: "model overloaded".into(),
            }),
        );
        let last = log.messages().last().unwrap();
        assert!(matches!(&last.content, MessageContent::Plain(t) if t == "Error: model overloaded"));

        let loading = log.push_loading();
        log.resolve(&loading, Err(ApiError::Transport("refused".into())));
        let last = log.messages().last().unwrap();
        assert!(matches!(&last.content, MessageContent::Plain(t) if t == TRANSPORT_FAILURE_TEXT));
    }

    #[test]
    fn test_ticks_pin_scroll_to_bottom() {
        let mut log = ChatLog::new(3);
        log.push_ai("a longer answer");
        log.scroll_up(5);
        assert_eq!(log.scroll_back(), 5);
        assert!(log.tick());
        assert_eq!(log.scroll_back(), 0);
    }

    #[test]
    fn test_selector_label_truncation() {
        let mut t = Task::new("1", "Algorithms", TaskStatus::Pending);
        t.description = "short".into();
        assert_eq!(selector_label(&t), "Algorithms - short");
        t.description = "a".repeat(31);
        assert_eq!(selector_label(&t), format!("Algorithms - {}...", "a".repeat(30)));
    }

    #[test]
    fn test_context_string() {
        let mut t = Task::new("1", "Algorithms", TaskStatus::Pending);
        t.description = "Problem set 3".into();
        t.deadline_display = "Tue, 05 Mar 2024 17:00".into();
        assert_eq!(
            build_context(Some(&t)),
            "Subject: Algorithms\nDescription: Problem set 3\nDeadline: Tue, 05 Mar 2024 17:00"
        );
        assert_eq!(build_context(None), "");
    }

    #[test]
    fn test_selector_lists_upcoming_only() {
        let tasks = vec![
            Task::new("1", "a", TaskStatus::Pending),
            Task::new("2", "b", TaskStatus::Completed),
            Task::new("3", "c", TaskStatus::Notified),
            Task::new("4", "d", TaskStatus::Other("archived".into())),
        ];
        let ids: Vec<&str> = selectable_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_latest_code_block() {
        let mut log = ChatLog::new(50);
        log.push_ai("```\nfirst\n```");
        log.push_ai("```\nsecond\n```");
        assert!(log.latest_code_block().is_none());
        while log.tick() {}
        assert_eq!(log.latest_code_block(), Some("second"));
    }
}
