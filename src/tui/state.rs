use crate::board::{BoardState, Bucket, CardView};
use crate::chat;
use crate::model::{Settings, Task, TaskFields};
use crate::session::ClientSession;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};

const COPIED_FEEDBACK: Duration = Duration::from_secs(2);

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Page {
    Board,
    Calendar,
    AskAi,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Board, Page::Calendar, Page::AskAi];

    pub fn title(self) -> &'static str {
        match self {
            Page::Board => "Board",
            Page::Calendar => "Calendar",
            Page::AskAi => "Ask AI",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Page::Board => Page::Calendar,
            Page::Calendar => Page::AskAi,
            Page::AskAi => Page::Board,
        }
    }
}

/// One line of editable text. The cursor counts characters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputField {
    pub buffer: String,
    pub cursor_position: usize,
}

impl InputField {
    pub fn with_text(text: &str) -> Self {
        Self {
            buffer: text.to_string(),
            cursor_position: text.chars().count(),
        }
    }

    pub fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.cursor_position.saturating_sub(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_left);
    }

    pub fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.cursor_position.saturating_add(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_right);
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    pub fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.buffer.insert(index, new_char);
        self.move_cursor_right();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position != 0 {
            let current_index = self.cursor_position;
            let before = self.buffer.chars().take(current_index - 1);
            let after = self.buffer.chars().skip(current_index);
            self.buffer = before.chain(after).collect();
            self.move_cursor_left();
        }
    }

    pub fn set(&mut self, text: &str) {
        *self = Self::with_text(text);
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor_position = 0;
    }

    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.buffer.chars().count())
    }
}

/// Add/edit form: subject, description, deadline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub fields: [InputField; 3],
    pub focus: usize,
    pub error: Option<String>,
}

impl TaskForm {
    pub const LABELS: [&'static str; 3] = ["Subject", "Description", "Deadline"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_task(task: &Task) -> Self {
        let fields = task.to_fields();
        Self {
            fields: [
                InputField::with_text(&fields.title),
                InputField::with_text(&fields.description),
                InputField::with_text(&fields.deadline),
            ],
            focus: 0,
            error: None,
        }
    }

    pub fn focused_mut(&mut self) -> &mut InputField {
        &mut self.fields[self.focus]
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn previous_field(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn is_last_field(&self) -> bool {
        self.focus == self.fields.len() - 1
    }

    pub fn to_fields(&self) -> TaskFields {
        TaskFields::new(
            &self.fields[0].buffer,
            &self.fields[1].buffer,
            &self.fields[2].buffer,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub fields: [InputField; 2],
    pub focus: usize,
    pub loading: bool,
}

impl SettingsForm {
    pub const LABELS: [&'static str; 2] = ["Telegram bot token", "Telegram chat id"];

    pub fn new() -> Self {
        Self {
            fields: Default::default(),
            focus: 0,
            loading: true,
        }
    }

    pub fn fill(&mut self, settings: &Settings) {
        self.fields[0].set(&settings.telegram_token);
        self.fields[1].set(&settings.telegram_id);
        self.loading = false;
    }

    pub fn to_settings(&self) -> Settings {
        Settings {
            telegram_token: self.fields[0].buffer.trim().to_string(),
            telegram_id: self.fields[1].buffer.trim().to_string(),
        }
    }
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum Modal {
    AddTask(TaskForm),
    ViewTask(String),
    EditTask(String, TaskForm),
    ConfirmDelete(String),
    Settings(SettingsForm),
    SelectTask(ListState),
    Alert(String),
}

/// Clickable regions recorded by the last draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    Card { bucket: Bucket, index: usize },
    AddButton,
    CopyButton { message: usize, block: usize },
    Tab(Page),
    Suggestion(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub area: Rect,
    /// Area inside the border, which is what card hit-testing is relative to.
    pub inner: Rect,
    pub target: HitTarget,
}

impl Hitbox {
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.area.x
            && x < self.area.x.saturating_add(self.area.width)
            && y >= self.area.y
            && y < self.area.y.saturating_add(self.area.height)
    }
}

pub struct AppState {
    // Data
    pub session: ClientSession,

    // UI State
    pub page: Page,
    pub modal: Option<Modal>,
    pub focus_bucket: Bucket,
    pub selected: [usize; 2],
    pub ai_input: InputField,
    pub message: String,
    pub loading: bool,
    pub push_connected: bool,
    pub confirm_delete: bool,

    pub hitboxes: Vec<Hitbox>,
    pub copied: Option<(usize, usize, Instant)>,
    /// Last submitted add/edit form (with the edited id), held until the
    /// server answers.
    pub pending_form: Option<(Option<String>, TaskForm)>,
}

impl AppState {
    pub fn new(session: ClientSession, confirm_delete: bool) -> Self {
        Self {
            session,
            page: Page::Board,
            modal: None,
            focus_bucket: Bucket::Upcoming,
            selected: [0, 0],
            ai_input: InputField::default(),
            message: "Loading...".to_string(),
            loading: true,
            push_connected: false,
            confirm_delete,
            hitboxes: Vec::new(),
            copied: None,
            pending_form: None,
        }
    }

    fn column_len(&self, bucket: Bucket) -> usize {
        match self.session.board() {
            BoardState::Ready(view) => view.column(bucket).cards.len(),
            _ => 0,
        }
    }

    pub fn selected_index(&self, bucket: Bucket) -> usize {
        self.selected[bucket.index()]
    }

    pub fn selected_card(&self) -> Option<&CardView> {
        match self.session.board() {
            BoardState::Ready(view) => view
                .column(self.focus_bucket)
                .cards
                .get(self.selected_index(self.focus_bucket)),
            _ => None,
        }
    }

    pub fn card_at(&self, bucket: Bucket, index: usize) -> Option<&CardView> {
        match self.session.board() {
            BoardState::Ready(view) => view.column(bucket).cards.get(index),
            _ => None,
        }
    }

    // --- NAVIGATION ---
    pub fn next(&mut self) {
        let len = self.column_len(self.focus_bucket);
        if len == 0 {
            return;
        }
        let slot = &mut self.selected[self.focus_bucket.index()];
        *slot = if *slot >= len - 1 { 0 } else { *slot + 1 };
    }

    pub fn previous(&mut self) {
        let len = self.column_len(self.focus_bucket);
        if len == 0 {
            return;
        }
        let slot = &mut self.selected[self.focus_bucket.index()];
        *slot = if *slot == 0 { len - 1 } else { *slot - 1 };
    }

    pub fn toggle_column(&mut self) {
        self.focus_bucket = match self.focus_bucket {
            Bucket::Upcoming => Bucket::Completed,
            Bucket::Completed => Bucket::Upcoming,
        };
    }

    pub fn select_card(&mut self, bucket: Bucket, index: usize) {
        self.focus_bucket = bucket;
        self.selected[bucket.index()] = index;
    }

    /// Keeps selections inside their columns after the board was rebuilt.
    pub fn clamp_selection(&mut self) {
        for bucket in Bucket::ALL {
            let len = self.column_len(bucket);
            let slot = &mut self.selected[bucket.index()];
            *slot = (*slot).min(len.saturating_sub(1));
        }
    }

    /// Switching pages; leaving the AI page forgets the selected task.
    pub fn open_page(&mut self, page: Page) {
        if self.page == Page::AskAi && page != Page::AskAi {
            self.session.clear_ai_selection();
        }
        self.page = page;
    }

    pub fn show_alert(&mut self, text: impl Into<String>) {
        self.modal = Some(Modal::Alert(text.into()));
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<Hitbox> {
        // Later boxes were drawn on top.
        self.hitboxes.iter().rev().find(|h| h.contains(x, y)).copied()
    }

    pub fn mark_copied(&mut self, message: usize, block: usize) {
        self.copied = Some((message, block, Instant::now()));
    }

    pub fn is_copied(&self, message: usize, block: usize) -> bool {
        matches!(self.copied, Some((m, b, at)) if m == message && b == block && at.elapsed() < COPIED_FEEDBACK)
    }

    /// Ids of the tasks the AI selector lists, in display order.
    pub fn selector_ids(&self) -> Vec<String> {
        chat::selectable_tasks(self.session.tasks())
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;
    use crate::prefs::Theme;
    use chrono::Utc;

    fn state_with(tasks: Vec<Task>) -> AppState {
        let mut session = ClientSession::new(Theme::Light, 3, Utc::now());
        session.apply_push(tasks, Utc::now());
        AppState::new(session, true)
    }

    fn dummy_task(id: &str) -> Task {
        let mut t = Task::new(id, "test", TaskStatus::Pending);
        t.deadline_timestamp = i64::MAX / 2;
        t
    }

    #[test]
    fn test_navigation_next_wraps() {
        let mut state = state_with(vec![dummy_task("1"), dummy_task("2"), dummy_task("3")]);

        state.next(); // 1
        assert_eq!(state.selected_index(Bucket::Upcoming), 1);
        state.next(); // 2
        state.next(); // Wrap to 0
        assert_eq!(state.selected_index(Bucket::Upcoming), 0);

        state.previous(); // Wrap to last
        assert_eq!(state.selected_card().unwrap().id, "3");
    }

    #[test]
    fn test_navigation_empty_column_safety() {
        let mut state = state_with(vec![dummy_task("1")]);
        state.toggle_column();
        state.next();
        state.previous();
        assert!(state.selected_card().is_none());
    }

    #[test]
    fn test_selection_clamped_after_shrink() {
        let mut state = state_with(vec![dummy_task("1"), dummy_task("2"), dummy_task("3")]);
        state.select_card(Bucket::Upcoming, 2);
        state.session.apply_push(vec![dummy_task("1")], Utc::now());
        state.clamp_selection();
        assert_eq!(state.selected_card().unwrap().id, "1");
    }

    #[test]
    fn test_leaving_ai_page_clears_selection() {
        let mut state = state_with(vec![dummy_task("1")]);
        state.open_page(Page::AskAi);
        assert!(state.session.select_for_ai("1"));
        state.open_page(Page::AskAi);
        assert!(state.session.ai_selection().is_some());
        state.open_page(Page::Calendar);
        assert!(state.session.ai_selection().is_none());
    }

    #[test]
    fn test_cursor_clamping() {
        let mut input = InputField::with_text("abc");
        input.cursor_position = 0;

        input.move_cursor_right();
        input.move_cursor_right();
        input.move_cursor_right();
        input.move_cursor_right(); // Should stay 3
        assert_eq!(input.cursor_position, 3);

        for _ in 0..4 {
            input.move_cursor_left();
        }
        assert_eq!(input.cursor_position, 0);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = InputField::default();
        for c in "día".chars() {
            input.enter_char(c);
        }
        input.move_cursor_left();
        input.enter_char('x');
        assert_eq!(input.buffer, "díxa");
        input.delete_char();
        input.delete_char();
        assert_eq!(input.buffer, "da");
    }

    #[test]
    fn test_form_round_trip() {
        let mut t = dummy_task("9");
        t.title = "Physics".into();
        t.description = "Lab report".into();
        t.deadline_display = "Friday 17:00".into();
        let mut form = TaskForm::from_task(&t);
        assert_eq!(form.to_fields(), TaskFields::new("Physics", "Lab report", "Friday 17:00"));
        form.previous_field();
        assert!(form.is_last_field());
    }
}
