// File: src/session.rs
use crate::board::{self, BoardState, LOAD_FAILED_MESSAGE};
use crate::cache::{FetchTicket, TaskCache};
use crate::calendar::CalendarHost;
use crate::chat::{self, ChatLog};
use crate::error::ApiError;
use crate::model::Task;
use crate::prefs::Theme;
use chrono::{DateTime, Local, NaiveDate, Utc};

fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Everything one client window knows. All view state is derived from the
/// task cache; only the cache is ever replaced by network results.
#[derive(Debug)]
pub struct ClientSession {
    cache: TaskCache,
    board: BoardState,
    calendar: CalendarHost,
    chat: ChatLog,
    ai_selection: Option<String>,
    theme: Theme,
}

impl ClientSession {
    pub fn new(theme: Theme, reveal_chunk: usize, now: DateTime<Utc>) -> Self {
        Self {
            cache: TaskCache::new(),
            board: BoardState::Loading,
            calendar: CalendarHost::new(local_day(now), theme),
            chat: ChatLog::new(reveal_chunk),
            ai_selection: None,
            theme,
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.cache.begin_fetch()
    }

    /// Applies a fetch result unless a newer one already landed. Returns
    /// whether anything was applied.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Task>, ApiError>,
        now: DateTime<Utc>,
    ) -> bool {
        match result {
            Ok(tasks) => {
                if !self.cache.replace(ticket, tasks) {
                    return false;
                }
                self.redraw(now);
                true
            }
            Err(e) => {
                if !self.cache.consume(ticket) {
                    return false;
                }
                tracing::error!(error = %e, "task fetch failed");
                self.board = BoardState::Failed(LOAD_FAILED_MESSAGE.to_string());
                true
            }
        }
    }

    /// A pushed list is the freshest thing there is: it takes its own ticket
    /// so every fetch issued before it becomes stale.
    pub fn apply_push(&mut self, tasks: Vec<Task>, now: DateTime<Utc>) {
        let ticket = self.cache.begin_fetch();
        if self.cache.replace(ticket, tasks) {
            self.redraw(now);
        }
    }

    /// Rebuilds board and calendar from the cache and drops a stale AI
    /// selection.
    fn redraw(&mut self, now: DateTime<Utc>) {
        let tasks = self.cache.tasks();
        self.board = BoardState::Ready(board::render_board(&board::partition(tasks), now));
        self.calendar.render(tasks, local_day(now));

        if let Some(id) = &self.ai_selection
            && !chat::selectable_tasks(tasks).iter().any(|t| &t.id == id)
        {
            tracing::debug!(task = %id, "AI selection no longer available");
            self.ai_selection = None;
        }
    }

    /// Re-renders from the cache without fetching (e.g. once a deadline
    /// passes). A failed board stays failed.
    pub fn rerender(&mut self, now: DateTime<Utc>) {
        if matches!(self.board, BoardState::Ready(_)) {
            self.redraw(now);
        }
    }

    /// True once some open task's deadline fell between the last render and
    /// `now`.
    pub fn deadline_crossed(&self, now: DateTime<Utc>) -> bool {
        let BoardState::Ready(view) = &self.board else {
            return false;
        };
        let from = view.rendered_at.timestamp();
        let to = now.timestamp();
        self.cache
            .tasks()
            .iter()
            .any(|t| !t.status.is_done() && t.deadline_timestamp > from && t.deadline_timestamp <= to)
    }

    pub fn set_theme(&mut self, theme: Theme, now: DateTime<Utc>) {
        if theme == self.theme {
            return;
        }
        self.theme = theme;
        self.calendar.set_theme(theme, local_day(now));
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn tasks(&self) -> &[Task] {
        self.cache.tasks()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.cache.get(id)
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn calendar(&self) -> &CalendarHost {
        &self.calendar
    }

    pub fn calendar_mut(&mut self) -> &mut CalendarHost {
        &mut self.calendar
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatLog {
        &mut self.chat
    }

    /// Selects a task as AI context. Only open tasks can be picked.
    pub fn select_for_ai(&mut self, id: &str) -> bool {
        let ok = chat::selectable_tasks(self.cache.tasks())
            .iter()
            .any(|t| t.id == id);
        if ok {
            self.ai_selection = Some(id.to_string());
        }
        ok
    }

    pub fn clear_ai_selection(&mut self) {
        self.ai_selection = None;
    }

    pub fn ai_selection(&self) -> Option<&Task> {
        self.ai_selection.as_deref().and_then(|id| self.cache.get(id))
    }

    pub fn ai_context(&self) -> String {
        chat::build_context(self.ai_selection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Bucket;
    use crate::model::TaskStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(id, &format!("Task {}", id), status);
        t.deadline_timestamp = now().timestamp() + 3600;
        t.deadline_date = Some("2024-03-05".into());
        t
    }

    fn ready(session: &ClientSession) -> &crate::board::BoardView {
        match session.board() {
            BoardState::Ready(view) => view,
            other => panic!("board not ready: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_failure_shows_message() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        let t = s.begin_fetch();
        assert!(s.apply_fetch(t, Err(ApiError::Transport("refused".into())), now()));
        assert_eq!(*s.board(), BoardState::Failed(LOAD_FAILED_MESSAGE.into()));
    }

    #[test]
    fn test_push_supersedes_pending_fetch() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        let pending = s.begin_fetch();
        s.apply_push(vec![task("1", TaskStatus::Completed)], now());
        assert!(!s.apply_fetch(pending, Ok(vec![task("1", TaskStatus::Pending)]), now()));
        assert_eq!(ready(&s).column(Bucket::Completed).count, 1);
    }

    #[test]
    fn test_selection_dropped_when_task_completes() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        s.apply_push(vec![task("1", TaskStatus::Pending)], now());
        assert!(s.select_for_ai("1"));
        assert!(s.ai_context().starts_with("Subject: Task 1"));

        s.apply_push(vec![task("1", TaskStatus::Completed)], now());
        assert!(s.ai_selection().is_none());
        assert_eq!(s.ai_context(), "");
        assert!(!s.select_for_ai("1"));
    }

    #[test]
    fn test_unknown_status_is_not_ai_context() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        s.apply_push(vec![task("1", TaskStatus::Other("archived".into()))], now());
        assert_eq!(ready(&s).column(Bucket::Upcoming).count, 1);
        assert!(!s.select_for_ai("1"));
        assert_eq!(s.ai_context(), "");
    }

    #[test]
    fn test_deadline_crossing_triggers_rerender() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        s.apply_push(vec![task("1", TaskStatus::Pending)], now());
        assert!(!ready(&s).column(Bucket::Upcoming).cards[0].overdue);

        let later = now() + chrono::Duration::hours(2);
        assert!(s.deadline_crossed(later));
        s.rerender(later);
        assert!(ready(&s).column(Bucket::Upcoming).cards[0].overdue);
        assert!(!s.deadline_crossed(later));
    }

    #[test]
    fn test_theme_only_rebuilds_calendar() {
        let mut s = ClientSession::new(Theme::Light, 3, now());
        s.apply_push(vec![task("1", TaskStatus::Pending)], now());
        let board_before = ready(&s).clone();
        let built = s.calendar().built_count();

        s.set_theme(Theme::Dark, now());
        assert_eq!(s.calendar().built_count(), built + 1);
        assert_eq!(*ready(&s), board_before);
        s.set_theme(Theme::Dark, now());
        assert_eq!(s.calendar().built_count(), built + 1);
    }
}
