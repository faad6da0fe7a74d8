// File: src/board.rs
//! Kanban board: partitioning the cache into columns and building the card
//! view model the front-end draws.
use crate::model::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Upcoming,
    Completed,
}

impl Bucket {
    /// Column order on screen.
    pub const ALL: [Bucket; 2] = [Bucket::Upcoming, Bucket::Completed];

    /// Unknown statuses land in `Upcoming` so no task is ever dropped.
    pub fn for_status(status: &TaskStatus) -> Self {
        match status {
            TaskStatus::Completed => Bucket::Completed,
            TaskStatus::Pending | TaskStatus::Notified | TaskStatus::Other(_) => Bucket::Upcoming,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Bucket::Upcoming => "Upcoming Tasks",
            Bucket::Completed => "Completed",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Bucket::Upcoming => 0,
            Bucket::Completed => 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct Partition<'a> {
    upcoming: Vec<&'a Task>,
    completed: Vec<&'a Task>,
}

impl<'a> Partition<'a> {
    pub fn bucket(&self, bucket: Bucket) -> &[&'a Task] {
        match bucket {
            Bucket::Upcoming => &self.upcoming,
            Bucket::Completed => &self.completed,
        }
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.bucket(bucket).len()
    }
}

/// Groups tasks by bucket, keeping cache order inside each bucket.
pub fn partition(tasks: &[Task]) -> Partition<'_> {
    let mut p = Partition::default();
    for task in tasks {
        match Bucket::for_status(&task.status) {
            Bucket::Upcoming => p.upcoming.push(task),
            Bucket::Completed => p.completed.push(task),
        }
    }
    p
}

// --- VIEW MODEL ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTag(pub u8, pub u8, pub u8);

impl ColorTag {
    /// Purely decorative; a new one is drawn on every render.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        ColorTag(rng.r#gen(), rng.r#gen(), rng.r#gen())
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Complete,
    Delete,
}

impl CardAction {
    pub fn label(self) -> &'static str {
        match self {
            CardAction::Complete => "[✓]",
            CardAction::Delete => "[✗]",
        }
    }

    /// Terminal cells the label occupies.
    pub fn width(self) -> u16 {
        3
    }
}

/// Where a pointer landed on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTarget {
    Action(CardAction),
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Complete(String),
    Delete(String),
    OpenDetail(String),
    AddTask,
}

pub const OVERDUE_NOTICE: &str = "⚠ Deadline has passed!";

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub deadline: String,
    pub overdue: bool,
    /// Drawn struck through and dimmed.
    pub completed: bool,
    pub color: ColorTag,
    pub actions: Vec<CardAction>,
    pub opens_detail: bool,
}

impl CardView {
    fn build(task: &Task, now: DateTime<Utc>, color: ColorTag) -> Self {
        let completed = task.status.is_done();
        let actions = if completed {
            vec![CardAction::Delete]
        } else {
            vec![CardAction::Complete, CardAction::Delete]
        };
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            deadline: task.deadline_display.clone(),
            overdue: task.is_overdue_at(now),
            completed,
            color,
            actions,
            opens_detail: !completed,
        }
    }

    /// Column span (relative to the card's left edge) of each action label on
    /// the header row, right-aligned with one blank cell between labels.
    pub fn action_spans(&self, width: u16) -> Vec<(CardAction, u16, u16)> {
        let mut spans = Vec::with_capacity(self.actions.len());
        let mut right = width;
        for action in self.actions.iter().rev() {
            let start = right.saturating_sub(action.width());
            spans.push((*action, start, right));
            right = start.saturating_sub(1);
        }
        spans.reverse();
        spans
    }

    /// Classifies a click at `(x, y)` relative to the card's inner area.
    /// Action labels only live on row 0.
    pub fn hit_test(&self, x: u16, y: u16, width: u16) -> CardTarget {
        if y == 0 {
            for (action, start, end) in self.action_spans(width) {
                if x >= start && x < end {
                    return CardTarget::Action(action);
                }
            }
        }
        CardTarget::Body
    }

    /// What a click on this card does. Action controls never fall through to
    /// the detail view, and completed cards have no detail view.
    pub fn click(&self, target: CardTarget) -> Option<BoardCommand> {
        match target {
            CardTarget::Action(action) if self.actions.contains(&action) => Some(match action {
                CardAction::Complete => BoardCommand::Complete(self.id.clone()),
                CardAction::Delete => BoardCommand::Delete(self.id.clone()),
            }),
            CardTarget::Action(_) => None,
            CardTarget::Body if self.opens_detail => Some(BoardCommand::OpenDetail(self.id.clone())),
            CardTarget::Body => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub bucket: Bucket,
    pub title: &'static str,
    pub count: usize,
    pub cards: Vec<CardView>,
    pub has_add_button: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
    pub rendered_at: DateTime<Utc>,
}

impl BoardView {
    pub fn column(&self, bucket: Bucket) -> &ColumnView {
        &self.columns[bucket.index()]
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    pub fn find_card(&self, id: &str) -> Option<(Bucket, &CardView)> {
        self.columns.iter().find_map(|col| {
            col.cards
                .iter()
                .find(|c| c.id == id)
                .map(|c| (col.bucket, c))
        })
    }
}

pub fn render_board(partition: &Partition<'_>, now: DateTime<Utc>) -> BoardView {
    render_board_with(partition, now, ColorTag::random)
}

/// Same as [`render_board`] with an injectable color source.
pub fn render_board_with(
    partition: &Partition<'_>,
    now: DateTime<Utc>,
    mut color: impl FnMut() -> ColorTag,
) -> BoardView {
    let columns = Bucket::ALL
        .iter()
        .map(|&bucket| ColumnView {
            bucket,
            title: bucket.title(),
            count: partition.count(bucket),
            cards: partition
                .bucket(bucket)
                .iter()
                .map(|t| CardView::build(t, now, color()))
                .collect(),
            has_add_button: bucket == Bucket::Upcoming,
        })
        .collect();
    BoardView {
        columns,
        rendered_at: now,
    }
}

/// What the board area shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoardState {
    #[default]
    Loading,
    Ready(BoardView),
    Failed(String),
}

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data. Ensure the API server is running.";

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(id, &format!("Task {}", id), status);
        t.deadline_timestamp = 1_000;
        t
    }

    fn ids(p: &Partition<'_>, b: Bucket) -> Vec<String> {
        p.bucket(b).iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_partition_scenario() {
        let cache = vec![
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Completed),
            task("3", TaskStatus::Notified),
        ];
        let p = partition(&cache);
        assert_eq!(ids(&p, Bucket::Upcoming), vec!["1", "3"]);
        assert_eq!(ids(&p, Bucket::Completed), vec!["2"]);
        assert_eq!(p.count(Bucket::Upcoming), 2);
        assert_eq!(p.count(Bucket::Completed), 1);
    }

    #[test]
    fn test_partition_reassembles_input() {
        let statuses = [
            TaskStatus::Completed,
            TaskStatus::Other("weird".into()),
            TaskStatus::Pending,
            TaskStatus::Completed,
            TaskStatus::Notified,
            TaskStatus::Pending,
        ];
        let cache: Vec<Task> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| task(&i.to_string(), s.clone()))
            .collect();
        let p = partition(&cache);

        assert_eq!(
            p.count(Bucket::Upcoming) + p.count(Bucket::Completed),
            cache.len()
        );
        // Merging the buckets back by input position gives the input back.
        let mut merged: Vec<&Task> = Bucket::ALL
            .iter()
            .flat_map(|b| p.bucket(*b).iter().copied())
            .collect();
        merged.sort_by_key(|t| t.id.parse::<usize>().unwrap());
        assert_eq!(merged.into_iter().cloned().collect::<Vec<_>>(), cache);

        // Within-bucket order follows the cache.
        assert_eq!(ids(&p, Bucket::Upcoming), vec!["1", "2", "4", "5"]);
        assert_eq!(ids(&p, Bucket::Completed), vec!["0", "3"]);
    }

    #[test]
    fn test_render_columns_and_affordances() {
        let cache = vec![task("1", TaskStatus::Pending), task("2", TaskStatus::Completed)];
        let p = partition(&cache);
        let now = DateTime::from_timestamp(500, 0).unwrap();
        let board = render_board_with(&p, now, || ColorTag(1, 2, 3));

        let up = board.column(Bucket::Upcoming);
        assert_eq!(up.title, "Upcoming Tasks");
        assert_eq!(up.count, 1);
        assert!(up.has_add_button);
        assert_eq!(up.cards[0].actions, vec![CardAction::Complete, CardAction::Delete]);
        assert!(up.cards[0].opens_detail);

        let done = board.column(Bucket::Completed);
        assert!(!done.has_add_button);
        assert!(done.cards[0].completed);
        assert_eq!(done.cards[0].actions, vec![CardAction::Delete]);
        assert!(!done.cards[0].opens_detail);
    }

    #[test]
    fn test_overdue_recomputed_per_render() {
        let cache = vec![task("1", TaskStatus::Pending), task("2", TaskStatus::Completed)];
        let p = partition(&cache);

        let before = render_board(&p, DateTime::from_timestamp(999, 0).unwrap());
        assert!(!before.find_card("1").unwrap().1.overdue);

        let after = render_board(&p, DateTime::from_timestamp(1_000, 0).unwrap());
        assert!(after.find_card("1").unwrap().1.overdue);
        assert!(!after.find_card("2").unwrap().1.overdue);
    }

    #[test]
    fn test_hit_test_separates_actions_from_body() {
        let cache = vec![task("1", TaskStatus::Pending)];
        let p = partition(&cache);
        let board = render_board(&p, DateTime::from_timestamp(0, 0).unwrap());
        let card = &board.column(Bucket::Upcoming).cards[0];

        // width 20: delete at 17..20, complete at 13..16
        assert_eq!(card.hit_test(18, 0, 20), CardTarget::Action(CardAction::Delete));
        assert_eq!(card.hit_test(13, 0, 20), CardTarget::Action(CardAction::Complete));
        assert_eq!(card.hit_test(16, 0, 20), CardTarget::Body);
        assert_eq!(card.hit_test(18, 1, 20), CardTarget::Body);

        assert_eq!(
            card.click(card.hit_test(18, 0, 20)),
            Some(BoardCommand::Delete("1".into()))
        );
        assert_eq!(
            card.click(CardTarget::Body),
            Some(BoardCommand::OpenDetail("1".into()))
        );
    }

    #[test]
    fn test_completed_card_click() {
        let cache = vec![task("9", TaskStatus::Completed)];
        let p = partition(&cache);
        let board = render_board(&p, DateTime::from_timestamp(0, 0).unwrap());
        let card = &board.column(Bucket::Completed).cards[0];

        assert_eq!(card.click(CardTarget::Body), None);
        assert_eq!(card.click(CardTarget::Action(CardAction::Complete)), None);
        // Only the delete label is drawn, at the far right.
        assert_eq!(card.hit_test(14, 0, 20), CardTarget::Body);
        assert_eq!(card.hit_test(17, 0, 20), CardTarget::Action(CardAction::Delete));
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(ColorTag(255, 107, 107).hex(), "#FF6B6B");
    }
}
