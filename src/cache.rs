// File: src/cache.rs
use crate::model::Task;

/// Handed out when a fetch starts; the response is only applied if no newer
/// ticket has been applied in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// In-memory copy of the last task list the backend gave us. It is replaced
/// wholesale, never patched, and never written to disk.
#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: Vec<Task>,
    issued: u64,
    applied: u64,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }

    /// True if a result carrying this ticket may still be applied.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 > self.applied
    }

    /// Replaces the cache if the ticket is not stale. Returns whether the
    /// replacement happened.
    pub fn replace(&mut self, ticket: FetchTicket, tasks: Vec<Task>) -> bool {
        if !self.is_current(ticket) {
            tracing::warn!(
                ticket = ticket.0,
                applied = self.applied,
                "discarding stale task list"
            );
            return false;
        }
        tracing::debug!(ticket = ticket.0, count = tasks.len(), "task cache replaced");
        self.applied = ticket.0;
        self.tasks = tasks;
        true
    }

    /// Marks a ticket as consumed without touching the data (a failed fetch
    /// still supersedes anything issued before it).
    pub fn consume(&mut self, ticket: FetchTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.applied = ticket.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    fn tasks(ids: &[&str]) -> Vec<Task> {
        ids.iter()
            .map(|id| Task::new(id, "t", TaskStatus::Pending))
            .collect()
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut cache = TaskCache::new();
        let t1 = cache.begin_fetch();
        assert!(cache.replace(t1, tasks(&["1", "2", "3"])));
        let t2 = cache.begin_fetch();
        assert!(cache.replace(t2, tasks(&["1", "2"])));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("3").is_none());
    }

    #[test]
    fn test_out_of_order_response_is_dropped() {
        let mut cache = TaskCache::new();
        let older = cache.begin_fetch();
        let newer = cache.begin_fetch();

        assert!(cache.replace(newer, tasks(&["fresh"])));
        assert!(!cache.replace(older, tasks(&["stale"])));

        assert_eq!(cache.tasks()[0].id, "fresh");
        assert_eq!(cache.last_applied(), newer.seq());
    }

    #[test]
    fn test_consume_invalidates_older() {
        let mut cache = TaskCache::new();
        let older = cache.begin_fetch();
        let failed = cache.begin_fetch();
        assert!(cache.consume(failed));
        assert!(!cache.is_current(older));
        assert!(cache.is_empty());
    }
}
