// File: src/calendar.rs
use crate::board::ColorTag;
use crate::model::Task;
use crate::prefs::Theme;
use chrono::{Datelike, Duration, Months, NaiveDate};

/// Every deadline event uses the same accent.
pub const EVENT_ACCENT: ColorTag = ColorTag(0xFF, 0x6B, 0x6B);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisplay {
    /// A marker on the day cell instead of the event text.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub task_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub all_day: bool,
    pub color: ColorTag,
    pub display: EventDisplay,
}

/// One event per open task with a usable deadline date. Completed tasks never
/// show up here.
pub fn project(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks
        .iter()
        .filter(|t| !t.status.is_done())
        .filter_map(|t| {
            t.calendar_date().map(|date| CalendarEvent {
                task_id: t.id.clone(),
                title: t.title.clone(),
                date,
                all_day: true,
                color: EVENT_ACCENT,
                display: EventDisplay::Dot,
            })
        })
        .collect()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub event_count: usize,
}

/// A materialized month grid. Built from a projection, thrown away on the
/// next rebuild.
#[derive(Debug)]
pub struct MonthCalendar {
    instance_id: u64,
    month: NaiveDate,
    theme: Theme,
    events: Vec<CalendarEvent>,
    weeks: Vec<[DayCell; 7]>,
}

impl MonthCalendar {
    fn build(
        instance_id: u64,
        month: NaiveDate,
        theme: Theme,
        events: Vec<CalendarEvent>,
        today: NaiveDate,
    ) -> Self {
        let first = first_of_month(month);
        // Weeks start on Monday.
        let offset = first.weekday().num_days_from_monday() as i64;
        let grid_start = first - Duration::days(offset);

        let mut weeks = Vec::with_capacity(6);
        for week in 0..6 {
            let row: [DayCell; 7] = std::array::from_fn(|dow| {
                let date = grid_start + Duration::days(week * 7 + dow as i64);
                DayCell {
                    date,
                    in_month: date.month() == first.month() && date.year() == first.year(),
                    is_today: date == today,
                    event_count: events.iter().filter(|e| e.date == date).count(),
                }
            });
            if row.iter().any(|c| c.in_month) {
                weeks.push(row);
            }
        }

        tracing::debug!(instance_id, month = %first, events = events.len(), "calendar built");
        Self {
            instance_id,
            month: first,
            theme,
            events,
            weeks,
        }
    }

    fn destroy(self) {
        tracing::debug!(instance_id = self.instance_id, "calendar torn down");
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn title(&self) -> String {
        self.month.format("%B %Y").to_string()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn weeks(&self) -> &[[DayCell; 7]] {
        &self.weeks
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        self.events.iter().filter(|e| e.date == date).collect()
    }
}

/// Owns the (single) live calendar instance.
#[derive(Debug)]
pub struct CalendarHost {
    instance: Option<MonthCalendar>,
    events: Vec<CalendarEvent>,
    month: NaiveDate,
    theme: Theme,
    built: u64,
    torn_down: u64,
}

impl CalendarHost {
    pub fn new(today: NaiveDate, theme: Theme) -> Self {
        Self {
            instance: None,
            events: Vec::new(),
            month: first_of_month(today),
            theme,
            built: 0,
            torn_down: 0,
        }
    }

    /// Re-projects the tasks and rebuilds the widget.
    pub fn render(&mut self, tasks: &[Task], today: NaiveDate) {
        self.events = project(tasks);
        self.rebuild(today);
    }

    /// Visual-only rebuild: same events, new theme.
    pub fn set_theme(&mut self, theme: Theme, today: NaiveDate) {
        self.theme = theme;
        self.rebuild(today);
    }

    pub fn prev_month(&mut self, today: NaiveDate) {
        self.month = self
            .month
            .checked_sub_months(Months::new(1))
            .unwrap_or(self.month);
        self.rebuild(today);
    }

    pub fn next_month(&mut self, today: NaiveDate) {
        self.month = self
            .month
            .checked_add_months(Months::new(1))
            .unwrap_or(self.month);
        self.rebuild(today);
    }

    pub fn go_to_today(&mut self, today: NaiveDate) {
        self.month = first_of_month(today);
        self.rebuild(today);
    }

    /// The old instance is always gone before the new one exists.
    fn rebuild(&mut self, today: NaiveDate) {
        if let Some(old) = self.instance.take() {
            old.destroy();
            self.torn_down += 1;
        }
        self.built += 1;
        self.instance = Some(MonthCalendar::build(
            self.built,
            self.month,
            self.theme,
            self.events.clone(),
            today,
        ));
    }

    pub fn instance(&self) -> Option<&MonthCalendar> {
        self.instance.as_ref()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn built_count(&self) -> u64 {
        self.built
    }

    pub fn torn_down_count(&self) -> u64 {
        self.torn_down
    }
}
