//! In-process workspace lists that sit beside the converter: scheduled
//! events, a prioritised to-do list and the productivity counts derived from
//! both.
//!
//! The lists live for as long as their owner keeps them; nothing here is
//! persisted. Records are validated on the way in so every stored event has
//! a real calendar date and clock time.

use crate::error::WorkspaceError;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// ── Events ───────────────────────────────────────────────────────────────

/// A scheduled meeting or appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    pub attendees: String,
    pub agenda: String,
}

impl Event {
    /// Build an event from form values.
    ///
    /// `date` must be `YYYY-MM-DD` and `time` `HH:MM`; the title must not be
    /// blank. Attendees and agenda are free text and may be empty.
    pub fn new(
        title: &str,
        date: &str,
        time: &str,
        attendees: &str,
        agenda: &str,
    ) -> Result<Self, WorkspaceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WorkspaceError::EmptyField("Event title"));
        }
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|_| WorkspaceError::InvalidDate(date.to_string()))?;
        let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
            .map_err(|_| WorkspaceError::InvalidTime(time.to_string()))?;

        Ok(Self {
            title: title.to_string(),
            date,
            time,
            attendees: attendees.trim().to_string(),
            agenda: agenda.trim().to_string(),
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at {}",
            self.title,
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT)
        )
    }
}

/// `HH:MM` on the wire, the same shape [`Event::new`] accepts.
mod hh_mm {
    use super::TIME_FORMAT;
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(de::Error::custom)
    }
}

/// Events in the order they were added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn list(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ── Tasks ────────────────────────────────────────────────────────────────

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        })
    }
}

impl FromStr for Priority {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(WorkspaceError::UnknownPriority(s.to_string())),
        }
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub priority: Priority,
}

impl Task {
    pub fn new(description: &str, priority: Priority) -> Result<Self, WorkspaceError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(WorkspaceError::EmptyField("Task description"));
        }
        Ok(Self {
            description: description.to_string(),
            priority,
        })
    }
}

/// Pending tasks in insertion order, plus a count of completed ones.
///
/// Completing a task removes it from the list and bumps the done counter;
/// removing it without completion does not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    tasks: Vec<Task>,
    done: usize,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Delete the task at `index` without marking it done.
    pub fn remove_at(&mut self, index: usize) -> Result<Task, WorkspaceError> {
        self.check_index(index)?;
        Ok(self.tasks.remove(index))
    }

    /// Complete the task at `index`.
    pub fn mark_done(&mut self, index: usize) -> Result<Task, WorkspaceError> {
        let task = self.remove_at(index)?;
        self.done += 1;
        Ok(task)
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn done_count(&self) -> usize {
        self.done
    }

    fn check_index(&self, index: usize) -> Result<(), WorkspaceError> {
        if index >= self.tasks.len() {
            return Err(WorkspaceError::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            });
        }
        Ok(())
    }
}

// ── Insights ─────────────────────────────────────────────────────────────

/// Productivity counts read off the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub events_scheduled: usize,
    pub tasks_done: usize,
    pub tasks_pending: usize,
}

impl Insights {
    pub fn from_lists(events: &EventList, tasks: &TaskList) -> Self {
        Self {
            events_scheduled: events.len(),
            tasks_done: tasks.done_count(),
            tasks_pending: tasks.len(),
        }
    }

    /// Bar-chart rows: `(label, value)`.
    pub fn as_chart(&self) -> [(&'static str, usize); 3] {
        [
            ("Events", self.events_scheduled),
            ("Tasks Done", self.tasks_done),
            ("Tasks Pending", self.tasks_pending),
        ]
    }
}
