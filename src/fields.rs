//! Enumerations and field types for task management.
//!
//! Both enumerations are closed: every value a task can hold is listed here, and
//! `ALL` gives the canonical order used wherever a complete table is needed
//! (statistics, help text).

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Task importance, ordered from least to most pressing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    /// Ranking weight; the base score of a task is ten times this.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 4,
            Priority::Urgent => 6,
        }
    }

    /// Numeric level, 1 (low) through 4 (urgent).
    pub fn level(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn from_level(level: i64) -> Option<Priority> {
        match level {
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            4 => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    fn index(self) -> usize {
        self.level() as usize - 1
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    /// Accepts the textual form or the numeric level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = normalise_variant(s);
        if let Ok(level) = norm.parse::<i64>() {
            return Priority::from_level(level).ok_or_else(|| TaskError::InvalidPriority(s.to_string()));
        }
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == norm)
            .ok_or_else(|| TaskError::InvalidPriority(s.to_string()))
    }
}

/// Workflow position of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Todo, Status::InProgress, Status::Review, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Done => "done",
        }
    }

    fn index(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Review => 2,
            Status::Done => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = normalise_variant(s);
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == norm)
            .ok_or_else(|| TaskError::InvalidStatus(s.to_string()))
    }
}

fn normalise_variant(s: &str) -> String {
    s.trim().to_lowercase().replace('_', "-")
}

/// Zero-initialised count table with one slot per `Status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts([usize; 4]);

impl StatusCounts {
    pub fn increment(&mut self, status: Status) {
        self.0[status.index()] += 1;
    }

    pub fn get(&self, status: Status) -> usize {
        self.0[status.index()]
    }

    /// Every status with its count, in `Status::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Status, usize)> + '_ {
        Status::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

/// Zero-initialised count table with one slot per `Priority`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts([usize; 4]);

impl PriorityCounts {
    pub fn increment(&mut self, priority: Priority) {
        self.0[priority.index()] += 1;
    }

    pub fn get(&self, priority: Priority) -> usize {
        self.0[priority.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Priority, usize)> + '_ {
        Priority::ALL.into_iter().map(|p| (p, self.get(p)))
    }
}
