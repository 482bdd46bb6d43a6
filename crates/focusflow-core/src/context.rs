//! Situational context used to bias duration recommendations.
//!
//! Context is ephemeral: it is merged on every caller update and read at
//! decision time, but never persisted with the learned state. Time-derived
//! fields always come from the injected clock, never from the caller.

use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};

/// Wall-clock capability. Injected so decisions are reproducible in tests.
pub trait Clock {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a fixed instant, for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket an hour (0-23): 5-11 morning, 12-16 afternoon, 17-20 evening,
    /// everything else night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    /// Lower-case label, used as a context-weight key.
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }

    /// Capitalized form for explanation text.
    pub fn display(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

/// Self-reported mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Good,
    Neutral,
    Poor,
}

impl Mood {
    /// Context-weight key for this mood.
    pub fn weight_key(&self) -> &'static str {
        match self {
            Mood::Good => "good_mood",
            Mood::Neutral => "neutral_mood",
            Mood::Poor => "poor_mood",
        }
    }
}

/// Importance of the task the next session will run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskImportance {
    Low,
    Medium,
    High,
}

impl TaskImportance {
    /// Context-weight key for this importance level.
    pub fn weight_key(&self) -> &'static str {
        match self {
            TaskImportance::Low => "low_importance",
            TaskImportance::Medium => "medium_importance",
            TaskImportance::High => "high_importance",
        }
    }
}

/// Metadata about the task the caller is about to work on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Caller's estimate of remaining work (minutes).
    pub estimate_min: u32,
    pub importance: TaskImportance,
}

/// Lower-case day name for a 0 = Sunday index, used as a context-weight key.
pub fn day_label(day_of_week: u8) -> &'static str {
    const DAYS: [&str; 7] = [
        "sunday",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
    ];
    DAYS[(day_of_week % 7) as usize]
}

/// Situational signals read at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFeatures {
    pub time_of_day: TimeOfDay,
    /// Day of week, 0 = Sunday.
    pub day_of_week: u8,
    pub self_reported_state: Mood,
    #[serde(default)]
    pub current_task: Option<TaskContext>,
}

impl ContextFeatures {
    /// Fresh default context: neutral mood, no task, time fields from the clock.
    pub fn capture(clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            time_of_day: TimeOfDay::from_hour(now.hour()),
            day_of_week: now.weekday().num_days_from_sunday() as u8,
            self_reported_state: Mood::Neutral,
            current_task: None,
        }
    }

    /// Merge caller-supplied fields. Mood and task persist until overwritten;
    /// time-derived fields are refreshed from the clock regardless of the patch.
    pub fn apply(&mut self, patch: ContextPatch, clock: &dyn Clock) {
        if let Some(mood) = patch.self_reported_state {
            self.self_reported_state = mood;
        }
        if patch.clear_task {
            self.current_task = None;
        }
        if let Some(task) = patch.current_task {
            self.current_task = Some(task);
        }
        let now = clock.now();
        self.time_of_day = TimeOfDay::from_hour(now.hour());
        self.day_of_week = now.weekday().num_days_from_sunday() as u8;
    }
}

/// Partial context update. Unset fields leave the current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPatch {
    #[serde(default)]
    pub self_reported_state: Option<Mood>,
    #[serde(default)]
    pub current_task: Option<TaskContext>,
    /// Drop the current task without replacing it.
    #[serde(default)]
    pub clear_task: bool,
}
