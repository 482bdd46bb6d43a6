//! # Focusflow Core Library
//!
//! This library provides the adaptive recommendation core for a focus-session
//! timer: it suggests how long the next focus session should be and how long
//! the break after it should last, based on an evolving model of user
//! preference and accumulated fatigue.
//!
//! ## Architecture
//!
//! - **Bandit Engine**: an ε-greedy contextual multi-armed bandit over a fixed
//!   set of candidate durations, with per-duration trial statistics
//! - **Fatigue Tracker**: a single exponentially-weighted fatigue level that
//!   sizes break recommendations
//! - **Context Model**: situational signals (time of day, day of week, mood,
//!   task metadata) that bias duration selection
//! - **Advisor**: the façade tying the above together and driving load/save of
//!   the combined state through an external persistence capability
//!
//! Timers, notifications, and UI are the caller's concern; the core is a pure
//! in-memory decision engine that the surrounding glue calls at session start
//! and session end.
//!
//! ## Key Components
//!
//! - [`FocusAdvisor`]: orchestrator exposing the recommendation API
//! - [`DurationBandit`]: duration selection and reward bookkeeping
//! - [`FatigueTracker`]: fatigue tracking and break sizing
//! - [`StateStore`]: persistence capability implemented by the caller

pub mod context;
pub mod bandit;
pub mod fatigue;
pub mod persist;
pub mod advisor;
pub mod error;

pub use advisor::{AdvisorOptions, FocusAdvisor, SessionOutcome, SessionResult, SmartSuggestion};
pub use bandit::{
    calculate_reward, ArmChoice, BanditConfig, BanditState, ChoiceDebug, DurationBandit,
    SessionFeedback,
};
pub use context::{
    Clock, ContextFeatures, ContextPatch, FixedClock, Mood, SystemClock, TaskContext,
    TaskImportance, TimeOfDay,
};
pub use error::{AiError, ConfigError, StoreError};
pub use fatigue::{session_quality, BreakKind, BreakSuggestion, FatigueState, FatigueTracker};
pub use persist::{MemoryStore, PersistedAiState, StateStore};
