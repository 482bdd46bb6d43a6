//! EWMA fatigue tracking and break sizing.
//!
//! Fatigue is a single [0, 1] scalar: 0 is fully fresh, 1 is exhausted. Each
//! finished session is scored for quality, mapped to a discrete fatigue
//! impact, and folded into the level with an exponentially weighted moving
//! average. The current level decides between a short and a long break.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bandit::SessionFeedback;
use crate::context::TimeOfDay;

/// Default EWMA smoothing factor.
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Starting fatigue level, neither fresh nor tired.
const NEUTRAL_FATIGUE: f64 = 0.5;

/// Break length category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    Long,
}

/// Suggested break duration with a rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakSuggestion {
    pub kind: BreakKind,
    pub minutes: u32,
    pub reason: String,
}

/// Serializable fatigue state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueState {
    pub ewma: f64,
    pub alpha: f64,
}

/// Exponentially weighted fatigue tracker.
#[derive(Debug, Clone)]
pub struct FatigueTracker {
    ewma: f64,
    alpha: f64,
}

impl FatigueTracker {
    /// Create a tracker at the neutral level with the default smoothing.
    pub fn new() -> Self {
        Self::with_alpha(DEFAULT_ALPHA)
    }

    /// Create a tracker with a custom smoothing factor, clamped to [0.1, 1.0].
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            ewma: NEUTRAL_FATIGUE,
            alpha: alpha.clamp(0.1, 1.0),
        }
    }

    /// Current fatigue level in [0, 1].
    pub fn level(&self) -> f64 {
        self.ewma
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold one session's quality into the fatigue level.
    ///
    /// Quality tiers map to a fatigue impact (good sessions pull the level
    /// down, bad sessions push it up), then the EWMA update applies:
    /// `ewma = alpha * impact + (1 - alpha) * ewma`, clamped to [0, 1].
    pub fn update(&mut self, session_quality: f64) {
        let quality = session_quality.clamp(0.0, 1.0);

        let impact = if quality >= 0.8 {
            0.2
        } else if quality >= 0.6 {
            0.4
        } else if quality >= 0.4 {
            0.6
        } else {
            0.8
        };

        self.ewma = (self.alpha * impact + (1.0 - self.alpha) * self.ewma).clamp(0.0, 1.0);
    }

    /// Suggest a break sized to the current fatigue level.
    pub fn suggest_break(&self, rng: &mut impl Rng) -> BreakSuggestion {
        let percent = (self.ewma * 100.0).round() as u32;

        if self.ewma < 0.6 {
            let minutes = rng.gen_range(5..=7);
            BreakSuggestion {
                kind: BreakKind::Short,
                minutes,
                reason: format!(
                    "Low fatigue level ({percent}%) - a short {minutes}-minute break should refresh you."
                ),
            }
        } else {
            let minutes = rng.gen_range(10..=15);
            BreakSuggestion {
                kind: BreakKind::Long,
                minutes,
                reason: format!(
                    "High fatigue level ({percent}%) - take a longer {minutes}-minute break to recover properly."
                ),
            }
        }
    }

    /// Human-readable description of the current fatigue level.
    pub fn explain(&self) -> String {
        let percent = (self.ewma * 100.0).round() as u32;

        let description = if self.ewma < 0.3 {
            "feeling fresh and energized"
        } else if self.ewma < 0.6 {
            "moderately tired but still productive"
        } else if self.ewma < 0.8 {
            "quite fatigued and may need longer breaks"
        } else {
            "very tired and should consider stopping soon"
        };

        format!("Current fatigue: {percent}% - you're {description}.")
    }

    /// Break reason plus one activity suggestion fitting the time of day.
    pub fn personalized_advice(&self, time_of_day: TimeOfDay, rng: &mut impl Rng) -> String {
        let suggestion = self.suggest_break(rng);
        let activities = activities_for(time_of_day);
        let activity = activities[rng.gen_range(0..activities.len())];
        format!("{} Consider {activity} during your break.", suggestion.reason)
    }

    /// Export the state for persistence.
    pub fn export_state(&self) -> FatigueState {
        FatigueState {
            ewma: self.ewma,
            alpha: self.alpha,
        }
    }

    /// Rebuild a tracker from a persisted state, re-clamping both fields even
    /// when the stored values are well-typed but out of range.
    pub fn from_state(state: FatigueState) -> Self {
        Self {
            ewma: state.ewma.clamp(0.0, 1.0),
            alpha: state.alpha.clamp(0.1, 1.0),
        }
    }
}

impl Default for FatigueTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Session quality in [0, 1], feeding the fatigue tracker rather than the
/// bandit.
///
/// Distinct from the bandit reward: quality rewards uninterrupted completion,
/// gives partial credit for attempting despite trouble, and penalizes long
/// sessions regardless of outcome.
pub fn session_quality(
    completed: bool,
    pauses: u32,
    feedback: Option<SessionFeedback>,
    duration: u32,
) -> f64 {
    let mut quality = if completed {
        let mut q = 0.8 - (0.1 * pauses as f64).min(0.3);
        if pauses == 0 {
            q += 0.2;
        }
        q
    } else {
        let mut q = 0.2;
        // Attempted despite trouble
        if pauses > 0 {
            q += 0.1;
        }
        q
    };

    quality += match feedback {
        Some(SessionFeedback::JustRight) => 0.2,
        Some(SessionFeedback::TooShort) => -0.1,
        Some(SessionFeedback::TooLong) => -0.3,
        None => 0.0,
    };

    // Long sessions are more draining regardless of outcome
    if duration > 40 {
        quality -= 0.1;
    }

    quality.clamp(0.0, 1.0)
}

fn activities_for(time_of_day: TimeOfDay) -> &'static [&'static str] {
    match time_of_day {
        TimeOfDay::Morning => &["stretching", "light walk", "hydrate", "look out the window"],
        TimeOfDay::Afternoon => &[
            "quick walk",
            "healthy snack",
            "deep breathing",
            "stand and stretch",
        ],
        TimeOfDay::Evening => &["gentle stretching", "herbal tea", "dim the lights", "light snack"],
        TimeOfDay::Night => &[
            "avoid screens",
            "prepare for sleep",
            "gentle breathing",
            "dim lighting",
        ],
    }
}

/// Decode a persisted fatigue state, falling back to a fresh tracker on any
/// malformed input. Never returns an error to the caller.
pub fn decode_fatigue(json: &str) -> FatigueTracker {
    match serde_json::from_str::<FatigueState>(json) {
        Ok(state) => FatigueTracker::from_state(state),
        Err(e) => {
            eprintln!("Warning: failed to decode fatigue state, using defaults: {e}");
            FatigueTracker::new()
        }
    }
}
