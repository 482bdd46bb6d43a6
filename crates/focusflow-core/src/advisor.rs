//! Session orchestrator tying context, bandit, and fatigue together.
//!
//! [`FocusAdvisor`] is the façade the surrounding timer/UI glue talks to. It
//! owns one bandit, one fatigue tracker, and the current context, and drives
//! load/save of the combined state through the injected [`StateStore`].
//!
//! One advisor per user profile, constructed explicitly and passed by
//! reference to callers. Calls are synchronous; callers serialize
//! `finish_session` invocations (one session ends before the next begins).

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::bandit::{calculate_reward, BanditConfig, DurationBandit, SessionFeedback};
use crate::context::{Clock, ContextFeatures, ContextPatch, SystemClock};
use crate::error::ConfigError;
use crate::fatigue::{session_quality, BreakSuggestion, FatigueTracker, DEFAULT_ALPHA};
use crate::persist::{PersistedAiState, StateStore};

/// Outcome of a finished focus session, as reported by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    /// Whether the session ran to the end of its timer
    pub completed: bool,

    /// Number of pauses during the session
    pub pauses: u32,

    /// Optional duration feedback from the user
    #[serde(default)]
    pub user_feedback: Option<SessionFeedback>,

    /// The duration (minutes) the session actually ran with
    pub duration: u32,
}

/// Recommended focus duration plus rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSuggestion {
    pub duration: u32,
    pub explanation: String,
}

/// What the caller gets back after reporting a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub break_suggestion: BreakSuggestion,
    pub explanation: String,
}

/// Construction options for [`FocusAdvisor`].
#[derive(Debug, Clone)]
pub struct AdvisorOptions {
    pub bandit: BanditConfig,

    /// EWMA smoothing factor for the fatigue tracker, clamped to [0.1, 1.0].
    pub fatigue_alpha: f64,

    /// RNG seed for reproducible exploration and break draws (None = entropy).
    pub seed: Option<u64>,
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self {
            bandit: BanditConfig::default(),
            fatigue_alpha: DEFAULT_ALPHA,
            seed: None,
        }
    }
}

/// Orchestrator for adaptive focus-session recommendations.
pub struct FocusAdvisor {
    bandit: DurationBandit,
    fatigue: FatigueTracker,
    context: ContextFeatures,
    last_suggestion: Option<SmartSuggestion>,
    last_break: Option<BreakSuggestion>,
    clock: Box<dyn Clock>,
    store: Box<dyn StateStore>,
    rng: Mcg128Xsl64,
}

impl FocusAdvisor {
    /// Create an advisor with default options and the system clock.
    pub fn new(store: Box<dyn StateStore>) -> Result<Self, ConfigError> {
        Self::with_options(AdvisorOptions::default(), Box::new(SystemClock), store)
    }

    /// Create an advisor with explicit options, clock, and store.
    ///
    /// # Errors
    /// Misconfiguration (empty arm set, ε outside [0, 1]) fails here and only
    /// here; every later operation returns a value.
    pub fn with_options(
        options: AdvisorOptions,
        clock: Box<dyn Clock>,
        store: Box<dyn StateStore>,
    ) -> Result<Self, ConfigError> {
        let bandit = DurationBandit::with_config(options.bandit)?;
        let rng = match options.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let context = ContextFeatures::capture(clock.as_ref());

        Ok(Self {
            bandit,
            fatigue: FatigueTracker::with_alpha(options.fatigue_alpha),
            context,
            last_suggestion: None,
            last_break: None,
            clock,
            store,
            rng,
        })
    }

    /// Restore persisted state and refresh the context. Call once at startup.
    pub fn initialize(&mut self) {
        self.load_state();
        self.context = ContextFeatures::capture(self.clock.as_ref());
    }

    /// Recommend a focus duration for the current context.
    ///
    /// Records the suggestion for later inspection but does not mutate the
    /// learned state.
    pub fn choose_smart(&mut self) -> SmartSuggestion {
        let choice = self.bandit.choose(&self.context, &mut self.rng);
        let explanation = self.bandit.explain(choice.arm, &self.context, &choice.debug);
        let suggestion = SmartSuggestion {
            duration: choice.arm,
            explanation,
        };
        self.last_suggestion = Some(suggestion.clone());
        suggestion
    }

    /// Record a finished session.
    ///
    /// Scores the session for the bandit (reward) and the fatigue tracker
    /// (quality), applies both updates, sizes the break from the updated
    /// fatigue level, and persists the combined state. The persist happens
    /// after both updates so a subsequent load sees both or neither.
    pub fn finish_session(&mut self, result: SessionResult) -> SessionOutcome {
        let reward = calculate_reward(result.completed, result.pauses, result.user_feedback);
        self.bandit.update(result.duration, reward);

        let quality = session_quality(
            result.completed,
            result.pauses,
            result.user_feedback,
            result.duration,
        );
        self.fatigue.update(quality);

        let break_suggestion = self.fatigue.suggest_break(&mut self.rng);
        let explanation = self
            .fatigue
            .personalized_advice(self.context.time_of_day, &mut self.rng);
        self.last_break = Some(break_suggestion.clone());

        self.save_state();

        SessionOutcome {
            break_suggestion,
            explanation,
        }
    }

    /// Merge caller-supplied context fields. Time-derived fields always come
    /// from the clock, whatever the patch says.
    pub fn set_context(&mut self, patch: ContextPatch) {
        self.context.apply(patch, self.clock.as_ref());
    }

    /// Drop everything learned and clear the persisted blob. The
    /// construction-time configuration is retained.
    pub fn reset(&mut self) {
        self.bandit.reset();
        self.fatigue = FatigueTracker::with_alpha(self.fatigue.alpha());
        self.last_suggestion = None;
        self.last_break = None;

        if let Err(e) = self.store.clear() {
            eprintln!("Warning: failed to clear persisted AI state: {e}");
        }
    }

    /// Describe the current fatigue level.
    pub fn explain_current_fatigue(&self) -> String {
        self.fatigue.explain()
    }

    /// Persist both models as one blob. Failures are reported, not returned;
    /// the in-memory state stays authoritative.
    pub fn save_state(&mut self) {
        let state = PersistedAiState {
            bandit: Some(self.bandit.export_state()),
            fatigue: Some(self.fatigue.export_state()),
            last_updated: self.clock.now().timestamp_millis(),
        };
        if let Err(e) = self.store.save(&state) {
            eprintln!("Warning: failed to save AI state: {e}");
        }
    }

    /// Merge any persisted sub-state over the in-memory defaults. A missing
    /// or malformed blob keeps the defaults.
    pub fn load_state(&mut self) {
        match self.store.load() {
            Ok(Some(state)) => {
                if let Some(bandit) = state.bandit {
                    self.bandit = DurationBandit::from_state(bandit);
                }
                if let Some(fatigue) = state.fatigue {
                    self.fatigue = FatigueTracker::from_state(fatigue);
                }
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("Warning: failed to load AI state, keeping defaults: {e}");
            }
        }
    }

    pub fn context(&self) -> &ContextFeatures {
        &self.context
    }

    /// Most recent duration suggestion, if any.
    pub fn last_suggestion(&self) -> Option<&SmartSuggestion> {
        self.last_suggestion.as_ref()
    }

    /// Most recent break suggestion, if any.
    pub fn last_break_suggestion(&self) -> Option<&BreakSuggestion> {
        self.last_break.as_ref()
    }

    pub fn bandit(&self) -> &DurationBandit {
        &self.bandit
    }

    pub fn fatigue(&self) -> &FatigueTracker {
        &self.fatigue
    }
}
