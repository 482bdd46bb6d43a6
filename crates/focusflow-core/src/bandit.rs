//! ε-greedy contextual bandit over discrete focus durations.
//!
//! Each candidate duration ("arm") carries a trial count and a cumulative
//! reward. Selection exploits the arm with the best context-adjusted average
//! reward, except for an ε-probability uniform exploration draw. The engine
//! also renders a human-readable rationale for every recommendation.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::{day_label, ContextFeatures, Mood, TimeOfDay};
use crate::error::ConfigError;

/// Average assumed for an untried duration. Optimistic on purpose so fresh
/// arms get picked ahead of known-mediocre ones.
pub const OPTIMISTIC_PRIOR: f64 = 0.5;

/// Extra penalty for long sessions when the user reports a poor mood.
const POOR_MOOD_LONG_PENALTY: f64 = 0.02;

/// Extra boost for longer sessions in the morning.
const MORNING_LONG_BONUS: f64 = 0.01;

/// Session-length feedback reported by the user after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFeedback {
    TooShort,
    JustRight,
    TooLong,
}

/// Configuration for the duration bandit.
///
/// The defaults are product-tunable constants, not values derived from data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditConfig {
    /// Exploration probability for the ε-greedy draw (0.0-1.0)
    pub epsilon: f64,

    /// Candidate focus durations in minutes. Order matters: ties in adjusted
    /// value keep the earliest arm.
    pub arms: Vec<u32>,

    /// Additive bias per context label (time of day, day name, mood, task
    /// importance). Missing labels contribute nothing.
    pub context_weights: HashMap<String, f64>,
}

impl Default for BanditConfig {
    fn default() -> Self {
        let context_weights = HashMap::from([
            ("morning".to_string(), 0.03),
            ("afternoon".to_string(), 0.01),
            ("evening".to_string(), -0.02),
            ("night".to_string(), -0.05),
            ("monday".to_string(), 0.02),
            ("friday".to_string(), -0.01),
            ("good_mood".to_string(), 0.05),
            ("poor_mood".to_string(), -0.03),
            ("high_importance".to_string(), 0.02),
            ("low_importance".to_string(), -0.01),
        ]);
        Self {
            epsilon: 0.1,
            arms: vec![15, 20, 25, 30, 40, 50],
            context_weights,
        }
    }
}

impl BanditConfig {
    /// Check that the configuration can produce meaningful recommendations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arms.is_empty() {
            return Err(ConfigError::EmptyArmSet);
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::EpsilonOutOfRange(self.epsilon));
        }
        Ok(())
    }
}

/// Debug record explaining how a duration was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDebug {
    /// Adjusted value (average reward + context bias) per arm, in config order.
    pub adjusted_values: Vec<(u32, f64)>,

    /// Context bias of the chosen arm.
    pub ctx_bias: f64,

    /// Whether this draw was an exploration override.
    pub exploration: bool,
}

/// Result of a selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmChoice {
    pub arm: u32,
    pub debug: ChoiceDebug,
}

/// Serializable bandit statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditState {
    pub config: BanditConfig,
    pub counts: HashMap<u32, u64>,
    pub total_reward: HashMap<u32, f64>,
}

/// ε-greedy bandit engine over the configured durations.
///
/// Every configured arm always has an entry in both statistics maps.
#[derive(Debug, Clone)]
pub struct DurationBandit {
    config: BanditConfig,
    counts: HashMap<u32, u64>,
    total_reward: HashMap<u32, f64>,
}

impl DurationBandit {
    /// Create a bandit with the default configuration.
    pub fn new() -> Self {
        Self::from_parts(BanditConfig::default())
    }

    /// Create a bandit with a custom configuration.
    ///
    /// # Errors
    /// Fails on an empty arm set or an exploration rate outside [0, 1]. This
    /// is the only hard failure in the engine.
    pub fn with_config(config: BanditConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: BanditConfig) -> Self {
        let mut bandit = Self {
            config,
            counts: HashMap::new(),
            total_reward: HashMap::new(),
        };
        bandit.seed_arms();
        bandit
    }

    /// Ensure every configured arm has statistics entries.
    fn seed_arms(&mut self) {
        for &arm in &self.config.arms {
            self.counts.entry(arm).or_insert(0);
            self.total_reward.entry(arm).or_insert(0.0);
        }
    }

    pub fn config(&self) -> &BanditConfig {
        &self.config
    }

    /// Trial count for an arm.
    pub fn count(&self, arm: u32) -> u64 {
        self.counts.get(&arm).copied().unwrap_or(0)
    }

    /// Average reward for an arm, or the optimistic prior when untried.
    pub fn average_reward(&self, arm: u32) -> f64 {
        match self.counts.get(&arm) {
            Some(&n) if n > 0 => self.total_reward.get(&arm).copied().unwrap_or(0.0) / n as f64,
            _ => OPTIMISTIC_PRIOR,
        }
    }

    /// Additive contextual bias for an arm. Independent weight lookups plus
    /// two arm-dependent rules; nothing is ever multiplied.
    pub fn context_bias(&self, arm: u32, ctx: &ContextFeatures) -> f64 {
        let weights = &self.config.context_weights;
        let mut bias = 0.0;

        bias += weights.get(ctx.time_of_day.label()).copied().unwrap_or(0.0);
        bias += weights
            .get(day_label(ctx.day_of_week))
            .copied()
            .unwrap_or(0.0);
        bias += weights
            .get(ctx.self_reported_state.weight_key())
            .copied()
            .unwrap_or(0.0);
        if let Some(task) = &ctx.current_task {
            bias += weights
                .get(task.importance.weight_key())
                .copied()
                .unwrap_or(0.0);
        }

        // Long durations get a slight penalty when mood is poor
        if ctx.self_reported_state == Mood::Poor && arm > 30 {
            bias -= POOR_MOOD_LONG_PENALTY;
        }

        // Morning boost for longer sessions
        if ctx.time_of_day == TimeOfDay::Morning && arm >= 25 {
            bias += MORNING_LONG_BONUS;
        }

        bias
    }

    /// Choose a duration using ε-greedy selection with contextual bias.
    ///
    /// Ties in adjusted value keep the earliest arm in config order.
    pub fn choose(&self, ctx: &ContextFeatures, rng: &mut impl Rng) -> ArmChoice {
        let mut adjusted_values = Vec::with_capacity(self.config.arms.len());
        let mut best_arm = self.config.arms[0];
        let mut best_value = f64::NEG_INFINITY;

        for &arm in &self.config.arms {
            let value = self.average_reward(arm) + self.context_bias(arm, ctx);
            adjusted_values.push((arm, value));
            if value > best_value {
                best_value = value;
                best_arm = arm;
            }
        }

        let exploration = rng.gen::<f64>() < self.config.epsilon;
        let arm = if exploration {
            self.config.arms[rng.gen_range(0..self.config.arms.len())]
        } else {
            best_arm
        };

        ArmChoice {
            arm,
            debug: ChoiceDebug {
                ctx_bias: self.context_bias(arm, ctx),
                adjusted_values,
                exploration,
            },
        }
    }

    /// Record a session outcome for an arm. The single mutation path for the
    /// statistics; the reward is clamped to [0, 1] before it is summed.
    pub fn update(&mut self, arm: u32, reward: f64) {
        let reward = reward.clamp(0.0, 1.0);
        *self.counts.entry(arm).or_insert(0) += 1;
        *self.total_reward.entry(arm).or_insert(0.0) += reward;
    }

    /// Zero all statistics, keeping the configuration.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.total_reward.clear();
        self.seed_arms();
    }

    /// Render a human-readable rationale for a recommendation.
    pub fn explain(&self, chosen: u32, ctx: &ContextFeatures, debug: &ChoiceDebug) -> String {
        let count = self.count(chosen);
        let mut explanation = format!("Recommended {chosen} min: ");

        if count > 0 {
            let avg = self.average_reward(chosen);
            let plural = if count == 1 { "" } else { "s" };
            explanation.push_str(&format!("avg score {avg:.2} over {count} trial{plural}"));

            // Runner-up by adjusted value, chosen arm excluded
            let mut ranked: Vec<_> = debug
                .adjusted_values
                .iter()
                .filter(|(arm, _)| *arm != chosen)
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

            if let Some(&&(second, _)) = ranked.first() {
                let second_avg = self.average_reward(second);
                if (avg - second_avg).abs() > 0.05 {
                    explanation.push_str(&format!("; better than {second} min ({second_avg:.2})"));
                }
            }
        } else {
            explanation.push_str("exploring new duration");
        }

        if debug.ctx_bias.abs() > 0.02 {
            let direction = if debug.ctx_bias > 0.0 { "adds" } else { "reduces" };
            explanation.push_str(&format!(
                ". {} context {direction} {:.2}",
                ctx.time_of_day.display(),
                debug.ctx_bias.abs()
            ));
        }

        if debug.exploration {
            explanation.push_str(" (exploring)");
        }

        explanation.push('.');
        explanation
    }

    /// Export statistics and configuration for persistence.
    pub fn export_state(&self) -> BanditState {
        BanditState {
            config: self.config.clone(),
            counts: self.counts.clone(),
            total_reward: self.total_reward.clone(),
        }
    }

    /// Rebuild an engine from a persisted state. An invalid persisted config
    /// falls back to defaults with a warning; missing arm entries are
    /// re-seeded with zeros.
    pub fn from_state(state: BanditState) -> Self {
        let config = match state.config.validate() {
            Ok(()) => state.config,
            Err(e) => {
                eprintln!("Warning: persisted bandit config invalid ({e}), using defaults");
                BanditConfig::default()
            }
        };
        let mut bandit = Self {
            config,
            counts: state.counts,
            total_reward: state.total_reward,
        };
        bandit.seed_arms();
        bandit
    }
}

impl Default for DurationBandit {
    fn default() -> Self {
        Self::new()
    }
}

/// Reward for a finished session, in [0, 1].
///
/// Completion earns the base reward, reduced by up to 0.4 for pauses;
/// incomplete sessions earn nothing. User feedback shifts the result before
/// the final clamp.
pub fn calculate_reward(completed: bool, pauses: u32, feedback: Option<SessionFeedback>) -> f64 {
    let mut reward = if completed {
        1.0 - (0.1 * pauses as f64).min(0.4)
    } else {
        0.0
    };

    reward += match feedback {
        Some(SessionFeedback::TooShort) => -0.15,
        Some(SessionFeedback::JustRight) => 0.10,
        Some(SessionFeedback::TooLong) => -0.20,
        None => 0.0,
    };

    reward.clamp(0.0, 1.0)
}

/// Decode a persisted bandit state, falling back to a fresh engine on any
/// malformed input. Never returns an error to the caller.
pub fn decode_bandit(json: &str) -> DurationBandit {
    match serde_json::from_str::<BanditState>(json) {
        Ok(state) => DurationBandit::from_state(state),
        Err(e) => {
            eprintln!("Warning: failed to decode bandit state, using defaults: {e}");
            DurationBandit::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TaskContext, TaskImportance};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    /// Afternoon/neutral context: the 0.01 afternoon weight applies to every
    /// arm equally and no arm-dependent rule fires, so adjusted values tie.
    fn neutral_context() -> ContextFeatures {
        ContextFeatures {
            time_of_day: TimeOfDay::Afternoon,
            day_of_week: 2,
            self_reported_state: Mood::Neutral,
            current_task: None,
        }
    }

    fn greedy_config() -> BanditConfig {
        BanditConfig {
            epsilon: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_arm_set_is_fatal() {
        let config = BanditConfig {
            arms: vec![],
            ..Default::default()
        };
        assert!(matches!(
            DurationBandit::with_config(config),
            Err(ConfigError::EmptyArmSet)
        ));
    }

    #[test]
    fn test_epsilon_out_of_range_is_fatal() {
        let config = BanditConfig {
            epsilon: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            DurationBandit::with_config(config),
            Err(ConfigError::EpsilonOutOfRange(_))
        ));
    }

    #[test]
    fn test_fresh_bandit_ties_break_to_first_arm() {
        // Scenario: all counts zero, no exploration -> every adjusted value
        // ties at 0.5 + bias and the first configured arm wins.
        let bandit = DurationBandit::with_config(greedy_config()).unwrap();
        let mut rng = Mcg128Xsl64::seed_from_u64(42);

        let choice = bandit.choose(&neutral_context(), &mut rng);
        assert_eq!(choice.arm, 15);
        assert!(!choice.debug.exploration);
    }

    #[test]
    fn test_untried_arm_uses_optimistic_prior() {
        let bandit = DurationBandit::new();
        assert_eq!(bandit.average_reward(25), OPTIMISTIC_PRIOR);
    }

    #[test]
    fn test_trained_arm_wins_greedy_selection() {
        let mut bandit = DurationBandit::with_config(greedy_config()).unwrap();
        for _ in 0..5 {
            bandit.update(40, 1.0);
        }
        let mut rng = Mcg128Xsl64::seed_from_u64(1);

        let choice = bandit.choose(&neutral_context(), &mut rng);
        assert_eq!(choice.arm, 40);
    }

    #[test]
    fn test_update_accumulates_statistics() {
        // Scenario: rewards [1.0, 0.5, 0.0] on arm 25
        let mut bandit = DurationBandit::new();
        bandit.update(25, 1.0);
        bandit.update(25, 0.5);
        bandit.update(25, 0.0);

        assert_eq!(bandit.count(25), 3);
        let state = bandit.export_state();
        assert!((state.total_reward[&25] - 1.5).abs() < 1e-9);
        assert!((bandit.average_reward(25) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_update_clamps_reward() {
        let mut bandit = DurationBandit::new();
        bandit.update(25, 3.0);
        bandit.update(25, -2.0);
        let state = bandit.export_state();
        assert!((state.total_reward[&25] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reward_perfect_session() {
        // completed, no pauses, just_right -> clamped to exactly 1.0
        let reward = calculate_reward(true, 0, Some(SessionFeedback::JustRight));
        assert_eq!(reward, 1.0);
    }

    #[test]
    fn test_reward_abandoned_session() {
        // not completed, too_long -> clamped to exactly 0.0
        let reward = calculate_reward(false, 2, Some(SessionFeedback::TooLong));
        assert_eq!(reward, 0.0);
    }

    #[test]
    fn test_reward_pause_penalty_caps_at_0_4() {
        assert!((calculate_reward(true, 2, None) - 0.8).abs() < 1e-9);
        assert!((calculate_reward(true, 10, None) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_context_bias_poor_mood_penalizes_long_arms() {
        let bandit = DurationBandit::new();
        let mut ctx = neutral_context();
        ctx.self_reported_state = Mood::Poor;

        // poor_mood weight (-0.03) hits every arm; the extra -0.02 only
        // applies above 30 minutes
        let short = bandit.context_bias(30, &ctx);
        let long = bandit.context_bias(40, &ctx);
        assert!((short - long - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_context_bias_morning_boosts_long_arms() {
        let bandit = DurationBandit::new();
        let mut ctx = neutral_context();
        ctx.time_of_day = TimeOfDay::Morning;

        let short = bandit.context_bias(20, &ctx);
        let long = bandit.context_bias(25, &ctx);
        assert!((long - short - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_context_bias_includes_task_importance() {
        let bandit = DurationBandit::new();
        let mut ctx = neutral_context();
        let without_task = bandit.context_bias(20, &ctx);

        ctx.current_task = Some(TaskContext {
            estimate_min: 30,
            importance: TaskImportance::High,
        });
        let with_task = bandit.context_bias(20, &ctx);
        assert!((with_task - without_task - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_context_bias_missing_weights_contribute_zero() {
        let config = BanditConfig {
            epsilon: 0.0,
            arms: vec![15, 25],
            context_weights: HashMap::new(),
        };
        let bandit = DurationBandit::with_config(config).unwrap();
        assert_eq!(bandit.context_bias(15, &neutral_context()), 0.0);
    }

    #[test]
    fn test_exploration_rate_matches_epsilon() {
        // With a uniquely best arm, a non-best draw only happens when the
        // exploration branch picks one of the other arms:
        // P = epsilon * (1 - 1/|arms|).
        let config = BanditConfig {
            epsilon: 0.2,
            ..Default::default()
        };
        let mut bandit = DurationBandit::with_config(config).unwrap();
        for _ in 0..10 {
            bandit.update(25, 1.0);
        }

        let ctx = neutral_context();
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        let trials = 20_000;
        let mut non_best = 0;
        for _ in 0..trials {
            if bandit.choose(&ctx, &mut rng).arm != 25 {
                non_best += 1;
            }
        }

        let observed = non_best as f64 / trials as f64;
        let expected = 0.2 * (1.0 - 1.0 / 6.0);
        assert!(
            (observed - expected).abs() < 0.02,
            "observed {observed}, expected {expected}"
        );
    }

    #[test]
    fn test_explain_untried_arm() {
        let bandit = DurationBandit::with_config(greedy_config()).unwrap();
        let mut rng = Mcg128Xsl64::seed_from_u64(3);
        let ctx = neutral_context();

        let choice = bandit.choose(&ctx, &mut rng);
        let text = bandit.explain(choice.arm, &ctx, &choice.debug);
        assert!(text.starts_with("Recommended 15 min: exploring new duration"));
        assert!(text.ends_with('.'));
    }

    #[test]
    fn test_explain_includes_trials_and_runner_up() {
        let mut bandit = DurationBandit::with_config(greedy_config()).unwrap();
        for _ in 0..4 {
            bandit.update(25, 1.0);
        }
        bandit.update(40, 0.2);
        let ctx = neutral_context();
        let mut rng = Mcg128Xsl64::seed_from_u64(3);

        let choice = bandit.choose(&ctx, &mut rng);
        assert_eq!(choice.arm, 25);
        let text = bandit.explain(choice.arm, &ctx, &choice.debug);
        assert!(text.contains("avg score 1.00 over 4 trials"));
        // Runner-up by adjusted value is an untried arm at the 0.5 prior
        assert!(text.contains("; better than"));
    }

    #[test]
    fn test_explain_singular_trial() {
        let mut bandit = DurationBandit::with_config(greedy_config()).unwrap();
        bandit.update(25, 0.5);
        let ctx = neutral_context();
        let mut rng = Mcg128Xsl64::seed_from_u64(3);

        let choice = bandit.choose(&ctx, &mut rng);
        let text = bandit.explain(25, &ctx, &choice.debug);
        assert!(text.contains("over 1 trial"));
        assert!(!text.contains("1 trials"));
    }

    #[test]
    fn test_explain_mentions_significant_context_bias() {
        let mut ctx = neutral_context();
        ctx.time_of_day = TimeOfDay::Night; // -0.05, past the 0.02 threshold
        let bandit = DurationBandit::with_config(greedy_config()).unwrap();
        let mut rng = Mcg128Xsl64::seed_from_u64(3);

        let choice = bandit.choose(&ctx, &mut rng);
        let text = bandit.explain(choice.arm, &ctx, &choice.debug);
        assert!(text.contains("Night context reduces 0.05"));
    }

    #[test]
    fn test_explain_marks_exploration_draws() {
        let config = BanditConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let bandit = DurationBandit::with_config(config).unwrap();
        let ctx = neutral_context();
        let mut rng = Mcg128Xsl64::seed_from_u64(3);

        let choice = bandit.choose(&ctx, &mut rng);
        assert!(choice.debug.exploration);
        let text = bandit.explain(choice.arm, &ctx, &choice.debug);
        assert!(text.contains("(exploring)"));
    }

    #[test]
    fn test_state_round_trip() {
        let mut bandit = DurationBandit::new();
        bandit.update(25, 0.9);
        bandit.update(40, 0.3);

        let json = serde_json::to_string(&bandit.export_state()).unwrap();
        let restored = decode_bandit(&json);
        assert_eq!(restored.export_state(), bandit.export_state());
    }

    #[test]
    fn test_decode_malformed_falls_back_to_defaults() {
        let bandit = decode_bandit("not valid");
        assert_eq!(bandit.config().arms, vec![15, 20, 25, 30, 40, 50]);
        assert_eq!(bandit.count(25), 0);
    }

    #[test]
    fn test_decode_missing_fields_falls_back_to_defaults() {
        let bandit = decode_bandit(r#"{"counts":{"25":3}}"#);
        assert_eq!(bandit.count(25), 0);
    }

    #[test]
    fn test_from_state_replaces_invalid_config() {
        let state = BanditState {
            config: BanditConfig {
                epsilon: 7.0,
                ..Default::default()
            },
            counts: HashMap::from([(25, 2)]),
            total_reward: HashMap::from([(25, 1.2)]),
        };
        let bandit = DurationBandit::from_state(state);
        assert_eq!(bandit.config().epsilon, 0.1);
        // Statistics survive; missing arms are re-seeded
        assert_eq!(bandit.count(25), 2);
        assert_eq!(bandit.count(15), 0);
    }

    #[test]
    fn test_reset_zeroes_statistics_keeps_config() {
        let config = BanditConfig {
            arms: vec![10, 20],
            ..Default::default()
        };
        let mut bandit = DurationBandit::with_config(config).unwrap();
        bandit.update(10, 0.8);
        bandit.reset();

        assert_eq!(bandit.count(10), 0);
        assert_eq!(bandit.config().arms, vec![10, 20]);
    }

    proptest! {
        #[test]
        fn prop_reward_always_within_bounds(
            completed in any::<bool>(),
            pauses in 0u32..1000,
            feedback in prop::option::of(prop_oneof![
                Just(SessionFeedback::TooShort),
                Just(SessionFeedback::JustRight),
                Just(SessionFeedback::TooLong),
            ]),
        ) {
            let reward = calculate_reward(completed, pauses, feedback);
            prop_assert!((0.0..=1.0).contains(&reward));
        }

        #[test]
        fn prop_average_reward_stays_within_bounds(
            rewards in prop::collection::vec(-1.0f64..2.0, 0..50),
        ) {
            let mut bandit = DurationBandit::new();
            for r in rewards {
                bandit.update(25, r);
            }
            let avg = bandit.average_reward(25);
            prop_assert!((0.0..=1.0).contains(&avg));
        }
    }
}
