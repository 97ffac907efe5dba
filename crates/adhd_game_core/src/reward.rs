//! crates/adhd_game_core/src/reward.rs
//!
//! The reward calculator: a pure function from quest configuration and reported
//! progress to a previewed award. The authoritative award is computed by the server;
//! everything here is for display and input validation.

use crate::domain::{Quest, QuestMode};
use crate::points::Points;
use std::fmt;

/// Decimal places used when showing a computed preview.
pub const PREVIEW_PRECISION: u32 = 2;

/// Progress entered in a text field that could not be read as a number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// The outcome of previewing a quest's reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardPreview {
    /// A fixed award that does not depend on progress.
    Fixed(Points),
    /// An award computed from reported progress, already rounded for display.
    Computed(Points),
    /// Maximum award of a partial quest, shown before any progress is reported.
    UpTo(Points),
    /// Per-minute rate, shown before any minutes are reported.
    PerMinute(Points),
    /// The configuration lacks what the computation needs; counts as zero.
    NotComputable,
}

impl RewardPreview {
    /// The award this preview stands for, if it is a concrete amount.
    pub fn amount(&self) -> Option<Points> {
        match self {
            RewardPreview::Fixed(points) | RewardPreview::Computed(points) => Some(*points),
            RewardPreview::NotComputable => Some(Points::ZERO),
            RewardPreview::UpTo(_) | RewardPreview::PerMinute(_) => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        !matches!(self, RewardPreview::NotComputable)
    }
}

impl fmt::Display for RewardPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardPreview::Fixed(points) => write!(f, "{}", points),
            RewardPreview::Computed(points) => f.write_str(&points.to_fixed(PREVIEW_PRECISION)),
            RewardPreview::UpTo(points) => write!(f, "Up to {}", points),
            RewardPreview::PerMinute(rate) => write!(f, "{} per minute", rate),
            RewardPreview::NotComputable => f.write_str("0"),
        }
    }
}

/// Previews the award for `quest` given optional reported progress: a percentage for
/// `PARTIAL` quests, a minute count for `PER_MINUTE` quests. `BINARY` quests ignore it.
pub fn preview_reward(quest: &Quest, progress: Option<f64>) -> RewardPreview {
    match quest.mode {
        QuestMode::Binary => RewardPreview::Fixed(quest.points_award),
        QuestMode::Partial => match progress {
            None => RewardPreview::UpTo(quest.points_award),
            Some(value) => {
                let percent = percent_points(clamp_percent(value));
                let reward = quest.points_award.mul(percent).div_whole(100);
                RewardPreview::Computed(reward.round_dp(PREVIEW_PRECISION))
            }
        },
        QuestMode::PerMinute => {
            let Some(rate) = quest.rate_points_per_min else {
                return RewardPreview::NotComputable;
            };
            let Some(value) = progress else {
                return RewardPreview::PerMinute(rate);
            };
            let mut minutes = preview_minutes(value);
            if let Some(max_minutes) = quest.max_minutes {
                minutes = minutes.min(Points::from_whole(i64::from(max_minutes)));
            }
            RewardPreview::Computed(rate.mul(minutes).round_dp(PREVIEW_PRECISION))
        }
    }
}

/// The highest award a single completion can earn, when the configuration bounds it.
pub fn max_reward(quest: &Quest) -> Option<Points> {
    match quest.mode {
        QuestMode::Binary | QuestMode::Partial => Some(quest.points_award),
        QuestMode::PerMinute => {
            let rate = quest.rate_points_per_min?;
            let max_minutes = quest.max_minutes?;
            Some(rate.mul(Points::from_whole(i64::from(max_minutes))))
        }
    }
}

/// Reads progress typed by the user. Surrounding whitespace is ignored.
pub fn parse_progress(input: &str) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::NotANumber(trimmed.to_string())),
    }
}

/// Clamps a percentage into `[0, 100]`; NaN counts as zero.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Clamps a minute count to a non-negative whole number of minutes.
pub fn clamp_minutes(minutes: f64) -> u32 {
    if minutes.is_nan() || minutes <= 0.0 {
        return 0;
    }
    // `as` truncates and saturates at u32::MAX.
    minutes as u32
}

// Minutes for a preview keep their fraction; only the submitted count is whole.
fn preview_minutes(minutes: f64) -> Points {
    if minutes.is_nan() || minutes <= 0.0 {
        return Points::ZERO;
    }
    Points::from_f64(minutes.min(f64::from(u32::MAX))).unwrap_or(Points::ZERO)
}

// Percent as fixed-point, keeping at most six fractional digits of the slider value.
fn percent_points(percent: f64) -> Points {
    Points::from_f64(percent).unwrap_or(Points::ZERO)
}

/// Where a minute count sits relative to a quest's advisory bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinuteBounds {
    Within,
    BelowMinimum { min_minutes: u32 },
    AboveMaximum { max_minutes: u32 },
}

/// Checks minutes against `min_minutes`/`max_minutes`. Only a hint for the UI: the
/// server enforces the bounds, and minutes above the maximum simply earn no more.
pub fn check_minute_bounds(quest: &Quest, minutes: u32) -> MinuteBounds {
    if let Some(min_minutes) = quest.min_minutes {
        if minutes < min_minutes {
            return MinuteBounds::BelowMinimum { min_minutes };
        }
    }
    if let Some(max_minutes) = quest.max_minutes {
        if minutes > max_minutes {
            return MinuteBounds::AboveMaximum { max_minutes };
        }
    }
    MinuteBounds::Within
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Points {
        Points::parse(text).unwrap()
    }

    fn binary(award: &str) -> Quest {
        Quest::new("binary", QuestMode::Binary, p(award))
    }

    fn partial(award: &str) -> Quest {
        Quest::new("partial", QuestMode::Partial, p(award))
    }

    fn per_minute(rate: Option<&str>, max_minutes: Option<u32>) -> Quest {
        let mut quest = Quest::new("timed", QuestMode::PerMinute, Points::ZERO);
        quest.rate_points_per_min = rate.map(p);
        quest.max_minutes = max_minutes;
        quest
    }

    #[test]
    fn binary_ignores_progress() {
        let quest = binary("50");
        for progress in [None, Some(-3.0), Some(0.0), Some(75.0), Some(f64::NAN)] {
            assert_eq!(preview_reward(&quest, progress), RewardPreview::Fixed(p("50")));
        }
        assert_eq!(preview_reward(&quest, None).to_string(), "50");
    }

    #[test]
    fn fixed_award_displays_in_canonical_form() {
        assert_eq!(preview_reward(&binary("50.00"), None).to_string(), "50");
        assert_eq!(preview_reward(&binary("12.50"), None).to_string(), "12.5");
    }

    #[test]
    fn partial_scales_award_by_percent() {
        let quest = partial("100");
        assert_eq!(preview_reward(&quest, Some(50.0)).to_string(), "50.00");
        assert_eq!(preview_reward(&quest, Some(0.0)).amount(), Some(Points::ZERO));
        assert_eq!(preview_reward(&quest, Some(100.0)).amount(), Some(p("100")));

        let odd = partial("33");
        assert_eq!(preview_reward(&odd, Some(33.0)).amount(), Some(p("10.89")));
    }

    #[test]
    fn partial_is_monotonic_in_percent() {
        let quest = partial("87.5");
        let mut previous = Points::ZERO;
        for step in 0..=200 {
            let percent = f64::from(step) * 0.5;
            let amount = preview_reward(&quest, Some(percent)).amount().unwrap();
            assert!(amount >= previous, "{} dropped below {}", amount, previous);
            previous = amount;
        }
        assert_eq!(previous, p("87.5"));
    }

    #[test]
    fn partial_clamps_out_of_range_percent() {
        let quest = partial("100");
        assert_eq!(preview_reward(&quest, Some(-5.0)), preview_reward(&quest, Some(0.0)));
        assert_eq!(preview_reward(&quest, Some(150.0)), preview_reward(&quest, Some(100.0)));
        assert_eq!(preview_reward(&quest, Some(f64::NAN)), preview_reward(&quest, Some(0.0)));
    }

    #[test]
    fn partial_without_progress_shows_ceiling() {
        assert_eq!(preview_reward(&partial("100"), None).to_string(), "Up to 100");
    }

    #[test]
    fn per_minute_caps_at_max_minutes() {
        let quest = per_minute(Some("2.5"), Some(120));
        assert_eq!(preview_reward(&quest, Some(10.0)).to_string(), "25.00");
        assert_eq!(preview_reward(&quest, Some(200.0)).to_string(), "300.00");
        assert_eq!(preview_reward(&quest, Some(200.0)), preview_reward(&quest, Some(120.0)));
        assert_eq!(preview_reward(&quest, Some(120.0)).amount(), Some(p("300")));
    }

    #[test]
    fn per_minute_without_cap_is_linear() {
        let quest = per_minute(Some("3"), None);
        assert_eq!(preview_reward(&quest, Some(400.0)).amount(), Some(p("1200")));
        assert_eq!(preview_reward(&quest, Some(-20.0)).amount(), Some(Points::ZERO));
    }

    #[test]
    fn per_minute_previews_fractional_minutes() {
        let quest = per_minute(Some("2.5"), None);
        assert_eq!(preview_reward(&quest, Some(10.5)).to_string(), "26.25");

        let capped = per_minute(Some("2.5"), Some(10));
        assert_eq!(preview_reward(&capped, Some(10.5)).to_string(), "25.00");
        assert_eq!(preview_reward(&capped, Some(9.75)).amount(), Some(p("24.38")));
        assert_eq!(preview_reward(&capped, Some(f64::INFINITY)).amount(), Some(p("25")));
    }

    #[test]
    fn per_minute_without_rate_is_not_computable() {
        let quest = per_minute(None, Some(60));
        let preview = preview_reward(&quest, Some(30.0));
        assert_eq!(preview, RewardPreview::NotComputable);
        assert!(!preview.is_computable());
        assert_eq!(preview.amount(), Some(Points::ZERO));
        assert_eq!(preview.to_string(), "0");
    }

    #[test]
    fn per_minute_without_progress_shows_rate() {
        let quest = per_minute(Some("2.5"), None);
        assert_eq!(preview_reward(&quest, None).to_string(), "2.5 per minute");
    }

    #[test]
    fn max_reward_per_mode() {
        assert_eq!(max_reward(&binary("50")), Some(p("50")));
        assert_eq!(max_reward(&partial("100")), Some(p("100")));
        assert_eq!(max_reward(&per_minute(Some("2.5"), Some(120))), Some(p("300")));
        assert_eq!(max_reward(&per_minute(Some("2.5"), None)), None);
        assert_eq!(max_reward(&per_minute(None, Some(120))), None);
    }

    #[test]
    fn progress_text_must_be_numeric() {
        assert_eq!(parse_progress(" 42 "), Ok(42.0));
        assert_eq!(parse_progress("12.5"), Ok(12.5));
        assert_eq!(
            parse_progress("soon"),
            Err(ValidationError::NotANumber("soon".to_string()))
        );
        assert!(parse_progress("NaN").is_err());
        assert!(parse_progress("inf").is_err());
    }

    #[test]
    fn clamping_helpers() {
        assert_eq!(clamp_percent(-1.0), 0.0);
        assert_eq!(clamp_percent(101.0), 100.0);
        assert_eq!(clamp_minutes(-4.0), 0);
        assert_eq!(clamp_minutes(29.9), 29);
        assert_eq!(clamp_minutes(f64::INFINITY), u32::MAX);
    }

    #[test]
    fn minute_bounds_are_advisory() {
        let mut quest = per_minute(Some("3"), Some(120));
        quest.min_minutes = Some(15);
        assert_eq!(
            check_minute_bounds(&quest, 10),
            MinuteBounds::BelowMinimum { min_minutes: 15 }
        );
        assert_eq!(check_minute_bounds(&quest, 60), MinuteBounds::Within);
        assert_eq!(
            check_minute_bounds(&quest, 200),
            MinuteBounds::AboveMaximum { max_minutes: 120 }
        );
        // Above the maximum still previews, capped.
        assert_eq!(preview_reward(&quest, Some(200.0)).amount(), Some(p("360")));
    }
}
