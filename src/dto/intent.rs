//! Control intents accepted by `POST /intents`.

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_logo,
    state::match_state::{ClockField, Period, Side},
};

/// Operator gesture, tagged by `type`.
///
/// ```json
/// { "type": "score", "side": "home", "delta": 1 }
/// { "type": "toggle_clock" }
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlIntent {
    /// Add or remove goals.
    Score(SideDelta),
    /// Set the red-card count.
    RedCards(RedCardsInput),
    /// Rename a team.
    Name(NameInput),
    /// Replace or clear a team logo.
    Logo(LogoInput),
    /// Start or stop the clock.
    ToggleClock,
    /// Nudge minutes or seconds.
    AdjustClock(ClockAdjustment),
    /// Zero and stop the clock.
    ResetClock,
    /// Switch the displayed half.
    Period(PeriodInput),
    /// Add or remove announced extra minutes.
    ExtraTime(Delta),
    /// Show or hide the penalty shootout.
    TogglePenalties,
    /// Add or remove converted penalties.
    PenaltyScore(SideDelta),
}

/// Relative change applied to one team.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct SideDelta {
    /// Team the change applies to.
    pub side: Side,
    /// Signed step added to the current value.
    #[validate(range(min = -99, max = 99))]
    pub delta: i64,
}

/// Relative change without a team.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct Delta {
    /// Signed step added to the current value.
    #[validate(range(min = -99, max = 99))]
    pub delta: i64,
}

/// Absolute red-card count for one team.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct RedCardsInput {
    /// Penalized team.
    pub side: Side,
    /// Cards to show; the store caps it.
    #[validate(range(min = -99, max = 99))]
    pub count: i64,
}

/// New team name; it is upper-cased and shortened when applied.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct NameInput {
    /// Team being renamed.
    pub side: Side,
    /// Raw name as typed; may be empty.
    #[validate(length(max = 64))]
    pub name: String,
}

/// Logo upload; `null` clears the logo.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct LogoInput {
    /// Team whose crest changes.
    pub side: Side,
    /// Inline `data:image/...` URL.
    #[serde(default)]
    #[validate(custom(function = "validate_logo"))]
    pub logo: Option<String>,
}

/// Manual clock correction.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct ClockAdjustment {
    /// Clock component to nudge.
    pub field: ClockField,
    /// Signed step; minutes and seconds clamp independently.
    #[validate(range(min = -99, max = 99))]
    pub delta: i64,
}

/// Period selection by short code (`1T` / `2T`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PeriodInput {
    /// `1T` or `2T`.
    pub code: Period,
}

impl Validate for ControlIntent {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ControlIntent::Score(input) | ControlIntent::PenaltyScore(input) => input.validate(),
            ControlIntent::ExtraTime(input) => input.validate(),
            ControlIntent::Name(input) => input.validate(),
            ControlIntent::Logo(input) => input.validate(),
            ControlIntent::AdjustClock(input) => input.validate(),
            ControlIntent::RedCards(input) => input.validate(),
            ControlIntent::ToggleClock
            | ControlIntent::ResetClock
            | ControlIntent::Period(_)
            | ControlIntent::TogglePenalties => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ControlIntent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn intents_are_tagged_by_type() {
        assert_eq!(
            parse(json!({ "type": "score", "side": "away", "delta": -1 })),
            ControlIntent::Score(SideDelta {
                side: Side::Away,
                delta: -1,
            })
        );
        assert_eq!(parse(json!({ "type": "toggle_clock" })), ControlIntent::ToggleClock);
        assert_eq!(
            parse(json!({ "type": "period", "code": "2T" })),
            ControlIntent::Period(PeriodInput {
                code: Period::SecondHalf,
            })
        );
        assert_eq!(
            parse(json!({ "type": "logo", "side": "home", "logo": null })),
            ControlIntent::Logo(LogoInput {
                side: Side::Home,
                logo: None,
            })
        );
    }

    #[test]
    fn unknown_period_code_is_rejected() {
        let result =
            serde_json::from_value::<ControlIntent>(json!({ "type": "period", "code": "3T" }));
        assert!(result.is_err());
    }

    #[test]
    fn oversized_deltas_fail_validation() {
        let intent = parse(json!({ "type": "extra_time", "delta": 1000 }));
        assert!(intent.validate().is_err());

        let intent = parse(json!({ "type": "red_cards", "side": "home", "count": 2 }));
        assert!(intent.validate().is_ok());
        let intent = parse(json!({ "type": "red_cards", "side": "home", "count": 500 }));
        assert!(intent.validate().is_err());
    }

    #[test]
    fn logos_must_be_inline_images() {
        let intent = parse(json!({
            "type": "logo",
            "side": "away",
            "logo": "https://example.com/crest.png",
        }));
        assert!(intent.validate().is_err());

        let intent = parse(json!({
            "type": "logo",
            "side": "away",
            "logo": "data:image/png;base64,iVBORw0KGgo=",
        }));
        assert!(intent.validate().is_ok());
    }

    #[test]
    fn empty_names_are_accepted_and_long_ones_rejected() {
        let intent = parse(json!({ "type": "name", "side": "home", "name": "" }));
        assert!(intent.validate().is_ok());

        let name = "x".repeat(65);
        let intent = parse(json!({ "type": "name", "side": "home", "name": name }));
        assert!(intent.validate().is_err());
    }
}
