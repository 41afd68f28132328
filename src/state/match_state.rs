use serde::{Deserialize, Serialize};

/// Highest value the match clock minutes can reach.
pub const MAX_MINUTES: u32 = 99;
/// Highest value the match clock seconds can reach.
pub const MAX_SECONDS: u32 = 59;
/// Maximum number of red cards shown per team.
pub const MAX_RED_CARDS: u32 = 4;
/// Maximum number of added minutes announced by the fourth official.
pub const MAX_EXTRA_TIME: u32 = 15;
/// Maximum number of characters of a team short name.
pub const MAX_NAME_CHARS: usize = 4;

/// Which team an intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Team shown on the left of the overlay.
    Home,
    /// Team shown on the right of the overlay.
    Away,
}

/// Field of the match clock targeted by a manual adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockField {
    /// Whole minutes.
    Minutes,
    /// Seconds within the current minute.
    Seconds,
}

/// Half currently being played, serialized with the broadcast short codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    /// First half (`1T`).
    #[default]
    #[serde(rename = "1T")]
    FirstHalf,
    /// Second half (`2T`).
    #[serde(rename = "2T")]
    SecondHalf,
}

impl Period {
    /// Short code displayed on the overlay.
    pub fn code(self) -> &'static str {
        match self {
            Period::FirstHalf => "1T",
            Period::SecondHalf => "2T",
        }
    }
}

/// Per-team block of the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamState {
    /// Opaque image payload (usually a `data:` URL).
    pub logo: Option<String>,
    /// Short name, at most [`MAX_NAME_CHARS`] upper-case characters.
    pub name: String,
    /// Goals scored.
    pub score: u32,
    /// Red cards received, in `0..=MAX_RED_CARDS`.
    pub red_cards: u32,
}

impl TeamState {
    fn named(name: &str) -> Self {
        Self {
            logo: None,
            name: name.to_string(),
            score: 0,
            red_cards: 0,
        }
    }
}

/// Count-up match clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockState {
    /// Elapsed minutes, in `0..=MAX_MINUTES`.
    pub minutes: u32,
    /// Elapsed seconds, in `0..=MAX_SECONDS`.
    pub seconds: u32,
    /// Whether the clock ticker should advance the clock.
    pub is_running: bool,
}

impl ClockState {
    /// Render the clock as `MM:SS`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Penalty shoot-out block, only shown when `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyShootout {
    /// Whether the shoot-out panel is displayed.
    pub active: bool,
    /// Penalties converted by the home team.
    pub home_score: u32,
    /// Penalties converted by the away team.
    pub away_score: u32,
}

/// The single synchronized scoreboard document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    /// Home team block.
    pub home_team: TeamState,
    /// Away team block.
    pub away_team: TeamState,
    /// Match clock.
    pub timer: ClockState,
    /// Half being played.
    pub period: Period,
    /// Added minutes, in `0..=MAX_EXTRA_TIME`.
    pub extra_time: u32,
    /// Penalty shoot-out panel.
    pub penalties: PenaltyShootout,
}

impl Default for MatchState {
    /// HOME 0 – AWAY 0, clock stopped at 00:00, first half, no penalties.
    fn default() -> Self {
        Self {
            home_team: TeamState::named("HOME"),
            away_team: TeamState::named("AWAY"),
            timer: ClockState::default(),
            period: Period::FirstHalf,
            extra_time: 0,
            penalties: PenaltyShootout::default(),
        }
    }
}

impl MatchState {
    /// Borrow the block of the given team.
    pub fn team(&self, side: Side) -> &TeamState {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub(crate) fn team_mut(&mut self, side: Side) -> &mut TeamState {
        match side {
            Side::Home => &mut self.home_team,
            Side::Away => &mut self.away_team,
        }
    }

    /// Penalty score of the given team.
    pub fn penalty_score(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.penalties.home_score,
            Side::Away => self.penalties.away_score,
        }
    }

    /// Added time as shown on the overlay (`+N`), empty when none.
    pub fn extra_time_display(&self) -> String {
        if self.extra_time > 0 {
            format!("+{}", self.extra_time)
        } else {
            String::new()
        }
    }
}

/// Upper-case a team name and keep its first [`MAX_NAME_CHARS`] characters.
pub fn normalize_team_name(raw: &str) -> String {
    raw.to_uppercase().chars().take(MAX_NAME_CHARS).collect()
}

/// Clamp a requested counter value into `0..=max`.
pub(crate) fn clamp_count(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_wire_document() {
        let value = serde_json::to_value(MatchState::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "homeTeam": { "logo": null, "name": "HOME", "score": 0, "redCards": 0 },
                "awayTeam": { "logo": null, "name": "AWAY", "score": 0, "redCards": 0 },
                "timer": { "minutes": 0, "seconds": 0, "isRunning": false },
                "period": "1T",
                "extraTime": 0,
                "penalties": { "active": false, "homeScore": 0, "awayScore": 0 }
            })
        );
    }

    #[test]
    fn team_names_are_truncated_and_uppercased() {
        assert_eq!(normalize_team_name("brazil"), "BRAZ");
        assert_eq!(normalize_team_name("fc"), "FC");
        assert_eq!(normalize_team_name(""), "");
        assert_eq!(normalize_team_name("são paulo"), "SÃO ");
    }

    #[test]
    fn display_helpers() {
        let mut state = MatchState::default();
        state.timer.minutes = 7;
        state.timer.seconds = 5;
        assert_eq!(state.timer.display(), "07:05");
        assert_eq!(state.extra_time_display(), "");
        state.extra_time = 3;
        assert_eq!(state.extra_time_display(), "+3");
        assert_eq!(Period::SecondHalf.code(), "2T");
    }
}
