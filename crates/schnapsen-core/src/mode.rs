use serde::Deserialize;

/// The source variants disagree on what a `card_unavailable` event means, so
/// the behavior is a deployment choice rather than a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// The event is informational only.
    #[default]
    Ignore,
    /// The card is marked resolved.
    Resolve,
}

/// Per-mode knobs for the match session. One session implementation covers
/// every mode; only this table differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub announce_enabled: bool,
    pub draw_enabled: bool,
    /// Whether a round result starts the next round (bummerl) or ends the
    /// session (speed).
    pub multi_round: bool,
    pub unavailable: UnavailablePolicy,
}

impl ModePolicy {
    pub const fn speed() -> Self {
        Self {
            announce_enabled: true,
            draw_enabled: true,
            multi_round: false,
            unavailable: UnavailablePolicy::Ignore,
        }
    }

    pub const fn bummerl() -> Self {
        Self {
            announce_enabled: true,
            draw_enabled: true,
            multi_round: true,
            unavailable: UnavailablePolicy::Ignore,
        }
    }

    pub fn for_mode(mode: &str) -> Option<Self> {
        match mode {
            "speed" => Some(Self::speed()),
            "bummerl" => Some(Self::bummerl()),
            _ => None,
        }
    }

    pub fn with_unavailable(mut self, policy: UnavailablePolicy) -> Self {
        self.unavailable = policy;
        self
    }
}
