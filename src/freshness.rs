//! Match status classification and the cache freshness policy.
//!
//! How long fetched football data may be served from cache depends on where
//! the match is in its lifecycle: live data goes stale within minutes,
//! fixtures rarely change before kickoff, and final results never change.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upstream short status code, as published by the fixture provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    /// `TBD`: kickoff time not yet fixed.
    TimeToBeDefined,
    /// `NS`
    NotStarted,
    /// `1H`
    FirstHalf,
    /// `HT`
    HalfTime,
    /// `2H`
    SecondHalf,
    /// `ET`
    ExtraTime,
    /// `BT`: break before extra time.
    BreakTime,
    /// `P`: penalty shootout in progress.
    Penalties,
    /// `SUSP`
    Suspended,
    /// `INT`
    Interrupted,
    /// `LIVE`: in progress without period detail.
    Live,
    /// `FT`
    FullTime,
    /// `AET`
    AfterExtraTime,
    /// `PEN`: finished after a shootout.
    FinishedOnPenalties,
    /// `PST`
    Postponed,
    /// `CANC`
    Cancelled,
    /// `ABD`
    Abandoned,
    /// `AWD`: technical loss.
    Awarded,
    /// `WO`
    Walkover,
    /// Anything the provider sends that is not listed above.
    Unknown(String),
}

/// Coarse lifecycle phase derived from a [`MatchStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    NotStarted,
    InProgress,
    Finished,
    /// Cancelled, abandoned, awarded or walked over: the match was not played out.
    Void,
    Unrecognized,
}

impl MatchStatus {
    /// Parse a provider short code. Never fails: unknown codes are preserved.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "TBD" => Self::TimeToBeDefined,
            "NS" => Self::NotStarted,
            "1H" => Self::FirstHalf,
            "HT" => Self::HalfTime,
            "2H" => Self::SecondHalf,
            "ET" => Self::ExtraTime,
            "BT" => Self::BreakTime,
            "P" => Self::Penalties,
            "SUSP" => Self::Suspended,
            "INT" => Self::Interrupted,
            "LIVE" => Self::Live,
            "FT" => Self::FullTime,
            "AET" => Self::AfterExtraTime,
            "PEN" => Self::FinishedOnPenalties,
            "PST" => Self::Postponed,
            "CANC" => Self::Cancelled,
            "ABD" => Self::Abandoned,
            "AWD" => Self::Awarded,
            "WO" => Self::Walkover,
            _ => Self::Unknown(code.trim().to_string()),
        }
    }

    /// The provider short code for this status.
    pub fn code(&self) -> &str {
        match self {
            Self::TimeToBeDefined => "TBD",
            Self::NotStarted => "NS",
            Self::FirstHalf => "1H",
            Self::HalfTime => "HT",
            Self::SecondHalf => "2H",
            Self::ExtraTime => "ET",
            Self::BreakTime => "BT",
            Self::Penalties => "P",
            Self::Suspended => "SUSP",
            Self::Interrupted => "INT",
            Self::Live => "LIVE",
            Self::FullTime => "FT",
            Self::AfterExtraTime => "AET",
            Self::FinishedOnPenalties => "PEN",
            Self::Postponed => "PST",
            Self::Cancelled => "CANC",
            Self::Abandoned => "ABD",
            Self::Awarded => "AWD",
            Self::Walkover => "WO",
            Self::Unknown(code) => code,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        match self {
            Self::TimeToBeDefined | Self::NotStarted | Self::Postponed => MatchPhase::NotStarted,
            Self::FirstHalf
            | Self::HalfTime
            | Self::SecondHalf
            | Self::ExtraTime
            | Self::BreakTime
            | Self::Penalties
            | Self::Suspended
            | Self::Interrupted
            | Self::Live => MatchPhase::InProgress,
            Self::FullTime | Self::AfterExtraTime | Self::FinishedOnPenalties => {
                MatchPhase::Finished
            }
            Self::Cancelled | Self::Abandoned | Self::Awarded | Self::Walkover => MatchPhase::Void,
            Self::Unknown(_) => MatchPhase::Unrecognized,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for MatchStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// Cache lifetimes, one per lifecycle phase plus the non-match resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessConfig {
    pub live: Duration,
    pub scheduled: Duration,
    pub finished: Duration,
    /// Used for unrecognized statuses, and the ceiling for any collection.
    pub default: Duration,
    pub squad: Duration,
    pub news: Duration,
    pub social: Duration,
    /// Competition list for a season.
    pub leagues: Duration,
    pub standings: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(5 * 60),
            scheduled: Duration::from_secs(6 * 60 * 60),
            finished: Duration::from_secs(24 * 60 * 60),
            default: Duration::from_secs(60 * 60),
            squad: Duration::from_secs(24 * 60 * 60),
            news: Duration::from_secs(30 * 60),
            social: Duration::from_secs(15 * 60),
            leagues: Duration::from_secs(12 * 60 * 60),
            standings: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl FreshnessConfig {
    /// Live data must never outlive the fallback, and the fallback must sit
    /// between the live and scheduled lifetimes.
    pub fn validate(&self) -> Result<(), String> {
        if self.live.is_zero() {
            return Err("live TTL must be greater than zero".to_string());
        }
        if !(self.live <= self.default
            && self.default <= self.scheduled
            && self.scheduled <= self.finished)
        {
            return Err(format!(
                "TTLs must satisfy live <= default <= scheduled <= finished (got {:?} / {:?} / {:?} / {:?})",
                self.live, self.default, self.scheduled, self.finished
            ));
        }
        Ok(())
    }
}

/// Maps the status of fetched data to the TTL it is cached under.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessPolicy {
    config: FreshnessConfig,
}

impl FreshnessPolicy {
    pub fn new(config: FreshnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    /// TTL for data about a single match.
    pub fn ttl_for(&self, status: &MatchStatus) -> Duration {
        match status.phase() {
            MatchPhase::InProgress => self.config.live,
            MatchPhase::NotStarted => self.config.scheduled,
            MatchPhase::Finished | MatchPhase::Void => self.config.finished,
            MatchPhase::Unrecognized => self.config.default,
        }
    }

    /// TTL for a collection of matches: the shortest member TTL, capped at the
    /// default. One live match keeps the whole collection short-lived.
    pub fn ttl_for_collection<'a, I>(&self, statuses: I) -> Duration
    where
        I: IntoIterator<Item = &'a MatchStatus>,
    {
        statuses
            .into_iter()
            .map(|status| self.ttl_for(status))
            .fold(self.config.default, Duration::min)
    }

    pub fn squad_ttl(&self) -> Duration {
        self.config.squad
    }

    pub fn news_ttl(&self) -> Duration {
        self.config.news
    }

    pub fn social_ttl(&self) -> Duration {
        self.config.social
    }

    pub fn leagues_ttl(&self) -> Duration {
        self.config.leagues
    }

    pub fn standings_ttl(&self) -> Duration {
        self.config.standings
    }
}
