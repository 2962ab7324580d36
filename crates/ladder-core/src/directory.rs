//! # External Directory
//!
//! Read-only collaborators the core consults but never writes:
//! - [`PortfolioDirectory`]: which startups belong to which incubator
//! - [`FinancialSource`]: funding goals and investment rounds
//!
//! [`StaticDirectory`] implements both from plain data, loaded by the app
//! layer from a TOML file or built in tests.

use crate::primitives::MINOR_UNITS_PER_MAJOR;
use crate::{IncubatorId, LadderError, StartupId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Association lookup between incubators and startups.
pub trait PortfolioDirectory {
    /// Startups currently associated with `incubator`, ascending.
    fn startups_of(&self, incubator: IncubatorId) -> Vec<StartupId>;

    /// Check if `startup` belongs to the portfolio of `incubator`.
    fn is_associated(&self, incubator: IncubatorId, startup: StartupId) -> bool {
        self.startups_of(incubator).contains(&startup)
    }
}

/// Financial figures of a startup.
pub trait FinancialSource {
    /// Funding goal, if the startup declared one.
    fn funding_goal(&self, startup: StartupId) -> Option<Money>;

    /// Investment rounds of the startup.
    fn rounds(&self, startup: StartupId) -> Vec<InvestmentRound>;

    /// Sum of `COMMITTED` investor amounts across every round.
    fn committed(&self, startup: StartupId) -> Money {
        self.rounds(startup)
            .iter()
            .map(InvestmentRound::committed)
            .fold(Money::ZERO, Money::saturating_add)
    }
}

// =============================================================================
// MONEY
// =============================================================================

/// An amount in minor units (cents).
///
/// Parsed from decimal strings such as `"1500.50"` or from integers, which
/// are read as whole currency units. Rendered as a two-decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Build from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Build from whole currency units.
    pub fn from_major(major: i64) -> Result<Self, LadderError> {
        major
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .map(Self)
            .ok_or_else(|| LadderError::Validation(format!("amount {} overflows", major)))
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Parse a decimal amount with at most two fractional digits.
    pub fn parse(s: &str) -> Result<Self, LadderError> {
        let invalid = || LadderError::Validation(format!("invalid amount '{}'", s));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if digits.ends_with('.') {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let minor = whole
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|m| m.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Money(if negative { -minor } else { minor }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl FromStr for Money {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Major(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Major(major) => Money::from_major(major).map_err(serde::de::Error::custom),
            Repr::Text(text) => Money::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// INVESTMENT ROUNDS
// =============================================================================

/// Pipeline status of an investor within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestorStatus {
    Contacted,
    PitchSent,
    MeetingScheduled,
    DueDiligence,
    TermSheet,
    Committed,
}

/// One investor's position in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorEntry {
    pub name: String,
    pub status: InvestorStatus,
    #[serde(default)]
    pub amount: Money,
}

/// An investment round and its investor pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentRound {
    pub name: String,
    #[serde(default)]
    pub target_amount: Money,
    #[serde(default)]
    pub investors: Vec<InvestorEntry>,
}

impl InvestmentRound {
    /// Sum of `COMMITTED` investor amounts in this round.
    #[must_use]
    pub fn committed(&self) -> Money {
        self.investors
            .iter()
            .filter(|i| i.status == InvestorStatus::Committed)
            .map(|i| i.amount)
            .fold(Money::ZERO, Money::saturating_add)
    }
}

// =============================================================================
// STATIC DIRECTORY
// =============================================================================

/// In-process directory backed by plain maps.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    portfolios: BTreeMap<IncubatorId, BTreeSet<StartupId>>,
    funding_goals: BTreeMap<StartupId, Money>,
    rounds: BTreeMap<StartupId, Vec<InvestmentRound>>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `startup` to the portfolio of `incubator`.
    #[must_use]
    pub fn associate(mut self, incubator: IncubatorId, startup: StartupId) -> Self {
        self.portfolios.entry(incubator).or_default().insert(startup);
        self
    }

    #[must_use]
    pub fn set_funding_goal(mut self, startup: StartupId, goal: Money) -> Self {
        self.funding_goals.insert(startup, goal);
        self
    }

    #[must_use]
    pub fn add_round(mut self, startup: StartupId, round: InvestmentRound) -> Self {
        self.rounds.entry(startup).or_default().push(round);
        self
    }
}

impl PortfolioDirectory for StaticDirectory {
    fn startups_of(&self, incubator: IncubatorId) -> Vec<StartupId> {
        self.portfolios
            .get(&incubator)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn is_associated(&self, incubator: IncubatorId, startup: StartupId) -> bool {
        self.portfolios
            .get(&incubator)
            .is_some_and(|set| set.contains(&startup))
    }
}

impl FinancialSource for StaticDirectory {
    fn funding_goal(&self, startup: StartupId) -> Option<Money> {
        self.funding_goals.get(&startup).copied()
    }

    fn rounds(&self, startup: StartupId) -> Vec<InvestmentRound> {
        self.rounds.get(&startup).cloned().unwrap_or_default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
