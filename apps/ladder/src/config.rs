//! # Directory Configuration
//!
//! Loads the association directory and financial records from a TOML file.
//!
//! ```toml
//! [[incubators]]
//! id = 3
//! name = "North Lab"
//! startups = [7, 8]
//!
//! [[startups]]
//! id = 7
//! name = "Acme Robotics"
//! funding_goal = "150000.00"
//!
//! [[startups.rounds]]
//! name = "Seed"
//! target_amount = 100000
//!
//! [[startups.rounds.investors]]
//! name = "Harbor Ventures"
//! status = "COMMITTED"
//! amount = "50000"
//! ```
//!
//! Integer amounts are whole currency units; strings may carry up to two
//! decimals.

use ladder_core::{IncubatorId, InvestmentRound, LadderError, Money, StartupId, StaticDirectory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Maximum size of a directory file (10 MB).
const MAX_DIRECTORY_FILE_SIZE: u64 = 10 * 1024 * 1024;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// Top-level layout of the directory file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub incubators: Vec<IncubatorEntry>,
    #[serde(default)]
    pub startups: Vec<StartupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncubatorEntry {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub startups: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupEntry {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub funding_goal: Option<Money>,
    #[serde(default)]
    pub rounds: Vec<InvestmentRound>,
}

impl DirectoryFile {
    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, LadderError> {
        let file: DirectoryFile = toml::from_str(text)
            .map_err(|e| LadderError::Validation(format!("invalid directory file: {}", e)))?;
        file.validate()?;
        Ok(file)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, LadderError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            LadderError::Io(format!("cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_DIRECTORY_FILE_SIZE {
            return Err(LadderError::Validation(format!(
                "directory file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_DIRECTORY_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            LadderError::Io(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Reject duplicate incubator or startup entries.
    fn validate(&self) -> Result<(), LadderError> {
        let mut seen = BTreeSet::new();
        for incubator in &self.incubators {
            if !seen.insert(incubator.id) {
                return Err(LadderError::Validation(format!(
                    "incubator {} is listed twice",
                    incubator.id
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for startup in &self.startups {
            if !seen.insert(startup.id) {
                return Err(LadderError::Validation(format!(
                    "startup {} is listed twice",
                    startup.id
                )));
            }
        }
        Ok(())
    }

    /// Build the in-process directory.
    #[must_use]
    pub fn into_directory(self) -> StaticDirectory {
        let mut directory = StaticDirectory::new();
        for incubator in self.incubators {
            for startup in incubator.startups {
                directory = directory.associate(IncubatorId(incubator.id), StartupId(startup));
            }
        }
        for startup in self.startups {
            let id = StartupId(startup.id);
            if let Some(goal) = startup.funding_goal {
                directory = directory.set_funding_goal(id, goal);
            }
            for round in startup.rounds {
                directory = directory.add_round(id, round);
            }
        }
        directory
    }
}

/// Load the directory at `path`, or an empty one when no file is given.
pub fn load_directory(path: Option<&Path>) -> Result<StaticDirectory, LadderError> {
    let Some(path) = path else {
        tracing::warn!("No directory file given; every portfolio is empty");
        return Ok(StaticDirectory::new());
    };

    let file = DirectoryFile::load(path)?;
    tracing::info!(
        incubators = file.incubators.len(),
        startups = file.startups.len(),
        "Loaded directory from {}",
        path.display()
    );
    Ok(file.into_directory())
}

// =============================================================================
// TESTS
// =============================================================================
