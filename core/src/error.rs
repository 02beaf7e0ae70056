use std::fmt;
use std::time::Duration;

/// Errors raised by the benchmark core.
///
/// Trial-level failures always carry the scenario key and the candidate that
/// produced them so a report can attribute them without extra bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchError {
    /// A candidate's closure returned an error or panicked during a trial.
    Scenario {
        scenario: String,
        candidate: String,
        message: String,
    },
    /// An async trial's completion did not settle within the trial bound.
    Timeout {
        scenario: String,
        candidate: String,
        after: Duration,
    },
    /// An async trial's completion was dropped without ever settling.
    Abandoned { scenario: String, candidate: String },
    /// A closure returned the wrong kind of outcome for its scenario kind.
    Contract {
        scenario: String,
        candidate: String,
        message: String,
    },
    /// The fixed `Fastest is [...]` pattern was not found.
    Parse { input: String },
    DuplicateCandidate(String),
    UnknownCandidate(String),
    UnknownScenario(String),
    NoCandidates,
}

impl BenchError {
    pub fn scenario(scenario: &str, candidate: &str, message: impl Into<String>) -> Self {
        BenchError::Scenario {
            scenario: scenario.to_string(),
            candidate: candidate.to_string(),
            message: message.into(),
        }
    }

    pub fn contract(scenario: &str, candidate: &str, message: impl Into<String>) -> Self {
        BenchError::Contract {
            scenario: scenario.to_string(),
            candidate: candidate.to_string(),
            message: message.into(),
        }
    }

    /// Candidate the error is attributed to, if it came out of a trial.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            BenchError::Scenario { candidate, .. }
            | BenchError::Timeout { candidate, .. }
            | BenchError::Abandoned { candidate, .. }
            | BenchError::Contract { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::Scenario { .. } => "scenario",
            BenchError::Timeout { .. } => "timeout",
            BenchError::Abandoned { .. } => "abandoned",
            BenchError::Contract { .. } => "contract",
            BenchError::Parse { .. } => "parse",
            BenchError::DuplicateCandidate(_) => "duplicate_candidate",
            BenchError::UnknownCandidate(_) => "unknown_candidate",
            BenchError::UnknownScenario(_) => "unknown_scenario",
            BenchError::NoCandidates => "no_candidates",
        }
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Scenario {
                scenario,
                candidate,
                message,
            } => write!(f, "{} failed in '{}': {}", candidate, scenario, message),
            BenchError::Timeout {
                scenario,
                candidate,
                after,
            } => write!(
                f,
                "{} did not settle in '{}' within {:?}",
                candidate, scenario, after
            ),
            BenchError::Abandoned { scenario, candidate } => write!(
                f,
                "{} dropped its completion in '{}' without settling it",
                candidate, scenario
            ),
            BenchError::Contract {
                scenario,
                candidate,
                message,
            } => write!(f, "{} broke the '{}' contract: {}", candidate, scenario, message),
            BenchError::Parse { input } => {
                write!(f, "no 'Fastest is [...]' line in summary: {:?}", input)
            }
            BenchError::DuplicateCandidate(name) => write!(f, "candidate '{}' registered twice", name),
            BenchError::UnknownCandidate(name) => write!(f, "candidate '{}' not found", name),
            BenchError::UnknownScenario(key) => write!(f, "scenario '{}' not found", key),
            BenchError::NoCandidates => write!(f, "no candidates selected"),
        }
    }
}

impl std::error::Error for BenchError {}
