//! BFS pathfinding types.

use crate::core::GridPoint;
use serde::{Deserialize, Serialize};

/// Reason a path query produced no path.
///
/// Serialized as the wire code consumers receive in responses and events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathFailure {
    /// Start or target lies outside `[0,width) x [0,height)`
    #[serde(rename = "start_or_target_out_of_bounds")]
    StartOrTargetOutOfBounds,
    /// Start cell is occupied
    #[serde(rename = "start_blocked")]
    StartBlocked,
    /// Target cell is occupied
    #[serde(rename = "target_blocked")]
    TargetBlocked,
    /// Search exhausted the reachable region without touching the target
    #[serde(rename = "path_not_found")]
    NoPath,
    /// The moving actor has no known status (simulator-level failure)
    #[serde(rename = "actor_status_not_found")]
    ActorStatusNotFound,
}

impl PathFailure {
    /// Wire code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            Self::StartOrTargetOutOfBounds => "start_or_target_out_of_bounds",
            Self::StartBlocked => "start_blocked",
            Self::TargetBlocked => "target_blocked",
            Self::NoPath => "path_not_found",
            Self::ActorStatusNotFound => "actor_status_not_found",
        }
    }
}

/// Result of a path query.
///
/// A missing path is a normal planning outcome, never an error: `found` is
/// false and `reason` carries the failure code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    /// Whether a path was found
    pub found: bool,
    /// Cells from start to target inclusive (empty when not found)
    pub path: Vec<GridPoint>,
    /// Failure code when not found
    pub reason: Option<PathFailure>,
}

impl PathResult {
    /// Successful result over the given path
    pub fn success(path: Vec<GridPoint>) -> Self {
        Self {
            found: true,
            path,
            reason: None,
        }
    }

    /// Failed result with a reason code
    pub fn failed(reason: PathFailure) -> Self {
        Self {
            found: false,
            path: Vec::new(),
            reason: Some(reason),
        }
    }

    /// Path length in cells
    pub fn length_cells(&self) -> usize {
        self.path.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_as_wire_code() {
        let result = PathResult::failed(PathFailure::NoPath);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["found"], false);
        assert_eq!(json["reason"], "path_not_found");
        assert_eq!(json["path"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_codes_match_serde_form() {
        for failure in [
            PathFailure::StartOrTargetOutOfBounds,
            PathFailure::StartBlocked,
            PathFailure::TargetBlocked,
            PathFailure::NoPath,
            PathFailure::ActorStatusNotFound,
        ] {
            let json = serde_json::to_value(failure).unwrap();
            assert_eq!(json.as_str().unwrap(), failure.code());
        }
    }
}
