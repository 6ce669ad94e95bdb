use serde::Serialize;

use crate::target::Target;

/// Why a target could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableCause {
    Timeout,
    Refused,
}

impl std::fmt::Display for UnreachableCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreachableCause::Timeout => write!(f, "timeout"),
            UnreachableCause::Refused => write!(f, "refused"),
        }
    }
}

/// Terminal classification of one probe. Exactly one is produced per
/// enqueued descriptor; no probe failure escapes as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    MatchedTarget { version: String },
    OtherVersion { version: String, build_id: String },
    AuthRequired,
    Unreachable { cause: UnreachableCause },
    UnexpectedError { message: String },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::MatchedTarget { version } => {
                write!(f, "redis {version} (matched target)")
            }
            Outcome::OtherVersion { version, build_id } => {
                write!(f, "redis {version} (build id: {build_id})")
            }
            Outcome::AuthRequired => write!(f, "authentication required"),
            Outcome::Unreachable { cause } => write!(f, "unreachable ({cause})"),
            Outcome::UnexpectedError { message } => write!(f, "error: {message}"),
        }
    }
}

/// One emitted result, tagged with the originating endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub host: String,
    pub port: u16,
    pub outcome: Outcome,
}

impl ProbeReport {
    pub fn new(target: &Target, outcome: Outcome) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            outcome,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            Outcome::MatchedTarget {
                version: "8.2.1".into()
            }
            .to_string(),
            "redis 8.2.1 (matched target)"
        );
        assert_eq!(
            Outcome::Unreachable {
                cause: UnreachableCause::Timeout
            }
            .to_string(),
            "unreachable (timeout)"
        );
        assert_eq!(Outcome::AuthRequired.to_string(), "authentication required");
    }
}
