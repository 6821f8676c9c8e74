use crate::quiz::types::{AccessInfo, QuotaLimit};
use crate::QuizError;
use uuid::Uuid;

/// Quota gate consulted before a session may start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessGate {
    /// A quota check is in flight; start is disabled until it lands
    Checking(Uuid),
    Known(AccessInfo),
    /// The check failed. Start is allowed and the backend enforces the quota.
    #[default]
    Unknown,
}

impl AccessGate {
    pub fn is_checking(&self) -> bool {
        matches!(self, AccessGate::Checking(_))
    }

    /// Reason start is refused, if any.
    ///
    /// `Ok(false)` means start is disabled without an error (check in flight).
    pub fn start_blocker(&self) -> std::result::Result<bool, QuizError> {
        match self {
            AccessGate::Checking(_) => Ok(false),
            AccessGate::Known(info) if !info.can_use => Err(QuizError::QuotaExceeded),
            AccessGate::Known(_) | AccessGate::Unknown => Ok(true),
        }
    }

    pub fn can_start(&self) -> bool {
        matches!(self.start_blocker(), Ok(true))
    }

    pub fn describe(&self) -> String {
        match self {
            AccessGate::Checking(_) => "checking".to_string(),
            AccessGate::Unknown => "unknown".to_string(),
            AccessGate::Known(info) => match info.limit {
                QuotaLimit::Unlimited => "unlimited".to_string(),
                QuotaLimit::Limited(limit) => format!("{} of {} remaining", info.remaining, limit),
            },
        }
    }
}
