//! Quota and security policy gate
//!
//! Runs before an error event is handed to the batched writer. Root spans
//! count against the same quota but are never rejected by it.

use thiserror::Error;

use crate::domain::{Project, SecurityPolicy};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Monthly event quota exceeded")]
    QuotaExceeded,
    #[error("Security policy violation: IP not allowed")]
    IpNotAllowed,
}

/// Check quota and IP policy for one incoming error event
pub fn check(project: &Project, policy: &SecurityPolicy, client_ip: &str) -> Result<(), GateError> {
    if project.quota_exceeded() {
        return Err(GateError::QuotaExceeded);
    }
    if !policy.allows(client_ip) {
        return Err(GateError::IpNotAllowed);
    }
    Ok(())
}
