//! Monitor configuration identity.

use crate::suite::CheckSuite;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a monitor configuration.
///
/// Two runs with equal digests executed the same suites, in the same order,
/// against the same targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorSpec {
    /// Names of the enabled suites in execution order.
    pub suite_names: Vec<String>,

    /// SHA-256 digest of ordered (name, target) pairs.
    pub suites_digest: String,
}

impl MonitorSpec {
    /// Derive the identity of the enabled suites.
    pub fn new(suites: &[CheckSuite]) -> Self {
        let enabled: Vec<&CheckSuite> = suites.iter().filter(|s| s.enabled).collect();
        let suites_digest = compute_suites_digest(&enabled);
        Self {
            suite_names: enabled.iter().map(|s| s.name.clone()).collect(),
            suites_digest,
        }
    }
}

/// Abbreviate a digest for display. Digests read back from a report may not be
/// hex, so a prefix that would split a character leaves the digest whole.
pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Compute deterministic digest of ordered suite names and targets.
fn compute_suites_digest(suites: &[&CheckSuite]) -> String {
    let mut hasher = Sha256::new();
    for suite in suites {
        hasher.update(suite.name.as_bytes());
        hasher.update(b"\0");
        hasher.update(suite.target.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
