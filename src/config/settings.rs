//! # Operation Settings
//!
//! Run-wide switches shared by every rotator.

use std::fmt;
use zeroize::Zeroizing;

/// Switches and operator-supplied values for one run
#[derive(Clone, Default)]
pub struct OperationSettings {
    /// Write even when the credential exists or is not yet due
    pub force: bool,
    /// Evaluate and report, but never mutate the vault
    pub what_if: bool,
    /// Primary value supplied by the operator (secret value or PFX)
    pub secret_value_1: Zeroizing<String>,
    /// Secondary value supplied by the operator (PFX import password)
    pub secret_value_2: Zeroizing<String>,
}

impl OperationSettings {
    #[must_use]
    pub fn new(force: bool, what_if: bool) -> Self {
        Self {
            force,
            what_if,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_secret_values(mut self, value_1: impl Into<String>, value_2: impl Into<String>) -> Self {
        self.secret_value_1 = Zeroizing::new(value_1.into());
        self.secret_value_2 = Zeroizing::new(value_2.into());
        self
    }
}

impl fmt::Debug for OperationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSettings")
            .field("force", &self.force)
            .field("what_if", &self.what_if)
            .field("secret_value_1", &"<redacted>")
            .field("secret_value_2", &"<redacted>")
            .finish()
    }
}
