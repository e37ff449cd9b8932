//! Privacy modes for private transactions.

use serde::{Deserialize, Serialize};

use crate::{PayloadError, Result};

/// How strictly a private transaction constrains its participants.
///
/// The mode gates which validation rules apply when a payload references
/// prior transactions: `PrivateStateValidation` additionally requires
/// recipient-set equality and execution-hash checks across the whole
/// dependency graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyMode {
    /// Plain private transaction; no constraints on referenced transactions.
    StandardPrivate,
    /// Referenced transactions must share this privacy mode.
    PartyProtection,
    /// Full private-state validation: shared mode, equal recipient sets,
    /// and verified security hashes across all referenced transactions.
    PrivateStateValidation,
}

impl Default for PrivacyMode {
    fn default() -> Self {
        PrivacyMode::StandardPrivate
    }
}

impl PrivacyMode {
    /// Parse the wire flag carried by send requests.
    ///
    /// Flag values follow the consortium convention: 0 standard,
    /// 1 party protection, 3 private state validation.
    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(Self::StandardPrivate),
            1 => Ok(Self::PartyProtection),
            3 => Ok(Self::PrivateStateValidation),
            other => Err(PayloadError::UnknownPrivacyFlag(other)),
        }
    }

    /// The wire flag for this mode.
    pub fn flag(&self) -> u8 {
        match self {
            Self::StandardPrivate => 0,
            Self::PartyProtection => 1,
            Self::PrivateStateValidation => 3,
        }
    }

    /// Whether this mode requires the full private-state validation rules.
    pub fn is_psv(&self) -> bool {
        matches!(self, Self::PrivateStateValidation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_roundtrip() {
        for mode in [
            PrivacyMode::StandardPrivate,
            PrivacyMode::PartyProtection,
            PrivacyMode::PrivateStateValidation,
        ] {
            assert_eq!(PrivacyMode::from_flag(mode.flag()).unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(matches!(
            PrivacyMode::from_flag(2),
            Err(PayloadError::UnknownPrivacyFlag(2))
        ));
        assert!(PrivacyMode::from_flag(7).is_err());
    }

    #[test]
    fn test_is_psv() {
        assert!(PrivacyMode::PrivateStateValidation.is_psv());
        assert!(!PrivacyMode::StandardPrivate.is_psv());
        assert!(!PrivacyMode::PartyProtection.is_psv());
    }
}
