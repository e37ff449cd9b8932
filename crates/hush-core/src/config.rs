//! Mediator configuration.

use serde::{Deserialize, Serialize};

use crate::{MediatorError, Result};

/// Default batch size for bulk resend paging.
pub const DEFAULT_RESEND_FETCH_SIZE: usize = 100;

/// Options recognized by the mediator core.
///
/// Everything else (server addresses, key locations, peer lists) belongs
/// to the external collaborators that host this core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// How many stored transactions a bulk resend fetches per page.
    pub resend_fetch_size: usize,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            resend_fetch_size: DEFAULT_RESEND_FETCH_SIZE,
        }
    }
}

impl MediatorConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `resend_fetch_size` is zero, which would make
    /// the bulk-resend scan loop forever without advancing.
    pub fn validate(&self) -> Result<()> {
        if self.resend_fetch_size == 0 {
            return Err(MediatorError::Config(
                "resend_fetch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
