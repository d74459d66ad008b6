//! Call context: who is calling, and how much value rides along.

use remit_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::error::RemittanceError;

/// The caller identity and attached value of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Identity submitting the call.
    pub caller: Address,
    /// Value attached to the call, moved from `caller` by payable operations.
    pub value: u64,
}

impl CallContext {
    /// A call from `caller` carrying no value.
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    /// A call from `caller` carrying `value`.
    pub fn with_value(caller: Address, value: u64) -> Self {
        Self { caller, value }
    }

    /// Rejects value attached to an operation that does not accept it.
    pub(crate) fn ensure_non_payable(&self, action: &str) -> Result<(), RemittanceError> {
        if self.value != 0 {
            return Err(RemittanceError::InvalidArgument(format!(
                "{action} is not payable (got value {})",
                self.value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_payable_rejects_value() {
        let caller = Address::from_label("alice");
        assert!(CallContext::new(caller).ensure_non_payable("withdraw").is_ok());
        let err = CallContext::with_value(caller, 1)
            .ensure_non_payable("withdraw")
            .unwrap_err();
        assert!(matches!(err, RemittanceError::InvalidArgument(msg) if msg.contains("withdraw")));
    }
}
