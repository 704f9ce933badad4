//! Per-output exclusivity token.
//!
//! Only one interactive extension may drive an output's input and
//! animation at a time.  The slot is brokered by the host and shared by
//! every extension on that output; acquiring it never blocks.  A successful
//! acquisition returns an [`ExclusiveGrant`] that frees the slot when it is
//! dropped, so every exit path (normal completion, abort, teardown, panic
//! unwinding) releases it.

use log::debug;
use std::cell::Cell;
use std::rc::Rc;

/// The shared slot.  Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveSlot {
    holder: Rc<Cell<Option<&'static str>>>,
}

/// The slot is held by another owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("exclusive mode already held by {holder}")]
pub struct SlotBusy {
    pub holder: &'static str,
}

impl ExclusiveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the current holder, if any.
    pub fn holder(&self) -> Option<&'static str> {
        self.holder.get()
    }

    pub fn is_held(&self) -> bool {
        self.holder.get().is_some()
    }

    /// Try to take the slot for `owner`.
    ///
    /// Fails immediately if anyone holds it, including `owner` itself.
    pub fn try_acquire(&self, owner: &'static str) -> Result<ExclusiveGrant, SlotBusy> {
        if let Some(holder) = self.holder.get() {
            return Err(SlotBusy { holder });
        }
        self.holder.set(Some(owner));
        debug!("exclusive slot acquired by {}", owner);
        Ok(ExclusiveGrant {
            holder: Rc::clone(&self.holder),
            owner,
        })
    }
}

/// Proof of holding the slot.  Dropping it releases the slot.
#[derive(Debug)]
pub struct ExclusiveGrant {
    holder: Rc<Cell<Option<&'static str>>>,
    owner: &'static str,
}

impl ExclusiveGrant {
    pub fn owner(&self) -> &'static str {
        self.owner
    }
}

impl Drop for ExclusiveGrant {
    fn drop(&mut self) {
        if self.holder.get() == Some(self.owner) {
            self.holder.set(None);
            debug!("exclusive slot released by {}", self.owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_on_drop() {
        let slot = ExclusiveSlot::new();
        {
            let grant = slot.try_acquire("vswitch").unwrap();
            assert_eq!(grant.owner(), "vswitch");
            assert_eq!(slot.holder(), Some("vswitch"));
        }
        assert!(!slot.is_held());
    }

    #[test]
    fn second_acquire_fails_closed() {
        let slot = ExclusiveSlot::new();
        let _expo = slot.try_acquire("expo").unwrap();
        let err = slot.try_acquire("vswitch").unwrap_err();
        assert_eq!(err, SlotBusy { holder: "expo" });
        assert_eq!(slot.holder(), Some("expo"));
    }

    #[test]
    fn clones_share_the_slot() {
        let slot = ExclusiveSlot::new();
        let other = slot.clone();
        let grant = slot.try_acquire("vswitch").unwrap();
        assert!(other.try_acquire("scale").is_err());
        drop(grant);
        assert!(other.try_acquire("scale").is_ok());
    }

    #[test]
    fn release_survives_unwinding() {
        let slot = ExclusiveSlot::new();
        let inner = slot.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _grant = inner.try_acquire("vswitch").unwrap();
            panic!("teardown gone wrong");
        }));
        assert!(result.is_err());
        assert!(!slot.is_held());
    }
}
