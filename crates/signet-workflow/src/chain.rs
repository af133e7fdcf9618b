//! The role-ordered signature slot vector shared by documents and forms.
//!
//! # Invariant
//!
//! The set of occupied slots is always a prefix of the role order: role *k*
//! can be signed only when roles `0..k` are signed, and revoking role *k*
//! clears roles `k..N`. A downstream signature attests that upstream steps
//! were valid, so invalidating an upstream step invalidates everything built
//! on it.

use serde::{Deserialize, Serialize};

use crate::{Signature, SignatureRole, WorkflowError};

// ---------------------------------------------------------------------------
// SignatureChain
// ---------------------------------------------------------------------------

/// Ordered signature slots for one entity.
///
/// The chain itself is untyped over roles; the owning entity exposes a typed
/// API ([`Document::sign`](crate::Document::sign) takes a
/// [`DocumentRole`](signet_core::DocumentRole), etc.) and passes the role
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureChain {
    slots: Vec<Option<Signature>>,
}

impl SignatureChain {
    /// Creates an empty chain with `len` slots.
    #[must_use]
    pub fn with_slots(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// The signature in `role`'s slot, if present.
    #[must_use]
    pub fn get<R: SignatureRole>(&self, role: R) -> Option<&Signature> {
        self.slots.get(role.ordinal()).and_then(Option::as_ref)
    }

    /// Number of occupied slots.
    ///
    /// Under the prefix invariant this equals the furthest signed role's
    /// ordinal plus one.
    #[must_use]
    pub fn signed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// `true` when every slot is occupied.
    #[must_use]
    pub fn fully_signed(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Occupancy vector, in role order.
    #[must_use]
    pub fn occupancy(&self) -> Vec<bool> {
        self.slots.iter().map(Option::is_some).collect()
    }

    /// Verifies the prefix invariant.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvariantViolation`] if an occupied slot
    /// follows an empty one. Sign-time ordering makes that unreachable
    /// through this API; it can only mean the persisted entity was mutated
    /// outside the workflow.
    pub fn check_contiguous(&self) -> Result<(), WorkflowError> {
        let mut gap_at: Option<usize> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            match (slot, gap_at) {
                (None, None) => gap_at = Some(i),
                (Some(_), Some(gap)) => {
                    return Err(WorkflowError::InvariantViolation(format!(
                        "slot {i} is signed but slot {gap} is not"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Occupies `role`'s slot.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::AlreadySigned`] if the slot is occupied.
    /// - [`WorkflowError::OrderingViolation`] if the preceding role has not
    ///   signed.
    /// - [`WorkflowError::InvariantViolation`] if the stored slots already
    ///   violate the prefix invariant.
    pub fn sign<R: SignatureRole + 'static>(
        &mut self,
        role: R,
        signature: Signature,
    ) -> Result<(), WorkflowError> {
        self.check_contiguous()?;

        let idx = role.ordinal();
        if self.slots[idx].is_some() {
            return Err(WorkflowError::AlreadySigned {
                role: role.to_string(),
            });
        }
        if idx > 0 && self.slots[idx - 1].is_none() {
            return Err(WorkflowError::OrderingViolation {
                role: role.to_string(),
                missing: R::roster()[idx - 1].to_string(),
            });
        }

        self.slots[idx] = Some(signature);
        Ok(())
    }

    /// Clears `role`'s slot and every slot after it, returning the roles
    /// that were cleared (in role order).
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NotSigned`] if the named slot is empty.
    /// - [`WorkflowError::InvariantViolation`] if the stored slots already
    ///   violate the prefix invariant.
    pub fn revoke<R: SignatureRole + 'static>(&mut self, role: R) -> Result<Vec<R>, WorkflowError> {
        self.check_contiguous()?;

        let idx = role.ordinal();
        if self.slots[idx].is_none() {
            return Err(WorkflowError::NotSigned {
                role: role.to_string(),
            });
        }

        let mut cleared = Vec::new();
        for r in R::roster().iter().copied() {
            if r.ordinal() >= idx && self.slots[r.ordinal()].take().is_some() {
                cleared.push(r);
            }
        }
        Ok(cleared)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
