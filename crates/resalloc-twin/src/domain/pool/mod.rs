//! Resource Pool - Shared Ledger with Deferred Commit
//!
//! # Ledger
//!
//! For every resource type `r` the pool tracks:
//!
//! ```text
//! total[r]          fixed capacity
//! available[r]      grantable this cycle
//! pending[r]        released this cycle, grantable from the next cycle
//! ```
//!
//! Grants draw from `available` immediately. Releases only ever land in
//! `pending`; [`ResourcePool::commit`] folds them into `available` at the
//! cycle boundary. A unit released mid-cycle can therefore never be granted
//! to another task within the same cycle.
//!
//! # Conservation
//!
//! At every commit boundary, with `held[r]` summed over live tasks:
//!
//! ```text
//! available[r] + Σ held[r] == total[r]
//! ```
//!
//! Between boundaries `pending[r]` holds the difference.

use super::error::SimError;
use super::types::{ResourceId, Units};
use serde::Serialize;

#[cfg(kani)]
mod proofs;

/// Per-resource-type ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePool {
    total: Vec<Units>,
    available: Vec<Units>,
    pending: Vec<Units>,
}

impl ResourcePool {
    /// Create a pool with every unit available
    pub fn new(total: Vec<Units>) -> Self {
        let available = total.clone();
        let pending = vec![0; total.len()];
        Self {
            total,
            available,
            pending,
        }
    }

    /// Number of resource types
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.total.len()
    }

    /// Capacity of `resource`
    pub fn total_of(&self, resource: ResourceId) -> Result<Units, SimError> {
        self.slot(&self.total, resource)
    }

    /// Units of `resource` grantable this cycle
    pub fn available_of(&self, resource: ResourceId) -> Result<Units, SimError> {
        self.slot(&self.available, resource)
    }

    /// Units of `resource` released this cycle and not yet committed
    pub fn pending_of(&self, resource: ResourceId) -> Result<Units, SimError> {
        self.slot(&self.pending, resource)
    }

    /// Units of `resource` grantable once this cycle commits
    pub fn projected_of(&self, resource: ResourceId) -> Result<Units, SimError> {
        let available = self.available_of(resource)?;
        let pending = self.pending_of(resource)?;
        available
            .checked_add(pending)
            .ok_or(SimError::UnitOverflow { resource })
    }

    /// Whether any release is waiting for the next commit
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|&units| units > 0)
    }

    /// Totals indexed by resource id
    pub fn totals(&self) -> &[Units] {
        &self.total
    }

    /// Available units indexed by resource id
    pub fn available(&self) -> &[Units] {
        &self.available
    }

    /// Grant `amount` units of `resource`, visible immediately
    pub fn decrement_available(
        &mut self,
        resource: ResourceId,
        amount: Units,
    ) -> Result<(), SimError> {
        let resource_count = self.resource_count();
        let slot = self
            .available
            .get_mut(resource.as_usize())
            .ok_or(SimError::ResourceOutOfRange {
                resource,
                resource_count,
            })?;
        *slot = slot.checked_sub(amount).ok_or(SimError::InsufficientUnits {
            resource,
            available: *slot,
            amount,
        })?;
        Ok(())
    }

    /// Record a release of `amount` units of `resource` for the next commit
    pub fn increment_pending(&mut self, resource: ResourceId, amount: Units) -> Result<(), SimError> {
        let resource_count = self.resource_count();
        let slot = self
            .pending
            .get_mut(resource.as_usize())
            .ok_or(SimError::ResourceOutOfRange {
                resource,
                resource_count,
            })?;
        *slot = slot
            .checked_add(amount)
            .ok_or(SimError::UnitOverflow { resource })?;
        Ok(())
    }

    /// Fold every pending release into `available`.
    ///
    /// Returns the `(resource, units)` pairs that became visible, in
    /// resource order.
    pub fn commit(&mut self) -> Vec<(ResourceId, Units)> {
        self.available
            .iter_mut()
            .zip(self.pending.iter_mut())
            .enumerate()
            .filter(|(_, (_, pending))| **pending > 0)
            .map(|(r, (available, pending))| {
                let units = std::mem::take(pending);
                *available = available.saturating_add(units);
                (ResourceId(r), units)
            })
            .collect()
    }

    /// Restore the initial state: everything available, nothing pending
    pub fn reset(&mut self) {
        self.available.clone_from(&self.total);
        self.pending.iter_mut().for_each(|units| *units = 0);
    }

    fn slot(&self, column: &[Units], resource: ResourceId) -> Result<Units, SimError> {
        column
            .get(resource.as_usize())
            .copied()
            .ok_or(SimError::ResourceOutOfRange {
                resource,
                resource_count: self.resource_count(),
            })
    }
}
