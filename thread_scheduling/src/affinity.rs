//! Core affinity, preferred core and the override scope.
//!
//! ## Rules
//!
//! - The current core is always part of the primary affinity mask.
//! - While an override scope is open, updates land in the override values;
//!   the primary values and the current core are left alone.
//! - Override scopes nest and must be closed as often as they were opened.

use crate::SchedulingError;
use core_types::{CoreId, CORE_COUNT};
use kernel_api::ResultCode;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Bit per guest core a thread may run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffinityMask(u64);

impl AffinityMask {
    pub fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub fn single(core: CoreId) -> Self {
        Self(core.mask())
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn contains(&self, core: CoreId) -> bool {
        self.0 & core.mask() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every set bit names an existing core
    pub fn fits_cores(&self) -> bool {
        self.0 >> CORE_COUNT == 0
    }

    /// Highest-indexed core in the mask
    pub fn highest_core(&self) -> Option<CoreId> {
        CoreId::all_descending().find(|core| self.contains(*core))
    }
}

/// Preferred core of a thread; -1 in guest encoding means none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredCore {
    NoPreference,
    Core(CoreId),
}

impl PreferredCore {
    pub const NO_PREFERENCE_RAW: i32 = -1;

    pub fn as_raw(&self) -> i32 {
        match self {
            PreferredCore::NoPreference => Self::NO_PREFERENCE_RAW,
            PreferredCore::Core(core) => core.index() as i32,
        }
    }
}

/// Preferred-core argument of an affinity update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreRequest {
    /// Keep whichever preferred core is active right now
    KeepCurrent,
    NoPreference,
    Core(CoreId),
}

impl CoreRequest {
    pub const KEEP_CURRENT_RAW: i32 = -3;

    /// Decodes the guest's encoding, `None` for unknown values
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::KEEP_CURRENT_RAW => Some(CoreRequest::KeepCurrent),
            PreferredCore::NO_PREFERENCE_RAW => Some(CoreRequest::NoPreference),
            0..=255 => CoreId::new(raw as u8).map(CoreRequest::Core),
            _ => None,
        }
    }
}

/// Whether an override scope is open, and what it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffinityScope {
    Normal,
    Overridden {
        depth: NonZeroU32,
        preferred_core: PreferredCore,
        affinity_mask: AffinityMask,
    },
}

/// Result of an accepted affinity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityOutcome {
    Unchanged,
    /// The current core left the mask and the thread moved
    Migrated { from: CoreId, to: CoreId },
}

/// Scheduling attributes of one guest thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingState {
    priority: u8,
    current_core: CoreId,
    preferred_core: PreferredCore,
    affinity_mask: AffinityMask,
    scope: AffinityScope,
}

impl SchedulingState {
    /// State of a new thread pinned to `core`
    pub fn new(priority: u8, core: CoreId) -> Self {
        Self {
            priority,
            current_core: core,
            preferred_core: PreferredCore::Core(core),
            affinity_mask: AffinityMask::single(core),
            scope: AffinityScope::Normal,
        }
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    pub fn current_core(&self) -> CoreId {
        self.current_core
    }

    /// Primary preferred core, ignoring any override
    pub fn preferred_core(&self) -> PreferredCore {
        self.preferred_core
    }

    /// Primary affinity mask, ignoring any override
    pub fn affinity_mask(&self) -> AffinityMask {
        self.affinity_mask
    }

    pub fn scope(&self) -> AffinityScope {
        self.scope
    }

    pub fn override_depth(&self) -> u32 {
        match self.scope {
            AffinityScope::Normal => 0,
            AffinityScope::Overridden { depth, .. } => depth.get(),
        }
    }

    /// Preferred core updates currently apply to
    pub fn active_preferred_core(&self) -> PreferredCore {
        match self.scope {
            AffinityScope::Normal => self.preferred_core,
            AffinityScope::Overridden { preferred_core, .. } => preferred_core,
        }
    }

    /// Affinity mask updates currently apply to
    pub fn active_affinity_mask(&self) -> AffinityMask {
        match self.scope {
            AffinityScope::Normal => self.affinity_mask,
            AffinityScope::Overridden { affinity_mask, .. } => affinity_mask,
        }
    }

    /// Opens an override scope; the outermost one starts from the primary values
    pub fn enter_override(&mut self) {
        self.scope = match self.scope {
            AffinityScope::Normal => AffinityScope::Overridden {
                depth: NonZeroU32::MIN,
                preferred_core: self.preferred_core,
                affinity_mask: self.affinity_mask,
            },
            AffinityScope::Overridden {
                depth,
                preferred_core,
                affinity_mask,
            } => AffinityScope::Overridden {
                depth: depth.saturating_add(1),
                preferred_core,
                affinity_mask,
            },
        };
    }

    /// Closes the innermost override scope; the override values are dropped
    /// with the outermost one.
    pub fn exit_override(&mut self) -> Result<(), SchedulingError> {
        match self.scope {
            AffinityScope::Normal => Err(SchedulingError::OverrideUnderflow),
            AffinityScope::Overridden {
                depth,
                preferred_core,
                affinity_mask,
            } => {
                self.scope = match NonZeroU32::new(depth.get() - 1) {
                    None => AffinityScope::Normal,
                    Some(depth) => AffinityScope::Overridden {
                        depth,
                        preferred_core,
                        affinity_mask,
                    },
                };
                Ok(())
            }
        }
    }

    /// Updates the preferred core and affinity mask.
    ///
    /// Rejected requests leave the state untouched.
    pub fn update_preferred_core_and_affinity(
        &mut self,
        request: CoreRequest,
        mask: AffinityMask,
    ) -> Result<AffinityOutcome, ResultCode> {
        if !mask.fits_cores() {
            return Err(ResultCode::InvalidCoreId);
        }

        let preferred_core = match request {
            CoreRequest::KeepCurrent => self.active_preferred_core(),
            CoreRequest::NoPreference => PreferredCore::NoPreference,
            CoreRequest::Core(core) => PreferredCore::Core(core),
        };
        if let PreferredCore::Core(core) = preferred_core {
            if !mask.contains(core) {
                return Err(ResultCode::InvalidCombination);
            }
        }
        if mask.is_empty() {
            return Err(ResultCode::InvalidCombination);
        }

        if let AffinityScope::Overridden { depth, .. } = self.scope {
            self.scope = AffinityScope::Overridden {
                depth,
                preferred_core,
                affinity_mask: mask,
            };
            return Ok(AffinityOutcome::Unchanged);
        }

        let previous_mask = self.affinity_mask;
        self.preferred_core = preferred_core;
        self.affinity_mask = mask;

        if previous_mask == mask || mask.contains(self.current_core) {
            return Ok(AffinityOutcome::Unchanged);
        }

        let target = match preferred_core {
            PreferredCore::NoPreference => mask.highest_core(),
            PreferredCore::Core(core) => Some(core),
        };
        match target {
            Some(to) => {
                let from = self.current_core;
                self.current_core = to;
                Ok(AffinityOutcome::Migrated { from, to })
            }
            None => Ok(AffinityOutcome::Unchanged),
        }
    }
}
