//! # Thread Scheduling
//!
//! Scheduling attributes of emulated guest threads and the rules for
//! changing them.
//!
//! ## Philosophy
//!
//! - **One lock per thread**: Status, priority, cores and the override scope
//!   change together or not at all; [`GuestThread`] keeps them behind a
//!   single mutex.
//! - **Soft failures**: A bad affinity request is the guest's problem. It is
//!   answered with a [`kernel_api::ResultCode`], never a panic or a hard error.
//! - **Pure core**: [`SchedulingState`] holds the algorithms and can be tested
//!   without any host thread.
//!
//! ## Priorities
//!
//! Guests use 0 (highest) to 63 (lowest). The host scale is configurable; by
//! default it runs from 19 down to -8 ([`PriorityRange::HOST`]).

pub mod affinity;
pub mod error;
pub mod priority;
pub mod thread;

pub use affinity::{
    AffinityMask, AffinityOutcome, AffinityScope, CoreRequest, PreferredCore, SchedulingState,
};
pub use error::SchedulingError;
pub use priority::PriorityRange;
pub use thread::{GuestThread, ThreadParams, ThreadSnapshot, ThreadStatus};
