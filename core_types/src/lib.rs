//! # Core Types
//!
//! This crate defines the identifiers shared by every layer of the HLE kernel.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: A process id can never be mistaken for a thread id.
//! - **Guest values stay guest values**: Title ids and core numbers carry the
//!   guest's own encoding and are only converted at the host boundary.
//!
//! ## Key Types
//!
//! - [`ProcessId`]: Unique identifier for an emulated guest process
//! - [`ThreadId`]: Unique identifier for an emulated guest thread
//! - [`TitleId`]: The 64-bit program id a guest executable declares
//! - [`CoreId`]: Index of one of the guest's CPU cores

pub mod cpu;
pub mod ids;

pub use cpu::{CoreId, CORE_COUNT};
pub use ids::{ProcessId, ThreadId, TitleId};
