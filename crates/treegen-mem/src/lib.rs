#![forbid(unsafe_code)]
//! treegen-mem: resource detection, admission control, and replica budgeting.
//!
//! This crate provides the concrete implementation of the budget *interfaces*
//! in `treegen-core::budget`, plus the memory model that decides whether a
//! request is admitted at all.

pub mod admission;
pub mod guard;
pub mod sys;

pub use admission::{admit, estimate_bytes, Admission, AdmissionPolicy};
pub use guard::{ReplicaBudget, ReplicaGuard};
pub use sys::SystemResources;
