//! Shared syncledger protocol, failure, and summary types.
//!
//! Messages arrive here already parsed; this crate only describes their
//! shape. Accounting lives in `syncledger-tracker`.

pub mod checkpoint;
pub mod estimate;
pub mod failure;
pub mod message;
pub mod stream;
pub mod summary;
pub mod trace;
