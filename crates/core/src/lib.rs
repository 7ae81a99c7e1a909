//! Core business logic for Claimflow.
//!
//! This crate contains the expense approval workflow engine with ZERO storage
//! or async-runtime dependencies. Every operation is a pure, synchronous
//! transformation over immutable values; persistence and side effects live in
//! `claimflow-store`.
//!
//! # Modules
//!
//! - `workflow` - Approval rules, rule resolution, quorum evaluation and the
//!   per-claim state machine

pub mod workflow;
