//! Core abstractions for Prep: the client-local storage contract and the
//! session/audit records persisted through it.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod history;
pub mod storage;
