//! Purpose: Library crate behind the `notebox` binary and its integration tests.
//! Exports: `core` (note entity, store, errors) and `api` (HTTP client, collection state).
//! Role: Shared by the server (`notebox serve`) and the client front ends.
//! Invariants: Client-side state only changes after the server confirms a write.
pub mod api;
pub mod core;
