//! End-to-end scenarios for sync and query against an in-memory store.

mod support;
mod sync_scenarios;
