//! Integration tests for `OrderCore`
//!
//! This crate contains integration tests that exercise the core library
//! against the in-memory adapters (`ordercore-memory`): concurrent
//! reservation races over real locks, TTL reclamation on a manual clock,
//! optimistic-concurrency conflicts, and the audit trail end to end.

// This is a test-only crate
#![cfg(test)]
