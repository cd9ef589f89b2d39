//! Integration Tests Module
//!
//! End-to-end tests for Auraforming: complete interviews driven through the
//! application state with a scripted oracle, finalization, and the stored
//! records the admin views read.

// Shared fixtures: scripted oracle, in-memory documents, harness
mod common;

// Interview flow tests (start, turns, grouping, completion, oracle failures)
mod interview_test;

// Persistence tests (completed records, analytics, agent deletion)
mod storage_test;
