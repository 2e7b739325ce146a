//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod fake_store;
pub mod socket_guard;
