//! Shared helpers for the integration tests: record builders and in-process
//! fakes standing in for the database and the backoff clock.

#![allow(dead_code)]

pub mod builders;
pub mod fakes;

pub use builders::*;
pub use fakes::*;
