//! Fakes and scripted backends for tests in this crate and downstream crates

pub mod fakes;
pub mod mocks;

pub use fakes::*;
pub use mocks::*;
