//! Shared fixtures for integration tests

#![allow(dead_code)]

mod archive;
mod workspace;

#[allow(unused_imports)]
pub use archive::*;
#[allow(unused_imports)]
pub use workspace::*;
