//! In-memory `/proc` for tests and fixture-driven runs.

mod filesystem;
pub mod scenarios;

pub use filesystem::MockFs;
