//! Route handlers.
//!
//! Each submodule owns one endpoint group.

pub mod health;
pub mod publish;
pub mod retrieve;
