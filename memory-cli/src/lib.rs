//! Library surface for `memory-cli`: a thin command-line shell over
//! [`memory_core::system::MemorySystem`], used for manual exercising and
//! as an integration-test harness.

pub mod commands;
pub mod output;
pub mod system;
