//! CLI infrastructure for level-k training
//!
//! This module provides the command-line interface for training a super agent
//! against a ladder of frozen opponents and for inspecting the curves a run
//! leaves behind.

pub mod commands;
pub mod output;
