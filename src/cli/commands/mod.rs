//! Command implementations for the levelk CLI

pub mod inspect;
pub mod train;
