//! # strand-core
//! Foundation types, network parameters and collaborator traits for the
//! Strand wallet engine.

pub mod address;
pub mod config;
pub mod constants;
pub mod error;
pub mod network;
pub mod traits;
pub mod types;
