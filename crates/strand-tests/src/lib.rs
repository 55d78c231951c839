//! Scenario and property test suite for the Strand wallet engine.
//!
//! Integration tests live under `tests/` and exercise the public API of
//! `strand-core` and `strand-wallet` together: published derivation vectors,
//! the ownership gate, change and dust handling, and configuration loading.

pub mod helpers;
