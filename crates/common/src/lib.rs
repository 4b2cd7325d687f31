//! Common utilities and types shared across Hushroom components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for random identifier generation (room IDs, session tokens)
pub mod ids;
