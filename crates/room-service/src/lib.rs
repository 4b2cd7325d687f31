//! Hushroom Room Service Library
//!
//! Ephemeral, password-protected chat rooms over WebSocket. Nothing outlives
//! a room: when it idles out or a peer disposes it, its record, sessions and
//! message cache are gone.
//!
//! # Architecture
//!
//! ```text
//! Hub (one per process, Arc<Hub> in HTTP state)
//! └── RoomActor (one per active room, owns peers and replay cache)
//!     └── per peer: reader duty + writer duty
//! ```
//!
//! Every peer event (join, leave, chat, typing, list, dispose) is serialized
//! through its room's actor, so all members see broadcasts in one order.
//! Room records and sessions live in a [`store::Store`]: in-memory for a
//! single node, Redis when rooms must survive a process restart.
//!
//! # Modules
//!
//! - [`actors`] - Hub registry, room actor and peer duties
//! - [`auth`] - Password hashing and session issuance
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP mappings
//! - [`handlers`] / [`routes`] - HTTP API and WebSocket upgrade
//! - [`observability`] - Metrics and health probes
//! - [`store`] - Room and session persistence
//! - [`transport`] - Frame-level connection abstraction

pub mod actors;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod store;
pub mod transport;
