//! HTTP request handlers for the room service.

pub mod metrics;
pub mod rooms;
pub mod ws;

pub use metrics::metrics_handler;
pub use rooms::{create_room, login, logout};
pub use ws::connect;

use serde::Serialize;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
