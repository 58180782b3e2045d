//! Real-time delivery: per-user rooms and the WebSocket endpoint

pub mod hub;
pub mod socket;

pub use hub::RoomHub;
pub use socket::realtime_socket;
