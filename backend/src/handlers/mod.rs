//! HTTP handlers for the Pocket Farm server

mod health;
mod notification;
mod schedule;
mod weather;

pub use health::*;
pub use notification::*;
pub use schedule::*;
pub use weather::*;
