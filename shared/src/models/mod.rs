//! Domain models for the Pocket Farm platform

mod crop;
mod notification;
mod realtime;
mod schedule;
mod weather;

pub use crop::*;
pub use notification::*;
pub use realtime::*;
pub use schedule::*;
pub use weather::*;
