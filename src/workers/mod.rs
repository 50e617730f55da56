//! Long-lived background tasks: the batched writer and the uptime scheduler

mod batch;
mod uptime;

pub use batch::*;
pub use uptime::*;
