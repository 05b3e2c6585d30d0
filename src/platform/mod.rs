pub mod environment;
pub mod scheduler;

pub use scheduler::{MaybeSendSync, RuntimeScheduler, ScheduledTask, Scheduler};
