pub mod report;
pub mod watch;

pub use watch::{WatchExit, run_watch};
