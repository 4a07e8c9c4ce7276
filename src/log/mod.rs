pub mod logger;

pub use logger::{Level, Logger};
