pub mod state;

pub use state::{WatchState, WatchStatus};
