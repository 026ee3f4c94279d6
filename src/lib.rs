pub mod controller;
pub mod db;
pub mod economy;
pub mod events;
pub mod models;
pub mod verify;
pub mod watch;
pub mod youtube;

pub use controller::{AppController, InputError};
pub use db::Database;
pub use economy::{EconomyConfig, EconomyError};
pub use events::{AppEvent, Notification, Route, Severity};
pub use models::{Account, UploadedVideo, VerificationOutcome, VerificationRecord, WatchSession};
pub use verify::{Analyzer, FixedAnalyzer, ScreenshotUpload, SimulatedAnalyzer, VerifyError};
pub use watch::{WatchState, WatchStatus};
