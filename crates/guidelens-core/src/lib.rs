pub mod classifier;
pub mod error;
pub mod events;
pub mod manager;
pub mod navigator;
pub mod prompts;
pub mod session;

pub use classifier::classify;
pub use error::SessionError;
pub use events::SessionEvents;
pub use manager::{SessionManager, HISTORY_CAP};
pub use navigator::{advance, Direction};
pub use session::GuideSession;
