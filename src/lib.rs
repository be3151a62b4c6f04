// Library surface for headless/integration tests and reuse.
// Rendering lives in the binary; nothing here touches the terminal except runtime's event source.
pub mod app_dirs;
pub mod classic;
pub mod config;
pub mod error;
pub mod events;
pub mod matching;
pub mod runtime;
pub mod scores;
pub mod session;
pub mod survival;
pub mod timers;
pub mod vocabulary;

pub use error::{GameError, GameResult};
