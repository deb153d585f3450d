pub mod api;
pub mod chat;
pub mod classify;
pub mod config;
pub mod console_block;
pub mod food;
pub mod locale;
pub mod startup;
pub mod state;
pub mod status;
pub mod supervisor;
pub mod typewriter;
pub mod units;
pub mod yaml_block;

// Re-export main types for convenience
pub use api::{CalyxClient, ClientError, CurrentModel, ModelState, StartupPhase, StartupProgress};
pub use chat::{ChatBackend, ChatController, ChatSession, PendingRequest};
pub use classify::{classify, ResponseKind};
pub use config::{BackendLaunch, Config, Theme};
pub use console_block::ConsoleBlock;
pub use locale::Locale;
pub use startup::StartupWatcher;
pub use state::{ChatMessage, ChatRole, MessageBody};
pub use status::{StatusSnapshot, StatusWatcher};
pub use supervisor::BackendSupervisor;
pub use typewriter::{Typewriter, TypewriterState, TypingEvent};
pub use yaml_block::{parse_yaml_block, YamlBlock, YamlParseError};
