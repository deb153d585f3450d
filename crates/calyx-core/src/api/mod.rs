pub mod client;
pub mod types;

pub use client::{CalyxClient, DEFAULT_API_URL};
pub use types::{
    ChatReply, ClientError, ConsoleBlockPayload, CurrentModel, FoodLookup, ModelState,
    ModelStatus, StartupPhase, StartupProgress,
};
