pub mod client;
pub mod export;
pub mod generator;
pub mod placeholder;
pub mod prompt;

pub use client::{ChatClient, ChatMessage, GenError, ModelProfile};
pub use export::{export_log, export_log_to_dir};
pub use generator::{ExportSink, ScriptGenerator};
