pub mod capture;
pub mod controller;
pub mod engine;
pub mod service;
pub mod session;
pub mod sink;

pub use capture::EventCapture;
pub use controller::{SessionError, SuccessKind};
pub use engine::{DiscardReason, Outcome};
pub use service::RecorderHandle;
pub use sink::{LogSink, SinkError};
