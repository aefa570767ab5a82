use async_trait::async_trait;
use weft_common::action::Action;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receives the finished log when a session stops. Implementations own their
/// failure handling; the service only logs the outcome.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn deliver(&self, log: &[Action]) -> Result<(), SinkError>;
}
