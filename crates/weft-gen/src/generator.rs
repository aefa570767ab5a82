use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, info, warn};
use weft_common::action::Action;
use weft_common::config::GeneratorConfig;
use weft_engine::{LogSink, SinkError};

use crate::client::{ChatClient, ChatMessage, GenError, ModelProfile};
use crate::export::{export_log, export_log_to_dir, stamp_ms};
use crate::placeholder;
use crate::prompt;

static PYTHON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```python\n(.*?)```").unwrap());

/// Pull the fenced Python block out of a chat reply. Replies without fences
/// are taken whole.
fn extract_python(reply: &str) -> String {
    match PYTHON_FENCE_RE.captures(reply) {
        Some(caps) => caps[1].to_string(),
        None => reply.to_string(),
    }
}

/// Turns a finished recording into a Python Selenium script through a
/// chat-completions model, writing the script and the raw log under the
/// configured output directory. This is the stop-time sink for normal runs.
pub struct ScriptGenerator {
    client: ChatClient,
    config: GeneratorConfig,
}

impl ScriptGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: ChatClient::new(),
            config,
        }
    }

    /// Run the generation pipeline and return the final script text. Locators
    /// travel as `LOCATOR-#n` tokens; the model never sees the real values.
    pub async fn generate(&self, log: &[Action]) -> Result<String, GenError> {
        let (profile, api_key) = ModelProfile::resolve(&self.config)?;
        let tokenized = placeholder::tokenize(log);
        let payload = serde_json::to_string_pretty(&tokenized.actions)?;
        let messages: Vec<ChatMessage> = prompt::build_messages(&payload);
        info!(
            model = %profile.model,
            actions = log.len(),
            placeholders = tokenized.placeholder_count(),
            "requesting script generation"
        );
        let reply = self.client.complete(&profile, &api_key, &messages).await?;
        Ok(tokenized.restore(&extract_python(&reply)))
    }

    /// Write the script plus the raw log next to it, sharing one timestamp.
    /// Returns the script path.
    pub async fn write_artifacts(&self, log: &[Action], script: &str) -> Result<PathBuf, GenError> {
        let dir = &self.config.output_dir;
        let stamp = stamp_ms();
        export_log(&dir.join(format!("tracking-log-{stamp}.json")), log).await?;
        let path = dir.join(format!("selenium-test-{stamp}.py"));
        tokio::fs::write(&path, script).await?;
        Ok(path)
    }
}

#[async_trait]
impl LogSink for ScriptGenerator {
    async fn deliver(&self, log: &[Action]) -> Result<(), SinkError> {
        if log.is_empty() {
            info!("log is empty, skipping generation");
            return Ok(());
        }
        match self.generate(log).await {
            Ok(script) => {
                let path = self.write_artifacts(log, &script).await?;
                info!(path = %path.display(), "generated script written");
                Ok(())
            }
            Err(err) => {
                // the recording survives a failed generation
                warn!(error = %err, "generation failed, exporting raw log");
                match export_log_to_dir(&self.config.output_dir, log).await {
                    Ok(path) => info!(path = %path.display(), "raw log exported"),
                    Err(export_err) => error!(error = %export_err, "raw log export failed"),
                }
                Err(Box::new(err))
            }
        }
    }
}

/// Stop-time sink for runs with generation switched off: the raw log is
/// exported and nothing else happens.
pub struct ExportSink {
    output_dir: PathBuf,
}

impl ExportSink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl LogSink for ExportSink {
    async fn deliver(&self, log: &[Action]) -> Result<(), SinkError> {
        if log.is_empty() {
            return Ok(());
        }
        let path = export_log_to_dir(&self.output_dir, log).await?;
        info!(path = %path.display(), "raw log exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_python_pulls_the_fenced_block() {
        let reply = "Here you go:\n```python\nprint('hi')\n```\nEnjoy.";
        assert_eq!(extract_python(reply), "print('hi')\n");
    }

    #[test]
    fn extract_python_takes_unfenced_replies_whole() {
        let reply = "print('no fences here')";
        assert_eq!(extract_python(reply), reply);
    }

    #[test]
    fn extract_python_stops_at_the_first_fence() {
        let reply = "```python\nfirst\n```\ntext\n```python\nsecond\n```";
        assert_eq!(extract_python(reply), "first\n");
    }

    #[test]
    fn extract_python_ignores_other_languages() {
        let reply = "```bash\necho hi\n```";
        assert_eq!(extract_python(reply), reply);
    }
}
