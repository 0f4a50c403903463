use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::FilterPreferences;
use crate::error::{LensError, LensResult};

/// Query-language evaluator used when the expression path fails.
///
/// `Ok(None)` means the query produced `null` or no output at all.
#[async_trait]
pub trait QueryEvaluator: Send + Sync {
    async fn run(&self, filter: &str, document: &Value) -> LensResult<Option<Value>>;
}

/// Runs filters through a `jq` child process, one process per query.
#[derive(Debug, Clone)]
pub struct JqProcess {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl JqProcess {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_preferences(preferences: &FilterPreferences) -> Self {
        Self::new(&preferences.jq_path)
            .with_timeout(preferences.query_timeout_ms.map(Duration::from_millis))
    }
}

#[async_trait]
impl QueryEvaluator for JqProcess {
    async fn run(&self, filter: &str, document: &Value) -> LensResult<Option<Value>> {
        let input = serde_json::to_vec(document).map_err(|error| {
            LensError::Internal(format!("failed to serialize query input: {error}"))
        })?;

        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--compact-output")
            .arg(filter)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                LensError::Query(format!(
                    "failed to spawn {}: {error}",
                    self.binary.display()
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LensError::Internal("jq stdin unavailable".to_string()))?;
        // jq may exit before reading everything (syntax errors), so write
        // concurrently with collecting output and ignore broken pipes.
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    LensError::Query(format!("jq timed out after {}ms", limit.as_millis()))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|error| LensError::Query(format!("jq failed: {error}")))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(LensError::Query(if stderr.is_empty() {
                format!("jq exited with {}", output.status)
            } else {
                stderr
            }));
        }

        collect_outputs(&output.stdout)
    }
}

/// Fold jq's output stream into one value: nothing or a lone `null` is
/// `None`, a single value is returned as-is, several become an array.
pub(crate) fn collect_outputs(stdout: &[u8]) -> LensResult<Option<Value>> {
    let mut values = serde_json::Deserializer::from_slice(stdout)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| LensError::Query(format!("unreadable jq output: {error}")))?;

    match values.len() {
        0 => Ok(None),
        1 => match values.pop() {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(value)),
        },
        _ => Ok(Some(Value::Array(values))),
    }
}
