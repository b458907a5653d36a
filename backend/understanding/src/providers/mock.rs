use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sanjeevani_core::{LlmProvider, LlmRequest, LlmResponse, ScanError};

/// One scripted outcome for [`MockProvider`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Upstream answered with this HTTP status.
    Status(u16),
    /// Connection could not be established.
    Unreachable,
    /// Never answers.
    Hang,
}

/// A mock LLM provider that plays back scripted replies and records every
/// request it receives.
pub struct MockProvider {
    name: String,
    configured: bool,
    fixed_response: String,
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: true,
            fixed_response: "Mock response".to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the script is exhausted.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = response.into();
        self
    }

    /// Queue replies, consumed one per call.
    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(replies);
        }
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ScanError> {
        if !self.configured {
            return Err(ScanError::MissingConfiguration(format!("{} api key", self.name)));
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let reply = self.script.lock().ok().and_then(|mut s| s.pop_front());

        let content = match reply {
            None => self.fixed_response.clone(),
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Status(status)) => {
                return Err(ScanError::upstream(&self.name, Some(status), "scripted failure"));
            }
            Some(MockReply::Unreachable) => {
                return Err(ScanError::Unreachable {
                    provider: self.name.clone(),
                    message: "connection refused".into(),
                });
            }
            Some(MockReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                self.fixed_response.clone()
            }
        };

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
