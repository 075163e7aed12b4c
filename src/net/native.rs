use super::{FetchError, HttpClient};
use std::future::Future;
use ureq::Agent;

/// Blocking HTTP client backed by `ureq`.
///
/// The returned future completes immediately; the request runs when
/// `get_text` is called.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: Agent,
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(Agent::new_with_defaults())
    }
}

impl UreqClient {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    fn get_blocking(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            other => FetchError::Network(other.to_string()),
        })?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

impl HttpClient for UreqClient {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> {
        std::future::ready(self.get_blocking(url))
    }
}
