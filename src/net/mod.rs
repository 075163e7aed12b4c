//! Remote JSON loading.
//!
//! [`fetch_json`] downloads a document through an [`HttpClient`], parses it
//! and returns one top-level property. In the browser the client is
//! [`BrowserClient`]; natively it is [`UreqClient`].

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserClient;
#[cfg(not(target_arch = "wasm32"))]
pub use native::UreqClient;

use std::future::Future;

/// Errors that can occur while fetching a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    Network(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The body is not valid JSON.
    Parse(String),
    /// The document has no such top-level property.
    MissingProperty(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status(code) => write!(f, "HTTP status {}", code),
            FetchError::Parse(msg) => write!(f, "Invalid JSON: {}", msg),
            FetchError::MissingProperty(name) => write!(f, "Missing property: {}", name),
        }
    }
}

impl std::error::Error for FetchError {}

/// Minimal HTTP GET interface.
///
/// No `Send` bound: the browser client holds JS values.
pub trait HttpClient {
    /// Fetches `url` and returns the response body as text.
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Fetches `url`, parses the body as JSON and returns `property` from it.
///
/// Objects are looked up by key. Arrays are indexed when `property` is a
/// canonical decimal index such as `"0"`; any other document has no
/// properties. One request is made; failures are not retried.
pub async fn fetch_json<C: HttpClient>(
    client: &C,
    url: &str,
    property: &str,
) -> Result<serde_json::Value, FetchError> {
    log::debug!("Fetching {}", url);
    let body = client.get_text(url).await?;

    let mut document: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let value = take_property(&mut document, property)
        .ok_or_else(|| FetchError::MissingProperty(property.to_string()))?;

    log::info!("Fetched {} from {} ({} bytes)", property, url, body.len());
    Ok(value)
}

fn take_property(document: &mut serde_json::Value, property: &str) -> Option<serde_json::Value> {
    match document {
        serde_json::Value::Object(object) => object.remove(property),
        serde_json::Value::Array(items) => {
            let index = property.parse::<usize>().ok()?;
            // "01" and "+1" are not array indices.
            if index.to_string() != property || index >= items.len() {
                return None;
            }
            Some(items.swap_remove(index))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    struct MockClient {
        response: Result<String, FetchError>,
        calls: Cell<usize>,
    }

    impl MockClient {
        fn new(response: Result<&str, FetchError>) -> Self {
            Self {
                response: response.map(str::to_string),
                calls: Cell::new(0),
            }
        }
    }

    impl HttpClient for MockClient {
        fn get_text(&self, _url: &str) -> impl Future<Output = Result<String, FetchError>> {
            self.calls.set(self.calls.get() + 1);
            std::future::ready(self.response.clone())
        }
    }

    #[test]
    fn test_returns_named_property() {
        let client = MockClient::new(Ok(r#"{"objects":{"a":1},"other":2}"#));
        let value = pollster::block_on(fetch_json(&client, "https://example.test/sf.json", "objects"))
            .unwrap();
        assert_eq!(value, json!({"a": 1}));
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn test_network_failure_is_not_retried() {
        let client = MockClient::new(Err(FetchError::Network("connection refused".into())));
        let result = pollster::block_on(fetch_json(&client, "https://example.test/sf.json", "objects"));
        assert_eq!(
            result,
            Err(FetchError::Network("connection refused".into()))
        );
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn test_parse_and_property_errors() {
        let client = MockClient::new(Ok("<html>"));
        let result = pollster::block_on(fetch_json(&client, "u", "objects"));
        assert!(matches!(result, Err(FetchError::Parse(_))));

        let client = MockClient::new(Ok(r#"{"other":2}"#));
        let result = pollster::block_on(fetch_json(&client, "u", "objects"));
        assert_eq!(result, Err(FetchError::MissingProperty("objects".into())));

        let client = MockClient::new(Ok("42"));
        let result = pollster::block_on(fetch_json(&client, "u", "0"));
        assert_eq!(result, Err(FetchError::MissingProperty("0".into())));
    }

    #[test]
    fn test_arrays_are_indexed() {
        let client = MockClient::new(Ok("[1,2,3]"));
        let value = pollster::block_on(fetch_json(&client, "u", "0")).unwrap();
        assert_eq!(value, json!(1));
        let value = pollster::block_on(fetch_json(&client, "u", "2")).unwrap();
        assert_eq!(value, json!(3));

        for property in ["5", "01", "+1", "length"] {
            let result = pollster::block_on(fetch_json(&client, "u", property));
            assert_eq!(result, Err(FetchError::MissingProperty(property.into())));
        }
    }

    #[test]
    fn test_status_error_propagates() {
        let client = MockClient::new(Err(FetchError::Status(404)));
        let result = pollster::block_on(fetch_json(&client, "u", "objects"));
        assert_eq!(result, Err(FetchError::Status(404)));
    }
}
