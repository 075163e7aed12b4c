use super::{FetchError, HttpClient};
use std::future::Future;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

/// HTTP client backed by the browser's `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClient;

fn describe(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

async fn get_text(url: &str) -> Result<String, FetchError> {
    let window =
        web_sys::window().ok_or_else(|| FetchError::Network("No window object".to_string()))?;

    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| FetchError::Network(describe(&e)))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| FetchError::Network("fetch did not return a Response".to_string()))?;

    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }

    let text = response
        .text()
        .map_err(|e| FetchError::Network(describe(&e)))?;
    let text = JsFuture::from(text)
        .await
        .map_err(|e| FetchError::Network(describe(&e)))?;
    text.as_string()
        .ok_or_else(|| FetchError::Network("Response body is not text".to_string()))
}

impl HttpClient for BrowserClient {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> {
        let url = url.to_string();
        async move { get_text(&url).await }
    }
}
