use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder};

use crate::error::Result;

// jobs.cz serves an interstitial to clients without a browser-like identity
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .default_headers(headers)
        .build()
        .expect("Failed to build HTTP client")
});

/// Fetches one page of markup. Transport errors, timeouts and non-2xx
/// statuses all surface as fetch errors carrying the URL and cause.
pub async fn fetch_page(url: &str) -> Result<String> {
    debug!("Fetching {url}");
    let response = CLIENT.get(url).send().await?.error_for_status()?;
    let html = response.text().await?;
    Ok(html)
}
