use serde::de::DeserializeOwned;

use crate::core::error::StrategyError;

/// Client shared by every strategy: browser identity, cookies, bounded redirects.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

/// Sends `request` and decodes a JSON body, mapping non-2xx answers and
/// malformed bodies into strategy errors.
pub async fn fetch_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, StrategyError> {
    let text = fetch_text(request.header("Accept", "application/json")).await?;
    Ok(serde_json::from_str(&text)?)
}

pub async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, StrategyError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(StrategyError::Status { status: status.as_u16() });
    }
    Ok(response.text().await?)
}

/// Absolute URL for a locator some services hand back relative to themselves.
pub fn absolutize(base: &str, locator: &str) -> String {
    if locator.starts_with("//") {
        format!("https:{}", locator)
    } else if locator.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), locator)
    } else {
        locator.to_string()
    }
}

/// Non-empty trimmed string, or `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize("https://tikwm.com/", "/video/a.mp4"), "https://tikwm.com/video/a.mp4");
        assert_eq!(absolutize("https://tikwm.com", "//cdn.x/a.mp4"), "https://cdn.x/a.mp4");
        assert_eq!(absolutize("https://tikwm.com", "https://cdn.x/a.mp4"), "https://cdn.x/a.mp4");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  hi ")), Some("hi".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
