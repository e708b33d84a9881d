//! W3C WebDriver transport.
//!
//! Talks to a WebDriver-compatible endpoint (chromedriver, geckodriver, a
//! grid) over plain HTTP. Only the commands the engine needs are
//! implemented; element probes map absence to negative answers instead of
//! errors, per the [`UiDriver`] contract.

use crate::artifact::{Cookie, StorageState};
use crate::backend::{SessionBackend, SessionConfig};
use crate::manager::SessionError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use courier_ui::{Locator, UiDriver, UiError};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::sleep;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const NO_SUCH_ELEMENT: &str = "no such element";

/// Inter-keystroke delay for the slow typing path.
const SLOW_TYPE_DELAY: Duration = Duration::from_millis(60);

/// Launches WebDriver sessions against a remote endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverBackend {
    endpoint: String,
    browser: String,
    http: reqwest::Client,
}

impl WebDriverBackend {
    /// Backend over a WebDriver endpoint such as `http://localhost:9515`.
    pub fn new(endpoint: impl Into<String>, browser: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            browser: browser.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SessionBackend for WebDriverBackend {
    async fn launch(
        &self,
        state: &StorageState,
        config: &SessionConfig,
    ) -> Result<Box<dyn UiDriver>, SessionError> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": { "browserName": self.browser }
            }
        });
        let response: Value = self
            .http
            .post(format!("{}/session", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Backend(format!("session create: {e}")))?
            .json()
            .await
            .map_err(|e| SessionError::Backend(format!("session create decode: {e}")))?;

        let session_id = response["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| SessionError::Backend(format!("no session id in {response}")))?
            .to_string();

        let session = WebDriverSession {
            base: format!("{}/session/{session_id}", self.endpoint),
            http: self.http.clone(),
        };

        session
            .apply_timeouts(config)
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;
        session
            .inject_cookies(&state.live_cookies())
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;

        Ok(Box::new(session))
    }
}

/// One live WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    base: String,
    http: reqwest::Client,
}

impl WebDriverSession {
    async fn apply_timeouts(&self, config: &SessionConfig) -> Result<(), UiError> {
        self.post(
            "timeouts",
            json!({
                "implicit": 0,
                "pageLoad": config.navigation_timeout.as_millis() as u64,
                "script": config.default_timeout.as_millis() as u64,
            }),
        )
        .await?;
        Ok(())
    }

    /// Cookies can only be set for the origin currently loaded, so visit
    /// each cookie domain once before adding its cookies.
    async fn inject_cookies(&self, cookies: &[&Cookie]) -> Result<(), UiError> {
        let domains: BTreeSet<&str> = cookies.iter().map(|c| c.domain.as_str()).collect();
        for domain in domains {
            let host = domain.trim_start_matches('.');
            self.post("url", json!({ "url": format!("https://{host}/") }))
                .await
                .map_err(|e| UiError::Navigation(format!("cookie origin {host}: {e}")))?;

            for cookie in cookies.iter().filter(|c| c.domain == domain) {
                let mut payload = json!({
                    "name": cookie.name,
                    "value": cookie.value,
                    "domain": cookie.domain,
                    "path": cookie.path,
                    "httpOnly": cookie.http_only,
                    "secure": cookie.secure,
                    "sameSite": cookie.same_site,
                });
                if cookie.expires >= 0.0 {
                    payload["expiry"] = json!(cookie.expires as u64);
                }
                self.post("cookie", json!({ "cookie": payload })).await?;
            }
        }
        Ok(())
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, UiError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base))
            .json(&body)
            .send()
            .await
            .map_err(|e| UiError::Transport(e.to_string()))?;
        Self::unwrap_value(response).await
    }

    async fn get(&self, path: &str) -> Result<Value, UiError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base))
            .send()
            .await
            .map_err(|e| UiError::Transport(e.to_string()))?;
        Self::unwrap_value(response).await
    }

    async fn unwrap_value(response: reqwest::Response) -> Result<Value, UiError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| UiError::Protocol(e.to_string()))?;
        let value = body.get("value").cloned().unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(value);
        }
        let code = value["error"].as_str().unwrap_or("unknown").to_string();
        let message = value["message"].as_str().unwrap_or_default().to_string();
        if code == NO_SUCH_ELEMENT {
            Err(UiError::NotFound(message))
        } else {
            Err(UiError::Protocol(format!("{code}: {message}")))
        }
    }

    /// Find the first candidate selector that resolves. `Ok(None)` when no
    /// candidate matches.
    async fn resolve(&self, locator: &Locator) -> Result<Option<String>, UiError> {
        for candidate in &locator.candidates {
            let result = self
                .post(
                    "element",
                    json!({ "using": "css selector", "value": candidate }),
                )
                .await;
            match result {
                Ok(value) => {
                    if let Some(id) = value[ELEMENT_KEY].as_str() {
                        return Ok(Some(id.to_string()));
                    }
                }
                Err(UiError::NotFound(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(None)
    }

    async fn require(&self, locator: &Locator) -> Result<String, UiError> {
        self.resolve(locator)
            .await?
            .ok_or_else(|| UiError::NotFound(locator.label.clone()))
    }

    async fn execute(&self, script: &str, args: Value) -> Result<Value, UiError> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    fn element_arg(id: &str) -> Value {
        json!({ ELEMENT_KEY: id })
    }
}

#[async_trait]
impl UiDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), UiError> {
        self.post("url", json!({ "url": url }))
            .await
            .map_err(|e| UiError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), UiError> {
        self.post("refresh", json!({}))
            .await
            .map_err(|e| UiError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, UiError> {
        let value = self.get("url").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, locator: &Locator) -> Result<(), UiError> {
        let id = self.require(locator).await?;
        self.post(&format!("element/{id}/click"), json!({}))
            .await
            .map_err(|e| UiError::Interaction {
                locator: locator.label.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), UiError> {
        let id = self.require(locator).await?;
        self.post(&format!("element/{id}/clear"), json!({})).await?;
        self.post(&format!("element/{id}/value"), json!({ "text": value }))
            .await
            .map_err(|e| UiError::Interaction {
                locator: locator.label.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn type_slow(&self, locator: &Locator, value: &str) -> Result<(), UiError> {
        let id = self.require(locator).await?;
        self.post(&format!("element/{id}/clear"), json!({})).await?;
        for ch in value.chars() {
            self.post(
                &format!("element/{id}/value"),
                json!({ "text": ch.to_string() }),
            )
            .await
            .map_err(|e| UiError::Interaction {
                locator: locator.label.clone(),
                message: e.to_string(),
            })?;
            sleep(SLOW_TYPE_DELAY).await;
        }
        Ok(())
    }

    async fn read_value(&self, locator: &Locator) -> Result<String, UiError> {
        let id = self.require(locator).await?;
        let value = self.get(&format!("element/{id}/property/value")).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, UiError> {
        let Some(id) = self.resolve(locator).await? else {
            return Ok(None);
        };
        let value = self.get(&format!("element/{id}/text")).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn attr(&self, locator: &Locator, name: &str) -> Result<Option<String>, UiError> {
        let Some(id) = self.resolve(locator).await? else {
            return Ok(None);
        };
        let value = self
            .get(&format!("element/{id}/attribute/{name}"))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn count(&self, locator: &Locator) -> Result<usize, UiError> {
        for candidate in &locator.candidates {
            let value = self
                .post(
                    "elements",
                    json!({ "using": "css selector", "value": candidate }),
                )
                .await?;
            let found = value.as_array().map(Vec::len).unwrap_or(0);
            if found > 0 {
                return Ok(found);
            }
        }
        Ok(0)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, UiError> {
        let Some(id) = self.resolve(locator).await? else {
            return Ok(false);
        };
        let value = self
            .execute(
                "const el = arguments[0]; \
                 const style = window.getComputedStyle(el); \
                 return el.offsetParent !== null && style.visibility !== 'hidden';",
                json!([Self::element_arg(&id)]),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, UiError> {
        let Some(id) = self.resolve(locator).await? else {
            return Ok(false);
        };
        let value = self.get(&format!("element/{id}/enabled")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_checked(&self, locator: &Locator) -> Result<bool, UiError> {
        let Some(id) = self.resolve(locator).await? else {
            return Ok(false);
        };
        let value = self.get(&format!("element/{id}/property/checked")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn set_checked(&self, locator: &Locator, on: bool) -> Result<(), UiError> {
        if self.is_checked(locator).await? != on {
            self.click(locator).await?;
        }
        Ok(())
    }

    async fn page_contains(&self, needle: &str) -> Result<bool, UiError> {
        let value = self
            .execute(
                "return (document.body && document.body.innerText) || '';",
                json!([]),
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().contains(needle))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, UiError> {
        let value = self.get("screenshot").await?;
        let encoded = value.as_str().unwrap_or_default();
        BASE64
            .decode(encoded)
            .map_err(|e| UiError::Protocol(format!("screenshot decode: {e}")))
    }

    async fn close(&self) -> Result<(), UiError> {
        let response = self
            .http
            .delete(&self.base)
            .send()
            .await
            .map_err(|e| UiError::Transport(e.to_string()))?;
        Self::unwrap_value(response).await?;
        Ok(())
    }
}
