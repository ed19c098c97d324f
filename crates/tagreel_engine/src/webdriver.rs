use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::discovery::{PageSession, SessionLauncher};

/// Settings for reaching the WebDriver endpoint and shaping the browser
/// session it opens.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Base URL of a running WebDriver server (chromedriver or similar).
    /// Installing and starting the driver binary is the operator's job.
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Sent with every page load; the platform serves a stripped page to
    /// clients it does not recognize as browsers.
    pub user_agent: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(90),
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The endpoint could not be reached at all.
    #[error("webdriver request failed: {0}")]
    Network(String),
    /// The driver answered with a WebDriver error payload.
    #[error("webdriver error ({status}): {message}")]
    Driver { status: u16, message: String },
    /// The driver answered but the body was not the expected shape.
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

/// Minimal W3C WebDriver client covering what discovery needs: create a
/// session, navigate, run a script, read the DOM, close.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(settings: &DriverSettings) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SessionError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a browser session and returns its id.
    pub async fn new_session(&self, settings: &DriverSettings) -> Result<String, SessionError> {
        let mut args = vec![
            "--disable-infobars".to_string(),
            "--disable-extensions".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--user-agent={}", settings.user_agent),
        ];
        if settings.headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--start-maximized".to_string());
        }
        let payload = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-logging"],
                    }
                }
            }
        });
        let value = self.post("/session", &payload).await?;
        value["sessionId"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                SessionError::Protocol("missing sessionId in new-session response".to_string())
            })
    }

    pub async fn navigate(&self, session_id: &str, url: &str) -> Result<(), SessionError> {
        self.post(&format!("/session/{session_id}/url"), &json!({ "url": url }))
            .await?;
        Ok(())
    }

    /// Runs a script synchronously in the page.
    pub async fn execute(&self, session_id: &str, script: &str) -> Result<Value, SessionError> {
        self.post(
            &format!("/session/{session_id}/execute/sync"),
            &json!({ "script": script, "args": [] }),
        )
        .await
    }

    /// Current DOM serialized to HTML.
    pub async fn page_source(&self, session_id: &str) -> Result<String, SessionError> {
        let value = self.get(&format!("/session/{session_id}/source")).await?;
        value
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| SessionError::Protocol("page source is not a string".to_string()))
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.delete(&format!("/session/{session_id}")).await?;
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, SessionError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get(&self, path: &str) -> Result<Value, SessionError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<Value, SessionError> {
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Unwraps the `value` envelope every WebDriver response carries,
    /// pulling the driver's message out of error payloads.
    async fn decode(response: reqwest::Response) -> Result<Value, SessionError> {
        let status = response.status();
        let mut body: Value = response
            .json()
            .await
            .map_err(|err| SessionError::Protocol(err.to_string()))?;
        if !status.is_success() {
            let message = body["value"]["message"]
                .as_str()
                .or_else(|| body["value"]["error"].as_str())
                .unwrap_or("no error message")
                .to_string();
            return Err(SessionError::Driver {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body["value"].take())
    }
}

/// A live browser tab driven over the WebDriver protocol.
pub struct WebDriverSession {
    client: WebDriverClient,
    session_id: String,
}

#[async_trait::async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.client.navigate(&self.session_id, url).await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.client
            .execute(
                &self.session_id,
                "window.scrollTo(0, document.body.scrollHeight);",
            )
            .await?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        self.client.page_source(&self.session_id).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.client.delete_session(&self.session_id).await
    }
}

/// Launches real browser sessions against the configured endpoint.
pub struct WebDriverLauncher {
    settings: DriverSettings,
}

impl WebDriverLauncher {
    pub fn new(settings: DriverSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let client = WebDriverClient::new(&self.settings)?;
        let session_id = client.new_session(&self.settings).await?;
        Ok(Box::new(WebDriverSession { client, session_id }))
    }
}
