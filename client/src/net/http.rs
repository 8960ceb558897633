//! REST fallback over reqwest.

use async_trait::async_trait;
use frames::{ChatMessage, ErrorResponse, MessagesResponse, SendRequest, SendResponse};

use super::{ChatApi, TransportError};

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatApi {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_since(&self, since: i64) -> Result<Vec<ChatMessage>, TransportError> {
        let body: MessagesResponse = self
            .client
            .get(self.url("/api/chat/messages"))
            .query(&[("since", since)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.messages)
    }

    async fn fetch_history(&self) -> Result<Vec<ChatMessage>, TransportError> {
        let body: MessagesResponse = self
            .client
            .get(self.url("/api/chat/history"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.messages)
    }

    async fn send(&self, request: &SendRequest) -> Result<ChatMessage, TransportError> {
        let response = self.client.post(self.url("/api/chat/send")).json(request).send().await?;
        let status = response.status();
        if status.is_client_error() {
            let code = response.json::<ErrorResponse>().await.ok().and_then(|body| body.code);
            return Err(TransportError::Rejected { status: status.as_u16(), code });
        }
        let body: SendResponse = response.error_for_status()?.json().await?;
        Ok(body.message)
    }
}
