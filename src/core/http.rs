use crate::config::app_config::HttpConfig;
use crate::utils::error::{Result, SynesthesiaError};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Explicit timeout and retry settings shared by both remote stages.
#[derive(Debug, Clone)]
pub struct HttpPolicy {
    timeout: Option<Duration>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl HttpPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            timeout: config.timeout(),
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// 依設定建立 HTTP client；未設定逾時則沿用 reqwest 預設
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(|e| SynesthesiaError::ConfigError {
            message: format!("failed to build HTTP client: {}", e),
        })
    }

    /// 送出請求，非 2xx 轉為 `RemoteStatusError`
    ///
    /// `build` 每次嘗試都會重新建立請求 (multipart 表單無法 clone)。
    /// 只有連線失敗、429 與 5xx 會重試。
    pub async fn execute<F>(&self, service: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let result = match build().send().await {
                Ok(response) => Self::check_status(service, response).await,
                Err(source) => Err(SynesthesiaError::TransportError {
                    service: service.to_string(),
                    source,
                }),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "🔁 {} request failed ({}), retrying {}/{} in {:?}",
                        service,
                        e,
                        attempt,
                        self.retry_attempts,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn check_status(service: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("{} response status: {}", service, status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {}>", e));

        Err(SynesthesiaError::RemoteStatusError {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn policy(retry_attempts: u32) -> HttpPolicy {
        HttpPolicy::from_config(&HttpConfig {
            timeout_seconds: Some(5),
            retry_attempts,
            retry_delay_ms: 1,
        })
    }

    #[tokio::test]
    async fn test_execute_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("fine");
        });

        let policy = policy(0);
        let client = policy.build_client().unwrap();
        let url = server.url("/ok");

        let response = policy.execute("Test", || client.get(&url)).await.unwrap();

        mock.assert();
        assert_eq!(response.text().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_client_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/bad");
            then.status(400).body("bad request");
        });

        let policy = policy(3);
        let client = policy.build_client().unwrap();
        let url = server.url("/bad");

        let err = policy.execute("Test", || client.get(&url)).await.unwrap_err();

        mock.assert_hits(1);
        match err {
            SynesthesiaError::RemoteStatusError { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_retries_until_success() {
        let server = MockServer::start_async().await;
        let mut failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky");
                then.status(503).body("warming up");
            })
            .await;

        let policy = HttpPolicy::from_config(&HttpConfig {
            timeout_seconds: Some(5),
            retry_attempts: 3,
            retry_delay_ms: 300,
        });
        let client = policy.build_client().unwrap();
        let url = server.url("/flaky");

        // 第一次失敗後換成成功的回應
        let recover = async {
            while failing.hits_async().await == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            failing.delete_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/flaky");
                    then.status(200).body("recovered");
                })
                .await
        };

        let (result, recovered) =
            tokio::join!(policy.execute("Test", || client.get(&url)), recover);

        assert_eq!(result.unwrap().text().await.unwrap(), "recovered");
        recovered.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_retry_budget() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/down");
            then.status(503).body("unavailable");
        });

        let policy = policy(2);
        let client = policy.build_client().unwrap();
        let url = server.url("/down");

        let err = policy.execute("Test", || client.get(&url)).await.unwrap_err();

        // 首次 + 兩次重試
        mock.assert_hits(3);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_execute_without_retries_by_default() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/down");
            then.status(500);
        });

        let policy = HttpPolicy::default();
        assert_eq!(policy.retry_attempts(), 0);
        assert!(policy.timeout().is_none());

        let client = policy.build_client().unwrap();
        let url = server.url("/down");
        assert!(policy.execute("Test", || client.get(&url)).await.is_err());

        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_execute_reports_transport_errors() {
        let policy = policy(0);
        let client = policy.build_client().unwrap();

        // 保留埠，無服務監聽
        let err = policy
            .execute("Test", || client.get("http://127.0.0.1:9/unreachable"))
            .await
            .unwrap_err();

        assert!(matches!(err, SynesthesiaError::TransportError { .. }));
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::RemoteService);
    }
}
