use reqwest::StatusCode;
use crate::config::WebhookConfig;

/// Bytes of a rejecting webhook's response body kept for the log
const MAX_LOGGED_BODY: usize = 512;

/// Announces ready results to the remote webhook endpoint.
/// Delivery is best-effort: one attempt, failures only logged.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    base_url: String,
    ready_suffix: bool,
}

impl Notifier {
    pub fn new(http: reqwest::Client, config: &WebhookConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            ready_suffix: config.ready_suffix,
        }
    }

    pub fn url_for(&self, result_id: &str) -> String {
        if self.ready_suffix {
            format!("{}{}/ready", self.base_url, result_id)
        } else {
            format!("{}{}", self.base_url, result_id)
        }
    }

    /// Tickle the webhook for `result_id`. Returns whether the remote
    /// answered 200.
    pub async fn notify(&self, result_id: &str) -> bool {
        let url = self.url_for(result_id);

        match self.http.get(&url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                tracing::debug!("Webhook acknowledged {}", result_id);
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = read_body_prefix(resp).await;
                tracing::warn!("Webhook {} answered {}: {}", url, status, body);
                false
            }
            Err(e) => {
                tracing::warn!("Webhook {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Read at most `MAX_LOGGED_BODY` bytes of the body, dropping the rest
async fn read_body_prefix(mut resp: reqwest::Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < MAX_LOGGED_BODY {
        match resp.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body_snippet(&buf)
}

fn body_snippet(bytes: &[u8]) -> String {
    let end = bytes.len().min(MAX_LOGGED_BODY);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use crate::test_support::{closed_port_url, serve, spawn_webhook};

    fn notifier(base_url: String, ready_suffix: bool) -> Notifier {
        Notifier::new(
            reqwest::Client::new(),
            &WebhookConfig { base_url, ready_suffix },
        )
    }

    #[test]
    fn test_url_variants() {
        let plain = notifier("http://hooks/whois/".to_string(), false);
        assert_eq!(plain.url_for("r1"), "http://hooks/whois/r1");

        let ready = notifier("http://hooks/whois/".to_string(), true);
        assert_eq!(ready.url_for("r1"), "http://hooks/whois/r1/ready");
    }

    #[tokio::test]
    async fn test_notify_success() {
        let hook = spawn_webhook(StatusCode::OK).await;
        let notifier = notifier(hook.base_url.clone(), false);

        assert!(notifier.notify("r1").await);
        assert_eq!(hook.hits(), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_notify_ready_suffix() {
        let hook = spawn_webhook(StatusCode::OK).await;
        let notifier = notifier(hook.base_url.clone(), true);

        assert!(notifier.notify("r1").await);
        assert_eq!(hook.hits(), vec!["r1/ready"]);
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let hook = spawn_webhook(StatusCode::ACCEPTED).await;
        let notifier = notifier(hook.base_url.clone(), false);

        assert!(!notifier.notify("r1").await);
        assert_eq!(hook.hits().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_is_failure() {
        let notifier = notifier(format!("{}/hook/", closed_port_url().await), false);
        assert!(!notifier.notify("r1").await);
    }

    #[test]
    fn test_body_snippet_truncates() {
        assert_eq!(body_snippet(b"busy"), "busy");

        let long = vec![b'x'; 4096];
        assert_eq!(body_snippet(&long).len(), MAX_LOGGED_BODY);
    }

    #[tokio::test]
    async fn test_large_error_body_is_failure() {
        let app = Router::new().route(
            "/hook/*rest",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "e".repeat(1 << 20)) }),
        );
        let base_url = serve(app).await;
        let notifier = notifier(format!("{}/hook/", base_url), false);

        let body = read_body_prefix(reqwest::get(notifier.url_for("r1")).await.unwrap()).await;
        assert_eq!(body.len(), MAX_LOGGED_BODY);

        assert!(!notifier.notify("r1").await);
    }
}
