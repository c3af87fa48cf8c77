use std::time::Duration;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{target} responded with status {status}")]
    Rejected { target: &'static str, status: u16 },
}

#[derive(Debug, Clone)]
pub(crate) struct Attachment {
    pub(crate) filename: String,
    pub(crate) content_type: &'static str,
    pub(crate) bytes: Vec<u8>,
}

/// Outbound email (HTTP mail API) and chat webhook delivery.
#[derive(Debug, Clone)]
pub(crate) struct Notifier {
    client: Client,
    mail_api_url: Option<String>,
    mail_api_key: String,
    from_address: String,
    chat_webhook_url: Option<String>,
}

impl Notifier {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mail = settings.mail();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(mail.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            mail_api_url: mail
                .is_configured()
                .then(|| mail.api_url.trim_end_matches('/').to_string()),
            mail_api_key: mail.api_key.clone(),
            from_address: mail.from_address.clone(),
            chat_webhook_url: non_empty(&settings.chat().webhook_url),
        })
    }

    /// Returns `Ok(false)` when no mail API is configured.
    pub(crate) async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        attachment: Option<&Attachment>,
    ) -> Result<bool, NotifyError> {
        let Some(url) = &self.mail_api_url else {
            tracing::info!(to, subject, "Mail API not configured; skipping email");
            return Ok(false);
        };

        let payload = email_payload(&self.from_address, to, subject, html, attachment);
        let response =
            self.client.post(url).bearer_auth(&self.mail_api_key).json(&payload).send().await;

        let result = match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => Err(NotifyError::Rejected { target: "mail api", status: resp.status().as_u16() }),
            Err(err) => Err(NotifyError::Http(err)),
        };

        let status = if result.is_ok() { "sent" } else { "failed" };
        metrics::counter!("emails_sent_total", "status" => status).increment(1);
        result
    }

    /// Returns `Ok(false)` when no webhook is configured.
    pub(crate) async fn send_chat(&self, text: &str) -> Result<bool, NotifyError> {
        let Some(url) = &self.chat_webhook_url else {
            tracing::debug!("Chat webhook not configured; skipping message");
            return Ok(false);
        };

        let resp = self.client.post(url).json(&json!({ "text": text })).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Rejected { target: "chat webhook", status: resp.status().as_u16() });
        }
        Ok(true)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn email_payload(
    from: &str,
    to: &str,
    subject: &str,
    html: &str,
    attachment: Option<&Attachment>,
) -> Value {
    let attachments: Vec<Value> = attachment
        .map(|file| {
            json!({
                "filename": file.filename,
                "content_type": file.content_type,
                "content": STANDARD.encode(&file.bytes),
            })
        })
        .into_iter()
        .collect();

    json!({
        "from": from,
        "to": [to],
        "subject": subject,
        "html": html,
        "attachments": attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn attachments_are_base64_encoded() {
        let file = Attachment {
            filename: "scores.csv".to_string(),
            content_type: "text/csv",
            bytes: b"a,b\n1,2\n".to_vec(),
        };

        let payload = email_payload("noreply@test", "amy@test", "Export", "<p>hi</p>", Some(&file));

        assert_eq!(payload["to"], json!(["amy@test"]));
        assert_eq!(payload["attachments"][0]["filename"], "scores.csv");
        assert_eq!(payload["attachments"][0]["content"], "YSxiCjEsMgo=");
    }

    #[test]
    fn payload_without_attachment_has_empty_list() {
        let payload = email_payload("noreply@test", "amy@test", "Hello", "<p>hi</p>", None);
        assert_eq!(payload["attachments"], json!([]));
    }

    #[tokio::test]
    async fn unconfigured_targets_are_skipped() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");
        let notifier = Notifier::from_settings(&settings).expect("notifier");

        assert!(!notifier.send_email("amy@test", "Hi", "<p>hi</p>", None).await.unwrap());
        assert!(!notifier.send_chat("hello").await.unwrap());
    }
}
