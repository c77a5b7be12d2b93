//! Outbound transactional mail.
//!
//! Delivery is fire-and-forget: a failed send is logged and never fails the
//! request that triggered it. When no provider key is configured the service
//! starts disabled and every send becomes a log line, which keeps local
//! development working without a mail account.

use reqwest::Client;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    /// A member asked to verify a new (or first) email address.
    VerifyEmail,
    /// A member asked for a password reset.
    ResetPassword,
    /// An admin created a member; the mail carries the initial setup link.
    NewMember,
}

impl MailKind {
    fn subject(self) -> &'static str {
        match self {
            MailKind::VerifyEmail => "Verify your email address",
            MailKind::ResetPassword => "Reset your password",
            MailKind::NewMember => "Welcome to Stratboard",
        }
    }
}

#[derive(Clone)]
pub struct MailService {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    from_address: String,
    dashboard_url: String,
    activation_path: String,
    reset_path: String,
}

impl MailService {
    /// Build from environment. Missing `MAIL_API_KEY` disables delivery with
    /// a warning rather than failing startup.
    pub fn from_env() -> Self {
        let api_key = std::env::var("MAIL_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("MAIL_API_KEY not set, outbound mail disabled");
        }

        Self {
            client: Client::new(),
            api_key,
            api_url: std::env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@stratboard.app".to_string()),
            dashboard_url: std::env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            activation_path: std::env::var("MAIL_ACTIVATION_PATH")
                .unwrap_or_else(|_| "/auth/verify-email".to_string()),
            reset_path: std::env::var("MAIL_RESET_PATH")
                .unwrap_or_else(|_| "/auth/reset-password".to_string()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Link the recipient lands on, with the token in the `t` query
    /// parameter. New-member mails point at the activation page; every other
    /// kind points at the password page.
    fn link(&self, kind: MailKind, token: &str) -> String {
        let path = match kind {
            MailKind::NewMember => &self.activation_path,
            MailKind::VerifyEmail | MailKind::ResetPassword => &self.reset_path,
        };
        format!("{}{}?t={}", self.dashboard_url, path, token)
    }

    /// Send a tokenized mail to `recipient`. Never returns an error; delivery
    /// problems are the mail provider's concern, not the caller's.
    pub async fn send(&self, kind: MailKind, recipient: &str, token: &str) {
        let link = self.link(kind, token);

        let Some(key) = &self.api_key else {
            tracing::info!(recipient, kind = ?kind, link, "mail disabled, skipping send");
            return;
        };

        let body = json!({
            "from": self.from_address,
            "to": [recipient],
            "subject": kind.subject(),
            "html": format!(
                "<p>{}</p><p><a href=\"{link}\">{link}</a></p>",
                kind.subject()
            ),
        });

        let result = self
            .client
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(recipient, kind = ?kind, "mail sent");
            }
            Ok(resp) => {
                tracing::error!(recipient, kind = ?kind, status = %resp.status(), "mail provider rejected send");
            }
            Err(err) => {
                tracing::error!(recipient, kind = ?kind, error = %err, "mail send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MailService {
        MailService {
            client: Client::new(),
            api_key: None,
            api_url: "https://api.resend.com/emails".into(),
            from_address: "no-reply@stratboard.app".into(),
            dashboard_url: "https://app.example.com".into(),
            activation_path: "/auth/verify-email".into(),
            reset_path: "/auth/reset-password".into(),
        }
    }

    #[test]
    fn new_member_link_uses_activation_path() {
        let link = service().link(MailKind::NewMember, "tok123");
        assert_eq!(link, "https://app.example.com/auth/verify-email?t=tok123");
    }

    #[test]
    fn reset_link_uses_password_path() {
        let link = service().link(MailKind::ResetPassword, "tok123");
        assert_eq!(link, "https://app.example.com/auth/reset-password?t=tok123");
    }
}
