use serde::Serialize;
use thiserror::Error;

use crate::models::{NotifyRequest, RegistrationStatus};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_FROM_EMAIL: &str = "onboarding@resend.dev";
const FROM_DISPLAY_NAME: &str = "Ashesi Business Desk";

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email provider credential is not configured")]
    NotConfigured,
    #[error("email dispatch failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email provider rejected the message: {0}")]
    Provider(String),
}

#[derive(Debug, Serialize)]
struct OutboundEmail {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

/// Client for the transactional-email provider. Built once at startup and
/// shared; an absent API key leaves it unconfigured and every send reports
/// `MailerError::NotConfigured`.
#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from_email: String,
    /// In the provider's test mode only the account owner's address is
    /// deliverable; this overrides the actual recipient during development.
    test_recipient: Option<String>,
}

impl Mailer {
    pub fn new(
        api_key: Option<String>,
        from_email: Option<String>,
        test_recipient: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            from_email: from_email.unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            test_recipient,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send_registration_notice(
        &self,
        notice: &NotifyRequest,
    ) -> Result<(), MailerError> {
        let api_key = self.api_key.as_ref().ok_or(MailerError::NotConfigured)?;

        let recipient = self
            .test_recipient
            .clone()
            .unwrap_or_else(|| notice.email.clone());

        let email = OutboundEmail {
            from: format!("{} <{}>", FROM_DISPLAY_NAME, self.from_email),
            to: vec![recipient],
            subject: notice_subject(notice.status).to_string(),
            html: notice_body(notice),
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&email)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailerError::Provider(text));
        }

        Ok(())
    }

    /// Fire-and-forget dispatch: the send runs on a spawned task and a failure
    /// is logged, never surfaced to the calling workflow.
    pub fn dispatch_in_background(&self, notice: NotifyRequest) {
        let mailer = self.clone();
        actix_web::rt::spawn(async move {
            if let Err(err) = mailer.send_registration_notice(&notice).await {
                log::warn!(
                    "Failed to send {:?} notice for '{}': {err}",
                    notice.status,
                    notice.business_name
                );
            }
        });
    }
}

fn notice_subject(status: RegistrationStatus) -> &'static str {
    match status {
        RegistrationStatus::Approved => "Your student business has been approved",
        _ => "Update on your student business registration",
    }
}

fn notice_body(notice: &NotifyRequest) -> String {
    let founder = notice.founder.as_deref().unwrap_or("there");

    match notice.status {
        RegistrationStatus::Approved => format!(
            "<p>Hi {founder},</p>\
             <p>Great news! Your student business <strong>{name}</strong> has been approved \
             by the Ashesi Entrepreneurship Committee and is now listed on the Ashesi \
             businesses platform.</p>\
             <p><em>(Original registration email: {email})</em></p>\
             <p>You can visit the site to see your listing and share it with others.</p>\
             <p>Best,<br/>Ashesi Entrepreneurship Committee</p>",
            name = notice.business_name,
            email = notice.email,
        ),
        _ => format!(
            "<p>Hi {founder},</p>\
             <p>Thank you for registering your student business <strong>{name}</strong> with \
             the Ashesi Entrepreneurship Committee.</p>\
             <p>After careful review, your application was <strong>not approved</strong> at \
             this time.</p>\
             <p>We encourage you to keep refining your idea and you are welcome to re-apply \
             in the future.</p>\
             <p><em>(Original registration email: {email})</em></p>\
             <p>Best,<br/>Ashesi Entrepreneurship Committee</p>",
            name = notice.business_name,
            email = notice.email,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(status: RegistrationStatus, founder: Option<&str>) -> NotifyRequest {
        NotifyRequest {
            email: "ama@ashesi.edu.gh".to_string(),
            business_name: "Kente Threads".to_string(),
            founder: founder.map(|f| f.to_string()),
            status,
        }
    }

    #[test]
    fn approved_notice_copy() {
        let subject = notice_subject(RegistrationStatus::Approved);
        assert_eq!(subject, "Your student business has been approved");

        let body = notice_body(&notice(RegistrationStatus::Approved, Some("Ama")));
        assert!(body.contains("Hi Ama,"));
        assert!(body.contains("<strong>Kente Threads</strong>"));
        assert!(body.contains("ama@ashesi.edu.gh"));
    }

    #[test]
    fn rejected_notice_copy_without_founder() {
        let subject = notice_subject(RegistrationStatus::Rejected);
        assert_eq!(subject, "Update on your student business registration");

        let body = notice_body(&notice(RegistrationStatus::Rejected, None));
        assert!(body.contains("Hi there,"));
        assert!(body.contains("not approved"));
    }

    #[test]
    fn blank_api_key_counts_as_unconfigured() {
        let mailer = Mailer::new(Some("  ".to_string()), None, None);
        assert!(!mailer.is_configured());

        let mailer = Mailer::new(Some("re_123".to_string()), None, None);
        assert!(mailer.is_configured());
    }
}
