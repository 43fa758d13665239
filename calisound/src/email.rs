//! Email service for contact form notifications.
//!
//! The default transport writes messages to disk instead of dispatching them,
//! so submissions are recorded without any SMTP credentials configured.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;

use crate::{
    config::{EmailConfig, EmailTransportConfig},
    db::models::contact::ContactDBResponse,
    errors::Error,
};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    notify_email: String,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, Error> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            notify_email: config.notify_email.clone(),
        })
    }

    /// Notify the team about a new contact form submission.
    pub async fn send_contact_notification(&self, message: &ContactDBResponse) -> Result<(), Error> {
        let subject = match &message.subject {
            Some(s) => format!("Contact form: {s}"),
            None => "Contact form submission".to_string(),
        };
        let body = format!(
            "<h2>New contact form submission</h2>\
             <p><strong>From:</strong> {} &lt;{}&gt;</p>\
             <p><strong>Received:</strong> {}</p>\
             <hr/>\
             <p>{}</p>",
            html_escape(&message.name),
            html_escape(&message.email),
            message.created_at.to_rfc3339(),
            html_escape(&message.body).replace('\n', "<br/>"),
        );

        self.send(&self.notify_email, &subject, &body).await
    }

    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = to_email.parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        tracing::info!(to = to_email, subject, "contact notification recorded");
        Ok(())
    }
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_message() -> ContactDBResponse {
        ContactDBResponse {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: Some("Booking".to_string()),
            body: "Hi <team>,\nAre you free in October?".to_string(),
            client_ip: Some("203.0.113.7".to_string()),
            handled: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_file_transport_writes_notification() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmailConfig {
            transport: EmailTransportConfig::File {
                path: dir.path().to_string_lossy().to_string(),
            },
            ..Default::default()
        };

        let service = EmailService::new(&config).unwrap();
        service.send_contact_notification(&sample_message()).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        let content = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(content.contains("Booking"));
        assert!(content.contains("ada@example.com"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>&\"x\""), "&lt;script&gt;&amp;&quot;x&quot;");
    }
}
