// 📧 Notification Gateway - deliver the HTML report
//
// One capability trait, one production sender (SMTP via lettre). Tests bring
// their own double.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Result, SummaryError};

pub const SUBJECT: &str = "Stori Account Summary";

/// Content-ID of an inline logo
const LOGO_CID: &str = "logo";

// ============================================================================
// LOGO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logo {
    /// Remote image, referenced by URL
    Url(String),
    /// Local image, attached inline
    File(PathBuf),
}

impl Logo {
    pub fn from_value(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Logo::Url(value.to_string())
        } else {
            Logo::File(PathBuf::from(value))
        }
    }
}

/// Logo resolved into something a message can carry
enum LogoPart {
    Remote(String),
    Inline {
        bytes: Vec<u8>,
        content_type: ContentType,
    },
}

fn img_tag(src: &str) -> String {
    format!(
        r#"<img src="{}" alt="Stori Logo" style="width:120px;">"#,
        src.replace('"', "&quot;")
    )
}

fn image_content_type(path: &Path) -> Option<ContentType> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    };

    ContentType::parse(mime).ok()
}

/// An unreadable logo is not fatal: the report goes out without it
fn prepare_logo(logo: Option<&Logo>) -> Option<LogoPart> {
    match logo? {
        Logo::Url(url) => Some(LogoPart::Remote(img_tag(url))),
        Logo::File(path) => {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("⚠️  Logo {} not readable, sending without it: {}", path.display(), e);
                    return None;
                }
            };
            let content_type = image_content_type(path)?;
            Some(LogoPart::Inline {
                bytes,
                content_type,
            })
        }
    }
}

/// Put the logo (if any) above the report body
pub fn compose_html(body: &str, logo_tag: Option<&str>) -> String {
    match logo_tag {
        Some(tag) => format!("{}{}", tag, body),
        None => body.to_string(),
    }
}

// ============================================================================
// SENDER CAPABILITY
// ============================================================================

pub trait ReportSender {
    /// Deliver `html_body` to `recipient`. Any delivery problem is an error.
    fn send(&self, recipient: &str, subject: &str, html_body: &str, logo: Option<&Logo>)
        -> Result<()>;
}

/// SMTP sender (STARTTLS relay, credentials when a user is configured)
pub struct SmtpSender {
    config: Config,
}

impl SmtpSender {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn from_mailbox(&self) -> Result<Mailbox> {
        let address: Address =
            self.config
                .from_email
                .parse()
                .map_err(|source| SummaryError::InvalidAddress {
                    address: self.config.from_email.clone(),
                    source,
                })?;

        let name = self.config.account_name.trim();
        Ok(Mailbox::new((!name.is_empty()).then(|| name.to_string()), address))
    }

    /// Build the MIME message without sending it
    pub fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        logo: Option<&Logo>,
    ) -> Result<Message> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|source| SummaryError::InvalidAddress {
                address: recipient.to_string(),
                source,
            })?;

        let builder = Message::builder()
            .from(self.from_mailbox()?)
            .to(to)
            .subject(subject);

        let message = match prepare_logo(logo) {
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string())?,
            Some(LogoPart::Remote(tag)) => builder
                .header(ContentType::TEXT_HTML)
                .body(compose_html(html_body, Some(&tag)))?,
            Some(LogoPart::Inline {
                bytes,
                content_type,
            }) => {
                let html = compose_html(html_body, Some(&img_tag(&format!("cid:{}", LOGO_CID))));
                builder.multipart(
                    MultiPart::related()
                        .singlepart(SinglePart::html(html))
                        .singlepart(
                            Attachment::new_inline(LOGO_CID.to_string()).body(bytes, content_type),
                        ),
                )?
            }
        };

        Ok(message)
    }

    fn transport(&self, recipient: &str) -> Result<SmtpTransport> {
        let transport_error = |source: lettre::transport::smtp::Error| SummaryError::Transport {
            recipient: recipient.to_string(),
            source: Box::new(source),
        };

        let mut builder =
            SmtpTransport::starttls_relay(&self.config.smtp_host).map_err(transport_error)?;

        if self.config.smtp_port != 0 {
            builder = builder.port(self.config.smtp_port);
        }
        if !self.config.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_user.clone(),
                self.config.smtp_pass.clone(),
            ));
        }

        Ok(builder.build())
    }
}

impl ReportSender for SmtpSender {
    fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        logo: Option<&Logo>,
    ) -> Result<()> {
        let message = self.build_message(recipient, subject, html_body, logo)?;

        info!(
            "📧 Sending report to {} via {}:{}",
            recipient, self.config.smtp_host, self.config.smtp_port
        );

        self.transport(recipient)?
            .send(&message)
            .map_err(|source| SummaryError::Transport {
                recipient: recipient.to_string(),
                source: Box::new(source),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn sender() -> SmtpSender {
        SmtpSender::new(Config {
            smtp_host: "localhost".to_string(),
            from_email: "reports@example.com".to_string(),
            account_name: "Stori".to_string(),
            ..Config::default()
        })
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_logo_from_value() {
        assert_eq!(
            Logo::from_value("https://example.com/logo.png"),
            Logo::Url("https://example.com/logo.png".to_string())
        );
        assert_eq!(
            Logo::from_value("stori_logo.png"),
            Logo::File(PathBuf::from("stori_logo.png"))
        );
    }

    #[test]
    fn test_compose_html_with_remote_logo() {
        let tag = img_tag("https://example.com/logo.png");
        let html = compose_html("<b>Body</b>", Some(&tag));

        assert!(html.starts_with(r#"<img src="https://example.com/logo.png""#));
        assert!(html.ends_with("<b>Body</b>"));
        assert_eq!(compose_html("<b>Body</b>", None), "<b>Body</b>");
    }

    #[test]
    fn test_message_headers() {
        let message = sender()
            .build_message("test@example.com", SUBJECT, "<b>Body</b>", None)
            .unwrap();
        let text = formatted(&message);

        assert!(text.contains("Subject: Stori Account Summary"), "{}", text);
        assert!(text.contains("test@example.com"));
        assert!(text.contains("reports@example.com"));
        assert!(text.contains("text/html"));
    }

    #[test]
    fn test_inline_logo_makes_related_multipart() {
        let mut logo = Builder::new().suffix(".png").tempfile().unwrap();
        logo.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let message = sender()
            .build_message(
                "test@example.com",
                SUBJECT,
                "<b>Body</b>",
                Some(&Logo::File(logo.path().to_path_buf())),
            )
            .unwrap();
        let text = formatted(&message);

        assert!(text.contains("multipart/related"), "{}", text);
        assert!(text.contains("image/png"));
        assert!(text.contains("Content-ID"));
    }

    #[test]
    fn test_unreadable_logo_is_skipped() {
        let message = sender()
            .build_message(
                "test@example.com",
                SUBJECT,
                "<b>Body</b>",
                Some(&Logo::File(PathBuf::from("/no/such/logo.png"))),
            )
            .unwrap();

        assert!(!formatted(&message).contains("multipart/related"));
    }

    #[test]
    fn test_invalid_recipient() {
        let err = sender()
            .build_message("not an address", SUBJECT, "<b>Body</b>", None)
            .unwrap_err();

        assert!(matches!(err, SummaryError::InvalidAddress { .. }), "got {:?}", err);
    }

    #[test]
    fn test_invalid_from_address() {
        let sender = SmtpSender::new(Config::default());
        let err = sender
            .build_message("test@example.com", SUBJECT, "<b>Body</b>", None)
            .unwrap_err();

        assert!(matches!(err, SummaryError::InvalidAddress { ref address, .. } if address.is_empty()));
    }
}
