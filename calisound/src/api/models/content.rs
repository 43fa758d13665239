//! API models for site content blocks, contact form, and link stats.

use crate::db::models::contact::{ContactCreateDBRequest, ContactDBResponse};
use crate::db::models::content::{ContentCreateDBRequest, ContentDBResponse, ContentUpdateDBRequest};
use crate::errors::Error;
use crate::types::{ContactMessageId, ContentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// What a content block is: an FAQ entry, a link-hub link, or page copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Faq,
    Link,
    Page,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Faq => "faq",
            ContentKind::Link => "link",
            ContentKind::Page => "page",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faq" => Ok(ContentKind::Faq),
            "link" => Ok(ContentKind::Link),
            "page" => Ok(ContentKind::Page),
            other => Err(Error::BadRequest {
                message: format!("Unknown content kind: {other}"),
            }),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContentCreate {
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl ContentCreate {
    pub fn validate(&self) -> Result<(), Error> {
        if self.kind == ContentKind::Link && self.url.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(Error::BadRequest {
                message: "Link content requires a url".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContentUpdate {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub position: Option<i32>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub id: ContentId,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub position: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContentDBResponse> for ContentResponse {
    type Error = Error;

    fn try_from(block: ContentDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: block.id,
            kind: block.kind.parse()?,
            slug: block.slug,
            title: block.title,
            body: block.body,
            url: block.url,
            position: block.position,
            published: block.published,
            created_at: block.created_at,
            updated_at: block.updated_at,
        })
    }
}

impl From<ContentCreate> for ContentCreateDBRequest {
    fn from(api: ContentCreate) -> Self {
        Self {
            kind: api.kind.as_str().to_string(),
            slug: api.slug,
            title: api.title,
            body: api.body,
            url: api.url,
            position: api.position,
            published: api.published,
        }
    }
}

impl From<ContentUpdate> for ContentUpdateDBRequest {
    fn from(api: ContentUpdate) -> Self {
        Self {
            slug: api.slug,
            title: api.title,
            body: api.body,
            url: api.url,
            position: api.position,
            published: api.published,
        }
    }
}

/// Public contact form submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactSubmit {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub body: String,
}

impl ContactSubmit {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Name is required".to_string(),
            });
        }
        // Cheap shape check, full validation is the mail server's job
        if !self.email.contains('@') || self.email.trim().len() < 3 {
            return Err(Error::BadRequest {
                message: "A valid email address is required".to_string(),
            });
        }
        if self.body.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Message body is required".to_string(),
            });
        }
        if self.body.chars().count() > 5000 {
            return Err(Error::BadRequest {
                message: "Message body exceeds 5000 characters".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_db_request(self, client_ip: String) -> ContactCreateDBRequest {
        ContactCreateDBRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject,
            body: self.body.trim().to_string(),
            client_ip: Some(client_ip),
        }
    }
}

/// Admin view of a contact message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub body: String,
    pub client_ip: Option<String>,
    pub handled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ContactDBResponse> for ContactResponse {
    fn from(message: ContactDBResponse) -> Self {
        Self {
            id: message.id,
            name: message.name,
            email: message.email,
            subject: message.subject,
            body: message.body,
            client_ip: message.client_ip,
            handled: message.handled,
            created_at: message.created_at,
        }
    }
}

/// Click totals for one link block.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkClickStats {
    pub content_id: ContentId,
    pub clicks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_requires_url() {
        let create = ContentCreate {
            kind: ContentKind::Link,
            slug: "bandcamp".to_string(),
            title: "Bandcamp".to_string(),
            body: None,
            url: None,
            position: 0,
            published: true,
        };
        assert!(create.validate().is_err());

        let create = ContentCreate {
            url: Some("https://calisound.bandcamp.com".to_string()),
            ..create
        };
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_faq_does_not_require_url() {
        let create = ContentCreate {
            kind: ContentKind::Faq,
            slug: "bookings".to_string(),
            title: "How do I book you?".to_string(),
            body: Some("Email us.".to_string()),
            url: None,
            position: 0,
            published: true,
        };
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_contact_validation() {
        let good = ContactSubmit {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: None,
            body: "Hi there".to_string(),
        };
        assert!(good.validate().is_ok());

        let bad_email = ContactSubmit {
            email: "not-an-email".to_string(),
            name: "Ada".to_string(),
            subject: None,
            body: "Hi".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }
}
