//! Message assembly: headers, body and the optional attachment.
//!
//! [`assemble`] produces a [`ComposedMessage`], a transport-neutral value.
//! [`ComposedMessage::to_message`] turns it into a lettre MIME message right
//! before sending.

use std::io;
use std::path::{Path, PathBuf};

use lettre::Message;
use lettre::message::header::ContentType as MimeType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};

use crate::config::ContentType;
use crate::error::ComposeError;
use crate::paths::join_base;

/// Result of looking up the attachment on disk.
///
/// A missing file is not fatal; every other filesystem problem is.
#[derive(Debug)]
pub enum AttachmentLookup {
    Found(PathBuf),
    Missing(PathBuf),
    Failed { path: PathBuf, source: io::Error },
}

/// Resolve `file` against `base_dir` and check that it is a readable file.
pub fn lookup_attachment(base_dir: &Path, file: &Path) -> AttachmentLookup {
    let path = join_base(base_dir, file);

    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => AttachmentLookup::Failed {
            source: io::Error::other(format!("{} is a directory", path.display())),
            path,
        },
        Ok(_) => AttachmentLookup::Found(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => AttachmentLookup::Missing(path),
        Err(source) => AttachmentLookup::Failed { path, source },
    }
}

/// Outgoing message before MIME encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// `None` means no From header is set.
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub content_type: ContentType,
    /// Absolute path of the file to attach.
    pub attachment: Option<PathBuf>,
}

/// Build the outgoing message.
///
/// An attachment that does not exist is logged and skipped. Any other
/// attachment problem fails composition.
pub fn assemble(
    sender: Option<&str>,
    recipient: &str,
    subject: String,
    body: String,
    content_type: ContentType,
    base_dir: &Path,
    attach_file: Option<&Path>,
) -> Result<ComposedMessage, ComposeError> {
    let attachment = match attach_file.map(|file| lookup_attachment(base_dir, file)) {
        None => None,
        Some(AttachmentLookup::Found(path)) => Some(path),
        Some(AttachmentLookup::Missing(path)) => {
            tracing::warn!(path = %path.display(), "Attachment file is missing, sending without it");
            None
        }
        Some(AttachmentLookup::Failed { path, source }) => {
            return Err(ComposeError::Attachment { path, source });
        }
    };

    Ok(ComposedMessage {
        from: sender.filter(|s| !s.is_empty()).map(String::from),
        to: recipient.to_string(),
        subject,
        body,
        content_type,
        attachment,
    })
}

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, ComposeError> {
    value.parse().map_err(|e: lettre::address::AddressError| ComposeError::InvalidAddress {
        field,
        value: value.to_string(),
        message: e.to_string(),
    })
}

impl ComposedMessage {
    /// Encode as a lettre message.
    ///
    /// SMTP needs an envelope sender. Without a From header, `fallback_sender`
    /// (normally the SMTP username) is used when it is a valid mailbox.
    pub fn to_message(&self, fallback_sender: Option<&str>) -> Result<Message, ComposeError> {
        let from = match (&self.from, fallback_sender) {
            (Some(from), _) => parse_mailbox("sender", from)?,
            (None, Some(fallback)) => fallback
                .parse::<Mailbox>()
                .map_err(|_| ComposeError::MissingSender)?,
            (None, None) => return Err(ComposeError::MissingSender),
        };
        let to = parse_mailbox("recipient", &self.to)?;

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.as_str());

        let body_type = match self.content_type {
            ContentType::Html => MimeType::TEXT_HTML,
            ContentType::Plain => MimeType::TEXT_PLAIN,
        };

        let message = match &self.attachment {
            None => builder.header(body_type).body(self.body.clone()),
            Some(path) => {
                let attachment = read_attachment(path)?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(
                            SinglePart::builder()
                                .header(body_type)
                                .body(self.body.clone()),
                        )
                        .singlepart(attachment),
                )
            }
        };

        message.map_err(|e| ComposeError::Build(e.to_string()))
    }
}

/// Load the attachment and guess its MIME type from the extension.
fn read_attachment(path: &Path) -> Result<SinglePart, ComposeError> {
    let content = std::fs::read(path).map_err(|source| ComposeError::Attachment {
        path: path.to_path_buf(),
        source,
    })?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = MimeType::parse(mime.essence_str())
        .map_err(|e| ComposeError::Build(format!("attachment content type: {}", e)))?;

    Ok(Attachment::new(filename).body(content, content_type))
}
