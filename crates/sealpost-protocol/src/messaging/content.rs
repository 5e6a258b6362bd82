use crate::error::ProtocolError;
use crate::messaging::part::{ContentKind, MessagePart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    File,
    ImageAndVideo,
}

impl AttachmentKind {
    pub fn content_kind(self) -> ContentKind {
        match self {
            Self::File => ContentKind::File,
            Self::ImageAndVideo => ContentKind::ImageAndVideo,
        }
    }

    pub fn from_content_kind(kind: ContentKind) -> Option<Self> {
        match kind {
            ContentKind::File => Some(Self::File),
            ContentKind::ImageAndVideo => Some(Self::ImageAndVideo),
            _ => None,
        }
    }
}

/// One attached file. Reading it from storage is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The files attached to one message, all of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachments {
    pub kind: AttachmentKind,
    pub files: Vec<Attachment>,
}

/// Text part first (even when empty), then one part per attached file.
pub fn build_content_parts(
    text: &str,
    attachments: Option<&Attachments>,
) -> Result<Vec<MessagePart>, ProtocolError> {
    let mut parts = vec![MessagePart::text(text)];
    if let Some(attachments) = attachments {
        let kind = attachments.kind.content_kind();
        for file in &attachments.files {
            parts.push(MessagePart::attachment(
                kind,
                file.file_name.as_bytes(),
                &file.bytes,
            )?);
        }
    }
    Ok(parts)
}

/// Like [`build_content_parts`], prefixed with a `Uid` part naming the message
/// so it can later be deleted.
pub fn build_content_parts_with_uid(
    message_uid: &str,
    text: &str,
    attachments: Option<&Attachments>,
) -> Result<Vec<MessagePart>, ProtocolError> {
    let mut parts = vec![MessagePart::new(ContentKind::Uid, message_uid.as_bytes())];
    parts.extend(build_content_parts(text, attachments)?);
    Ok(parts)
}

/// Parts for a `DeleteMessage` envelope.
pub fn build_deletion_parts(message_uid: &str) -> Vec<MessagePart> {
    vec![MessagePart::new(ContentKind::Uid, message_uid.as_bytes())]
}

pub(crate) fn first_utf8(parts: &[MessagePart], kind: ContentKind) -> Option<Result<&str, ProtocolError>> {
    parts.iter().find(|p| p.kind == kind).map(|p| {
        std::str::from_utf8(&p.content)
            .map_err(|_| ProtocolError::Framing(format!("{kind:?} part is not valid UTF-8")))
    })
}

/// Collect the attachment parts back into [`Attachments`].
pub(crate) fn collect_attachments(
    parts: &[MessagePart],
) -> Result<Option<Attachments>, ProtocolError> {
    let mut collected: Option<Attachments> = None;
    for part in parts.iter().filter(|p| p.kind.is_attachment()) {
        let kind = AttachmentKind::from_content_kind(part.kind)
            .ok_or_else(|| ProtocolError::Framing("not an attachment".into()))?;
        let (name, bytes) = part.split_attachment()?;
        let file = Attachment {
            file_name: String::from_utf8(name.to_vec())
                .map_err(|_| ProtocolError::Framing("attachment file name is not UTF-8".into()))?,
            bytes: bytes.to_vec(),
        };
        match collected.as_mut() {
            None => {
                collected = Some(Attachments {
                    kind,
                    files: vec![file],
                });
            }
            Some(existing) if existing.kind == kind => existing.files.push(file),
            Some(_) => {
                return Err(ProtocolError::Framing(
                    "message mixes file and image attachments".into(),
                ))
            }
        }
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos() -> Attachments {
        Attachments {
            kind: AttachmentKind::ImageAndVideo,
            files: vec![
                Attachment {
                    file_name: "one.jpg".into(),
                    bytes: vec![1, 2, 3],
                },
                Attachment {
                    file_name: "two.mp4".into(),
                    bytes: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn text_part_always_first() {
        let parts = build_content_parts("", None).unwrap();
        assert_eq!(parts, vec![MessagePart::text("")]);

        let parts = build_content_parts("look", Some(&photos())).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], MessagePart::text("look"));
        assert!(parts[1..]
            .iter()
            .all(|p| p.kind == ContentKind::ImageAndVideo));
    }

    #[test]
    fn attachments_survive_collection() {
        let parts = build_content_parts("look", Some(&photos())).unwrap();
        assert_eq!(collect_attachments(&parts).unwrap(), Some(photos()));
        assert_eq!(
            collect_attachments(&build_content_parts("none", None).unwrap()).unwrap(),
            None
        );
    }

    #[test]
    fn mixed_attachment_kinds_rejected() {
        let mut parts = build_content_parts("look", Some(&photos())).unwrap();
        parts.push(MessagePart::attachment(ContentKind::File, b"doc.pdf", b"%PDF").unwrap());
        assert!(collect_attachments(&parts).is_err());
    }

    #[test]
    fn uid_part_leads() {
        let parts = build_content_parts_with_uid("msg-1", "hi", None).unwrap();
        assert_eq!(parts[0], MessagePart::new(ContentKind::Uid, "msg-1".as_bytes()));
        assert_eq!(first_utf8(&parts, ContentKind::Message).unwrap().unwrap(), "hi");
        assert_eq!(build_deletion_parts("msg-1"), parts[..1]);
    }
}
