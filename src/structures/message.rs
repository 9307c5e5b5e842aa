use super::TaggedPropval;
use crate::codec::{Buffer, Pop, SerializationError};

/// Full content of a message: properties, recipients and attachments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageContent {
    pub propvals: Vec<TaggedPropval<'static>>,
    /// One propval list per recipient row.
    pub recipients: Vec<Vec<TaggedPropval<'static>>>,
    pub attachments: Vec<AttachmentContent>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentContent {
    pub propvals: Vec<TaggedPropval<'static>>,
    pub embedded: Option<Box<MessageContent>>,
}

impl MessageContent {
    pub fn get(&self, tag: u32) -> Option<&TaggedPropval<'static>> {
        self.propvals.iter().find(|tp| tp.tag() == tag)
    }
}

// Recipient and attachment sets are optional on the wire; an absent set decodes empty.
fn pop_optional<T>(
    buf: &mut Buffer,
    mut pop_item: impl FnMut(&mut Buffer) -> Result<T, SerializationError>,
) -> Result<Vec<T>, SerializationError> {
    if !buf.pop::<bool>()? {
        return Ok(Vec::new());
    }
    let count: u32 = buf.pop()?;
    let mut items = Vec::with_capacity((count as usize).min(buf.remaining()));
    for _ in 0..count {
        items.push(pop_item(buf)?);
    }
    Ok(items)
}

impl Pop for MessageContent {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let propvals = buf.pop_list16()?;
        let recipients = pop_optional(buf, Buffer::pop_list16::<TaggedPropval<'static>>)?;
        let attachments = pop_optional(buf, Buffer::pop::<AttachmentContent>)?;
        Ok(Self {
            propvals,
            recipients,
            attachments,
        })
    }
}

impl Pop for AttachmentContent {
    fn pop_from(buf: &mut Buffer) -> Result<Self, SerializationError> {
        let propvals = buf.pop_list16()?;
        let embedded = if buf.pop::<bool>()? {
            Some(Box::new(buf.pop()?))
        } else {
            None
        };
        Ok(Self { propvals, embedded })
    }
}
