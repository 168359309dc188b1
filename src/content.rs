//! Blog content blocks and placeholder binding.
//!
//! Content arrives as a JSON array of blocks. `text` and `image` blocks are
//! typed; anything else is kept verbatim so newer block kinds survive a
//! round trip through the server untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::LifecycleError;

/// The `value` of an image block: a placeholder index into this request's
/// `images` uploads, or a bound asset URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSlot {
    Placeholder(u64),
    Url(String),
}

impl MediaSlot {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_u64().map(MediaSlot::Placeholder),
            Value::String(s) => Some(MediaSlot::Url(s.clone())),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            MediaSlot::Placeholder(i) => Value::from(*i),
            MediaSlot::Url(u) => Value::String(u.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        value: String,
        extra: Map<String, Value>,
    },
    Image {
        value: MediaSlot,
        extra: Map<String, Value>,
    },
    /// A block of a kind this server does not interpret.
    Other(Value),
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        ContentBlock::Text { value: value.into(), extra: Map::new() }
    }

    pub fn image(value: MediaSlot) -> Self {
        ContentBlock::Image { value, extra: Map::new() }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            ContentBlock::Image { value: MediaSlot::Url(u), .. } => Some(u),
            _ => None,
        }
    }

    fn from_value(raw: Value) -> Self {
        let Value::Object(mut map) = raw else {
            return ContentBlock::Other(raw);
        };
        let kind = map.get("type").and_then(Value::as_str).map(str::to_owned);
        match kind.as_deref() {
            Some("text") => match map.remove("value") {
                Some(Value::String(value)) => {
                    map.remove("type");
                    ContentBlock::Text { value, extra: map }
                }
                Some(other) => {
                    map.insert("value".into(), other);
                    ContentBlock::Other(Value::Object(map))
                }
                None => ContentBlock::Other(Value::Object(map)),
            },
            Some("image") => match map.get("value").and_then(MediaSlot::from_value) {
                Some(value) => {
                    map.remove("value");
                    map.remove("type");
                    ContentBlock::Image { value, extra: map }
                }
                None => ContentBlock::Other(Value::Object(map)),
            },
            _ => ContentBlock::Other(Value::Object(map)),
        }
    }

    pub fn to_value(&self) -> Value {
        let (kind, value, extra) = match self {
            ContentBlock::Other(v) => return v.clone(),
            ContentBlock::Text { value, extra } => ("text", Value::String(value.clone()), extra),
            ContentBlock::Image { value, extra } => ("image", value.to_value(), extra),
        };
        let mut map = Map::with_capacity(extra.len() + 2);
        map.insert("type".into(), Value::String(kind.into()));
        map.insert("value".into(), value);
        for (k, v) in extra {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ContentBlock::from_value)
    }
}

/// The block sequence as a plain JSON tree, for the asset walker.
pub fn content_tree(blocks: &[ContentBlock]) -> Value {
    Value::Array(blocks.iter().map(ContentBlock::to_value).collect())
}

/// Parse the client-supplied content description. Must be a JSON array.
pub fn parse_content(raw: &str) -> Result<Vec<ContentBlock>, LifecycleError> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| LifecycleError::MalformedContent(format!("content is not valid JSON: {e}")))?;
    match parsed {
        Value::Array(items) => Ok(items.into_iter().map(ContentBlock::from_value).collect()),
        other => Err(LifecycleError::MalformedContent(format!(
            "content must be a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    Thumbnail,
    Images,
    GuestImage,
}

impl UploadField {
    pub fn form_name(self) -> &'static str {
        match self {
            UploadField::Thumbnail => "thumbnail",
            UploadField::Images => "images",
            UploadField::GuestImage => "guest_image",
        }
    }

    pub fn from_form_name(name: &str) -> Option<Self> {
        match name {
            "thumbnail" => Some(UploadField::Thumbnail),
            "images" => Some(UploadField::Images),
            "guest_image" => Some(UploadField::GuestImage),
            _ => None,
        }
    }
}

/// A file that has already been written to the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: UploadField,
    /// Position within its field's batch, in upload order.
    pub index: usize,
    pub key: String,
    pub storage_url: String,
}

/// The stored files of one request, grouped by field.
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    pub thumbnail: Option<UploadedFile>,
    pub images: Vec<UploadedFile>,
    pub guest_image: Option<UploadedFile>,
}

impl Uploads {
    /// Record a stored file, assigning its index within the field batch.
    pub fn push(&mut self, field: UploadField, key: String, storage_url: String) {
        let index = match field {
            UploadField::Images => self.images.len(),
            UploadField::Thumbnail | UploadField::GuestImage => 0,
        };
        let file = UploadedFile { field, index, key, storage_url };
        match field {
            UploadField::Thumbnail => self.thumbnail = Some(file),
            UploadField::Images => self.images.push(file),
            UploadField::GuestImage => self.guest_image = Some(file),
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        self.thumbnail
            .iter()
            .chain(self.images.iter())
            .chain(self.guest_image.iter())
            .map(|f| f.key.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none() && self.images.is_empty() && self.guest_image.is_none()
    }
}

/// Replace image placeholders with the URL of the upload at that index.
///
/// Matching is by declared index, so two blocks naming the same index share
/// the asset. Placeholders without a matching upload are returned unchanged.
pub fn bind_images(content: Vec<ContentBlock>, images: &[UploadedFile]) -> Vec<ContentBlock> {
    content
        .into_iter()
        .map(|block| match block {
            ContentBlock::Image { value: MediaSlot::Placeholder(i), extra } => {
                let value = usize::try_from(i)
                    .ok()
                    .and_then(|i| images.get(i))
                    .map(|up| MediaSlot::Url(up.storage_url.clone()))
                    .unwrap_or(MediaSlot::Placeholder(i));
                ContentBlock::Image { value, extra }
            }
            other => other,
        })
        .collect()
}

/// Single-slot variant of `bind_images`: an uploaded file wins, otherwise the
/// current value is kept.
pub fn bind_thumbnail(current: Option<String>, upload: Option<&UploadedFile>) -> Option<String> {
    match upload {
        Some(file) => Some(file.storage_url.clone()),
        None => current,
    }
}

/// Placeholders that survived binding.
pub fn unresolved_placeholders(content: &[ContentBlock]) -> Vec<u64> {
    content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Image { value: MediaSlot::Placeholder(i), .. } => Some(*i),
            _ => None,
        })
        .collect()
}
