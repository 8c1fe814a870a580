//! Rendered document

use std::fmt;

/// Output of the rendering engine, input of the transport dispatcher
///
/// Immutable once built. Control markers from the layout stay as opaque text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes as sent to byte-oriented transports
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RenderedDocument {
    fn from(content: String) -> Self {
        Self(content)
    }
}

impl From<&str> for RenderedDocument {
    fn from(content: &str) -> Self {
        Self(content.to_string())
    }
}

impl AsRef<[u8]> for RenderedDocument {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
