//! Namespace and qualified-name value types.

use std::fmt;

/// An XML namespace declaration: a (possibly empty) prefix bound to a URI.
///
/// Equality compares both fields; schema matching compares URIs and
/// document-declaration lookups compare prefixes, both via accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: String,
    uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "xmlns=\"{}\"", self.uri)
        } else {
            write!(f, "xmlns:{}=\"{}\"", self.prefix, self.uri)
        }
    }
}

/// A qualified name: namespace URI plus local name. The key type for schema
/// lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub uri: String,
    pub local_name: String,
}

impl QName {
    pub fn new(uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.uri, self.local_name)
    }
}
