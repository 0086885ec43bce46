//! Position-tracked, error-tolerant streaming parser for EXML markup.
//!
//! The tokenizer emits ranged events; the parser folds them into an arena
//! tree whose nodes keep exact byte offsets for every tag, attribute and
//! text fragment. Malformed input never aborts a parse: problems accumulate
//! as ranged errors on the resulting document.

pub mod namespace;
pub mod node;
pub mod parser;
pub mod tokenizer;

pub use namespace::{Namespace, QName};
pub use node::{Attribute, NodeData, NodeId, ParseError, TextFragment, TextKind, XmlDocument};
pub use parser::parse;
