//! Class/namespace model of an EXML project.
//!
//! Source-derived facts (from the pluggable fact scanner) and markup-derived
//! facts (every `.exml` file declares a type extending the type its root tag
//! resolves to) merge into one inheritance graph, rebuilt wholesale on each
//! debounced batch of file changes.

pub mod dialect;
pub mod facts;
pub mod graph;
pub mod index;
pub mod markup;
pub mod project;
pub mod properties;
pub mod resolver;
pub mod tracker;

pub use dialect::Dialect;
pub use facts::{ClassFacts, FactMap, FactScanner, JsonFactScanner, StaticFactScanner};
pub use graph::{ClassGraph, ClassNode, Prop};
pub use index::ProjectIndex;
pub use project::ProjectModel;
pub use resolver::NamespaceResolver;
pub use tracker::{ChangeBatch, ChangeKind, ChangeTracker};
