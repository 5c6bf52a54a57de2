//! votable: build, serialize and query VOTable 1.1 documents
//!
//! This crate provides functionality to:
//! - Build typed `PARAM`, `FIELD`, `TABLE` and `RESOURCE` nodes
//! - Wrap a fragment into a namespaced `VOTABLE` document
//! - Serialize documents to indented UTF-8 XML
//! - Parse XML back and look up PARAM attributes by structural path
//!
//! # Examples
//! ```
//! use votable::{build_param_node, build_resource_node, serialize_to_string, Datatype};
//!
//! fn example() -> votable::Result<String> {
//!     let param = build_param_node("Freq", Some("Hz"), Datatype::Double, None, "100.5")?;
//!     let resource = build_resource_node("Detector", "H1", vec![param])?;
//!     serialize_to_string(resource)
//! }
//! # assert!(example().unwrap().contains("VOTABLE"));
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod document;
pub mod error;
pub mod path;
pub mod query;
pub mod serializer;
pub mod symbols;
pub mod tree;

mod cursor;

// Re-exports
pub use builder::{
    build_field_node, build_param_node, build_resource_node, build_table_node, Column,
    Serialization,
};
pub use document::{assemble_document, reconcile_default_namespace};
pub use error::{Error, ErrorKind, Pos, Result};
pub use path::{Bindings, Path, Selection};
pub use query::get_resource_param_attribute;
pub use serializer::{render_document, serialize_to_string, SerializeConfig};
pub use symbols::{Attribute, Datatype, IntoDatatype};
pub use tree::{Content, Document, Element, Namespace, Reader, ReaderConfig};
