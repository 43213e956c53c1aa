//! Intermediate representation of the operations and fragments of a GraphQL document, as consumed
//! by client code generation.
//!
//! [`Ir`] walks a document built against a schema and produces:
//! - one [`Operation`] per operation, with its selections, the [`Entity`] of every object it
//!   selects, and a stable [`OperationIdentifier`];
//! - one [`NamedFragment`] per fragment that is used, built once and shared by every operation
//!   and fragment that spreads it.
//!
//! Entities are identified by [`Location`]: the definition they are selected in and the path of
//! fields leading to them. Every selection that reaches the same location, directly or through a
//! fragment spread, contributes to the same entity.
//!
//! ## Usage
//!
//! ```
//! use apollo_codegen_ir::Ir;
//! use apollo_compiler::ExecutableDocument;
//! use apollo_compiler::Schema;
//!
//! let schema = Schema::parse_and_validate(
//!     "type Query { hero: Character } type Character { name: String }",
//!     "schema.graphql",
//! )
//! .unwrap();
//! let document = ExecutableDocument::parse_and_validate(
//!     &schema,
//!     "query Hero { hero { ...HeroName } } fragment HeroName on Character { name }",
//!     "query.graphql",
//! )
//! .unwrap();
//!
//! let mut ir = Ir::new(schema, document.into_inner()).unwrap();
//! let operation = ir.build_operation_named(Some("Hero")).unwrap();
//! assert_eq!(operation.referenced_fragments.len(), 1);
//! assert_eq!(operation.operation_identifier().to_string().len(), 64);
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod builder;
pub mod conditions;
pub mod defer;
mod display_helpers;
pub mod entity;
pub mod error;
pub mod field_collector;
pub mod field_path;
pub mod fragment;
mod ir;
pub mod location;
pub mod operation;
pub mod schema;
pub mod selection;
pub mod selection_tree;
pub(crate) mod utils;

pub use crate::conditions::AnyOf;
pub use crate::conditions::InclusionCondition;
pub use crate::conditions::InclusionConditions;
pub use crate::defer::IsDeferred;
pub use crate::entity::Entity;
pub use crate::entity::EntityId;
pub use crate::entity::EntityStorage;
pub use crate::error::IrError;
pub use crate::field_collector::FieldCollector;
pub use crate::field_path::FieldPath;
pub use crate::field_path::FieldPathComponent;
pub use crate::fragment::NamedFragment;
pub use crate::ir::Ir;
pub use crate::location::Location;
pub use crate::location::SourceDefinition;
pub use crate::operation::Operation;
pub use crate::operation::OperationIdentifier;
pub use crate::schema::IrSchema;
pub use crate::selection::InlineFragmentSpread;
pub use crate::selection::NamedFragmentSpread;

/// Operations and fragments carrying this directive only update the client's local cache and are
/// never sent to a server.
pub const LOCAL_CACHE_MUTATION_DIRECTIVE: &str = "apollo_client_ios_localCacheMutation";
