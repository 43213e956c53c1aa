use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::OperationType;
use apollo_compiler::executable;
use apollo_compiler::parser::SourceMap;
use apollo_compiler::parser::SourceSpan;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::LOCAL_CACHE_MUTATION_DIRECTIVE;
use crate::entity::EntityStorage;
use crate::fragment::NamedFragment;
use crate::selection::EntityField;

/// A stable identifier of an operation and every fragment it uses: the SHA-256 digest of their
/// source text.
///
/// Whitespace between lines does not affect the identifier, but any other change to the operation
/// or one of its fragments does, as does a change in the order fragments are first referenced.
#[derive(Clone, Hash, PartialEq, Eq, Serialize)]
pub struct OperationIdentifier(#[serde(with = "hex")] Vec<u8>);

impl OperationIdentifier {
    fn new<'a>(
        operation_source: &str,
        fragment_sources: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(single_line(operation_source));
        for fragment_source in fragment_sources {
            hasher.update("\n");
            hasher.update(single_line(fragment_source));
        }
        Self(hasher.finalize().as_slice().into())
    }

    /// Return the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for OperationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OperationIdentifier")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl fmt::Display for OperationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Collapses a definition's source text to one line: each line is trimmed, blank lines are
/// dropped and the rest are joined by a single space.
pub fn single_line(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The source text a definition was parsed from, or its serialized form when the definition was
/// not parsed from a source file.
pub(crate) fn definition_source(
    location: Option<SourceSpan>,
    sources: &SourceMap,
    serialize: impl FnOnce() -> String,
) -> String {
    location
        .and_then(|span| {
            let file = sources.get(&span.file_id())?;
            file.source_text().get(span.offset()..span.end_offset())
        })
        .map_or_else(serialize, str::to_owned)
}

/// An operation of the document, with every entity it selects.
#[derive(Debug)]
pub struct Operation {
    pub definition: Node<executable::Operation>,
    /// The `data` field: an entity field of the operation's root type.
    pub root_field: EntityField,
    /// Every fragment the operation uses, directly or through other fragments, in the order they
    /// are first referenced.
    pub referenced_fragments: Vec<Arc<NamedFragment>>,
    pub entities: EntityStorage,
    pub contains_deferred_fragment: bool,
    source: String,
    identifier: OnceLock<OperationIdentifier>,
}

impl Operation {
    pub(crate) fn new(
        definition: Node<executable::Operation>,
        root_field: EntityField,
        referenced_fragments: Vec<Arc<NamedFragment>>,
        entities: EntityStorage,
        contains_deferred_fragment: bool,
        source: String,
    ) -> Self {
        Self {
            definition,
            root_field,
            referenced_fragments,
            entities,
            contains_deferred_fragment,
            source,
            identifier: OnceLock::new(),
        }
    }

    pub fn name(&self) -> Option<&Name> {
        self.definition.name.as_ref()
    }

    pub fn operation_type(&self) -> OperationType {
        self.definition.operation_type
    }

    /// The operation's source text as written in the document.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_local_cache_mutation(&self) -> bool {
        self.definition
            .directives
            .has(LOCAL_CACHE_MUTATION_DIRECTIVE)
    }

    pub fn referenced_fragment(&self, name: &str) -> Option<&Arc<NamedFragment>> {
        self.referenced_fragments
            .iter()
            .find(|fragment| fragment.name() == name)
    }

    /// Computed on first use, then cached.
    pub fn operation_identifier(&self) -> &OperationIdentifier {
        self.identifier.get_or_init(|| {
            OperationIdentifier::new(
                &self.source,
                self.referenced_fragments
                    .iter()
                    .map(|fragment| fragment.source()),
            )
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} {name} ", self.operation_type())?,
            None => write!(f, "{} ", self.operation_type())?,
        }
        write!(f, "{}", self.root_field.selection_set)
    }
}
