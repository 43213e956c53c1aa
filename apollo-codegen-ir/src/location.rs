use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::atomic;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::NamedType;
use apollo_compiler::executable;

use crate::field_path::FieldPath;
use crate::field_path::FieldPathComponent;

// Global storage for the counter used to uniquely identify source definitions
static NEXT_ID: atomic::AtomicUsize = atomic::AtomicUsize::new(1);

/// Opaque identity of one [`SourceDefinition`].
///
/// Every call to [`SourceDefinition::operation`] or [`SourceDefinition::named_fragment`] gets a
/// new id, so two textually identical definitions never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(usize);

impl DefinitionId {
    fn new() -> Self {
        // atomically increment global counter
        Self(NEXT_ID.fetch_add(1, atomic::Ordering::AcqRel))
    }
}

#[derive(Debug, Clone)]
enum Definition {
    Operation(Node<executable::Operation>),
    NamedFragment(Node<executable::Fragment>),
}

/// The operation or named fragment an entity was selected in.
///
/// Equality and hashing only consider the definition's identity, not its contents.
#[derive(Debug, Clone)]
pub struct SourceDefinition {
    id: DefinitionId,
    definition: Definition,
}

impl SourceDefinition {
    pub fn operation(operation: Node<executable::Operation>) -> Self {
        Self {
            id: DefinitionId::new(),
            definition: Definition::Operation(operation),
        }
    }

    pub fn named_fragment(fragment: Node<executable::Fragment>) -> Self {
        Self {
            id: DefinitionId::new(),
            definition: Definition::NamedFragment(fragment),
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn is_operation(&self) -> bool {
        matches!(self.definition, Definition::Operation(_))
    }

    pub fn as_operation(&self) -> Option<&Node<executable::Operation>> {
        match &self.definition {
            Definition::Operation(operation) => Some(operation),
            Definition::NamedFragment(_) => None,
        }
    }

    pub fn as_named_fragment(&self) -> Option<&Node<executable::Fragment>> {
        match &self.definition {
            Definition::Operation(_) => None,
            Definition::NamedFragment(fragment) => Some(fragment),
        }
    }

    /// The name of the definition; anonymous operations have none.
    pub fn name(&self) -> Option<&Name> {
        match &self.definition {
            Definition::Operation(operation) => operation.name.as_ref(),
            Definition::NamedFragment(fragment) => Some(&fragment.name),
        }
    }

    /// The composite type the definition's selection set is selected on.
    pub fn root_type(&self) -> &NamedType {
        match &self.definition {
            Definition::Operation(operation) => &operation.selection_set.ty,
            Definition::NamedFragment(fragment) => fragment.type_condition(),
        }
    }
}

impl PartialEq for SourceDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceDefinition {}

impl Hash for SourceDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for SourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition {
            Definition::Operation(operation) => match &operation.name {
                Some(name) => write!(f, "{} {name}", operation.operation_type),
                None => write!(f, "{}", operation.operation_type),
            },
            Definition::NamedFragment(fragment) => write!(f, "fragment {}", fragment.name),
        }
    }
}

/// The identity key of an entity: the definition it was selected in and the path of fields from
/// that definition's root.
///
/// A root location carries no field path. An absent path and an empty path are the same location.
#[derive(Debug, Clone)]
pub struct Location {
    pub source: SourceDefinition,
    pub field_path: Option<FieldPath>,
}

impl Location {
    pub fn root(source: SourceDefinition) -> Self {
        Self {
            source,
            field_path: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.field_path.as_ref().is_none_or(FieldPath::is_empty)
    }

    /// The field path, with the root represented as an empty path.
    pub fn path(&self) -> FieldPath {
        self.field_path.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn appending(&self, component: FieldPathComponent) -> Self {
        Self {
            source: self.source.clone(),
            field_path: Some(self.path().appending(component)),
        }
    }

    #[must_use]
    pub fn appending_all(&self, components: impl IntoIterator<Item = FieldPathComponent>) -> Self {
        Self {
            source: self.source.clone(),
            field_path: Some(self.path().appending_all(components)),
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.path() == other.path()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.path().hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}.{}", self.source, self.path())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::hash::BuildHasher;

    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::ast::Type;
    use apollo_compiler::name;

    use super::*;

    const SCHEMA: &str = r#"
        type Query { hero: Character }
        type Character { name: String friend: Character }
    "#;

    fn parse_operation(query: &str) -> Node<executable::Operation> {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let document =
            ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
        document.operations.get(None).unwrap().clone()
    }

    fn hero_friend(location: &Location) -> Location {
        location
            .appending(FieldPathComponent::new(
                name!("hero"),
                Type::Named(name!("Character")),
            ))
            .appending(FieldPathComponent::new(
                name!("friend"),
                Type::Named(name!("Character")),
            ))
    }

    #[test]
    fn same_source_and_path_are_equal() {
        let source = SourceDefinition::operation(parse_operation(
            "query Q { hero { friend { name } } }",
        ));
        let left = hero_friend(&Location::root(source.clone()));
        let right = Location::root(source).appending_all([
            FieldPathComponent::new(name!("hero"), Type::Named(name!("Character"))),
            FieldPathComponent::new(name!("friend"), Type::Named(name!("Character"))),
        ]);
        assert_eq!(left, right);

        let random_state = std::hash::RandomState::new();
        assert_eq!(random_state.hash_one(&left), random_state.hash_one(&right));
        assert_eq!(left.to_string(), "query Q.hero.friend");
    }

    #[test]
    fn textually_identical_sources_are_distinct() {
        let query = "query Q { hero { friend { name } } }";
        let first = Location::root(SourceDefinition::operation(parse_operation(query)));
        let second = Location::root(SourceDefinition::operation(parse_operation(query)));
        assert_ne!(first, second);
        assert_ne!(hero_friend(&first), hero_friend(&second));
    }

    #[test]
    fn absent_and_empty_paths_are_the_same_root() {
        let source = SourceDefinition::operation(parse_operation("{ hero { name } }"));
        let absent = Location::root(source.clone());
        let empty = Location {
            source,
            field_path: Some(FieldPath::root()),
        };
        assert!(absent.is_root());
        assert!(empty.is_root());
        assert_eq!(absent, empty);

        let random_state = std::hash::RandomState::new();
        assert_eq!(random_state.hash_one(&absent), random_state.hash_one(&empty));
    }
}
