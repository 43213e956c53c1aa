use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::NamedType;
use apollo_compiler::executable;

use crate::LOCAL_CACHE_MUTATION_DIRECTIVE;
use crate::entity::EntityStorage;
use crate::selection::EntityField;
use crate::selection::FieldId;

/// A named fragment of the document, built once per [`Ir`](crate::Ir) and shared by every
/// operation and fragment that spreads it.
#[derive(Debug)]
pub struct NamedFragment {
    pub definition: Node<executable::Fragment>,
    /// A field named after the fragment, selecting on its type condition.
    pub root_field: EntityField,
    /// Every fragment this fragment uses, directly or through other fragments, in the order they
    /// are first referenced.
    pub referenced_fragments: Vec<Arc<NamedFragment>>,
    pub entities: EntityStorage,
    pub contains_deferred_fragment: bool,
    source: String,
}

impl NamedFragment {
    pub(crate) fn new(
        definition: Node<executable::Fragment>,
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
        }
    }

    pub fn name(&self) -> &Name {
        &self.definition.name
    }

    pub fn type_condition(&self) -> &NamedType {
        self.definition.type_condition()
    }

    /// Identifies this build of the fragment. Two builds of the same definition differ.
    pub fn identity(&self) -> FieldId {
        self.root_field.id()
    }

    /// The fragment's source text as written in the document.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_local_cache_mutation(&self) -> bool {
        self.definition
            .directives
            .has(LOCAL_CACHE_MUTATION_DIRECTIVE)
    }
}

/// Fragments are equal when they have the same definition and the same built root field.
impl PartialEq for NamedFragment {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition && self.identity() == other.identity()
    }
}

impl Eq for NamedFragment {}

impl Hash for NamedFragment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal definitions have equal names and type conditions.
        self.definition.name.hash(state);
        self.definition.type_condition().hash(state);
        self.identity().hash(state);
    }
}

impl fmt::Display for NamedFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fragment {} on {} {}",
            self.name(),
            self.type_condition(),
            self.root_field.selection_set
        )
    }
}

#[cfg(test)]
mod tests {
    use std::hash::BuildHasher;
    use std::hash::RandomState;

    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::name;

    use super::*;
    use crate::Ir;

    fn build_hero_name() -> Arc<NamedFragment> {
        let schema = Schema::parse_and_validate(
            "type Query { hero: Character } type Character { name: String }",
            "schema.graphql",
        )
        .unwrap();
        let document = ExecutableDocument::parse_and_validate(
            &schema,
            "query Q { hero { ...HeroName } } fragment HeroName on Character { name }",
            "query.graphql",
        )
        .unwrap();
        let mut ir = Ir::new(schema, document.into_inner()).unwrap();
        ir.build_fragment(&name!("HeroName")).unwrap()
    }

    #[test]
    fn hash_agrees_with_equality() {
        let random_state = RandomState::new();
        let fragment = build_hero_name();
        let shared = Arc::clone(&fragment);
        assert_eq!(fragment, shared);
        assert_eq!(
            random_state.hash_one(&*fragment),
            random_state.hash_one(&*shared)
        );

        let rebuilt = build_hero_name();
        assert_eq!(fragment.definition, rebuilt.definition);
        assert_ne!(fragment, rebuilt);
        assert_ne!(
            random_state.hash_one(&*fragment),
            random_state.hash_one(&*rebuilt)
        );
    }
}
