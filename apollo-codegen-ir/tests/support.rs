use apollo_codegen_ir::Ir;
use apollo_codegen_ir::entity::Entity;
use apollo_codegen_ir::entity::EntityStorage;
use apollo_codegen_ir::selection::EntityField;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;

pub(crate) const STAR_WARS: &str = r#"
    directive @defer(label: String, if: Boolean! = true) on FRAGMENT_SPREAD | INLINE_FRAGMENT
    directive @apollo_client_ios_localCacheMutation on QUERY | MUTATION | SUBSCRIPTION | FRAGMENT_DEFINITION

    type Query {
        hero: Character
        droid(id: ID!): Droid
    }

    type Mutation {
        rename(name: String!): Character
    }

    interface Character {
        id: ID!
        name: String
        friend: Character
    }

    type Human implements Character {
        id: ID!
        name: String
        friend: Character
        height: Float
    }

    type Droid implements Character {
        id: ID!
        name: String
        friend: Character
        primaryFunction: String
    }
"#;

/// Builds an [`Ir`] for a document that must be valid against the Star Wars schema.
pub(crate) fn build_ir(document: &str) -> Ir {
    let schema = Schema::parse_and_validate(STAR_WARS, "schema.graphql").unwrap();
    let document =
        ExecutableDocument::parse_and_validate(&schema, document, "operations.graphql").unwrap();
    Ir::new(schema, document.into_inner()).unwrap()
}

/// Builds an [`Ir`] for a document that may fail validation, e.g. because of fragment cycles.
pub(crate) fn build_ir_unvalidated(document: &str) -> Ir {
    let schema = Schema::parse_and_validate(STAR_WARS, "schema.graphql").unwrap();
    let document =
        match ExecutableDocument::parse_and_validate(&schema, document, "operations.graphql") {
            Ok(document) => document.into_inner(),
            Err(with_errors) => with_errors.partial,
        };
    Ir::new(schema, document).unwrap()
}

/// Follows entity fields by response key from `field`.
pub(crate) fn entity_field<'a>(field: &'a EntityField, path: &[&str]) -> &'a EntityField {
    path.iter().fold(field, |field, key| {
        field
            .selection_set
            .direct
            .field(key)
            .and_then(|field| field.as_entity())
            .unwrap_or_else(|| panic!("no entity field {key}"))
    })
}

/// Finds the entity whose field path renders as `path`, e.g. `hero.friend`.
pub(crate) fn entity_at<'a>(entities: &'a EntityStorage, path: &str) -> &'a Entity {
    entities
        .iter()
        .map(|(_, entity)| entity)
        .find(|entity| entity.location().path().to_string() == path)
        .unwrap_or_else(|| panic!("no entity at {path}"))
}
