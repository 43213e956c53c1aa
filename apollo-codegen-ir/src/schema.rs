use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::OperationType;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Serialize;

use crate::error::IrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReferencedTypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl ReferencedTypeKind {
    fn of(ty: &ExtendedType) -> Self {
        match ty {
            ExtendedType::Scalar(_) => Self::Scalar,
            ExtendedType::Object(_) => Self::Object,
            ExtendedType::Interface(_) => Self::Interface,
            ExtendedType::Union(_) => Self::Union,
            ExtendedType::Enum(_) => Self::Enum,
            ExtendedType::InputObject(_) => Self::InputObject,
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }
}

/// A schema type used by at least one operation or fragment of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencedType {
    pub name: Name,
    pub kind: ReferencedTypeKind,
    /// Whether this is a root operation type that some operation or fragment selects on.
    pub is_root_field_type: bool,
}

/// The parts of a schema that the operations and fragments of one document refer to.
#[derive(Debug, Clone)]
pub struct IrSchema {
    schema: Valid<Schema>,
    referenced_types: IndexMap<Name, ReferencedType>,
    documentation: Option<String>,
}

impl IrSchema {
    /// Collects every type referenced by `document`, in the order they are first referenced.
    pub fn new(schema: Valid<Schema>, document: &ExecutableDocument) -> Result<Self, IrError> {
        let mut names = IndexSet::new();
        for operation in document.operations.iter() {
            for variable in &operation.variables {
                names.insert(variable.ty.inner_named_type().clone());
            }
            collect_referenced_types(&operation.selection_set, &mut names);
        }
        for fragment in document.fragments.values() {
            collect_referenced_types(&fragment.selection_set, &mut names);
        }

        let referenced_types = names
            .into_iter()
            .map(|name| -> Result<_, IrError> {
                let ty = schema
                    .types
                    .get(&name)
                    .ok_or_else(|| IrError::UnknownType(name.clone()))?;
                let referenced = ReferencedType {
                    name: name.clone(),
                    kind: ReferencedTypeKind::of(ty),
                    is_root_field_type: false,
                };
                Ok((name, referenced))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        let documentation = schema
            .schema_definition
            .description
            .as_ref()
            .map(|description| description.to_string());

        Ok(Self {
            schema,
            referenced_types,
            documentation,
        })
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    pub fn referenced_types(&self) -> impl ExactSizeIterator<Item = &ReferencedType> {
        self.referenced_types.values()
    }

    pub fn referenced_type(&self, name: &str) -> Option<&ReferencedType> {
        self.referenced_types.get(name)
    }

    /// The names of the schema's query, mutation and subscription types, when defined.
    pub fn root_operation_types(&self) -> IndexSet<NamedType> {
        [
            OperationType::Query,
            OperationType::Mutation,
            OperationType::Subscription,
        ]
        .into_iter()
        .filter_map(|operation_type| self.schema.root_operation(operation_type))
        .cloned()
        .collect()
    }

    pub fn is_composite(&self, name: &NamedType) -> Result<bool, IrError> {
        match self.schema.types.get(name) {
            Some(ty) => Ok(ReferencedTypeKind::of(ty).is_composite()),
            None => Err(IrError::UnknownType(name.clone())),
        }
    }

    pub(crate) fn mark_root_field_type(&mut self, name: &NamedType) {
        if let Some(referenced) = self.referenced_types.get_mut(name) {
            referenced.is_root_field_type = true;
        }
    }

    pub fn is_root_field_type(&self, name: &NamedType) -> bool {
        self.referenced_types
            .get(name)
            .is_some_and(|referenced| referenced.is_root_field_type)
    }
}

fn collect_referenced_types(selection_set: &SelectionSet, names: &mut IndexSet<NamedType>) {
    names.insert(selection_set.ty.clone());
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) => {
                names.insert(field.ty().inner_named_type().clone());
                collect_referenced_types(&field.selection_set, names);
            }
            Selection::InlineFragment(inline_fragment) => {
                collect_referenced_types(&inline_fragment.selection_set, names);
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    #[test]
    fn collects_types_in_reference_order() {
        let schema = Schema::parse_and_validate(
            r#"
            """
            The Star Wars API.
            """
            schema { query: Query }
            type Query { hero(episode: Episode): Character }
            enum Episode { NEWHOPE EMPIRE }
            interface Character { name: String }
            type Human implements Character { name: String height: Float }
            type Starship { length: Float }
            "#,
            "schema.graphql",
        )
        .unwrap();
        let document = ExecutableDocument::parse_and_validate(
            &schema,
            "query Hero($episode: Episode) { hero(episode: $episode) { name ... on Human { height } } }",
            "query.graphql",
        )
        .unwrap();
        let mut ir_schema = IrSchema::new(schema, &document).unwrap();

        let names = ir_schema
            .referenced_types()
            .map(|ty| ty.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            ["Episode", "Query", "Character", "String", "Human", "Float"]
        );
        assert!(ir_schema.referenced_type("Starship").is_none());
        assert_eq!(ir_schema.documentation(), Some("The Star Wars API."));
        assert!(ir_schema.is_composite(&name!("Character")).unwrap());
        assert!(!ir_schema.is_composite(&name!("Episode")).unwrap());
        assert_eq!(
            ir_schema.is_composite(&name!("Droid")),
            Err(IrError::UnknownType(name!("Droid")))
        );

        assert_eq!(
            ir_schema.root_operation_types().into_iter().collect::<Vec<_>>(),
            [name!("Query")]
        );
        assert!(!ir_schema.is_root_field_type(&name!("Query")));
        ir_schema.mark_root_field_type(&name!("Query"));
        assert!(ir_schema.is_root_field_type(&name!("Query")));
    }
}
