use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Type;
use apollo_compiler::executable;
use apollo_compiler::executable::Selection;
use indexmap::IndexMap;

use crate::conditions::AnyOf;
use crate::conditions::InclusionConditions;
use crate::conditions::InclusionResult;
use crate::defer::IsDeferred;
use crate::entity::EntityId;
use crate::entity::EntityStorage;
use crate::error::IrError;
use crate::field_path::FieldPathComponent;
use crate::fragment::NamedFragment;
use crate::ir::Ir;
use crate::location::SourceDefinition;
use crate::selection::EntityField;
use crate::selection::Field;
use crate::selection::InlineFragmentSpread;
use crate::selection::NamedFragmentSpread;
use crate::selection::ScalarField;
use crate::selection::ScopeDescriptor;
use crate::selection::ScopePath;
use crate::selection::SelectionSet;
use crate::selection::TypeInfo;
use crate::selection_tree::EntitySelectionTree;
use crate::selection_tree::MergedField;

/// The result of walking the selections of one operation or fragment.
pub(crate) struct BuiltRootField {
    pub(crate) root_field: EntityField,
    pub(crate) entities: EntityStorage,
    pub(crate) referenced_fragments: Vec<Arc<NamedFragment>>,
    pub(crate) contains_deferred_fragment: bool,
}

/// Walks the selections of one operation or fragment, creating its entities and building the
/// fragments it spreads.
pub(crate) struct RootFieldBuilder<'ir> {
    ir: &'ir mut Ir,
    entities: EntityStorage,
    referenced_fragments: IndexMap<Name, Arc<NamedFragment>>,
    contains_deferred_fragment: bool,
}

impl<'ir> RootFieldBuilder<'ir> {
    pub(crate) fn build(
        ir: &'ir mut Ir,
        source: SourceDefinition,
        root_field_name: Name,
        selection_set: &executable::SelectionSet,
    ) -> Result<BuiltRootField, IrError> {
        let root_type = source.root_type().clone();
        let type_info = TypeInfo {
            entity: EntityId::ROOT,
            root_type: root_type.clone(),
            scope_path: ScopePath::new(),
            is_root_field_type: ir.schema().is_root_field_type(&root_type),
        };
        let mut builder = Self {
            ir,
            entities: EntityStorage::new(source),
            referenced_fragments: IndexMap::new(),
            contains_deferred_fragment: false,
        };

        let mut root_selection_set = SelectionSet::new(type_info);
        builder.build_selections(selection_set, &mut root_selection_set)?;
        let root_field = EntityField::new(
            root_field_name,
            Type::NonNullNamed(root_type),
            None,
            None,
            root_selection_set,
        );

        Ok(BuiltRootField {
            root_field,
            entities: builder.entities,
            referenced_fragments: builder.referenced_fragments.into_values().collect(),
            contains_deferred_fragment: builder.contains_deferred_fragment,
        })
    }

    fn selection_tree(&mut self, entity: EntityId) -> Result<&mut EntitySelectionTree, IrError> {
        self.entities
            .get_mut(entity)
            .map(|entity| &mut entity.selection_tree)
            .ok_or_else(|| IrError::internal(format!("no entity {entity} to select on")))
    }

    fn build_selections(
        &mut self,
        selections: &executable::SelectionSet,
        target: &mut SelectionSet,
    ) -> Result<(), IrError> {
        for selection in &selections.selections {
            match selection {
                Selection::Field(field) => self.build_field(field, target)?,
                Selection::InlineFragment(inline_fragment) => {
                    self.build_inline_fragment(inline_fragment, target)?
                }
                Selection::FragmentSpread(fragment_spread) => {
                    self.build_fragment_spread(fragment_spread, target)?
                }
            }
        }
        Ok(())
    }

    fn build_field(
        &mut self,
        field: &Node<executable::Field>,
        target: &mut SelectionSet,
    ) -> Result<(), IrError> {
        let Some(inclusion_conditions) = inclusion_conditions(&field.directives)? else {
            return Ok(());
        };
        let type_info = &target.type_info;

        self.ir
            .field_collector_mut()
            .collect(type_info.parent_type(), &field.name, field.ty());
        self.selection_tree(type_info.entity)?.insert_field(
            &type_info.scope_path,
            MergedField {
                response_key: field.response_key().clone(),
                name: field.name.clone(),
                ty: field.ty().clone(),
                inclusion_conditions: inclusion_conditions.clone(),
            },
        );

        let field_type = field.ty().inner_named_type();
        let built = if self.ir.schema().is_composite(field_type)? {
            let entity = self.entities.entity_for_field(
                type_info.entity,
                FieldPathComponent::new(field.response_key().clone(), field.ty().clone()),
            )?;
            let mut selection_set = SelectionSet::new(TypeInfo {
                entity,
                root_type: field_type.clone(),
                scope_path: ScopePath::new(),
                is_root_field_type: self.ir.schema().is_root_field_type(field_type),
            });
            self.build_selections(&field.selection_set, &mut selection_set)?;
            Field::Entity(EntityField::new(
                field.response_key().clone(),
                field.ty().clone(),
                Some(field.clone()),
                inclusion_conditions,
                selection_set,
            ))
        } else {
            Field::Scalar(ScalarField {
                field: field.clone(),
                inclusion_conditions,
            })
        };
        target.direct.merge_field(built)
    }

    fn build_inline_fragment(
        &mut self,
        inline_fragment: &executable::InlineFragment,
        target: &mut SelectionSet,
    ) -> Result<(), IrError> {
        let Some(inclusion_conditions) =
            InclusionConditions::from_directives(&inline_fragment.directives).map(into_scope)?
        else {
            return Ok(());
        };
        let is_deferred = IsDeferred::from_directives(&inline_fragment.directives)?;
        self.contains_deferred_fragment |= is_deferred.is_deferred();

        let type_condition = inline_fragment
            .type_condition
            .as_ref()
            .unwrap_or_else(|| target.parent_type())
            .clone();
        if &type_condition == target.parent_type()
            && inclusion_conditions.is_none()
            && !is_deferred.is_deferred()
        {
            return self.build_selections(&inline_fragment.selection_set, target);
        }

        let is_root_field_type = self.ir.schema().is_root_field_type(&type_condition);
        let type_info = target.type_info.entering(
            ScopeDescriptor {
                type_condition,
                inclusion_conditions,
            },
            is_root_field_type,
        );
        let mut selection_set = SelectionSet::new(type_info);
        self.build_selections(&inline_fragment.selection_set, &mut selection_set)?;
        target.direct.merge_inline_fragment(InlineFragmentSpread {
            selection_set,
            is_deferred,
        })
    }

    fn build_fragment_spread(
        &mut self,
        fragment_spread: &executable::FragmentSpread,
        target: &mut SelectionSet,
    ) -> Result<(), IrError> {
        let Some(inclusion_conditions) = inclusion_conditions(&fragment_spread.directives)? else {
            return Ok(());
        };
        let is_deferred = IsDeferred::from_directives(&fragment_spread.directives)?;

        let fragment = self.ir.build_fragment(&fragment_spread.fragment_name)?;
        self.record_reference(&fragment);
        self.contains_deferred_fragment |=
            is_deferred.is_deferred() || fragment.contains_deferred_fragment;

        let type_condition = fragment.type_condition();
        let type_scope = (type_condition != target.parent_type()).then(|| ScopeDescriptor {
            type_condition: type_condition.clone(),
            inclusion_conditions: None,
        });
        let type_info = match &type_scope {
            Some(scope) => target.type_info.entering(
                scope.clone(),
                self.ir.schema().is_root_field_type(type_condition),
            ),
            None => target.type_info.clone(),
        };

        self.entities.merge_fragment_entities(
            type_info.entity,
            &type_info.scope_path,
            inclusion_conditions.as_ref(),
            &fragment,
        )?;
        self.selection_tree(type_info.entity)?.insert_fragment(
            &target.type_info.scope_path,
            fragment.name().clone(),
            inclusion_conditions.clone(),
        );

        let spread = NamedFragmentSpread {
            fragment,
            type_info: type_info.clone(),
            inclusion_conditions,
            is_deferred,
        };
        if type_scope.is_some() {
            let mut selection_set = SelectionSet::new(type_info);
            selection_set.direct.merge_named_fragment(spread);
            target.direct.merge_inline_fragment(InlineFragmentSpread {
                selection_set,
                is_deferred: IsDeferred::default(),
            })
        } else {
            target.direct.merge_named_fragment(spread);
            Ok(())
        }
    }

    /// Records `fragment` and every fragment it uses, keeping the first reference to each.
    fn record_reference(&mut self, fragment: &Arc<NamedFragment>) {
        for referenced in std::iter::once(fragment).chain(&fragment.referenced_fragments) {
            self.referenced_fragments
                .entry(referenced.name().clone())
                .or_insert_with(|| Arc::clone(referenced));
        }
    }
}

/// Conditions of a selection, or `None` when the selection is never included.
fn inclusion_conditions(
    directives: &executable::DirectiveList,
) -> Result<Option<Option<AnyOf<InclusionConditions>>>, IrError> {
    Ok(into_scope(InclusionConditions::from_directives(directives)?)
        .map(|conditions| conditions.map(AnyOf::new)))
}

/// `None` when the selection is never included, `Some(None)` when it always is.
fn into_scope(result: InclusionResult) -> Option<Option<InclusionConditions>> {
    match result {
        InclusionResult::Included => Some(None),
        InclusionResult::Skipped => None,
        InclusionResult::Conditional(conditions) => Some(Some(conditions)),
    }
}
