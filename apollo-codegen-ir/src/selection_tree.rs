use apollo_compiler::Name;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::Type;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;

use crate::conditions::AnyOf;
use crate::conditions::InclusionConditions;
use crate::conditions::merge_inclusion;
use crate::conditions::restrict_inclusion;
use crate::selection::ScopePath;

/// A field as accumulated on an entity, across every place it was selected from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedField {
    pub response_key: Name,
    pub name: Name,
    #[serde(serialize_with = "crate::display_helpers::serialize_as_string")]
    pub ty: Type,
    /// `None` when at least one of the selections is unconditional.
    pub inclusion_conditions: Option<AnyOf<InclusionConditions>>,
}

/// The selections accumulated for one type scope of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeSelections {
    fields: IndexMap<Name, MergedField>,
    fragments: IndexMap<Name, Option<AnyOf<InclusionConditions>>>,
}

impl ScopeSelections {
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &MergedField> {
        self.fields.values()
    }

    pub fn field(&self, response_key: &str) -> Option<&MergedField> {
        self.fields.get(response_key)
    }

    /// Names of the fragments spread in this scope, with the conditions they were spread under.
    pub fn fragments(
        &self,
    ) -> impl ExactSizeIterator<Item = (&Name, Option<&AnyOf<InclusionConditions>>)> {
        self.fragments
            .iter()
            .map(|(name, conditions)| (name, conditions.as_ref()))
    }

    pub fn contains_fragment(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    fn insert_field(&mut self, field: MergedField) -> bool {
        match self.fields.entry(field.response_key.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                let conditions = existing.inclusion_conditions.clone();
                existing.inclusion_conditions =
                    merge_inclusion(existing.inclusion_conditions.take(), field.inclusion_conditions);
                existing.inclusion_conditions != conditions
            }
            Entry::Vacant(entry) => {
                entry.insert(field);
                true
            }
        }
    }

    fn insert_fragment(
        &mut self,
        name: Name,
        inclusion_conditions: Option<AnyOf<InclusionConditions>>,
    ) -> bool {
        match self.fragments.entry(name) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                let conditions = existing.clone();
                *existing = merge_inclusion(existing.take(), inclusion_conditions);
                *existing != conditions
            }
            Entry::Vacant(entry) => {
                entry.insert(inclusion_conditions);
                true
            }
        }
    }
}

/// Every field selected on an entity, from any definition that reaches it, grouped by the type
/// scope it was selected in.
///
/// Inserting a selection that is already present in a scope does not change the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySelectionTree {
    root_type_path: Vec<NamedType>,
    scopes: IndexMap<ScopePath, ScopeSelections>,
}

impl EntitySelectionTree {
    /// An empty tree for an entity reached through the types of `root_type_path`, outermost
    /// first. The path is never empty.
    pub(crate) fn new(root_type_path: Vec<NamedType>) -> Self {
        debug_assert!(!root_type_path.is_empty());
        Self {
            root_type_path,
            scopes: IndexMap::new(),
        }
    }

    pub fn root_type_path(&self) -> &[NamedType] {
        &self.root_type_path
    }

    /// The type the entity is selected as, which is also the type of the root scope.
    pub fn root_type(&self) -> &NamedType {
        &self.root_type_path[self.root_type_path.len() - 1]
    }

    /// The type selected on in `scope_path`: its innermost type condition, or the root type.
    pub fn scope_type<'a>(&'a self, scope_path: &'a ScopePath) -> &'a NamedType {
        scope_path
            .last()
            .map_or_else(|| self.root_type(), |scope| &scope.type_condition)
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, scope_path: &ScopePath) -> Option<&ScopeSelections> {
        self.scopes.get(scope_path)
    }

    /// Selections made directly on the entity's root type.
    pub fn root_scope(&self) -> Option<&ScopeSelections> {
        self.scopes.get(&ScopePath::new())
    }

    pub fn scopes(&self) -> impl ExactSizeIterator<Item = (&ScopePath, &ScopeSelections)> {
        self.scopes.iter()
    }

    /// Adds a field to a scope. Returns whether the tree changed.
    pub fn insert_field(&mut self, scope_path: &ScopePath, field: MergedField) -> bool {
        self.scopes
            .entry(scope_path.clone())
            .or_default()
            .insert_field(field)
    }

    /// Records a fragment spread in a scope. Returns whether the tree changed.
    pub fn insert_fragment(
        &mut self,
        scope_path: &ScopePath,
        name: Name,
        inclusion_conditions: Option<AnyOf<InclusionConditions>>,
    ) -> bool {
        self.scopes
            .entry(scope_path.clone())
            .or_default()
            .insert_fragment(name, inclusion_conditions)
    }

    /// Adds every selection of `other` below `prefix`. With a `guard`, each selection is
    /// included only when the guard also holds, and selections that contradict it are dropped.
    pub fn merge_tree(
        &mut self,
        other: &Self,
        prefix: &ScopePath,
        guard: Option<&AnyOf<InclusionConditions>>,
    ) {
        let restrict = |conditions: Option<&AnyOf<InclusionConditions>>| match guard {
            Some(guard) => restrict_inclusion(conditions, guard),
            None => Some(conditions.cloned()),
        };
        for (scope_path, selections) in &other.scopes {
            let target = prefix.concat(scope_path);
            for field in selections.fields.values() {
                let Some(inclusion_conditions) = restrict(field.inclusion_conditions.as_ref())
                else {
                    continue;
                };
                self.insert_field(
                    &target,
                    MergedField {
                        inclusion_conditions,
                        ..field.clone()
                    },
                );
            }
            for (name, conditions) in &selections.fragments {
                if let Some(conditions) = restrict(conditions.as_ref()) {
                    self.insert_fragment(&target, name.clone(), conditions);
                }
            }
        }
    }
}
