use std::fmt;

use apollo_compiler::ast::NamedType;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use tracing::trace;

use crate::conditions::AnyOf;
use crate::conditions::InclusionConditions;
use crate::error::IrError;
use crate::error::ensure;
use crate::field_path::FieldPathComponent;
use crate::fragment::NamedFragment;
use crate::location::Location;
use crate::location::SourceDefinition;
use crate::selection::ScopePath;
use crate::selection_tree::EntitySelectionTree;

/// Handle to an [`Entity`] within the [`EntityStorage`] of one operation or fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(usize);

impl EntityId {
    /// The entity at the root of every definition.
    pub const ROOT: Self = Self(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One object in the response, identified by where it is selected from.
///
/// Every selection that reaches the same [`Location`] contributes to the same entity's
/// selection tree.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    location: Location,
    pub selection_tree: EntitySelectionTree,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The named types of every entity from the definition's root down to this one.
    pub fn root_type_path(&self) -> &[NamedType] {
        self.selection_tree.root_type_path()
    }

    /// The type this entity is selected as.
    pub fn root_type(&self) -> &NamedType {
        self.selection_tree.root_type()
    }
}

/// All the entities of one operation or one named fragment, keyed by location.
///
/// Entities are only ever created through a lookup on their location, so there is exactly one
/// entity per location.
#[derive(Debug, Clone)]
pub struct EntityStorage {
    source: SourceDefinition,
    entities: IndexMap<Location, Entity>,
}

impl EntityStorage {
    pub(crate) fn new(source: SourceDefinition) -> Self {
        let location = Location::root(source.clone());
        let root = Entity {
            id: EntityId::ROOT,
            location: location.clone(),
            selection_tree: EntitySelectionTree::new(vec![source.root_type().clone()]),
        };
        Self {
            source,
            entities: IndexMap::from([(location, root)]),
        }
    }

    pub fn source(&self) -> &SourceDefinition {
        &self.source
    }

    pub fn root(&self) -> &Entity {
        &self.entities[EntityId::ROOT.0]
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get_index(id.0).map(|(_, entity)| entity)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_index_mut(id.0).map(|(_, entity)| entity)
    }

    pub fn get_by_location(&self, location: &Location) -> Option<&Entity> {
        self.entities.get(location)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Location, &Entity)> {
        self.entities.iter()
    }

    fn entity(&self, id: EntityId) -> Result<&Entity, IrError> {
        self.get(id)
            .ok_or_else(|| IrError::internal(format!("no entity {id} in {}", self.source)))
    }

    /// Returns the entity at `location`, creating it if this is the first selection reaching it.
    fn entity_at(
        &mut self,
        location: Location,
        root_type_path: impl FnOnce() -> Vec<NamedType>,
    ) -> EntityId {
        let index = match self.entities.entry(location) {
            Entry::Occupied(entry) => entry.index(),
            Entry::Vacant(entry) => {
                let id = EntityId(entry.index());
                trace!(location = %entry.key(), "creating entity");
                let entity = Entity {
                    id,
                    location: entry.key().clone(),
                    selection_tree: EntitySelectionTree::new(root_type_path()),
                };
                entry.insert(entity);
                id.0
            }
        };
        debug_assert_eq!(self.entities[index].id.0, index);
        EntityId(index)
    }

    /// Returns the entity selected by a field of composite type on `enclosing`.
    pub(crate) fn entity_for_field(
        &mut self,
        enclosing: EntityId,
        component: FieldPathComponent,
    ) -> Result<EntityId, IrError> {
        let enclosing = self.entity(enclosing)?;
        let field_type = component.ty.inner_named_type().clone();
        let mut root_type_path = enclosing.root_type_path().to_vec();
        let location = enclosing.location.appending(component);
        Ok(self.entity_at(location, || {
            root_type_path.push(field_type);
            root_type_path
        }))
    }

    /// Merges every entity of `fragment` into the entities reached from a spread of the fragment
    /// on `site`. The fragment's root entity merges into `site` itself, below `scope_prefix` and
    /// restricted to the spread's `inclusion_conditions`. Deeper entities are only reached through
    /// fields of the root entity, which already carry those conditions.
    pub(crate) fn merge_fragment_entities(
        &mut self,
        site: EntityId,
        scope_prefix: &ScopePath,
        inclusion_conditions: Option<&AnyOf<InclusionConditions>>,
        fragment: &NamedFragment,
    ) -> Result<(), IrError> {
        let site = self.entity(site)?;
        let site_location = site.location.clone();
        let site_root_type_path = site.root_type_path().to_vec();

        for (fragment_location, fragment_entity) in fragment.entities.iter() {
            let is_fragment_root = fragment_location.is_root();
            let path = fragment_location.path();
            let target = if is_fragment_root {
                site_location.clone()
            } else {
                site_location.appending_all(path.components().into_iter().cloned())
            };
            let id = self.entity_at(target, || {
                site_root_type_path
                    .iter()
                    .chain(fragment_entity.root_type_path().iter().skip(1))
                    .cloned()
                    .collect()
            });
            let entity = self.entity(id)?;
            ensure!(
                is_fragment_root || entity.root_type() == fragment_entity.root_type(),
                "entity at {} is selected as both {} and {}",
                entity.location,
                entity.root_type(),
                fragment_entity.root_type(),
            );

            let (prefix, guard) = if is_fragment_root {
                (scope_prefix.clone(), inclusion_conditions)
            } else {
                (ScopePath::new(), None)
            };
            if let Some(entity) = self.get_mut(id) {
                entity
                    .selection_tree
                    .merge_tree(&fragment_entity.selection_tree, &prefix, guard);
            }
        }
        Ok(())
    }
}
