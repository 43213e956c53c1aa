//! The selections written directly in an operation or fragment, as seen by code generation.
//!
//! Each selection set records the entity it selects on and the type scope it is nested in. Fields
//! selected on the same response key, and spreads of the same fragment, are merged as they are
//! added, so each generated type sees one field per key.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::Type;
use apollo_compiler::executable;
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::conditions::AnyOf;
use crate::conditions::InclusionConditions;
use crate::conditions::merge_inclusion;
use crate::defer::IsDeferred;
use crate::display_helpers::Indented;
use crate::display_helpers::Joined;
use crate::entity::EntityId;
use crate::error::IrError;
use crate::error::bail;
use crate::fragment::NamedFragment;
use crate::utils::logging::snapshot;

// Global storage for the counter used to uniquely identify entity fields
static NEXT_ID: atomic::AtomicUsize = atomic::AtomicUsize::new(1);

/// Opaque identity of one built [`EntityField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    pub(crate) fn new() -> Self {
        // atomically increment global counter
        Self(NEXT_ID.fetch_add(1, atomic::Ordering::AcqRel))
    }
}

/// A type condition entered below an entity's root type, with the conditions it was entered
/// under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeDescriptor {
    pub type_condition: NamedType,
    pub inclusion_conditions: Option<InclusionConditions>,
}

impl fmt::Display for ScopeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "... on {}", self.type_condition)?;
        if let Some(conditions) = &self.inclusion_conditions {
            write!(f, "{}", conditions.definition_directive_description())?;
        }
        Ok(())
    }
}

/// The scopes entered between an entity's root type and a selection set, outermost first.
/// The entity's root type itself is not part of the path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopePath(Vec<ScopeDescriptor>);

impl ScopePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&ScopeDescriptor> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScopeDescriptor> {
        self.0.iter()
    }

    #[must_use]
    pub fn appending(&self, descriptor: ScopeDescriptor) -> Self {
        let mut path = self.clone();
        path.0.push(descriptor);
        path
    }

    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut path = self.clone();
        path.0.extend(other.0.iter().cloned());
        path
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            Joined {
                items: &self.0,
                separator: " > ",
            }
        )
    }
}

/// Where a selection set sits: the entity it selects on and the type scope within that entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub entity: EntityId,
    pub root_type: NamedType,
    pub scope_path: ScopePath,
    /// Whether the selections sit on a schema root operation type (query, mutation or
    /// subscription) that some definition is selected on.
    pub is_root_field_type: bool,
}

impl TypeInfo {
    /// The type the selections are made on.
    pub fn parent_type(&self) -> &NamedType {
        self.scope_path
            .last()
            .map_or(&self.root_type, |scope| &scope.type_condition)
    }

    /// The conditions under which the innermost scope was entered.
    pub fn inclusion_conditions(&self) -> Option<&InclusionConditions> {
        self.scope_path
            .last()
            .and_then(|scope| scope.inclusion_conditions.as_ref())
    }

    #[must_use]
    pub(crate) fn entering(&self, descriptor: ScopeDescriptor, is_root_field_type: bool) -> Self {
        Self {
            entity: self.entity,
            root_type: self.root_type.clone(),
            scope_path: self.scope_path.appending(descriptor),
            is_root_field_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    pub type_info: TypeInfo,
    pub direct: DirectSelections,
}

impl SelectionSet {
    pub(crate) fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            direct: DirectSelections::default(),
        }
    }

    pub fn parent_type(&self) -> &NamedType {
        self.type_info.parent_type()
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.direct.write_indented(&mut Indented::new(f))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(ScalarField),
    Entity(EntityField),
}

impl Field {
    pub fn response_key(&self) -> &Name {
        match self {
            Self::Scalar(field) => field.response_key(),
            Self::Entity(field) => field.response_key(),
        }
    }

    pub fn ty(&self) -> &Type {
        match self {
            Self::Scalar(field) => field.ty(),
            Self::Entity(field) => field.ty(),
        }
    }

    pub fn inclusion_conditions(&self) -> Option<&AnyOf<InclusionConditions>> {
        match self {
            Self::Scalar(field) => field.inclusion_conditions.as_ref(),
            Self::Entity(field) => field.inclusion_conditions.as_ref(),
        }
    }

    pub fn as_entity(&self) -> Option<&EntityField> {
        match self {
            Self::Entity(field) => Some(field),
            Self::Scalar(_) => None,
        }
    }

    fn merge(&mut self, other: Self) -> Result<(), IrError> {
        match (self, other) {
            (Self::Scalar(field), Self::Scalar(other)) => {
                field.inclusion_conditions = merge_inclusion(
                    field.inclusion_conditions.take(),
                    other.inclusion_conditions,
                );
            }
            (Self::Entity(field), Self::Entity(other)) => field.merge(other)?,
            (field, other) => bail!(
                "cannot merge field \"{}\" of type {} with field of type {}",
                field.response_key(),
                field.ty(),
                other.ty(),
            ),
        }
        Ok(())
    }

    fn write_indented(&self, out: &mut Indented<'_, '_>) -> fmt::Result {
        let (response_key, name) = match self {
            Self::Scalar(field) => (field.response_key(), &field.field.name),
            Self::Entity(field) => (
                field.response_key(),
                field.field.as_ref().map_or(field.response_key(), |field| &field.name),
            ),
        };
        if response_key != name {
            out.push(format_args!("{response_key}: "))?;
        }
        out.push(name)?;
        if let Some(conditions) = self.inclusion_conditions() {
            out.push(conditions.definition_directive_description())?;
        }
        if let Self::Entity(field) = self {
            out.push(" ")?;
            field.selection_set.direct.write_indented(out)?;
        }
        Ok(())
    }
}

/// A field of leaf type.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub field: Node<executable::Field>,
    pub inclusion_conditions: Option<AnyOf<InclusionConditions>>,
}

impl ScalarField {
    pub fn response_key(&self) -> &Name {
        self.field.response_key()
    }

    pub fn ty(&self) -> &Type {
        self.field.ty()
    }
}

/// A field of composite type: it selects on an entity.
///
/// Root fields of operations and fragments are synthesized and carry no AST field.
#[derive(Debug, Clone)]
pub struct EntityField {
    id: FieldId,
    response_key: Name,
    ty: Type,
    field: Option<Node<executable::Field>>,
    pub inclusion_conditions: Option<AnyOf<InclusionConditions>>,
    pub selection_set: SelectionSet,
}

impl EntityField {
    pub(crate) fn new(
        response_key: Name,
        ty: Type,
        field: Option<Node<executable::Field>>,
        inclusion_conditions: Option<AnyOf<InclusionConditions>>,
        selection_set: SelectionSet,
    ) -> Self {
        Self {
            id: FieldId::new(),
            response_key,
            ty,
            field,
            inclusion_conditions,
            selection_set,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn response_key(&self) -> &Name {
        &self.response_key
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn field(&self) -> Option<&Node<executable::Field>> {
        self.field.as_ref()
    }

    pub fn entity(&self) -> EntityId {
        self.selection_set.type_info.entity
    }

    fn merge(&mut self, other: Self) -> Result<(), IrError> {
        if self.entity() != other.entity() {
            bail!(
                "field \"{}\" selects on two different entities",
                self.response_key
            );
        }
        self.inclusion_conditions =
            merge_inclusion(self.inclusion_conditions.take(), other.inclusion_conditions);
        self.selection_set.direct.merge(other.selection_set.direct)
    }
}

/// Equality is structural and ignores the field's identity.
impl PartialEq for EntityField {
    fn eq(&self, other: &Self) -> bool {
        self.response_key == other.response_key
            && self.ty == other.ty
            && self.field == other.field
            && self.inclusion_conditions == other.inclusion_conditions
            && self.selection_set == other.selection_set
    }
}

/// An anonymous, type-scoped group of selections merged into its enclosing selection set.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragmentSpread {
    pub selection_set: SelectionSet,
    pub is_deferred: IsDeferred,
}

impl InlineFragmentSpread {
    pub fn type_info(&self) -> &TypeInfo {
        &self.selection_set.type_info
    }

    pub fn inclusion_conditions(&self) -> Option<&InclusionConditions> {
        self.selection_set.type_info.inclusion_conditions()
    }

    fn write_indented(&self, out: &mut Indented<'_, '_>) -> fmt::Result {
        out.push(format_args!("... on {}", self.selection_set.parent_type()))?;
        if let Some(conditions) = self.inclusion_conditions() {
            out.push(conditions.definition_directive_description())?;
        }
        out.push(self.is_deferred.definition_directive_description())?;
        out.push(" ")?;
        self.selection_set.direct.write_indented(out)
    }
}

/// A usage of a named fragment within an operation or another fragment.
#[derive(Debug, Clone)]
pub struct NamedFragmentSpread {
    pub fragment: Arc<NamedFragment>,
    /// Position of the spread site.
    pub type_info: TypeInfo,
    /// `None` when the spread is unconditionally included.
    pub inclusion_conditions: Option<AnyOf<InclusionConditions>>,
    pub is_deferred: IsDeferred,
}

/// Spreads are equal when they use the same built fragment at the same position under the same
/// conditions.
impl PartialEq for NamedFragmentSpread {
    fn eq(&self, other: &Self) -> bool {
        self.fragment.identity() == other.fragment.identity()
            && self.type_info == other.type_info
            && self.inclusion_conditions == other.inclusion_conditions
            && self.is_deferred == other.is_deferred
    }
}

impl NamedFragmentSpread {
    fn write_indented(&self, out: &mut Indented<'_, '_>) -> fmt::Result {
        out.push(format_args!("...{}", self.fragment.name()))?;
        if let Some(conditions) = &self.inclusion_conditions {
            out.push(conditions.definition_directive_description())?;
        }
        out.push(self.is_deferred.definition_directive_description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InlineFragmentKey {
    scope: Option<ScopeDescriptor>,
    is_deferred: IsDeferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NamedFragmentKey {
    fragment_name: Name,
    is_deferred: IsDeferred,
}

/// The fields and fragment spreads selected directly in one selection set, merged by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectSelections {
    fields: IndexMap<Name, Field>,
    inline_fragments: IndexMap<InlineFragmentKey, InlineFragmentSpread>,
    named_fragments: IndexMap<NamedFragmentKey, NamedFragmentSpread>,
}

impl DirectSelections {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.inline_fragments.is_empty() && self.named_fragments.is_empty()
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, response_key: &str) -> Option<&Field> {
        self.fields.get(response_key)
    }

    pub fn inline_fragments(&self) -> impl ExactSizeIterator<Item = &InlineFragmentSpread> {
        self.inline_fragments.values()
    }

    pub fn named_fragments(&self) -> impl ExactSizeIterator<Item = &NamedFragmentSpread> {
        self.named_fragments.values()
    }

    /// The first spread of the named fragment, whether deferred or not.
    pub fn named_fragment(&self, fragment_name: &str) -> Option<&NamedFragmentSpread> {
        self.named_fragments
            .values()
            .find(|spread| spread.fragment.name() == fragment_name)
    }

    pub(crate) fn merge_field(&mut self, field: Field) -> Result<(), IrError> {
        match self.fields.entry(field.response_key().clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(field),
            Entry::Vacant(entry) => {
                entry.insert(field);
                Ok(())
            }
        }
    }

    pub(crate) fn merge_inline_fragment(
        &mut self,
        spread: InlineFragmentSpread,
    ) -> Result<(), IrError> {
        let key = InlineFragmentKey {
            scope: spread.selection_set.type_info.scope_path.last().cloned(),
            is_deferred: spread.is_deferred.clone(),
        };
        match self.inline_fragments.entry(key) {
            Entry::Occupied(mut entry) => entry
                .get_mut()
                .selection_set
                .direct
                .merge(spread.selection_set.direct),
            Entry::Vacant(entry) => {
                entry.insert(spread);
                Ok(())
            }
        }
    }

    /// Adds a fragment spread. Spreading a fragment that was already spread here keeps one spread
    /// included when any of the spreads' conditions hold.
    pub(crate) fn merge_named_fragment(&mut self, spread: NamedFragmentSpread) {
        let key = NamedFragmentKey {
            fragment_name: spread.fragment.name().clone(),
            is_deferred: spread.is_deferred.clone(),
        };
        match self.named_fragments.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.inclusion_conditions = merge_inclusion(
                    existing.inclusion_conditions.take(),
                    spread.inclusion_conditions,
                );
                snapshot!(
                    existing.inclusion_conditions,
                    "merged fragment spread inclusion conditions"
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(spread);
            }
        }
    }

    pub(crate) fn merge(&mut self, other: Self) -> Result<(), IrError> {
        for field in other.fields.into_values() {
            self.merge_field(field)?;
        }
        for spread in other.inline_fragments.into_values() {
            self.merge_inline_fragment(spread)?;
        }
        for spread in other.named_fragments.into_values() {
            self.merge_named_fragment(spread);
        }
        Ok(())
    }

    fn write_indented(&self, out: &mut Indented<'_, '_>) -> fmt::Result {
        enum Item<'a> {
            Field(&'a Field),
            InlineFragment(&'a InlineFragmentSpread),
            NamedFragment(&'a NamedFragmentSpread),
        }
        let items = self
            .fields
            .values()
            .map(Item::Field)
            .chain(self.inline_fragments.values().map(Item::InlineFragment))
            .chain(self.named_fragments.values().map(Item::NamedFragment));
        out.block(items, |out, item| match item {
            Item::Field(field) => field.write_indented(out),
            Item::InlineFragment(spread) => spread.write_indented(out),
            Item::NamedFragment(spread) => spread.write_indented(out),
        })
    }
}
