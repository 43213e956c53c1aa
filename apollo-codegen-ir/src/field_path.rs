use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use serde::Serialize;
use serde::ser::SerializeSeq;

/// One step of a [`FieldPath`]: the response key of a field and the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldPathComponent {
    pub name: Name,
    #[serde(serialize_with = "crate::display_helpers::serialize_as_string")]
    pub ty: Type,
}

impl FieldPathComponent {
    pub fn new(name: Name, ty: Type) -> Self {
        Self { name, ty }
    }
}

impl fmt::Display for FieldPathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
struct FieldPathNode {
    component: FieldPathComponent,
    parent: Option<Arc<FieldPathNode>>,
    len: usize,
}

/// An immutable path of fields from the root of a definition to some point in its selections.
///
/// Paths are persistent linked lists: appending returns a new path that shares its prefix with
/// the receiver. Equality and hashing are structural over the full sequence of components, and
/// the empty path is the root.
#[derive(Clone, Default)]
pub struct FieldPath {
    last: Option<Arc<FieldPathNode>>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.last.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    pub fn last(&self) -> Option<&FieldPathComponent> {
        self.last.as_ref().map(|node| &node.component)
    }

    #[must_use]
    pub fn appending(&self, component: FieldPathComponent) -> Self {
        let len = self.len() + 1;
        Self {
            last: Some(Arc::new(FieldPathNode {
                component,
                parent: self.last.clone(),
                len,
            })),
        }
    }

    #[must_use]
    pub fn appending_all(&self, components: impl IntoIterator<Item = FieldPathComponent>) -> Self {
        components
            .into_iter()
            .fold(self.clone(), |path, component| path.appending(component))
    }

    /// Iterates from the last component back to the root.
    fn iter_rev(&self) -> impl Iterator<Item = &FieldPathComponent> {
        std::iter::successors(self.last.as_deref(), |node| node.parent.as_deref())
            .map(|node| &node.component)
    }

    /// Returns the components from the root to the last one.
    pub fn components(&self) -> Vec<&FieldPathComponent> {
        let mut components = self.iter_rev().collect::<Vec<_>>();
        components.reverse();
        components
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        match (&self.last, &other.last) {
            (Some(left), Some(right)) if Arc::ptr_eq(left, right) => true,
            _ => self.len() == other.len() && self.iter_rev().eq(other.iter_rev()),
        }
    }
}

impl Eq for FieldPath {}

impl Hash for FieldPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for component in self.iter_rev() {
            component.hash(state);
        }
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.components()).finish()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components = self.components();
        let mut components = components.iter();
        if let Some(first) = components.next() {
            write!(f, "{first}")?;
        }
        components.try_for_each(|component| write!(f, ".{component}"))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for component in self.components() {
            seq.serialize_element(component)?;
        }
        seq.end()
    }
}

impl FromIterator<FieldPathComponent> for FieldPath {
    fn from_iter<T: IntoIterator<Item = FieldPathComponent>>(iter: T) -> Self {
        Self::root().appending_all(iter)
    }
}
