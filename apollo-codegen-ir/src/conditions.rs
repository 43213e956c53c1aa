use std::fmt;
use std::hash::BuildHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::OnceLock;

use apollo_compiler::Name;
use apollo_compiler::executable::DirectiveList;
use apollo_compiler::executable::Value;
use indexmap::IndexMap;
use indexmap::IndexSet;
use indexmap::map::Entry;
use serde::Serialize;

use crate::error::IrError;

const INCLUDE_DIRECTIVE_NAME: &str = "include";
const SKIP_DIRECTIVE_NAME: &str = "skip";

/// A single `@include(if: $variable)` or `@skip(if: $variable)` guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InclusionCondition {
    pub variable: Name,
    /// `true` for `@skip`: the selection is included when the variable is `false`.
    pub is_inverted: bool,
}

impl InclusionCondition {
    pub fn include(variable: Name) -> Self {
        Self {
            variable,
            is_inverted: false,
        }
    }

    pub fn skip(variable: Name) -> Self {
        Self {
            variable,
            is_inverted: true,
        }
    }
}

impl fmt::Display for InclusionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inverted {
            write!(f, "!${}", self.variable)
        } else {
            write!(f, "${}", self.variable)
        }
    }
}

/// A conjunction of variable conditions, represented as a map from variable names to whether
/// that variable is inverted in the condition. We maintain the invariant that there's at least
/// one condition and at most one condition per variable name.
///
/// Equality and hashing ignore the order in which conditions were added.
#[derive(Debug, Clone, Serialize)]
pub struct InclusionConditions(Arc<IndexMap<Name, bool>>);

/// The outcome of evaluating a set of `@include`/`@skip` directives at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InclusionResult {
    /// Always included: no variable conditions remain.
    Included,
    /// Never included, e.g. `@include(if: false)` or `@include(if: $a) @skip(if: $a)`.
    Skipped,
    Conditional(InclusionConditions),
}

impl InclusionConditions {
    /// Builds the conjunction of the given conditions.
    pub fn all_of(
        conditions: impl IntoIterator<Item = InclusionCondition>,
    ) -> InclusionResult {
        let mut variables = IndexMap::new();
        for condition in conditions {
            match variables.entry(condition.variable) {
                Entry::Occupied(entry) => {
                    if *entry.get() != condition.is_inverted {
                        return InclusionResult::Skipped;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(condition.is_inverted);
                }
            }
        }
        if variables.is_empty() {
            InclusionResult::Included
        } else {
            InclusionResult::Conditional(Self(Arc::new(variables)))
        }
    }

    pub fn from_directives(directives: &DirectiveList) -> Result<InclusionResult, IrError> {
        let mut conditions = Vec::new();
        for directive in directives.iter() {
            let is_inverted = match directive.name.as_str() {
                INCLUDE_DIRECTIVE_NAME => false,
                SKIP_DIRECTIVE_NAME => true,
                _ => continue,
            };
            let invalid_argument = |message: String| IrError::InvalidDirectiveArgument {
                directive: directive.name.clone(),
                argument: "if",
                message,
            };
            let value = directive
                .specified_argument_by_name("if")
                .ok_or_else(|| invalid_argument("missing argument".to_owned()))?;
            match &**value {
                Value::Boolean(included) if *included == is_inverted => {
                    return Ok(InclusionResult::Skipped);
                }
                Value::Boolean(_) => {}
                Value::Variable(variable) => conditions.push(InclusionCondition {
                    variable: variable.clone(),
                    is_inverted,
                }),
                other => {
                    return Err(invalid_argument(format!(
                        "expected boolean or variable, got {other}"
                    )));
                }
            }
        }
        Ok(Self::all_of(conditions))
    }

    /// Returns the conjunction of `self` and `other`.
    pub fn merge(self, other: Self) -> InclusionResult {
        Self::all_of(self.iter().chain(other.iter()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, condition: &InclusionCondition) -> bool {
        self.0.get(&condition.variable) == Some(&condition.is_inverted)
    }

    /// Iterates over the conditions in the order they were first added.
    pub fn iter(&self) -> impl Iterator<Item = InclusionCondition> + '_ {
        self.0
            .iter()
            .map(|(variable, is_inverted)| InclusionCondition {
                variable: variable.clone(),
                is_inverted: *is_inverted,
            })
    }

    /// Renders the conditions as the directives that would produce them, each preceded by a
    /// space, e.g. ` @include(if: $a) @skip(if: $b)`.
    pub fn definition_directive_description(&self) -> String {
        self.iter()
            .map(|condition| {
                let directive = if condition.is_inverted {
                    SKIP_DIRECTIVE_NAME
                } else {
                    INCLUDE_DIRECTIVE_NAME
                };
                format!(" @{directive}(if: ${})", condition.variable)
            })
            .collect()
    }
}

impl PartialEq for InclusionConditions {
    fn eq(&self, other: &Self) -> bool {
        // `IndexMap` equality does not depend on insertion order.
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for InclusionConditions {}

impl Hash for InclusionConditions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sorted = self.0.iter().collect::<Vec<_>>();
        sorted.sort_by(|(left, _), (right, _)| left.as_str().cmp(right.as_str()));
        sorted.len().hash(state);
        for (variable, is_inverted) in sorted {
            variable.hash(state);
            is_inverted.hash(state);
        }
    }
}

impl fmt::Display for InclusionConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut conditions = self.iter();
        if let Some(first) = conditions.next() {
            write!(f, "{first}")?;
        }
        conditions.try_for_each(|condition| write!(f, " && {condition}"))
    }
}

/// A disjunction: satisfied when any one of its members is.
///
/// Never empty. Members are de-duplicated and kept in insertion order, but equality and hashing
/// only depend on membership.
#[derive(Debug, Clone, Serialize)]
pub struct AnyOf<T: Hash + Eq>(IndexSet<T>);

impl<T: Hash + Eq> AnyOf<T> {
    pub fn new(value: T) -> Self {
        Self(IndexSet::from([value]))
    }

    /// Adds `value` to the disjunction. Returns `false` if it was already a member.
    pub fn insert(&mut self, value: T) -> bool {
        self.0.insert(value)
    }

    pub fn union(&mut self, other: Self) {
        self.0.extend(other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T: Hash + Eq> PartialEq for AnyOf<T> {
    fn eq(&self, other: &Self) -> bool {
        // `IndexSet` equality does not depend on insertion order.
        self.0 == other.0
    }
}

impl<T: Hash + Eq> Eq for AnyOf<T> {}

impl<T: Hash + Eq> Hash for AnyOf<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        static SHARED_RANDOM: OnceLock<std::hash::RandomState> = OnceLock::new();
        let random_state = SHARED_RANDOM.get_or_init(Default::default);
        let mut member_hashes = self
            .0
            .iter()
            .map(|member| random_state.hash_one(member))
            .collect::<Vec<_>>();
        member_hashes.sort_unstable();
        member_hashes.hash(state);
    }
}

impl<T: Hash + Eq> From<T> for AnyOf<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a AnyOf<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl AnyOf<InclusionConditions> {
    /// Renders the disjunction as directives: a single member renders as its own directives,
    /// several members render as one `@include` over the combined expression.
    pub fn definition_directive_description(&self) -> String {
        if let (1, Some(single)) = (self.len(), self.0.first()) {
            return single.definition_directive_description();
        }
        format!(" @{INCLUDE_DIRECTIVE_NAME}(if: {self})")
    }
}

impl fmt::Display for AnyOf<InclusionConditions> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members = self.iter();
        if let Some(first) = members.next() {
            write!(f, "({first})")?;
        }
        members.try_for_each(|conditions| write!(f, " || ({conditions})"))
    }
}

/// Combines the conditions of two paths reaching the same selection.
///
/// `None` means unconditionally included, which absorbs any condition of the other path.
pub fn merge_inclusion(
    left: Option<AnyOf<InclusionConditions>>,
    right: Option<AnyOf<InclusionConditions>>,
) -> Option<AnyOf<InclusionConditions>> {
    match (left, right) {
        (Some(mut left), Some(right)) => {
            left.union(right);
            Some(left)
        }
        _ => None,
    }
}

/// Returns the conditions of a selection with `conditions` that is reached through a path
/// guarded by `guard`. The outer `None` means the two can never hold together.
pub fn restrict_inclusion(
    conditions: Option<&AnyOf<InclusionConditions>>,
    guard: &AnyOf<InclusionConditions>,
) -> Option<Option<AnyOf<InclusionConditions>>> {
    let Some(conditions) = conditions else {
        return Some(Some(guard.clone()));
    };
    let mut restricted: Option<AnyOf<InclusionConditions>> = None;
    for member in conditions {
        for required in guard {
            match member.clone().merge(required.clone()) {
                InclusionResult::Included => return Some(None),
                InclusionResult::Skipped => {}
                InclusionResult::Conditional(both) => match &mut restricted {
                    Some(restricted) => {
                        restricted.insert(both);
                    }
                    None => restricted = Some(AnyOf::new(both)),
                },
            }
        }
    }
    restricted.map(Some)
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::name;

    use super::*;

    fn conditions(conditions: impl IntoIterator<Item = InclusionCondition>) -> InclusionConditions {
        match InclusionConditions::all_of(conditions) {
            InclusionResult::Conditional(conditions) => conditions,
            other => panic!("expected conditional result, got {other:?}"),
        }
    }

    fn field_directives(query: &str) -> DirectiveList {
        let schema = Schema::parse_and_validate(
            "type Query { a: Int b: Int }",
            "schema.graphql",
        )
        .unwrap();
        let document =
            ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
        let operation = document.operations.get(None).unwrap();
        let apollo_compiler::executable::Selection::Field(field) =
            &operation.selection_set.selections[0]
        else {
            panic!("expected a field");
        };
        field.directives.clone()
    }

    #[test]
    fn conjunction_equality_ignores_order() {
        let left = conditions([
            InclusionCondition::include(name!("a")),
            InclusionCondition::skip(name!("b")),
        ]);
        let right = conditions([
            InclusionCondition::skip(name!("b")),
            InclusionCondition::include(name!("a")),
        ]);
        assert_eq!(left, right);

        let random_state = std::hash::RandomState::new();
        assert_eq!(random_state.hash_one(&left), random_state.hash_one(&right));
    }

    #[test]
    fn contradicting_conditions_are_skipped() {
        assert_eq!(
            InclusionConditions::all_of([
                InclusionCondition::include(name!("a")),
                InclusionCondition::skip(name!("a")),
            ]),
            InclusionResult::Skipped
        );
        assert_eq!(
            InclusionConditions::all_of([]),
            InclusionResult::Included
        );
    }

    #[test]
    fn merge_is_a_conjunction() {
        let a = conditions([InclusionCondition::include(name!("a"))]);
        let b = conditions([InclusionCondition::skip(name!("b"))]);
        let InclusionResult::Conditional(merged) = a.clone().merge(b) else {
            panic!("expected conditional result");
        };
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&InclusionCondition::include(name!("a"))));
        assert!(merged.contains(&InclusionCondition::skip(name!("b"))));

        let not_a = conditions([InclusionCondition::skip(name!("a"))]);
        assert_eq!(a.merge(not_a), InclusionResult::Skipped);
    }

    #[test]
    fn parses_include_and_skip_directives() {
        let directives =
            field_directives("query($a: Boolean!, $b: Boolean!) { a @include(if: $a) @skip(if: $b) }");
        let InclusionResult::Conditional(parsed) =
            InclusionConditions::from_directives(&directives).unwrap()
        else {
            panic!("expected conditional result");
        };
        assert_eq!(parsed.to_string(), "$a && !$b");
        assert_eq!(
            parsed.definition_directive_description(),
            " @include(if: $a) @skip(if: $b)"
        );
    }

    #[test]
    fn folds_literal_arguments() {
        let skipped = field_directives("{ a @include(if: false) }");
        assert_eq!(
            InclusionConditions::from_directives(&skipped).unwrap(),
            InclusionResult::Skipped
        );
        let skipped = field_directives("{ a @skip(if: true) }");
        assert_eq!(
            InclusionConditions::from_directives(&skipped).unwrap(),
            InclusionResult::Skipped
        );
        let included = field_directives("{ a @include(if: true) @skip(if: false) }");
        assert_eq!(
            InclusionConditions::from_directives(&included).unwrap(),
            InclusionResult::Included
        );
    }

    #[test]
    fn disjunction_equality_ignores_insertion_order() {
        let a = conditions([InclusionCondition::include(name!("a"))]);
        let b = conditions([InclusionCondition::include(name!("b"))]);

        let mut a_then_b = AnyOf::new(a.clone());
        a_then_b.insert(b.clone());
        let mut b_then_a = AnyOf::new(b.clone());
        b_then_a.insert(a.clone());
        assert_eq!(a_then_b, b_then_a);

        let random_state = std::hash::RandomState::new();
        assert_eq!(
            random_state.hash_one(&a_then_b),
            random_state.hash_one(&b_then_a)
        );

        assert!(!a_then_b.insert(a));
        assert_eq!(a_then_b.len(), 2);
        assert_eq!(a_then_b.to_string(), "($a) || ($b)");
        assert_eq!(
            a_then_b.definition_directive_description(),
            " @include(if: ($a) || ($b))"
        );
    }

    #[test]
    fn unconditional_path_absorbs_conditions() {
        let a = AnyOf::new(conditions([InclusionCondition::include(name!("a"))]));
        let b = AnyOf::new(conditions([InclusionCondition::include(name!("b"))]));
        assert_eq!(merge_inclusion(Some(a.clone()), None), None);
        assert_eq!(merge_inclusion(None, Some(b.clone())), None);
        let merged = merge_inclusion(Some(a), Some(b)).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn restricting_combines_with_the_guard() {
        let a = conditions([InclusionCondition::include(name!("a"))]);
        let b = conditions([InclusionCondition::include(name!("b"))]);
        let not_a = conditions([InclusionCondition::skip(name!("a"))]);
        let guard = AnyOf::new(a.clone());

        assert_eq!(restrict_inclusion(None, &guard), Some(Some(guard.clone())));

        let restricted = restrict_inclusion(Some(&AnyOf::new(b)), &guard)
            .unwrap()
            .unwrap();
        assert_eq!(restricted.len(), 1);
        let both = restricted.iter().next().unwrap();
        assert!(both.contains(&InclusionCondition::include(name!("a"))));
        assert!(both.contains(&InclusionCondition::include(name!("b"))));

        assert_eq!(restrict_inclusion(Some(&AnyOf::new(not_a)), &guard), None);

        let mut either = AnyOf::new(conditions([InclusionCondition::skip(name!("a"))]));
        either.insert(a.clone());
        assert_eq!(
            restrict_inclusion(Some(&either), &guard),
            Some(Some(AnyOf::new(a)))
        );
    }
}
