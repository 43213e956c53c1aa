use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::executable::DirectiveList;
use apollo_compiler::executable::Value;
use apollo_compiler::name;
use serde::Serialize;

use crate::error::IrError;

pub(crate) const DEFER_DIRECTIVE_NAME: Name = name!("defer");

/// Whether a fragment spread is delivered later in an incremental response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IsDeferred {
    /// Statically deferred (`true`) or not deferred at all (`false`).
    Value(bool),
    /// Deferred when the named boolean operation variable is `true` at execution time.
    If(Name),
}

impl Default for IsDeferred {
    fn default() -> Self {
        Self::Value(false)
    }
}

impl IsDeferred {
    pub fn from_directives(directives: &DirectiveList) -> Result<Self, IrError> {
        let Some(directive) = directives.get(DEFER_DIRECTIVE_NAME.as_str()) else {
            return Ok(Self::Value(false));
        };
        match directive.specified_argument_by_name("if").map(|value| &**value) {
            None => Ok(Self::Value(true)),
            Some(Value::Boolean(deferred)) => Ok(Self::Value(*deferred)),
            Some(Value::Variable(variable)) => Ok(Self::If(variable.clone())),
            Some(other) => Err(IrError::InvalidDirectiveArgument {
                directive: DEFER_DIRECTIVE_NAME,
                argument: "if",
                message: format!("expected boolean or variable, got {other}"),
            }),
        }
    }

    /// `false` only when the spread is statically not deferred.
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Self::Value(false))
    }

    /// The directive this state was parsed from, with a leading space so it can be appended
    /// to a selection's description as is.
    pub fn definition_directive_description(&self) -> String {
        match self {
            Self::Value(false) => String::new(),
            Self::Value(true) => " @defer".to_owned(),
            Self::If(variable) => format!(" @defer(if: {variable})"),
        }
    }
}

impl fmt::Display for IsDeferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(deferred) => write!(f, "{deferred}"),
            Self::If(variable) => write!(f, "if ${variable}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::executable::Selection;

    use super::*;

    fn inline_fragment_directives(query: &str) -> DirectiveList {
        let schema = Schema::parse_and_validate(
            r#"
            directive @defer(label: String, if: Boolean! = true) on FRAGMENT_SPREAD | INLINE_FRAGMENT
            type Query { a: Int }
            "#,
            "schema.graphql",
        )
        .unwrap();
        let document =
            ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
        let operation = document.operations.get(None).unwrap();
        let Selection::InlineFragment(fragment) = &operation.selection_set.selections[0] else {
            panic!("expected an inline fragment");
        };
        fragment.directives.clone()
    }

    #[test]
    fn renders_definition_directive_description() {
        assert_eq!(IsDeferred::Value(false).definition_directive_description(), "");
        assert_eq!(
            IsDeferred::Value(true).definition_directive_description(),
            " @defer"
        );
        assert_eq!(
            IsDeferred::If(name!("x")).definition_directive_description(),
            " @defer(if: x)"
        );
    }

    #[test]
    fn parses_defer_directive() {
        let not_deferred = inline_fragment_directives("{ ... { a } }");
        assert_eq!(
            IsDeferred::from_directives(&not_deferred).unwrap(),
            IsDeferred::Value(false)
        );

        let deferred = inline_fragment_directives("{ ... @defer { a } }");
        assert_eq!(
            IsDeferred::from_directives(&deferred).unwrap(),
            IsDeferred::Value(true)
        );

        let disabled = inline_fragment_directives("{ ... @defer(if: false) { a } }");
        let disabled = IsDeferred::from_directives(&disabled).unwrap();
        assert_eq!(disabled, IsDeferred::Value(false));
        assert!(!disabled.is_deferred());

        let conditional =
            inline_fragment_directives("query($later: Boolean!) { ... @defer(if: $later) { a } }");
        let conditional = IsDeferred::from_directives(&conditional).unwrap();
        assert_eq!(conditional, IsDeferred::If(name!("later")));
        assert!(conditional.is_deferred());
    }

    #[test]
    fn serializes_as_tagged_value() {
        assert_eq!(
            serde_json::to_string(&IsDeferred::If(name!("later"))).unwrap(),
            r#"{"If":"later"}"#
        );
        assert_eq!(
            serde_json::to_string(&IsDeferred::Value(true)).unwrap(),
            r#"{"Value":true}"#
        );
    }
}
