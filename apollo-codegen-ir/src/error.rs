use std::fmt;

use apollo_compiler::Name;
use displaydoc::Display;
use thiserror::Error;

/// Errors raised while building the IR of a compiled GraphQL document.
///
/// Any of these aborts the build of the operation or fragment being constructed: no partially
/// built IR is handed back to the caller.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IrError {
    /// fragment "{fragment}" references itself: {chain}
    CyclicFragmentReference {
        fragment: Name,
        chain: FragmentChain,
    },
    /// unknown fragment "{0}"
    UnknownFragment(Name),
    /// unknown operation named {0}
    UnknownOperation(String),
    /// unknown type "{0}"
    UnknownType(Name),
    /// invalid `{argument}` argument on @{directive}: {message}
    InvalidDirectiveArgument {
        directive: Name,
        argument: &'static str,
        message: String,
    },
    /// internal error: {0}
    Internal(String),
}

impl IrError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// The chain of fragment names that led back to a fragment already being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentChain(pub Vec<Name>);

impl FragmentChain {
    pub fn names(&self) -> &[Name] {
        &self.0
    }
}

impl fmt::Display for FragmentChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.0.iter();
        if let Some(first) = names.next() {
            write!(f, "{first}")?;
        }
        names.try_for_each(|name| write!(f, " -> {name}"))
    }
}

/// Returns an [`IrError::Internal`] from the enclosing function.
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::error::IrError::internal(format!( $( $arg )+ )))
    };
}
pub(crate) use bail;

/// Returns an [`IrError::Internal`] from the enclosing function unless the condition holds.
macro_rules! ensure {
    ( $expr:expr, $( $arg:tt )+ ) => {
        if !$expr {
            $crate::error::bail!( $( $arg )+ );
        }
    };
}
pub(crate) use ensure;
