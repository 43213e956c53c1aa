/// This macro is a wrapper around `tracing::trace!` that tags a logging statement with the IR
/// data structure it describes, so that external tools can show how entities, fragments and
/// operations evolve while a document is being built.
///
/// Passing an identifier tags the snapshot with the type name of the value and serializes it to
/// JSON with serde_json. EX:
/// ```ignore
/// snapshot!(fragment_spread.inclusion_conditions, "merged fragment spread conditions");
/// // Generates:
/// // trace!(snapshot = "Option<AnyOf<InclusionConditions>>", data = "[..]", "merged fragment spread conditions");
/// ```
/// Passing a literal name and a value implementing `Display` skips serialization. EX:
/// ```ignore
/// snapshot!("NamedFragment", fragment.to_string(), "built named fragment");
/// ```
/// Both forms compile to nothing unless the `snapshot_tracing` feature is enabled.
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).unwrap_or_default(),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(snapshot = $name, data = %$value, $msg);
    };
}

pub(crate) use snapshot;
