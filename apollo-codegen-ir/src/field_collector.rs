use apollo_compiler::Name;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::Type;
use indexmap::IndexMap;
use serde::Serialize;

/// Every field selected on each composite type, across all operations and fragments built by one
/// [`Ir`](crate::Ir).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldCollector {
    #[serde(serialize_with = "serialize_types")]
    fields_by_type: IndexMap<NamedType, IndexMap<Name, Type>>,
}

impl FieldCollector {
    /// Records that `field_name` was selected on `parent_type`. Collecting a field twice is a
    /// no-op.
    pub fn collect(&mut self, parent_type: &NamedType, field_name: &Name, ty: &Type) {
        self.fields_by_type
            .entry(parent_type.clone())
            .or_default()
            .entry(field_name.clone())
            .or_insert_with(|| ty.clone());
    }

    /// The fields selected on `parent_type`, in the order they were first collected.
    pub fn fields_for(&self, parent_type: &str) -> impl Iterator<Item = (&Name, &Type)> {
        self.fields_by_type
            .get(parent_type)
            .into_iter()
            .flat_map(|fields| fields.iter())
    }

    pub fn collected_types(&self) -> impl ExactSizeIterator<Item = &NamedType> {
        self.fields_by_type.keys()
    }
}

fn serialize_types<S: serde::Serializer>(
    fields_by_type: &IndexMap<NamedType, IndexMap<Name, Type>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(fields_by_type.iter().map(|(parent_type, fields)| {
        let fields = fields
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.to_string()))
            .collect::<IndexMap<_, _>>();
        (parent_type.as_str(), fields)
    }))
}
