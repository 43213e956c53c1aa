use std::sync::Arc;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::executable;
use apollo_compiler::name;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;
use tracing::trace;

use crate::builder::RootFieldBuilder;
use crate::error::FragmentChain;
use crate::error::IrError;
use crate::field_collector::FieldCollector;
use crate::fragment::NamedFragment;
use crate::location::SourceDefinition;
use crate::operation::Operation;
use crate::operation::definition_source;
use crate::schema::IrSchema;
use crate::utils::logging::snapshot;

const OPERATION_ROOT_FIELD_NAME: Name = name!("data");

/// Builds the IR of the operations and fragments of one document.
///
/// Each named fragment is built at most once, the first time it is spread or requested, and the
/// same [`NamedFragment`] is handed to everything that uses it afterwards.
#[derive(Debug)]
pub struct Ir {
    schema: IrSchema,
    document: ExecutableDocument,
    field_collector: FieldCollector,
    built_fragments: IndexMap<Name, Arc<NamedFragment>>,
    /// Fragments whose build has started but not finished, outermost first.
    fragments_in_progress: IndexSet<Name>,
}

impl Ir {
    /// The document is expected to be valid against `schema`, but is not required to be: building
    /// a cyclic fragment reports an error instead of recursing.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "Ir::new")
    )]
    pub fn new(schema: Valid<Schema>, document: ExecutableDocument) -> Result<Self, IrError> {
        let mut schema = IrSchema::new(schema, &document)?;

        let root_types = schema.root_operation_types();
        let definition_root_types = document
            .operations
            .iter()
            .map(|operation| &operation.selection_set.ty)
            .chain(document.fragments.values().map(|fragment| fragment.type_condition()));
        for root_type in definition_root_types {
            if root_types.contains(root_type) {
                schema.mark_root_field_type(root_type);
            }
        }
        debug!(
            operations = document.operations.iter().count(),
            fragments = document.fragments.len(),
            referenced_types = schema.referenced_types().len(),
            "classified root field types"
        );

        Ok(Self {
            schema,
            document,
            field_collector: FieldCollector::default(),
            built_fragments: IndexMap::new(),
            fragments_in_progress: IndexSet::new(),
        })
    }

    pub fn schema(&self) -> &IrSchema {
        &self.schema
    }

    pub fn document(&self) -> &ExecutableDocument {
        &self.document
    }

    /// Every field selected by the operations and fragments built so far, by type.
    pub fn field_collector(&self) -> &FieldCollector {
        &self.field_collector
    }

    pub(crate) fn field_collector_mut(&mut self) -> &mut FieldCollector {
        &mut self.field_collector
    }

    /// The fragment named `name`, if it has been built.
    pub fn built_fragment(&self, name: &str) -> Option<&Arc<NamedFragment>> {
        self.built_fragments.get(name)
    }

    /// Every fragment built so far, in the order their builds completed.
    pub fn built_fragments(&self) -> impl ExactSizeIterator<Item = &Arc<NamedFragment>> {
        self.built_fragments.values()
    }

    /// Builds the operation named `name`, or the document's only operation when `name` is `None`.
    pub fn build_operation_named(&mut self, name: Option<&str>) -> Result<Operation, IrError> {
        let operation = self
            .document
            .operations
            .get(name)
            .map_err(|_| IrError::UnknownOperation(name.unwrap_or("<anonymous>").to_owned()))?
            .clone();
        self.build_operation(&operation)
    }

    /// Builds every operation of the document, in document order.
    pub fn build_all_operations(&mut self) -> Result<Vec<Operation>, IrError> {
        let operations = self
            .document
            .operations
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        operations
            .iter()
            .map(|operation| self.build_operation(operation))
            .collect()
    }

    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "Ir::build_operation")
    )]
    pub fn build_operation(
        &mut self,
        definition: &Node<executable::Operation>,
    ) -> Result<Operation, IrError> {
        let source = definition_source(definition.location(), &self.document.sources, || {
            definition.serialize().no_indent().to_string()
        });
        let built = RootFieldBuilder::build(
            self,
            SourceDefinition::operation(definition.clone()),
            OPERATION_ROOT_FIELD_NAME,
            &definition.selection_set,
        )?;
        debug!(
            operation = definition.name.as_ref().map(Name::as_str),
            entities = built.entities.len(),
            referenced_fragments = built.referenced_fragments.len(),
            "built operation"
        );
        let operation = Operation::new(
            definition.clone(),
            built.root_field,
            built.referenced_fragments,
            built.entities,
            built.contains_deferred_fragment,
            source,
        );
        snapshot!("Operation", operation.to_string(), "built operation");
        Ok(operation)
    }

    /// Returns the fragment named `name`, building it on first use.
    ///
    /// Fails if the fragment spreads itself, directly or through other fragments.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "Ir::build_fragment")
    )]
    pub fn build_fragment(&mut self, name: &Name) -> Result<Arc<NamedFragment>, IrError> {
        if let Some(fragment) = self.built_fragments.get(name) {
            trace!(fragment = %name, "using built fragment");
            return Ok(Arc::clone(fragment));
        }
        if let Some(index) = self.fragments_in_progress.get_index_of(name) {
            let chain = self
                .fragments_in_progress
                .iter()
                .skip(index)
                .chain(std::iter::once(name))
                .cloned()
                .collect();
            return Err(IrError::CyclicFragmentReference {
                fragment: name.clone(),
                chain: FragmentChain(chain),
            });
        }
        let definition = self
            .document
            .fragments
            .get(name)
            .ok_or_else(|| IrError::UnknownFragment(name.clone()))?
            .clone();

        self.fragments_in_progress.insert(name.clone());
        let built = self.build_named_fragment(definition);
        self.fragments_in_progress.pop();

        let fragment = Arc::new(built?);
        debug!(
            fragment = %name,
            entities = fragment.entities.len(),
            referenced_fragments = fragment.referenced_fragments.len(),
            "built fragment"
        );
        snapshot!("NamedFragment", fragment.to_string(), "built fragment");
        self.built_fragments
            .insert(name.clone(), Arc::clone(&fragment));
        Ok(fragment)
    }

    fn build_named_fragment(
        &mut self,
        definition: Node<executable::Fragment>,
    ) -> Result<NamedFragment, IrError> {
        let source = definition_source(definition.location(), &self.document.sources, || {
            definition.serialize().no_indent().to_string()
        });
        let built = RootFieldBuilder::build(
            self,
            SourceDefinition::named_fragment(definition.clone()),
            definition.name.clone(),
            &definition.selection_set,
        )?;
        Ok(NamedFragment::new(
            definition,
            built.root_field,
            built.referenced_fragments,
            built.entities,
            built.contains_deferred_fragment,
            source,
        ))
    }
}
