use tracing::instrument;

use crate::ast::operation::OperationDefinition;
use crate::ast::selection_set::SelectionSet;
use crate::federation_metadata::{FederationMetadata, ObjectTypeMetadata};

/// Annotates selections with their precomputed `FieldFlags` so later
/// planning stages can branch on bits instead of metadata lookups.
pub struct FieldFlagsOptimizer;

impl FieldFlagsOptimizer {
    /// Sets the flags of every field of `selection_set` known to
    /// `type_metadata`. Fields the metadata does not describe (such as
    /// `__typename`) keep their flags. Nested selection sets are not visited.
    pub fn optimize_selection_set(selection_set: &mut SelectionSet, type_metadata: &ObjectTypeMetadata) {
        for field in selection_set.items.iter_mut() {
            if let Some(flags) = type_metadata.field_flags(&field.name) {
                field.flags = flags;
            }
        }
    }

    #[instrument(level = "trace", skip_all)]
    pub fn optimize_operation(operation: &mut OperationDefinition, metadata: &FederationMetadata) {
        optimize_recursive(&mut operation.selection_set, metadata);
    }
}

fn optimize_recursive(selection_set: &mut SelectionSet, metadata: &FederationMetadata) {
    if let Some(type_metadata) = metadata.get_type(&selection_set.type_name) {
        FieldFlagsOptimizer::optimize_selection_set(selection_set, type_metadata);
    }

    for field in selection_set.items.iter_mut() {
        if let Some(child) = field.selection_set.as_mut() {
            optimize_recursive(child, metadata);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FieldFlagsOptimizer;
    use crate::ast::resolution::build_operation;
    use crate::federation_metadata::field_flags::FieldFlags;
    use crate::federation_metadata::FederationMetadata;

    fn metadata() -> FederationMetadata {
        FederationMetadata::from_json(
            r#"{
                "subgraphs": ["products", "inventory"],
                "types": {
                    "Query": { "fields": { "topProducts": { "type": "[Product]", "owner": "products" } } },
                    "Product": {
                        "fields": {
                            "upc": { "type": "ID!", "owner": "products", "subgraphs": ["inventory"] },
                            "weight": { "type": "Int", "owner": "products", "external": ["inventory"] },
                            "shippingEstimate": { "type": "Int", "owner": "inventory", "requires": ["weight"] }
                        },
                        "variables": [{ "name": "Product_upc", "field": "upc" }]
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn annotates_known_fields_and_leaves_others() {
        let metadata = metadata();
        let mut operation = build_operation(
            &metadata,
            "{ topProducts { __typename upc weight shippingEstimate } }",
            None,
        )
        .unwrap();

        FieldFlagsOptimizer::optimize_operation(&mut operation, &metadata);

        let root = &operation.selection_set.items[0];
        assert_eq!(root.flags, FieldFlags::RESOLVABLE);
        let product = root.selection_set.as_ref().unwrap();
        let flags: Vec<FieldFlags> = product.items.iter().map(|f| f.flags).collect();
        assert_eq!(
            flags,
            vec![
                FieldFlags::empty(),
                FieldFlags::RESOLVABLE | FieldFlags::SHARED,
                FieldFlags::RESOLVABLE | FieldFlags::EXTERNAL,
                FieldFlags::RESOLVABLE | FieldFlags::REQUIRES,
            ]
        );
    }

    #[test]
    fn is_idempotent() {
        let metadata = metadata();
        let mut operation =
            build_operation(&metadata, "{ topProducts { upc shippingEstimate } }", None).unwrap();

        FieldFlagsOptimizer::optimize_operation(&mut operation, &metadata);
        let once = operation.clone();
        FieldFlagsOptimizer::optimize_operation(&mut operation, &metadata);

        assert_eq!(once, operation);
    }
}
