use std::error::Error;
use std::sync::Arc;

use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::ast::resolution::build_operation;
use crate::ast::selection_set::{SelectionSet, SelectionSetId};
use crate::federation_metadata::FederationMetadata;
use crate::planner::{PlannerError, QueryPlanner};
use crate::tests::testkit::{init_logger, read_metadata, PRODUCTS_FIXTURE};

#[test]
fn cached_plan_is_shared_per_operation_shape() -> Result<(), Box<dyn Error>> {
    init_logger();
    let metadata = read_metadata(PRODUCTS_FIXTURE);
    let planner = QueryPlanner::new(metadata.clone())?;

    let first = build_operation(&metadata, "{ topProducts { name inStock } }", None)?;
    let same_shape = build_operation(&metadata, "query { topProducts { name inStock } }", None)?;
    let other = build_operation(&metadata, "{ topProducts { name } }", None)?;

    let plan = planner.plan(&first)?;
    assert!(Arc::ptr_eq(&plan, &planner.plan(&same_shape)?));
    assert!(!Arc::ptr_eq(&plan, &planner.plan(&other)?));

    Ok(())
}

#[test]
fn rejects_metadata_without_subgraphs() {
    let metadata = FederationMetadata::from_json(
        r#"{ "types": { "Query": { "fields": {} } } }"#,
    )
    .unwrap();

    assert!(matches!(
        QueryPlanner::new(Arc::new(metadata)),
        Err(PlannerError::InvalidConfiguration(_))
    ));
}

#[test]
fn rejects_metadata_without_query_type() {
    let metadata = FederationMetadata::from_json(r#"{ "subgraphs": ["a"] }"#).unwrap();

    assert!(matches!(
        QueryPlanner::new(Arc::new(metadata)),
        Err(PlannerError::InvalidConfiguration(_))
    ));
}

#[test]
fn rejects_empty_operation() -> Result<(), Box<dyn Error>> {
    let planner = QueryPlanner::new(read_metadata(PRODUCTS_FIXTURE))?;
    let operation = OperationDefinition {
        name: None,
        operation_kind: OperationKind::Query,
        variable_definitions: vec![],
        selection_set: SelectionSet::new(SelectionSetId(0), "Query"),
    };

    assert!(matches!(
        planner.plan(&operation),
        Err(PlannerError::InvalidConfiguration(_))
    ));

    Ok(())
}

#[test]
fn fails_without_entity_resolver() -> Result<(), Box<dyn Error>> {
    let metadata = Arc::new(FederationMetadata::from_json(
        r#"{
            "subgraphs": ["products", "inventory"],
            "types": {
                "Query": { "fields": { "topProducts": { "type": "[Product]", "owner": "products" } } },
                "Product": { "fields": {
                    "upc": { "type": "ID!", "owner": "products" },
                    "inStock": { "type": "Boolean", "owner": "inventory" }
                } }
            }
        }"#,
    )?);
    let planner = QueryPlanner::new(metadata.clone())?;
    let operation = build_operation(&metadata, "{ topProducts { inStock } }", None)?;

    assert_eq!(
        planner.plan(&operation).unwrap_err(),
        PlannerError::NoEntityResolver {
            type_name: "Product".to_string(),
            subgraph: "inventory".to_string(),
        }
    );

    Ok(())
}

#[test]
fn fails_when_key_cannot_be_provided() -> Result<(), Box<dyn Error>> {
    let metadata = Arc::new(FederationMetadata::from_json(
        r#"{
            "subgraphs": ["products", "inventory"],
            "types": {
                "Query": { "fields": { "topProducts": { "type": "[Product]", "owner": "products" } } },
                "Product": {
                    "fields": {
                        "upc": { "type": "ID!", "owner": "inventory" },
                        "inStock": { "type": "Boolean", "owner": "inventory" }
                    },
                    "variables": [{ "name": "Product_upc", "field": "upc" }],
                    "resolvers": [{ "subgraph": "inventory", "kind": "batch", "field": "productsByUpc",
                        "arguments": [{ "name": "upcs", "variable": "Product_upc", "type": "[ID!]!" }] }]
                }
            }
        }"#,
    )?);
    let planner = QueryPlanner::new(metadata.clone())?;
    let operation = build_operation(&metadata, "{ topProducts { inStock } }", None)?;

    assert_eq!(
        planner.plan(&operation).unwrap_err(),
        PlannerError::UnresolvableRequirement {
            type_name: "Product".to_string(),
            field_name: "upc".to_string(),
            subgraph: "inventory".to_string(),
        }
    );

    Ok(())
}
