use std::error::Error;

use crate::planner::plan_nodes::ExecutionNode;
use crate::tests::testkit::{build_query_plan, init_logger, PRODUCTS_FIXTURE};

#[test]
fn mutation_fields_run_in_sequence() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        r#"mutation { addProduct(name: "x") { upc name } addReview(upc: "1", body: "b") { id body } }"#,
    )?;

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Sequence {
        Resolve(id: 0, service: "products") {
          mutation { addProduct(name: "x") { upc name } }
        },
        Resolve(id: 1, service: "reviews") {
          mutation { addReview(upc: "1", body: "b") { id body } }
        },
      },
    },
    "#);

    Ok(())
}

#[test]
fn only_contiguous_mutation_fields_are_grouped() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        r#"mutation {
            a: addProduct(name: "a") { upc }
            b: addProduct(name: "b") { upc }
            addReview(upc: "1", body: "b") { id }
            c: addProduct(name: "c") { upc }
        }"#,
    )?;

    let ExecutionNode::Sequence(nodes) = &query_plan.root else {
        panic!("expected a sequence");
    };
    let subgraphs: Vec<&str> = nodes
        .iter()
        .map(|node| node.config().unwrap().subgraph_name.as_str())
        .collect();
    assert_eq!(subgraphs, vec!["products", "reviews", "products"]);
    assert_eq!(
        nodes[0].config().unwrap().document,
        r#"mutation { a: addProduct(name: "a") { upc } b: addProduct(name: "b") { upc } }"#
    );

    Ok(())
}

#[test]
fn entity_fetches_of_mutations_are_queries() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        r#"mutation { addProduct(name: "x") { inStock } }"#,
    )?;

    let child = query_plan.root.children()[0].config().unwrap();
    assert_eq!(
        child.document,
        "query($Product_upc: ID!) { productByUpc(upc: $Product_upc) { inStock } }"
    );

    Ok(())
}
