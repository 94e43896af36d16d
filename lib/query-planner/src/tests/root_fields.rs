use std::error::Error;

use crate::tests::testkit::{build_query_plan, init_logger, PRODUCTS_FIXTURE};

#[test]
fn single_subgraph() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(PRODUCTS_FIXTURE, "{ topProducts { name price } }")?;

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Resolve(id: 0, service: "products") {
        query { topProducts { name price } }
      },
    },
    "#);

    Ok(())
}

#[test]
fn root_fields_of_different_subgraphs_run_in_parallel() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        "{ me { username } topProducts { name } }",
    )?;

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Parallel {
        Resolve(id: 0, service: "accounts") {
          query { me { username } }
        },
        Resolve(id: 1, service: "products") {
          query { topProducts { name } }
        },
      },
    },
    "#);

    Ok(())
}

#[test]
fn root_fields_of_one_subgraph_share_a_step() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        r#"{ topProducts { name } me { username } product(upc: "1") { upc } }"#,
    )?;

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Parallel {
        Resolve(id: 0, service: "products") {
          query { topProducts { name } product(upc: "1") { upc } }
        },
        Resolve(id: 1, service: "accounts") {
          query { me { username } }
        },
      },
    },
    "#);

    Ok(())
}

#[test]
fn forwards_operation_variables() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(
        PRODUCTS_FIXTURE,
        "query Top($first: Int = 5) { top: topProducts(first: $first) { name } }",
    )?;

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Resolve(id: 0, service: "products") {
        query($first: Int = 5) { top: topProducts(first: $first) { name } }
      },
    },
    "#);

    let config = query_plan.root.config().unwrap();
    assert_eq!(config.forwarded_variables, vec!["first".to_string()]);
    assert!(config.requires.is_empty());

    Ok(())
}

#[test]
fn typename_only_operation_has_no_fetches() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query_plan = build_query_plan(PRODUCTS_FIXTURE, "{ __typename }")?;

    assert_eq!(query_plan.node_count(), 0);
    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    QueryPlan {
      Parallel {
      },
    },
    "#);

    Ok(())
}
