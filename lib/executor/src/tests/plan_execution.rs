use serde_json::{json, Map, Value};

use crate::tests::testkit::{data, export_alias, init_logger, plan, MockReply, MockSubgraphs};

#[tokio::test]
async fn root_fields_of_one_subgraph() {
    init_logger();
    let plan = plan("{ me { id username } }");
    let subgraphs = MockSubgraphs::new().with("accounts", |_| {
        data(json!({ "me": { "id": "u1", "username": "ada" } }))
    });

    let output = subgraphs.run(&plan, None).await.expect("plan executes");

    assert_eq!(
        serde_json::to_string(&output).expect("serializable"),
        r#"{"data":{"me":{"id":"u1","username":"ada"}}}"#
    );
    assert_eq!(
        subgraphs.log.calls()[0].query,
        "query { me { id username } }"
    );
}

#[tokio::test]
async fn operation_variables_are_forwarded() {
    init_logger();
    let plan = plan("query Top($first: Int = 5) { top: topProducts(first: $first) { name } }");
    let subgraphs = MockSubgraphs::new().with("products", |_| {
        data(json!({ "top": [{ "name": "Table" }, { "name": "Couch" }] }))
    });

    let output = subgraphs
        .run(&plan, Some(json!({ "first": 2 })))
        .await
        .expect("plan executes");
    assert_eq!(
        output.data,
        json!({ "top": [{ "name": "Table" }, { "name": "Couch" }] })
    );
    assert_eq!(
        Value::Object(subgraphs.log.calls()[0].variables.clone()),
        json!({ "first": 2 })
    );

    // Without a value the subgraph applies the default from the document.
    subgraphs.run(&plan, None).await.expect("plan executes");
    assert!(subgraphs.log.calls()[1].variables.is_empty());
}

#[tokio::test]
async fn root_fields_of_several_subgraphs_run_in_parallel() {
    init_logger();
    let plan = plan("{ me { username } topProducts { name } }");
    let subgraphs = MockSubgraphs::new()
        .with("accounts", |_| data(json!({ "me": { "username": "ada" } })))
        .with("products", |_| data(json!({ "topProducts": [{ "name": "Table" }] })));

    let output = subgraphs.run(&plan, None).await.expect("plan executes");

    assert_eq!(
        output.data,
        json!({ "me": { "username": "ada" }, "topProducts": [{ "name": "Table" }] })
    );
    assert_eq!(subgraphs.log.calls().len(), 2);
}

#[tokio::test]
async fn mutation_fields_run_in_order() {
    init_logger();
    let plan = plan(
        r#"mutation { addProduct(name: "Lamp") { name } addReview(upc: "1", body: "Bright") { body } }"#,
    );
    let subgraphs = MockSubgraphs::new()
        .with("products", |_| data(json!({ "addProduct": { "name": "Lamp" } })))
        .with("reviews", |_| data(json!({ "addReview": { "body": "Bright" } })));

    let output = subgraphs.run(&plan, None).await.expect("plan executes");

    assert_eq!(
        output.data,
        json!({ "addProduct": { "name": "Lamp" }, "addReview": { "body": "Bright" } })
    );
    assert_eq!(subgraphs.log.subgraph_order(), vec!["products", "reviews"]);
}

#[tokio::test]
async fn required_fields_are_batched_by_key() {
    init_logger();
    let plan = plan("{ topProducts { shippingEstimate } }");
    let price = export_alias(&plan, "Product_price");
    let weight = export_alias(&plan, "Product_weight");
    let upc = export_alias(&plan, "Product_upc");

    let products: Vec<Value> = [("1", 10, 1), ("2", 20, 1), ("1", 10, 1)]
        .into_iter()
        .map(|(upc_value, price_value, weight_value)| {
            let mut product = Map::new();
            product.insert(price.clone(), json!(price_value));
            product.insert(weight.clone(), json!(weight_value));
            product.insert(upc.clone(), json!(upc_value));
            Value::Object(product)
        })
        .collect();

    let subgraphs = MockSubgraphs::new()
        .with("products", move |_| data(json!({ "topProducts": products.clone() })))
        .with("inventory", |request| {
            let variables = &request.variables;
            match (
                variables.get("Product_upc").and_then(Value::as_array),
                variables.get("Product_price").and_then(Value::as_i64),
                variables.get("Product_weight").and_then(Value::as_i64),
            ) {
                (Some(upcs), Some(price), Some(weight)) => data(json!({
                    "productsByUpc": upcs
                        .iter()
                        .map(|upc| json!({ "shippingEstimate": price * weight, "_internal_key_0": upc }))
                        .collect::<Vec<_>>()
                })),
                _ => MockReply::Json(json!({ "errors": [{ "message": "missing requirements" }] })),
            }
        });

    let output = subgraphs.run(&plan, None).await.expect("plan executes");

    // Scalar arguments come from the first unique entity.
    assert_eq!(
        output.data,
        json!({
            "topProducts": [
                { "shippingEstimate": 10 },
                { "shippingEstimate": 10 },
                { "shippingEstimate": 10 }
            ]
        })
    );
    assert!(output.errors.is_empty());

    let inventory_calls = subgraphs.log.calls_to("inventory");
    assert_eq!(inventory_calls.len(), 1);
    assert_eq!(
        Value::Object(inventory_calls[0].variables.clone()),
        json!({ "Product_price": 10, "Product_weight": 1, "Product_upc": ["1", "2"] })
    );
}

#[tokio::test]
async fn null_entities_are_not_resolved_further() {
    init_logger();
    let plan = plan("{ me { username reviews { body } } }");
    let subgraphs = MockSubgraphs::new()
        .with("accounts", |_| data(json!({ "me": null })))
        .with("reviews", |_| data(json!({ "userById": { "reviews": [] } })));

    let output = subgraphs.run(&plan, None).await.expect("plan executes");

    assert_eq!(output.data, json!({ "me": null }));
    assert!(subgraphs.log.calls_to("reviews").is_empty());
}
