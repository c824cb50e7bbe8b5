mod common;

use common::*;
use searchflow::BlockingClient;
use searchflow::models::{
    ApiKeyOperation, BatchAction, BrowseParams, ScopeType, TaskHandle, TaskStatus,
};
use serde_json::json;

fn blocking(service: &std::sync::Arc<FakeService>) -> BlockingClient {
    BlockingClient::from_client(client(service)).unwrap()
}

#[test]
fn test_blocking_wait_for_task() {
    let service = FakeService::new();
    let client = blocking(&service);
    let handle = TaskHandle::new(service.add_task(2), "products");

    assert_eq!(client.wait_for_task(&handle).unwrap(), TaskStatus::Published);
    assert_eq!(service.calls_matching("/task/"), 3);
}

#[test]
fn test_blocking_writes_and_browse() {
    let service = FakeService::new();
    let client = blocking(&service);

    let outcomes = client.save_objects("products", &records(4), true).unwrap();
    assert_eq!(outcomes.len(), 1);

    let options = client
        .client()
        .chunked_write_options()
        .with_batch_size(2)
        .with_retry(fast_retry(5));
    let outcomes = client
        .chunked_write("products", &records(6), BatchAction::AddObject, &options)
        .unwrap();
    assert_eq!(outcomes.len(), 3);

    let all = client
        .browse_objects_all("products", BrowseParams::default())
        .unwrap();
    assert_eq!(all, records(6));
}

#[test]
fn test_blocking_replace_all_objects() {
    let service = FakeService::new();
    service.with_state(|s| {
        s.indices.insert("products".to_string(), records(10));
    });
    let client = blocking(&service);

    let resp = client.replace_all_objects("products", &records(3)).unwrap();
    assert_eq!(resp.steps.len(), 3);
    assert_eq!(service.index("products").unwrap(), records(3));
}

#[test]
fn test_blocking_wait_for_api_key() {
    let service = FakeService::new();
    service.script_key(
        "key",
        vec![
            (404, json!({ "message": "Key does not exist" })),
            (200, json!({ "value": "key", "acl": ["search"] })),
        ],
    );
    let client = blocking(&service);

    let resp = client
        .wait_for_api_key("key", ApiKeyOperation::Add, None, &fast_retry(5))
        .unwrap();
    assert_eq!(resp.unwrap().value, "key");
}

#[test]
fn test_blocking_delete_and_partial_update() {
    let service = FakeService::new();
    service.with_state(|s| {
        s.indices.insert("products".to_string(), records(3));
    });
    let client = blocking(&service);

    let outcomes = client
        .partial_update_objects(
            "products",
            &[json!({ "objectID": "obj-0", "rank": 99 })],
            false,
            true,
        )
        .unwrap();
    assert_eq!(outcomes.len(), 1);

    let ids = vec!["obj-1".to_string(), "obj-2".to_string()];
    client.delete_objects("products", &ids, true).unwrap();

    assert_eq!(
        service.index("products").unwrap(),
        vec![json!({ "objectID": "obj-0", "rank": 99 })]
    );
}

#[test]
fn test_blocking_index_operations() {
    let service = FakeService::new();
    service.with_state(|s| {
        s.indices.insert("products".to_string(), records(2));
        s.rules.insert(
            "products".to_string(),
            vec![json!({ "objectID": "rule-1" }), json!({ "objectID": "rule-2" })],
        );
        s.synonyms
            .insert("products".to_string(), vec![json!({ "objectID": "syn-1" })]);
    });
    let client = blocking(&service);

    assert_eq!(client.browse_rules_all("products", 1).unwrap().len(), 2);
    assert_eq!(client.browse_synonyms_all("products", 10).unwrap().len(), 1);

    let copy = client
        .copy_index("products", "products_copy", Some(vec![ScopeType::Rules]))
        .unwrap();
    let moved = client.move_index("products", "products_live").unwrap();
    client.wait_for_tasks(&[copy, moved], &fast_retry(5)).unwrap();

    let kinds: Vec<String> = service.operations().into_iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec!["copy", "move"]);
    assert_eq!(service.index("products_live").unwrap(), records(2));
    assert!(service.index("products").is_none());
}
