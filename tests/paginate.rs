mod common;

use common::*;
use futures::{StreamExt, TryStreamExt};
use searchflow::SearchflowError;
use searchflow::models::BrowseParams;
use searchflow::paginate::{Page, PageCursor, collect_items, paginate};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};

/// Pages of two numbers each; `pages` pages in total
async fn numbered_page(cursor: Option<PageCursor>, pages: u32) -> searchflow::SearchflowResult<Page<u32>> {
    let page = match cursor {
        Some(PageCursor::Number(n)) => n,
        _ => 0,
    };
    Ok(Page {
        items: vec![page * 2, page * 2 + 1],
        next: (page + 1 < pages).then_some(PageCursor::Number(page + 1)),
    })
}

#[tokio::test]
async fn test_paginate_follows_next_until_exhausted() {
    let calls = AtomicU32::new(0);
    let pages: Vec<Page<u32>> = paginate(
        |cursor| {
            calls.fetch_add(1, Ordering::SeqCst);
            numbered_page(cursor, 4)
        },
        |_| false,
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(pages.len(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(pages[3].next, None);
}

#[tokio::test]
async fn test_paginate_stop_predicate_ends_iteration() {
    let calls = AtomicU32::new(0);
    let items = collect_items(paginate(
        |cursor| {
            calls.fetch_add(1, Ordering::SeqCst);
            numbered_page(cursor, 100)
        },
        |page: &Page<u32>| page.items.contains(&5),
    ))
    .await
    .unwrap();

    assert_eq!(items, vec![0, 1, 2, 3, 4, 5]);
    // The stopping page is yielded, nothing is fetched after it
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_paginate_is_lazy() {
    let calls = AtomicU32::new(0);
    let stream = paginate(
        |cursor| {
            calls.fetch_add(1, Ordering::SeqCst);
            numbered_page(cursor, 10)
        },
        |_| false,
    );
    futures::pin_mut!(stream);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.items, vec![0, 1]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_paginate_first_call_has_no_cursor() {
    let seen = std::sync::Mutex::new(Vec::new());
    let _: Vec<Page<u32>> = paginate(
        |cursor| {
            seen.lock().unwrap().push(cursor.clone());
            numbered_page(cursor, 3)
        },
        |_| false,
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some(PageCursor::Number(1)), Some(PageCursor::Number(2))]
    );
}

#[tokio::test]
async fn test_paginate_error_ends_stream() {
    let calls = AtomicU32::new(0);
    let results: Vec<_> = paginate(
        |cursor| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 1 {
                    Err(SearchflowError::InvalidInput("broken page".to_string()))
                } else {
                    numbered_page(cursor, 10).await
                }
            }
        },
        |_| false,
    )
    .collect()
    .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SearchflowError::InvalidInput(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_browse_objects_follows_cursor() {
    let service = FakeService::new();
    service.with_state(|s| {
        s.indices.insert("products".to_string(), records(25));
    });
    let client = client(&service);

    let params = BrowseParams {
        hits_per_page: Some(10),
        ..Default::default()
    };
    let pages: Vec<Page<serde_json::Value>> = client
        .browse_objects("products", params)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].next, Some(PageCursor::Cursor("10".to_string())));
    assert_eq!(pages[2].items.len(), 5);
    assert_eq!(service.calls_matching("/browse"), 3);
}

#[tokio::test]
async fn test_browse_objects_all() {
    let service = FakeService::new();
    service.with_state(|s| {
        s.indices.insert("products".to_string(), records(7));
        s.browse_page_size = 3;
    });
    let client = client(&service);

    let all = client
        .browse_objects_all("products", BrowseParams::default())
        .await
        .unwrap();
    assert_eq!(all, records(7));

    let empty = client
        .browse_objects_all("missing", BrowseParams::default())
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_browse_rules_stops_on_short_page() {
    let service = FakeService::new();
    let rules: Vec<serde_json::Value> = (0..5).map(|i| json!({ "objectID": format!("rule-{}", i) })).collect();
    service.with_state(|s| {
        s.rules.insert("products".to_string(), rules.clone());
    });
    let client = client(&service);

    let all = client.browse_rules_all("products", 2).await.unwrap();
    assert_eq!(all, rules);
    // Pages of 2, 2 and 1 hits
    assert_eq!(service.calls_matching("/rules/search"), 3);
}

#[tokio::test]
async fn test_browse_synonyms_exact_multiple() {
    let service = FakeService::new();
    let synonyms: Vec<serde_json::Value> = (0..4).map(|i| json!({ "objectID": format!("syn-{}", i) })).collect();
    service.with_state(|s| {
        s.synonyms.insert("products".to_string(), synonyms.clone());
    });
    let client = client(&service);

    let all = client.browse_synonyms_all("products", 2).await.unwrap();
    assert_eq!(all, synonyms);
    // A full last page needs one more (empty) page to detect the end
    assert_eq!(service.calls_matching("/synonyms/search"), 3);
}
