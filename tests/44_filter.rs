mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{Session, TestServer};

async fn titles(server: &TestServer, session: Option<&Session>, query: &str) -> Result<Vec<String>> {
    let mut req = server.client.get(server.url(&format!("/items?{}", query)));
    if let Some(session) = session {
        req = req.header("Authorization", session.header());
    }
    let res = req.send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "list failed: {}", res.text().await?);
    let body = res.json::<Value>().await?;
    Ok(body["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["title"].as_str().map(str::to_string)).collect())
        .unwrap_or_default())
}

#[tokio::test]
async fn start_bounds_are_inclusive() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("range@example.com", "range").await?;
    for (title, start) in [("A", 1_000), ("B", 2_000), ("C", 3_000)] {
        server.create_item(&session, json!({ "title": title, "startDate": start })).await?;
    }

    assert_eq!(titles(&server, None, "startlt=2000").await?, vec!["A", "B"]);
    assert_eq!(titles(&server, None, "startgt=2000").await?, vec!["B", "C"]);
    assert_eq!(titles(&server, None, "startgt=1500&startlt=2500").await?, vec!["B"]);
    Ok(())
}

#[tokio::test]
async fn sort_by_start_date() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("sort@example.com", "sort").await?;
    for (title, start) in [("middle", 2_000), ("first", 1_000), ("last", 3_000)] {
        server.create_item(&session, json!({ "title": title, "startDate": start })).await?;
    }

    assert_eq!(titles(&server, None, "sortBy=startDate").await?, vec!["first", "middle", "last"]);
    assert_eq!(titles(&server, None, "sortBy=startDate-desc").await?, vec!["last", "middle", "first"]);
    assert_eq!(titles(&server, None, "").await?, vec!["middle", "first", "last"]);
    Ok(())
}

#[tokio::test]
async fn scheduled_includes_events() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("sched@example.com", "sched").await?;
    let target = server.create_item(&session, json!({ "title": "plain" })).await?;
    server
        .create_item(&session, json!({ "itemType": "scheduled", "title": "slot", "scheduledItem": target["id"] }))
        .await?;
    server.create_item(&session, json!({ "itemType": "event", "title": "party" })).await?;
    server.create_item(&session, json!({ "itemType": "task", "title": "chore" })).await?;

    assert_eq!(titles(&server, None, "itemType=scheduled").await?, vec!["slot", "party"]);
    assert_eq!(titles(&server, None, "itemType=event").await?, vec!["party"]);
    assert_eq!(titles(&server, None, "itemType=task").await?, vec!["chore"]);
    assert_eq!(titles(&server, None, "itemType=item").await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn search_tags_and_priority() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("search@example.com", "search").await?;
    server
        .create_item(&session, json!({ "title": "Groceries", "description": "milk and eggs", "tags": ["home"] }))
        .await?;
    server
        .create_item(&session, json!({ "title": "Report", "notes": "100% done", "tags": ["work"], "priority": "HIGH" }))
        .await?;
    server.create_item(&session, json!({ "title": "Milkshake recipe" })).await?;

    assert_eq!(titles(&server, None, "search=MILK").await?, vec!["Groceries", "Milkshake recipe"]);
    assert_eq!(titles(&server, None, "search=100%25").await?, vec!["Report"]);
    assert_eq!(titles(&server, None, "tags=work,garden").await?, vec!["Report"]);
    assert_eq!(titles(&server, None, "priority=high").await?, vec!["Report"]);
    assert_eq!(titles(&server, Some(&session), "mine=true&tags=home").await?, vec!["Groceries"]);
    Ok(())
}

#[tokio::test]
async fn mixed_items_filter_by_search_priority_start_and_tags() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("mixed@example.com", "mixed").await?;
    let jan_second_2021: i64 = 1_609_545_600_000;
    let now = chrono::Utc::now().timestamp_millis();

    server
        .create_item(&session, json!({ "title": "A", "priority": "LOW", "startDate": now, "tags": ["T0"] }))
        .await?;
    server
        .create_item(&session, json!({ "title": "B", "priority": "HIGH", "description": "test_keyword" }))
        .await?;
    server
        .create_item(
            &session,
            json!({ "title": "C", "priority": "LOW", "startDate": jan_second_2021, "duration": 20, "tags": ["T0"] }),
        )
        .await?;

    assert_eq!(titles(&server, None, "search=test_keyword").await?, vec!["B"]);
    assert_eq!(titles(&server, None, "priority=HIGH").await?, vec!["B"]);
    let start_query = format!("startlt={}", jan_second_2021);
    assert_eq!(titles(&server, None, &start_query).await?, vec!["C"]);
    assert_eq!(titles(&server, None, "tags=T0").await?, vec!["A", "C"]);

    let first = titles(&server, None, "tags=T0&sortBy=startDate").await?;
    let second = titles(&server, None, "tags=T0&sortBy=startDate").await?;
    assert_eq!(first, vec!["C", "A"]);
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn negative_paging_is_a_bad_request() -> Result<()> {
    let server = TestServer::spawn().await?;

    for query in ["limit=-1", "offset=-1"] {
        let res = server.client.get(server.url(&format!("/items?{}", query))).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {} should fail", query);
        let body = res.json::<Value>().await?;
        assert!(body["message"].as_str().unwrap_or_default().contains("non-negative"));
    }

    let res = server.client.get(server.url("/items?limit=0&offset=0")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn malformed_filters_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;

    for query in ["startlt=yesterday", "durationgt=long", "sortBy=title", "itemType=widget", "limit=many"] {
        let res = server.client.get(server.url(&format!("/items?{}", query))).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {} should fail", query);
    }
    Ok(())
}
