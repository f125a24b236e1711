mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

fn category<'a>(body: &'a Value, title: &str) -> Option<&'a Value> {
    body["directory"].as_array()?.iter().find(|c| c["title"] == title)
}

fn titles(body: &Value) -> Vec<String> {
    body["directory"]
        .as_array()
        .map(|cs| cs.iter().filter_map(|c| c["title"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn new_profile_has_seeded_directory() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("seed@example.com", "seed").await?;

    let res = server
        .client
        .get(server.url(&format!("/directory/{}", session.profile_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(titles(&body), vec!["Backlog", "Cookbook", "Journal"]);

    let journal = category(&body, "Journal").unwrap();
    assert_eq!(journal["sections"][1]["title"], "Daily");
    assert_eq!(journal["sections"][1]["view"], "calendar");
    Ok(())
}

#[tokio::test]
async fn category_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("dir@example.com", "dir").await?;
    let base = server.url(&format!("/directory/{}", session.profile_id));

    let res = server
        .client
        .post(&base)
        .json(&json!({ "title": "Home", "sections": [{ "title": "Kitchen" }] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    let home = category(&body, "Home").unwrap().clone();
    assert_eq!(home["color"], "#E0E0E0");
    assert_eq!(home["sections"][0]["view"], "list");

    let home_url = format!("{}/{}", base, home["id"].as_str().unwrap());
    let res = server.client.patch(&home_url).json(&json!({ "title": "House" })).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert!(category(&body, "House").is_some());
    assert!(category(&body, "Home").is_none());

    let res = server.client.delete(&home_url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(titles(&res.json::<Value>().await?), vec!["Backlog", "Cookbook", "Journal"]);

    let res = server.client.delete(&home_url).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn category_titles_are_unique_per_profile() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("uniq@example.com", "uniq").await?;
    let base = server.url(&format!("/directory/{}", session.profile_id));

    let res = server.client.post(&base).json(&json!({ "title": "backlog" })).send().await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server.client.post(&base).json(&json!({ "color": "#fff" })).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.client.post(&base).json(&json!({ "title": "Play" })).send().await?;
    let body = res.json::<Value>().await?;
    let play_url = format!("{}/{}", base, category(&body, "Play").unwrap()["id"].as_str().unwrap());

    let res = server.client.patch(&play_url).json(&json!({ "title": "JOURNAL" })).send().await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server.client.patch(&play_url).json(&json!({ "title": "play" })).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.patch(&play_url).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_profile_is_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .get(server.url("/directory/00000000-0000-0000-0000-000000000000"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.get(server.url("/directory/bogus")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
