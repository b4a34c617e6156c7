use gateway_sync::config::{Config, Overrides};
use gateway_sync::engine::SourceState;
use gateway_sync::init::{init_client, init_reconciler};
use gateway_sync::versions::VersionStore;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(api: &MockServer, lists: &MockServer, dir: &TempDir) -> Config {
    let toml = format!(
        r#"
        [api]
        base_url = "{api}"

        [updates]
        version_cache_path = "{cache}"
        request_timeout_secs = 5

        [retry]
        api_delay_ms = 0

        [[sources]]
        name = "Test"
        url = "{lists}/test.txt"
        "#,
        api = api.uri(),
        lists = lists.uri(),
        cache = dir.path().join("versions.json").display(),
    );
    let mut config = Config::from_toml(&toml).unwrap();
    config.apply_overrides(Overrides {
        api_token: Some("token".into()),
        account_id: Some("acct".into()),
        ..Default::default()
    });
    config.validate().unwrap();
    config
}

fn empty_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "result": [],
        "result_info": { "total_count": 0, "per_page": 100 }
    }))
}

#[tokio::test]
async fn test_first_run_against_http_services() {
    let api = MockServer::start().await;
    let lists = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&api, &lists, &dir);

    Mock::given(method("GET"))
        .and(path("/test.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("# Version: 9\nads.example.com\n"),
        )
        .mount(&lists)
        .await;

    let base = "/accounts/acct/gateway";
    Mock::given(method("GET"))
        .and(path(format!("{base}/rules")))
        .respond_with(empty_page())
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/lists")))
        .respond_with(empty_page())
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{base}/lists")))
        .and(body_partial_json(json!({ "name": "Test_List_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "id": "abc" }
        })))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{base}/rules")))
        .and(body_partial_json(json!({
            "name": "Block Test",
            "traffic": "any(dns.domains[*] in $abc)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "id": "rule-1" }
        })))
        .expect(1)
        .mount(&api)
        .await;

    let client = init_client(&config).unwrap();
    let reconciler = init_reconciler(&config, client, false).unwrap();
    let mut versions = VersionStore::load(&config.updates.version_cache_path).await;
    assert!(versions.is_empty());

    let summary = reconciler.run(&config.sources, &mut versions).await.unwrap();

    assert_eq!(summary.outcomes[0].state, SourceState::Succeeded);
    assert_eq!(summary.exit_code(), 0);

    let reloaded = VersionStore::load(&config.updates.version_cache_path).await;
    assert_eq!(reloaded.get("Test").map(|v| v.as_str()), Some("9"));
}
