//! Pact contract tests for the HTTP platform stores
//!
//! Each test starts a Pact mock server describing one platform API (Vercel,
//! Convex, Fly.io, Railway, Netlify or Render) and points a store, or the whole
//! registry, at it.

mod common;

use common::init_rustls;
use envsync::auth::CredentialResolver;
use envsync::model::{
    ConvexConfig, FlyioConfig, LocalEnvironment, NetlifyConfig, PlatformConfig, RailwayConfig,
    RenderConfig, VercelConfig,
};
use envsync::provider::convex::ConvexStore;
use envsync::provider::flyio::FlyioStore;
use envsync::provider::netlify::NetlifyStore;
use envsync::provider::railway::RailwayStore;
use envsync::provider::render::RenderStore;
use envsync::provider::vercel::VercelStore;
use envsync::provider::{Platform, PlatformRegistry, RemoteValue, SecretStore};
use envsync::sync::{ApplyOptions, SyncEngine};
use envsync::Target;
use pact_consumer::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

const CONSUMER: &str = "envsync";

/// Mock server URL without the trailing slash
fn base_url(server: &dyn ValidatingMockServer) -> String {
    let mut url = server.url().to_string();
    if url.ends_with('/') {
        url.pop();
    }
    url
}

fn values(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn vercel_config(team_id: Option<&str>) -> VercelConfig {
    VercelConfig {
        project: "prj".to_string(),
        team_id: team_id.map(str::to_string),
        token: None,
    }
}

/// Register the project env list interaction
fn vercel_list(builder: &mut PactBuilder, envs: serde_json::Value) {
    builder.interaction("list project environment variables", "", |mut i| {
        i.given("the project has environment variables");
        i.request
            .method("GET")
            .path("/v9/projects/prj/env")
            .header("authorization", "Bearer tok");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "envs": envs }));
        i
    });
}

#[tokio::test]
async fn test_vercel_list_filters_by_environment() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    builder.interaction("list team project environment variables", "", |mut i| {
        i.request
            .method("GET")
            .path("/v9/projects/prj/env")
            .query_param("teamId", "team_1")
            .header("authorization", "Bearer tok");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "envs": [
                    { "id": "1", "key": "A", "value": "a", "target": ["production", "preview"] },
                    { "id": "2", "key": "SENSITIVE", "target": ["production"] },
                    { "id": "3", "key": "D", "value": "d", "target": ["development"] }
                ]
            }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(
        reqwest::Client::new(),
        "tok".to_string(),
        &vercel_config(Some("team_1")),
    )
    .with_base_url(base_url(server.as_ref()));
    let secrets = store.list("production").await.unwrap();

    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets["A"], RemoteValue::Value("a".to_string()));
    assert_eq!(secrets["SENSITIVE"], RemoteValue::Redacted);
}

#[tokio::test]
async fn test_vercel_set_updates_single_environment_var_in_place() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    vercel_list(
        &mut builder,
        json!([{ "id": "1", "key": "A", "value": "old", "target": ["production"] }]),
    );
    builder.interaction("update a variable in place", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .header("authorization", "Bearer tok")
            .json_body(json!({ "value": "new", "target": ["production"], "type": "encrypted" }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(reqwest::Client::new(), "tok".to_string(), &vercel_config(None))
        .with_base_url(base_url(server.as_ref()));
    store
        .writer()
        .unwrap()
        .set("A", "new", "production")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vercel_set_splits_shared_var() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    vercel_list(
        &mut builder,
        json!([{ "id": "1", "key": "A", "value": "old", "target": ["production", "preview"] }]),
    );
    builder.interaction("detach production from a shared variable", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .json_body(json!({ "target": ["preview"] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    builder.interaction("create a production-only variable", "", |mut i| {
        i.request
            .method("POST")
            .path("/v10/projects/prj/env")
            .json_body(json!({
                "key": "A",
                "value": "new",
                "target": ["production"],
                "type": "encrypted"
            }));
        i.response.status(201).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(reqwest::Client::new(), "tok".to_string(), &vercel_config(None))
        .with_base_url(base_url(server.as_ref()));
    store
        .writer()
        .unwrap()
        .set("A", "new", "production")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vercel_failed_split_restores_shared_var() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    vercel_list(
        &mut builder,
        json!([{ "id": "1", "key": "A", "value": "old", "target": ["production", "preview"] }]),
    );
    builder.interaction("detach production before the split", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .json_body(json!({ "target": ["preview"] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    builder.interaction("create a production-only variable that fails", "", |mut i| {
        i.request.method("POST").path("/v10/projects/prj/env");
        i.response
            .status(500)
            .header("content-type", "application/json")
            .json_body(json!({ "error": { "code": "internal", "message": "try again" } }));
        i
    });
    builder.interaction("give production back to the shared variable", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .json_body(json!({ "target": ["production", "preview"] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(reqwest::Client::new(), "tok".to_string(), &vercel_config(None))
        .with_base_url(base_url(server.as_ref()));
    let err = store
        .writer()
        .unwrap()
        .set("A", "new", "production")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "vercel API error: try again (internal)");
}

#[tokio::test]
async fn test_vercel_delete_shared_var_only_detaches() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    vercel_list(
        &mut builder,
        json!([{ "id": "1", "key": "A", "value": "v", "target": ["production", "preview"] }]),
    );
    builder.interaction("detach production on delete", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .json_body(json!({ "target": ["preview"] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(reqwest::Client::new(), "tok".to_string(), &vercel_config(None))
        .with_base_url(base_url(server.as_ref()));
    store
        .writer()
        .unwrap()
        .delete("A", "production")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vercel_api_error_is_reported() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    builder.interaction("list with a revoked token", "", |mut i| {
        i.request.method("GET").path("/v9/projects/prj/env");
        i.response
            .status(403)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": { "code": "forbidden", "message": "Not authorized" }
            }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = VercelStore::new(reqwest::Client::new(), "tok".to_string(), &vercel_config(None))
        .with_base_url(base_url(server.as_ref()));
    let err = store.list("production").await.unwrap_err();
    assert_eq!(err.to_string(), "vercel API error: Not authorized (forbidden)");
}

#[tokio::test]
async fn test_vercel_sync_through_registry() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Vercel");
    vercel_list(
        &mut builder,
        json!([{ "id": "1", "key": "A", "value": "old", "target": ["production", "preview"] }]),
    );
    builder.interaction("detach production from A", "", |mut i| {
        i.request
            .method("PATCH")
            .path("/v9/projects/prj/env/1")
            .json_body(json!({ "target": ["preview"] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    builder.interaction("create production A", "", |mut i| {
        i.request.method("POST").path("/v10/projects/prj/env").json_body(json!({
            "key": "A",
            "value": "new",
            "target": ["production"],
            "type": "encrypted"
        }));
        i.response.status(201).json_body(json!({}));
        i
    });
    builder.interaction("create production B", "", |mut i| {
        i.request.method("POST").path("/v10/projects/prj/env").json_body(json!({
            "key": "B",
            "value": "b",
            "target": ["production"],
            "type": "encrypted"
        }));
        i.response.status(201).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let resolver =
        CredentialResolver::with_lookup(|key| (key == "VERCEL_TOKEN").then(|| "tok".to_string()));
    let registry = PlatformRegistry::new(resolver, Duration::from_secs(5))
        .with_base_url(Platform::Vercel, base_url(server.as_ref()));
    let engine = SyncEngine::new(registry);

    let target = Target::new(
        "web",
        PlatformConfig::Vercel(vercel_config(None)),
        Platform::Vercel.default_mapping(),
    );
    assert_eq!(
        target.mapping.map_to_remote(LocalEnvironment::Live),
        vec!["production"]
    );

    let result = engine
        .apply(
            &["A".to_string(), "B".to_string()],
            &values(&[("A", "new"), ("B", "b")]),
            &target,
            "production",
            &ApplyOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.counts.changed, 1);
    assert_eq!(result.counts.added, 1);
    assert!(!result.has_failures());
}

fn convex_store(server: &dyn ValidatingMockServer) -> ConvexStore {
    let config = ConvexConfig {
        deployment: "happy-otter-123".to_string(),
        deploy_key: None,
    };
    ConvexStore::new(reqwest::Client::new(), "prod:key".to_string(), &config)
        .with_base_url(base_url(server))
}

#[tokio::test]
async fn test_convex_list_and_set() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Convex");
    builder.interaction("query deployment environment variables", "", |mut i| {
        i.given("the deployment has environment variables");
        i.request
            .method("POST")
            .path("/api/query")
            .header("authorization", "Convex prod:key")
            .json_body(json!({
                "path": "_system/cli/queryEnvironmentVariables",
                "args": {},
                "format": "json"
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "status": "success",
                "value": [{ "name": "A", "value": "1" }, { "name": "EMPTY", "value": "" }]
            }));
        i
    });
    builder.interaction("set one environment variable", "", |mut i| {
        i.request
            .method("POST")
            .path("/api/update_environment_variables")
            .header("authorization", "Convex prod:key")
            .json_body(json!({ "changes": [{ "name": "B", "value": "2" }] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = convex_store(server.as_ref());
    let secrets = store.list("default").await.unwrap();
    assert_eq!(secrets["A"], RemoteValue::Value("1".to_string()));
    assert_eq!(secrets["EMPTY"], RemoteValue::Value(String::new()));

    store.writer().unwrap().set("B", "2", "default").await.unwrap();
}

#[tokio::test]
async fn test_convex_delete_omits_value() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Convex");
    builder.interaction("unset one environment variable", "", |mut i| {
        i.request
            .method("POST")
            .path("/api/update_environment_variables")
            .json_body(json!({ "changes": [{ "name": "B" }] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    convex_store(server.as_ref())
        .writer()
        .unwrap()
        .delete("B", "default")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_convex_failed_query_status_is_error() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Convex");
    builder.interaction("query that fails inside the deployment", "", |mut i| {
        i.request.method("POST").path("/api/query");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "error", "value": [] }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let err = convex_store(server.as_ref())
        .list("default")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("status error"));
}

fn fly_config(token: Option<&str>) -> FlyioConfig {
    FlyioConfig {
        app_name: "my-app".to_string(),
        token: token.map(str::to_string),
        api_key: None,
    }
}

#[tokio::test]
async fn test_flyio_write_only_sync() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Flyio");
    builder.interaction("list app secret names", "", |mut i| {
        i.given("the app has a secret named KEY");
        i.request
            .method("GET")
            .path("/apps/my-app/secrets")
            .header("authorization", "Bearer fly-tok");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "secrets": [{ "name": "KEY" }] }));
        i
    });
    builder.interaction("set KEY", "", |mut i| {
        i.request
            .method("POST")
            .path("/apps/my-app/secrets")
            .json_body(json!({ "values": { "KEY": "x" } }));
        i.response.status(200).json_body(json!({}));
        i
    });
    builder.interaction("set NEW", "", |mut i| {
        i.request
            .method("POST")
            .path("/apps/my-app/secrets")
            .json_body(json!({ "values": { "NEW": "y" } }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    let config = fly_config(Some("fly-tok"));
    let mut store = FlyioStore::new(reqwest::Client::new(), "fly-tok".to_string(), &config)
        .with_base_url(base_url(server.as_ref()));
    let secrets = store.list("default").await.unwrap();
    assert_eq!(secrets["KEY"], RemoteValue::Redacted);

    // Token comes from the inline config value
    let registry = PlatformRegistry::new(
        CredentialResolver::with_lookup(|_| None),
        Duration::from_secs(5),
    )
    .with_base_url(Platform::Flyio, base_url(server.as_ref()));
    let target = Target::new(
        "fly",
        PlatformConfig::Flyio(config),
        Platform::Flyio.default_mapping(),
    );

    let result = SyncEngine::new(registry)
        .apply(
            &["KEY".to_string(), "NEW".to_string()],
            &values(&[("KEY", "x"), ("NEW", "y")]),
            &target,
            "default",
            &ApplyOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.counts.unknown, 1);
    assert_eq!(result.counts.added, 1);
}

#[tokio::test]
async fn test_flyio_set_and_delete() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Flyio");
    builder.interaction("set a secret", "", |mut i| {
        i.request
            .method("POST")
            .path("/apps/my-app/secrets")
            .header("authorization", "Bearer t")
            .json_body(json!({ "values": { "KEY": "x" } }));
        i.response.status(201).json_body(json!({}));
        i
    });
    builder.interaction("delete a secret", "", |mut i| {
        i.request.method("DELETE").path("/apps/my-app/secrets/KEY");
        i.response.status(204);
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = FlyioStore::new(reqwest::Client::new(), "t".to_string(), &fly_config(None))
        .with_base_url(base_url(server.as_ref()));
    let writer = store.writer().unwrap();
    writer.set("KEY", "x", "default").await.unwrap();
    writer.delete("KEY", "default").await.unwrap();
}

fn railway_config(service_id: Option<&str>) -> RailwayConfig {
    RailwayConfig {
        project_id: "prj".to_string(),
        service_id: service_id.map(str::to_string),
        token: None,
    }
}

/// Register the project environments query
fn railway_environments(builder: &mut PactBuilder) {
    builder.interaction("query project environments", "", |mut i| {
        i.given("the project has production and staging environments");
        i.request
            .method("POST")
            .path("/graphql/v2")
            .header("authorization", "Bearer rw-tok")
            .json_body(json_pattern!({
                "query": like!("query project"),
                "variables": { "id": "prj" }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": { "project": { "environments": { "edges": [
                    { "node": { "id": "env-prod", "name": "production" } },
                    { "node": { "id": "env-stg", "name": "staging" } }
                ] } } }
            }));
        i
    });
}

#[tokio::test]
async fn test_railway_list_and_upsert_in_service_scope() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Railway");
    railway_environments(&mut builder);
    builder.interaction("query staging variables of one service", "", |mut i| {
        i.request
            .method("POST")
            .path("/graphql/v2")
            .json_body(json_pattern!({
                "query": like!("query variables"),
                "variables": {
                    "projectId": "prj",
                    "environmentId": "env-stg",
                    "serviceId": "svc"
                }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "data": { "variables": { "A": "1", "EMPTY": "" } } }));
        i
    });
    builder.interaction("upsert a staging variable", "", |mut i| {
        i.request
            .method("POST")
            .path("/graphql/v2")
            .json_body(json_pattern!({
                "query": like!("mutation variableUpsert"),
                "variables": { "input": {
                    "projectId": "prj",
                    "environmentId": "env-stg",
                    "serviceId": "svc",
                    "name": "B",
                    "value": "2"
                } }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "data": { "variableUpsert": true } }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = RailwayStore::new(
        reqwest::Client::new(),
        "rw-tok".to_string(),
        &railway_config(Some("svc")),
    )
    .with_base_url(format!("{}/graphql/v2", base_url(server.as_ref())));
    let secrets = store.list("staging").await.unwrap();
    assert_eq!(secrets["A"], RemoteValue::Value("1".to_string()));
    assert_eq!(secrets["EMPTY"], RemoteValue::Value(String::new()));

    store.writer().unwrap().set("B", "2", "staging").await.unwrap();
}

#[tokio::test]
async fn test_railway_unknown_environment_is_error() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Railway");
    railway_environments(&mut builder);
    let server = builder.start_mock_server(None, None);

    let mut store = RailwayStore::new(reqwest::Client::new(), "rw-tok".to_string(), &railway_config(None))
        .with_base_url(format!("{}/graphql/v2", base_url(server.as_ref())));
    let err = store.list("preview").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "railway: environment \"preview\" not found in project"
    );
}

#[tokio::test]
async fn test_railway_graphql_error_is_reported() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Railway");
    builder.interaction("query environments with a revoked token", "", |mut i| {
        i.request.method("POST").path("/graphql/v2");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "data": null, "errors": [{ "message": "Not Authorized" }] }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = RailwayStore::new(reqwest::Client::new(), "rw-tok".to_string(), &railway_config(None))
        .with_base_url(format!("{}/graphql/v2", base_url(server.as_ref())));
    let err = store.validate().await.unwrap_err();
    assert_eq!(err.to_string(), "railway API error: Not Authorized");
}

fn netlify_store(server: &dyn ValidatingMockServer) -> NetlifyStore {
    let config = NetlifyConfig {
        account_id: "acct".to_string(),
        site_id: Some("site_1".to_string()),
        token: None,
    };
    NetlifyStore::new(reqwest::Client::new(), "nf-tok".to_string(), &config)
        .with_base_url(format!("{}/api/v1", base_url(server)))
}

#[tokio::test]
async fn test_netlify_list_uses_context_values() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Netlify");
    builder.interaction("list site variables for production", "", |mut i| {
        i.given("the site has variables in several contexts");
        i.request
            .method("GET")
            .path("/api/v1/accounts/acct/env")
            .query_param("site_id", "site_1")
            .query_param("context_name", "production")
            .header("authorization", "Bearer nf-tok");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "key": "A", "scopes": ["builds"], "values": [
                    { "id": "v1", "value": "prod", "context": "production" },
                    { "id": "v2", "value": "local", "context": "dev" }
                ] },
                { "key": "SHARED", "scopes": ["builds"], "values": [
                    { "id": "v3", "value": "s", "context": "all" }
                ] },
                { "key": "PREVIEW_ONLY", "scopes": ["builds"], "values": [
                    { "id": "v4", "value": "p", "context": "deploy-preview" }
                ] }
            ]));
        i
    });
    let server = builder.start_mock_server(None, None);

    let secrets = netlify_store(server.as_ref()).list("production").await.unwrap();
    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets["A"], RemoteValue::Value("prod".to_string()));
    assert_eq!(secrets["SHARED"], RemoteValue::Value("s".to_string()));
}

#[tokio::test]
async fn test_netlify_set_replaces_only_one_context() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Netlify");
    builder.interaction("read variable A", "", |mut i| {
        i.request
            .method("GET")
            .path("/api/v1/accounts/acct/env/A")
            .query_param("site_id", "site_1");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "key": "A", "scopes": ["builds"], "values": [
                { "id": "v1", "value": "old", "context": "production" },
                { "id": "v2", "value": "local", "context": "dev" }
            ] }));
        i
    });
    builder.interaction("replace the production value of A", "", |mut i| {
        i.request
            .method("PUT")
            .path("/api/v1/accounts/acct/env/A")
            .query_param("site_id", "site_1")
            .json_body(json!({ "key": "A", "scopes": ["builds"], "values": [
                { "id": "v2", "value": "local", "context": "dev" },
                { "value": "new", "context": "production" }
            ] }));
        i.response.status(200).json_body(json!({}));
        i
    });
    let server = builder.start_mock_server(None, None);

    netlify_store(server.as_ref())
        .writer()
        .unwrap()
        .set("A", "new", "production")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_netlify_set_creates_missing_variable() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Netlify");
    builder.interaction("read a variable that does not exist", "", |mut i| {
        i.request
            .method("GET")
            .path("/api/v1/accounts/acct/env/B")
            .query_param("site_id", "site_1");
        i.response.status(404).json_body(json!({ "message": "Not Found" }));
        i
    });
    builder.interaction("create B for production", "", |mut i| {
        i.request
            .method("POST")
            .path("/api/v1/accounts/acct/env")
            .query_param("site_id", "site_1")
            .json_body(json!([{
                "key": "B",
                "scopes": ["builds", "functions", "runtime", "post_processing"],
                "values": [{ "value": "b", "context": "production" }]
            }]));
        i.response.status(201).json_body(json!([]));
        i
    });
    let server = builder.start_mock_server(None, None);

    netlify_store(server.as_ref())
        .writer()
        .unwrap()
        .set("B", "b", "production")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_netlify_delete_last_context_removes_variable() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Netlify");
    builder.interaction("read variable A with one context", "", |mut i| {
        i.request
            .method("GET")
            .path("/api/v1/accounts/acct/env/A")
            .query_param("site_id", "site_1");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "key": "A", "scopes": [], "values": [
                { "id": "v1", "value": "old", "context": "production" }
            ] }));
        i
    });
    builder.interaction("delete variable A", "", |mut i| {
        i.request
            .method("DELETE")
            .path("/api/v1/accounts/acct/env/A")
            .query_param("site_id", "site_1");
        i.response.status(204);
        i
    });
    let server = builder.start_mock_server(None, None);

    netlify_store(server.as_ref())
        .writer()
        .unwrap()
        .delete("A", "production")
        .await
        .unwrap();
}

fn render_config() -> RenderConfig {
    RenderConfig {
        service_id: "srv-1".to_string(),
        token: None,
    }
}

#[tokio::test]
async fn test_render_sync_through_registry() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Render");
    builder.interaction("list service env vars", "", |mut i| {
        i.given("the service has env var A");
        i.request
            .method("GET")
            .path("/services/srv-1/env-vars")
            .query_param("limit", "100")
            .header("authorization", "Bearer rnd-key");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([{ "envVar": { "key": "A", "value": "old" }, "cursor": "c1" }]));
        i
    });
    builder.interaction("set A", "", |mut i| {
        i.request
            .method("PUT")
            .path("/services/srv-1/env-vars/A")
            .header("authorization", "Bearer rnd-key")
            .json_body(json!({ "value": "new" }));
        i.response.status(200).json_body(json!({ "key": "A", "value": "new" }));
        i
    });
    builder.interaction("set B", "", |mut i| {
        i.request
            .method("PUT")
            .path("/services/srv-1/env-vars/B")
            .json_body(json!({ "value": "b" }));
        i.response.status(201).json_body(json!({ "key": "B", "value": "b" }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let resolver = CredentialResolver::with_lookup(|key| {
        (key == "RENDER_API_KEY").then(|| "rnd-key".to_string())
    });
    let registry = PlatformRegistry::new(resolver, Duration::from_secs(5))
        .with_base_url(Platform::Render, base_url(server.as_ref()));
    let target = Target::new(
        "api",
        PlatformConfig::Render(render_config()),
        Platform::Render.default_mapping(),
    );

    let result = SyncEngine::new(registry)
        .apply(
            &["A".to_string(), "B".to_string()],
            &values(&[("A", "new"), ("B", "b")]),
            &target,
            "default",
            &ApplyOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.counts.changed, 1);
    assert_eq!(result.counts.added, 1);
    assert!(!result.has_failures());
}

#[tokio::test]
async fn test_render_delete_missing_var_is_ok() {
    init_rustls();
    let mut builder = PactBuilder::new(CONSUMER, "Render");
    builder.interaction("delete an env var that does not exist", "", |mut i| {
        i.request.method("DELETE").path("/services/srv-1/env-vars/GONE");
        i.response.status(404).json_body(json!({ "message": "not found" }));
        i
    });
    let server = builder.start_mock_server(None, None);

    let mut store = RenderStore::new(reqwest::Client::new(), "rnd-key".to_string(), &render_config())
        .with_base_url(base_url(server.as_ref()));
    store.writer().unwrap().delete("GONE", "default").await.unwrap();
}
