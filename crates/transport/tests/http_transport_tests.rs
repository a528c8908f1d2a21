//! The HTTP transport and the agent on top of it, against a mock engine.

use std::time::Duration;

use client::{
    Agent, ClientError, Connector, Endpoint, Expid, LaunchItem, Method, Request, RetryPolicy,
    Transport, TransportError, Wfid, WorkitemQuery,
};
use serde_json::{json, Value};
use transport::{HttpAgent, HttpConfig, HttpConnector};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connect(server: &MockServer) -> transport::HttpTransport {
    let endpoint = Endpoint::parse(&format!("{}/_ruote", server.uri())).unwrap();
    HttpConnector::default().connect(&endpoint).unwrap()
}

fn agent(server: &MockServer) -> HttpAgent {
    Agent::new(&format!("{}/_ruote/", server.uri()), HttpConnector::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_sends_accept_json_and_parses_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_ruote/processes"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "processes": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let response = connect(&server)
        .send(Request::new(Method::Get, "/_ruote/processes"))
        .await
        .unwrap();

    assert_eq!(response, json!({ "processes": [] }));
}

#[tokio::test]
async fn put_sends_json_body_with_content_type() {
    let server = MockServer::start().await;
    let body = json!({ "fields": { "x": 1 }, "_proceed": "1" });
    Mock::given(method("PUT"))
        .and(path("/_ruote/workitems/w/0_1"))
        .and(header("content-type", "application/json"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workitem": {} })))
        .expect(1)
        .mount(&server)
        .await;

    connect(&server)
        .send(Request::new(Method::Put, "/_ruote/workitems/w/0_1").with_body(body))
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/_ruote/processes/w1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = connect(&server)
        .send(Request::new(Method::Delete, "/_ruote/processes/w1"))
        .await
        .unwrap();

    assert_eq!(response, Value::Null);
}

#[tokio::test]
async fn server_error_carries_status_body_and_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("Retry-After", "3")
                .set_body_string("engine busy"),
        )
        .mount(&server)
        .await;

    let err = connect(&server)
        .send(Request::new(Method::Get, "/_ruote/processes"))
        .await
        .unwrap_err();

    match &err {
        TransportError::Status {
            status,
            body,
            retry_after,
            ..
        } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "engine busy");
            assert_eq!(*retry_after, Some(Duration::from_secs(3)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.retry_policy(),
        RetryPolicy::Retryable {
            after: Some(Duration::from_secs(3))
        }
    );
}

#[tokio::test]
async fn not_found_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = connect(&server)
        .send(Request::new(Method::Get, "/_ruote/processes/missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 404, .. }));
    assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ruote-kit</html>"))
        .mount(&server)
        .await;

    let err = connect(&server)
        .send(Request::new(Method::Get, "/_ruote/processes"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_engine_is_a_connect_error() {
    // Bind and release a port so nothing is listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let agent = Agent::new(
        &format!("http://127.0.0.1:{port}/_ruote"),
        HttpConnector::new(HttpConfig::default().with_connect_timeout(Duration::from_secs(2))),
    )
    .unwrap();

    let err = agent.processes().await.unwrap_err();

    assert!(
        matches!(err, ClientError::Transport(TransportError::Connect { .. })),
        "{err:?}"
    );
    assert!(err.retry_policy().is_retryable());
}

#[tokio::test]
async fn slow_engine_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "processes": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let agent = Agent::new(
        &format!("{}/_ruote", server.uri()),
        HttpConnector::new(HttpConfig::default().with_timeout(Duration::from_millis(200))),
    )
    .unwrap();

    let err = agent.processes().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Timeout { .. })));
}

// ---------------------------------------------------------------------------
// Agent over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn launch_and_fetch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_ruote/processes"))
        .and(body_json(json!({
            "definition": "http://defs.example/review.rb",
            "fields": { "customer": "acme" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "launched": "20100101-bakuyoka" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_ruote/processes/20100101-bakuyoka"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "process": { "wfid": "20100101-bakuyoka", "definition_name": "review" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent(&server);
    let process = agent
        .launch_process(
            LaunchItem::new()
                .with_definition_uri("http://defs.example/review.rb")
                .with_field("customer", "acme"),
        )
        .await
        .unwrap();

    assert_eq!(process.wfid().as_str(), "20100101-bakuyoka");
    assert_eq!(process.definition_name(), Some("review"));
    assert!(agent.owns(&process));
}

#[tokio::test]
async fn workitem_filters_reach_the_server_escaped_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_ruote/workitems/w1"))
        .and(query_param("participant", "alice,bob"))
        .and(query_param("priority", r#"{"value":5}"#))
        .and(query_param("team", "ops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workitems": [{
                "fei": { "wfid": "w1", "expid": "0_0_1" },
                "participant_name": "alice",
                "fields": { "priority": 5, "team": "ops" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let workitems = agent(&server)
        .workitems(
            &WorkitemQuery::new()
                .wfid(Wfid::new("w1").unwrap())
                .participants(["alice", "bob"])
                .field("priority", 5)
                .field("team", "ops"),
        )
        .await
        .unwrap();

    assert_eq!(workitems.len(), 1);
    assert_eq!(workitems[0].field("priority"), Some(&json!(5)));

    let received = server.received_requests().await.unwrap();
    let raw_query = received[0].url.query().unwrap_or_default().to_string();
    assert!(raw_query.contains("priority=%7B%22value%22%3A5%7D"), "{raw_query}");
    assert!(!raw_query.contains("%25"), "{raw_query}");
}

#[tokio::test]
async fn update_round_trip_over_http() {
    let server = MockServer::start().await;
    let stored = json!({ "x": 1, "y": "a" });
    Mock::given(method("GET"))
        .and(path("/_ruote/workitems/w1/0_0_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workitem": { "fei": { "wfid": "w1", "expid": "0_0_1" }, "fields": stored }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/_ruote/workitems/w1/0_0_1"))
        .and(body_json(json!({ "fields": stored })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workitem": { "fei": { "wfid": "w1", "expid": "0_0_1" }, "fields": stored }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent(&server);
    let wfid = Wfid::new("w1").unwrap();
    let expid = Expid::new("0_0_1").unwrap();

    let mut workitem = agent.find_workitem(&wfid, &expid).await.unwrap();
    workitem.fields_mut().clear();
    workitem.set_field("x", 1);
    workitem.set_field("y", "a");
    assert!(agent.update_workitem_ok(&workitem).await);

    let refetched = agent.find_workitem(&wfid, &expid).await.unwrap();
    assert_eq!(refetched.fields(), workitem.fields());
}

#[tokio::test]
async fn lenient_update_reports_http_failure_as_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workitem": { "fei": { "wfid": "w1", "expid": "0" }, "fields": {} }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409).set_body_string("stale"))
        .mount(&server)
        .await;

    let agent = agent(&server);
    let workitem = agent
        .find_workitem(&Wfid::new("w1").unwrap(), &Expid::new("0").unwrap())
        .await
        .unwrap();

    assert!(!agent.update_workitem_ok(&workitem).await);
    assert!(matches!(
        agent.update_workitem(&workitem).await,
        Err(ClientError::Transport(TransportError::Status { status: 409, .. }))
    ));
}

#[tokio::test]
async fn kill_flags_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_ruote/expressions/w1/0_0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expression": { "fei": { "wfid": "w1", "expid": "0_0" }, "name": "participant" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/_ruote/expressions/w1/0_0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/_ruote/processes/w1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("anything at all"))
        .mount(&server)
        .await;

    let agent = agent(&server);
    let expression = agent
        .find_expression(&Wfid::new("w1").unwrap(), &Expid::new("0_0").unwrap())
        .await
        .unwrap();
    expression.kill(&agent).await.unwrap();
    expression.cancel(&agent).await.unwrap();

    // A non-JSON body is still a transport-level decode failure, even though
    // the process delete itself is never validated.
    let err = agent.kill_process(&Wfid::new("w1").unwrap()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Decode { .. })));

    let deletes: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .map(|r| (r.url.path().to_string(), r.url.query().map(str::to_string)))
        .collect();
    assert_eq!(
        deletes,
        vec![
            ("/_ruote/expressions/w1/0_0".to_string(), Some("_kill=1".to_string())),
            ("/_ruote/expressions/w1/0_0".to_string(), None),
            ("/_ruote/processes/w1".to_string(), Some("_kill=1".to_string())),
        ]
    );
}
