use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use graphchat_core::{
    ChatSession, ERROR_REPLY, FailureKind, HttpTransport, RequestOutcome, Transport,
    TransportError,
};
use graphchat_protocol::{AnswerResponse, DEFAULT_ENDPOINT_PATH, QuestionRequest};
use graphchat_test_utils::sample_trace;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

struct TestServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    fn endpoint(&self) -> String {
        format!("http://{}{}", self.addr, DEFAULT_ENDPOINT_PATH)
    }
}

async fn start_server(app: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    TestServer { addr, handle }
}

fn transport(server: &TestServer) -> HttpTransport {
    HttpTransport::new(server.endpoint(), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn posts_question_and_decodes_agent_response() {
    let app = Router::new().route(
        DEFAULT_ENDPOINT_PATH,
        post(|Json(request): Json<QuestionRequest>| async move {
            Json(AnswerResponse::with_output(
                format!("echo: {}", request.question),
                sample_trace(),
            ))
        }),
    );
    let server = start_server(app).await;

    let response = transport(&server)
        .send(&QuestionRequest::new("How old is LeBron James?"))
        .await
        .expect("response");
    assert_eq!(response.answer_text(), Some("echo: How old is LeBron James?"));
    assert_eq!(response.intermediate_steps.map(|steps| steps.len()), Some(2));
}

#[tokio::test]
async fn legacy_answer_shape_is_accepted() {
    let app = Router::new().route(
        DEFAULT_ENDPOINT_PATH,
        post(|| async { Json(json!({ "answer": "39" })) }),
    );
    let server = start_server(app).await;

    let session = ChatSession::new(Arc::new(transport(&server)), None);
    let outcome = session.submit("How old is LeBron James?").await.expect("accepted");
    assert!(matches!(outcome, RequestOutcome::Answered(_)));
    let answer = session.store().last().expect("answer");
    assert_eq!(answer.content, "39");
    assert!(!answer.has_trace());
}

#[tokio::test]
async fn server_error_maps_to_status_failure() {
    let app = Router::new().route(
        DEFAULT_ENDPOINT_PATH,
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Chain not initialized" })),
            )
        }),
    );
    let server = start_server(app).await;

    let err = transport(&server)
        .send(&QuestionRequest::new("q"))
        .await
        .expect_err("status error");
    match err {
        TransportError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Chain not initialized");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let session = ChatSession::new(Arc::new(transport(&server)), None);
    let outcome = session.submit("q").await.expect("accepted");
    assert!(matches!(
        outcome,
        RequestOutcome::Failed(_, FailureKind::Server { status: Some(500) })
    ));
    assert_eq!(session.messages()[1].content, ERROR_REPLY);
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let app = Router::new().route(DEFAULT_ENDPOINT_PATH, post(|| async { "not json" }));
    let server = start_server(app).await;

    let err = transport(&server)
        .send(&QuestionRequest::new("q"))
        .await
        .expect_err("decode error");
    assert!(matches!(err, TransportError::Malformed(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let app = Router::new().route(
        DEFAULT_ENDPOINT_PATH,
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(Value::Null)
        }),
    );
    let server = start_server(app).await;

    let transport =
        HttpTransport::new(server.endpoint(), Duration::from_millis(100)).expect("client");
    let err = transport
        .send(&QuestionRequest::new("q"))
        .await
        .expect_err("timeout");
    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let transport = HttpTransport::new(
        format!("http://{addr}{DEFAULT_ENDPOINT_PATH}"),
        Duration::from_secs(2),
    )
    .expect("client");
    let session = ChatSession::new(Arc::new(transport), None);
    let outcome = session.submit("q").await.expect("accepted");
    assert!(matches!(outcome, RequestOutcome::Failed(_, FailureKind::Network)));
}
