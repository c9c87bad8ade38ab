use crate::engine::api::EngineClient;
use crate::engine::executor::RequestExecutor;
use crate::engine::session::{Credentials, EngineSession, SessionLifecycle};
use crate::engine::transport::{
    EngineRequest, EngineResponse, EngineTransport, LoginOutcome, TransportError,
};
use crate::engine::types::{EngineError, FailureKind, TaskFilter};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One request as observed by the scripted transport.
#[derive(Debug, Clone)]
struct SentRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    session_token: Option<String>,
}

/// Transport double that replays scripted responses and records traffic.
///
/// Unscripted logins succeed with rotating tokens (`sid-1`, `sid-2`, ...)
/// so tests can observe which login produced the tokens a request carried.
#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<EngineResponse, TransportError>>>,
    login_results: Mutex<VecDeque<Result<LoginOutcome, TransportError>>>,
    login_count: AtomicUsize,
    logout_count: AtomicUsize,
    logout_result: Mutex<Option<Result<u16, TransportError>>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    fn respond(self, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(EngineResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    fn fail_next(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(message)));
        self
    }

    fn script_login(self, result: Result<LoginOutcome, TransportError>) -> Self {
        self.login_results.lock().unwrap().push_back(result);
        self
    }

    fn failing_logout(self, message: &str) -> Self {
        *self.logout_result.lock().unwrap() = Some(Err(TransportError::new(message)));
        self
    }

    fn logins(&self) -> usize {
        self.login_count.load(Ordering::SeqCst)
    }

    fn logouts(&self) -> usize {
        self.logout_count.load(Ordering::SeqCst)
    }

    fn recorded(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginOutcome, TransportError> {
        let attempt = self.login_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(scripted) = self.login_results.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(LoginOutcome {
            status: 200,
            session_token: Some(format!("sid-{attempt}")),
            api_token: Some(format!("tok-{attempt}")),
        })
    }

    async fn logout(&self, _session: &EngineSession) -> Result<u16, TransportError> {
        self.logout_count.fetch_add(1, Ordering::SeqCst);
        self.logout_result.lock().unwrap().take().unwrap_or(Ok(200))
    }

    async fn send(
        &self,
        request: EngineRequest<'_>,
        session: &EngineSession,
    ) -> Result<EngineResponse, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            method: request.method.clone(),
            path: request.path.to_string(),
            query: request.query.to_vec(),
            body: request.body.cloned(),
            session_token: session.session_token().map(str::to_string),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left for request")
    }
}

fn credentials() -> Credentials {
    Credentials::new("walter.bates", "bpm")
}

#[tokio::test]
async fn establish_yields_an_active_session() {
    let transport = Arc::new(ScriptedTransport::default());
    let lifecycle = SessionLifecycle::new(transport.clone());

    let session = lifecycle.establish(credentials()).await.unwrap();

    assert!(session.is_active());
    assert_eq!(session.principal(), "walter.bates");
    assert_eq!(session.session_token(), Some("sid-1"));
    assert_eq!(session.api_token(), Some("tok-1"));
    assert!(session.established_at().is_some());
    assert_eq!(transport.logins(), 1);
}

#[tokio::test]
async fn rejected_login_is_an_authentication_error() {
    let transport = Arc::new(ScriptedTransport::default().script_login(Ok(LoginOutcome {
        status: 401,
        session_token: None,
        api_token: None,
    })));
    let lifecycle = SessionLifecycle::new(transport);

    let err = lifecycle.establish(credentials()).await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(err.to_string().contains("HTTP 401"));
}

#[tokio::test]
async fn unreachable_login_endpoint_is_an_authentication_error() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .script_login(Err(TransportError::new("connection refused"))),
    );
    let lifecycle = SessionLifecycle::new(transport);

    let err = lifecycle.establish(credentials()).await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(err.to_string().contains("unreachable"));
}

#[tokio::test]
async fn login_without_session_cookie_fails() {
    let transport = Arc::new(ScriptedTransport::default().script_login(Ok(LoginOutcome {
        status: 200,
        session_token: None,
        api_token: Some("tok".to_string()),
    })));
    let lifecycle = SessionLifecycle::new(transport);

    let err = lifecycle.establish(credentials()).await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
}

#[tokio::test]
async fn missing_anti_forgery_token_is_tolerated() {
    let transport = Arc::new(ScriptedTransport::default().script_login(Ok(LoginOutcome {
        status: 200,
        session_token: Some("sid-1".to_string()),
        api_token: None,
    })));
    let lifecycle = SessionLifecycle::new(transport);

    let session = lifecycle.establish(credentials()).await.unwrap();
    assert!(session.is_active());
    assert_eq!(session.api_token(), None);
}

#[tokio::test]
async fn terminate_clears_state_even_when_logout_fails() {
    let transport = Arc::new(ScriptedTransport::default().failing_logout("broken pipe"));
    let lifecycle = SessionLifecycle::new(transport.clone());

    let mut session = lifecycle.establish(credentials()).await.unwrap();
    lifecycle.terminate(&mut session).await;

    assert!(!session.is_active());
    assert_eq!(session.session_token(), None);
    assert_eq!(session.api_token(), None);
    assert_eq!(transport.logouts(), 1);
}

#[tokio::test]
async fn terminate_skips_upstream_call_for_inactive_session() {
    let transport = Arc::new(ScriptedTransport::default());
    let lifecycle = SessionLifecycle::new(transport.clone());

    let mut session = EngineSession::new(credentials());
    lifecycle.terminate(&mut session).await;

    assert_eq!(transport.logouts(), 0);
    assert!(!session.is_active());
}

#[tokio::test]
async fn executor_authenticates_an_inactive_session_lazily() {
    let transport = Arc::new(ScriptedTransport::default().respond(200, "[]"));
    let executor = RequestExecutor::new(transport.clone());

    let mut session = EngineSession::new(credentials());
    let result = executor
        .execute(&mut session, Method::GET, "/API/bpm/process", &[], None)
        .await
        .unwrap();

    assert_eq!(result, json!([]));
    assert_eq!(transport.logins(), 1);
    let sent = transport.recorded();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].session_token.as_deref(), Some("sid-1"));
}

#[tokio::test]
async fn a_401_triggers_exactly_one_relogin_and_retry() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .respond(401, "")
            .respond(200, r#"{"caseId": "7"}"#),
    );
    let executor = RequestExecutor::new(transport.clone());

    let mut session = executor.lifecycle().establish(credentials()).await.unwrap();
    let result = executor
        .execute(&mut session, Method::GET, "/API/bpm/case/7", &[], None)
        .await
        .unwrap();

    assert_eq!(result, json!({"caseId": "7"}));
    // one login to establish, one re-login for the retry
    assert_eq!(transport.logins(), 2);
    let sent = transport.recorded();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].session_token.as_deref(), Some("sid-1"));
    assert_eq!(sent[1].session_token.as_deref(), Some("sid-2"));
    // the refresh is visible on the caller's session
    assert_eq!(session.session_token(), Some("sid-2"));
}

#[tokio::test]
async fn a_second_401_surfaces_without_a_third_attempt() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .respond(401, "session expired")
            .respond(401, "session expired"),
    );
    let executor = RequestExecutor::new(transport.clone());

    let mut session = executor.lifecycle().establish(credentials()).await.unwrap();
    let err = executor
        .execute(&mut session, Method::GET, "/API/bpm/process", &[], None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Request {
            status: FailureKind::Http(401),
            ..
        }
    ));
    assert_eq!(transport.recorded().len(), 2);
    assert_eq!(transport.logins(), 2);
}

#[tokio::test]
async fn non_401_failures_are_not_retried() {
    let transport = Arc::new(ScriptedTransport::default().respond(500, "boom"));
    let executor = RequestExecutor::new(transport.clone());

    let mut session = executor.lifecycle().establish(credentials()).await.unwrap();
    let err = executor
        .execute(&mut session, Method::GET, "/API/bpm/process", &[], None)
        .await
        .unwrap_err();

    match err {
        EngineError::Request { status, message } => {
            assert_eq!(status, FailureKind::Http(500));
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.recorded().len(), 1);
    assert_eq!(transport.logins(), 1);
}

#[tokio::test]
async fn network_failures_are_classified_distinctly() {
    let transport = Arc::new(ScriptedTransport::default().fail_next("connection reset"));
    let executor = RequestExecutor::new(transport.clone());

    let mut session = executor.lifecycle().establish(credentials()).await.unwrap();
    let err = executor
        .execute(&mut session, Method::GET, "/API/bpm/process", &[], None)
        .await
        .unwrap_err();

    match err {
        EngineError::Request { status, message } => {
            assert_eq!(status, FailureKind::Network);
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn an_empty_body_parses_to_an_empty_object() {
    let transport = Arc::new(ScriptedTransport::default().respond(200, "  "));
    let executor = RequestExecutor::new(transport.clone());

    let mut session = executor.lifecycle().establish(credentials()).await.unwrap();
    let result = executor
        .execute(&mut session, Method::PUT, "/API/bpm/userTask/3", &[], None)
        .await
        .unwrap();

    assert_eq!(result, json!({}));
}

#[tokio::test]
async fn list_processes_builds_paging_query_and_maps_descriptors() {
    let listing = json!([
        {"id": 8217, "name": "InvoiceApproval", "displayName": "Invoice Approval", "version": "1.0"},
        {"id": "911", "name": "Expenses", "displayName": "Expenses", "version": "2.1"}
    ]);
    let transport = Arc::new(ScriptedTransport::default().respond(200, &listing.to_string()));
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    let processes = client
        .list_processes(&mut session, 1, 25, Some("name ASC"))
        .await
        .unwrap();

    assert_eq!(processes.len(), 2);
    assert_eq!(processes[0].id, "8217");
    assert_eq!(processes[0].display_name, "Invoice Approval");
    assert_eq!(processes[1].id, "911");
    assert_eq!(processes[1].version, "2.1");

    let sent = transport.recorded();
    assert_eq!(sent[0].method, Method::GET);
    assert_eq!(sent[0].path, "/API/bpm/process");
    assert!(sent[0].query.contains(&("p".to_string(), "1".to_string())));
    assert!(sent[0].query.contains(&("c".to_string(), "25".to_string())));
    assert!(sent[0]
        .query
        .contains(&("o".to_string(), "name ASC".to_string())));
}

#[tokio::test]
async fn task_filters_become_repeated_filter_params() {
    let transport = Arc::new(ScriptedTransport::default().respond(200, "[]"));
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    let filter = TaskFilter {
        user_id: Some("4".to_string()),
        process_id: Some("8217".to_string()),
        ..TaskFilter::default()
    };
    client.list_tasks(&mut session, &filter).await.unwrap();

    let sent = transport.recorded();
    let filters: Vec<&str> = sent[0]
        .query
        .iter()
        .filter(|(key, _)| key == "f")
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(filters, vec!["state=ready", "assigned_id=4", "processId=8217"]);
}

#[tokio::test]
async fn assign_task_puts_the_assignee() {
    let transport = Arc::new(ScriptedTransport::default().respond(200, ""));
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    client.assign_task(&mut session, "31", "4").await.unwrap();

    let sent = transport.recorded();
    assert_eq!(sent[0].method, Method::PUT);
    assert_eq!(sent[0].path, "/API/bpm/userTask/31");
    assert_eq!(sent[0].body, Some(json!({"assigned_id": "4"})));
}

#[tokio::test]
async fn complete_task_includes_contract_inputs_when_present() {
    let transport = Arc::new(ScriptedTransport::default().respond(200, ""));
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    let inputs = json!({"approved": true});
    client
        .complete_task(&mut session, "31", Some(&inputs))
        .await
        .unwrap();

    let sent = transport.recorded();
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].path, "/API/bpm/userTask/31/execution");
    assert_eq!(
        sent[0].body,
        Some(json!({"state": "completed", "contractInputs": {"approved": true}}))
    );
}

#[tokio::test]
async fn start_process_defaults_to_an_empty_contract() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .respond(200, r#"{"caseId": 42, "processDefinitionId": "8217"}"#),
    );
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    let outcome = client
        .start_process(&mut session, "8217", None)
        .await
        .unwrap();

    assert_eq!(outcome.case_id, "42");
    assert_eq!(outcome.process_definition_id, "8217");

    let sent = transport.recorded();
    assert_eq!(sent[0].path, "/API/bpm/process/8217/instantiation");
    assert_eq!(sent[0].body, Some(json!({})));
}

#[tokio::test]
async fn case_with_variables_issues_both_reads() {
    let case = json!({"id": "42", "processDefinitionId": "8217", "state": "started", "started_by": "4"});
    let variables = json!([
        {"name": "amount", "value": 120.5, "case_id": "42"},
        {"name": "approved", "value": null, "case_id": "42"}
    ]);
    let transport = Arc::new(
        ScriptedTransport::default()
            .respond(200, &case.to_string())
            .respond(200, &variables.to_string()),
    );
    let client = EngineClient::new(transport.clone());

    let mut session = client.lifecycle().establish(credentials()).await.unwrap();
    let result = client
        .get_case_with_variables(&mut session, "42", true)
        .await
        .unwrap();

    assert_eq!(result.case.id, "42");
    assert_eq!(result.case.started_by.as_deref(), Some("4"));
    assert_eq!(result.variables.len(), 2);
    assert_eq!(result.variables[0].name, "amount");
    assert_eq!(result.variables[0].value, json!(120.5));

    let sent = transport.recorded();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].path, "/API/bpm/caseVariable");
    assert!(sent[1]
        .query
        .contains(&("f".to_string(), "case_id=42".to_string())));
}

#[test]
fn credentials_debug_redacts_the_password() {
    let rendered = format!("{:?}", credentials());
    assert!(rendered.contains("walter.bates"));
    assert!(!rendered.contains("bpm"));
}
