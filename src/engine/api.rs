//! Typed operations over the engine's BPM API.
//!
//! [`EngineClient`] wraps the [`RequestExecutor`] with the concrete
//! endpoints the bridge forwards to: process listing and instantiation,
//! human-task listing, claiming and completion, and case/variable reads.
//! Response mapping is deliberately lenient; the engine omits fields
//! freely and the raw object is always kept as metadata.

use crate::engine::executor::RequestExecutor;
use crate::engine::session::{EngineSession, SessionLifecycle};
use crate::engine::transport::EngineTransport;
use crate::engine::types::{
    CaseDescriptor, CaseVariable, CaseWithVariables, EngineError, ProcessDescriptor,
    StartProcessOutcome, TaskDescriptor, TaskFilter,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub struct EngineClient {
    executor: RequestExecutor,
}

impl EngineClient {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            executor: RequestExecutor::new(transport),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        self.executor.lifecycle()
    }

    pub async fn list_processes(
        &self,
        session: &mut EngineSession,
        page: u32,
        count: u32,
        sort: Option<&str>,
    ) -> Result<Vec<ProcessDescriptor>, EngineError> {
        let mut query = paging(page, count);
        if let Some(sort) = sort {
            query.push(("o".to_string(), sort.to_string()));
        }
        let body = self
            .executor
            .execute(session, Method::GET, "/API/bpm/process", &query, None)
            .await?;
        Ok(map_listing(&body, ProcessDescriptor::from_value))
    }

    pub async fn start_process(
        &self,
        session: &mut EngineSession,
        process_id: &str,
        contract_inputs: Option<&Value>,
    ) -> Result<StartProcessOutcome, EngineError> {
        debug!(process_id, "starting process instance");
        let payload = contract_inputs.cloned().unwrap_or_else(|| json!({}));
        let path = format!("/API/bpm/process/{process_id}/instantiation");
        let body = self
            .executor
            .execute(session, Method::POST, &path, &[], Some(&payload))
            .await?;
        Ok(StartProcessOutcome::from_value(&body))
    }

    pub async fn list_tasks(
        &self,
        session: &mut EngineSession,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskDescriptor>, EngineError> {
        let mut query = paging(filter.page, filter.count);
        if let Some(sort) = &filter.sort {
            query.push(("o".to_string(), sort.clone()));
        }
        if let Some(state) = &filter.state {
            query.push(("f".to_string(), format!("state={state}")));
        }
        if let Some(user_id) = &filter.user_id {
            query.push(("f".to_string(), format!("assigned_id={user_id}")));
        }
        if let Some(process_id) = &filter.process_id {
            query.push(("f".to_string(), format!("processId={process_id}")));
        }
        let body = self
            .executor
            .execute(session, Method::GET, "/API/bpm/userTask", &query, None)
            .await?;
        Ok(map_listing(&body, TaskDescriptor::from_value))
    }

    pub async fn assign_task(
        &self,
        session: &mut EngineSession,
        task_id: &str,
        user_id: &str,
    ) -> Result<(), EngineError> {
        debug!(task_id, user_id, "claiming task");
        let payload = json!({ "assigned_id": user_id });
        let path = format!("/API/bpm/userTask/{task_id}");
        self.executor
            .execute(session, Method::PUT, &path, &[], Some(&payload))
            .await?;
        Ok(())
    }

    pub async fn complete_task(
        &self,
        session: &mut EngineSession,
        task_id: &str,
        contract_inputs: Option<&Value>,
    ) -> Result<(), EngineError> {
        debug!(task_id, "completing task");
        let mut payload = json!({ "state": "completed" });
        if let Some(inputs) = contract_inputs
            && let Some(object) = payload.as_object_mut()
        {
            object.insert("contractInputs".to_string(), inputs.clone());
        }
        let path = format!("/API/bpm/userTask/{task_id}/execution");
        self.executor
            .execute(session, Method::POST, &path, &[], Some(&payload))
            .await?;
        Ok(())
    }

    pub async fn get_case(
        &self,
        session: &mut EngineSession,
        case_id: &str,
    ) -> Result<CaseDescriptor, EngineError> {
        let path = format!("/API/bpm/case/{case_id}");
        let body = self
            .executor
            .execute(session, Method::GET, &path, &[], None)
            .await?;
        Ok(CaseDescriptor::from_value(&body))
    }

    pub async fn get_case_variables(
        &self,
        session: &mut EngineSession,
        case_id: &str,
        page: u32,
        count: u32,
    ) -> Result<Vec<CaseVariable>, EngineError> {
        let mut query = paging(page, count);
        query.push(("f".to_string(), format!("case_id={case_id}")));
        let body = self
            .executor
            .execute(session, Method::GET, "/API/bpm/caseVariable", &query, None)
            .await?;
        Ok(map_listing(&body, CaseVariable::from_value))
    }

    pub async fn get_case_with_variables(
        &self,
        session: &mut EngineSession,
        case_id: &str,
        include_variables: bool,
    ) -> Result<CaseWithVariables, EngineError> {
        let case = self.get_case(session, case_id).await?;
        let variables = if include_variables {
            self.get_case_variables(session, case_id, 0, 50).await?
        } else {
            Vec::new()
        };
        Ok(CaseWithVariables { case, variables })
    }
}

fn paging(page: u32, count: u32) -> Vec<(String, String)> {
    vec![
        ("p".to_string(), page.to_string()),
        ("c".to_string(), count.to_string()),
    ]
}

fn map_listing<T>(body: &Value, map: impl Fn(&Value) -> T) -> Vec<T> {
    body.as_array()
        .map(|items| items.iter().map(&map).collect())
        .unwrap_or_default()
}
