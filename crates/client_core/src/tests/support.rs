use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{RunId, ScenarioId},
    protocol::RunRecord,
};
use uuid::Uuid;

use crate::{
    error::RequestFailure,
    remote::{Method, RemoteService, SimulationApi},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub payload: Option<Value>,
}

#[derive(Clone)]
enum Scripted {
    Reply(Value),
    Status(u16),
}

#[derive(Default)]
pub struct FakeRemote {
    routes: Mutex<HashMap<(Method, String), (Scripted, Option<Duration>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, endpoint: &str, body: Value) {
        self.routes.lock().unwrap().insert(
            (method, endpoint.to_string()),
            (Scripted::Reply(body), None),
        );
    }

    pub fn respond_after(&self, method: Method, endpoint: &str, body: Value, delay: Duration) {
        self.routes.lock().unwrap().insert(
            (method, endpoint.to_string()),
            (Scripted::Reply(body), Some(delay)),
        );
    }

    pub fn fail(&self, method: Method, endpoint: &str, status: u16) {
        self.routes.lock().unwrap().insert(
            (method, endpoint.to_string()),
            (Scripted::Status(status), None),
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<(Method, String)> {
        self.calls()
            .into_iter()
            .map(|call| (call.method, call.endpoint))
            .collect()
    }

    pub fn count(&self, method: Method, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.endpoint == endpoint)
            .count()
    }

    pub fn api(self: &Arc<Self>) -> SimulationApi {
        SimulationApi::new(Arc::clone(self) as Arc<dyn RemoteService>)
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<Value, RequestFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            payload,
        });
        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get(&(method, endpoint.to_string()))
            .cloned();
        let (scripted, delay) = scripted.unwrap_or((Scripted::Status(404), None));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match scripted {
            Scripted::Reply(value) => Ok(value),
            Scripted::Status(status) => Err(RequestFailure::Status {
                method,
                endpoint: endpoint.to_string(),
                status,
                detail: None,
            }),
        }
    }
}

pub fn run_id(n: u128) -> RunId {
    RunId(Uuid::from_u128(n))
}

pub fn scenario_id(n: u128) -> ScenarioId {
    ScenarioId(Uuid::from_u128(0x5c00_0000 + n))
}

pub fn ts(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(1_700_000_000 + seconds, 0)
        .expect("timestamp")
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

pub fn run_summary_json(n: u128, starred: bool, at: i64) -> Value {
    json!({
        "id": run_id(n).to_string(),
        "scenario_id": scenario_id(1).to_string(),
        "scenario_name": format!("Scenario {n}"),
        "timestamp": ts(at),
        "starred": starred,
    })
}

pub fn run_summary(n: u128, starred: bool, at: i64) -> RunRecord {
    serde_json::from_value(run_summary_json(n, starred, at)).expect("run summary")
}

pub fn scenario_json(n: u128) -> Value {
    json!({
        "id": scenario_id(n).to_string(),
        "name": "S",
        "system_prompt": "P",
        "participants": [{
            "name": "Jordan",
            "role": "R",
            "perspective": "Per",
            "meta_tags": ["angry"],
            "initial_message": "Hi"
        }],
        "settings": {"model": "m", "temperature": 0.5, "max_tokens": 100},
        "created_at": ts(0),
    })
}

pub fn full_run_json(n: u128, scenario: u128) -> Value {
    json!({
        "id": run_id(n).to_string(),
        "scenario_id": scenario_id(scenario).to_string(),
        "timestamp": ts(10),
        "starred": false,
        "log": [
            {"speaker": "Jordan", "content": "Hi", "timestamp": ts(11)},
            {"speaker": "AI", "content": "**Welcome**, *everyone*.\nLet's begin.", "timestamp": ts(12)}
        ]
    })
}
