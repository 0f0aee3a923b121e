//! Scripted `BmcApi` double shared by the driver tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{
    ApiResponse, BmcApi, Connector, Credentials, ProviderError, ProviderResult, ProvisionedServer,
};

use super::config::DriverTimeouts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(ProvisionedServer),
    Get(String),
    ShutDown(String),
    PowerOn(String),
    Reboot(String),
    Delete(String),
}

/// Each operation pops its next scripted answer; an exhausted script answers
/// with a 500 so a runaway loop fails instead of hanging.
#[derive(Default)]
pub struct ScriptedApi {
    pub calls: Mutex<Vec<Call>>,
    create: Mutex<VecDeque<ProviderResult<ApiResponse>>>,
    get: Mutex<VecDeque<ProviderResult<ApiResponse>>>,
    action: Mutex<VecDeque<ProviderResult<ApiResponse>>>,
    delete: Mutex<VecDeque<ProviderResult<ApiResponse>>>,
}

pub fn server(id: &str, status: &str) -> ApiResponse {
    ApiResponse::new(
        200,
        serde_json::json!({ "id": id, "status": status }).to_string(),
    )
}

fn next(queue: &Mutex<VecDeque<ProviderResult<ApiResponse>>>) -> ProviderResult<ApiResponse> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(ApiResponse::new(500, r#"{"message":"script exhausted"}"#)))
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_create(&self, response: ApiResponse) -> &Self {
        self.create.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn on_get(&self, response: ApiResponse) -> &Self {
        self.get.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn on_get_err(&self, err: ProviderError) -> &Self {
        self.get.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn on_action(&self, response: ApiResponse) -> &Self {
        self.action.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn on_delete(&self, response: ApiResponse) -> &Self {
        self.delete.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BmcApi for ScriptedApi {
    async fn create_server(&self, request: &ProvisionedServer) -> ProviderResult<ApiResponse> {
        self.record(Call::Create(request.clone()));
        next(&self.create)
    }

    async fn get_server(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.record(Call::Get(id.to_string()));
        next(&self.get)
    }

    async fn shut_down(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.record(Call::ShutDown(id.to_string()));
        next(&self.action)
    }

    async fn power_on(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.record(Call::PowerOn(id.to_string()));
        next(&self.action)
    }

    async fn reboot(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.record(Call::Reboot(id.to_string()));
        next(&self.action)
    }

    async fn delete_server(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.record(Call::Delete(id.to_string()));
        next(&self.delete)
    }
}

/// Connector handing out the same scripted API for any credentials.
pub struct ScriptedConnector {
    pub api: Arc<ScriptedApi>,
    pub connects: Mutex<Vec<Credentials>>,
}

impl ScriptedConnector {
    pub fn new(api: Arc<ScriptedApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            connects: Mutex::new(Vec::new()),
        })
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, credentials: &Credentials) -> ProviderResult<Arc<dyn BmcApi>> {
        self.connects.lock().unwrap().push(credentials.clone());
        Ok(self.api.clone())
    }
}

pub fn fast_timeouts() -> DriverTimeouts {
    DriverTimeouts {
        poll_interval: Duration::from_millis(1),
        converge: Some(Duration::from_secs(5)),
    }
}
