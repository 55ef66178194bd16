//! Scripted upstream used by unit tests

use super::error::GatewayError;
use super::gateway::{Endpoint, Upstream};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

type Handler = dyn Fn(&Endpoint, &[(&'static str, String)]) -> Result<Value, GatewayError> + Send + Sync;

/// Upstream whose responses come from a closure; records every call
pub struct ScriptedUpstream {
    handler: Box<Handler>,
    calls: Mutex<Vec<(Endpoint, Vec<(&'static str, String)>)>>,
}

impl ScriptedUpstream {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Endpoint, &[(&'static str, String)]) -> Result<Value, GatewayError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Endpoint, Vec<(&'static str, String)>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn query(
        &self,
        endpoint: &Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<Value, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), params.to_vec()));
        (self.handler)(endpoint, params)
    }
}
