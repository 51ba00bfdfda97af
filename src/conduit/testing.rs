// Test doubles for the Conduit layer.

use std::cell::RefCell;

use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::error::{PhabStatsError, Result};

use super::client::Conduit;
use super::transport::Transport;

type Request = (String, Vec<(String, String)>);

/// Transport that answers every request with one canned response.
pub struct FakeTransport {
    response: std::result::Result<String, StatusCode>,
    requests: RefCell<Vec<Request>>,
}

impl FakeTransport {
    pub fn ok(body: &str) -> Self {
        Self {
            response: Ok(body.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            response: Err(status),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push((
            url.to_string(),
            form.iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        ));

        match &self.response {
            Ok(body) => Ok(body.clone().into_bytes()),
            Err(status) => Err(PhabStatsError::Status {
                status: *status,
                body: String::new(),
            }),
        }
    }
}

/// Conduit whose responses come from a handler closure; records every call.
pub struct FakeConduit<F> {
    handler: F,
    calls: RefCell<Vec<(String, Map<String, Value>)>>,
}

impl<F> FakeConduit<F>
where
    F: Fn(&str, &Map<String, Value>) -> Result<Value>,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.borrow().clone()
    }

    /// The `after` parameter of every call, in order.
    pub fn cursors(&self) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, params)| params.get("after").cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl<F> Conduit for FakeConduit<F>
where
    F: Fn(&str, &Map<String, Value>) -> Result<Value>,
{
    fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value> {
        let result = (self.handler)(method, &params);
        self.calls.borrow_mut().push((method.to_string(), params));
        result
    }
}
