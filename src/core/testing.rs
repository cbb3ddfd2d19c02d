//! 測試用的 transport / cache 替身

use crate::domain::model::{FlowDirection, UpstreamEnvelope, UpstreamQuery};
use crate::domain::ports::UpstreamTransport;
use crate::utils::error::TransportError;
use serde_json::{json, Value};
use std::sync::Mutex;

type Responder =
    dyn Fn(&UpstreamQuery) -> Result<UpstreamEnvelope, TransportError> + Send + Sync;

pub struct MockTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<UpstreamQuery>>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&UpstreamQuery) -> Result<UpstreamEnvelope, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_envelope(envelope: Value) -> Self {
        Self::new(move |_| Ok(decode(envelope.clone())))
    }

    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// 依 flow 回傳不同的 rows
    pub fn by_flow(export_rows: Value, import_rows: Value) -> Self {
        Self::new(move |query| {
            Ok(match query.flow {
                FlowDirection::Export => envelope(export_rows.clone()),
                FlowDirection::Import => envelope(import_rows.clone()),
            })
        })
    }

    pub fn calls(&self) -> Vec<UpstreamQuery> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl UpstreamTransport for MockTransport {
    async fn send(&self, query: &UpstreamQuery) -> Result<UpstreamEnvelope, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.clone());
        }
        (self.responder)(query)
    }
}

pub fn envelope(rows: Value) -> UpstreamEnvelope {
    decode(json!({"success": true, "message": null, "data": {"list": rows}}))
}

fn decode(value: Value) -> UpstreamEnvelope {
    serde_json::from_value(value).expect("test envelope must decode")
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}
