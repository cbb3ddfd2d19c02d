use crate::domain::model::{UpstreamQuery, UpstreamRow};
use crate::domain::ports::UpstreamTransport;
use crate::utils::error::{ComexError, Result, TransportError};

const DEFAULT_FAILURE_MESSAGE: &str = "ComexStat API request failed.";

/// 單次上游查詢：檢查 envelope、轉換錯誤、記錄發生錯誤的操作名稱。不重試。
pub struct UpstreamClient<T: UpstreamTransport> {
    transport: T,
}

impl<T: UpstreamTransport> UpstreamClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn query(&self, operation: &str, query: UpstreamQuery) -> Result<Vec<UpstreamRow>> {
        tracing::debug!(
            "📡 {}: POST /general flow={:?} period={}..{} details={:?}",
            operation,
            query.flow,
            query.period.from,
            query.period.to,
            query.details
        );

        let outcome = match self.transport.send(&query).await {
            Ok(envelope) if envelope.success => Ok(envelope.into_rows()),
            Ok(envelope) => Err(ComexError::UpstreamRejected {
                message: envelope
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            }),
            Err(e) => Err(map_transport_error(e)),
        };

        match outcome {
            Ok(rows) => {
                tracing::debug!("📡 {}: received {} rows", operation, rows.len());
                Ok(rows)
            }
            Err(e) => {
                tracing::error!(operation = operation, "❌ ComexStat API request failed: {}", e);
                Err(e)
            }
        }
    }
}

fn map_transport_error(error: TransportError) -> ComexError {
    match error {
        TransportError::Http { status, body } => ComexError::UpstreamHttpError {
            status,
            message: message_from_body(&body),
        },
        // envelope 解析失敗等同 success = false
        TransportError::Decode { .. } => ComexError::UpstreamRejected {
            message: DEFAULT_FAILURE_MESSAGE.to_string(),
        },
        TransportError::Unreachable { message } => {
            tracing::debug!("ComexStat unreachable: {}", message);
            ComexError::UpstreamUnreachable {
                message: "Unable to reach ComexStat API.".to_string(),
            }
        }
    }
}

/// 錯誤回應可能是純文字或帶 `message` 的 JSON
fn message_from_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(obj)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        Ok(_) => DEFAULT_FAILURE_MESSAGE.to_string(),
        Err(_) if body.trim().is_empty() => DEFAULT_FAILURE_MESSAGE.to_string(),
        Err(_) => body.to_string(),
    }
}
