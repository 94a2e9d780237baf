//! One receive attempt and its JSON report.

use std::any::Any;

use clap::ValueEnum;
use json_client::{JsonError, JsonFeature, JsonSerializer};
use receive::{ApplicationCall, ConsumptionState, MultiPartData, PartData, ReceiveError};
use serde::Serialize;
use serde_json::{json, Value};

/// Shape the body is requested as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Text,
    Bytes,
    Parameters,
    Multipart,
    /// Text, then parsed as a JSON document.
    Json,
}

#[derive(Debug, Serialize)]
pub struct AttemptReport {
    pub call_id: String,
    pub attempt: u32,
    pub requested: BodyKind,
    pub state: ConsumptionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receives the body of `call` as `kind` and describes the outcome.
///
/// With `nullable`, content-transformation failures are reported as a `null`
/// value instead of an error. [`BodyKind::Json`] only reads bodies whose
/// content type `feature` accepts.
pub async fn attempt<S: JsonSerializer>(
    call: &mut ApplicationCall,
    attempt: u32,
    kind: BodyKind,
    nullable: bool,
    feature: &JsonFeature<S>,
) -> AttemptReport {
    let result = render(call, kind, nullable, feature).await;
    let (value, error) = match result {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(format!("{err:#}"))),
    };
    AttemptReport {
        call_id: call.id().to_string(),
        attempt,
        requested: kind,
        state: call.consumption_state(),
        value,
        error,
    }
}

async fn render<S: JsonSerializer>(
    call: &mut ApplicationCall,
    kind: BodyKind,
    nullable: bool,
    feature: &JsonFeature<S>,
) -> anyhow::Result<Value> {
    let value = match kind {
        BodyKind::Text => fetch::<String>(call, nullable).await?.map(Value::String),
        BodyKind::Bytes => fetch::<bytes::Bytes>(call, nullable)
            .await?
            .map(|bytes| json!({ "length": bytes.len() })),
        BodyKind::Parameters => fetch::<content::Parameters>(call, nullable)
            .await?
            .map(|params| serde_json::to_value(&params))
            .transpose()?,
        BodyKind::Multipart => fetch::<MultiPartData>(call, nullable)
            .await?
            .map(|parts| Value::Array(parts.map(describe_part).collect())),
        BodyKind::Json => {
            let content_type = call.content_type()?;
            if !content_type.as_ref().is_some_and(|ct| feature.accepts(ct)) {
                return Err(JsonError::UnexpectedContentType {
                    content_type: content_type
                        .map_or_else(|| "(none)".to_string(), |ct| ct.to_string()),
                }
                .into());
            }
            match fetch::<String>(call, nullable).await? {
                Some(text) => Some(feature.serializer().read::<Value>(text.as_bytes())?),
                None => None,
            }
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

async fn fetch<T: Any + Send>(
    call: &mut ApplicationCall,
    nullable: bool,
) -> Result<Option<T>, ReceiveError> {
    if nullable {
        call.receive_or_none().await
    } else {
        call.receive().await.map(Some)
    }
}

fn describe_part(part: PartData) -> Value {
    match part {
        PartData::FormItem { name, value, .. } => json!({
            "kind": "form",
            "name": name,
            "value": value,
        }),
        PartData::FileItem {
            name,
            file_name,
            content_type,
            bytes,
            ..
        } => json!({
            "kind": "file",
            "name": name,
            "file_name": file_name,
            "content_type": content_type.map(|ct| ct.to_string()),
            "length": bytes.len(),
        }),
    }
}
