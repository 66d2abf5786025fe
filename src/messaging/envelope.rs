use crate::error::CeleryError;
use crate::messaging::{TaskId, TaskMessage};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The message actually pushed onto a queue: a base64-wrapped JSON task descriptor plus delivery metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub body: String,
    pub headers: Map<String, Value>,
    #[serde(rename = "content-type")]
    pub content_type: String,
    #[serde(rename = "content-encoding")]
    pub content_encoding: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Properties {
    pub body_encoding: String,
    pub reply_to: TaskId,
    pub delivery_info: DeliveryInfo,
    pub delivery_mode: u8,
    pub delivery_tag: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryInfo {
    pub priority: u8,
    pub routing_key: String,
    pub exchange: String,
}

impl Envelope {
    /// Wrap a task descriptor for delivery on `routing_key`.
    pub fn wrap(message: &TaskMessage, routing_key: &str) -> Result<Self, CeleryError> {
        let body = BASE64_STANDARD.encode(serde_json::to_vec(message)?);

        Ok(Self {
            body,
            headers: Map::new(),
            content_type: "application/json".to_owned(),
            content_encoding: "binary".to_owned(),
            properties: Properties {
                body_encoding: "base64".to_owned(),
                reply_to: message.id,
                delivery_info: DeliveryInfo {
                    priority: 0,
                    routing_key: routing_key.to_owned(),
                    exchange: routing_key.to_owned(),
                },
                // Persistent.
                delivery_mode: 2,
                delivery_tag: message.id,
            },
        })
    }

    /// Undo the base64 and JSON layers of the body.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, CeleryError> {
        let json = BASE64_STANDARD
            .decode(&self.body)
            .map_err(|e| CeleryError::Protocol(format!("message body is not base64: {e}")))?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn to_json(&self) -> Result<String, CeleryError> {
        Ok(serde_json::to_string(self)?)
    }
}
