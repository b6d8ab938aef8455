//! Transport-agnostic trigger for the daily grid generator.
//!
//! Maps a request method onto the generator and the result onto a status
//! code and JSON body:
//!
//! | method    | status | body                                  |
//! |-----------|--------|---------------------------------------|
//! | `OPTIONS` | 200    | `ok`                                  |
//! | `POST`    | 200    | `{"message": "Successfully generated grid for YYYY-MM-DD."}` |
//! | `POST`    | 500    | `{"error": "..."}`                    |
//! | other     | 405    | `{"error": "Method Not Allowed"}`     |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::generator::GridGenerator;

/// Request method, as far as the trigger cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerMethod {
    Options,
    Post,
    Other(String),
}

impl TriggerMethod {
    /// Classifies an HTTP method name.
    #[must_use]
    pub fn parse(method: &str) -> Self {
        match method {
            "OPTIONS" => Self::Options,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerBody {
    /// Plain-text preflight acknowledgement.
    Text(&'static str),
    Message(MessageBody),
    Error(ErrorBody),
}

/// What the transport should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResponse {
    pub status: u16,
    pub body: TriggerBody,
    /// Failure category when generation ran and failed.
    pub failure: Option<FailureKind>,
}

impl TriggerResponse {
    fn preflight() -> Self {
        Self {
            status: 200,
            body: TriggerBody::Text("ok"),
            failure: None,
        }
    }

    fn method_not_allowed() -> Self {
        Self::error(405, "Method Not Allowed", None)
    }

    /// Builds an error response.
    #[must_use]
    pub fn error(status: u16, message: impl Into<String>, failure: Option<FailureKind>) -> Self {
        Self {
            status,
            body: TriggerBody::Error(ErrorBody {
                error: message.into(),
            }),
            failure,
        }
    }

    /// Serialized body bytes and their content type.
    #[must_use]
    pub fn encode(&self) -> (&'static str, Vec<u8>) {
        let json = match &self.body {
            TriggerBody::Text(text) => return ("text/plain; charset=utf-8", text.as_bytes().to_vec()),
            TriggerBody::Message(body) => serde_json::to_vec(body),
            TriggerBody::Error(body) => serde_json::to_vec(body),
        };
        // Both bodies are plain string structs; serialization cannot fail.
        ("application/json", json.unwrap_or_default())
    }
}

/// Handles one trigger invocation for `grid_date`.
///
/// Methods other than `POST` never reach the generator.
pub fn handle(generator: &GridGenerator, method: &TriggerMethod, grid_date: NaiveDate) -> TriggerResponse {
    match method {
        TriggerMethod::Options => TriggerResponse::preflight(),
        TriggerMethod::Other(name) => {
            tracing::debug!(method = %name, "rejected trigger method");
            TriggerResponse::method_not_allowed()
        }
        TriggerMethod::Post => match generator.generate_for(grid_date) {
            Ok(generated) => TriggerResponse {
                status: 200,
                body: TriggerBody::Message(MessageBody {
                    message: format!("Successfully generated grid for {}.", generated.grid.grid_date),
                }),
                failure: None,
            },
            Err(e) => {
                let kind = e.kind();
                tracing::error!(%grid_date, failure = %kind, error = %e, "daily grid generation failed");
                TriggerResponse::error(500, e.to_string(), Some(kind))
            }
        },
    }
}
