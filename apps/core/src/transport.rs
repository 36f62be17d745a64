use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::contract::{HostRequest, HostResponse, KeyRequest, OpenedResponse};
use crate::dispatcher::{DispatchError, DispatchOutcome, Dispatcher, KeyPress};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    Launch,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: HostResponse },
    Err { error: ErrorResponse },
}

impl From<&KeyRequest> for KeyPress {
    fn from(value: &KeyRequest) -> Self {
        Self {
            key: value.key.clone(),
            shift: value.shift,
            ctrl: value.ctrl,
            alt: value.alt,
            meta: value.meta,
            composing: value.composing,
        }
    }
}

pub fn handle_request(dispatcher: &mut Dispatcher, request: HostRequest) -> TransportResponse {
    let outcome = match request {
        HostRequest::Submit(submit) => dispatcher.dispatch(Command::parse(&submit.line)),
        HostRequest::Key(key) => dispatcher.submit_key(&KeyPress::from(&key), &key.line),
        HostRequest::Cancel => {
            dispatcher.cancel_live();
            return display_response(dispatcher);
        }
    };

    match outcome {
        Ok(DispatchOutcome::Ignored) => TransportResponse::Ok {
            response: HostResponse::Ignored,
        },
        Ok(DispatchOutcome::Opened { url }) => TransportResponse::Ok {
            response: HostResponse::Opened(OpenedResponse { url }),
        },
        Ok(DispatchOutcome::Started { .. }) => display_response(dispatcher),
        Err(error) => TransportResponse::Err {
            error: map_dispatch_error(error),
        },
    }
}

pub fn display_response(dispatcher: &Dispatcher) -> TransportResponse {
    TransportResponse::Ok {
        response: HostResponse::Display(dispatcher.display().snapshot()),
    }
}

pub fn handle_json(dispatcher: &mut Dispatcher, payload: &str) -> String {
    let response = match serde_json::from_str::<HostRequest>(payload) {
        Ok(request) => handle_request(dispatcher, request),
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
            },
        },
    };
    encode(&response)
}

pub fn encode(response: &TransportResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        serde_json::json!({
            "status": "err",
            "error": { "code": "internal", "message": error.to_string() },
        })
        .to_string()
    })
}

fn map_dispatch_error(error: DispatchError) -> ErrorResponse {
    match error {
        DispatchError::Launch(error) => ErrorResponse {
            code: ErrorCode::Launch,
            message: error.to_string(),
        },
    }
}
