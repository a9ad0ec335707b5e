//! HTTP-style entry point.
//!
//! Mirrors a serverless function handler: a method and a raw body come in,
//! a status, a header set and a JSON body go out. Every response carries the
//! same CORS headers so browser clients can call it directly.

use crate::process::{Collaborators, PipelineError, ProcessConfig, process_batch_with_backend};
use crate::request::{BatchRequest, ErrorResponse};
use serde::Serialize;
use tracing::{info, warn};

pub const METHOD_NOT_ALLOWED: &str = "Method not allowed. Only POST supported.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

impl HandlerResponse {
    fn new(status: u16, body: String) -> Self {
        Self {
            status,
            headers: cors_headers(),
            body,
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(status, body),
            Err(e) => Self::error(500, &e.to_string()),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        // A plain string always serializes.
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status, body)
    }

    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

pub fn cors_headers() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Headers", "Content-Type"),
        ("Access-Control-Allow-Methods", "OPTIONS,POST,GET"),
        ("Content-Type", "application/json"),
    ]
}

/// What the handler needs to run a batch.
pub struct HandlerContext<'a> {
    pub collaborators: Collaborators<'a>,
    pub config: ProcessConfig,
}

/// Dispatch one request.
pub fn handle(method: &str, body: &str, ctx: &HandlerContext<'_>) -> HandlerResponse {
    match method.to_ascii_uppercase().as_str() {
        "OPTIONS" => HandlerResponse::new(200, String::new()),
        "POST" => handle_post(body, ctx),
        other => {
            info!(method = other, "rejected method");
            HandlerResponse::error(405, METHOD_NOT_ALLOWED)
        }
    }
}

fn handle_post(body: &str, ctx: &HandlerContext<'_>) -> HandlerResponse {
    let request = match BatchRequest::from_json(body) {
        Ok(request) => request,
        Err(e) => {
            let err = PipelineError::Validation(format!("Invalid request body: {e}"));
            warn!(kind = err.kind(), error = %err, "request rejected");
            return HandlerResponse::error(err.status_code(), &err.to_string());
        }
    };

    match process_batch_with_backend(
        &ctx.collaborators,
        &request,
        &ctx.config,
        ctx.config.deadline(),
        None,
    ) {
        Ok(outcome) => HandlerResponse::json(200, &outcome.response),
        Err(err) => {
            warn!(kind = err.kind(), status = err.status_code(), error = %err, "batch failed");
            HandlerResponse::json(
                err.status_code(),
                &ErrorResponse {
                    error: err.to_string(),
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{Dimensions, MockBackend};
    use crate::request::BatchResponse;
    use crate::storage::{MemoryMetadataStore, MemoryObjectStore, ObjectStore};

    fn run(
        method: &str,
        body: &str,
        backend: &MockBackend,
        store: &MemoryObjectStore,
    ) -> HandlerResponse {
        let metadata = MemoryMetadataStore::new();
        let ctx = HandlerContext {
            collaborators: Collaborators {
                backend,
                store,
                metadata: &metadata,
            },
            config: ProcessConfig::default(),
        };
        handle(method, body, &ctx)
    }

    fn error_of(response: &HandlerResponse) -> String {
        serde_json::from_str::<ErrorResponse>(&response.body)
            .unwrap()
            .error
    }

    #[test]
    fn options_is_an_empty_preflight() {
        let response = run("OPTIONS", "", &MockBackend::new(), &MemoryObjectStore::new());
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "");
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("OPTIONS,POST,GET")
        );
    }

    #[test]
    fn other_methods_are_rejected() {
        for method in ["GET", "PUT", "DELETE"] {
            let response = run(method, "", &MockBackend::new(), &MemoryObjectStore::new());
            assert_eq!(response.status, 405);
            assert_eq!(error_of(&response), METHOD_NOT_ALLOWED);
            assert_eq!(response.header("Content-Type"), Some("application/json"));
        }
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let response = run("POST", "{oops", &MockBackend::new(), &MemoryObjectStore::new());
        assert_eq!(response.status, 400);
        assert!(error_of(&response).starts_with("Invalid request body"));
    }

    #[test]
    fn empty_batch_is_bad_request() {
        let response = run(
            "POST",
            r#"{"uploadId":"u","imageName":[]}"#,
            &MockBackend::new(),
            &MemoryObjectStore::new(),
        );
        assert_eq!(response.status, 400);
        assert_eq!(error_of(&response), "No images provided");
    }

    #[test]
    fn post_runs_the_batch() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 40,
            height: 30,
        }]);
        let store = MemoryObjectStore::new();
        store.store("in/cat.png", b"source", "image/png").unwrap();

        let response = run(
            "post",
            r#"{"uploadId":"u","imageName":["in/cat.png"],"imageParameters":{"outputFormat":["webp"]}}"#,
            &backend,
            &store,
        );

        assert_eq!(response.status, 200);
        let body: BatchResponse = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body.filenames, vec!["cat.webp"]);
        assert!(body.urls[0].ends_with("/uploads/cat.webp"));
        assert!(store.get("uploads/cat.webp").is_some());
    }

    #[test]
    fn pipeline_errors_keep_their_status() {
        let response = run(
            "POST",
            r#"{"uploadId":"u","imageName":["nowhere.png"]}"#,
            &MockBackend::new(),
            &MemoryObjectStore::new(),
        );
        assert_eq!(response.status, 400);
        assert!(error_of(&response).contains("nowhere.png"));
    }
}
