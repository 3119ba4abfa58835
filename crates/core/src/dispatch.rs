//! Stock request dispatcher

use async_trait::async_trait;

use crate::collaborators::RequestDispatcher;
use crate::rest::{RestRequest, RestResponse};

/// Answers every request with `200` and a one-line description of it.
///
/// Used to bring a server up before a real handler exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoDispatcher;

#[async_trait]
impl RequestDispatcher for EchoDispatcher {
    async fn dispatch(&self, request: RestRequest) -> RestResponse {
        let body = format!("{} {} ({} bytes)\n", request.method, request.uri, request.body.len());
        RestResponse::new(200, body).with_header("Content-Type", "text/plain")
    }
}
