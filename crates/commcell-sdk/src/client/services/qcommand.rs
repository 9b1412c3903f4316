//! Legacy qcommand channel.

use reqwest::Method;
use serde_json::Value;
use tracing::instrument;

use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{ErrorDomain, Result};

use super::ApiContext;

/// Raw passthroughs to the qoperation and qcommand endpoints.
#[derive(Clone)]
pub(crate) struct QcommandService {
    ctx: ApiContext,
}

impl QcommandService {
    pub(crate) fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    /// Posts a JSON or XML request to `Qcommand/qoperation execute`.
    #[instrument(skip(self, request))]
    pub(crate) async fn qoperation_execute(&self, request: &Payload) -> Result<Value> {
        let url = self.ctx.endpoints.url(Endpoint::ExecuteQoperation);
        self.ctx
            .http
            .request(Method::POST, url, Some(request), ErrorDomain::Response)
            .await
    }

    /// Runs a qcommand, optionally with an input XML document.
    #[instrument(skip(self, input_xml))]
    pub(crate) async fn execute_qcommand(
        &self,
        command: &str,
        input_xml: Option<&str>,
    ) -> Result<Value> {
        let mut fields = vec![("command".to_string(), command.to_string())];
        if let Some(xml) = input_xml {
            fields.push(("inputRequestXML".to_string(), xml.to_string()));
        }
        let url = self.ctx.endpoints.url(Endpoint::ExecuteQcommand);
        self.ctx
            .http
            .request(Method::POST, url, Some(&Payload::Form(fields)), ErrorDomain::Response)
            .await
    }
}
