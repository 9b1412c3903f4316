//! CommServ details.

use tracing::debug;

use crate::client::endpoints::Endpoint;
use crate::error::{ErrorDomain, Result};
use crate::models::CommServInfo;

use super::ApiContext;

/// Reads the details of the connected CommServ.
#[derive(Clone)]
pub(crate) struct CommServService {
    ctx: ApiContext,
}

impl CommServService {
    pub(crate) fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    /// Fetches `GET CommServ` and parses the details.
    pub(crate) async fn load(&self) -> Result<CommServInfo> {
        let url = self.ctx.endpoints.url(Endpoint::CommServ);
        let value = self.ctx.http.get(url, ErrorDomain::Commcell).await?;
        let info = CommServInfo::from_json(&value)?;
        debug!(commserv = %info.name, version = %info.version, "Loaded CommServ details");
        Ok(info)
    }
}
