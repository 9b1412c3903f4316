//! Entity tags service.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{Error, ErrorDomain, Result};
use crate::response::{self, as_id, RawResponse};

use super::{ApiContext, EntityMap, Fetcher, Lister, Mutator};

/// Entity tags visible to the logged in user.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::{Commcell, Lister, Mutator};
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let tags = commcell.tags().await?;
/// let tag = tags.add("Confidential".to_string()).await?;
/// println!("tag {} has id {}", tag.name(), tag.id());
/// tags.delete("confidential").await?;
/// assert!(!tags.has("Confidential"));
/// # Ok(())
/// # }
/// ```
pub struct Tags {
    ctx: ApiContext,
    all: RwLock<EntityMap>,
    tag_set_id: RwLock<Option<u64>>,
}

impl std::fmt::Debug for Tags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tags")
            .field("count", &self.all.read().len())
            .field("tag_set_id", &*self.tag_set_id.read())
            .finish_non_exhaustive()
    }
}

impl Tags {
    pub(crate) async fn load(ctx: ApiContext) -> Result<Self> {
        let tags = Self {
            ctx,
            all: RwLock::new(EntityMap::new()),
            tag_set_id: RwLock::new(None),
        };
        tags.refresh().await?;
        Ok(tags)
    }

    /// Id of the default tag set new tags are created in.
    #[must_use]
    pub fn tag_set_id(&self) -> Option<u64> {
        *self.tag_set_id.read()
    }

    fn not_found(name: &str) -> Error {
        Error::not_found(ErrorDomain::EntityTags, "tag", name.to_lowercase())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Payload>,
    ) -> Result<Option<Value>> {
        let (ok, raw) = self.ctx.http.dispatch(method, url, payload).await?;
        if !ok {
            return Err(not_success(&raw));
        }
        raw.json()
    }
}

fn not_success(raw: &RawResponse) -> Error {
    Error::response(raw.status.as_u16(), response::extract_title(&raw.text()))
}

#[async_trait]
impl Lister for Tags {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = self.ctx.endpoints.url(Endpoint::EntityTags);
        let value = self.ctx.http.get(url, ErrorDomain::EntityTags).await?;

        let tag_set_id = value
            .pointer("/tagSetInfo/id")
            .and_then(as_id)
            .ok_or_else(|| Error::empty("missing key 'tagSetInfo'"))?;

        let mut map = EntityMap::new();
        for tag in value.get("tags").and_then(Value::as_array).into_iter().flatten() {
            if let (Some(name), Some(id)) = (
                tag.get("name").and_then(Value::as_str),
                tag.get("id").and_then(as_id),
            ) {
                map.insert(name, json!(id));
            }
        }

        debug!(count = map.len(), tag_set_id, "Refreshed entity tags");
        *self.tag_set_id.write() = Some(tag_set_id);
        *self.all.write() = map;
        Ok(())
    }

    fn all(&self) -> EntityMap {
        self.all.read().clone()
    }
}

#[async_trait]
impl Fetcher for Tags {
    type Item = Tag;

    async fn get(&self, name: &str) -> Result<Tag> {
        let id = self
            .all
            .read()
            .get(name)
            .and_then(as_id)
            .ok_or_else(|| Self::not_found(name))?;
        Ok(Tag {
            name: name.to_lowercase(),
            id,
        })
    }
}

#[async_trait]
impl Mutator for Tags {
    type Request = String;
    type Item = Tag;

    #[instrument(skip(self))]
    async fn add(&self, name: String) -> Result<Tag> {
        let payload = Payload::Json(json!({
            "container": {"containerId": self.tag_set_id()},
            "tags": [{"name": name}]
        }));
        let url = self.ctx.endpoints.url(Endpoint::CreateEntityTag);
        let value = self.send(Method::POST, url, Some(&payload)).await?;

        if let Some(message) = value.as_ref().and_then(add_error) {
            return Err(Error::operation(ErrorDomain::EntityTags, 103, message));
        }

        self.refresh().await?;
        self.get(&name).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        let id = self
            .all
            .read()
            .get(name)
            .and_then(as_id)
            .ok_or_else(|| Self::not_found(name))?;

        let url = self.ctx.endpoints.format(Endpoint::DeleteEntityTag, &[&id]);
        let value = self.send(Method::DELETE, &url, None).await?;

        if let Some(message) = value.as_ref().and_then(delete_error) {
            return Err(Error::operation(ErrorDomain::EntityTags, 102, message));
        }

        self.refresh().await
    }
}

/// Error reported by the tag creation call, if any.
fn add_error(value: &Value) -> Option<String> {
    let errors = value.get("errList")?;
    let first = errors.get(0).unwrap_or(&Value::Null);
    let message = value
        .get("errLogMessage")
        .or_else(|| first.get("errLogMessage"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let code = value
        .get("errorCode")
        .or_else(|| first.get("errorCode"))
        .and_then(response::error_code_value)
        .unwrap_or_default();

    (code != 0 || !message.is_empty()).then(|| message.to_string())
}

/// Error reported by the tag deletion call, if any.
fn delete_error(value: &Value) -> Option<String> {
    let code = value
        .get("errorCode")
        .and_then(response::error_code_value)
        .unwrap_or_default();
    let message = value
        .get("errorMessage")
        .and_then(Value::as_str)
        .unwrap_or_default();

    (code != 0 || !message.is_empty()).then(|| message.to_string())
}

/// One entity tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    id: u64,
}

impl Tag {
    /// Lower-cased tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}
