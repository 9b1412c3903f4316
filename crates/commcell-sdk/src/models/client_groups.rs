//! Client group request types.

use serde_json::{json, Value};

/// Request to create a client group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientGroupCreate {
    /// Group name.
    pub name: String,
    /// Clients to associate. Names the commcell does not know are dropped.
    pub clients: Vec<String>,
    /// Group description.
    pub description: String,
}

impl ClientGroupCreate {
    /// Creates a request for an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a client to the group.
    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.clients.push(client.into());
        self
    }

    /// Sets the clients of the group.
    #[must_use]
    pub fn with_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clients = clients.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn to_json(&self, clients: &[String]) -> Value {
        let associated: Vec<Value> = clients
            .iter()
            .map(|name| json!({"clientName": name}))
            .collect();

        json!({
            "clientGroupOperationType": 1,
            "clientGroupDetail": {
                "description": self.description,
                "isSmartClientGroup": false,
                "scgRule": {},
                "clientGroup": {"clientGroupName": self.name},
                "associatedClients": associated
            }
        })
    }
}
