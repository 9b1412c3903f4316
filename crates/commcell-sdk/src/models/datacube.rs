//! Datacube types.

use serde_json::{json, Value};

const SEDS_TYPES: [&str; 44] = [
    "NONE",
    "jdbc",
    "web",
    "exe",
    "csv",
    "file",
    "nas",
    "eloqua",
    "salesforce",
    "ldap",
    "federated",
    "blank",
    "http",
    "camel",
    "facebook",
    "fla",
    "edge",
    "exchange",
    "reviewset",
    "twitter",
    "complianceaudit",
    "fsindex",
    "nfs",
    "cloudoracle",
    "systemdefault",
    "downloadcenteraudit",
    "vm",
    "onedrive",
    "sharepoint",
    "email",
    "dbanalysis",
    "cloudpaas",
    "googledrive",
    "gmail",
    "activedirectory",
    "onedriveindex",
    "multinodefederated",
    "dynamic365",
    "idxlogs",
    "teams",
    "cloudstorage",
    "gmailV2",
    "googledriveV2",
    "asset",
];

/// Name of a datasource type code, e.g. `5` is `"file"`.
#[must_use]
pub fn datasource_type_name(code: u64) -> Option<&'static str> {
    usize::try_from(code)
        .ok()
        .and_then(|i| SEDS_TYPES.get(i))
        .copied()
}

/// Request to create a datasource.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceCreate {
    /// Datasource name. Names are case sensitive.
    pub name: String,
    /// Analytics engine client or engine name.
    pub analytics_engine: String,
    /// Datasource type code as a string, e.g. `"5"` for file.
    pub datasource_type: String,
    /// Extra datasource properties, sent as given.
    pub properties: Option<Vec<Value>>,
}

impl DatasourceCreate {
    /// Creates a request.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        analytics_engine: impl Into<String>,
        datasource_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            analytics_engine: analytics_engine.into(),
            datasource_type: datasource_type.into(),
            properties: None,
        }
    }

    /// Adds a `{propertyName, propertyValue}` property.
    #[must_use]
    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties
            .get_or_insert_with(Vec::new)
            .push(json!({"propertyName": name, "propertyValue": value}));
        self
    }

    pub(crate) fn to_json(&self, cloud_id: &Value) -> Value {
        let mut body = json!({
            "collectionReq": {
                "collectionName": self.name,
                "ciserver": {"cloudID": cloud_id}
            },
            "dataSource": {
                "description": "",
                "datasourceType": self.datasource_type,
                "attribute": 0,
                "datasourceName": self.name
            }
        });
        if let Some(properties) = &self.properties {
            body["dataSource"]["properties"] = json!(properties);
        }
        body
    }
}
