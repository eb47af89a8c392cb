//! REST access to the device: schema, current values and writes.

use tracing::{debug, warn};

use ledpanel_core::{FieldDescriptor, PanelSettings};
use ledpanel_protocol::{
    decode_all_values, decode_schema, decode_set_response, AllValuesResponse, SetCommand,
    SetResponse,
};

use crate::error::ClientError;

/// HTTP client for `/all`, `/allvalues` and `/set`.
#[derive(Debug, Clone)]
pub struct DeviceApi {
    http: reqwest::Client,
    base_url: String,
}

impl DeviceApi {
    pub fn new(settings: &PanelSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: settings.http_base(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Fetch the field schema. Descriptors with an unknown type are skipped.
    pub async fn fetch_schema(&self) -> Result<Vec<FieldDescriptor>, ClientError> {
        let body = self.get_text("/all", &[]).await?;
        let schema = decode_schema(&body)?;

        for skipped in &schema.skipped {
            warn!(
                index = skipped.index,
                name = ?skipped.name,
                "Skipping field descriptor: {}",
                skipped.reason
            );
        }
        debug!(fields = schema.fields.len(), "Schema loaded");
        Ok(schema.fields)
    }

    /// Fetch the current value of every field.
    pub async fn fetch_values(&self) -> Result<AllValuesResponse, ClientError> {
        let body = self.get_text("/allvalues", &[]).await?;
        Ok(decode_all_values(&body)?)
    }

    /// Write one value. The reply body is optional.
    pub async fn set(&self, cmd: &SetCommand) -> Result<SetResponse, ClientError> {
        let body = self.get_text("/set", &cmd.query_pairs()).await?;
        Ok(decode_set_response(&body))
    }
}
