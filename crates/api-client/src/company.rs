//! Company profile shown in the dashboard header and settings page

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, RequestOptions};
use crate::error::Result;

/// Company owning the dashboard account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_mail: Option<String>,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_mail: Option<String>,
}

impl CompanyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ApiClient {
    /// `GET /company`
    pub async fn fetch_company(&self) -> Result<Company> {
        self.get("/company", RequestOptions::new()).await
    }

    /// `PUT /company/<id>` with the changed fields; returns the stored company.
    pub async fn update_company(&self, id: &str, changes: &CompanyUpdate) -> Result<Company> {
        self.put(&format!("/company/{id}"), changes, RequestOptions::new()).await
    }
}
