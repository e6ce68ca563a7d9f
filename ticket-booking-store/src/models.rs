use serde::{Deserialize, Serialize};

use crate::UserId;

/// Value written to a multi-value lookup column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupIds {
    pub results: Vec<UserId>,
}

/// One entry of an expanded lookup column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LookupValue {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(rename = "Title")]
    pub title: String,
}

/// Hyperlink column value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ItemCollection {
    pub value: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct EnsuredUser {
    #[serde(rename = "Id")]
    pub id: UserId,
}

#[derive(Deserialize, Debug)]
pub(crate) struct UploadedFile {
    #[serde(rename = "ServerRelativeUrl")]
    pub server_relative_url: String,
}
