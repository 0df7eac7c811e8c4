use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Body of the broadcast relay contract, as posted by other processes.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct BroadcastParams {
    #[serde(alias = "roomName")]
    pub(crate) room_name: String,
    #[serde(alias = "eventName")]
    pub(crate) event_name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub(crate) data: Value,
    #[serde(default, alias = "authToken")]
    pub(crate) auth_token: Option<String>,
}
