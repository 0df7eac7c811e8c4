use serde::Serialize;
pub(crate) mod broadcast_controller;
pub(crate) mod health_check_controller;
pub(crate) mod status_controller;
pub(crate) mod websocket_controller;

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self {
            status_code,
            data: Some(data),
        }
    }

    pub fn no_content(status_code: u16) -> ApiResponse<()> {
        ApiResponse {
            status_code,
            data: None,
        }
    }
}
