use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct ConnectParams {
    /// Principal id established by the upstream authentication step.
    pub(crate) user_id: Option<String>,
}

impl ConnectParams {
    /// The trimmed principal, or `None` when it is absent or blank.
    pub(crate) fn principal(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
    }
}
