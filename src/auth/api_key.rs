use super::{AuthOutcome, AuthProvider};
use crate::dispatcher::RawRequest;
use tracing::debug;

/// Static pre-shared API key checked against a request header.
///
/// Suitable for internal services and test rigs; no claims are attached to
/// granted requests.
pub struct ApiKeyProvider {
    key: String,
    header_name: String,
}

impl ApiKeyProvider {
    /// Create a provider expecting the given key in the `x-api-key` header.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header_name: "x-api-key".to_string(),
        }
    }

    /// Configure the header the key is read from.
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }
}

impl AuthProvider for ApiKeyProvider {
    fn authenticate(&self, req: &RawRequest) -> anyhow::Result<AuthOutcome> {
        match req.get_header(&self.header_name) {
            Some(k) if k == self.key => Ok(AuthOutcome::Granted { user_info: None }),
            Some(_) => {
                debug!(header = %self.header_name, "API key mismatch");
                Ok(AuthOutcome::Unauthorized)
            }
            None => {
                debug!(header = %self.header_name, "API key header missing");
                Ok(AuthOutcome::Unauthorized)
            }
        }
    }
}
