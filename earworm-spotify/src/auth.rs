use serde::Deserialize;

use crate::{Client, ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

impl Client {
    /// Exchange the client id and secret for a short-lived bearer token.
    /// A non-success status is fatal for the fetch that requested it.
    pub(crate) async fn access_token(&self) -> ClientResult<String> {
        let response = self
            .client
            .post(Self::TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthFailed {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let token: AccessTokenResponse = serde_json::from_slice(&bytes)?;
        Ok(token.access_token)
    }
}
