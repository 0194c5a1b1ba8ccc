#[derive(Debug)]
/// An error that can occur when interacting with the client.
pub enum ClientError {
    /// An error that occurred when making a request.
    ReqwestError(reqwest::Error),
    /// An error that occurred when deserializing a response.
    DeserializationError(serde_json::Error),
    /// The token endpoint rejected the client-credentials exchange.
    AuthFailed {
        /// The HTTP status the token endpoint returned.
        status: u16,
    },
}
impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ReqwestError(e) => write!(f, "Reqwest error: {e}"),
            ClientError::DeserializationError(e) => write!(f, "Deserialization error: {e}"),
            ClientError::AuthFailed { status } => {
                write!(f, "Fetching access token failed: HTTP {status}")
            }
        }
    }
}
impl std::error::Error for ClientError {}
impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::ReqwestError(e)
    }
}
impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::DeserializationError(e)
    }
}
/// A result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// A client for the Spotify Web API.
pub struct Client {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) client: reqwest::Client,
}
impl Client {
    /// Base URL of the Web API.
    pub const API_BASE_URL: &str = "https://api.spotify.com/v1";
    /// URL of the client-credentials token endpoint.
    pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

    /// Create a new client from an application's client id and secret.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client: reqwest::Client::new(),
        }
    }
}
