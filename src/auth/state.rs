//! Shared settings for the authentication routes.

/// Server settings that affect how tokens reach the client.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Set the `Secure` attribute on the refresh cookie.
    pub secure_cookies: bool,
}
