//! Subsonic REST transport backed by reqwest

use futures::FutureExt;
use reqwest::{Client, Url};
use tracing::debug;

use super::{PendingCall, Transport, TransportError};
use crate::config::{AuthMethod, ServerConfig};

/// Issues `GET <server>/rest/<endpoint>.view` calls
pub struct SubsonicTransport {
    base_url: String,
    username: String,
    password: String,
    auth_method: AuthMethod,
    client_name: String,
    api_version: String,
    http: Client,
}

impl SubsonicTransport {
    /// Create a transport from server configuration
    ///
    /// Resolves the password up front so every call can authenticate.
    pub fn from_config(config: &ServerConfig) -> Result<Self, TransportError> {
        debug!(url = %config.url, username = %config.username, auth_method = ?config.auth_method, "from_config: called");
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let password = config
            .get_password()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(TransportError::Network)?;

        Ok(Self {
            base_url,
            username: config.username.clone(),
            password,
            auth_method: config.auth_method,
            client_name: config.client_name.clone(),
            api_version: config.api_version.clone(),
            http,
        })
    }

    /// Full URL for an endpoint, without the query string
    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/rest/{}.view", self.base_url, endpoint)
    }

    /// Common parameters sent with every call: client, version, format, auth
    fn base_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("c".to_string(), self.client_name.clone()),
            ("v".to_string(), self.api_version.clone()),
            ("f".to_string(), "json".to_string()),
            ("u".to_string(), self.username.clone()),
        ];
        params.extend(auth_params(self.auth_method, &self.password));
        params
    }
}

/// Authentication parameters for the chosen scheme
fn auth_params(method: AuthMethod, password: &str) -> Vec<(String, String)> {
    match method {
        AuthMethod::Token => {
            let salt = make_salt();
            let token = format!("{:x}", md5::compute(format!("{}{}", password, salt)));
            vec![("t".to_string(), token), ("s".to_string(), salt)]
        }
        AuthMethod::Hex => vec![("p".to_string(), format!("enc:{}", to_hex(password.as_bytes())))],
        AuthMethod::Plain => vec![("p".to_string(), password.to_string())],
    }
}

fn make_salt() -> String {
    to_hex(&rand::random::<[u8; 8]>())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl Transport for SubsonicTransport {
    fn issue(&self, endpoint: &str, params: Vec<(String, String)>) -> PendingCall {
        let url = self.endpoint_url(endpoint);
        debug!(%url, param_count = params.len(), "SubsonicTransport::issue: called");

        let mut query = self.base_params();
        query.extend(params);
        let request = self.http.get(url).query(&query);

        async move {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();
            debug!(%status, body_len = body.len(), "SubsonicTransport::issue: reply received");

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(auth_method: AuthMethod) -> ServerConfig {
        ServerConfig {
            url: "https://music.example.com/".to_string(),
            username: "alice".to_string(),
            password: Some("sesame".to_string()),
            auth_method,
            ..Default::default()
        }
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_endpoint_url_strips_trailing_slash() {
        let transport = SubsonicTransport::from_config(&server(AuthMethod::Plain)).unwrap();
        assert_eq!(
            transport.endpoint_url("scrobble"),
            "https://music.example.com/rest/scrobble.view"
        );
    }

    #[test]
    fn test_base_params_order() {
        let transport = SubsonicTransport::from_config(&server(AuthMethod::Plain)).unwrap();
        let params = transport.base_params();
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["c", "v", "f", "u", "p"]);
        assert_eq!(value(&params, "f"), Some("json"));
        assert_eq!(value(&params, "p"), Some("sesame"));
    }

    #[test]
    fn test_token_auth_matches_salt() {
        let params = auth_params(AuthMethod::Token, "sesame");
        let salt = value(&params, "s").unwrap();
        let token = value(&params, "t").unwrap();

        assert_eq!(salt.len(), 16);
        assert_eq!(token, format!("{:x}", md5::compute(format!("sesame{}", salt))));
        assert!(value(&params, "p").is_none());
    }

    #[test]
    fn test_token_salt_changes_per_call() {
        let a = auth_params(AuthMethod::Token, "sesame");
        let b = auth_params(AuthMethod::Token, "sesame");
        assert_ne!(value(&a, "s"), value(&b, "s"));
    }

    #[test]
    fn test_hex_auth() {
        let params = auth_params(AuthMethod::Hex, "sesame");
        assert_eq!(value(&params, "p"), Some("enc:736573616d65"));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = ServerConfig {
            url: "::nope::".to_string(),
            ..server(AuthMethod::Plain)
        };
        assert!(matches!(
            SubsonicTransport::from_config(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_config_requires_password() {
        let config = ServerConfig {
            password: None,
            ..server(AuthMethod::Token)
        };
        assert!(matches!(
            SubsonicTransport::from_config(&config),
            Err(TransportError::Config(_))
        ));
    }
}
