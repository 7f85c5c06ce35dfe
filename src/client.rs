//! Blocking HTTP client for the mapping backend.
//!
//! - `ureq` agent, no async.
//! - Endpoints: `GET/POST /mapping`, `GET /mapping/load`, `POST /mapping/save`
//!   and the admin-scoped `GET /users`.
//! - Non-2xx answers become [`MappingClientError::Http`] carrying the server's
//!   `{ "error": ... }` message when there is one.

use crate::compression::{self, EnvelopeError};
use crate::models::account::UserRecord;
use crate::models::mapping::{DeviceEntry, MappingSnapshot};
use http::StatusCode;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug)]
pub enum MappingClientError {
    Transport(String),
    Http { status: u16, message: String },
    Json(serde_path_to_error::Error<serde_json::Error>),
    Envelope(EnvelopeError),
}

impl MappingClientError {
    /// Text for the editor's status line: the server's own message where it
    /// sent one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            MappingClientError::Http { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

impl core::fmt::Display for MappingClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MappingClientError::Transport(s) => write!(f, "transport error: {}", s),
            MappingClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            MappingClientError::Json(e) => write!(f, "json error at {}: {}", e.path(), e.inner()),
            MappingClientError::Envelope(e) => write!(f, "envelope error: {}", e),
        }
    }
}

impl std::error::Error for MappingClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MappingClientError::Json(e) => Some(e),
            MappingClientError::Envelope(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EnvelopeError> for MappingClientError {
    fn from(value: EnvelopeError) -> Self {
        MappingClientError::Envelope(value)
    }
}

impl From<ureq::Error> for MappingClientError {
    fn from(value: ureq::Error) -> Self {
        MappingClientError::Transport(value.to_string())
    }
}

/// Persistence seam between the editing session and the backend.
#[cfg_attr(test, mockall::automock)]
pub trait MappingGateway {
    /// `GET /mapping`: the flat device list.
    fn fetch_devices(&self) -> Result<Vec<DeviceEntry>, MappingClientError>;
    /// `POST /mapping`.
    fn store_devices(&self, devices: &[DeviceEntry]) -> Result<(), MappingClientError>;
    /// `GET /mapping/load`, compressed or not.
    fn load_snapshot(&self) -> Result<MappingSnapshot, MappingClientError>;
    /// `POST /mapping/save`.
    fn save_snapshot(&self, snapshot: &MappingSnapshot) -> Result<(), MappingClientError>;
    /// `GET /users` as admin.
    fn fetch_users(&self) -> Result<Vec<UserRecord>, MappingClientError>;
}

pub struct MappingClient {
    agent: ureq::Agent,
    base_url: String,
}

impl MappingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        MappingClient {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn get_text(&self, path: &str, headers: &[(&str, &str)]) -> Result<String, MappingClientError> {
        let url = self.url(path);
        let mut req = self.agent.get(&url).header("Accept", "application/json");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        debug!("GET {}", url);
        let mut res = req.call()?;
        let status = res.status();
        let body = res.body_mut().read_to_string()?;
        check_status(status, body)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, headers: &[(&str, &str)]) -> Result<T, MappingClientError> {
        let body = self.get_text(path, headers)?;
        decode_json(&body)
    }

    fn post_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), MappingClientError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let mut res = self
            .agent
            .post(&url)
            .header("Accept", "application/json")
            .send_json(body)?;
        let status = res.status();
        let text = res.body_mut().read_to_string()?;
        check_status(status, text).map(|_| ())
    }
}

impl MappingGateway for MappingClient {
    fn fetch_devices(&self) -> Result<Vec<DeviceEntry>, MappingClientError> {
        let body: DeviceListBody = self.get_json("/mapping", &[])?;
        Ok(body.into_devices())
    }

    fn store_devices(&self, devices: &[DeviceEntry]) -> Result<(), MappingClientError> {
        self.post_json("/mapping", devices)
    }

    fn load_snapshot(&self) -> Result<MappingSnapshot, MappingClientError> {
        let body = self.get_text("/mapping/load", &[])?;
        Ok(compression::decode_load_body(&body)?)
    }

    fn save_snapshot(&self, snapshot: &MappingSnapshot) -> Result<(), MappingClientError> {
        self.post_json("/mapping/save", snapshot)
    }

    fn fetch_users(&self) -> Result<Vec<UserRecord>, MappingClientError> {
        self.get_json("/users", &[("X-Role", "admin")])
    }
}

/// `GET /mapping` answers with a bare array; older backends wrap it.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceListBody {
    List(Vec<DeviceEntry>),
    Wrapped { devices: Vec<DeviceEntry> },
}

impl DeviceListBody {
    fn into_devices(self) -> Vec<DeviceEntry> {
        match self {
            DeviceListBody::List(d) | DeviceListBody::Wrapped { devices: d } => d,
        }
    }
}

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, MappingClientError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(MappingClientError::Json)
}

fn check_status(status: StatusCode, body: String) -> Result<String, MappingClientError> {
    if status.is_success() {
        return Ok(body);
    }
    Err(MappingClientError::Http {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// The `error` field of a JSON error body, else the raw body (possibly empty).
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) => e.error,
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mapping::DeviceType;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serve one canned HTTP response on a local port, after reading the whole request.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&request) {
                let n = stream.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).expect("write response");
        });
        format!("http://{}", addr)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    #[test]
    fn server_error_field_becomes_message() {
        let body = r#"{"error":"Device limit exceeded"}"#.to_string();
        let err = check_status(StatusCode::BAD_REQUEST, body).expect_err("400");
        assert_eq!(err.user_message(), Some("Device limit exceeded"));
        assert_eq!(err.to_string(), "http 400: Device limit exceeded");
    }

    #[test]
    fn non_json_error_body_is_kept() {
        let err = check_status(StatusCode::BAD_GATEWAY, "Bad Gateway\n".to_string()).expect_err("502");
        assert_eq!(err.user_message(), Some("Bad Gateway"));
        let err = check_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()).expect_err("500");
        assert!(matches!(err, MappingClientError::Http { status: 500, .. }));
        assert_eq!(err.user_message(), None);
    }

    #[test]
    fn success_passes_body_through() {
        assert_eq!(check_status(StatusCode::NO_CONTENT, String::new()).expect("204"), "");
    }

    #[test]
    fn device_list_accepts_both_shapes() {
        let bare: DeviceListBody = decode_json(r#"[{"id":"m1","type":"motion"}]"#).expect("bare");
        let wrapped: DeviceListBody = decode_json(r#"{"devices":[{"id":"m1","type":"motion"}]}"#).expect("wrapped");
        let bare = bare.into_devices();
        assert_eq!(bare, wrapped.into_devices());
        assert_eq!(bare[0].device_type, DeviceType::Motion);
    }

    #[test]
    fn users_decode_with_path_errors() {
        let users: Vec<UserRecord> =
            decode_json(r#"[{"username":"a","role":"admin","subscription_tier":"basic","declared_sqft":1200}]"#)
                .expect("users");
        assert_eq!(users[0].declared_sqft, Some(1200.0));

        let err = decode_json::<Vec<UserRecord>>(r#"[{"declared_sqft":"lots"}]"#).expect_err("bad sqft");
        assert!(err.to_string().contains("[0].declared_sqft"), "{}", err);
    }

    #[test]
    fn post_error_body_reaches_message() {
        let body = r#"{"error":"Device limit exceeded"}"#;
        let response = "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nContent-Length: 33\r\nConnection: close\r\n\r\n{\"error\":\"Device limit exceeded\"}";
        assert_eq!(body.len(), 33);
        let client = MappingClient::new(serve_once(response), Duration::from_secs(5));
        let err = client.store_devices(&[]).expect_err("400");
        assert_eq!(err.user_message(), Some("Device limit exceeded"));
    }

    #[test]
    fn truncated_post_body_is_a_transport_error() {
        // Declares 64 body bytes, sends 9, then closes.
        let response = "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"error\":";
        let client = MappingClient::new(serve_once(response), Duration::from_secs(5));
        let err = client.save_snapshot(&MappingSnapshot::default()).expect_err("truncated");
        assert!(matches!(err, MappingClientError::Transport(_)), "{:?}", err);
    }

    #[test]
    fn base_url_is_normalised() {
        let client = MappingClient::new("http://localhost:8000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("mapping"), "http://localhost:8000/mapping");
        assert_eq!(client.url("/mapping/save"), "http://localhost:8000/mapping/save");
    }
}
