// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

mod na_xml;

pub use na_xml::{req, resp};

use async_trait::async_trait;
use ontap_tracing::tracing;
pub use reqwest::Client;
use reqwest::header;
use resp::CallResult;
use std::{iter::FromIterator, str::FromStr, time::Duration};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum OntapiClientError {
    #[error("A request error has occured {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    QuickXmlError(#[from] quick_xml::Error),
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error("Malformed ONTAPI response: {0}")]
    MalformedResponse(String),
    #[error("Unknown {0} value: {1}")]
    UnknownVariant(&'static str, String),
    #[error("errno: {errno}, reason: {reason}")]
    Api { errno: String, reason: String },
}

/// Get a client that is able to make authenticated requests
/// against the controller
pub fn get_client(insecure: bool) -> Result<Client, OntapiClientError> {
    let headers = header::HeaderMap::from_iter(vec![(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/xml; charset=\"utf-8\""),
    )]);

    Client::builder()
        .timeout(Duration::from_secs(60))
        .default_headers(headers)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(OntapiClientError::Reqwest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Filer,
    Dfm,
    Netcache,
}

impl ServerType {
    fn servlet(self) -> &'static str {
        match self {
            Self::Filer => "XMLrequest_filer",
            Self::Dfm => "XMLrequest_dfm",
            Self::Netcache => "XMLrequest_netcache",
        }
    }
}

impl FromStr for ServerType {
    type Err = OntapiClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FILER" => Ok(Self::Filer),
            "DFM" => Ok(Self::Dfm),
            "NETCACHE" => Ok(Self::Netcache),
            _ => Err(OntapiClientError::UnknownVariant(
                "na_server_type",
                s.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Http,
    Https,
}

impl TransportType {
    fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
    fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl FromStr for TransportType {
    type Err = OntapiClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HTTP" => Ok(Self::Http),
            "HTTPS" => Ok(Self::Https),
            _ => Err(OntapiClientError::UnknownVariant(
                "na_transport_type",
                s.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// HTTP basic auth with the admin user and password.
    Login,
    /// Client-certificate auth; the handshake itself belongs to the
    /// transport, so no credentials are attached per request.
    Certificate,
}

impl FromStr for AuthStyle {
    type Err = OntapiClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOGIN" => Ok(Self::Login),
            "CERTIFICATE" => Ok(Self::Certificate),
            _ => Err(OntapiClientError::UnknownVariant("na_style", s.to_string())),
        }
    }
}

/// An ONTAPI session against one controller.
///
/// Covers the slice of the vendor SDK surface the facts module needs:
/// construct with the negotiated API version, adjust transport details
/// with the setters, then `invoke` named operations.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    host: String,
    major: u32,
    minor: u32,
    server_type: ServerType,
    transport_type: TransportType,
    port: Option<u16>,
    style: AuthStyle,
    user: String,
    password: String,
}

impl Session {
    pub fn new(client: Client, host: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            client,
            host: host.into(),
            major,
            minor,
            server_type: ServerType::Filer,
            transport_type: TransportType::Https,
            port: None,
            style: AuthStyle::Login,
            user: String::new(),
            password: String::new(),
        }
    }
    pub fn set_server_type(&mut self, x: ServerType) {
        self.server_type = x;
    }
    pub fn set_transport_type(&mut self, x: TransportType) {
        self.transport_type = x;
    }
    pub fn set_port(&mut self, x: u16) {
        self.port = Some(x);
    }
    pub fn set_style(&mut self, x: AuthStyle) {
        self.style = x;
    }
    pub fn set_admin_user(&mut self, user: &str, password: &str) {
        self.user = user.to_string();
        self.password = password.to_string();
    }

    fn version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| self.transport_type.default_port())
    }

    fn url(&self) -> Result<Url, OntapiClientError> {
        let x = format!(
            "{}://{}:{}/servlets/netapp.servlets.admin.{}",
            self.transport_type.scheme(),
            self.host,
            self.effective_port(),
            self.server_type.servlet()
        );

        Ok(Url::parse(&x)?)
    }
}

/// The seam between the collector and the wire. `Session` is the live
/// implementation; tests script their own.
#[async_trait(?Send)]
pub trait Invoke {
    async fn invoke(&self, op: &str) -> Result<CallResult, OntapiClientError>;
}

#[async_trait(?Send)]
impl Invoke for Session {
    /// Issue one parameterless operation.
    ///
    /// Connection-level failures (unreachable host, HTTP error status,
    /// unparsable body) come back as a failed `CallResult` with errno
    /// 13001, the channel the vendor SDK reports them on. An `Err` here
    /// means the request could not even be encoded.
    async fn invoke(&self, op: &str) -> Result<CallResult, OntapiClientError> {
        let body = req::encode_request(&self.version(), op)?;

        tracing::debug!(ontapi_req = %String::from_utf8_lossy(&body));

        let mut request = self.client.post(self.url()?).body(body);

        if let AuthStyle::Login = self.style {
            request = request.basic_auth(&self.user, Some(&self.password));
        }

        let resp = match request.send().await.and_then(|x| x.error_for_status()) {
            Ok(x) => x,
            Err(e) => return Ok(CallResult::local_failure(e.to_string())),
        };

        let body = match resp.text().await {
            Ok(x) => x,
            Err(e) => return Ok(CallResult::local_failure(e.to_string())),
        };

        tracing::trace!(xml = %body);

        match resp::parse_call(&body) {
            Ok(x) => Ok(x),
            Err(e) => Ok(CallResult::local_failure(e.to_string())),
        }
    }
}
