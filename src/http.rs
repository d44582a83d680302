use anyhow::{Context, Result, bail};
use reqwest::{
    Method, StatusCode, Url,
    blocking::Client,
    header::{self, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};
use thiserror::Error;

use crate::credential::Credential;

const USER_AGENT: &str = "UpdateBot";

/// Errors from a single HTTP exchange.
///
/// The status code is kept whenever the server answered so that callers can act on it even
/// if the body could not be decoded.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to send {method} request to {url}")]
    Send {
        method: Method,
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read response from {url} ({status})")]
    Read {
        url: Url,
        status: StatusCode,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} failed: {status}:\n{body}")]
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to decode response from {url} ({status})")]
    Decode {
        url: Url,
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Send { .. } => None,
            Self::Read { status, .. }
            | Self::Status { status, .. }
            | Self::Decode { status, .. } => Some(*status),
        }
    }
}

/// A decoded response together with its status code.
#[derive(Debug)]
pub struct Response<T> {
    pub status: StatusCode,
    pub body: T,
}

/// Username and password for HTTP Basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Extract Basic auth from a resolved credential.
    ///
    /// The username defaults to empty. A `token` field is accepted in place of `password`.
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        let username = credential.get_str("username").unwrap_or_default();
        let Some(password) = credential
            .get_str("password")
            .or_else(|| credential.get_str("token"))
        else {
            bail!("Credential has neither a password nor a token field")
        };

        Ok(Self {
            username: username.into(),
            password: password.into(),
        })
    }
}

/// Sends JSON requests and decodes JSON responses.
pub struct Gateway {
    client: Client,
}

impl Gateway {
    pub fn new() -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build the HTTP client")?;

        Ok(Self { client })
    }

    /// Issue a single request and decode the JSON response into `T`.
    ///
    /// With a body the request carries it as JSON, without one no payload is sent. Nothing is
    /// retried.
    pub fn request_json<T, B>(
        &self,
        method: &Method,
        url: &Url,
        auth: Option<&BasicAuth>,
        body: Option<&B>,
    ) -> Result<Response<T>, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(auth) = auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let res = builder.send().map_err(|source| HttpError::Send {
            method: method.clone(),
            url: url.clone(),
            source,
        })?;
        let status = res.status();
        log::debug!("{method} {url}: {status}");

        let text = res.text().map_err(|source| HttpError::Read {
            url: url.clone(),
            status,
            source,
        })?;

        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.clone(),
                status,
                body: text,
            });
        }

        let body = serde_json::from_str(&text).map_err(|source| HttpError::Decode {
            url: url.clone(),
            status,
            source,
        })?;

        Ok(Response { status, body })
    }

    /// Same as [`Self::request_json`] but the response body is discarded.
    pub fn request<B>(
        &self,
        method: &Method,
        url: &Url,
        auth: Option<&BasicAuth>,
        body: Option<&B>,
    ) -> Result<StatusCode, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.request_json::<IgnoredAny, B>(method, url, auth, body)
            .map(|response| response.status)
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        auth: Option<&BasicAuth>,
    ) -> Result<Response<T>, HttpError> {
        self.request_json::<T, ()>(&Method::GET, url, auth, None)
    }
}
