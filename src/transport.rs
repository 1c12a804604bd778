//! Request/response value types and the HTTP capability behind them.
//!
//! [`FetchClient`] builds browser-like requests and hands them to a
//! [`Transport`]. The production transport is [`HttpTransport`] (reqwest,
//! redirects off, no automatic decompression); tests swap in a canned one.

use crate::config::{ArchiverConfig, CacheBusting};
use crate::error::TransportError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Header multimap that keeps names in first-seen order.
///
/// Lookups are case-insensitive; the spelling of the first occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, Vec<String>)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.0.push((name, vec![value])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// All values of a header joined with `", "`, or an empty string.
    pub fn line(&self, name: &str) -> String {
        self.get(name).map(|values| values.join(", ")).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of header names to value lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        headers.append(name.clone(), value);
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// An outbound request, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: Headers,
}

/// A response with its body exactly as it came off the wire.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// The capability of sending a [`Request`] and getting a [`Response`] back.
pub trait Transport {
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

/// reqwest-backed transport.
///
/// Built without reqwest's decompression features so bodies arrive still
/// encoded and [`crate::codec`] stays in charge of decoding.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ArchiverConfig) -> Result<Self, TransportError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .redirect(redirect)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let url = Url::parse(&request.url).map_err(|source| TransportError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(request.method.clone()))?;

        let response = self
            .client
            .request(method, url)
            .headers(to_header_map(&request.headers)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        ::log::debug!("{} {} -> {}", request.method, request.url, status);

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, values) in headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        for value in values {
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            map.append(header_name.clone(), header_value);
        }
    }
    Ok(map)
}

/// Builds browser-like GET requests and sends them through a [`Transport`].
#[derive(Debug, Clone)]
pub struct FetchClient<T> {
    transport: T,
    cache_busting: CacheBusting,
    user_agent: String,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, cache_busting: CacheBusting, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            cache_busting,
            user_agent: user_agent.into(),
        }
    }

    pub fn cache_busting(&self) -> &CacheBusting {
        &self.cache_busting
    }

    /// A GET request for `url` with cache busting and the browser header set.
    pub fn request(&self, url: &str) -> Result<Request, TransportError> {
        let parsed = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let headers = [
            ("User-Agent", self.user_agent.as_str()),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Accept-Encoding", "gzip, deflate, br"),
            ("Connection", "keep-alive"),
            ("Upgrade-Insecure-Requests", "1"),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "none"),
            ("Sec-Fetch-User", "?1"),
            ("Cache-Control", "max-age=0"),
        ]
        .into_iter()
        .collect();

        Ok(Request {
            method: "GET".to_string(),
            url: self.cache_busting.apply(&parsed),
            headers,
        })
    }

    pub async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.transport.send(request).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Serves canned responses keyed by URL with query and fragment removed.
    /// Unknown URLs answer `404`.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        routes: Arc<Mutex<HashMap<String, Response>>>,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, status: u16, headers: &[(&str, &str)], body: impl Into<Vec<u8>>) {
            let response = Response {
                status,
                headers: headers.iter().map(|(n, v)| (*n, *v)).collect(),
                body: body.into(),
            };
            self.routes.lock().unwrap().insert(route_key(url), response);
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn route_key(url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.to_string(),
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: &Request) -> Result<Response, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            let route = self.routes.lock().unwrap().get(&route_key(&request.url)).cloned();
            Ok(route.unwrap_or(Response {
                status: 404,
                headers: Headers::new(),
                body: Vec::new(),
            }))
        }
    }

    pub fn client(transport: MockTransport) -> FetchClient<MockTransport> {
        FetchClient::new(transport, CacheBusting::default(), "test-agent")
    }
}
