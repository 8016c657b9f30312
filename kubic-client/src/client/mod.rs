//! The transport adapter over the apiserver connection.
//!
//! [`Client`] performs single request-response exchanges against the
//! configured service stack and decodes the results: typed objects, the
//! object-or-status sum for deletes, raw text, byte streams for logs, and
//! line-framed event streams for watches. It holds no per-resource state;
//! the typed [`ResourceClient`](crate::api::ResourceClient) layers dispatch
//! on top.
use std::time::Duration;

use bytes::Bytes;
use either::{Either, Left, Right};
use futures::{Stream, StreamExt, TryStream, TryStreamExt};
use http::{self, HeaderMap, Request, Response, StatusCode};
use hyper::Body;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    io::StreamReader,
};
use tower::{buffer::Buffer, util::BoxService, BoxError, Layer, Service, ServiceExt};
use tower_http::map_response_body::MapResponseBodyLayer;

use crate::{
    error::{classify, ApiError, MalformedResponse},
    Error, Result, TransportConfig,
};
use kubic_core::{response::Status, watch::WatchEvent, ErrorResponse};

mod body;
use body::BodyStreamExt;
mod stack;
pub use stack::{default_stack, GenericService};
pub mod tls;

/// Client for a single apiserver.
///
/// Cheap to clone; all clones share one buffered service (and therefore one
/// connection pool). Construct it from a [`TransportConfig`] for the default
/// hyper/rustls stack, or from any tower service for tests and custom
/// middleware.
#[derive(Clone)]
pub struct Client {
    // Buffer for cheap clones, BoxService for a nameable future type
    inner: Buffer<BoxService<Request<Body>, Response<Body>, BoxError>, Request<Body>>,
    default_ns: String,
}

impl Client {
    /// Create a [`Client`] over a custom service stack.
    pub fn new<S, B, T>(service: S, default_namespace: T) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<BoxError>,
        T: Into<String>,
    {
        // normalize whatever body the stack produces back into hyper::Body
        let service = MapResponseBodyLayer::new(|b: B| Body::wrap_stream(b.into_stream()))
            .layer(service)
            .map_err(|e| e.into());
        Self {
            inner: Buffer::new(BoxService::new(service), 1024),
            default_ns: default_namespace.into(),
        }
    }

    /// The namespace used by handles constructed without an explicit one
    pub fn default_namespace(&self) -> &str {
        &self.default_ns
    }

    /// Perform a raw request and return the raw response.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut svc = self.inner.clone();
        let res = svc
            .ready()
            .await
            .map_err(Error::Service)?
            .call(request)
            .await
            .map_err(|err| {
                // middleware errors carry our own type; hyper errors are
                // transport failures; anything else stays type-erased
                err.downcast::<Error>()
                    .map(|e| *e)
                    .or_else(|err| err.downcast::<hyper::Error>().map(|err| Error::Transport(*err)))
                    .unwrap_or_else(Error::Service)
            })?;
        Ok(res)
    }

    /// Perform a request and decode the response as JSON into `T`.
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("failed to decode response: {}", e);
            Error::MalformedResponse(MalformedResponse::new(e, &text))
        })
    }

    /// Perform a request and return the response body as text.
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        let verb = verb_of(&request);
        let path = request.uri().path().to_string();
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        let retry_after = parse_retry_after(res.headers());
        let body_bytes = hyper::body::to_bytes(res.into_body())
            .await
            .map_err(Error::Transport)?;
        let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
        handle_api_errors(&text, status, retry_after, verb, path)?;

        Ok(text)
    }

    /// Perform a request and return the response body as a byte stream.
    ///
    /// Used for log fetches with `follow=true`; the stream ends when the
    /// server closes the response.
    pub async fn request_text_stream(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let verb = verb_of(&request);
        let path = request.uri().path().to_string();
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            let retry_after = parse_retry_after(res.headers());
            let body_bytes = hyper::body::to_bytes(res.into_body())
                .await
                .map_err(Error::Transport)?;
            let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
            return Err(api_error(&text, status, retry_after, verb, path));
        }
        Ok(res.into_body().map_err(Error::Transport))
    }

    /// Perform a request and decode the response either into `T` or into a
    /// [`Status`] acknowledgement, depending on the `kind` of the body.
    pub async fn request_status<T>(&self, request: Request<Vec<u8>>) -> Result<Either<T, Status>>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        let v: Value = serde_json::from_str(&text)
            .map_err(|e| Error::MalformedResponse(MalformedResponse::new(e, &text)))?;
        if v["kind"] == "Status" {
            tracing::trace!("status from {}", text);
            Ok(Right(serde_json::from_str::<Status>(&text).map_err(|e| {
                Error::MalformedResponse(MalformedResponse::new(e, &text))
            })?))
        } else {
            Ok(Left(serde_json::from_str::<T>(&text).map_err(|e| {
                Error::MalformedResponse(MalformedResponse::new(e, &text))
            })?))
        }
    }

    /// Perform a watch request and return a stream of [`WatchEvent`]s.
    ///
    /// The response body is consumed one newline-delimited JSON object at a
    /// time; nothing is buffered beyond the current line.
    pub async fn request_events<T>(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl TryStream<Item = Result<WatchEvent<T>>>>
    where
        T: Clone + DeserializeOwned,
    {
        let verb = verb_of(&request);
        let path = request.uri().path().to_string();
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            let retry_after = parse_retry_after(res.headers());
            let body_bytes = hyper::body::to_bytes(res.into_body())
                .await
                .map_err(Error::Transport)?;
            let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
            return Err(api_error(&text, status, retry_after, verb, path));
        }
        tracing::trace!("streaming from {}", path);

        let frames = FramedRead::new(
            StreamReader::new(res.into_body().map_err(|e| {
                // our own client read timeout; ignored by the decode loop
                if e.is_timeout() {
                    return std::io::Error::new(std::io::ErrorKind::TimedOut, e);
                }
                // chunked decoder EOF, common when watches outlive 300s
                if e.to_string().contains("unexpected EOF during chunk") {
                    return std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e);
                }
                std::io::Error::new(std::io::ErrorKind::Other, e)
            })),
            LinesCodec::new(),
        );

        Ok(frames.filter_map(move |res| {
            let path = path.clone();
            async move {
                match res {
                    Ok(line) => match serde_json::from_str::<WatchEvent<T>>(&line) {
                        Ok(event) => Some(Ok(event)),
                        Err(e) => {
                            // incomplete trailing line from decode_eof
                            if e.is_eof() {
                                return None;
                            }
                            // a bare error body outside the event framing
                            if let Ok(e_resp) = serde_json::from_str::<ErrorResponse>(&line) {
                                let kind = classify(e_resp.code, Some(&e_resp), None);
                                return Some(Err(Error::Api(ApiError {
                                    kind,
                                    code: e_resp.code,
                                    status: Some(e_resp),
                                    verb,
                                    path,
                                })));
                            }
                            Some(Err(Error::MalformedResponse(MalformedResponse::new(e, &line))))
                        }
                    },
                    Err(LinesCodecError::Io(e)) => match e.kind() {
                        std::io::ErrorKind::TimedOut => {
                            tracing::warn!("timeout in poll: {}", e);
                            None
                        }
                        std::io::ErrorKind::UnexpectedEof => {
                            tracing::warn!("eof in poll: {}", e);
                            None
                        }
                        _ => Some(Err(Error::ReadEvents(e))),
                    },
                    Err(LinesCodecError::MaxLineLengthExceeded) => Some(Err(Error::ReadEvents(
                        std::io::Error::new(std::io::ErrorKind::Other, "max line length exceeded"),
                    ))),
                }
            }
        }))
    }
}

fn verb_of(request: &Request<Vec<u8>>) -> &'static str {
    request.extensions().get::<&'static str>().copied().unwrap_or("request")
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn api_error(
    text: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    verb: &'static str,
    path: String,
) -> Error {
    let body = match serde_json::from_str::<ErrorResponse>(text) {
        Ok(errdata) => {
            tracing::debug!("unsuccessful: {:?}", errdata);
            Some(errdata)
        }
        Err(_) => {
            tracing::warn!("unsuccessful, and error data failed to parse: {}", text);
            None
        }
    };
    Error::Api(ApiError {
        kind: classify(status.as_u16(), body.as_ref(), retry_after),
        code: status.as_u16(),
        status: body,
        verb,
        path,
    })
}

// Returns Ok for 2xx, a classified error otherwise.
fn handle_api_errors(
    text: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    verb: &'static str,
    path: String,
) -> Result<()> {
    if status.is_client_error() || status.is_server_error() {
        Err(api_error(text, status, retry_after, verb, path))
    } else {
        Ok(())
    }
}

impl TryFrom<TransportConfig> for Client {
    type Error = Error;

    /// Build a client over the default stack from resolved transport settings
    fn try_from(config: TransportConfig) -> Result<Self> {
        let default_ns = config.default_namespace.clone();
        let service = stack::default_stack(config)?;
        Ok(Client::new(service, default_ns))
    }
}
