//! Assembly of the default service stack.
use http::{header::HeaderValue, uri::PathAndQuery, Request, Response};
use hyper::{client::HttpConnector, Body};
use hyper_timeout::TimeoutConnector;
use secrecy::ExposeSecret;
use tower::{util::BoxService, BoxError, ServiceBuilder};
use tower_http::{map_response_body::MapResponseBodyLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer};

use super::body::BodyStreamExt;
use super::tls;
use crate::{Error, Result, TransportConfig};

/// The boxed service type produced by [`default_stack`].
pub type GenericService = BoxService<Request<Body>, Response<Body>, BoxError>;

/// Assemble the default hyper/rustls stack from resolved transport settings.
///
/// Connections go through a rustls https connector built from the configured
/// trust anchors and client identity, bounded by the connect and read
/// timeouts. Outgoing requests are anchored on the cluster url and stamped
/// with the user agent and bearer token. Callers wanting a different stack
/// assemble their own tower service and hand it to
/// [`Client::new`](crate::Client::new) instead.
pub fn default_stack(config: TransportConfig) -> Result<GenericService> {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);

    let tls = tls::rustls_client_config(&config).map_err(Error::Tls)?;
    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(connector);

    let mut connector = TimeoutConnector::new(https);
    connector.set_connect_timeout(config.connect_timeout);
    connector.set_read_timeout(config.read_timeout);

    let client: hyper::Client<_, Body> = hyper::Client::builder().build(connector);

    let user_agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|e| Error::HttpError(e.into()))?;
    let auth_header = config
        .bearer_token
        .as_ref()
        .map(|token| {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::HttpError(e.into()))?;
            value.set_sensitive(true);
            Ok::<_, Error>(value)
        })
        .transpose()?;

    // the request builder emits bare api paths; everything leaving the
    // stack gets anchored on the cluster url
    let cluster_url = config.cluster_url;
    let stack = ServiceBuilder::new()
        .map_request(move |req: Request<Body>| {
            let (mut parts, body) = req.into_parts();
            parts.uri = within_cluster(&cluster_url, parts.uri.path_and_query());
            Request::from_parts(parts, body)
        })
        .layer(SetRequestHeaderLayer::if_not_present(
            http::header::USER_AGENT,
            user_agent,
        ))
        .option_layer(auth_header.map(|value| {
            SetRequestHeaderLayer::if_not_present(http::header::AUTHORIZATION, value)
        }))
        .layer(MapResponseBodyLayer::new(
            |b: tower_http::trace::ResponseBody<_, _, _, _, _>| Body::wrap_stream(b.into_stream()),
        ))
        .layer(TraceLayer::new_for_http())
        .map_err(BoxError::from)
        .service(client);

    Ok(BoxService::new(stack))
}

// Anchor a request path on the cluster url. A path on the cluster url
// itself is kept as a prefix, for apiservers mounted behind a routing
// frontend.
fn within_cluster(cluster_url: &http::Uri, pandq: Option<&PathAndQuery>) -> http::Uri {
    let mut target = String::new();
    if let (Some(scheme), Some(authority)) = (cluster_url.scheme_str(), cluster_url.authority()) {
        target.push_str(scheme);
        target.push_str("://");
        target.push_str(authority.as_str());
    }
    target.push_str(cluster_url.path().trim_end_matches('/'));
    if let Some(pandq) = pandq {
        target.push_str(pandq.as_str());
    }
    // both halves were already valid uris, so the concatenation parses
    target.parse().expect("anchored uri")
}

#[cfg(test)]
mod test {
    use super::within_cluster;

    #[test]
    fn request_paths_are_anchored_on_the_cluster_url() {
        let cluster = http::Uri::from_static("https://172.20.0.1:6443");
        let req = http::Uri::from_static("/api/v1/pods?watch=true");
        assert_eq!(
            within_cluster(&cluster, req.path_and_query()),
            "https://172.20.0.1:6443/api/v1/pods?watch=true"
        );
    }

    #[test]
    fn cluster_url_path_prefixes_survive() {
        let cluster = http::Uri::from_static("https://gateway.example.com/clusters/prod/");
        let req = http::Uri::from_static("/apis/apps/v1/deployments");
        assert_eq!(
            within_cluster(&cluster, req.path_and_query()),
            "https://gateway.example.com/clusters/prod/apis/apps/v1/deployments"
        );
    }

    #[test]
    fn requests_without_a_path_resolve_to_the_cluster_url() {
        let cluster = http::Uri::from_static("https://172.20.0.1:6443/prefix");
        assert_eq!(
            within_cluster(&cluster, None),
            "https://172.20.0.1:6443/prefix"
        );
    }
}
