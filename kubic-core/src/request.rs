//! Assembly of http requests from a verb, a descriptor and per-call options.
use std::sync::Arc;

use thiserror::Error;

use crate::{
    descriptor::ResourceDescriptor,
    params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, WatchParams},
    paths::{self, NamespaceSelector},
};

pub(crate) const JSON_MIME: &str = "application/json";
/// Accept header for watch calls, negotiating a newline-delimited JSON stream.
pub(crate) const JSON_STREAM_MIME: &str = "application/json;stream=watch";

/// Possible errors when building a request.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build the http request.
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] http::Error),
    /// Failed to serialize the request body.
    #[error("failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),
    /// The requested operation cannot be expressed against this resource.
    ///
    /// Raised before any network traffic: missing names, unregistered
    /// subresources, selector grammar violations, out-of-range options and
    /// cross-namespace writes all land here.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Convenient alias for request building results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A request builder bound to one resource and one namespace selection.
///
/// Carries no verb state; each method assembles one complete
/// `http::Request` from the descriptor's path coordinates plus the caller's
/// options. Capability enforcement happens a layer above, in the dispatch
/// handle.
#[derive(Debug, Clone)]
pub struct Request {
    descriptor: Arc<ResourceDescriptor>,
    namespace: NamespaceSelector,
}

impl Request {
    /// Bind a builder to a descriptor and namespace selection.
    pub fn new(descriptor: Arc<ResourceDescriptor>, namespace: NamespaceSelector) -> Self {
        Request {
            descriptor,
            namespace,
        }
    }

    /// The descriptor this builder addresses
    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    /// The namespace selection this builder addresses
    pub fn namespace(&self) -> &NamespaceSelector {
        &self.namespace
    }

    fn collection_url(&self) -> Result<String> {
        paths::collection_path(&self.descriptor, &self.namespace)
    }

    fn named_url(&self, name: &str) -> Result<String> {
        paths::named_path(&self.descriptor, &self.namespace, name)
    }

    fn subresource_url(&self, subresource: &str, name: &str) -> Result<String> {
        paths::subresource_path(&self.descriptor, &self.namespace, name, subresource)
    }
}

/// Convenience methods found from API conventions
impl Request {
    /// Get a single object by name
    pub fn get(&self, name: &str, gp: &GetParams) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.named_url(name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        gp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::get(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    /// List a collection
    pub fn list(&self, lp: &ListParams) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.collection_url()?);
        let mut qp = form_urlencoded::Serializer::new(target);
        lp.validate()?;
        lp.populate_qp(&mut qp)?;
        let urlstr = qp.finish();
        http::Request::get(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    /// Open a watch on a collection, optionally resuming from a version
    ///
    /// Passing `None` asks the server for a fresh watch window, which is
    /// what a caller wants after its resume cursor has expired.
    pub fn watch(&self, wp: &WatchParams, resource_version: Option<&str>) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.collection_url()?);
        let mut qp = form_urlencoded::Serializer::new(target);
        wp.validate()?;
        wp.populate_qp(&mut qp)?;
        if let Some(rv) = resource_version {
            qp.append_pair("resourceVersion", rv);
        }
        let urlstr = qp.finish();
        http::Request::get(urlstr)
            .header(http::header::ACCEPT, JSON_STREAM_MIME)
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    /// Create an object from a serialized body
    pub fn create(&self, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>> {
        pp.validate()?;
        if self.descriptor.scope.is_namespaced() && *self.namespace() == NamespaceSelector::All {
            return Err(Error::InvalidRequest(format!(
                "creating a {} requires a specific namespace",
                self.descriptor.singular
            )));
        }
        let target = format!("{}?", self.collection_url()?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::post(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Replace an object wholesale
    ///
    /// The body must carry `metadata.resourceVersion` for the server to
    /// accept the update.
    pub fn replace(&self, name: &str, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>> {
        pp.validate()?;
        let target = format!("{}?", self.named_url(name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::put(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Patch an object with one of the patch strategies
    pub fn patch<P: serde::Serialize>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>> {
        pp.validate(patch)?;
        let target = format!("{}?", self.named_url(name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::patch(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, patch.content_type())
            .body(patch.serialize().map_err(Error::SerializeBody)?)
            .map_err(Error::BuildRequest)
    }

    /// Delete a single object by name
    pub fn delete(&self, name: &str, dp: &DeleteParams) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.named_url(name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        if dp.dry_run {
            qp.append_pair("dryRun", "All");
        }
        let urlstr = qp.finish();
        let body = serde_json::to_vec(dp).map_err(Error::SerializeBody)?;
        http::Request::delete(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(body)
            .map_err(Error::BuildRequest)
    }

    /// Delete every object matched by the list selectors
    pub fn delete_collection(&self, dp: &DeleteParams, lp: &ListParams) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.collection_url()?);
        let mut qp = form_urlencoded::Serializer::new(target);
        lp.validate()?;
        lp.populate_qp(&mut qp)?;
        if dp.dry_run {
            qp.append_pair("dryRun", "All");
        }
        let urlstr = qp.finish();

        let body = if dp.is_default() {
            vec![] // default options serialize to an empty body
        } else {
            serde_json::to_vec(dp).map_err(Error::SerializeBody)?
        };
        http::Request::delete(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(body)
            .map_err(Error::BuildRequest)
    }
}

/// Subresources
impl Request {
    /// Get a registered subresource of a named object
    pub fn get_subresource(
        &self,
        subresource: &str,
        name: &str,
        gp: &GetParams,
    ) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.subresource_url(subresource, name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        gp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::get(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    /// Replace a registered subresource of a named object
    pub fn replace_subresource(
        &self,
        subresource: &str,
        name: &str,
        pp: &PostParams,
        data: Vec<u8>,
    ) -> Result<http::Request<Vec<u8>>> {
        pp.validate()?;
        let target = format!("{}?", self.subresource_url(subresource, name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::put(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Patch a registered subresource of a named object
    pub fn patch_subresource<P: serde::Serialize>(
        &self,
        subresource: &str,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>> {
        pp.validate(patch)?;
        let target = format!("{}?", self.subresource_url(subresource, name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::patch(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, patch.content_type())
            .body(patch.serialize().map_err(Error::SerializeBody)?)
            .map_err(Error::BuildRequest)
    }

    /// Post to a registered subresource of a named object
    pub fn create_subresource(
        &self,
        subresource: &str,
        name: &str,
        pp: &PostParams,
        data: Vec<u8>,
    ) -> Result<http::Request<Vec<u8>>> {
        pp.validate()?;
        let target = format!("{}?", self.subresource_url(subresource, name)?);
        let mut qp = form_urlencoded::Serializer::new(target);
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        http::Request::post(urlstr)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }
}

#[cfg(test)]
mod test {
    use super::Request;
    use crate::{
        capability::{Capability, CapabilitySet},
        descriptor::{ResourceDescriptor, Scope},
        params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, WatchParams},
        paths::NamespaceSelector,
        selector::Expression,
    };
    use http::header;
    use std::sync::Arc;

    fn request(descriptor: ResourceDescriptor, ns: NamespaceSelector) -> Request {
        Request::new(Arc::new(descriptor), ns)
    }

    fn pods(ns: &str) -> Request {
        let desc = ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
            .capabilities(CapabilitySet::crud().with(Capability::StatusHaving))
            .subresource("status", "status");
        request(desc, NamespaceSelector::namespace(ns))
    }

    fn deployments(ns: NamespaceSelector) -> Request {
        let desc =
            ResourceDescriptor::new("apps", "v1", "Deployment", "deployments", Scope::NamespaceScoped)
                .capabilities(CapabilitySet::crud().with(Capability::Scalable))
                .subresource("scale", "scale");
        request(desc, ns)
    }

    fn nodes() -> Request {
        let desc = ResourceDescriptor::new("", "v1", "Node", "nodes", Scope::ClusterScoped)
            .capabilities(CapabilitySet::crud().with(Capability::StatusHaving))
            .subresource("status", "status");
        request(desc, NamespaceSelector::All)
    }

    #[test]
    fn create_path_core_group() {
        let req = pods("ns").create(&PostParams::default(), vec![]).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?");
        assert_eq!(req.method(), "POST");
        assert_eq!(req.headers().get(header::CONTENT_TYPE).unwrap(), super::JSON_MIME);
    }

    #[test]
    fn create_path_named_group() {
        let req = deployments(NamespaceSelector::namespace("ns"))
            .create(&PostParams::default(), vec![])
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments?");
    }

    #[test]
    fn create_across_namespaces_is_invalid() {
        let err = deployments(NamespaceSelector::All)
            .create(&PostParams::default(), vec![])
            .unwrap_err();
        assert!(matches!(err, super::Error::InvalidRequest(_)));
    }

    #[test]
    fn get_path_with_resource_version() {
        let req = deployments(NamespaceSelector::namespace("ns"))
            .get("mydeploy", &GetParams::at("665"))
            .unwrap();
        assert_eq!(
            req.uri(),
            "/apis/apps/v1/namespaces/ns/deployments/mydeploy?&resourceVersion=665"
        );
        assert_eq!(req.method(), "GET");
        assert_eq!(req.headers().get(header::ACCEPT).unwrap(), super::JSON_MIME);
    }

    #[test]
    fn list_path_and_queries() {
        let req = pods("ns").list(&ListParams::default()).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?");

        let lp = ListParams::default()
            .label(Expression::Eq("app".into(), "blog".into()))
            .limit(50)
            .continue_token("1234");
        let req = pods("ns").list(&lp).unwrap();
        assert_eq!(
            req.uri().query().unwrap(),
            "&labelSelector=app%3Dblog&limit=50&continue=1234"
        );
    }

    #[test]
    fn list_across_all_namespaces() {
        let req = pods("ns");
        // bound to one namespace above; an all-namespace handle lists at the root
        let all = super::Request::new(req.descriptor().clone(), NamespaceSelector::All);
        let req = all.list(&ListParams::default()).unwrap();
        assert_eq!(req.uri(), "/api/v1/pods?");
    }

    #[test]
    fn watch_query_and_accept() {
        let wp = WatchParams::default();
        let req = pods("ns").watch(&wp, Some("0")).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/ns/pods?&watch=true&timeoutSeconds=290&allowWatchBookmarks=true&resourceVersion=0"
        );
        assert_eq!(req.headers().get(header::ACCEPT).unwrap(), super::JSON_STREAM_MIME);
    }

    #[test]
    fn watch_without_resume_version() {
        let wp = WatchParams::default().disable_bookmarks();
        let req = pods("ns").watch(&wp, None).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?&watch=true&timeoutSeconds=290");
    }

    #[test]
    fn watch_timeout_bounded() {
        let wp = WatchParams::default().timeout(100000);
        assert!(pods("ns").watch(&wp, Some("0")).is_err());
    }

    #[test]
    fn replace_with_dry_run() {
        let pp = PostParams {
            dry_run: true,
            ..Default::default()
        };
        let req = nodes().replace("mynode", &pp, vec![]).unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/mynode?&dryRun=All");
        assert_eq!(req.method(), "PUT");
    }

    #[test]
    fn delete_sends_options_body() {
        let req = pods("ns").delete("blog", &DeleteParams::default()).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/blog?");
        assert_eq!(req.method(), "DELETE");
        assert_eq!(req.body(), br#"{}"#);

        let req = pods("ns").delete("blog", &DeleteParams::background().dry_run()).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/blog?&dryRun=All");
        let body: serde_json::Value = serde_json::from_slice(req.body()).unwrap();
        assert_eq!(body["propagationPolicy"], "Background");
    }

    #[test]
    fn delete_collection_with_selectors() {
        let lp = ListParams::default().label(Expression::Eq("app".into(), "myapp".into()));
        let req = pods("ns").delete_collection(&DeleteParams::default(), &lp).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?&labelSelector=app%3Dmyapp");
        assert_eq!(req.method(), "DELETE");
        assert!(req.body().is_empty());
    }

    #[test]
    fn patch_headers_per_strategy() {
        let req = pods("ns")
            .patch("blog", &PatchParams::default(), &Patch::Strategic(()))
            .unwrap();
        assert_eq!(req.method(), "PATCH");
        assert_eq!(
            req.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/strategic-merge-patch+json"
        );

        let req = pods("ns")
            .patch("blog", &PatchParams::apply("kubic"), &Patch::Apply(()))
            .unwrap();
        assert_eq!(
            req.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/apply-patch+yaml"
        );
        assert!(req.uri().query().unwrap().contains("fieldManager=kubic"));
    }

    #[test]
    fn status_subresource_paths() {
        let req = nodes()
            .replace_subresource("status", "mynode", &PostParams::default(), vec![])
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/mynode/status?");
        assert_eq!(req.method(), "PUT");

        let req = pods("ns")
            .get_subresource("status", "blog", &GetParams::default())
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/blog/status?");
    }

    #[test]
    fn scale_subresource_paths() {
        let deploys = deployments(NamespaceSelector::namespace("ns"));
        let req = deploys
            .get_subresource("scale", "blog", &GetParams::default())
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/blog/scale?");

        let req = deploys
            .patch_subresource("scale", "blog", &PatchParams::default(), &Patch::Merge(()))
            .unwrap();
        assert_eq!(req.method(), "PATCH");
    }

    #[test]
    fn unregistered_subresource_is_invalid() {
        let err = pods("ns")
            .get_subresource("scale", "blog", &GetParams::default())
            .unwrap_err();
        assert!(matches!(err, super::Error::InvalidRequest(_)));
    }
}
