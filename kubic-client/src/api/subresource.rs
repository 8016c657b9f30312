//! Subresource verbs: status, scale, log and eviction.
use bytes::Bytes;
use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::{api::ResourceClient, Error, Result};
use kubic_core::{
    params::{GetParams, Patch, PatchParams, PostParams},
    response::Status,
    subresource::{EvictParams, LogParams, Scale},
    Capability,
};

/// Status subresource verbs.
impl<K> ResourceClient<K>
where
    K: Clone + DeserializeOwned + Debug,
{
    /// Fetch the status object of a named resource
    pub async fn get_status(&self, name: &str) -> Result<K> {
        self.guard(Capability::StatusHaving)?;
        let mut req = self
            .request
            .get_subresource("status", name, &GetParams::default())
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get_status");
        self.client.request::<K>(req).await
    }

    /// Replace the status object of a named resource
    ///
    /// Only `.status` is considered; the rest of the body is ignored by the
    /// server apart from the required `metadata.resourceVersion`.
    pub async fn replace_status(&self, name: &str, pp: &PostParams, data: &K) -> Result<K>
    where
        K: Serialize,
    {
        self.guard(Capability::StatusHaving)?;
        let bytes = serde_json::to_vec(&data)
            .map_err(|e| Error::BuildRequest(kubic_core::request::Error::SerializeBody(e)))?;
        let mut req = self
            .request
            .replace_subresource("status", name, pp, bytes)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace_status");
        self.client.request::<K>(req).await
    }

    /// Patch the status object of a named resource
    pub async fn patch_status<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<K> {
        self.guard(Capability::StatusHaving)?;
        let mut req = self
            .request
            .patch_subresource("status", name, pp, patch)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch_status");
        self.client.request::<K>(req).await
    }
}

/// Scale subresource verbs.
impl<K> ResourceClient<K>
where
    K: Clone + DeserializeOwned,
{
    /// Fetch the scale of a named resource
    pub async fn get_scale(&self, name: &str) -> Result<Scale> {
        self.guard(Capability::Scalable)?;
        let mut req = self
            .request
            .get_subresource("scale", name, &GetParams::default())
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get_scale");
        self.client.request::<Scale>(req).await
    }

    /// Replace the scale of a named resource
    pub async fn replace_scale(&self, name: &str, pp: &PostParams, scale: &Scale) -> Result<Scale> {
        self.guard(Capability::Scalable)?;
        let bytes = serde_json::to_vec(scale)
            .map_err(|e| Error::BuildRequest(kubic_core::request::Error::SerializeBody(e)))?;
        let mut req = self
            .request
            .replace_subresource("scale", name, pp, bytes)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace_scale");
        self.client.request::<Scale>(req).await
    }

    /// Patch the scale of a named resource
    pub async fn patch_scale<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<Scale> {
        self.guard(Capability::Scalable)?;
        let mut req = self
            .request
            .patch_subresource("scale", name, pp, patch)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch_scale");
        self.client.request::<Scale>(req).await
    }
}

/// Log and eviction subresource verbs.
impl<K> ResourceClient<K>
where
    K: Clone + DeserializeOwned,
{
    /// Fetch logs of a named resource, buffered into one string
    pub async fn logs(&self, name: &str, lp: &LogParams) -> Result<String> {
        self.guard(Capability::Loggable)?;
        let mut req = self.request.logs(name, lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("logs");
        self.client.request_text(req).await
    }

    /// Stream logs of a named resource as raw chunks
    ///
    /// The streaming flavor of [`ResourceClient::logs`]; combine with
    /// `follow` in the params to tail a container.
    pub async fn log_stream(&self, name: &str, lp: &LogParams) -> Result<impl Stream<Item = Result<Bytes>>> {
        self.guard(Capability::Loggable)?;
        let mut req = self.request.logs(name, lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("log_stream");
        self.client.request_text_stream(req).await
    }

    /// Evict a named resource through its eviction subresource
    pub async fn evict(&self, name: &str, ep: &EvictParams) -> Result<Status> {
        self.guard(Capability::Evictable)?;
        let mut req = self.request.evict(name, ep).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("evict");
        self.client.request::<Status>(req).await
    }
}
