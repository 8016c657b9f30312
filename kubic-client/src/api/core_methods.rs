use either::Either;
use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::{
    api::ResourceClient,
    error::{ApiError, ErrorKind},
    Error, Result,
};
use kubic_core::{
    params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, WatchParams},
    response::Status,
    Capability, ObjectList, WatchEvent,
};

/// The standard verbs.
impl<K> ResourceClient<K>
where
    K: Clone + DeserializeOwned + Debug,
{
    /// Get a named object.
    ///
    /// Fails with a `NotFound` api error when the object does not exist;
    /// use [`ResourceClient::get_opt`] to observe absence as `None`.
    pub async fn get(&self, name: &str) -> Result<K> {
        self.get_with(name, &GetParams::default()).await
    }

    /// Get a named object with explicit read options.
    pub async fn get_with(&self, name: &str, gp: &GetParams) -> Result<K> {
        self.guard(Capability::Readable)?;
        let mut req = self.request.get(name, gp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get");
        self.client.request::<K>(req).await
    }

    /// Get a named object if it exists.
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        match self.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(Error::Api(ApiError {
                kind: ErrorKind::NotFound,
                ..
            })) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List objects, filtered by the selectors in `lp`.
    pub async fn list(&self, lp: &ListParams) -> Result<ObjectList<K>> {
        self.guard(Capability::Listable)?;
        let mut req = self.request.list(lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("list");
        self.client.request::<ObjectList<K>>(req).await
    }

    /// Create an object.
    pub async fn create(&self, pp: &PostParams, data: &K) -> Result<K>
    where
        K: Serialize,
    {
        self.guard(Capability::Creatable)?;
        let bytes = serde_json::to_vec(&data).map_err(|e| Error::BuildRequest(kubic_core::request::Error::SerializeBody(e)))?;
        let mut req = self.request.create(pp, bytes).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("create");
        self.client.request::<K>(req).await
    }

    /// Replace an object wholesale.
    ///
    /// The provided object must carry the `metadata.resourceVersion` of the
    /// version being replaced, so the usual pattern is get, mutate, replace.
    pub async fn replace(&self, name: &str, pp: &PostParams, data: &K) -> Result<K>
    where
        K: Serialize,
    {
        self.guard(Capability::Replaceable)?;
        let bytes = serde_json::to_vec(&data).map_err(|e| Error::BuildRequest(kubic_core::request::Error::SerializeBody(e)))?;
        let mut req = self
            .request
            .replace(name, pp, bytes)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace");
        self.client.request::<K>(req).await
    }

    /// Patch an object with the given strategy.
    pub async fn patch<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<K> {
        self.guard(Capability::Patchable)?;
        let mut req = self.request.patch(name, pp, patch).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch");
        self.client.request::<K>(req).await
    }

    /// Delete a named object.
    ///
    /// `Left` carries the object when the server returns it on its way out;
    /// `Right` carries the bare [`Status`] acknowledgement.
    pub async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<Either<K, Status>> {
        self.guard(Capability::Deletable)?;
        let mut req = self.request.delete(name, dp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("delete");
        self.client.request_status::<K>(req).await
    }

    /// Delete every object matched by the selectors in `lp`.
    pub async fn delete_collection(
        &self,
        dp: &DeleteParams,
        lp: &ListParams,
    ) -> Result<Either<ObjectList<K>, Status>> {
        self.guard(Capability::CollectionDeletable)?;
        let mut req = self
            .request
            .delete_collection(dp, lp)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("delete_collection");
        self.client.request_status::<ObjectList<K>>(req).await
    }

    /// Open a single watch attempt, resuming from `resource_version`.
    ///
    /// The returned stream yields raw [`WatchEvent`]s until the server ends
    /// the attempt; it does not reconnect. The watch engine in the runtime
    /// crate wraps this with resumption, backoff and a cancellable task.
    pub async fn watch(
        &self,
        wp: &WatchParams,
        resource_version: Option<&str>,
    ) -> Result<impl Stream<Item = Result<WatchEvent<K>>>> {
        self.guard(Capability::Watchable)?;
        let mut req = self
            .request
            .watch(wp, resource_version)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("watch");
        self.client.request_events::<K>(req).await
    }
}
