use serde::de::DeserializeOwned;
use std::fmt::Debug;

use crate::{api::ResourceClient, Error, Result};
use kubic_core::{Capability, Restart};

impl<K> ResourceClient<K>
where
    K: Restart + Clone + DeserializeOwned + Debug,
{
    /// Trigger a rollout restart of a named workload.
    pub async fn restart(&self, name: &str) -> Result<K> {
        self.guard(Capability::Patchable)?;
        let mut req = self.request.restart(name).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("restart");
        self.client.request::<K>(req).await
    }
}
