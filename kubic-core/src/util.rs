//! Helpers for common per-resource operations.
use chrono::Utc;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};

use crate::{
    params::{Patch, PatchParams},
    request::{Request, Result},
};

/// Marker for workload kinds that support a rollout restart.
pub trait Restart {}

impl Restart for Deployment {}
impl Restart for DaemonSet {}
impl Restart for StatefulSet {}
impl Restart for ReplicaSet {}

impl Request {
    /// Trigger a rollout restart of a named workload
    ///
    /// Issues a strategic merge patch stamping the pod template annotations,
    /// which makes the controller roll new pods.
    pub fn restart(&self, name: &str) -> Result<http::Request<Vec<u8>>> {
        let patch = serde_json::json!({
          "spec": {
            "template": {
              "metadata": {
                "annotations": {
                  "kubic.dev/restartedAt": Utc::now().to_rfc3339()
                }
              }
            }
          }
        });
        self.patch(name, &PatchParams::default(), &Patch::Strategic(patch))
    }
}
