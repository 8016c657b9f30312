//! Per-call request options for reads, lists, watches, writes and deletes.
use serde::Serialize;

use crate::{
    request::Error,
    selector::{Expression, FieldExpression, FieldSelector, LabelSelector},
};

/// Options for fetching a single object.
#[derive(Default, Clone, Debug)]
pub struct GetParams {
    /// Pretty-print the response body
    pub pretty: bool,
    /// Read at this (server-defined, opaque) resource version
    pub resource_version: Option<String>,
}

impl GetParams {
    /// Read at any cached version (`resourceVersion=0`)
    pub fn any() -> Self {
        Self::at("0")
    }

    /// Read at an explicit resource version
    pub fn at(resource_version: &str) -> Self {
        GetParams {
            pretty: false,
            resource_version: Some(resource_version.to_string()),
        }
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.pretty {
            qp.append_pair("pretty", "true");
        }
        if let Some(rv) = &self.resource_version {
            qp.append_pair("resourceVersion", rv);
        }
    }
}

/// Options for list and delete-collection calls.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    /// Restrict results by labels
    pub label_selector: LabelSelector,
    /// Restrict results by fields
    pub field_selector: FieldSelector,
    /// List at this resource version rather than the most recent
    pub resource_version: Option<String>,
    /// Maximum number of results per page
    ///
    /// When more results exist, the response metadata carries a continue
    /// token for fetching the next page.
    pub limit: Option<u32>,
    /// Continuation token from a previous page
    pub continue_token: Option<String>,
    /// Total wait bound for the call in seconds
    ///
    /// Bounded below 295s due to server-side watch limitations.
    pub timeout: Option<u32>,
    /// Pretty-print the response body
    pub pretty: bool,
}

impl ListParams {
    /// Replace the label selector
    #[must_use]
    pub fn labels(mut self, selector: LabelSelector) -> Self {
        self.label_selector = selector;
        self
    }

    /// Append one label requirement
    #[must_use]
    pub fn label(mut self, expr: Expression) -> Self {
        self.label_selector.push(expr);
        self
    }

    /// Replace the field selector
    #[must_use]
    pub fn fields(mut self, selector: FieldSelector) -> Self {
        self.field_selector = selector;
        self
    }

    /// Append one field requirement
    #[must_use]
    pub fn field(mut self, expr: FieldExpression) -> Self {
        self.field_selector.push(expr);
        self
    }

    /// List at an explicit resource version
    #[must_use]
    pub fn at(mut self, resource_version: &str) -> Self {
        self.resource_version = Some(resource_version.to_string());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the continuation token
    #[must_use]
    pub fn continue_token(mut self, token: &str) -> Self {
        self.continue_token = Some(token.to_string());
        self
    }

    /// Bound the duration of the call
    #[must_use]
    pub fn timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(to) = &self.timeout {
            // https://github.com/kubernetes/kubernetes/issues/6513
            if *to >= 295 {
                return Err(Error::InvalidRequest("timeout must be < 295s".into()));
            }
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) -> Result<(), Error> {
        if let Some(labels) = self.label_selector.to_query()? {
            qp.append_pair("labelSelector", &labels);
        }
        if let Some(fields) = self.field_selector.to_query() {
            qp.append_pair("fieldSelector", &fields);
        }
        if let Some(rv) = &self.resource_version {
            qp.append_pair("resourceVersion", rv);
        }
        if let Some(limit) = &self.limit {
            qp.append_pair("limit", &limit.to_string());
        }
        if let Some(token) = &self.continue_token {
            qp.append_pair("continue", token);
        }
        if let Some(to) = &self.timeout {
            qp.append_pair("timeoutSeconds", &to.to_string());
        }
        if self.pretty {
            qp.append_pair("pretty", "true");
        }
        Ok(())
    }
}

/// Options for watch calls.
///
/// `watch=true` is appended by the request builder itself; list calls have
/// no way to request it.
#[derive(Clone, Debug)]
pub struct WatchParams {
    /// Restrict events by labels
    pub label_selector: LabelSelector,
    /// Restrict events by fields
    pub field_selector: FieldSelector,
    /// Per-attempt duration of the watch in seconds
    ///
    /// Re-issued on every reconnect. Defaults to 290s, the conventional
    /// bound just under the server limit.
    pub timeout: Option<u32>,
    /// Request BOOKMARK events
    ///
    /// Servers send bookmarks at their own discretion; disabling this is not
    /// recommended for long-running watches as it hurts resumption.
    pub bookmarks: bool,
}

impl Default for WatchParams {
    fn default() -> Self {
        WatchParams {
            // bookmarks stable since 1.17, and backwards compatible
            bookmarks: true,
            label_selector: LabelSelector::default(),
            field_selector: FieldSelector::default(),
            timeout: None,
        }
    }
}

impl WatchParams {
    /// Replace the label selector
    #[must_use]
    pub fn labels(mut self, selector: LabelSelector) -> Self {
        self.label_selector = selector;
        self
    }

    /// Append one label requirement
    #[must_use]
    pub fn label(mut self, expr: Expression) -> Self {
        self.label_selector.push(expr);
        self
    }

    /// Replace the field selector
    #[must_use]
    pub fn fields(mut self, selector: FieldSelector) -> Self {
        self.field_selector = selector;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }

    /// Opt out of BOOKMARK events
    #[must_use]
    pub fn disable_bookmarks(mut self) -> Self {
        self.bookmarks = false;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(to) = &self.timeout {
            if *to >= 295 {
                return Err(Error::InvalidRequest("timeout must be < 295s".into()));
            }
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) -> Result<(), Error> {
        qp.append_pair("watch", "true");
        qp.append_pair("timeoutSeconds", &self.timeout.unwrap_or(290).to_string());
        if let Some(labels) = self.label_selector.to_query()? {
            qp.append_pair("labelSelector", &labels);
        }
        if let Some(fields) = self.field_selector.to_query() {
            qp.append_pair("fieldSelector", &fields);
        }
        if self.bookmarks {
            qp.append_pair("allowWatchBookmarks", "true");
        }
        Ok(())
    }
}

/// Options for create and replace calls.
#[derive(Default, Clone, Debug)]
pub struct PostParams {
    /// Run server-side admission without persisting
    pub dry_run: bool,
    /// Name of the field manager recorded for this change
    pub field_manager: Option<String>,
}

impl PostParams {
    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if let Some(ref fm) = self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(field_manager) = &self.field_manager {
            // apiserver caps the manager name; catch the cheap case here
            if field_manager.len() > 128 {
                return Err(Error::InvalidRequest("field manager must be at most 128 chars".into()));
            }
        }
        Ok(())
    }
}

/// Describes changes to apply to a resource via one of the patch strategies.
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum Patch<T: Serialize> {
    /// Server-side apply (`application/apply-patch+yaml`)
    Apply(T),
    /// RFC 6902 JSON patch (`application/json-patch+json`)
    ///
    /// The payload must serialize to a JSON patch operation array.
    Json(T),
    /// RFC 7386 merge patch (`application/merge-patch+json`)
    Merge(T),
    /// Kubernetes strategic merge patch (`application/strategic-merge-patch+json`)
    Strategic(T),
}

impl<T: Serialize> Patch<T> {
    pub(crate) fn is_apply(&self) -> bool {
        matches!(self, Patch::Apply(_))
    }

    /// The exact content type sent for this strategy
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Apply(_) => "application/apply-patch+yaml",
            Self::Json(_) => "application/json-patch+json",
            Self::Merge(_) => "application/merge-patch+json",
            Self::Strategic(_) => "application/strategic-merge-patch+json",
        }
    }

    pub(crate) fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Apply(p) | Self::Json(p) | Self::Merge(p) | Self::Strategic(p) => serde_json::to_vec(p),
        }
    }
}

/// Options for patch calls.
#[derive(Default, Clone, Debug)]
pub struct PatchParams {
    /// Run server-side admission without persisting
    pub dry_run: bool,
    /// Force ownership of conflicting fields; [`Patch::Apply`] only
    pub force: bool,
    /// Name of the field manager recorded for this change
    ///
    /// Required for [`Patch::Apply`], optional otherwise.
    pub field_manager: Option<String>,
}

impl PatchParams {
    /// Construct params for server-side apply under a manager name
    #[must_use]
    pub fn apply(manager: &str) -> Self {
        PatchParams {
            field_manager: Some(manager.into()),
            ..Self::default()
        }
    }

    /// Force the apply through on conflicts
    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Perform a dry run only
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub(crate) fn validate<P: Serialize>(&self, patch: &Patch<P>) -> Result<(), Error> {
        if let Some(field_manager) = &self.field_manager {
            if field_manager.len() > 128 {
                return Err(Error::InvalidRequest("field manager must be at most 128 chars".into()));
            }
        }
        if self.force && !patch.is_apply() {
            return Err(Error::InvalidRequest("force only applies to apply patches".into()));
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if self.force {
            qp.append_pair("force", "true");
        }
        if let Some(ref fm) = self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }
}

/// Options for delete calls, sent as the request body.
#[derive(Default, Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    /// Run server-side admission without persisting
    #[serde(
        serialize_with = "dry_run_all_ser",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub dry_run: bool,

    /// Seconds before the object is deleted; zero deletes immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u32>,

    /// How dependents are garbage collected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,

    /// Conditions that must hold for the delete to proceed
    ///
    /// A mismatch yields a `409 Conflict` from the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
}

impl DeleteParams {
    /// Delete with `PropagationPolicy::Background`
    pub fn background() -> Self {
        DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Self::default()
        }
    }

    /// Delete with `PropagationPolicy::Foreground`
    pub fn foreground() -> Self {
        DeleteParams {
            propagation_policy: Some(PropagationPolicy::Foreground),
            ..Self::default()
        }
    }

    /// Delete with `PropagationPolicy::Orphan`
    pub fn orphan() -> Self {
        DeleteParams {
            propagation_policy: Some(PropagationPolicy::Orphan),
            ..Self::default()
        }
    }

    /// Perform a dry run only
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Set the grace period in seconds
    #[must_use]
    pub fn grace_period(mut self, secs: u32) -> Self {
        self.grace_period_seconds = Some(secs);
        self
    }

    /// Set delete preconditions
    #[must_use]
    pub fn preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = Some(preconditions);
        self
    }

    pub(crate) fn is_default(&self) -> bool {
        !self.dry_run
            && self.grace_period_seconds.is_none()
            && self.propagation_policy.is_none()
            && self.preconditions.is_none()
    }
}

// dryRun serializes differently in bodies than in query strings: bodies want
// the awkward ["All"] form, which we hide behind a bool.
fn dry_run_all_ser<S>(t: &bool, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    use serde::ser::SerializeTuple;
    match t {
        true => {
            let mut map = s.serialize_tuple(1)?;
            map.serialize_element("All")?;
            map.end()
        }
        false => s.serialize_none(),
    }
}

/// Conditions that must hold before a delete is carried out.
#[derive(Default, Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    /// Target resource version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Target UID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Garbage collection policy for dependents of a deleted object.
#[derive(Clone, Debug, Serialize)]
pub enum PropagationPolicy {
    /// Orphan the dependents
    Orphan,
    /// Let the garbage collector delete dependents in the background
    Background,
    /// Delete all dependents before the object itself
    Foreground,
}

#[cfg(test)]
mod test {
    use super::{DeleteParams, ListParams, Patch, PatchParams, Preconditions};
    use crate::selector::Expression;

    #[test]
    fn delete_params_serialize() {
        let mut dp = DeleteParams::default();
        assert_eq!(serde_json::to_string(&dp).unwrap(), "{}");

        dp.dry_run = true;
        assert_eq!(serde_json::to_string(&dp).unwrap(), r#"{"dryRun":["All"]}"#);

        let dp = DeleteParams::background()
            .grace_period(30)
            .preconditions(Preconditions {
                uid: Some("1234".into()),
                resource_version: None,
            });
        assert_eq!(
            serde_json::to_value(&dp).unwrap(),
            serde_json::json!({
                "gracePeriodSeconds": 30,
                "propagationPolicy": "Background",
                "preconditions": { "uid": "1234" }
            })
        );
    }

    #[test]
    fn patch_content_types() {
        assert_eq!(Patch::Apply(()).content_type(), "application/apply-patch+yaml");
        assert_eq!(Patch::Json(()).content_type(), "application/json-patch+json");
        assert_eq!(Patch::Merge(()).content_type(), "application/merge-patch+json");
        assert_eq!(
            Patch::Strategic(()).content_type(),
            "application/strategic-merge-patch+json"
        );
    }

    #[test]
    fn force_requires_apply() {
        let pp = PatchParams::apply("kubic").force();
        assert!(pp.validate(&Patch::Apply(())).is_ok());
        assert!(pp.validate(&Patch::Merge(())).is_err());
    }

    #[test]
    fn list_timeout_bounded() {
        assert!(ListParams::default().timeout(294).validate().is_ok());
        assert!(ListParams::default().timeout(295).validate().is_err());
    }

    #[test]
    fn list_selector_errors_surface_before_queries() {
        let lp = ListParams::default().label(Expression::In("app".into(), vec![]));
        let mut qp = form_urlencoded::Serializer::new(String::new());
        assert!(lp.populate_qp(&mut qp).is_err());
    }
}
