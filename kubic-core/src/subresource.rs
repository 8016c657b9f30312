//! Request builders and parameters for the log, eviction and exec
//! subresources.
//!
//! The scale and status subresources need no dedicated builders; they reuse
//! the generic subresource methods on [`Request`].
use crate::{
    params::{DeleteParams, PostParams},
    request::{Error, Request, Result, JSON_MIME},
};

pub use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec, ScaleStatus};

// ----------------------------------------------------------------------------
// Log subresource
// ----------------------------------------------------------------------------

/// Params for fetching container logs.
#[derive(Default, Clone, Debug)]
pub struct LogParams {
    /// The container to fetch logs from; defaults to the only container
    pub container: Option<String>,
    /// Follow the log stream as it grows
    pub follow: bool,
    /// Stop after this many bytes of output
    pub limit_bytes: Option<i64>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Return logs from a previous terminated container
    pub previous: bool,
    /// Only return logs newer than this many seconds
    pub since_seconds: Option<i64>,
    /// Only return the last n lines
    pub tail_lines: Option<i64>,
    /// Prefix each line with an RFC3339 timestamp
    pub timestamps: bool,
}

impl Request {
    /// Fetch logs of a named object
    pub fn logs(&self, name: &str, lp: &LogParams) -> Result<http::Request<Vec<u8>>> {
        let target = format!("{}?", self.log_path(name)?);
        let mut qp = form_urlencoded::Serializer::new(target);

        if let Some(container) = &lp.container {
            qp.append_pair("container", container);
        }
        if lp.follow {
            qp.append_pair("follow", "true");
        }
        if let Some(lb) = &lp.limit_bytes {
            qp.append_pair("limitBytes", &lb.to_string());
        }
        if lp.pretty {
            qp.append_pair("pretty", "true");
        }
        if lp.previous {
            qp.append_pair("previous", "true");
        }
        if let Some(ss) = &lp.since_seconds {
            qp.append_pair("sinceSeconds", &ss.to_string());
        }
        if let Some(tl) = &lp.tail_lines {
            qp.append_pair("tailLines", &tl.to_string());
        }
        if lp.timestamps {
            qp.append_pair("timestamps", "true");
        }

        http::Request::get(qp.finish())
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    fn log_path(&self, name: &str) -> Result<String> {
        crate::paths::subresource_path(self.descriptor(), self.namespace(), name, "log")
    }
}

// ----------------------------------------------------------------------------
// Eviction subresource
// ----------------------------------------------------------------------------

/// Params for evicting an object through its eviction subresource.
#[derive(Default, Clone, Debug)]
pub struct EvictParams {
    /// How the underlying delete should behave
    pub delete_options: Option<DeleteParams>,
    /// Options for the eviction post itself
    pub post_options: PostParams,
}

impl Request {
    /// Post an eviction for a named object
    pub fn evict(&self, name: &str, ep: &EvictParams) -> Result<http::Request<Vec<u8>>> {
        let path =
            crate::paths::subresource_path(self.descriptor(), self.namespace(), name, "eviction")?;
        let pp = &ep.post_options;
        pp.validate()?;
        let mut qp = form_urlencoded::Serializer::new(format!("{path}?"));
        pp.populate_qp(&mut qp);
        let urlstr = qp.finish();
        // the eviction body wants metadata with the target name alongside
        // the delete options
        let data = serde_json::to_vec(&serde_json::json!({
            "apiVersion": "policy/v1",
            "kind": "Eviction",
            "metadata": { "name": name },
            "deleteOptions": ep.delete_options,
        }))
        .map_err(Error::SerializeBody)?;
        http::Request::post(urlstr)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }
}

// ----------------------------------------------------------------------------
// Exec subresource
// ----------------------------------------------------------------------------

/// Params for running a command through the exec subresource.
///
/// One of `stdin`, `stdout` or `stderr` must be requested, and `stderr`
/// cannot be combined with `tty` since multiplexing is unsupported there.
#[derive(Clone, Debug)]
pub struct ExecParams {
    /// The container to exec in; defaults to the only container
    pub container: Option<String>,
    /// Redirect standard input into the command
    pub stdin: bool,
    /// Capture standard output
    pub stdout: bool,
    /// Capture standard error
    pub stderr: bool,
    /// Allocate a TTY
    pub tty: bool,
}

impl Default for ExecParams {
    fn default() -> Self {
        ExecParams {
            container: None,
            stdin: false,
            stdout: true,
            stderr: true,
            tty: false,
        }
    }
}

impl ExecParams {
    fn validate(&self) -> Result<()> {
        if !self.stdin && !self.stdout && !self.stderr {
            return Err(Error::InvalidRequest(
                "one of stdin, stdout or stderr must be requested".into(),
            ));
        }
        if self.stderr && self.tty {
            return Err(Error::InvalidRequest("tty and stderr cannot both be requested".into()));
        }
        Ok(())
    }
}

impl Request {
    /// Build the upgrade request for executing a command in a named object
    ///
    /// Only the request is assembled here; driving the upgraded connection
    /// is up to the transport owner.
    pub fn exec<I, T>(&self, name: &str, command: I, ep: &ExecParams) -> Result<http::Request<Vec<u8>>>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ep.validate()?;
        let path = crate::paths::subresource_path(self.descriptor(), self.namespace(), name, "exec")?;
        let mut qp = form_urlencoded::Serializer::new(format!("{path}?"));
        if ep.stdin {
            qp.append_pair("stdin", "true");
        }
        if ep.stdout {
            qp.append_pair("stdout", "true");
        }
        if ep.stderr {
            qp.append_pair("stderr", "true");
        }
        if ep.tty {
            qp.append_pair("tty", "true");
        }
        if let Some(container) = &ep.container {
            qp.append_pair("container", container);
        }
        for c in command.into_iter() {
            qp.append_pair("command", &c.into());
        }
        http::Request::get(qp.finish())
            .body(vec![])
            .map_err(Error::BuildRequest)
    }
}

#[cfg(test)]
mod test {
    use super::{EvictParams, ExecParams, LogParams};
    use crate::{
        capability::{Capability, CapabilitySet},
        descriptor::{ResourceDescriptor, Scope},
        paths::NamespaceSelector,
        request::Request,
    };
    use std::sync::Arc;

    fn pods(ns: &str) -> Request {
        let desc = ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
            .capabilities(
                CapabilitySet::crud()
                    .with(Capability::Loggable)
                    .with(Capability::Evictable),
            )
            .subresource("log", "log")
            .subresource("eviction", "eviction")
            .subresource("exec", "exec");
        Request::new(Arc::new(desc), NamespaceSelector::namespace(ns))
    }

    #[test]
    fn logs_all_params() {
        let lp = LogParams {
            container: Some("nginx".into()),
            follow: true,
            limit_bytes: Some(10 * 1024 * 1024),
            pretty: true,
            previous: true,
            since_seconds: Some(3600),
            tail_lines: Some(4096),
            timestamps: true,
        };
        let req = pods("ns").logs("mypod", &lp).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/mypod/log?&container=nginx&follow=true&limitBytes=10485760&pretty=true&previous=true&sinceSeconds=3600&tailLines=4096&timestamps=true");
    }

    #[test]
    fn evict_body_names_the_target() {
        let req = pods("ns").evict("mypod", &EvictParams::default()).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/mypod/eviction?");
        assert_eq!(req.method(), "POST");
        let body: serde_json::Value = serde_json::from_slice(req.body()).unwrap();
        assert_eq!(body["kind"], "Eviction");
        assert_eq!(body["metadata"]["name"], "mypod");
    }

    #[test]
    fn exec_query_includes_command() {
        let req = pods("ns")
            .exec("mypod", ["sh", "-c", "ls"], &ExecParams::default())
            .unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/ns/pods/mypod/exec?&stdout=true&stderr=true&command=sh&command=-c&command=ls"
        );
    }

    #[test]
    fn exec_stream_conflicts_rejected() {
        let ep = ExecParams {
            tty: true,
            ..ExecParams::default()
        };
        assert!(pods("ns").exec("mypod", ["sh"], &ep).is_err());
    }
}
