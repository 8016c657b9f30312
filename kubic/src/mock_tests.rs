use crate::{
    api::{DeleteParams, ListParams, WatchParams},
    core::{
        capability::{Capability, CapabilitySet},
        descriptor::{ResourceDescriptor, Scope},
        selector::{Expression, LabelSelector},
        ResourceObjectExt,
    },
    runtime::{self, RetryPolicy, RetryStrategy, WatchState},
    Client, Error, ResourceClient,
};

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use either::Either;
use futures::pin_mut;
use http::{Request, Response};
use hyper::Body;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use serde_json::json;

// ------------------------------------------------------------------------
// scenarios
// ------------------------------------------------------------------------

#[tokio::test]
async fn lists_filter_on_label_selectors() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::FilteredNamespaceLists(5));

    let api: ResourceClient<Namespace> =
        ResourceClient::cluster(client, namespace_descriptor()).unwrap();

    let cases: Vec<(LabelSelector, Vec<&str>)> = vec![
        (
            LabelSelector::from(Expression::Eq("app".into(), "nginx".into())),
            vec!["ns1", "ns2"],
        ),
        (
            [
                Expression::Exists("app".into()),
                Expression::NotEq("app".into(), "nginx".into()),
            ]
            .into_iter()
            .collect(),
            vec!["ns3"],
        ),
        (LabelSelector::from(Expression::Exists("foo".into())), vec![]),
        (
            LabelSelector::from(Expression::In(
                "app".into(),
                vec!["nginx".into(), "redis".into()],
            )),
            vec!["ns1", "ns2", "ns3"],
        ),
        (
            LabelSelector::from(Expression::In("app".into(), vec!["nginx".into()])),
            vec!["ns1", "ns2"],
        ),
    ];

    for (selector, expected) in cases {
        let list = api.list(&ListParams::default().labels(selector)).await.unwrap();
        let names: Vec<String> = list.iter().map(|ns| ns.name_any()).collect();
        assert_eq!(names, expected);
    }
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn get_returns_the_named_object() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::GetNamespace);

    let api: ResourceClient<Namespace> =
        ResourceClient::cluster(client, namespace_descriptor()).unwrap();
    let ns = api.get("ns2").await.unwrap();
    assert_eq!(ns.name_any(), "ns2");
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn delete_yields_object_or_status() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::DeletePods);

    let api: ResourceClient<Pod> =
        ResourceClient::namespaced(client, pod_descriptor(), "testing").unwrap();

    // server acknowledges with a bare status
    match api.delete("p", &DeleteParams::default()).await.unwrap() {
        Either::Right(status) => assert_eq!(status.code, 200),
        Either::Left(pod) => panic!("expected status, got pod {pod:?}"),
    }

    // server returns the deleted object
    match api.delete("p", &DeleteParams::default()).await.unwrap() {
        Either::Left(pod) => assert_eq!(pod.name_any(), "p"),
        Either::Right(status) => panic!("expected pod, got status {status:?}"),
    }
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn uncapable_verbs_fail_without_traffic() {
    let (client, fakeserver) = testcontext();

    // readable and listable only
    let descriptor = Arc::new(
        ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped).capabilities(
            CapabilitySet::empty()
                .with(Capability::Readable)
                .with(Capability::Listable),
        ),
    );
    let api: ResourceClient<Pod> = ResourceClient::namespaced(client, descriptor, "testing").unwrap();

    let err = api.delete("p", &DeleteParams::default()).await.unwrap_err();
    match err {
        Error::UnsupportedOperation(inner) => {
            assert_eq!(inner.kind, "Pod");
            assert_eq!(inner.verb, Capability::Deletable);
        }
        other => panic!("expected unsupported operation, got {other}"),
    }
    let err = api.watch(&WatchParams::default(), None).await.map(|_| ()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));

    // dropping every client handle closes the mock service; a scenario that
    // saw any request at all would hang the None assertion below
    drop(api);
    let ApiServerVerifier(handle) = fakeserver;
    pin_mut!(handle);
    let unseen = tokio::time::timeout(Duration::from_secs(1), handle.next_request())
        .await
        .expect("mock service should close without traffic");
    assert!(unseen.is_none(), "no request may reach the wire");
}

#[tokio::test]
async fn watch_resumes_after_transport_errors() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::WatchReconnect);

    let api: ResourceClient<Pod> =
        ResourceClient::namespaced(client, pod_descriptor(), "testing").unwrap();

    let seen: Arc<Mutex<Vec<String>>> = Default::default();
    let sink = {
        let seen = seen.clone();
        move |event: crate::core::WatchEvent<Pod>| {
            if let Some(rv) = event.resource_version() {
                seen.lock().unwrap().push(rv);
            }
        }
    };
    let strategy = RetryStrategy {
        policy: RetryPolicy::MaxAttempts(3),
        jitter: 0.0,
        initial_delay: Duration::from_millis(10),
        backoff: runtime::BackoffSchedule::Fixed(Duration::from_millis(10)),
    };
    let task = runtime::watch(api, WatchParams::default(), strategy, sink);

    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().unwrap().len() < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("watch did not deliver all events");

    assert_eq!(*seen.lock().unwrap(), vec!["101", "102", "103", "104"]);
    assert_eq!(task.attempts(), 0, "attempt counter resets after delivery");
    assert_eq!(task.state(), WatchState::Streaming);
    task.cancel();
    task.join().await;
    mocksrv.abort();
}

// ------------------------------------------------------------------------
// mock test setup
// ------------------------------------------------------------------------

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
struct ApiServerVerifier(ApiServerHandle);

async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

/// Scenarios the fake apiserver knows how to answer
enum Scenario {
    FilteredNamespaceLists(usize),
    GetNamespace,
    DeletePods,
    WatchReconnect,
}

impl ApiServerVerifier {
    /// Runs the scenario; await the returned handle (with a timeout) to
    /// ensure every expected call was actually made.
    fn run(self, scenario: Scenario) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match scenario {
                Scenario::FilteredNamespaceLists(calls) => self.handle_filtered_lists(calls).await,
                Scenario::GetNamespace => self.handle_get_namespace().await,
                Scenario::DeletePods => self.handle_delete_pods().await,
                Scenario::WatchReconnect => self.handle_watch_reconnect().await,
            }
            .expect("scenario completed without errors");
        })
    }

    async fn handle_filtered_lists(mut self, calls: usize) -> Result<Self> {
        let fixtures = namespace_fixtures();
        for _ in 0..calls {
            let (request, send) = self.0.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().path(), "/api/v1/namespaces");

            // evaluate the selector the way the real apiserver would
            let selector = selector_of(&request);
            let items: Vec<_> = fixtures
                .iter()
                .filter(|(labels, _)| selector.matches(labels))
                .map(|(_, ns)| ns.clone())
                .collect();
            let respdata = json!({
                "kind": "NamespaceList",
                "apiVersion": "v1",
                "metadata": { "resourceVersion": "10" },
                "items": items,
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&respdata)?))
                    .unwrap(),
            );
        }
        Ok(self)
    }

    async fn handle_get_namespace(mut self) -> Result<Self> {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::GET);
        assert_eq!(request.uri().path(), "/api/v1/namespaces/ns2");
        let respdata = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": "ns2", "resourceVersion": "7" }
        });
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&respdata)?))
                .unwrap(),
        );
        Ok(self)
    }

    async fn handle_delete_pods(mut self) -> Result<Self> {
        {
            let (request, send) = self.0.next_request().await.expect("service not called 1");
            assert_eq!(request.method(), http::Method::DELETE);
            assert_eq!(request.uri().path(), "/api/v1/namespaces/testing/pods/p");
            let respdata = json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Success",
                "code": 200
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&respdata)?))
                    .unwrap(),
            );
        }
        {
            let (request, send) = self.0.next_request().await.expect("service not called 2");
            assert_eq!(request.method(), http::Method::DELETE);
            let respdata = json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": { "name": "p", "namespace": "testing", "resourceVersion": "55" }
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&respdata)?))
                    .unwrap(),
            );
        }
        Ok(self)
    }

    async fn handle_watch_reconnect(mut self) -> Result<Self> {
        // first segment: three events, then a transport failure mid-stream
        let (request, send) = self.0.next_request().await.expect("first watch");
        let query = request.uri().query().unwrap();
        assert!(query.contains("watch=true"));
        assert!(!query.contains("resourceVersion"));
        let (mut tx, body) = Body::channel();
        send.send_response(Response::builder().body(body).unwrap());
        for rv in ["101", "102", "103"] {
            tx.send_data(watch_event_line("pod-1", rv).into()).await?;
        }
        tx.abort();

        // reconnect resumes from the last delivered version
        let (request, send) = self.0.next_request().await.expect("second watch");
        assert!(request.uri().query().unwrap().contains("resourceVersion=103"));
        let (mut tx, body) = Body::channel();
        send.send_response(Response::builder().body(body).unwrap());
        tx.send_data(watch_event_line("pod-1", "104").into()).await?;
        // hold the segment open until the test cancels the task
        futures::future::pending::<()>().await;
        Ok(self)
    }
}

fn testcontext() -> (Client, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "testing");
    (mock_client, ApiServerVerifier(handle))
}

fn namespace_descriptor() -> Arc<ResourceDescriptor> {
    Arc::new(
        ResourceDescriptor::new("", "v1", "Namespace", "namespaces", Scope::ClusterScoped)
            .capabilities(CapabilitySet::crud()),
    )
}

fn pod_descriptor() -> Arc<ResourceDescriptor> {
    Arc::new(
        ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
            .capabilities(CapabilitySet::crud()),
    )
}

// (labels, object) pairs so the fake server can filter without re-decoding
fn namespace_fixtures() -> Vec<(BTreeMap<String, String>, serde_json::Value)> {
    [
        ("ns1", vec![("app", "nginx"), ("env", "dev")]),
        ("ns2", vec![("app", "nginx"), ("env", "qa")]),
        ("ns3", vec![("app", "redis"), ("env", "prod")]),
    ]
    .into_iter()
    .map(|(name, labels)| {
        let map: BTreeMap<String, String> = labels
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let object = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name, "labels": map, "resourceVersion": "1" }
        });
        (map, object)
    })
    .collect()
}

fn selector_of(request: &Request<Body>) -> LabelSelector {
    let query = request.uri().query().unwrap_or("");
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "labelSelector")
        .map(|(_, v)| v.parse().expect("selector grammar roundtrips"))
        .unwrap_or_default()
}

fn watch_event_line(name: &str, rv: &str) -> String {
    format!(
        "{}\n",
        json!({
            "type": "ADDED",
            "object": {
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": { "name": name, "resourceVersion": rv, "namespace": "testing" }
            }
        })
    )
}
