#![feature(test)]

extern crate test;

use async_trait::async_trait;
use fetchmock::{
    create_interception_handler, BoxError, Mock, MockRegistry, RequestPausedEvent, Transport,
    UrlPattern,
};
use serde_json::{json, Value};
use test::Bencher;

struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _method: &str, _params: Value) -> Result<Value, BoxError> {
        Ok(json!({"body": "eyJmb28iOiJiYXIifQ==", "base64Encoded": true}))
    }
}

fn event(url: &str) -> RequestPausedEvent {
    serde_json::from_value(json!({
        "requestId": "1",
        "request": {"url": url, "method": "GET"},
        "responseHeaders": [{"name": "Content-Type", "value": "application/json"}]
    }))
    .unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[bench]
fn bench_compile_glob(b: &mut Bencher) {
    b.iter(|| UrlPattern::glob("https://{www,api}.example.com/**/users/*.json").unwrap())
}

#[bench]
fn bench_match_glob(b: &mut Bencher) {
    let pattern = UrlPattern::glob("https://{www,api}.example.com/**/users/*.json").unwrap();

    b.iter(|| {
        assert!(pattern.matches("https://api.example.com/v1/team/users/alice.json"));
        assert!(!pattern.matches("https://api.example.com/v1/team/users/alice/avatar.png"));
    })
}

#[bench]
fn bench_create_mock(b: &mut Bencher) {
    b.iter(|| {
        let mock = Mock::new("**/foobar/**");
        mock.respond("foobar");
        mock
    })
}

#[bench]
fn bench_handle_unmatched_event(b: &mut Bencher) {
    let rt = runtime();
    let mocks: Vec<Mock> = (0..50).map(|i| Mock::new(format!("**/route{}/**", i))).collect();
    let handler = create_interception_handler(
        std::sync::Arc::new(NoopTransport),
        MockRegistry::from(mocks),
    );

    b.iter(|| rt.block_on(handler(event("http://test.com/other/test.html"))).unwrap())
}

#[bench]
fn bench_handle_stubbed_event(b: &mut Bencher) {
    let rt = runtime();
    let mock = Mock::new("**/foobar/**");
    mock.respond(json!({"foo": "bar"}));
    let handler = create_interception_handler(
        std::sync::Arc::new(NoopTransport),
        MockRegistry::from(vec![mock.clone()]),
    );

    b.iter(|| {
        rt.block_on(handler(event("http://test.com/foobar/test.html")))
            .unwrap();
        mock.clear();
    })
}
