//! Test helpers: build AppState and router for integration tests.
//!
//! Records live in memory and the compute provider is mocked, so no AWS account
//! or database is needed.

use std::sync::Arc;
use std::time::Duration;

use attache_api::setup::routes;
use attache_api::{AppState, DispatchQueue};
use attache_core::{DispatchData, LambdaSettings, RecordRef, UploadedFile, VersionSpec};
use attache_db::{InMemoryRecordRepository, Record};
use attache_lambda::test_helpers::MockComputeProvider;
use attache_lambda::{processing_hook, LambdaPlugin, ProcessingOverrides};
use attache_storage::{StorageConfig, Storages, CACHE, STORE};
use axum_test::TestServer;
use serde_json::{json, Value};

pub const CALLBACK_URL: &str = "https://app.example.com/lambda/callback";
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct TestApp {
    pub server: TestServer,
    pub plugin: LambdaPlugin,
    pub provider: MockComputeProvider,
    pub repository: InMemoryRecordRepository,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Attachment data currently persisted for `User#1`'s avatar.
    pub fn persisted(&self) -> Value {
        let record = self.repository.get(&RecordRef::new("User", "1")).unwrap();
        serde_json::from_str(record.attribute("avatar_data").unwrap()).unwrap()
    }

    /// Poll until the mock provider saw `count` invocations.
    pub async fn wait_for_invocations(&self, count: usize) {
        for _ in 0..100 {
            if self.provider.invocations().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} invocations, saw {}",
            count,
            self.provider.invocations().len()
        );
    }
}

pub async fn setup_test_app() -> TestApp {
    let settings = LambdaSettings::from_options(
        json!({ "callback_url": CALLBACK_URL, "region": "us-east-1" })
            .as_object()
            .unwrap(),
    )
    .unwrap();
    let storages = Storages::new()
        .with(CACHE, StorageConfig::new("cache-bucket").with_prefix("cache"))
        .with(STORE, StorageConfig::new("store-bucket").with_prefix("store"));
    let hook = processing_hook(|_, _| {
        Ok(ProcessingOverrides::new()
            .function("Resize")
            .version(VersionSpec::new("size40", STORE).resize(40, 40)))
    });

    let provider = MockComputeProvider::new().with_functions(&["Resize"]);
    let repository = InMemoryRecordRepository::new();
    repository.insert(Record::new(RecordRef::new("User", "1")).with_attribute("avatar_data", None));

    let plugin = LambdaPlugin::new(
        settings,
        storages,
        hook,
        Arc::new(provider.clone()),
        Arc::new(repository.clone()),
    )
    .unwrap();

    let dispatch_queue = DispatchQueue::new(plugin.clone(), 16, 2);
    let state = Arc::new(AppState::new(plugin.clone(), dispatch_queue));
    let router = routes::build_router(state, MAX_BODY_BYTES);
    let server = TestServer::new(router.into_make_service()).unwrap();

    TestApp {
        server,
        plugin,
        provider,
        repository,
    }
}

pub fn dispatch_data() -> DispatchData {
    let cached = UploadedFile::new("abc.jpg", CACHE)
        .with_metadata("filename", "me.jpg")
        .with_metadata("mime_type", "image/jpeg");
    DispatchData::new(&cached, RecordRef::new("User", "1"), "avatar").unwrap()
}

/// Body the remote function would send back for `payload`.
pub fn callback_body(payload: &Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "versions": {
            "original": {
                "id": payload["path"],
                "storage": "store",
                "metadata": payload["attachment"]["metadata"],
            },
            "size40": {
                "id": format!("{}-size40", payload["path"].as_str().unwrap()),
                "storage": "store",
                "metadata": { "mime_type": "image/jpeg" },
            },
        },
        "context": payload["context"],
    }))
    .unwrap()
}

pub fn sent_key(payload: &Value) -> String {
    payload["attachment"]["metadata"]["key"]
        .as_str()
        .unwrap()
        .to_string()
}
