#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use video_gate::{Config, KeyMaterial, ManualClock};

pub const TEST_KEY: [u8; 32] = [0x5a; 32];
pub const SAMPLE_MANIFEST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n#EXT-X-ENDLIST\n";
pub const STATIC_ASSET: &str = "console.log('player');\n";

/// Test harness that owns one server and the clock it reads
pub struct TestServer {
    _handle: JoinHandle<anyhow::Result<()>>,
    port: u16,
    clock: Arc<ManualClock>,
    workspace: PathBuf,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after letting the caller adjust its config
    pub async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        // Only visible with RUST_LOG set
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let port = portpicker::pick_unused_port().expect("No available port");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let workspace = std::env::temp_dir().join(format!("video-gate-test-{port}-{now}"));
        let _ = tokio::fs::remove_dir_all(&workspace).await;
        init_workspace(&workspace).await;

        let mut config = Config {
            listen_on_port: port,
            signing_key: Some(KeyMaterial::from(TEST_KEY)),
            media_dir: workspace.join("media").display().to_string(),
            static_dir: workspace.join("static").display().to_string(),
            ..Default::default()
        };
        customize(&mut config);
        config.validate().expect("Invalid test config");

        let clock = Arc::new(ManualClock::starting_now());
        let handle = tokio::spawn(video_gate::run_with_clock(config, clock.clone()));

        let server = TestServer {
            _handle: handle,
            port,
            clock,
            workspace,
        };

        // Poll until server is ready
        let client = server.client();
        for _ in 0..200 {
            if let Ok(response) = client.get(server.url("/")).send().await
                && response.status().is_success()
            {
                break;
            }

            sleep(Duration::from_millis(10)).await;
        }

        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Client that neither uses proxies nor follows redirects
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }

    /// Fetch a token via the public endpoint
    pub async fn get_token(&self, client: &reqwest::Client, video_id: &str) -> String {
        let response = client
            .get(self.url("/get-token"))
            .query(&[("video_id", video_id)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "token request for {video_id} failed");

        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn stream_with_query(
        &self,
        client: &reqwest::Client,
        token: &str,
    ) -> reqwest::Response {
        client
            .get(self.url("/stream"))
            .query(&[("token", token)])
            .send()
            .await
            .unwrap()
    }

    pub async fn stream_with_header(
        &self,
        client: &reqwest::Client,
        token: &str,
    ) -> reqwest::Response {
        client
            .get(self.url("/stream"))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .unwrap()
    }
}

async fn init_workspace(workspace: &Path) {
    let media = workspace.join("media");
    tokio::fs::create_dir_all(media.join("sample1")).await.unwrap();
    tokio::fs::write(media.join("sample1/master.m3u8"), SAMPLE_MANIFEST)
        .await
        .unwrap();

    let assets = workspace.join("static");
    tokio::fs::create_dir_all(&assets).await.unwrap();
    tokio::fs::write(assets.join("player.js"), STATIC_ASSET)
        .await
        .unwrap();
}

/// Pull the `detail` field out of an error body
pub async fn detail(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}
