//! GitHub release-backed artifact store
//!
//! Talks to the REST API with blocking ureq calls moved onto the tokio
//! blocking pool. Asset downloads stream to disk and uploads stream from
//! disk, so archive size is never bounded by memory.

use super::store::{ArtifactStore, ReleaseAsset};
use crate::config::schema::GithubConfig;
use crate::error::{ToolsmithError, ToolsmithResult};
use crate::ui::{TransferProgress, UiContext};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use ureq::SendBody;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("toolsmith/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;
const JSON_ACCEPT: &str = "application/vnd.github+json";
const BINARY_ACCEPT: &str = "application/octet-stream";

#[derive(Debug, Clone, Deserialize)]
struct ReleaseInfo {
    id: u64,
    tag_name: String,
    upload_url: String,
}

struct Inner {
    agent: ureq::Agent,
    api_url: String,
    repository: String,
    token: String,
    release: ReleaseInfo,
    ui: UiContext,
}

/// A single GitHub release used as an artifact store
#[derive(Clone)]
pub struct GithubReleaseStore {
    inner: Arc<Inner>,
}

impl GithubReleaseStore {
    /// Look up `release` (a numeric ID or a tag) in `repository` (`owner/name`)
    pub async fn connect(
        config: &GithubConfig,
        repository: &str,
        release: &str,
        token: String,
        ui: UiContext,
    ) -> ToolsmithResult<Self> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(true)
            .build()
            .into();
        Self::connect_with(agent, &config.api_url, repository, release, token, ui).await
    }

    async fn connect_with(
        agent: ureq::Agent,
        api_url: &str,
        repository: &str,
        release: &str,
        token: String,
        ui: UiContext,
    ) -> ToolsmithResult<Self> {
        validate_repository(repository)?;

        let api_url = api_url.trim_end_matches('/').to_string();
        let url = release_url(&api_url, repository, release);

        let lookup_agent = agent.clone();
        let lookup_token = token.clone();
        let info: ReleaseInfo = tokio::task::spawn_blocking(move || {
            get_json(&lookup_agent, &lookup_token, &url)
        })
        .await
        .map_err(|e| ToolsmithError::Internal(format!("release lookup task failed: {}", e)))?
        .map_err(|e| match e {
            ureq::Error::StatusCode(404) => ToolsmithError::ReleaseNotFound {
                repository: repository.to_string(),
                release: release.to_string(),
            },
            ureq::Error::StatusCode(401) => ToolsmithError::GithubNotAuthenticated,
            other => ToolsmithError::transfer("looking up release", other),
        })?;

        debug!("Resolved release {} to id {}", release, info.id);

        Ok(Self {
            inner: Arc::new(Inner {
                agent,
                api_url,
                repository: repository.to_string(),
                token,
                release: info,
                ui,
            }),
        })
    }

    async fn blocking<T, F>(&self, context: &'static str, f: F) -> ToolsmithResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> ToolsmithResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| ToolsmithError::Internal(format!("{} task failed: {}", context, e)))?
    }
}

#[async_trait]
impl ArtifactStore for GithubReleaseStore {
    async fn list_assets(&self) -> ToolsmithResult<Vec<ReleaseAsset>> {
        self.blocking("asset listing", |inner| {
            let mut assets = Vec::new();
            for page in 1.. {
                let url = format!(
                    "{}/repos/{}/releases/{}/assets?per_page={}&page={}",
                    inner.api_url, inner.repository, inner.release.id, PER_PAGE, page
                );
                let batch: Vec<ReleaseAsset> = get_json(&inner.agent, &inner.token, &url)
                    .map_err(|e| ToolsmithError::transfer("listing release assets", e))?;
                let last_page = batch.len() < PER_PAGE;
                assets.extend(batch);
                if last_page {
                    break;
                }
            }
            Ok(assets)
        })
        .await
    }

    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> ToolsmithResult<()> {
        let asset = asset.clone();
        let dest = dest.to_path_buf();
        self.blocking("download", move |inner| {
            let context = format!("downloading {}", asset.name);
            let response = authorized(inner.agent.get(&asset.url), &inner.token, BINARY_ACCEPT)
                .call()
                .map_err(|e| match e {
                    ureq::Error::StatusCode(404) => ToolsmithError::AssetNotFound(asset.name.clone()),
                    other => ToolsmithError::transfer(&context, other),
                })?;

            let file = File::create(&dest)
                .map_err(|e| ToolsmithError::io(format!("creating {}", dest.display()), e))?;
            let progress = TransferProgress::new(&inner.ui, "Downloading", &asset.name, asset.size);
            let mut writer = progress.bar().wrap_write(BufWriter::new(file));
            let mut reader = response.into_body().into_reader();

            io::copy(&mut reader, &mut writer).map_err(|e| ToolsmithError::transfer(&context, e))?;
            writer
                .flush()
                .map_err(|e| ToolsmithError::io(format!("writing {}", dest.display()), e))?;
            progress.finish();
            Ok(())
        })
        .await
    }

    async fn upload_asset(
        &self,
        path: &Path,
        name: &str,
        content_type: &str,
    ) -> ToolsmithResult<u64> {
        let path: PathBuf = path.to_path_buf();
        let name = name.to_string();
        let content_type = content_type.to_string();
        self.blocking("upload", move |inner| {
            let file = File::open(&path)
                .map_err(|e| ToolsmithError::io(format!("opening {}", path.display()), e))?;
            let size = file
                .metadata()
                .map_err(|e| ToolsmithError::io(format!("reading {}", path.display()), e))?
                .len();

            let url = upload_url(&inner.release.upload_url, &name);
            let progress = TransferProgress::new(&inner.ui, "Uploading", &name, size);
            let mut reader = progress.bar().wrap_read(BufReader::new(file));

            #[derive(Deserialize)]
            struct Uploaded {
                id: u64,
            }

            let mut response = authorized(inner.agent.post(&url), &inner.token, JSON_ACCEPT)
                .header("Content-Type", content_type.as_str())
                .header("Content-Length", size.to_string())
                .send(SendBody::from_reader(&mut reader))
                .map_err(|e| match e {
                    ureq::Error::StatusCode(422) => ToolsmithError::DuplicateAsset(name.clone()),
                    other => ToolsmithError::transfer(format!("uploading {}", name), other),
                })?;
            progress.finish();

            let uploaded: Uploaded = response
                .body_mut()
                .read_json()
                .map_err(|e| ToolsmithError::transfer(format!("reading upload response for {}", name), e))?;
            Ok(uploaded.id)
        })
        .await
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.inner.repository, self.inner.release.tag_name)
    }
}

/// Add credentials and API headers. Headers append in ureq, so `accept`
/// is the only Accept value sent.
fn authorized<B>(
    request: ureq::RequestBuilder<B>,
    token: &str,
    accept: &str,
) -> ureq::RequestBuilder<B> {
    request
        .header("Authorization", format!("Bearer {}", token))
        .header("Accept", accept)
        .header("X-GitHub-Api-Version", API_VERSION)
        .header("User-Agent", USER_AGENT)
}

fn get_json<T: DeserializeOwned>(agent: &ureq::Agent, token: &str, url: &str) -> Result<T, ureq::Error> {
    let mut response = authorized(agent.get(url), token, JSON_ACCEPT).call()?;
    response.body_mut().read_json::<T>()
}

/// Numeric releases are addressed by ID, anything else by tag
fn release_url(api_url: &str, repository: &str, release: &str) -> String {
    if !release.is_empty() && release.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/repos/{}/releases/{}", api_url, repository, release)
    } else {
        let tag: String = url::form_urlencoded::byte_serialize(release.as_bytes()).collect();
        format!("{}/repos/{}/releases/tags/{}", api_url, repository, tag)
    }
}

/// Expand the release's `upload_url` template (`...assets{?name,label}`) for `name`.
///
/// `+` in asset names must reach the server as `%2B`.
fn upload_url(template: &str, name: &str) -> String {
    let base = template.split('{').next().unwrap_or(template);
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("{}?name={}", base, encoded)
}

fn validate_repository(repository: &str) -> ToolsmithResult<()> {
    match repository.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok(())
        }
        _ => Err(ToolsmithError::config(format!(
            "repository must be 'owner/name', got '{}'",
            repository
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::{BufRead, Read};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;
    use tempfile::TempDir;

    /// A request as received by the local server
    struct Received {
        request_line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Received {
        fn header(&self, name: &str) -> Vec<&str> {
            self.headers
                .iter()
                .filter(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
                .collect()
        }
    }

    /// Answer one connection per `(status, body)` reply, then hand back the requests
    fn serve(replies: Vec<(u16, Vec<u8>)>) -> (String, JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            replies
                .into_iter()
                .map(|(status, body)| {
                    let (mut stream, _) = listener.accept().unwrap();
                    let received = read_request(&mut stream);
                    let head = format!(
                        "HTTP/1.1 {} Reply\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).unwrap();
                    stream.write_all(&body).unwrap();
                    stream.flush().unwrap();
                    received
                })
                .collect()
        });
        (base, handle)
    }

    fn read_request(stream: &mut TcpStream) -> Received {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }

        let mut body = Vec::new();
        let length = headers
            .iter()
            .find(|(key, _)| key == "content-length")
            .map(|(_, value)| value.parse::<usize>().unwrap());
        let chunked = headers
            .iter()
            .any(|(key, value)| key == "transfer-encoding" && value.contains("chunked"));
        if let Some(length) = length {
            body.resize(length, 0);
            reader.read_exact(&mut body).unwrap();
        } else if chunked {
            loop {
                let mut size = String::new();
                reader.read_line(&mut size).unwrap();
                let size = usize::from_str_radix(size.trim(), 16).unwrap();
                let mut chunk = vec![0; size + 2];
                reader.read_exact(&mut chunk).unwrap();
                if size == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..size]);
            }
        }

        Received {
            request_line: request_line.trim_end().to_string(),
            headers,
            body,
        }
    }

    fn local_agent() -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(true)
            .proxy(None)
            .build()
            .into()
    }

    fn local_store(base: &str) -> GithubReleaseStore {
        GithubReleaseStore {
            inner: Arc::new(Inner {
                agent: local_agent(),
                api_url: base.to_string(),
                repository: "o/r".to_string(),
                token: "secret".to_string(),
                release: ReleaseInfo {
                    id: 7,
                    tag_name: "toolchains".to_string(),
                    upload_url: format!("{}/uploads/7/assets{{?name,label}}", base),
                },
                ui: UiContext::non_interactive(),
            }),
        }
    }

    fn asset_page(ids: std::ops::Range<u64>) -> Vec<u8> {
        let assets: Vec<serde_json::Value> = ids
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "name": format!("gcc-{id}-x86_64-linux-gnu.tar.xz"),
                    "url": format!("https://api.github.com/repos/o/r/releases/assets/{id}"),
                    "size": 1
                })
            })
            .collect();
        serde_json::to_vec(&assets).unwrap()
    }

    #[tokio::test]
    async fn download_sends_a_single_binary_accept() {
        let (base, server) = serve(vec![(200, b"xz bytes".to_vec())]);
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("gcc-13.2.0-x86_64-linux-gnu.tar.xz");
        let asset = ReleaseAsset {
            id: 1,
            name: "gcc-13.2.0-x86_64-linux-gnu.tar.xz".to_string(),
            url: format!("{}/repos/o/r/releases/assets/1", base),
            size: 8,
        };

        local_store(&base).download_asset(&asset, &dest).await.unwrap();

        let received = server.join().unwrap();
        assert!(received[0]
            .request_line
            .starts_with("GET /repos/o/r/releases/assets/1 "));
        assert_eq!(received[0].header("accept"), ["application/octet-stream"]);
        assert_eq!(received[0].header("authorization"), ["Bearer secret"]);
        assert_eq!(std::fs::read(&dest).unwrap(), b"xz bytes");
    }

    #[tokio::test]
    async fn download_of_missing_asset_is_not_found() {
        let (base, server) = serve(vec![(404, br#"{"message":"Not Found"}"#.to_vec())]);
        let temp = TempDir::new().unwrap();
        let asset = ReleaseAsset {
            id: 1,
            name: "gone.tar.xz".to_string(),
            url: format!("{}/repos/o/r/releases/assets/1", base),
            size: 0,
        };

        let err = local_store(&base)
            .download_asset(&asset, &temp.path().join("gone.tar.xz"))
            .await
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ToolsmithError::AssetNotFound(ref name) if name == "gone.tar.xz"));
    }

    #[tokio::test]
    async fn upload_conflict_is_duplicate() {
        let (base, server) = serve(vec![(
            422,
            br#"{"message":"Validation Failed","errors":[{"code":"already_exists"}]}"#.to_vec(),
        )]);
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clang.tar.xz");
        std::fs::write(&file, b"archive").unwrap();

        let err = local_store(&base)
            .upload_asset(&file, "clang+llvm-17.0.6-x86_64-linux-gnu.tar.xz", "application/x-xz")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Duplicate);
        let received = server.join().unwrap();
        assert!(received[0].request_line.starts_with(
            "POST /uploads/7/assets?name=clang%2Bllvm-17.0.6-x86_64-linux-gnu.tar.xz "
        ));
        assert_eq!(received[0].header("content-type"), ["application/x-xz"]);
        assert_eq!(received[0].header("accept"), [JSON_ACCEPT]);
        assert_eq!(received[0].body, b"archive");
    }

    #[tokio::test]
    async fn upload_returns_new_asset_id() {
        let (base, server) = serve(vec![(201, br#"{"id":99,"name":"cmake.tar.xz"}"#.to_vec())]);
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cmake.tar.xz");
        std::fs::write(&file, b"cmake").unwrap();

        let id = local_store(&base)
            .upload_asset(&file, "cmake.tar.xz", "application/x-xz")
            .await
            .unwrap();

        assert_eq!(id, 99);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn listing_follows_pages_until_short_page() {
        let (base, server) = serve(vec![(200, asset_page(0..100)), (200, asset_page(100..101))]);

        let assets = local_store(&base).list_assets().await.unwrap();

        assert_eq!(assets.len(), 101);
        assert_eq!(assets[100].id, 100);
        let received = server.join().unwrap();
        assert_eq!(received.len(), 2);
        assert!(received[0]
            .request_line
            .contains("/repos/o/r/releases/7/assets?per_page=100&page=1 "));
        assert!(received[1]
            .request_line
            .contains("/repos/o/r/releases/7/assets?per_page=100&page=2 "));
        assert_eq!(received[1].header("accept"), [JSON_ACCEPT]);
    }

    #[tokio::test]
    async fn connect_resolves_tag() {
        let info = br#"{"id":42,"tag_name":"toolchains","upload_url":"https://uploads.github.com/repos/o/r/releases/42/assets{?name,label}"}"#;
        let (base, server) = serve(vec![(200, info.to_vec())]);

        let store = GithubReleaseStore::connect_with(
            local_agent(),
            &format!("{}/", base),
            "o/r",
            "toolchains",
            "secret".to_string(),
            UiContext::non_interactive(),
        )
        .await
        .unwrap();

        assert_eq!(store.describe(), "o/r@toolchains");
        assert_eq!(store.inner.release.id, 42);
        let received = server.join().unwrap();
        assert!(received[0]
            .request_line
            .starts_with("GET /repos/o/r/releases/tags/toolchains "));
    }

    #[tokio::test]
    async fn connect_maps_lookup_failures() {
        for (status, expected) in [(404, ErrorKind::NotFound), (401, ErrorKind::Configuration)] {
            let (base, server) = serve(vec![(status, b"{}".to_vec())]);
            let err = match GithubReleaseStore::connect_with(
                local_agent(),
                &base,
                "o/r",
                "17",
                "secret".to_string(),
                UiContext::non_interactive(),
            )
            .await
            {
                Ok(_) => panic!("expected an error for status {status}"),
                Err(err) => err,
            };
            server.join().unwrap();
            assert_eq!(err.kind(), expected, "status {status}");
        }
    }

    #[test]
    fn upload_url_strips_template_and_encodes_plus() {
        let url = upload_url(
            "https://uploads.github.com/repos/o/r/releases/7/assets{?name,label}",
            "clang+llvm-17.0.6-x86_64-linux-gnu.tar.xz",
        );
        assert_eq!(
            url,
            "https://uploads.github.com/repos/o/r/releases/7/assets?name=clang%2Bllvm-17.0.6-x86_64-linux-gnu.tar.xz"
        );
    }

    #[test]
    fn upload_url_without_template() {
        let url = upload_url("https://uploads.example/assets", "gcc-13.tar.xz");
        assert_eq!(url, "https://uploads.example/assets?name=gcc-13.tar.xz");
    }

    #[test]
    fn release_url_by_id_or_tag() {
        assert_eq!(
            release_url("https://api.github.com", "o/r", "123456"),
            "https://api.github.com/repos/o/r/releases/123456"
        );
        assert_eq!(
            release_url("https://api.github.com", "o/r", "toolchains-v2"),
            "https://api.github.com/repos/o/r/releases/tags/toolchains-v2"
        );
    }

    #[test]
    fn repository_must_be_owner_slash_name() {
        assert!(validate_repository("llvm/llvm-project").is_ok());
        assert!(validate_repository("llvm").is_err());
        assert!(validate_repository("/x").is_err());
        assert!(validate_repository("a/b/c").is_err());
    }

    #[test]
    fn release_info_deserializes() {
        let json = r#"{
            "id": 42,
            "tag_name": "toolchains",
            "upload_url": "https://uploads.github.com/repos/o/r/releases/42/assets{?name,label}",
            "draft": false
        }"#;
        let info: ReleaseInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, 42);
        assert_eq!(info.tag_name, "toolchains");
    }
}
