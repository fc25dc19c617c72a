//! Feed Fetcher: downloads every category's feed URL into a
//! timestamped directory with bounded concurrency and a per-request deadline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::error;

use crate::category::CATALOG;
use crate::error::{LoaderError, LoaderResult};

/// Maximum number of in-flight feed downloads.
const MAX_IN_FLIGHT: usize = 5;

/// Per-request deadline.
const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Download every category's feed URL into `dir/<category>.txt`. Succeeds
/// only if every category returned HTTP 200 within the deadline; otherwise
/// returns `LoaderError::DownloadFailed` summarizing which categories failed.
/// Partial output files may remain on disk - the caller must not promote the
/// directory on failure.
pub async fn fetch_all(client: &Client, dir: &Path) -> LoaderResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(LoaderError::Io)?;

    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let tasks = CATALOG.iter().map(|category| {
        let client = client.clone();
        let semaphore = semaphore.clone();
        let dest = dir.join(format!("{}.txt", category.name));
        let name = category.name;
        let url = category.feed_url;

        async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            fetch_one(&client, name, url, &dest).await
        }
    });

    let results = join_all(tasks).await;
    let failed: Vec<&str> = results
        .iter()
        .zip(CATALOG.iter())
        .filter_map(|(r, c)| if r.is_err() { Some(c.name) } else { None })
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(LoaderError::DownloadFailed(failed.join(", ")))
    }
}

async fn fetch_one(client: &Client, name: &str, url: &str, dest: &PathBuf) -> LoaderResult<()> {
    let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| {
            error!(category = name, "feed fetch timed out");
            LoaderError::DownloadFailed(format!("{name}: timed out"))
        })?
        .map_err(|e| {
            error!(category = name, error = %e, "feed fetch transport error");
            LoaderError::DownloadFailed(format!("{name}: {e}"))
        })?;

    if response.status() != reqwest::StatusCode::OK {
        error!(category = name, status = %response.status(), "feed fetch non-200");
        return Err(LoaderError::DownloadFailed(format!(
            "{name}: status {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| LoaderError::DownloadFailed(format!("{name}: {e}")))?;

    tokio::fs::write(dest, body)
        .await
        .map_err(LoaderError::Io)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_one_writes_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4\n"))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out.txt");
        let client = Client::new();
        fetch_one(&client, "test", &format!("{}/feed.txt", server.uri()), &dest)
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&dest).await.unwrap();
        assert_eq!(contents, "1.2.3.4\n");
    }

    #[tokio::test]
    async fn fetch_one_fails_on_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out.txt");
        let client = Client::new();
        let result = fetch_one(&client, "test", &format!("{}/feed.txt", server.uri()), &dest).await;
        assert!(result.is_err());
    }
}
