// 🖼️ Thumbnails - Image lookup behind a trait, bounded concurrent loading
// A failed fetch never fails the run: the item is shown as "not found"

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

// ============================================================================
// IMAGE SOURCE
// ============================================================================

/// A thumbnail ready for the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub url: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Where thumbnails come from
///
/// Implementations are blocking; the loader runs them on the blocking pool.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str, size: (u32, u32)) -> Result<ImageHandle>;
}

/// Previously downloaded thumbnails in a local cache directory
///
/// File name: `<sha256(url)>_<w>x<h>.png`. No network access.
pub struct CacheDirImageSource {
    dir: PathBuf,
}

impl CacheDirImageSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CacheDirImageSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Cache key for a URL
    pub fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn cache_path(&self, url: &str, size: (u32, u32)) -> PathBuf {
        self.dir
            .join(format!("{}_{}x{}.png", CacheDirImageSource::cache_key(url), size.0, size.1))
    }
}

impl ImageSource for CacheDirImageSource {
    fn fetch(&self, url: &str, size: (u32, u32)) -> Result<ImageHandle> {
        let path = self.cache_path(url, size);

        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Thumbnail not cached for {} ({:?})", url, path))?;
        if metadata.len() == 0 {
            bail!("Cached thumbnail is empty: {:?}", path);
        }

        Ok(ImageHandle {
            url: url.to_string(),
            path,
            width: size.0,
            height: size.1,
        })
    }
}

// ============================================================================
// THUMBNAIL LOADER
// ============================================================================

/// One image to load: `None` url means the item has nothing to show
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub url: Option<String>,
    pub size: (u32, u32),
}

/// Fetches thumbnails with at most `max_concurrent` in flight
pub struct ThumbnailLoader {
    source: Arc<dyn ImageSource>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ThumbnailLoader {
    pub fn new(source: Arc<dyn ImageSource>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        ThumbnailLoader {
            source,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Load every request; output order matches input order
    pub async fn load_all(&self, requests: Vec<ThumbnailRequest>) -> Vec<Option<ImageHandle>> {
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&self.semaphore);

            handles.push(tokio::spawn(async move {
                let url = request.url?;

                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        log::warn!("Thumbnail loader closed before {}: {}", url, e);
                        return None;
                    }
                };

                let size = request.size;
                let fetch_url = url.clone();
                match tokio::task::spawn_blocking(move || source.fetch(&fetch_url, size)).await {
                    Ok(Ok(handle)) => Some(handle),
                    Ok(Err(e)) => {
                        log::warn!("Thumbnail unavailable for {}: {:#}", url, e);
                        None
                    }
                    Err(e) => {
                        log::warn!("Thumbnail task failed for {}: {}", url, e);
                        None
                    }
                }
            }));
        }

        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap_or_else(|e| {
                log::warn!("Thumbnail task panicked: {}", e);
                None
            }));
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts concurrent fetches; urls containing "broken" fail
    struct CountingSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ImageSource for CountingSource {
        fn fetch(&self, url: &str, size: (u32, u32)) -> Result<ImageHandle> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("broken") {
                bail!("HTTP 404");
            }
            Ok(ImageHandle {
                url: url.to_string(),
                path: PathBuf::from(url),
                width: size.0,
                height: size.1,
            })
        }
    }

    fn requests(urls: &[Option<&str>]) -> Vec<ThumbnailRequest> {
        urls.iter()
            .map(|u| ThumbnailRequest {
                url: u.map(str::to_string),
                size: (200, 200),
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(CountingSource {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let loader = ThumbnailLoader::new(source.clone(), 3);

        let urls: Vec<String> = (0..12).map(|i| format!("https://img/{}.png", i)).collect();
        let reqs = urls
            .iter()
            .map(|u| ThumbnailRequest {
                url: Some(u.clone()),
                size: (100, 100),
            })
            .collect();

        let loaded = loader.load_all(reqs).await;

        assert_eq!(loaded.len(), 12);
        assert!(loaded.iter().all(Option::is_some));
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(loaded[7].as_ref().unwrap().url, "https://img/7.png");
    }

    #[tokio::test]
    async fn test_failures_degrade_to_none() {
        let source = Arc::new(CountingSource {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let loader = ThumbnailLoader::new(source, 15);

        let loaded = loader
            .load_all(requests(&[Some("https://img/a.png"), Some("https://img/broken.png"), None]))
            .await;

        assert!(loaded[0].is_some());
        assert!(loaded[1].is_none());
        assert!(loaded[2].is_none());
    }

    #[test]
    fn test_cache_dir_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = CacheDirImageSource::new(dir.path());
        let url = "https://fortnite-api.com/images/cosmetics/br/cid_013_athena_commando_f/icon.png";

        assert!(source.fetch(url, (200, 200)).is_err());

        let path = source.cache_path(url, (200, 200));
        assert!(path.to_string_lossy().ends_with("_200x200.png"));
        std::fs::write(&path, b"\x89PNG").unwrap();

        let handle = source.fetch(url, (200, 200)).unwrap();
        assert_eq!(handle.path, path);
        assert!(source.fetch(url, (80, 80)).is_err());
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let key = CacheDirImageSource::cache_key("https://img/a.png");
        assert_eq!(key.len(), 64);
        assert_eq!(key, CacheDirImageSource::cache_key("https://img/a.png"));
        assert_ne!(key, CacheDirImageSource::cache_key("https://img/b.png"));
    }

    #[tokio::test]
    async fn test_missing_cache_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ThumbnailLoader::new(Arc::new(CacheDirImageSource::new(dir.path())), 0);

        assert_eq!(loader.max_concurrent(), 1);
        let loaded = loader.load_all(requests(&[Some("https://img/missing.png")])).await;
        assert_eq!(loaded, vec![None]);
    }
}
