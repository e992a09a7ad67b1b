use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::track::Track;

const DEFAULT_EXTENSION: &str = "mp3";
const METADATA_FILE: &str = "metadata.json";
const PARTIAL_SUFFIX: &str = ".part";

/// Metadata written next to each downloaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAudio {
    pub track: Track,
    pub local_path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

/// Downloads track audio once into `<dir>/<track id>/`.
///
/// Every download is bounded by `timeout`. Bytes land in a `.part` file that is
/// renamed into place only once the body has been fully written.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    http: reqwest::Client,
    timeout: Duration,
}

impl AudioCache {
    pub fn new(dir: PathBuf, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { dir, http, timeout })
    }

    pub fn target_path(&self, track: &Track) -> Result<PathBuf> {
        let audio_url = track
            .audio_url
            .as_deref()
            .ok_or_else(|| anyhow!("track {} has no audio yet", track.id))?;
        let file_name = format!("{}.{}", slug(&track.title), extension(audio_url));
        Ok(self.dir.join(sanitize(&track.id)).join(file_name))
    }

    /// Returns the local copy, fetching it only when it is not on disk yet.
    pub async fn fetch(&self, track: &Track) -> Result<LocalAudio> {
        let audio_url = track
            .audio_url
            .as_deref()
            .ok_or_else(|| anyhow!("track {} has no audio yet", track.id))?;
        let target = self.target_path(track)?;
        let job_dir = target.parent().map(Path::to_path_buf).unwrap_or_else(|| self.dir.clone());

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!(path = %target.display(), "audio already cached");
            return self.describe(track, target, &job_dir).await;
        }

        info!(track = %track.id, "downloading audio");
        let response = self
            .http
            .get(audio_url)
            .send()
            .await
            .map_err(|err| self.download_error(audio_url, err))?;
        if !response.status().is_success() {
            anyhow::bail!("audio download responded with status {}", response.status());
        }
        let bytes = response.bytes().await.map_err(|err| self.download_error(audio_url, err))?;

        tokio::fs::create_dir_all(&job_dir)
            .await
            .with_context(|| format!("failed to create track dir {}", job_dir.display()))?;
        let partial = partial_path(&target);
        if let Err(err) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(anyhow::Error::new(err)
                .context(format!("failed to write audio to {}", partial.display())));
        }
        tokio::fs::rename(&partial, &target)
            .await
            .with_context(|| format!("failed to move audio into {}", target.display()))?;

        self.describe(track, target, &job_dir).await
    }

    fn download_error(&self, audio_url: &str, err: reqwest::Error) -> anyhow::Error {
        if err.is_timeout() {
            warn!(url = audio_url, timeout = ?self.timeout, "audio download timed out");
            let message = format!("audio download from {audio_url} timed out after {:?}", self.timeout);
            return anyhow::Error::new(err).context(message);
        }
        anyhow::Error::new(err).context(format!("failed to download {audio_url}"))
    }

    async fn describe(&self, track: &Track, local_path: PathBuf, job_dir: &Path) -> Result<LocalAudio> {
        let metadata_path = job_dir.join(METADATA_FILE);
        if let Ok(existing) = tokio::fs::read_to_string(&metadata_path).await {
            if let Ok(local) = serde_json::from_str::<LocalAudio>(&existing) {
                if local.local_path == local_path {
                    return Ok(local);
                }
            }
        }

        let local = LocalAudio { track: track.clone(), local_path, downloaded_at: Utc::now() };
        let metadata_json =
            serde_json::to_vec_pretty(&local).context("failed to encode audio metadata")?;
        tokio::fs::create_dir_all(job_dir)
            .await
            .with_context(|| format!("failed to create track dir {}", job_dir.display()))?;
        tokio::fs::write(&metadata_path, metadata_json)
            .await
            .with_context(|| format!("failed to write metadata at {}", metadata_path.display()))?;
        Ok(local)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

fn extension(audio_url: &str) -> String {
    Url::parse(audio_url)
        .ok()
        .and_then(|url| {
            let last = url.path_segments()?.last()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            (!ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .then_some(ext)
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn slug(title: &str) -> String {
    let mut out = String::new();
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "track".to_string()
    } else {
        out
    }
}

fn sanitize(id: &str) -> String {
    id.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}
