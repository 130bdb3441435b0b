use std::fs::{self, File, OpenOptions};
use std::io;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};
use tracing::debug;

use crate::error::MirrorError;

pub trait Fetcher: Send + Sync {
    /// Fetch a single remote file into `dest`. A partially downloaded
    /// destination is continued from its current length, not restarted.
    fn fetch_file(&self, remote_path: &str, dest: &Utf8Path) -> Result<(), MirrorError>;

    /// Recursively fetch a remote directory tree under `dest_root`,
    /// dropping `cut_dirs` leading path segments when mapping members to
    /// local names and skipping index pages and crawl-control files.
    fn fetch_dir(
        &self,
        remote_path: &str,
        dest_root: &Utf8Path,
        cut_dirs: usize,
    ) -> Result<(), MirrorError>;
}

enum ListingEntry {
    File(String),
    Dir(String),
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    link_re: Regex,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("refmirror/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MirrorError::FetchHttp(err.to_string()))?,
        );

        // No overall request timeout: the manifest carries multi-gigabyte
        // archives and the body read is bounded by the connection, not a
        // deadline.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| MirrorError::FetchHttp(err.to_string()))?;

        let link_re = Regex::new(r#"href="([^"]*)""#)
            .map_err(|err| MirrorError::FetchHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            link_re,
        })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, MirrorError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(MirrorError::FetchHttp(err.to_string()));
                }
            }
        }
    }

    fn listing_entries(&self, url: &str) -> Result<Vec<ListingEntry>, MirrorError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Listing {
                url: url.to_string(),
                message: format!("status {}", status.as_u16()),
            });
        }
        let body = response.text().map_err(|err| MirrorError::Listing {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let mut entries = Vec::new();
        for captures in self.link_re.captures_iter(&body) {
            let Some(href) = member_href(&captures[1]) else {
                continue;
            };
            match href.strip_suffix('/') {
                Some(dir) => entries.push(ListingEntry::Dir(dir.to_string())),
                None => entries.push(ListingEntry::File(href.to_string())),
            }
        }
        Ok(entries)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_file(&self, remote_path: &str, dest: &Utf8Path) -> Result<(), MirrorError> {
        let url = format!("{}{remote_path}", self.base_url);
        let resume_from = fs::metadata(dest.as_std_path())
            .map(|meta| meta.len())
            .unwrap_or(0);

        let mut response = self.send_with_retries(|| {
            let mut request = self.client.get(&url);
            if resume_from > 0 {
                request = request.header(RANGE, format!("bytes={resume_from}-"));
            }
            request
        })?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // Local copy already spans the full remote length.
            debug!(url = %url, resume_from, "nothing left to resume");
            return Ok(());
        }
        if !status.is_success() {
            return Err(MirrorError::FetchStatus {
                status: status.as_u16(),
                url,
            });
        }

        let mut file = if status == StatusCode::PARTIAL_CONTENT {
            debug!(url = %url, resume_from, "resuming partial download");
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(dest.as_std_path())
                .map_err(|err| MirrorError::Filesystem(err.to_string()))?
        } else {
            // Server ignored the range request; start over.
            File::create(dest.as_std_path())
                .map_err(|err| MirrorError::Filesystem(err.to_string()))?
        };
        io::copy(&mut response, &mut file)
            .map_err(|err| MirrorError::FetchHttp(format!("{url}: {err}")))?;
        Ok(())
    }

    fn fetch_dir(
        &self,
        remote_path: &str,
        dest_root: &Utf8Path,
        cut_dirs: usize,
    ) -> Result<(), MirrorError> {
        let remote_path = remote_path.trim_end_matches('/');
        let url = format!("{}{remote_path}/", self.base_url);

        // Mirror the directory itself even when it turns out empty, so the
        // publish phase always finds it in scratch.
        let local_dir = dest_root.join(local_rel_path(remote_path, cut_dirs));
        fs::create_dir_all(local_dir.as_std_path())
            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;

        for entry in self.listing_entries(&url)? {
            match entry {
                ListingEntry::Dir(name) => {
                    self.fetch_dir(&format!("{remote_path}/{name}"), dest_root, cut_dirs)?;
                }
                ListingEntry::File(name) => {
                    if is_excluded(&name) {
                        continue;
                    }
                    let child_remote = format!("{remote_path}/{name}");
                    let local = dest_root.join(local_rel_path(&child_remote, cut_dirs));
                    if let Some(parent) = local.parent() {
                        fs::create_dir_all(parent.as_std_path())
                            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;
                    }
                    self.fetch_file(&child_remote, &local)?;
                }
            }
        }
        Ok(())
    }
}

/// Auto-generated index pages and crawl-control files are not data and are
/// never mirrored.
fn is_excluded(name: &str) -> bool {
    name.starts_with("index.html") || name == "robots.txt"
}

/// Maps a remote absolute path to its local relative form, dropping the
/// `cut_dirs` non-interesting leading segments.
fn local_rel_path(remote_path: &str, cut_dirs: usize) -> Utf8PathBuf {
    remote_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .skip(cut_dirs)
        .collect()
}

/// Accepts only hrefs that name a direct child of the listing: autoindex
/// pages also carry sort links, parent links, and absolute URLs.
fn member_href(href: &str) -> Option<&str> {
    if href.is_empty()
        || href.starts_with('?')
        || href.starts_with('#')
        || href.starts_with('/')
        || href.contains(':')
    {
        return None;
    }
    if href == "./" || href == ".." || href.starts_with("../") {
        return None;
    }
    let trimmed = href.strip_suffix('/').unwrap_or(href);
    if trimmed.is_empty() || trimmed.contains('/') {
        return None;
    }
    Some(href)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
