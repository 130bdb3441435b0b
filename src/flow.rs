use serde::Serialize;
use tracing::info;

use crate::codec::Codec;
use crate::config::MirrorConfig;
use crate::domain::{SnapshotDate, lz4_name, unpacked_name};
use crate::error::MirrorError;
use crate::fetch::Fetcher;
use crate::s3::ObjectStore;
use crate::scratch::{Scratch, walk_files};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Skipped,
    Success,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub snapshot: String,
    pub outcome: RunOutcome,
    pub uploaded: Vec<String>,
}

/// The snapshot copy flow: check the completion marker, fetch the manifest
/// into scratch, transform and publish every artifact, then mark the
/// snapshot done. The marker is written only after every upload succeeded,
/// so its presence always means a complete snapshot.
pub struct CopyFlow<F: Fetcher, S: ObjectStore, C: Codec> {
    config: MirrorConfig,
    fetcher: F,
    store: S,
    codec: C,
}

impl<F: Fetcher, S: ObjectStore, C: Codec> CopyFlow<F, S, C> {
    pub fn new(config: MirrorConfig, fetcher: F, store: S, codec: C) -> Self {
        Self {
            config,
            fetcher,
            store,
            codec,
        }
    }

    /// One complete run for the given snapshot date. `Err` means a failed
    /// run: no marker was written and whatever partial artifacts landed
    /// remotely stay there until a later run republishes the full set.
    pub fn run_once(&self, date: &SnapshotDate) -> Result<RunReport, MirrorError> {
        let prefix = date.prefix_under(&self.config.top_folder);
        let marker = date.marker_key(&self.config.top_folder);

        if self.store.exists(&marker)? {
            info!(marker = %marker, "snapshot already published, skipping run");
            return Ok(RunReport {
                snapshot: date.to_string(),
                outcome: RunOutcome::Skipped,
                uploaded: Vec::new(),
            });
        }

        let scratch = Scratch::new()?;

        for file in &self.config.manifest.files {
            info!(path = %file.remote_path, "fetching file");
            let dest = scratch.file_path(file.base_name());
            self.fetcher.fetch_file(&file.remote_path, &dest)?;
        }
        for folder in &self.config.manifest.folders {
            info!(path = %folder.remote_path, "fetching folder");
            self.fetcher
                .fetch_dir(&folder.remote_path, scratch.root(), folder.cut_dirs)?;
        }

        let mut uploaded = Vec::new();
        for file in &self.config.manifest.files {
            let name = file.base_name();
            let src = scratch.file_path(name);
            let key = format!("{prefix}/{name}");
            self.store.upload_file(&src, &key)?;
            uploaded.push(key);

            if file.unpack {
                let plain = unpacked_name(name)?;
                let plain_path = scratch.file_path(&plain);
                info!(name, "unpacking");
                self.codec.gunzip(&src, &plain_path)?;
                let key = format!("{prefix}/{plain}");
                self.store.upload_file(&plain_path, &key)?;
                uploaded.push(key);

                // An lz4 copy as well: more reliable for consumers that
                // re-download the data frequently.
                let packed = lz4_name(&plain);
                let packed_path = scratch.file_path(&packed);
                info!(name = packed.as_str(), "recompressing");
                self.codec.lz4_compress(&plain_path, &packed_path)?;
                let key = format!("{prefix}/{packed}");
                self.store.upload_file(&packed_path, &key)?;
                uploaded.push(key);
            }
        }

        for folder in &self.config.manifest.folders {
            let base = folder.base_name();
            let local_dir = scratch.folder_path(base);
            for member in walk_files(&local_dir)? {
                let rel = member
                    .strip_prefix(&local_dir)
                    .map_err(|_| MirrorError::Filesystem(format!("{member} escaped scratch")))?;
                let key = format!("{prefix}/{base}/{rel}");
                self.store.upload_file(&member, &key)?;
                uploaded.push(key);
            }
        }

        self.store.put_empty(&marker)?;
        info!(marker = %marker, uploads = uploaded.len(), "copy flow finished");

        Ok(RunReport {
            snapshot: date.to_string(),
            outcome: RunOutcome::Success,
            uploaded,
        })
    }
}
