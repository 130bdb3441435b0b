use aws_sdk_s3::primitives::ByteStream;
use camino::Utf8Path;
use tracing::info;

use crate::error::MirrorError;

pub trait ObjectStore: Send + Sync {
    /// Whether an object exists at `key`. Returns `Ok(false)` only for a
    /// genuine not-found; transient and permission errors surface as `Err`
    /// so the caller never mistakes them for absence.
    fn exists(&self, key: &str) -> Result<bool, MirrorError>;

    fn upload_file(&self, src: &Utf8Path, key: &str) -> Result<(), MirrorError>;

    fn put_empty(&self, key: &str) -> Result<(), MirrorError>;
}

/// S3-backed store. The async SDK is driven by a private current-thread
/// runtime so the copy flow stays synchronous.
pub struct S3Store {
    runtime: tokio::runtime::Runtime,
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(bucket: &str, endpoint_url: Option<&str>) -> Result<Self, MirrorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| MirrorError::Storage(err.to_string()))?;

        let client = runtime.block_on(async {
            let cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let mut builder = aws_sdk_s3::config::Builder::from(&cfg);
            if let Some(url) = endpoint_url {
                builder = builder.endpoint_url(url).force_path_style(true);
            }
            aws_sdk_s3::Client::from_conf(builder.build())
        });

        Ok(Self {
            runtime,
            client,
            bucket: bucket.to_string(),
        })
    }
}

impl ObjectStore for S3Store {
    fn exists(&self, key: &str) -> Result<bool, MirrorError> {
        let result = self.runtime.block_on(
            self.client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        );
        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(MirrorError::MarkerCheck {
                        key: key.to_string(),
                        message: format!("{err:?}"),
                    })
                }
            }
        }
    }

    fn upload_file(&self, src: &Utf8Path, key: &str) -> Result<(), MirrorError> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(src.as_std_path())
                .await
                .map_err(|err| MirrorError::Upload {
                    key: key.to_string(),
                    message: err.to_string(),
                })?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|err| MirrorError::Upload {
                    key: key.to_string(),
                    message: format!("{err:?}"),
                })?;
            info!(key, "uploaded s3://{}/{key}", self.bucket);
            Ok(())
        })
    }

    fn put_empty(&self, key: &str) -> Result<(), MirrorError> {
        self.runtime.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from_static(b""))
                .send()
                .await
                .map_err(|err| MirrorError::Upload {
                    key: key.to_string(),
                    message: format!("{err:?}"),
                })?;
            Ok(())
        })
    }
}
