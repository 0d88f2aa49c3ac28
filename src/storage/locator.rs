use std::time::Duration;

use anyhow::{anyhow, Context};
use log::debug;
use reqwest::blocking::Client;

/// Header object storage answers bucket requests with, naming the bucket's
/// region.
const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

/// Answers where a bucket lives.
pub trait BucketLocator {
    /// Returns the bucket's location constraint; `None` for buckets created
    /// without one.
    fn bucket_location(&self, bucket: &str) -> anyhow::Result<Option<String>>;
}

/// Resolves bucket regions over HTTP.
///
/// A `HEAD` on the bucket endpoint carries the region header whether or not
/// the caller may read the bucket, so no credentials are needed.
pub struct HttpBucketLocator {
    endpoint: String,
    client: Client,
}

impl HttpBucketLocator {
    pub const DEFAULT_ENDPOINT: &'static str = "s3.amazonaws.com";

    pub fn new() -> anyhow::Result<Self> {
        Self::with_endpoint(Self::DEFAULT_ENDPOINT)
    }

    /// Creates a locator talking to a custom endpoint host.
    pub fn with_endpoint(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("https://{bucket}.{}", self.endpoint)
    }
}

impl BucketLocator for HttpBucketLocator {
    fn bucket_location(&self, bucket: &str) -> anyhow::Result<Option<String>> {
        let url = self.bucket_url(bucket);
        debug!("requesting bucket region from {url}");

        let response = self
            .client
            .head(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;

        let region = response
            .headers()
            .get(BUCKET_REGION_HEADER)
            .ok_or_else(|| {
                anyhow!(
                    "{url} answered {} without a {BUCKET_REGION_HEADER} header",
                    response.status()
                )
            })?
            .to_str()
            .context("bucket region header is not valid text")?;

        Ok(Some(region.to_string()))
    }
}
