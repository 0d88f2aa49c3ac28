//! Access configuration for model paths that live in object storage.

mod env;
mod locator;

use log::info;

pub use env::{EnvSink, ProcessEnv, RecordingEnv};
pub use locator::{BucketLocator, HttpBucketLocator};

use crate::error::{Result, TrainerError};

pub const S3_SCHEME: &str = "s3://";
pub const S3_USE_HTTPS: &str = "S3_USE_HTTPS";
pub const S3_REGION: &str = "S3_REGION";

/// Region of buckets whose location constraint is empty.
const DEFAULT_REGION: &str = "us-east-1";

/// A parsed `s3://bucket/key` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    /// Returns `true` if `path` uses the object storage scheme.
    pub fn is_s3(path: &str) -> bool {
        path.starts_with(S3_SCHEME)
    }

    /// Splits an `s3://bucket/key` URI into its bucket and key.
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(S3_SCHEME)
            .ok_or_else(|| TrainerError::InvalidModelPath(path.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(TrainerError::InvalidModelPath(path.to_string()));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// Maps a bucket location constraint to the region its data lives in.
pub fn region_from_location_constraint(constraint: Option<&str>) -> &str {
    match constraint {
        None | Some("") => DEFAULT_REGION,
        Some("EU") => "eu-west-1",
        Some(region) => region,
    }
}

/// Points the framework's object storage client at the region of the bucket
/// behind `model_path`, over HTTPS.
///
/// # Arguments
/// * `model_path` - An `s3://bucket/key` URI.
/// * `locator` - Answers where the bucket lives.
/// * `env` - Receives the client settings.
///
/// # Returns
/// The parsed location, or an error if the path is malformed or the lookup
/// fails.
pub fn configure_s3_file_system(
    model_path: &str,
    locator: &dyn BucketLocator,
    env: &dyn EnvSink,
) -> Result<S3Location> {
    let location = S3Location::parse(model_path)?;
    let constraint = locator
        .bucket_location(&location.bucket)
        .map_err(|source| TrainerError::BucketLocation {
            bucket: location.bucket.clone(),
            source: source.into(),
        })?;
    let region = region_from_location_constraint(constraint.as_deref());

    info!(bucket = location.bucket.as_str(), region = region; "configuring s3 file system");
    env.set(S3_USE_HTTPS, "1");
    env.set(S3_REGION, region);
    Ok(location)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::anyhow;

    use super::*;

    struct FixedLocator {
        constraint: Option<&'static str>,
        asked: RefCell<Vec<String>>,
    }

    impl FixedLocator {
        fn new(constraint: Option<&'static str>) -> Self {
            Self {
                constraint,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl BucketLocator for FixedLocator {
        fn bucket_location(&self, bucket: &str) -> anyhow::Result<Option<String>> {
            self.asked.borrow_mut().push(bucket.to_string());
            Ok(self.constraint.map(str::to_string))
        }
    }

    struct FailingLocator;

    impl BucketLocator for FailingLocator {
        fn bucket_location(&self, _bucket: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("access denied"))
        }
    }

    #[test]
    fn parses_bucket_and_key() {
        let location = S3Location::parse("s3://my/s3/path").unwrap();
        assert_eq!(location.bucket, "my");
        assert_eq!(location.key, "s3/path");

        let location = S3Location::parse("s3://bucket").unwrap();
        assert_eq!(location.bucket, "bucket");
        assert_eq!(location.key, "");
    }

    #[test]
    fn rejects_paths_without_a_bucket() {
        assert!(S3Location::parse("s3:///key").is_err());
        assert!(S3Location::parse("a/local/path").is_err());
    }

    #[test]
    fn configures_region_and_https() {
        let locator = FixedLocator::new(Some("us-west-2"));
        let env = RecordingEnv::default();

        configure_s3_file_system("s3://my/s3/path", &locator, &env).unwrap();

        assert_eq!(*locator.asked.borrow(), vec!["my".to_string()]);
        assert_eq!(env.get(S3_USE_HTTPS).as_deref(), Some("1"));
        assert_eq!(env.get(S3_REGION).as_deref(), Some("us-west-2"));
    }

    #[test]
    fn empty_location_constraint_means_us_east_1() {
        let env = RecordingEnv::default();
        configure_s3_file_system("s3://bucket/x", &FixedLocator::new(None), &env).unwrap();
        assert_eq!(env.get(S3_REGION).as_deref(), Some("us-east-1"));
    }

    #[test]
    fn legacy_eu_constraint_maps_to_eu_west_1() {
        assert_eq!(region_from_location_constraint(Some("EU")), "eu-west-1");
        assert_eq!(region_from_location_constraint(Some("")), "us-east-1");
    }

    #[test]
    fn lookup_failures_propagate() {
        let env = RecordingEnv::default();
        let err = configure_s3_file_system("s3://bucket/x", &FailingLocator, &env).unwrap_err();

        assert!(matches!(err, TrainerError::BucketLocation { ref bucket, .. } if bucket == "bucket"));
        assert!(env.get(S3_REGION).is_none());
    }
}
