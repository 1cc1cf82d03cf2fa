use crate::{BucketViewError, BucketViewResult, FileExtension};
use std::fmt;

/// Scheme prefix shared by every object path.
pub const SCHEME: &str = "s3://";

/// Separator between the bucket and each path segment.
pub const SEPARATOR: char = '/';

/// A fully-qualified, bucket-relative object identifier: `s3://<bucket>/<seg>/<seg>/...`.
///
/// Segments are kept verbatim, empty ones included, so that
/// `ObjectPath::parse(bucket, s)?.to_string() == s` for every `s` under the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath {
    bucket: String,
    segments: Vec<String>,
}

impl ObjectPath {
    pub fn new<I, S>(bucket: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectPath {
            bucket: bucket.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The `s3://<bucket>/` prefix stripped from every path of the bucket.
    pub fn bucket_prefix(bucket: &str) -> String {
        format!("{SCHEME}{bucket}{SEPARATOR}")
    }

    /// Parses a full path string that must live under `bucket`.
    pub fn parse(bucket: &str, full_path: &str) -> BucketViewResult<Self> {
        let prefix = Self::bucket_prefix(bucket);
        let relative =
            full_path
                .strip_prefix(&prefix)
                .ok_or_else(|| BucketViewError::ForeignPath {
                    path: full_path.to_string(),
                    bucket: bucket.to_string(),
                })?;

        Ok(ObjectPath::new(bucket, relative.split(SEPARATOR)))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The bucket-relative part, e.g. `a/x.csv`.
    pub fn relative(&self) -> String {
        self.segments.join(&SEPARATOR.to_string())
    }

    /// The last segment, or `""` for a path with no segments.
    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn extension(&self) -> FileExtension {
        FileExtension::from_name(self.file_name())
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::bucket_prefix(&self.bucket), self.relative())
    }
}
