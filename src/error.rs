use polars::prelude::PolarsError;
use std::{io, path::PathBuf};
use thiserror::Error;
use tokio::task::JoinError;

/**
Result type to simplify function signatures.

This is a custom result type that uses our custom `BucketViewError` for the error type.

Functions can return `BucketViewResult<T>` and then use `?` to automatically propagate errors.
*/
pub type BucketViewResult<T> = Result<T, BucketViewError>;

/**
Custom error type for Bucket View.

This enum defines all the possible errors that can occur in the application.

Every variant renders to a message that is shown to the user as-is in the drop zone
or in the connection dialog, so the `#[error(...)]` texts are written for people.
*/
#[derive(Error, Debug)]
pub enum BucketViewError {
    // Wrapper for standard IO errors.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Wrapper for Polars errors. Covers reader failures and SQL execution errors.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    // Wrapper for Tokio JoinErrors, occurring when asynchronous tasks fail.
    #[error("Tokio JoinError: {0}")]
    TokioJoin(#[from] JoinError),

    // Errors occurring when receiving data from asynchronous channels.
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    // A source path that maps to nothing in the backing store.
    #[error("File not found: {0:#?}")]
    FileNotFound(PathBuf),

    // User-facing rejection of a file (e.g. a non-CSV file dropped on the window).
    #[error("File type error: {0}")]
    FileType(String),

    // The query engine cannot read this format.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Query text that is not one of the supported query shapes.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A query names a registered buffer or path the engine does not know about.
    #[error("Unknown query source: '{0}'")]
    UnknownSource(String),

    #[error("A connection token is required")]
    MissingToken,

    #[error("A bucket name is required")]
    MissingBucket,

    /// A path string that does not live under the session's bucket.
    #[error("Path '{path}' is not inside bucket '{bucket}'")]
    ForeignPath { path: String, bucket: String },

    /// The system clipboard could not be read.
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Invalid value for command-line argument '{arg_name}': {reason}")]
    InvalidArgument {
        arg_name: String, // Context about *which* argument failed
        reason: String,   // The specific error reason
    },

    // A catch-all for other, less specific errors not covered by specific variants.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<arboard::Error> for BucketViewError {
    fn from(err: arboard::Error) -> BucketViewError {
        BucketViewError::Clipboard(err.to_string())
    }
}

// Implementation of the From trait to convert a String into a BucketViewError.
impl From<String> for BucketViewError {
    fn from(err: String) -> BucketViewError {
        // Prefer using specific error variants when possible, fallback to Other.
        BucketViewError::Other(err)
    }
}
