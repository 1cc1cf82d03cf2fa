//! The fixed query shapes exchanged with a [`QueryBridge`](crate::QueryBridge).
//!
//! Queries travel as SQL text. `Query` renders that text and parses it back, so an
//! engine only has to understand the three shapes the browser issues:
//!
//! ```text
//! SELECT * FROM GLOB('s3://bucket/**')
//! SELECT * FROM 's3://bucket/a/x.csv' LIMIT 1000
//! SELECT COUNT(*) FROM 's3://bucket/a/x.csv'
//! ```

use crate::{BucketViewError, BucketViewResult, ObjectPath};
use regex::Regex;
use std::{fmt, sync::LazyLock};

/// Name of the column holding each object path in a discovery result.
pub const FILE_COLUMN: &str = "file";

/// Name of the single column of a count result.
pub const COUNT_COLUMN: &str = "count";

// A single-quoted SQL string literal, with '' as the escaped quote.
const LITERAL: &str = r"'((?:[^']|'')*)'";

static GLOB_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*SELECT\s+\*\s+FROM\s+GLOB\s*\(\s*{LITERAL}\s*\)\s*;?\s*$"
    ))
    .expect("valid GLOB regex")
});

static SELECT_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*SELECT\s+\*\s+FROM\s+{LITERAL}(?:\s+LIMIT\s+(\d+))?\s*;?\s*$"
    ))
    .expect("valid SELECT regex")
});

static COUNT_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*SELECT\s+COUNT\s*\(\s*\*\s*\)\s+FROM\s+{LITERAL}\s*;?\s*$"
    ))
    .expect("valid COUNT regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Lists every object matching a glob pattern (one row per object, column `file`).
    Glob { pattern: String },
    /// Reads a source (object path or registered buffer name), optionally limited.
    Select { source: String, limit: Option<u32> },
    /// Counts the rows of a source (one row, column `count`).
    Count { source: String },
}

impl Query {
    /// The discovery query listing all objects of a bucket.
    pub fn discovery(bucket: &str) -> Self {
        Query::Glob {
            pattern: format!("{}**", ObjectPath::bucket_prefix(bucket)),
        }
    }

    /// The preview query; a limit of `None` or `Some(0)` reads every row.
    pub fn preview(source: impl Into<String>, limit: Option<u32>) -> Self {
        Query::Select {
            source: source.into(),
            limit: limit.filter(|&n| n > 0),
        }
    }

    pub fn count(source: impl Into<String>) -> Self {
        Query::Count {
            source: source.into(),
        }
    }

    /// Parses query text. Only the three shapes rendered by `Display` are accepted.
    pub fn parse(text: &str) -> BucketViewResult<Self> {
        if let Some(captures) = GLOB_QUERY.captures(text) {
            return Ok(Query::Glob {
                pattern: unquote(&captures[1]),
            });
        }

        if let Some(captures) = COUNT_QUERY.captures(text) {
            return Ok(Query::Count {
                source: unquote(&captures[1]),
            });
        }

        if let Some(captures) = SELECT_QUERY.captures(text) {
            let limit = captures
                .get(2)
                .map(|m| {
                    m.as_str().parse::<u32>().map_err(|e| {
                        BucketViewError::InvalidQuery(format!("bad LIMIT '{}': {e}", m.as_str()))
                    })
                })
                .transpose()?;
            return Ok(Query::Select {
                source: unquote(&captures[1]),
                limit,
            });
        }

        Err(BucketViewError::InvalidQuery(text.trim().to_string()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Glob { pattern } => write!(f, "SELECT * FROM GLOB({})", quote(pattern)),
            Query::Select {
                source,
                limit: Some(limit),
            } => write!(f, "SELECT * FROM {} LIMIT {limit}", quote(source)),
            Query::Select {
                source,
                limit: None,
            } => write!(f, "SELECT * FROM {}", quote(source)),
            Query::Count { source } => write!(f, "SELECT COUNT(*) FROM {}", quote(source)),
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn unquote(literal: &str) -> String {
    literal.replace("''", "'")
}
