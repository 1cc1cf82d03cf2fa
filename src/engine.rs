//! A [`QueryBridge`] backed by Polars, reading objects from a local directory tree.
//!
//! The directory given as `root` plays the object store: bucket `b` is the
//! sub-directory `root/b`, and `s3://b/a/x.csv` is the file `root/b/a/x.csv`.
//! Dropped files are kept in memory as DataFrames and queried by name.

use crate::{
    BucketViewError, BucketViewResult, COUNT_COLUMN, FILE_COLUMN, FileExtension, Query,
    QueryBridge, Row, SCHEME, SEPARATOR, Scalar, TableResult,
};

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use polars::{prelude::*, sql::SQLContext};
use std::{
    collections::HashMap,
    fmt::Debug,
    fs::File,
    io::{self, Cursor},
    path::{Component, Path, PathBuf},
};
use tokio::{sync::RwLock, task::spawn_blocking};
use walkdir::WalkDir;

/// Table name a source is registered under inside the SQL context.
const SOURCE_TABLE: &str = "source";

pub struct PolarsEngine {
    /// Directory holding one sub-directory per bucket.
    root: PathBuf,
    /// DataFrames registered from in-memory buffers, by logical name.
    buffers: RwLock<HashMap<String, DataFrame>>,
}

impl PolarsEngine {
    /// Opens an engine over `root`.
    ///
    /// The local store performs no authentication, but a connection is only
    /// created for a non-blank token, like a remote one would be. The token is
    /// not retained.
    pub fn connect(token: &str, root: impl Into<PathBuf>) -> BucketViewResult<Self> {
        if token.trim().is_empty() {
            return Err(BucketViewError::MissingToken);
        }

        let root = root.into();
        if !root.is_dir() {
            return Err(BucketViewError::FileNotFound(root));
        }

        tracing::info!("Polars engine connected to {}", root.display());

        Ok(PolarsEngine {
            root,
            buffers: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `s3://bucket/a/b` to `root/bucket/a/b`.
    ///
    /// Segments that would leave the bucket directory (`..`, absolute parts) are rejected.
    fn local_path(&self, object_path: &str) -> BucketViewResult<PathBuf> {
        let unknown = || BucketViewError::UnknownSource(object_path.to_string());

        let relative = object_path.strip_prefix(SCHEME).ok_or_else(unknown)?;
        let mut path = self.root.clone();
        for segment in relative.split(SEPARATOR).filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => return Err(unknown()),
            }
        }
        Ok(path)
    }

    /// Answers a GLOB query by walking the bucket directory.
    ///
    /// ### Logic
    /// 1. Take the bucket name from the pattern (`s3://<bucket>/...`) and map it to its directory.
    /// 2. Compile the pattern: `**` spans directories, `*` and `?` stay inside one segment.
    /// 3. Walk the directory on the blocking pool, turning each regular file into its object path.
    /// 4. Keep the matching paths, sorted, as rows of the `file` column.
    ///
    /// ### Returns
    /// A one-column `TableResult`, or `FileNotFound` if the bucket directory does not exist.
    async fn list_objects(&self, pattern: &str) -> BucketViewResult<TableResult> {
        // 1. Bucket directory.
        let bucket = pattern
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.split(SEPARATOR).next())
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| BucketViewError::InvalidQuery(format!("bad glob pattern: {pattern}")))?
            .to_string();

        let bucket_dir = self.local_path(&format!("{SCHEME}{bucket}"))?;
        if !bucket_dir.is_dir() {
            return Err(BucketViewError::FileNotFound(bucket_dir));
        }

        // 2. Matcher.
        let matcher = compile_glob(pattern)?;

        // 3. and 4. Walk, match and sort off the async threads.
        let files = spawn_blocking(move || list_matching_files(&bucket_dir, &bucket, &matcher))
            .await??;

        tracing::debug!("GLOB {pattern} matched {} objects", files.len());

        let rows = files
            .into_iter()
            .map(|file| Row::from([(FILE_COLUMN.to_string(), Scalar::String(file))]))
            .collect();

        Ok(TableResult::new(vec![FILE_COLUMN.to_string()], rows))
    }

    /// Resolves a source to a LazyFrame: registered buffers first, then object paths.
    async fn load_source(&self, source: &str) -> BucketViewResult<LazyFrame> {
        if let Some(df) = self.buffers.read().await.get(source) {
            return Ok(df.clone().lazy());
        }

        if !source.starts_with(SCHEME) {
            return Err(BucketViewError::UnknownSource(source.to_string()));
        }

        let path = self.local_path(source)?;
        if !path.is_file() {
            return Err(BucketViewError::FileNotFound(path));
        }

        tracing::debug!("Reading {source} from {}", path.display());

        match FileExtension::from_path(&path) {
            FileExtension::Csv => {
                let plpath = PlRefPath::try_from_pathbuf(path.clone())?;
                let lazyframe = LazyCsvReader::new(plpath)
                    .with_has_header(true)
                    .with_encoding(CsvEncoding::LossyUtf8)
                    .with_missing_is_null(true)
                    .finish()?;
                Ok(lazyframe)
            }
            FileExtension::Parquet => {
                let plpath = PlRefPath::try_from_pathbuf(path.clone())?;
                let lazyframe = LazyFrame::scan_parquet(plpath, ScanArgsParquet::default())?;
                Ok(lazyframe)
            }
            FileExtension::Json => {
                let file = File::open(&path)?;
                let df = execute_polars_blocking(move || JsonReader::new(file).finish()).await?;
                Ok(df.lazy())
            }
            FileExtension::Unknown(ext) => Err(BucketViewError::UnsupportedFileType(format!(
                "`{ext}` files cannot be queried: {source}"
            ))),
            FileExtension::Missing => Err(BucketViewError::UnsupportedFileType(format!(
                "missing extension: {source}"
            ))),
        }
    }

    /// Runs `sql` against `source`, registered as the `source` table.
    async fn run_sql(&self, source: &str, sql: String) -> BucketViewResult<TableResult> {
        let lazyframe = self.load_source(source).await?;

        let df = execute_polars_blocking(move || {
            let mut ctx = SQLContext::new();
            ctx.register(SOURCE_TABLE, lazyframe);
            ctx.execute(&sql)?.collect()
        })
        .await?;

        tracing::debug!("Query on {source} returned shape {:?}", df.shape());

        Ok(TableResult::from_dataframe(&df)?)
    }
}

#[async_trait]
impl QueryBridge for PolarsEngine {
    fn name(&self) -> &str {
        "polars"
    }

    async fn evaluate_query(&self, query: &str) -> BucketViewResult<TableResult> {
        tracing::debug!("evaluate_query: {}", query.trim());

        match Query::parse(query)? {
            Query::Glob { pattern } => self.list_objects(&pattern).await,
            Query::Select { source, limit } => {
                let sql = match limit {
                    Some(limit) => format!("SELECT * FROM {SOURCE_TABLE} LIMIT {limit}"),
                    None => format!("SELECT * FROM {SOURCE_TABLE}"),
                };
                self.run_sql(&source, sql).await
            }
            Query::Count { source } => {
                let sql = format!("SELECT COUNT(*) AS \"{COUNT_COLUMN}\" FROM {SOURCE_TABLE}");
                self.run_sql(&source, sql).await
            }
        }
    }

    async fn register_buffer(&self, name: &str, bytes: Vec<u8>) -> BucketViewResult<()> {
        let size = bytes.len();

        // Same parse options as CSV objects read from the bucket.
        let df = execute_polars_blocking(move || {
            CsvReadOptions::default()
                .with_has_header(true)
                .map_parse_options(|options| {
                    options
                        .with_encoding(CsvEncoding::LossyUtf8)
                        .with_missing_is_null(true)
                })
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()
        })
        .await?;

        tracing::info!(
            "Registered buffer '{name}' ({size} bytes, shape {:?})",
            df.shape()
        );

        self.buffers.write().await.insert(name.to_string(), df);
        Ok(())
    }

    async fn unregister_buffer(&self, name: &str) -> BucketViewResult<bool> {
        let removed = self.buffers.write().await.remove(name).is_some();
        tracing::debug!("Unregistered buffer '{name}': {removed}");
        Ok(removed)
    }
}

/// Compiles a discovery pattern.
///
/// `**` matches across separators, `*` and `?` never match `/`, `[..]` is a class.
fn compile_glob(pattern: &str) -> BucketViewResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BucketViewError::InvalidQuery(format!("bad glob pattern '{pattern}': {e}")))
}

/// Lists the object paths of every regular file below `bucket_dir` accepted by `matcher`.
///
/// Files whose relative name is not valid UTF-8 cannot be addressed by an object
/// path; they are skipped with a warning.
fn list_matching_files(
    bucket_dir: &Path,
    bucket: &str,
    matcher: &GlobMatcher,
) -> io::Result<Vec<String>> {
    let mut object_paths = Vec::new();

    for entry in WalkDir::new(bucket_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(bucket_dir) else {
            continue;
        };

        if relative.to_str().is_none() {
            tracing::warn!("Skipping object with a non UTF-8 name: {}", relative.display());
            continue;
        }

        let segments: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        let object_path = format!("{SCHEME}{bucket}{SEPARATOR}{}", segments.join("/"));

        if matcher.is_match(&object_path) {
            object_paths.push(object_path);
        }
    }

    object_paths.sort();
    Ok(object_paths)
}

/// Runs a blocking Polars operation on Tokio's blocking pool.
///
/// ### Returns
/// The operation's value, or `TokioJoin` if the task failed / `Polars` if the
/// operation itself failed.
async fn execute_polars_blocking<T, F>(op: F) -> BucketViewResult<T>
where
    F: FnOnce() -> Result<T, PolarsError> + Send + 'static,
    T: Debug + Send + 'static,
{
    let polars_result = spawn_blocking(op).await?;
    Ok(polars_result?)
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_engine
#[cfg(test)]
mod tests_engine {
    use super::*;
    use std::{fs, io::Write};
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str, content: &str) -> BucketViewResult<()> {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn setup_store() -> BucketViewResult<(TempDir, PolarsEngine)> {
        let dir = tempfile::tempdir()?;
        write_file(dir.path(), "b/a/x.csv", "id,name\n1,ann\n2,\n3,cid\n")?;
        write_file(
            dir.path(),
            "b/z.json",
            r#"[{"id": 1, "ok": true}, {"id": 2, "ok": false}]"#,
        )?;
        write_file(dir.path(), "b/notes.txt", "hello")?;
        write_file(dir.path(), "other/q.csv", "q\n1\n")?;

        let mut df = df!(
            "id" => &[1i64, 2, 3, 4],
            "score" => &[0.5f64, 1.5, 2.5, 3.5]
        )?;
        fs::create_dir_all(dir.path().join("b/p"))?;
        let file = File::create(dir.path().join("b/p/t.parquet"))?;
        ParquetWriter::new(file).finish(&mut df)?;

        let engine = PolarsEngine::connect("token", dir.path())?;
        Ok((dir, engine))
    }

    #[test]
    fn test_connect_requires_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            PolarsEngine::connect("   ", dir.path()),
            Err(BucketViewError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_discovery_lists_bucket_objects() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query(&Query::discovery("b").to_string())
            .await?;

        let files: Vec<String> = result
            .column_values(FILE_COLUMN)
            .map(|value| value.to_string())
            .collect();
        assert_eq!(
            files,
            vec![
                "s3://b/a/x.csv",
                "s3://b/notes.txt",
                "s3://b/p/t.parquet",
                "s3://b/z.json"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_glob_single_star_stays_in_segment() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query("SELECT * FROM GLOB('s3://b/*.json')")
            .await?;
        assert_eq!(result.height(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_discovery_of_missing_bucket_fails() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query(&Query::discovery("nope").to_string())
            .await;
        assert!(matches!(result, Err(BucketViewError::FileNotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_csv_with_limit() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query(&Query::preview("s3://b/a/x.csv", Some(2)).to_string())
            .await?;

        assert_eq!(result.columns(), ["id", "name"]);
        assert_eq!(result.height(), 2);
        assert_eq!(result.rows()[0]["id"], Scalar::Int(1));
        assert_eq!(result.rows()[1]["name"], Scalar::Null);
        Ok(())
    }

    #[tokio::test]
    async fn test_count_query() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query(&Query::count("s3://b/a/x.csv").to_string())
            .await?;

        assert_eq!(result.columns(), [COUNT_COLUMN]);
        let count = result.column_values(COUNT_COLUMN).next().and_then(Scalar::as_u64);
        assert_eq!(count, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_json() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine
            .evaluate_query(&Query::preview("s3://b/z.json", None).to_string())
            .await?;
        assert_eq!(result.height(), 2);
        assert_eq!(result.rows()[1]["ok"], Scalar::Bool(false));
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_and_missing_sources() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;

        let txt = engine
            .evaluate_query(&Query::preview("s3://b/notes.txt", None).to_string())
            .await;
        assert!(matches!(txt, Err(BucketViewError::UnsupportedFileType(_))));

        let missing = engine
            .evaluate_query(&Query::preview("s3://b/gone.csv", None).to_string())
            .await;
        assert!(matches!(missing, Err(BucketViewError::FileNotFound(_))));

        let unknown = engine
            .evaluate_query(&Query::preview("never-registered.csv", None).to_string())
            .await;
        assert!(matches!(unknown, Err(BucketViewError::UnknownSource(_))));

        let escape = engine
            .evaluate_query(&Query::preview("s3://b/../other/q.csv", None).to_string())
            .await;
        assert!(matches!(escape, Err(BucketViewError::UnknownSource(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_buffer_then_query() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        engine
            .register_buffer("dropped.csv", b"a,b\n1,x\n2,y\n".to_vec())
            .await?;

        let result = engine
            .evaluate_query(&Query::preview("dropped.csv", None).to_string())
            .await?;
        assert_eq!(result.columns(), ["a", "b"]);
        assert_eq!(result.height(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_query_text() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        let result = engine.evaluate_query("DELETE FROM everything").await;
        assert!(matches!(result, Err(BucketViewError::InvalidQuery(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_glob_double_star_matches_zero_directories() -> BucketViewResult<()> {
        let (dir, engine) = setup_store()?;
        write_file(dir.path(), "b/x.csv", "v\n1\n")?;

        let result = engine
            .evaluate_query("SELECT * FROM GLOB('s3://b/**/x.csv')")
            .await?;
        let files: Vec<String> = result
            .column_values(FILE_COLUMN)
            .map(|value| value.to_string())
            .collect();
        assert_eq!(files, vec!["s3://b/a/x.csv", "s3://b/x.csv"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_glob_character_class() -> BucketViewResult<()> {
        let (dir, engine) = setup_store()?;
        write_file(dir.path(), "b/x.csv", "v\n1\n")?;
        write_file(dir.path(), "b/y.csv", "v\n2\n")?;
        write_file(dir.path(), "b/w.csv", "v\n3\n")?;

        let result = engine
            .evaluate_query("SELECT * FROM GLOB('s3://b/[xy].csv')")
            .await?;
        let files: Vec<String> = result
            .column_values(FILE_COLUMN)
            .map(|value| value.to_string())
            .collect();
        assert_eq!(files, vec!["s3://b/x.csv", "s3://b/y.csv"]);
        Ok(())
    }

    #[test]
    fn test_compile_glob() -> BucketViewResult<()> {
        let matcher = compile_glob("s3://b/**")?;
        assert!(matcher.is_match("s3://b/a/x.csv"));
        assert!(!matcher.is_match("s3://bb/a/x.csv"));

        let matcher = compile_glob("s3://b/?.csv")?;
        assert!(matcher.is_match("s3://b/x.csv"));
        assert!(!matcher.is_match("s3://b/a/x.csv"));

        assert!(matches!(
            compile_glob("s3://b/[x.csv"),
            Err(BucketViewError::InvalidQuery(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_parquet_and_count() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;

        let result = engine
            .evaluate_query(&Query::preview("s3://b/p/t.parquet", Some(3)).to_string())
            .await?;
        assert_eq!(result.columns(), ["id", "score"]);
        assert_eq!(result.height(), 3);
        assert_eq!(result.rows()[2]["score"], Scalar::Float(2.5));

        let count = engine
            .evaluate_query(&Query::count("s3://b/p/t.parquet").to_string())
            .await?;
        let total = count.column_values(COUNT_COLUMN).next().and_then(Scalar::as_u64);
        assert_eq!(total, Some(4));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_buffer_reads_latin1_lossily() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        engine
            .register_buffer("latin1.csv", b"name\ncaf\xe9\n".to_vec())
            .await?;

        let result = engine
            .evaluate_query(&Query::preview("latin1.csv", None).to_string())
            .await?;
        assert_eq!(result.height(), 1);
        let name = result.rows()[0]["name"].to_string();
        assert!(name.starts_with("caf"), "got {name:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_unregister_buffer_frees_the_name() -> BucketViewResult<()> {
        let (_dir, engine) = setup_store()?;
        engine
            .register_buffer("dropped.csv", b"a\n1\n".to_vec())
            .await?;

        assert!(engine.unregister_buffer("dropped.csv").await?);
        assert!(!engine.unregister_buffer("dropped.csv").await?);

        let result = engine
            .evaluate_query(&Query::preview("dropped.csv", None).to_string())
            .await;
        assert!(matches!(result, Err(BucketViewError::UnknownSource(_))));
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_names_are_skipped() -> BucketViewResult<()> {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let (dir, engine) = setup_store()?;
        let bad_name = OsStr::from_bytes(b"bad\xff.csv");
        File::create(dir.path().join("b").join(bad_name))?;

        let result = engine
            .evaluate_query(&Query::discovery("b").to_string())
            .await?;
        assert_eq!(result.height(), 4);
        assert!(
            result
                .column_values(FILE_COLUMN)
                .all(|value| !value.to_string().contains('\u{FFFD}'))
        );
        Ok(())
    }
}
