use crate::{
    BucketViewError, BucketViewResult, COUNT_COLUMN, FILE_COLUMN, FileExtension, ObjectPath,
    PathTree, Query, QueryBridge, RenderedTable, Scalar, TreeView,
};

use egui::{RichText, Ui};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Default number of rows fetched for a preview.
pub const DEFAULT_PREVIEW_LIMIT: u32 = 1000;

/// One user's connection plus bucket context.
///
/// Cloning is cheap: clones share the same bridge. Every component that issues
/// queries receives a session explicitly.
#[derive(Clone)]
pub struct Session {
    bridge: Arc<dyn QueryBridge>,
    bucket: String,
    limit: Option<u32>,
    /// Numbers the buffers of dropped files, so concurrent drops never share one.
    drops: Arc<AtomicU64>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bridge", &self.bridge.name())
            .field("bucket", &self.bucket)
            .field("limit", &self.limit)
            .finish()
    }
}

/// The content of the result drawer: one rendered query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// What was previewed: an object path or a dropped file name.
    pub title: String,
    pub table: RenderedTable,
    /// Total rows of the source, from the companion count query.
    pub total_rows: Option<u64>,
}

impl Session {
    pub fn new(bridge: Arc<dyn QueryBridge>, bucket: &str) -> BucketViewResult<Self> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(BucketViewError::MissingBucket);
        }

        tracing::info!("Session opened on bucket '{bucket}' via {}", bridge.name());

        Ok(Session {
            bridge,
            bucket: bucket.to_string(),
            limit: Some(DEFAULT_PREVIEW_LIMIT),
            drops: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Sets the preview row limit; `None` or `Some(0)` fetches every row.
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit.filter(|&n| n > 0);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Issues the discovery query and parses every returned object path.
    ///
    /// Rows that are null or lie outside the bucket are skipped with a warning.
    pub async fn discover(&self) -> BucketViewResult<Vec<ObjectPath>> {
        let query = Query::discovery(&self.bucket);
        let result = self.bridge.evaluate_query(&query.to_string()).await?;

        let mut paths = Vec::with_capacity(result.height());
        for value in result.column_values(FILE_COLUMN) {
            let Scalar::String(file) = value else {
                tracing::warn!("Skipping non-string discovery row: {value:?}");
                continue;
            };
            match ObjectPath::parse(&self.bucket, file) {
                Ok(path) => paths.push(path),
                Err(err) => tracing::warn!("Skipping discovery row: {err}"),
            }
        }

        tracing::info!("Discovered {} objects in '{}'", paths.len(), self.bucket);
        Ok(paths)
    }

    /// Discovers the bucket and builds the tree shown in the side panel.
    pub async fn list_tree(&self) -> BucketViewResult<TreeView> {
        let paths = self.discover().await?;
        let tree = PathTree::from_object_paths(&paths);
        Ok(TreeView::build(&self.bucket, &tree))
    }

    /// Previews an object of the bucket (csv, parquet or json only).
    pub async fn preview(&self, path: &ObjectPath) -> BucketViewResult<Preview> {
        let extension = path.extension();
        if !extension.is_queryable() {
            return Err(BucketViewError::UnsupportedFileType(format!(
                "{path} is not a CSV, Parquet or Json file"
            )));
        }
        self.preview_source(&path.to_string()).await
    }

    /// Previews a dropped local file.
    ///
    /// ### Logic
    /// 1. Refuse anything but a `.csv` name, without issuing a query.
    /// 2. Register the bytes with the bridge under a buffer name unique to this drop.
    /// 3. Run the preview and count queries against that buffer.
    /// 4. Unregister the buffer: the preview holds the rendered rows, the bridge keeps nothing.
    ///
    /// ### Returns
    /// A `Preview` titled with the dropped file name, or the first error encountered.
    pub async fn preview_dropped(&self, name: &str, bytes: Vec<u8>) -> BucketViewResult<Preview> {
        // 1. Only CSV files can be dropped.
        if FileExtension::from_name(name) != FileExtension::Csv {
            return Err(BucketViewError::FileType(format!(
                "`{name}` is not a CSV file. Drop a .csv file to preview it."
            )));
        }

        // 2. Register.
        let drop_id = self.drops.fetch_add(1, Ordering::Relaxed);
        let buffer = format!("{name}#{drop_id}");
        self.bridge.register_buffer(&buffer, bytes).await?;

        // 3. Query.
        let preview = self.preview_source(&buffer).await;

        // 4. Release, whatever the queries returned.
        if let Err(err) = self.bridge.unregister_buffer(&buffer).await {
            tracing::warn!("Buffer '{buffer}' not released: {err}");
        }

        preview.map(|preview| Preview {
            title: name.to_string(),
            ..preview
        })
    }

    /// Runs the preview query and its count companion concurrently.
    ///
    /// ### Logic
    /// 1. Render the `SELECT` (with the session's row limit) and `COUNT(*)` texts for `source`.
    /// 2. Evaluate both through the bridge at the same time; the first failure wins.
    /// 3. Read the total from the `count` column and render the rows into cells.
    async fn preview_source(&self, source: &str) -> BucketViewResult<Preview> {
        // 1. Query texts.
        let select = Query::preview(source, self.limit).to_string();
        let count = Query::count(source).to_string();

        // 2. Both queries in flight together.
        let (result, count_result) = tokio::try_join!(
            self.bridge.evaluate_query(&select),
            self.bridge.evaluate_query(&count),
        )?;

        // 3. Assemble.
        let total_rows = count_result
            .column_values(COUNT_COLUMN)
            .next()
            .and_then(Scalar::as_u64);

        Ok(Preview {
            title: source.to_string(),
            table: RenderedTable::from_result(&result),
            total_rows,
        })
    }
}

impl Preview {
    /// Renders the preview title, row summary and table.
    pub fn render(&self, ui: &mut Ui) {
        ui.heading(RichText::new(&self.title).monospace());

        let shown = self.table.height();
        let summary = match self.total_rows {
            Some(total) if total as usize > shown => format!("Showing {shown} of {total} rows"),
            Some(total) => format!("{total} rows"),
            None => format!("{shown} rows"),
        };
        ui.label(summary);
        ui.separator();

        self.table.render(ui);
    }
}

#[cfg(test)]
mod tests_session {
    use super::*;
    use crate::{Row, TableResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every query and answers from a fixed listing.
    struct FakeBridge {
        files: Vec<&'static str>,
        queries: Mutex<Vec<String>>,
        buffers: Mutex<Vec<String>>,
        released: Mutex<Vec<String>>,
    }

    impl FakeBridge {
        fn new(files: Vec<&'static str>) -> Arc<Self> {
            Arc::new(FakeBridge {
                files,
                queries: Mutex::new(Vec::new()),
                buffers: Mutex::new(Vec::new()),
                released: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl QueryBridge for FakeBridge {
        fn name(&self) -> &str {
            "fake"
        }

        async fn evaluate_query(&self, query: &str) -> BucketViewResult<TableResult> {
            self.queries.lock().expect("lock").push(query.to_string());
            match Query::parse(query)? {
                Query::Glob { .. } => Ok(TableResult::new(
                    vec![FILE_COLUMN.into()],
                    self.files
                        .iter()
                        .map(|f| Row::from([(FILE_COLUMN.to_string(), Scalar::String(f.to_string()))]))
                        .collect(),
                )),
                Query::Select { .. } => Ok(TableResult::new(
                    vec!["id".into(), "name".into()],
                    vec![Row::from([
                        ("id".to_string(), Scalar::Int(1)),
                        ("name".to_string(), Scalar::Null),
                    ])],
                )),
                Query::Count { .. } => Ok(TableResult::new(
                    vec![COUNT_COLUMN.into()],
                    vec![Row::from([(COUNT_COLUMN.to_string(), Scalar::UInt(42))])],
                )),
            }
        }

        async fn register_buffer(&self, name: &str, _bytes: Vec<u8>) -> BucketViewResult<()> {
            self.buffers.lock().expect("lock").push(name.to_string());
            Ok(())
        }

        async fn unregister_buffer(&self, name: &str) -> BucketViewResult<bool> {
            self.released.lock().expect("lock").push(name.to_string());
            Ok(true)
        }
    }

    #[test]
    fn test_session_requires_bucket() {
        let bridge = FakeBridge::new(vec![]);
        assert!(matches!(
            Session::new(bridge, "  "),
            Err(BucketViewError::MissingBucket)
        ));
    }

    #[tokio::test]
    async fn test_list_tree_skips_foreign_rows() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![
            "s3://b/a/x.csv",
            "s3://b/a/y.parquet",
            "s3://elsewhere/q.csv",
            "s3://b/z.json",
        ]);
        let session = Session::new(bridge.clone(), "b")?;

        let view = session.list_tree().await?;
        assert_eq!(view.leaves().count(), 3);
        assert_eq!(
            bridge.queries(),
            vec!["SELECT * FROM GLOB('s3://b/**')".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_runs_select_and_count() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![]);
        let session = Session::new(bridge.clone(), "b")?.with_limit(Some(10));
        let path = ObjectPath::parse("b", "s3://b/a/x.csv")?;

        let preview = session.preview(&path).await?;
        assert_eq!(preview.title, "s3://b/a/x.csv");
        assert_eq!(preview.total_rows, Some(42));
        assert_eq!(preview.table.body()[0], ["1", ""]);

        let mut queries = bridge.queries();
        queries.sort();
        assert_eq!(
            queries,
            vec![
                "SELECT * FROM 's3://b/a/x.csv' LIMIT 10".to_string(),
                "SELECT COUNT(*) FROM 's3://b/a/x.csv'".to_string(),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_ignores_non_data_files() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![]);
        let session = Session::new(bridge.clone(), "b")?;
        let path = ObjectPath::parse("b", "s3://b/readme.txt")?;

        let result = session.preview(&path).await;
        assert!(matches!(result, Err(BucketViewError::UnsupportedFileType(_))));
        assert!(bridge.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_non_csv_is_rejected_without_query() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![]);
        let session = Session::new(bridge.clone(), "b")?;

        let result = session.preview_dropped("photo.png", vec![1, 2, 3]).await;
        assert!(matches!(result, Err(BucketViewError::FileType(_))));
        assert!(bridge.queries().is_empty());
        assert!(bridge.buffers.lock().expect("lock").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_csv_is_registered_previewed_and_released() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![]);
        let session = Session::new(bridge.clone(), "b")?.with_limit(None);

        let preview = session
            .preview_dropped("local.csv", b"id,name\n1,\n".to_vec())
            .await?;
        assert_eq!(preview.title, "local.csv");

        let buffers = bridge.buffers.lock().expect("lock").clone();
        assert_eq!(buffers, vec!["local.csv#0".to_string()]);
        assert!(bridge.queries().contains(&"SELECT * FROM 'local.csv#0'".to_string()));
        assert_eq!(*bridge.released.lock().expect("lock"), buffers);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_drops_use_distinct_buffers() -> BucketViewResult<()> {
        let bridge = FakeBridge::new(vec![]);
        let session = Session::new(bridge.clone(), "b")?;

        session.preview_dropped("same.csv", b"a\n1\n".to_vec()).await?;
        session.clone().preview_dropped("same.csv", b"a\n2\n".to_vec()).await?;

        assert_eq!(
            *bridge.released.lock().expect("lock"),
            vec!["same.csv#0".to_string(), "same.csv#1".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_engine_keeps_no_buffer_after_drop_preview() -> BucketViewResult<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("b"))?;
        let engine = Arc::new(crate::PolarsEngine::connect("token", dir.path())?);
        let session = Session::new(engine.clone(), "b")?;

        let preview = session
            .preview_dropped("local.csv", b"id,name\n1,ann\n2,\n".to_vec())
            .await?;
        assert_eq!(preview.total_rows, Some(2));
        assert_eq!(preview.table.body()[1], ["2", ""]);

        // The buffer is gone once the preview exists.
        assert!(!engine.unregister_buffer("local.csv#0").await?);
        Ok(())
    }
}
