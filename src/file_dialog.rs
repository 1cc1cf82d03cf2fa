use crate::{BucketViewError, BucketViewResult};

use rfd::AsyncFileDialog;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use tokio::sync::oneshot;
use tracing::error;

/// A local file picked through the open dialog, read into memory.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Content of a file dropped on the window.
///
/// Some platforms hand over the bytes, others only a path to read.
#[derive(Debug, Clone)]
pub enum DroppedContent {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl DroppedContent {
    /// Yields the file content, reading it asynchronously when only a path is known.
    pub async fn into_bytes(self) -> BucketViewResult<Vec<u8>> {
        match self {
            DroppedContent::Bytes(bytes) => Ok(bytes),
            DroppedContent::Path(path) => tokio::fs::read(&path).await.map_err(|err| {
                error!("Cannot read dropped file {}: {err}", path.display());
                BucketViewError::from(err)
            }),
        }
    }
}

/// Opens a native file dialog filtered to CSV files and reads the chosen file.
///
/// # Returns
///
/// - `Ok(Some(PickedFile))`: the name and content of the selected file.
/// - `Ok(None)`: the user cancelled the dialog.
pub async fn open_file() -> BucketViewResult<Option<PickedFile>> {
    let Some(file) = AsyncFileDialog::new()
        .add_filter("CSV", &["csv"])
        .pick_file()
        .await
    else {
        return Ok(None);
    };

    let bytes = file.read().await;
    Ok(Some(PickedFile {
        name: file.file_name(),
        bytes,
    }))
}

/// Asks for a destination with a native save dialog and writes `contents` to it.
///
/// The write runs on a blocking task; the result travels back through a oneshot
/// channel. Cancelling the dialog is not an error.
///
/// # Returns
///
/// The path written to, or `None` if the user cancelled.
pub async fn save_html(contents: String, default_name: &str) -> BucketViewResult<Option<PathBuf>> {
    let Some(handle) = AsyncFileDialog::new()
        .add_filter("HTML", &["html", "htm"])
        .set_file_name(default_name)
        .save_file()
        .await
    else {
        return Ok(None);
    };

    let path = handle.path().to_path_buf();
    let (tx, rx) = oneshot::channel::<BucketViewResult<PathBuf>>();

    tokio::task::spawn_blocking(move || {
        let result = write_file(&path, &contents).map(|()| path);
        if tx.send(result).is_err() {
            error!("The receiver has been dropped.");
        }
    });

    let path = rx
        .await
        .map_err(|e| BucketViewError::ChannelReceive(e.to_string()))??;

    tracing::info!("Saved HTML to {}", path.display());
    Ok(Some(path))
}

fn write_file(path: &Path, contents: &str) -> BucketViewResult<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(())
}
