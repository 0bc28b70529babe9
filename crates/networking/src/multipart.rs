//! Multipart form bodies
//!
//! Scalar fields keep their input order. Files follow as parts named
//! `file0`, `file1`, … in the order they were given. With a progress
//! callback, file parts report send progress against their combined size.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};

use crate::error::{NetworkErrorCause, Result};
use crate::progress::{ProgressCallback, SendCounter};

/// A file attached to a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFile {
    /// Read from disk when the form is built
    Path(PathBuf),
    /// Already in memory
    Bytes {
        /// File name sent with the part
        file_name: String,
        /// Contents
        bytes: Vec<u8>,
    },
}

impl FormFile {
    /// Attach a file from disk
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        FormFile::Path(path.into())
    }

    /// Attach in-memory contents
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        FormFile::Bytes { file_name: file_name.into(), bytes: bytes.into() }
    }

    /// File name sent with the part
    pub fn file_name(&self) -> String {
        match self {
            FormFile::Path(path) => file_name_of(path),
            FormFile::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    async fn load(self) -> Result<(String, Vec<u8>)> {
        let file_name = self.file_name();
        let bytes = match self {
            FormFile::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
                NetworkErrorCause::LocalFile(format!("{}: {}", path.display(), e))
            })?,
            FormFile::Bytes { bytes, .. } => bytes,
        };
        Ok((file_name, bytes))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Part name for the file at `index`
pub fn file_part_name(index: usize) -> String {
    format!("file{}", index)
}

/// Build a form from fields followed by numbered file parts
///
/// Every file is read before the form is built, so an unreadable file
/// fails the call without anything being sent.
pub async fn build_form<I, K, V>(
    fields: I,
    files: Vec<FormFile>,
    progress: Option<ProgressCallback>,
) -> Result<Form>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut loaded = Vec::with_capacity(files.len());
    for file in files {
        loaded.push(file.load().await?);
    }

    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key.into(), value.into());
    }

    let total = loaded.iter().map(|(_, bytes)| bytes.len() as u64).sum();
    let counter = progress.map(|callback| SendCounter::new(total, callback));

    for (index, (file_name, bytes)) in loaded.into_iter().enumerate() {
        let part = match &counter {
            Some(counter) => {
                let len = bytes.len() as u64;
                Part::stream_with_length(counter.body(bytes), len)
            }
            None => Part::bytes(bytes),
        };
        form = form.part(file_part_name(index), part.file_name(file_name));
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_part_names() {
        assert_eq!(file_part_name(0), "file0");
        assert_eq!(file_part_name(1), "file1");
        assert_eq!(file_part_name(12), "file12");
    }

    #[test]
    fn test_form_file_names() {
        assert_eq!(FormFile::from_path("/tmp/photos/a.png").file_name(), "a.png");
        assert_eq!(FormFile::from_bytes("b.txt", b"hi".to_vec()).file_name(), "b.txt");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_network_error() {
        let result =
            build_form([("caption", "x")], vec![FormFile::from_path("/definitely/not/here.bin")], None)
                .await;

        let error = result.unwrap_err();
        assert!(matches!(error.cause(), NetworkErrorCause::LocalFile(_)));
    }

    #[tokio::test]
    async fn test_fields_only_form_builds() {
        let form = build_form([("caption", "x"), ("tag", "y")], Vec::new(), None).await.unwrap();
        assert!(!form.boundary().is_empty());
    }
}
