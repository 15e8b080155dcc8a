//! File operations behind the path sandbox. Each request is independent and
//! stateless; the filesystem itself arbitrates concurrent access.

use crate::errors::{AppError, AppResult};
use crate::sandbox::ConfinedRoot;
use serde::Serialize;
use std::io::ErrorKind;
use tokio::fs;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

pub struct FileGateway {
    root: ConfinedRoot,
}

impl FileGateway {
    pub fn new(root: ConfinedRoot) -> Self {
        Self { root }
    }

    pub async fn read(&self, path: &str) -> AppResult<String> {
        let full = self.root.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(md) if md.is_dir() => return Err(AppError::IsADirectory),
            Ok(_) => {}
            Err(e) => return Err(map_io(e)),
        }
        fs::read_to_string(&full)
            .await
            .map_err(|e| AppError::Io(e.to_string()))
    }

    /// Whole-file overwrite, creating parent directories as needed.
    /// Last writer wins; there is no append or compare-and-swap.
    pub async fn write(&self, path: &str, content: &str) -> AppResult<()> {
        let full = self.root.resolve(path)?;
        if let Ok(md) = fs::metadata(&full).await {
            if md.is_dir() {
                return Err(AppError::IsADirectory);
            }
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Io(e.to_string()))?;
        }
        fs::write(&full, content)
            .await
            .map_err(|e| AppError::Io(e.to_string()))
    }

    /// Removes a file, or a directory recursively. Missing targets succeed.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let full = self.root.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(md) if md.is_dir() => fs::remove_dir_all(&full)
                .await
                .map_err(|e| AppError::Io(e.to_string())),
            Ok(_) => fs::remove_file(&full)
                .await
                .map_err(|e| AppError::Io(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e.to_string())),
        }
    }

    /// Immediate entries of a directory, sorted by name. Does not recurse.
    pub async fn list(&self, path: &str) -> AppResult<Vec<DirEntryInfo>> {
        let full = self.root.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(md) if !md.is_dir() => return Err(AppError::NotADirectory),
            Ok(_) => {}
            Err(e) => return Err(map_io(e)),
        }
        let mut rd = fs::read_dir(&full)
            .await
            .map_err(|e| AppError::Io(e.to_string()))?;
        let mut entries = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(|e| AppError::Io(e.to_string()))?
        {
            let kind = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => "directory",
                _ => "file",
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

fn map_io(e: std::io::Error) -> AppError {
    if e.kind() == ErrorKind::NotFound {
        AppError::NotFound
    } else {
        AppError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(tmp: &tempfile::TempDir) -> FileGateway {
        FileGateway::new(ConfinedRoot::new(tmp.path()).unwrap())
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("notes/todo.txt", "buy milk").await.unwrap();
        assert_eq!(gw.read("notes/todo.txt").await.unwrap(), "buy milk");
    }

    #[tokio::test]
    async fn write_overwrites_entirely() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("a.txt", "first version, long").await.unwrap();
        gw.write("a.txt", "second").await.unwrap();
        assert_eq!(gw.read("a.txt").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = gateway(&tmp).read("ghost.txt").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn unreadable_content_is_a_client_error() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        std::fs::write(tmp.path().join("raw.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let err = gw.read("raw.bin").await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_directory_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("d/inner.txt", "x").await.unwrap();
        let err = gw.read("d").await.unwrap_err();
        assert!(matches!(err, AppError::IsADirectory));
    }

    #[tokio::test]
    async fn write_over_directory_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("d/inner.txt", "x").await.unwrap();
        let err = gw.write("d", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::IsADirectory));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.delete("never-existed.txt").await.unwrap();
        gw.write("a.txt", "x").await.unwrap();
        gw.delete("a.txt").await.unwrap();
        gw.delete("a.txt").await.unwrap();
        assert!(matches!(
            gw.read("a.txt").await.unwrap_err(),
            AppError::NotFound
        ));
    }

    #[tokio::test]
    async fn delete_removes_directories_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("d/one.txt", "1").await.unwrap();
        gw.write("d/sub/two.txt", "2").await.unwrap();
        gw.delete("d").await.unwrap();
        assert!(gw.list(".").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_reports_names_and_kinds() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("notes/todo.txt", "buy milk").await.unwrap();
        gw.write("top.txt", "t").await.unwrap();
        let entries = gw.list(".").await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntryInfo { name: "notes".into(), kind: "directory" },
                DirEntryInfo { name: "top.txt".into(), kind: "file" },
            ]
        );
    }

    #[tokio::test]
    async fn list_of_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        gw.write("a.txt", "x").await.unwrap();
        let err = gw.list("a.txt").await.unwrap_err();
        assert!(matches!(err, AppError::NotADirectory));
    }

    #[tokio::test]
    async fn escape_attempts_fail_on_every_operation() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&tmp);
        for op in ["../etc/passwd", "/etc/passwd"] {
            assert!(matches!(gw.read(op).await.unwrap_err(), AppError::PathEscape));
            assert!(matches!(gw.write(op, "x").await.unwrap_err(), AppError::PathEscape));
            assert!(matches!(gw.delete(op).await.unwrap_err(), AppError::PathEscape));
            assert!(matches!(gw.list(op).await.unwrap_err(), AppError::PathEscape));
        }
    }
}
