//! Loads collection files from disk.

use std::path::{Path, PathBuf};

use scriptbox_domain::Collection;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::serialization::{SerializationError, from_json, from_yaml};

/// Errors raised while loading collections.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file content is not a valid collection.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: SerializationError,
    },

    /// The file extension is not one of `yaml`, `yml` or `json`.
    #[error("unsupported collection file: {0}")]
    UnsupportedExtension(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads collection files (`*.yaml`, `*.yml`, `*.json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionLoader;

impl CollectionLoader {
    /// Loads one collection file. A collection without a `name` is named
    /// after the file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unsupported, the file cannot be
    /// read, or its content does not parse.
    pub async fn load(path: &Path) -> Result<Collection, CollectionError> {
        let format =
            Format::of(path).ok_or_else(|| CollectionError::UnsupportedExtension(path.to_path_buf()))?;
        let text = fs::read_to_string(path).await.map_err(|source| CollectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match format {
            Format::Yaml => from_yaml::<Collection>(&text),
            Format::Json => from_json::<Collection>(&text),
        };
        let mut collection = parsed.map_err(|source| CollectionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if collection.name.trim().is_empty() {
            collection.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        debug!(path = %path.display(), requests = collection.requests.len(), "collection loaded");
        Ok(collection)
    }

    /// Loads every collection file directly inside `dir`, sorted by file name.
    /// Files with other extensions are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or any collection
    /// file fails to load.
    pub async fn load_dir(dir: &Path) -> Result<Vec<Collection>, CollectionError> {
        let io_error = |source| CollectionError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir).await.map_err(io_error)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.is_file() && Format::of(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut collections = Vec::with_capacity(paths.len());
        for path in &paths {
            collections.push(Self::load(path).await?);
        }
        Ok(collections)
    }

    /// Loads `path` as a single file, or every collection inside it when it is
    /// a directory.
    ///
    /// # Errors
    ///
    /// See [`CollectionLoader::load`] and [`CollectionLoader::load_dir`].
    pub async fn load_path(path: &Path) -> Result<Vec<Collection>, CollectionError> {
        let metadata = fs::metadata(path).await.map_err(|source| CollectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            Self::load_dir(path).await
        } else {
            Ok(vec![Self::load(path).await?])
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scriptbox_domain::HttpMethod;
    use std::time::Duration;
    use tempfile::TempDir;

    const YAML: &str = r#"
name: Users API
environment:
  base_url: http://localhost:3000
  user: bob
limits:
  timeout_ms: 2000
requests:
  - name: Create user
    method: post
    url: "{{base_url}}/users"
    headers:
      Content-Type: application/json
    body: '{"name": "{{user}}"}'
    scripts:
      pre_request:
        content: pw.env.set("user", "alice")
      post_response:
        content: pw.test("created", () => pw.expect(pw.response.status).toBe(201))
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "users.yaml", YAML);

        let collection = CollectionLoader::load(&path).await.unwrap();
        assert_eq!(collection.name, "Users API");
        assert_eq!(
            collection.environment.keys().collect::<Vec<_>>(),
            ["base_url", "user"]
        );
        let limits = collection.effective_limits();
        assert_eq!(limits.timeout, Duration::from_millis(2000));
        assert_eq!(limits.statement_limit, 10_000);

        let request = &collection.requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.headers["Content-Type"], "application/json");
        assert!(request.scripts.pre_request.should_run());
        assert!(request.scripts.post_response.should_run());
    }

    #[tokio::test]
    async fn test_load_json_defaults_name_to_stem() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "smoke.json", r#"{"requests": [{"url": "http://x"}]}"#);

        let collection = CollectionLoader::load(&path).await.unwrap();
        assert_eq!(collection.name, "smoke");
        assert_eq!(collection.requests[0].method, HttpMethod::Get);
        assert!(collection.limits.is_none());
    }

    #[tokio::test]
    async fn test_load_dir_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.yml", "name: second\n");
        write(&dir, "a.json", r#"{"name": "first"}"#);
        write(&dir, "notes.txt", "ignored");

        let names: Vec<_> = CollectionLoader::load_path(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = TempDir::new().unwrap();
        let txt = write(&dir, "c.txt", "");
        assert!(matches!(
            CollectionLoader::load(&txt).await,
            Err(CollectionError::UnsupportedExtension(_))
        ));

        let broken = write(&dir, "broken.yaml", "requests: [");
        assert!(matches!(
            CollectionLoader::load(&broken).await,
            Err(CollectionError::Parse { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            CollectionLoader::load(&missing).await,
            Err(CollectionError::Io { .. })
        ));
    }
}
