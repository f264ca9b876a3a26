//! Catalog construction and the shared, swap-only catalog store.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::Instant,
};

use metrics::counter;
use thiserror::Error;
use tokio::{
    fs,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::info;

use crate::domain::articles::{ArticleEntry, Catalog, FilenamePattern, MarkupKind};
use crate::util::lock::{read_recovering, write_recovering};

const SOURCE: &str = "taccuino::catalog";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to list article directory `{}`", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read article `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scan `directory` (non-recursively) and build a catalog of article files.
///
/// Only files whose names match `pattern` are included. The build is
/// all-or-nothing: any matching file that cannot be read fails the whole
/// build.
pub async fn build_catalog(
    directory: &Path,
    pattern: &FilenamePattern,
) -> Result<Catalog, CatalogError> {
    let list_error = |source| CatalogError::List {
        path: directory.to_path_buf(),
        source,
    };

    let mut listing = fs::read_dir(directory).await.map_err(list_error)?;
    let mut entries = Vec::new();

    while let Some(dir_entry) = listing.next_entry().await.map_err(list_error)? {
        // Names that are not UTF-8 cannot be addressed by article URLs.
        let Ok(filename) = dir_entry.file_name().into_string() else {
            continue;
        };
        let Some(date) = pattern.display_date(&filename) else {
            continue;
        };

        let path = dir_entry.path();
        let read_error = |source| CatalogError::Read {
            path: path.clone(),
            source,
        };

        if fs::metadata(&path).await.map_err(read_error)?.is_dir() {
            continue;
        }

        let first_line = read_first_line(&path).await.map_err(read_error)?;
        let title = MarkupKind::from_filename(&filename).title_from_first_line(&first_line);

        entries.push(ArticleEntry {
            title,
            date,
            filename,
        });
    }

    Ok(Catalog::from_entries(entries))
}

async fn read_first_line(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Holds the current catalog behind a single swappable pointer.
///
/// Readers take a cheap `Arc` snapshot; a rebuilt catalog is published with
/// one pointer assignment, so a reader sees either the old list or the new
/// one, never a partial list.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&read_recovering(&self.current, "catalog.snapshot"))
    }

    /// Publish `catalog`, returning the published snapshot.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        *write_recovering(&self.current, "catalog.replace") = Arc::clone(&next);
        next
    }
}

/// Catalog source bound to an article directory.
pub struct CatalogService {
    directory: PathBuf,
    pattern: FilenamePattern,
    store: CatalogStore,
}

impl CatalogService {
    /// Build the initial catalog for `directory`.
    pub async fn load(directory: PathBuf, pattern: FilenamePattern) -> Result<Self, CatalogError> {
        let catalog = build_catalog(&directory, &pattern).await?;
        info!(
            target = SOURCE,
            directory = %directory.display(),
            articles = catalog.len(),
            "Catalog loaded"
        );

        Ok(Self {
            directory,
            pattern,
            store: CatalogStore::new(catalog),
        })
    }

    pub fn current(&self) -> Arc<Catalog> {
        self.store.snapshot()
    }

    /// Rebuild from disk and swap the result in. On failure the previous
    /// catalog stays published.
    pub async fn rebuild(&self) -> Result<Arc<Catalog>, CatalogError> {
        let started_at = Instant::now();
        let catalog = build_catalog(&self.directory, &self.pattern).await?;
        let published = self.store.replace(catalog);

        counter!("taccuino_catalog_rebuild_total").increment(1);
        info!(
            target = SOURCE,
            articles = published.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Catalog rebuilt"
        );

        Ok(published)
    }
}
