//! Dataset Cache Module
//! Keeps prepared tables keyed by source file and modification time.

use super::LoadError;
use crate::config::DashboardConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// A prepared table that can be built from a source file.
pub trait Dataset: Sized {
    fn load(path: &Path, config: &DashboardConfig) -> Result<Self, LoadError>;

    fn row_count(&self) -> usize;
}

struct CacheEntry<T> {
    modified: Option<SystemTime>,
    table: Arc<T>,
}

/// Read-only tables shared by every view; reloaded when the file changes.
pub struct DatasetCache<T> {
    entries: HashMap<PathBuf, CacheEntry<T>>,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Dataset> DatasetCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table, loading it if absent or if the file changed.
    pub fn get_or_load(&mut self, path: &Path, config: &DashboardConfig) -> Result<Arc<T>, LoadError> {
        let modified = modification_time(path);
        if let Some(entry) = self.entries.get(path) {
            if entry.modified == modified {
                debug!("Cache hit for {}", path.display());
                return Ok(Arc::clone(&entry.table));
            }
            info!("{} changed on disk, reloading", path.display());
        }

        let table = Arc::new(T::load(path, config)?);
        info!("Cached {} rows from {}", table.row_count(), path.display());
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drop the entry for `path`; the next access reloads it.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Force a fresh load of `path`.
    pub fn reload(&mut self, path: &Path, config: &DashboardConfig) -> Result<Arc<T>, LoadError> {
        self.invalidate(path);
        self.get_or_load(path, config)
    }
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ExamTable;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::Builder;

    const CSV: &str = "Data,Descrição,Convênio,Valor\n2025-04-01,Hemograma,UNIMED,\"35,00\"\n";

    fn exam_csv() -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", CSV).unwrap();
        file
    }

    #[test]
    fn second_access_reuses_table() {
        let file = exam_csv();
        let config = DashboardConfig::default();
        let mut cache: DatasetCache<ExamTable> = DatasetCache::new();

        let first = cache.get_or_load(file.path(), &config).unwrap();
        let second = cache.get_or_load(file.path(), &config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn modified_file_is_reloaded() {
        let file = exam_csv();
        let config = DashboardConfig::default();
        let mut cache: DatasetCache<ExamTable> = DatasetCache::new();
        let first = cache.get_or_load(file.path(), &config).unwrap();

        {
            let mut f = File::options().append(true).open(file.path()).unwrap();
            writeln!(f, "2025-04-02,Ureia,AMIL,\"20,00\"").unwrap();
            f.set_modified(SystemTime::now() + Duration::from_secs(120)).unwrap();
        }

        let second = cache.get_or_load(file.path(), &config).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn invalidate_and_reload() {
        let file = exam_csv();
        let config = DashboardConfig::default();
        let mut cache: DatasetCache<ExamTable> = DatasetCache::new();

        let first = cache.get_or_load(file.path(), &config).unwrap();
        assert!(cache.invalidate(file.path()));
        assert!(!cache.invalidate(file.path()));

        let reloaded = cache.reload(file.path(), &config).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        let again = cache.get_or_load(file.path(), &config).unwrap();
        assert!(Arc::ptr_eq(&reloaded, &again));
    }

    #[test]
    fn load_errors_are_not_cached() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "Data,Descrição,Convênio,Valor\nontem,Hemograma,UNIMED,1\n").unwrap();
        let mut cache: DatasetCache<ExamTable> = DatasetCache::new();

        assert!(cache
            .get_or_load(file.path(), &DashboardConfig::default())
            .is_err());
        assert!(!cache.invalidate(file.path()));
    }
}
