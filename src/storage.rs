use std::path::PathBuf;

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

/// Files in a single local directory.
#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    /// Write through a uniquely named temp file and rename it into place, so
    /// readers never observe a partial file.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self
            .base_dir
            .join(format!("{}-{ident}", rusty_ulid::generate_ulid_string()));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)
    }
}
