//! 配置文件存储：`<dir>/<slug>.yaml`。

use crate::GenerateError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 以 slug 为键的配置文件目录。
///
/// 写入先落临时文件再 rename，读者不会看到写了一半的文件。
#[derive(Debug, Clone)]
pub struct ConfigFileStore {
    dir: PathBuf,
}

impl ConfigFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.yaml"))
    }

    pub fn exists(&self, slug: &str) -> bool {
        self.path_for(slug).is_file()
    }

    pub fn save(&self, slug: &str, yaml: &str) -> Result<PathBuf, GenerateError> {
        fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        let target = self.path_for(slug);
        let tmp = self
            .dir
            .join(format!(".{slug}.{}.tmp", uuid::Uuid::new_v4().simple()));
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(yaml.as_bytes())?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&tmp, source));
        }
        if let Err(source) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&target, source));
        }
        tracing::info!(
            target: "sites.generator",
            slug = %slug,
            path = %target.display(),
            "config_saved"
        );
        Ok(target)
    }

    pub fn load(&self, slug: &str) -> Result<Option<String>, GenerateError> {
        let path = self.path_for(slug);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}
