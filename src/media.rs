use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::error::MediaError;

pub const MOVIE_MIME: &str = "video/mp4";
const MOVIE_EXT: &str = ".mp4";

/// Movies in one flat directory, looked up by file name only.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    dir: PathBuf,
}

/// An opened movie, ready to be streamed or seeked.
#[derive(Debug)]
pub struct OpenMovie {
    pub path: PathBuf,
    pub size: u64,
    pub file: tokio::fs::File,
}

pub fn is_movie_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(MOVIE_EXT)
}

/// Rejects anything that is not a single plain path segment.
/// Purely syntactic: the filesystem is never consulted.
pub fn validate_name(name: &str) -> Result<(), MediaError> {
    let bad = name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(MediaError::InvalidInput(name.to_string()));
    }
    Ok(())
}

impl MediaLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted `.mp4` names in the directory. A missing or unreadable
    /// directory yields an empty list.
    pub fn list_movies(&self) -> Vec<String> {
        match self.try_list_movies() {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), "movies directory does not exist");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list movies");
                Vec::new()
            }
        }
    }

    /// Same as [`list_movies`](Self::list_movies) but surfaces I/O errors.
    pub fn try_list_movies(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            // Non UTF-8 names cannot be requested back by name anyway.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_movie_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Opens `name` for reading after validating it.
    pub async fn open_movie(&self, name: &str) -> Result<OpenMovie, MediaError> {
        if let Err(e) = validate_name(name) {
            tracing::warn!(name, "rejected movie name");
            return Err(e);
        }

        let path = self.dir.join(name);
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MediaError::NotFound(name.to_string()));
            }
            Err(source) => return Err(MediaError::Io { path, source }),
        };

        let meta = match file.metadata().await {
            Ok(m) => m,
            Err(source) => return Err(MediaError::Io { path, source }),
        };
        if !meta.is_file() {
            return Err(MediaError::NotFound(name.to_string()));
        }

        Ok(OpenMovie {
            path,
            size: meta.len(),
            file,
        })
    }
}
