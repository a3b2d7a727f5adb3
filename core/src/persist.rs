use crate::index::{BuildStats, InvertedIndex};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no index found at {}", .0.display())]
    Missing(PathBuf),
    #[error("corrupt index at {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot encode index: {0}")]
    Encode(#[from] bincode::Error),
    #[error("invalid index metadata: {0}")]
    Meta(#[from] serde_json::Error),
    #[error("cannot format build timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl IndexError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            IndexError::Missing(path.to_path_buf())
        } else {
            IndexError::Io { path: path.to_path_buf(), source }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub num_records: usize,
    pub num_terms: usize,
    pub num_postings: usize,
}

impl MetaFile {
    /// Metadata for an index built just now.
    pub fn now(stats: &BuildStats) -> Result<Self, IndexError> {
        Ok(Self {
            version: FORMAT_VERSION,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339)?,
            num_records: stats.records,
            num_terms: stats.terms,
            num_postings: stats.postings,
        })
    }
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    index: &'a InvertedIndex,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    index: InvertedIndex,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write `bytes` next to `path` and rename over it, so readers never see a half-written file.
/// The temporary file is removed again if any step fails.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = path.with_extension("tmp");
    let written = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .map_err(|e| IndexError::io(&tmp, e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| IndexError::io(path, e)));
    if written.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %e, "could not remove temporary index file");
            }
        }
    }
    written
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<(), IndexError> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let bytes = bincode::serialize(&IndexFileRef { version: FORMAT_VERSION, index })?;
    write_atomic(&paths.postings(), &bytes)
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex, IndexError> {
    let path = paths.postings();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    let file: IndexFile = bincode::deserialize(&buf)
        .map_err(|e| IndexError::Corrupt { path: path.clone(), reason: e.to_string() })?;
    if file.version != FORMAT_VERSION {
        return Err(IndexError::Corrupt {
            path,
            reason: format!("unsupported format version {}", file.version),
        });
    }
    Ok(file.index)
}

/// Result of a load that never fails: an index (empty on failure) plus what went wrong, if anything.
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: InvertedIndex,
    pub error: Option<IndexError>,
}

impl LoadedIndex {
    pub fn is_loaded(&self) -> bool { self.error.is_none() }

    /// The index if the load succeeded.
    pub fn into_option(self) -> Option<InvertedIndex> {
        match self.error {
            None => Some(self.index),
            Some(_) => None,
        }
    }
}

pub fn load_index_or_empty(paths: &IndexPaths) -> LoadedIndex {
    match load_index(paths) {
        Ok(index) => {
            tracing::info!(terms = index.len(), path = %paths.postings().display(), "inverted index loaded");
            LoadedIndex { index, error: None }
        }
        Err(err) => {
            tracing::warn!(error = %err, "inverted index unavailable, field scan will be used");
            LoadedIndex { index: InvertedIndex::new(), error: Some(err) }
        }
    }
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), IndexError> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, IndexError> {
    let path = paths.meta();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Save the index and its metadata file.
pub fn save_with_meta(paths: &IndexPaths, index: &InvertedIndex, stats: &BuildStats) -> Result<MetaFile, IndexError> {
    save_index(paths, index)?;
    let meta = MetaFile::now(stats)?;
    save_meta(paths, &meta)?;
    Ok(meta)
}
