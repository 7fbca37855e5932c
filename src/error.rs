use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("data file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to parse GeoJSON {}: {source}", path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },
    #[error("invalid geometry in {}: {message}", path.display())]
    Geometry { path: PathBuf, message: String },
    #[error("unsupported geometry format: {}", path.display())]
    UnsupportedGeometryFormat { path: PathBuf },
    #[error("region code {code} is associated with two names: {first:?} and {second:?}")]
    ConflictingRegionName {
        code: String,
        first: String,
        second: String,
    },
    #[error("ballot counts for region {code} overflow")]
    CountOverflow { code: String },
    #[error("failed to write CSV {}: {source}", path.display())]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid font file: {}", path.display())]
    Font { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Classifies an I/O failure on `path`, keeping "not found" distinct.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            PipelineError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PipelineError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        if let csv::ErrorKind::Io(io_err) = source.kind() {
            if io_err.kind() == io::ErrorKind::NotFound {
                return PipelineError::FileNotFound {
                    path: path.to_path_buf(),
                };
            }
        }
        PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, PipelineError::FileNotFound { .. })
    }
}
