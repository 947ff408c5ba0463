//! Archive extraction seam. The default implementation understands the two
//! formats nodejs.org ships, `.tar.gz` and `.zip`.
//!
//! Truncated archives get their own error kind so the installer can tell an
//! interrupted download apart from a genuinely malformed file without
//! digging through error causes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive ended before its declared contents did. Almost always an
    /// interrupted download that left a partial file in the cache.
    #[error("archive {path} is incomplete")]
    SourceIncomplete { path: PathBuf },

    #[error("unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("malformed archive {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("could not extract {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            ExtractError::SourceIncomplete {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), ExtractError>;
}

#[derive(Debug, Default)]
pub struct DefaultArchiveExtractor;

impl ArchiveExtractor for DefaultArchiveExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
        let name = archive.to_string_lossy();

        if name.ends_with(".tar.gz") {
            extract_tar_gz(archive, dest_dir)
        } else if name.ends_with(".zip") {
            extract_zip(archive, dest_dir)
        } else {
            Err(ExtractError::UnsupportedFormat {
                path: archive.to_path_buf(),
            })
        }
    }
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = fs::File::open(archive_path).map_err(|e| ExtractError::from_io(archive_path, e))?;
    let decompressed = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decompressed);

    archive
        .unpack(dest_dir)
        .map_err(|e| ExtractError::from_io(archive_path, e))
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = fs::File::open(archive_path).map_err(|e| ExtractError::from_io(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| classify_zip_error(archive_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| classify_zip_error(archive_path, e))?;

        // Entries with paths escaping the destination are skipped.
        let outpath = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => continue,
        };

        if entry.name().ends_with('/') {
            fs::create_dir_all(&outpath).map_err(|e| ExtractError::from_io(archive_path, e))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| ExtractError::from_io(archive_path, e))?;
            }
            let mut outfile =
                fs::File::create(&outpath).map_err(|e| ExtractError::from_io(archive_path, e))?;
            io::copy(&mut entry, &mut outfile)
                .map_err(|e| ExtractError::from_io(archive_path, e))?;
        }
    }

    Ok(())
}

fn classify_zip_error(archive_path: &Path, error: zip::result::ZipError) -> ExtractError {
    match error {
        zip::result::ZipError::Io(source) => ExtractError::from_io(archive_path, source),
        other => ExtractError::Malformed {
            path: archive_path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
