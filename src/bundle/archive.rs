//! Archive extraction
//!
//! Release archives are often packed with a wrapping `LSCherry-<version>/`
//! folder. After extraction the wrapper chain is skipped so the cache entry
//! points at the real content.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bundle::error::ExtractError;
use crate::bundle::types::ArchiveKind;

/// Extract `archive` into `dest`, which must already exist
pub fn extract(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), ExtractError> {
    debug!("Extracting {:?} ({:?}) into {:?}", archive, kind, dest);
    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::Rar => extract_rar(archive, dest),
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    // Entries escaping `dest` are rejected by `extract`
    zip.extract(dest)?;
    Ok(())
}

#[cfg(feature = "rar")]
fn extract_rar(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let rar_err = |e: unrar::error::UnrarError| ExtractError::Rar(e.to_string());

    let mut open = unrar::Archive::new(archive)
        .open_for_processing()
        .map_err(rar_err)?;
    while let Some(header) = open.read_header().map_err(rar_err)? {
        open = if header.entry().is_file() {
            header.extract_with_base(dest).map_err(rar_err)?
        } else {
            header.skip().map_err(rar_err)?
        };
    }
    Ok(())
}

#[cfg(not(feature = "rar"))]
fn extract_rar(_archive: &Path, _dest: &Path) -> Result<(), ExtractError> {
    Err(ExtractError::Unsupported(
        "rar (build with the `rar` feature)",
    ))
}

/// Walk down single-directory wrappers and return the real content root.
///
/// A directory whose only child is another directory is a wrapper. An empty
/// directory is an error because the archive produced no content.
pub fn content_root(dir: &Path) -> Result<PathBuf, ExtractError> {
    let mut root = dir.to_path_buf();
    loop {
        let entries = fs::read_dir(&root)?.collect::<Result<Vec<_>, _>>()?;
        match entries.as_slice() {
            [] => return Err(ExtractError::Empty),
            [only] if only.file_type()?.is_dir() => {
                debug!("Skipping wrapper directory {:?}", only.path());
                root = only.path();
            }
            _ => return Ok(root),
        }
    }
}
