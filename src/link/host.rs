//! Host collaborator
//!
//! The document host (Blender) owns the actual library references. The core
//! asks it to link, relocate and remove them, and keeps its own bookkeeping
//! in the link table.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::link::error::LinkError;

/// Host-side handle of one external reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    pub handle: String,
    /// Backing file the reference currently points at
    pub file: PathBuf,
}

/// Operations the document host performs on external references
pub trait LinkHost: Send + Sync {
    /// Link `object_name` out of `source_file` into the document
    fn link_object(&self, source_file: &Path, object_name: &str) -> Result<ExternalRef, LinkError>;

    /// Point an existing reference at `new_file`, keeping its slot
    fn relocate(&self, reference: &ExternalRef, new_file: &Path) -> Result<ExternalRef, LinkError>;

    /// Drop a reference from the document
    fn remove(&self, reference: &ExternalRef) -> Result<(), LinkError>;
}

/// Host used without a running Blender.
///
/// It validates that backing files exist and derives stable handles; the
/// link table is the only state.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessHost;

impl HeadlessHost {
    fn handle(object_name: &str, file: &Path) -> String {
        format!("{}@{}", object_name, file.display())
    }

    fn object_of(reference: &ExternalRef) -> &str {
        reference
            .handle
            .split_once('@')
            .map(|(object, _)| object)
            .unwrap_or(&reference.handle)
    }
}

impl LinkHost for HeadlessHost {
    fn link_object(&self, source_file: &Path, object_name: &str) -> Result<ExternalRef, LinkError> {
        if !source_file.is_file() {
            return Err(LinkError::MissingSource(source_file.to_path_buf()));
        }
        debug!("Linking {} from {:?}", object_name, source_file);
        Ok(ExternalRef {
            handle: Self::handle(object_name, source_file),
            file: source_file.to_path_buf(),
        })
    }

    fn relocate(&self, reference: &ExternalRef, new_file: &Path) -> Result<ExternalRef, LinkError> {
        if !new_file.is_file() {
            return Err(LinkError::MissingSource(new_file.to_path_buf()));
        }
        debug!("Relocating {} to {:?}", reference.handle, new_file);
        Ok(ExternalRef {
            handle: Self::handle(Self::object_of(reference), new_file),
            file: new_file.to_path_buf(),
        })
    }

    fn remove(&self, reference: &ExternalRef) -> Result<(), LinkError> {
        debug!("Removing {}", reference.handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn link_object_requires_existing_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("LS Cherry.blend");

        let result = HeadlessHost.link_object(&missing, "Cherry");

        assert!(matches!(result, Err(LinkError::MissingSource(path)) if path == missing));
    }

    #[test]
    fn relocate_keeps_object_and_switches_file() {
        let temp = TempDir::new().unwrap();
        let old_file = temp.path().join("old.blend");
        let new_file = temp.path().join("new.blend");
        fs::write(&old_file, "x").unwrap();
        fs::write(&new_file, "x").unwrap();

        let reference = HeadlessHost.link_object(&old_file, "Cherry").unwrap();
        let moved = HeadlessHost.relocate(&reference, &new_file).unwrap();

        assert_eq!(moved.file, new_file);
        assert_eq!(moved.handle, format!("Cherry@{}", new_file.display()));
    }

    #[test]
    fn remove_always_succeeds() {
        let reference = ExternalRef {
            handle: "Cherry@/gone.blend".to_string(),
            file: PathBuf::from("/gone.blend"),
        };
        assert!(HeadlessHost.remove(&reference).is_ok());
    }
}
