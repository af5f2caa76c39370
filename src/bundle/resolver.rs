//! Descriptor source trait
//!
//! Repair needs to turn an identifier read back from the link table into a
//! downloadable descriptor again. Both the static catalog and the namespace
//! registry can do that.

use crate::bundle::types::VersionDescriptor;
use crate::error::Error;

/// Anything that can map an identifier to a `VersionDescriptor`
#[async_trait::async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Resolve `identifier` to a descriptor
    ///
    /// # Returns
    /// * `Ok(VersionDescriptor)` - A descriptor with a download URL
    /// * `Err(Error)` - If the identifier is unknown or metadata is unavailable
    async fn descriptor(&self, identifier: &str) -> Result<VersionDescriptor, Error>;
}
