//! The media library: finding files, annotating content, and keeping the
//! annotations in step with what is actually on disk.
//!
//! The primary entry point is [`refresh`], which walks the library with a
//! [`Scanner`], resolves every file's fingerprint through the
//! [`IdentityCache`](reel_identity::IdentityCache) and then [`reconcile`]s the
//! result against the [`MetadataTable`].

pub mod annotation;
pub mod error;
pub mod metadata;
pub mod reconcile;
mod refresh;
pub mod scan;

pub use crate::annotation::{Annotation, AnnotationPatch, Rotation};
pub use crate::metadata::MetadataTable;
pub use crate::reconcile::{FingerprintedFile, Summary, reconcile};
pub use crate::refresh::{RefreshEvent, refresh};
pub use crate::scan::{ScannedFile, Scanner, newest};
