//! Reading, writing and round-tripping of FOL archives.
//!
//! An archive is unpacked into a [`workspace::Workspace`] holding the decrypted
//! files and a manifest of keys, which can later be packed back into a new
//! archive, reconciled with whatever changed on disk in between.

mod archive;
mod error;
pub mod fol;
pub mod keygen;
pub mod manifest;
pub mod workspace;

pub use error::{FolError, Result};
pub use keygen::{KeyGenerator, RandomKeyGenerator};
pub use manifest::{Manifest, ManifestEntry};
pub use workspace::{pack, unpack, PackOptions, PackReport, UnpackReport, Workspace};
