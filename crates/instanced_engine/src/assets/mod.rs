//! Asset loading
//!
//! Mesh import is delegated to `tobj`; this module turns its output into a
//! flat triangle list ready for [`crate::render::instancing::ModelRepository`].

pub mod importer;

pub use importer::{import_obj, import_obj_from_reader, ImportError, ImportedMesh};
