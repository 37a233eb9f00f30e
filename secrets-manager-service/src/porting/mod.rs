//! Bulk porting of projects and secrets in and out of an organization.

pub mod export;
pub mod import;
pub mod policy;

pub use export::ExportAssembler;
pub use import::ImportCommand;
pub use policy::{
    validate_import, ImportViolation, ValidatedImport, MAX_IMPORT_BODY_BYTES, MAX_IMPORT_PROJECTS,
    MAX_IMPORT_SECRETS,
};
