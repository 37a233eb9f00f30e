pub mod auth_requests;
pub mod porting;
pub mod secrets;

pub use auth_requests::{AuthRequestView, CreateAuthRequestBody, RespondAuthRequestBody};
pub use porting::{
    ExportDocument, ExportFormat, ExportParams, ExportedProject, ExportedSecret, ImportBatch,
    ImportSummary, ProjectDescriptor, SecretDescriptor,
};
pub use secrets::{
    ProjectListResponse, ProjectView, SecretIdsRequest, SecretListResponse, SecretView,
    UpdatedCountResponse,
};
