pub mod file;
pub mod loaders;
pub mod policy;
pub mod task;

pub use file::{BodyStream, CandidateFile, FileBody};
pub use loaders::{load_policy_table, scan_upload_folder};
pub use policy::{normalize_content_type, BucketId, Policy, PolicyTable};
pub use task::{RemoteLocation, TaskId, TaskSnapshot, TaskStatus};
