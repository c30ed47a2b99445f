pub mod upload_task;

pub use upload_task::{TaskState, UploadTask};
