pub mod report_writer;
pub mod validator;

pub use report_writer::ReportWriter;
pub use validator::{validate, Rejection, Validation};
