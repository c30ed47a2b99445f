//! 基础设施层
//!
//! 持有与存储后端通信的资源，只暴露"发送 / 取消"能力，不认识任务状态机

pub mod http_transport;
pub mod local_transport;
pub mod manual_transport;
pub mod transport;

pub use http_transport::HttpTransport;
pub use local_transport::LocalDirTransport;
pub use manual_transport::{ManualTransport, PendingSend};
pub use transport::{
    CancelHandle, TransferReporter, Transport, TransportEvent, TransportEventKind,
};
