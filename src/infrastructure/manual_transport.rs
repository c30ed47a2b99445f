//! 手动传输 - 基础设施层
//!
//! 不做任何 I/O，只记录每次 `send`，由调用方手动回报进度和结果。
//! 用于界面预览和测试。

use std::sync::{Arc, Mutex, MutexGuard};

use crate::infrastructure::transport::{CancelHandle, TransferReporter, Transport};
use crate::models::{BucketId, CandidateFile, TaskId};

/// 一次被记录的传输
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub bucket: BucketId,
    pub file_name: String,
    pub reporter: TransferReporter,
    pub handle: CancelHandle,
}

impl PendingSend {
    pub fn task_id(&self) -> TaskId {
        self.reporter.task_id()
    }
}

/// 手动驱动的传输
#[derive(Debug, Clone, Default)]
pub struct ManualTransport {
    sends: Arc<Mutex<Vec<PendingSend>>>,
    cancels: Arc<Mutex<Vec<TaskId>>>,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有记录过的传输（按发起顺序）
    pub fn sends(&self) -> Vec<PendingSend> {
        lock(&self.sends).clone()
    }

    /// 某个任务最近一次传输
    pub fn last_send_for(&self, id: TaskId) -> Option<PendingSend> {
        lock(&self.sends)
            .iter()
            .rev()
            .find(|send| send.task_id() == id)
            .cloned()
    }

    /// 发起过的传输次数
    pub fn send_count(&self) -> usize {
        lock(&self.sends).len()
    }

    /// 收到取消请求的任务
    pub fn cancelled(&self) -> Vec<TaskId> {
        lock(&self.cancels).clone()
    }
}

impl Transport for ManualTransport {
    fn send(
        &self,
        bucket: &BucketId,
        file: &CandidateFile,
        reporter: TransferReporter,
    ) -> CancelHandle {
        let handle = CancelHandle::new();
        lock(&self.sends).push(PendingSend {
            bucket: bucket.clone(),
            file_name: file.name.clone(),
            reporter,
            handle: handle.clone(),
        });
        handle
    }

    fn cancel(&self, handle: &CancelHandle) {
        handle.cancel();
        let cancelled: Vec<TaskId> = lock(&self.sends)
            .iter()
            .filter(|send| send.handle.is_cancelled())
            .map(PendingSend::task_id)
            .collect();

        let mut cancels = lock(&self.cancels);
        for id in cancelled {
            if !cancels.contains(&id) {
                cancels.push(id);
            }
        }
    }
}

// 回调方 panic 不应让记录不可读
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
