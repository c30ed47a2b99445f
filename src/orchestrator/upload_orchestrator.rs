//! 上传编排器 - 编排层
//!
//! ## 职责
//!
//! "把这些文件提交到类别 X"的公开入口，也是本次会话所有任务的唯一登记处。
//!
//! ## 并发模型
//!
//! - 各任务的传输 I/O 在后台并发进行
//! - 传输回调先进入编排器的事件队列，再由编排器（`&mut self`）逐个应用
//! - 因此任何两次状态修改都不会重叠，外部只能拿到快照
//!
//! ## 取消
//!
//! `remove_task` 对进行中的任务只做尽力取消。之后才到达的回调按 id 查找不到，
//! 直接丢弃，不会让已移除的任务复活。

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::error::{AppResult, RejectionReason, UploadError};
use crate::infrastructure::{Transport, TransportEvent, TransportEventKind};
use crate::models::{CandidateFile, PolicyTable, RemoteLocation, TaskId, TaskSnapshot, TaskStatus};
use crate::services::validator;
use crate::workflow::UploadTask;

/// 编排器对外发布的通知，按发生顺序投递
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadNotice {
    /// 文件未通过校验，没有创建任务
    Rejected {
        file_name: String,
        reason: RejectionReason,
    },
    /// 任务开始一次传输
    Started { id: TaskId, attempt: u32 },
    /// 进度前进
    Progress { id: TaskId, percent: u8 },
    Completed { id: TaskId, location: RemoteLocation },
    Failed { id: TaskId, message: String },
    /// 任务被调用方移除
    Removed { id: TaskId },
}

/// 上传编排器
pub struct UploadOrchestrator {
    policies: PolicyTable,
    transport: Arc<dyn Transport>,
    max_batch_size: usize,
    /// id 单调递增，BTreeMap 的顺序即插入顺序
    tasks: BTreeMap<TaskId, UploadTask>,
    next_id: u64,
    events_tx: UnboundedSender<TransportEvent>,
    events_rx: UnboundedReceiver<TransportEvent>,
    notices: UnboundedSender<UploadNotice>,
}

impl UploadOrchestrator {
    /// 创建编排器，同时返回通知接收端
    pub fn new(
        policies: PolicyTable,
        transport: Arc<dyn Transport>,
        max_batch_size: usize,
    ) -> (Self, UnboundedReceiver<UploadNotice>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices, notices_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            policies,
            transport,
            max_batch_size,
            tasks: BTreeMap::new(),
            next_id: 1,
            events_tx,
            events_rx,
            notices,
        };
        (orchestrator, notices_rx)
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// 提交一批文件
    ///
    /// 校验通过的文件各创建一个任务并立即启动；被拒绝的文件只发布
    /// `Rejected` 通知。返回的快照在返回时已是 InProgress，之后的状态
    /// 需要通过 `task` / `all_tasks` 重新读取。
    ///
    /// 只有类别未注册时返回错误。
    pub fn submit(
        &mut self,
        files: Vec<CandidateFile>,
        category: &str,
    ) -> AppResult<Vec<TaskSnapshot>> {
        let policy = self.policies.policy_for(category)?.clone();
        let submitted = files.len();

        let validation =
            validator::validate(files, &policy, self.tasks.len(), self.max_batch_size);

        for rejection in validation.rejected {
            warn!(
                "⚠️ 拒绝文件 {} ({}): {}",
                rejection.file.name, category, rejection.reason
            );
            self.notify(UploadNotice::Rejected {
                file_name: rejection.file.name,
                reason: rejection.reason,
            });
        }

        info!(
            "📤 类别 {}: 提交 {} 个文件，接受 {} 个",
            category,
            submitted,
            validation.accepted.len()
        );

        let mut created = Vec::with_capacity(validation.accepted.len());
        for file in validation.accepted {
            let id = self.allocate_id();
            let mut task = UploadTask::new(id, file, policy.destination.clone());
            task.start(self.transport.as_ref(), &self.events_tx)?;
            self.notify(UploadNotice::Started {
                id,
                attempt: task.attempts(),
            });
            created.push(task.snapshot());
            self.tasks.insert(id, task);
        }

        Ok(created)
    }

    /// 重试失败的任务
    pub fn retry_task(&mut self, id: TaskId) -> AppResult<TaskSnapshot> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(UploadError::TaskNotFound(id))?;

        task.retry(self.transport.as_ref(), &self.events_tx)?;
        let attempt = task.attempts();
        let snapshot = task.snapshot();
        self.notify(UploadNotice::Started { id, attempt });
        Ok(snapshot)
    }

    /// 移除任务（不论状态），返回移除前的最后快照
    ///
    /// 进行中的任务会先请求传输层取消；取消是尽力而为，传输仍可能在后台完成。
    pub fn remove_task(&mut self, id: TaskId) -> AppResult<TaskSnapshot> {
        let task = self.tasks.remove(&id).ok_or(UploadError::TaskNotFound(id))?;

        if task.cancel(self.transport.as_ref()) {
            info!("[任务 {}] 🛑 已请求取消: {}", id, task.file().name);
        }
        debug!("[任务 {}] 已从登记表移除", id);

        self.notify(UploadNotice::Removed { id });
        Ok(task.snapshot())
    }

    /// 所有任务的快照（插入顺序）
    pub fn all_tasks(&self) -> Vec<TaskSnapshot> {
        self.tasks.values().map(UploadTask::snapshot).collect()
    }

    /// 单个任务的当前快照
    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(&id).map(UploadTask::snapshot)
    }

    /// 当前登记的任务数
    pub fn tracked_count(&self) -> usize {
        self.tasks.len()
    }

    /// 进行中的任务数
    pub fn in_flight(&self) -> usize {
        self.tasks
            .values()
            .filter(|task| task.status() == TaskStatus::InProgress)
            .count()
    }

    /// 应用一条传输回调，返回是否改变了某个任务
    ///
    /// 找不到 id 的回调（任务已被移除）直接丢弃。
    pub fn apply(&mut self, event: TransportEvent) -> bool {
        let Some(task) = self.tasks.get_mut(&event.task_id) else {
            debug!("任务 {} 已不存在，丢弃迟到的回调", event.task_id);
            return false;
        };

        let id = event.task_id;
        let notice = match event.kind {
            TransportEventKind::Progress(raw) => task
                .on_progress(event.attempt, raw)
                .map(|percent| UploadNotice::Progress { id, percent }),
            TransportEventKind::Finished(result) => {
                if task.on_finished(event.attempt, result) {
                    match (task.result_location(), task.error_message()) {
                        (Some(location), _) => Some(UploadNotice::Completed {
                            id,
                            location: location.clone(),
                        }),
                        (None, Some(message)) => Some(UploadNotice::Failed { id, message }),
                        (None, None) => None,
                    }
                } else {
                    None
                }
            }
        };

        match notice {
            Some(notice) => {
                self.notify(notice);
                true
            }
            None => false,
        }
    }

    /// 应用所有已到达的回调，不等待，返回处理的回调数
    pub fn drain_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            count += 1;
        }
        count
    }

    /// 等待并应用下一条回调
    ///
    /// 没有进行中的任务时立即返回 `false`。传输层从不回调时会一直等待，
    /// 超时由传输层负责。
    pub async fn process_next(&mut self) -> bool {
        if self.in_flight() == 0 {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// 持续处理回调，直到没有进行中的任务
    pub async fn run_until_idle(&mut self) {
        while self.process_next().await {}
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn notify(&self, notice: UploadNotice) {
        // 没有人订阅通知时照常运行
        let _ = self.notices.send(notice);
    }
}

/// 一次 `submit` 产生的任务是否都已离开 InProgress
///
/// 批次不是实体，由调用方拿着 `submit` 的返回值自行判断；已被移除的任务视为结束。
pub fn batch_settled(batch: &[TaskId], tasks: &[TaskSnapshot]) -> bool {
    batch.iter().all(|id| {
        tasks
            .iter()
            .find(|task| task.id == *id)
            .map_or(true, |task| task.status.is_settled())
    })
}
