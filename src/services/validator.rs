//! 文件校验服务 - 业务能力层
//!
//! 只负责"按策略划分接受 / 拒绝"能力，纯函数，无 I/O

use tracing::debug;

use crate::error::RejectionReason;
use crate::models::{CandidateFile, Policy};

/// 被拒绝的文件及原因
#[derive(Debug, Clone)]
pub struct Rejection {
    pub file: CandidateFile,
    pub reason: RejectionReason,
}

/// 校验结果
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<Rejection>,
}

/// 按策略校验一批候选文件
///
/// 逐个文件检查，先命中的规则生效：
/// 1. 超过 `max_size_bytes` → `FileTooLarge`
/// 2. 内容类型不在允许列表 → `UnsupportedType`
///
/// 逐文件检查之后，如果 `currently_tracked + accepted.len() > max_batch_size`，
/// 本次调用中所有已接受的文件都以 `BatchLimitExceeded` 拒绝（整批失败，不截断）。
///
/// 拒绝列表保持输入顺序。
pub fn validate(
    files: Vec<CandidateFile>,
    policy: &Policy,
    currently_tracked: usize,
    max_batch_size: usize,
) -> Validation {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    // 记录每个文件在输入中的位置，整批拒绝时按原顺序合并
    let mut order: Vec<(usize, bool)> = Vec::with_capacity(files.len());

    for file in files {
        match check_file(&file, policy) {
            Some(reason) => {
                debug!("拒绝文件 {}: {:?}", file.name, reason);
                order.push((rejected.len(), false));
                rejected.push(Rejection { file, reason });
            }
            None => {
                order.push((accepted.len(), true));
                accepted.push(file);
            }
        }
    }

    if currently_tracked + accepted.len() <= max_batch_size {
        return Validation { accepted, rejected };
    }

    debug!(
        "批量上限超出: 已跟踪 {} + 本次 {} > {}",
        currently_tracked,
        accepted.len(),
        max_batch_size
    );

    let mut accepted: Vec<Option<CandidateFile>> = accepted.into_iter().map(Some).collect();
    let mut per_file: Vec<Option<Rejection>> = rejected.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(order.len());
    for (index, was_accepted) in order {
        let rejection = if was_accepted {
            accepted[index].take().map(|file| Rejection {
                file,
                reason: RejectionReason::BatchLimitExceeded,
            })
        } else {
            per_file[index].take()
        };
        merged.extend(rejection);
    }

    Validation {
        accepted: Vec::new(),
        rejected: merged,
    }
}

fn check_file(file: &CandidateFile, policy: &Policy) -> Option<RejectionReason> {
    if file.size_bytes > policy.max_size_bytes {
        return Some(RejectionReason::FileTooLarge);
    }
    if !policy.allows(&file.content_type) {
        return Some(RejectionReason::UnsupportedType);
    }
    None
}
