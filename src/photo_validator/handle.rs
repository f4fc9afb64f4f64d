//! # 解码句柄模块
//!
//! ## 设计思路
//!
//! 每次校验在解码前获取一个临时句柄，校验结束（通过、任一拒绝分支、解码失败、
//! 工作线程 panic）时必须且只能释放一次。
//!
//! ## 实现思路
//!
//! - `DecodeHandle` 采用 RAII：构造时登记，`Drop` 时释放，不在每个返回点手动收尾。
//! - `HandleRegistry` 只保存原子计数，多个并发校验之间无需加锁。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 句柄登记表。
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// 登记表快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleStats {
    pub acquired: u64,
    pub released: u64,
}

impl HandleStats {
    /// 尚未释放的句柄数量。
    pub fn live(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn acquire(self: &Arc<Self>, label: &str) -> DecodeHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        log::debug!("🔓 获取解码句柄 #{} - {}", id, label);

        DecodeHandle {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn stats(&self) -> HandleStats {
        HandleStats {
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// 单次校验持有的临时解码句柄。
///
/// 不可克隆；离开作用域即释放。
#[derive(Debug)]
pub struct DecodeHandle {
    id: u64,
    registry: Arc<HandleRegistry>,
}

impl DecodeHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for DecodeHandle {
    fn drop(&mut self) {
        self.registry.released.fetch_add(1, Ordering::SeqCst);
        log::debug!("🔒 释放解码句柄 #{}", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_released_when_dropped() {
        let registry = HandleRegistry::new();

        {
            let handle = registry.acquire("test");
            assert_eq!(handle.id(), 1);
            assert_eq!(registry.stats().live(), 1);
        }

        let stats = registry.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn handle_is_released_on_panic_unwind() {
        let registry = HandleRegistry::new();
        let inner = Arc::clone(&registry);

        let outcome = std::panic::catch_unwind(move || -> u64 {
            let handle = inner.acquire("panicking");
            if handle.id() > 0 {
                panic!("decode worker crashed");
            }
            handle.id()
        });

        assert!(outcome.is_err());
        assert_eq!(registry.stats().released, 1);
    }
}
