//! 设备级构建互斥。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// 正在构建的设备 slug 集合。
///
/// 同一 slug 同时只允许一个编译/烧录任务（以及一次配置重写）持有租约。
#[derive(Debug, Clone, Default)]
pub struct BuildLeases {
    held: Arc<Mutex<HashSet<String>>>,
}

impl BuildLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试为 `slug` 加锁；已被持有时返回 None。
    pub fn try_acquire(&self, slug: &str) -> Option<LeaseGuard> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(slug.to_string()) {
            return None;
        }
        Some(LeaseGuard {
            slug: slug.to_string(),
            held: self.held.clone(),
        })
    }

    pub fn is_held(&self, slug: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(slug)
    }
}

/// 租约守卫；drop 时释放（任务 panic 时同样释放）。
#[derive(Debug)]
pub struct LeaseGuard {
    slug: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl LeaseGuard {
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.slug);
    }
}

#[cfg(test)]
mod tests {
    use super::BuildLeases;

    #[test]
    fn lease_is_exclusive_until_dropped() {
        let leases = BuildLeases::new();
        let guard = leases.try_acquire("gate_a").expect("first lease");
        assert!(leases.try_acquire("gate_a").is_none());
        assert!(leases.try_acquire("gate_b").is_some());
        assert!(leases.is_held("gate_a"));
        drop(guard);
        assert!(!leases.is_held("gate_a"));
        assert!(leases.try_acquire("gate_a").is_some());
    }

    #[test]
    fn lease_released_on_panic() {
        let leases = BuildLeases::new();
        let cloned = leases.clone();
        let outcome = std::thread::spawn(move || {
            let _guard = cloned.try_acquire("crane_01").expect("lease");
            panic!("build task crashed");
        })
        .join();
        assert!(outcome.is_err());
        assert!(!leases.is_held("crane_01"));
    }
}
