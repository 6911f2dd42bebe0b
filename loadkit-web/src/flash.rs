//! Flash 作用域
//!
//! 在内部重定向/转发之间携带控制器方法的实参。共享的 `FlashStore` 以 (路由, 关联 ID)
//! 为键保存实参；每个请求通过 `RequestFlash` 句柄读写自己的那一份。

use chrono::{DateTime, Duration, Utc};
use loadkit_core::{constants::FLASH_MAX_AGE_SECONDS, Environment};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::method::ControllerMethod;
use crate::request::Arguments;

/// Flash 参数载体
pub trait FlashScope: Send + Sync {
    /// 取出（并移除）为该方法携带的实参
    fn consume_parameters(&self, method: &ControllerMethod) -> Option<Arguments>;

    /// 为该方法放回实参；`None` 时不做任何事
    fn include_parameters(&self, method: &ControllerMethod, args: Option<Arguments>);
}

/// 不携带任何参数的 Flash 实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFlash;

impl FlashScope for NoFlash {
    fn consume_parameters(&self, _method: &ControllerMethod) -> Option<Arguments> {
        None
    }

    fn include_parameters(&self, _method: &ControllerMethod, _args: Option<Arguments>) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlashKey {
    pub route: String,
    pub correlation_id: String,
}

struct FlashEntry {
    args: Arguments,
    stored_at: DateTime<Utc>,
}

/// 共享的 Flash 存储
pub struct FlashStore {
    entries: Mutex<HashMap<FlashKey, FlashEntry>>,
    max_age: Duration,
}

impl FlashStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    /// 从 Environment 读取 `loadkit.flash.max-age-seconds`（默认 300 秒）
    pub fn from_environment(env: &Environment) -> Self {
        let seconds = env.get_i64_or(FLASH_MAX_AGE_SECONDS, 300);
        Self::new(Duration::try_seconds(seconds).unwrap_or_else(|| Duration::seconds(300)))
    }

    /// 保存实参，同时清理已过期的条目
    pub fn put(&self, key: FlashKey, args: Arguments) {
        let now = Utc::now();
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, entry| now - entry.stored_at <= self.max_age);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired flash parameters");
        }

        entries.insert(key, FlashEntry { args, stored_at: now });
    }

    /// 取出未过期的实参
    pub fn take(&self, key: &FlashKey) -> Option<Arguments> {
        let entry = self.entries.lock().remove(key)?;
        if Utc::now() - entry.stored_at > self.max_age {
            tracing::debug!(route = %key.route, "Discarding expired flash parameters");
            return None;
        }
        Some(entry.args)
    }

    pub fn contains(&self, key: &FlashKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// 为一次请求创建 Flash 句柄
    pub fn scope(self: &Arc<Self>, correlation_id: impl Into<String>) -> RequestFlash {
        RequestFlash {
            store: Arc::clone(self),
            correlation_id: correlation_id.into(),
        }
    }
}

impl Default for FlashStore {
    fn default() -> Self {
        Self::new(Duration::seconds(300))
    }
}

/// 请求作用域的 Flash 句柄
pub struct RequestFlash {
    store: Arc<FlashStore>,
    correlation_id: String,
}

impl RequestFlash {
    fn key(&self, method: &ControllerMethod) -> FlashKey {
        FlashKey {
            route: method.route().to_string(),
            correlation_id: self.correlation_id.clone(),
        }
    }
}

impl FlashScope for RequestFlash {
    fn consume_parameters(&self, method: &ControllerMethod) -> Option<Arguments> {
        self.store.take(&self.key(method))
    }

    fn include_parameters(&self, method: &ControllerMethod, args: Option<Arguments>) {
        if let Some(args) = args {
            self.store.put(self.key(method), args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Value;

    fn method() -> ControllerMethod {
        ControllerMethod::builder("items#show").param::<String>("q").build()
    }

    #[test]
    fn test_consume_removes_parameters() {
        let store = Arc::new(FlashStore::default());
        let flash = store.scope("abc");
        let value: Value = Arc::new(1_u8);

        flash.include_parameters(&method(), Some(vec![Some(value)]));
        assert_eq!(flash.consume_parameters(&method()).map(|a| a.len()), Some(1));
        assert!(flash.consume_parameters(&method()).is_none());
    }

    #[test]
    fn test_include_none_is_noop() {
        let store = Arc::new(FlashStore::default());
        store.scope("abc").include_parameters(&method(), None);

        let key = FlashKey {
            route: "items#show".to_string(),
            correlation_id: "abc".to_string(),
        };
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_scopes_are_isolated_by_correlation_id() {
        let store = Arc::new(FlashStore::default());
        store.scope("one").include_parameters(&method(), Some(vec![None]));

        assert!(store.scope("two").consume_parameters(&method()).is_none());
        assert!(store.scope("one").consume_parameters(&method()).is_some());
    }

    #[test]
    fn test_expired_parameters_are_dropped() {
        let store = Arc::new(FlashStore::new(Duration::seconds(-1)));
        store.scope("abc").include_parameters(&method(), Some(vec![None]));

        assert!(store.scope("abc").consume_parameters(&method()).is_none());
    }

    #[test]
    fn test_put_sweeps_expired_entries() {
        let store = FlashStore::new(Duration::seconds(-1));
        let first = FlashKey {
            route: "items#show".to_string(),
            correlation_id: "first".to_string(),
        };
        let second = FlashKey {
            route: "items#show".to_string(),
            correlation_id: "second".to_string(),
        };

        store.put(first.clone(), vec![None]);
        store.put(second.clone(), vec![None]);

        // 从未被读取的过期条目也会被清掉
        assert!(!store.contains(&first));
        assert!(store.contains(&second));
    }
}
