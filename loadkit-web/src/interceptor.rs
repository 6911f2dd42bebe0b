//! 控制器拦截器
//!
//! 拦截器按优先级组成调用栈，每个拦截器决定是否调用 `stack.next` 继续执行；
//! 栈的末端是控制器方法本身。

use std::any::Any;
use std::sync::Arc;

use crate::error::InterceptorResult;
use crate::method::ControllerMethod;
use crate::request::RequestContext;

/// 控制器拦截器 trait
pub trait ControllerInterceptor: Send + Sync {
    fn name(&self) -> &str;

    /// 数字越小越先执行
    fn priority(&self) -> i32 {
        100
    }

    /// 是否需要拦截该方法
    fn accepts(&self, method: &ControllerMethod) -> bool;

    /// 执行拦截逻辑
    ///
    /// 继续处理时必须恰好调用一次 `stack.next`；不调用表示请求已在此结束
    fn intercept(
        &self,
        stack: &mut dyn InterceptorStack,
        method: &ControllerMethod,
        instance: &dyn Any,
        ctx: &mut RequestContext,
    ) -> InterceptorResult<()>;
}

/// 拦截器调用栈
pub trait InterceptorStack {
    fn next(&mut self, method: &ControllerMethod, instance: &dyn Any, ctx: &mut RequestContext) -> InterceptorResult<()>;
}

/// 调用栈末端：执行控制器方法
pub trait ControllerAction: Send + Sync {
    fn execute(&self, method: &ControllerMethod, instance: &dyn Any, ctx: &mut RequestContext) -> InterceptorResult<()>;
}

/// 拦截器注册表
#[derive(Default, Clone)]
pub struct InterceptorRegistry {
    interceptors: Vec<Arc<dyn ControllerInterceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I: ControllerInterceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        self.register_arc(Arc::new(interceptor))
    }

    pub fn register_arc(&mut self, interceptor: Arc<dyn ControllerInterceptor>) -> &mut Self {
        tracing::info!(
            interceptor = interceptor.name(),
            priority = interceptor.priority(),
            "Registered controller interceptor"
        );
        self.interceptors.push(interceptor);
        // 按优先级排序（稳定排序，同优先级保持注册顺序）
        self.interceptors.sort_by_key(|i| i.priority());
        self
    }

    pub fn interceptors(&self) -> &[Arc<dyn ControllerInterceptor>] {
        &self.interceptors
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

/// 依次执行接受该方法的拦截器，最后执行控制器方法
pub struct SimpleInterceptorStack<'a> {
    remaining: std::slice::Iter<'a, Arc<dyn ControllerInterceptor>>,
    action: &'a dyn ControllerAction,
}

impl<'a> SimpleInterceptorStack<'a> {
    pub fn new(registry: &'a InterceptorRegistry, action: &'a dyn ControllerAction) -> Self {
        Self {
            remaining: registry.interceptors.iter(),
            action,
        }
    }
}

impl InterceptorStack for SimpleInterceptorStack<'_> {
    fn next(&mut self, method: &ControllerMethod, instance: &dyn Any, ctx: &mut RequestContext) -> InterceptorResult<()> {
        while let Some(interceptor) = self.remaining.next() {
            if interceptor.accepts(method) {
                tracing::trace!(
                    interceptor = interceptor.name(),
                    route = method.route(),
                    "Invoking interceptor"
                );
                return interceptor.intercept(self, method, instance, ctx);
            }
        }

        self.action.execute(method, instance, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// 记录调用顺序的拦截器
    struct Recording {
        name: &'static str,
        priority: i32,
        accepts: bool,
        proceed: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ControllerInterceptor for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn accepts(&self, _method: &ControllerMethod) -> bool {
            self.accepts
        }

        fn intercept(
            &self,
            stack: &mut dyn InterceptorStack,
            method: &ControllerMethod,
            instance: &dyn Any,
            ctx: &mut RequestContext,
        ) -> InterceptorResult<()> {
            self.log.lock().push(self.name.to_string());
            if self.proceed {
                stack.next(method, instance, ctx)
            } else {
                Ok(())
            }
        }
    }

    struct RecordingAction(Arc<Mutex<Vec<String>>>);

    impl ControllerAction for RecordingAction {
        fn execute(&self, _method: &ControllerMethod, _instance: &dyn Any, _ctx: &mut RequestContext) -> InterceptorResult<()> {
            self.0.lock().push("action".to_string());
            Ok(())
        }
    }

    fn recording(
        name: &'static str,
        priority: i32,
        accepts: bool,
        proceed: bool,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Recording {
        Recording {
            name,
            priority,
            accepts,
            proceed,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn test_stack_runs_in_priority_order_then_action() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InterceptorRegistry::new();
        registry
            .register(recording("late", 200, true, true, &log))
            .register(recording("skipped", 1, false, true, &log))
            .register(recording("early", 10, true, true, &log));

        let action = RecordingAction(Arc::clone(&log));
        let method = ControllerMethod::builder("r").build();
        let mut ctx = RequestContext::new();

        SimpleInterceptorStack::new(&registry, &action)
            .next(&method, &(), &mut ctx)
            .unwrap();

        assert_eq!(*log.lock(), vec!["early", "late", "action"]);
    }

    #[test]
    fn test_interceptor_can_halt_the_stack() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InterceptorRegistry::new();
        registry
            .register(recording("halt", 1, true, false, &log))
            .register(recording("never", 2, true, true, &log));

        let action = RecordingAction(Arc::clone(&log));
        let method = ControllerMethod::builder("r").build();
        let mut ctx = RequestContext::new();

        SimpleInterceptorStack::new(&registry, &action)
            .next(&method, &(), &mut ctx)
            .unwrap();

        assert_eq!(*log.lock(), vec!["halt"]);
    }
}
