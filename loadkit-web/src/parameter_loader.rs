//! 参数加载拦截器
//!
//! 在控制器执行前，为带 load 标记的形参按主键读取实体：
//! - 存在 Flash 实参时写入对应槽位，并把实参放回 Flash
//! - 否则以形参名设置请求属性
//!
//! 任何一个参数或实体缺失时请求以 404 结束，控制器不会被调用。

use std::any::Any;

use loadkit_core::Environment;

use crate::error::{InterceptorError, InterceptorResult};
use crate::interceptor::{ControllerInterceptor, InterceptorStack};
use crate::loader::{EntityLoader, LoadOutcome, NotFoundReason};
use crate::method::ControllerMethod;
use crate::properties::LoadProperties;
use crate::request::RequestContext;

pub struct ParameterLoaderInterceptor {
    loader: EntityLoader,
    priority: i32,
}

impl ParameterLoaderInterceptor {
    pub fn new(loader: EntityLoader) -> Self {
        Self {
            loader,
            priority: LoadProperties::default().priority,
        }
    }

    /// 优先级取自 `loadkit.load.priority`
    pub fn from_environment(env: &Environment, loader: EntityLoader) -> Self {
        Self::new(loader).with_priority(LoadProperties::from_environment(env).priority)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn loader(&self) -> &EntityLoader {
        &self.loader
    }
}

impl ControllerInterceptor for ParameterLoaderInterceptor {
    fn name(&self) -> &str {
        "ParameterLoaderInterceptor"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn accepts(&self, method: &ControllerMethod) -> bool {
        method.contains_load()
    }

    fn intercept(
        &self,
        stack: &mut dyn InterceptorStack,
        method: &ControllerMethod,
        instance: &dyn Any,
        ctx: &mut RequestContext,
    ) -> InterceptorResult<()> {
        let mut args = ctx.flash().consume_parameters(method);

        match self.loader.resolve(method, ctx)? {
            LoadOutcome::Proceed(bound) => {
                bound.bind(ctx, args.as_mut());
                ctx.flash().include_parameters(method, args);
                stack.next(method, instance, ctx)
            }
            LoadOutcome::NotFound(not_found) => {
                match &not_found.reason {
                    NotFoundReason::MissingParameter { key } => tracing::info!(
                        route = method.route(),
                        parameter = %not_found.parameter,
                        entity = %not_found.entity,
                        key = %key,
                        "Request parameter missing for loaded entity"
                    ),
                    NotFoundReason::MissingEntity { id } => tracing::info!(
                        route = method.route(),
                        parameter = %not_found.parameter,
                        entity = %not_found.entity,
                        id = %id,
                        "Entity not found"
                    ),
                }
                ctx.result_mut().not_found();
                Ok(())
            }
            LoadOutcome::BadRequest(e) => {
                tracing::warn!(route = method.route(), error = %e, "Invalid entity identifier");
                Err(InterceptorError::Conversion(e))
            }
            LoadOutcome::ConfigError(e) => {
                tracing::error!(route = method.route(), error = %e, "Entity loading misconfigured");
                Err(InterceptorError::Configuration(e))
            }
        }
    }
}
