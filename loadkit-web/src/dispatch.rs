//! 请求分发
//!
//! `Dispatcher` 保存路由表与拦截器注册表，为每个请求运行拦截器栈，
//! 并通过 `handler` 适配为 axum 的路由处理函数。

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use loadkit_core::Environment;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{InterceptorResult, WebError};
use crate::flash::FlashStore;
use crate::interceptor::{
    ControllerAction, ControllerInterceptor, InterceptorRegistry, InterceptorStack, SimpleInterceptorStack,
};
use crate::loader::EntityLoader;
use crate::method::ControllerMethod;
use crate::parameter_loader::ParameterLoaderInterceptor;
use crate::properties::LoadProperties;
use crate::request::{Arguments, RequestContext};

/// 携带 Flash 关联 ID 的请求头
pub const FLASH_KEY_HEADER: &str = "x-flash-key";

/// 一次控制器调用
pub struct Invocation<'a> {
    pub method: &'a ControllerMethod,
    pub instance: &'a dyn Any,
    pub request: &'a RequestContext,
    /// 从 Flash 取出的实参（如有）
    pub arguments: Option<Arguments>,
}

impl Invocation<'_> {
    /// 按形参名取实体：优先取实参槽位，其次取请求属性
    pub fn entity<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let from_arguments = self.arguments.as_ref().and_then(|args| {
            let index = self.method.parameters().iter().position(|p| p.name == name)?;
            args.get(index)?.clone()?.downcast::<T>().ok()
        });

        from_arguments.or_else(|| self.request.attribute::<T>(name))
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.request.get_parameter(key)
    }

    /// 控制器实例
    pub fn controller<C: Any>(&self) -> Option<&C> {
        self.instance.downcast_ref::<C>()
    }
}

pub type Handler = Arc<dyn Fn(Invocation<'_>) -> Response + Send + Sync>;

/// 路由：控制器方法描述 + 控制器实例 + 处理函数
pub struct Route {
    method: ControllerMethod,
    instance: Arc<dyn Any + Send + Sync>,
    handler: Handler,
}

impl Route {
    pub fn new<C, F>(method: ControllerMethod, instance: C, handler: F) -> Self
    where
        C: Any + Send + Sync,
        F: Fn(Invocation<'_>) -> Response + Send + Sync + 'static,
    {
        Self {
            method,
            instance: Arc::new(instance),
            handler: Arc::new(handler),
        }
    }

    pub fn method(&self) -> &ControllerMethod {
        &self.method
    }
}

impl ControllerAction for Route {
    fn execute(&self, method: &ControllerMethod, instance: &dyn Any, ctx: &mut RequestContext) -> InterceptorResult<()> {
        let arguments = ctx.flash().consume_parameters(method);
        let response = (self.handler)(Invocation {
            method,
            instance,
            request: ctx,
            arguments,
        });
        ctx.result_mut().respond(response);
        Ok(())
    }
}

/// 请求分发器
pub struct Dispatcher {
    registry: InterceptorRegistry,
    routes: HashMap<String, Route>,
    flash: Option<Arc<FlashStore>>,
    max_form_bytes: usize,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            registry: InterceptorRegistry::new(),
            routes: HashMap::new(),
            flash: None,
            max_form_bytes: LoadProperties::default().max_form_bytes,
        }
    }

    /// 按配置组装：`loadkit.load.enabled` 为 false 时不注册参数加载拦截器
    pub fn from_environment(env: &Environment, loader: EntityLoader) -> Self {
        let props = LoadProperties::from_environment(env);
        let mut dispatcher = Self::new().with_flash_store(Arc::new(FlashStore::from_environment(env)));
        dispatcher.max_form_bytes = props.max_form_bytes;

        if props.enabled {
            dispatcher
                .registry
                .register(ParameterLoaderInterceptor::from_environment(env, loader));
        } else {
            tracing::info!("Entity parameter loading disabled");
        }

        dispatcher
    }

    pub fn with_interceptor<I: ControllerInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.registry.register(interceptor);
        self
    }

    pub fn with_flash_store(mut self, store: Arc<FlashStore>) -> Self {
        self.flash = Some(store);
        self
    }

    pub fn with_max_form_bytes(mut self, max_form_bytes: usize) -> Self {
        self.max_form_bytes = max_form_bytes;
        self
    }

    /// 注册路由，以方法描述中的路由名为键
    pub fn route(mut self, route: Route) -> Self {
        let key = route.method.route().to_string();
        tracing::debug!(route = %key, "Registered route");
        self.routes.insert(key, route);
        self
    }

    pub fn interceptors(&self) -> &InterceptorRegistry {
        &self.registry
    }

    pub fn flash_store(&self) -> Option<&Arc<FlashStore>> {
        self.flash.as_ref()
    }

    /// 运行拦截器栈与控制器，返回最终响应
    pub fn dispatch(&self, route: &str, ctx: &mut RequestContext) -> Response {
        let Some(target) = self.routes.get(route) else {
            tracing::warn!(route = %route, "No route registered");
            return WebError::NotFound.into_response_at(ctx.path());
        };

        let mut stack = SimpleInterceptorStack::new(&self.registry, target);
        if let Err(e) = stack.next(&target.method, target.instance.as_ref(), ctx) {
            let error = WebError::from(e);
            tracing::debug!(route = %route, status = %error.status_code(), "Dispatch failed");
            return error.into_response_at(ctx.path());
        }

        if ctx.result().is_not_found() {
            return WebError::NotFound.into_response_at(ctx.path());
        }

        ctx.result_mut()
            .take_response()
            .unwrap_or_else(|| StatusCode::NO_CONTENT.into_response())
    }

    /// 从 axum 请求构建上下文并分发
    pub async fn handle(&self, route: &str, request: Request) -> Response {
        let path = request.uri().path().to_string();
        let correlation_id = request
            .headers()
            .get(FLASH_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut ctx = match RequestContext::from_request(request, self.max_form_bytes).await {
            Ok(ctx) => ctx,
            Err(e) => return e.into_response_at(&path),
        };

        if let (Some(store), Some(id)) = (&self.flash, correlation_id) {
            ctx = ctx.with_correlation_id(id.clone()).with_flash(store.scope(id));
        }

        self.dispatch(route, &mut ctx)
    }

    /// 生成 axum 路由处理函数（接受任意 HTTP 方法）
    pub fn handler(self: &Arc<Self>, route: impl Into<String>) -> MethodRouter {
        let dispatcher = Arc::clone(self);
        let route = route.into();

        axum::routing::any(move |request: Request| {
            let dispatcher = Arc::clone(&dispatcher);
            let route = route.clone();
            async move { dispatcher.handle(&route, request).await }
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterRegistry;
    use crate::flash::FlashKey;
    use crate::metadata::{EntityType, IdType, MetadataRegistry, StaticEntityMetadata};
    use crate::persistence::InMemoryEntityStore;
    use crate::request::Value;
    use loadkit_core::{constants::LOAD_ENABLED, ConfigValue, MapPropertySource};

    #[derive(Debug, PartialEq)]
    struct Item {
        id: i64,
        title: String,
    }

    struct ItemController {
        prefix: &'static str,
    }

    fn loader() -> EntityLoader {
        let mut metadata = MetadataRegistry::new();
        metadata.register_metadata(
            EntityType::of::<Item>(),
            StaticEntityMetadata::new("Item", "id", IdType::Long),
        );
        let store = InMemoryEntityStore::new();
        store.insert(
            7_i64,
            Item {
                id: 7,
                title: "Lamp".into(),
            },
        );
        EntityLoader::new(
            Arc::new(metadata),
            Arc::new(ConverterRegistry::with_defaults()),
            Arc::new(store),
        )
    }

    fn show_route() -> Route {
        Route::new(
            ControllerMethod::builder("items#show").load::<Item>("item").build(),
            ItemController { prefix: "item" },
            |inv| match (inv.entity::<Item>("item"), inv.controller::<ItemController>()) {
                (Some(item), Some(controller)) => format!("{}:{}", controller.prefix, item.title).into_response(),
                _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            },
        )
    }

    fn dispatcher(env: &Environment) -> Dispatcher {
        Dispatcher::from_environment(env, loader()).route(show_route())
    }

    #[test]
    fn test_dispatch_runs_handler_with_loaded_entity() {
        let dispatcher = dispatcher(&Environment::new());
        let mut ctx = RequestContext::new().with_parameter("item.id", "7");

        let response = dispatcher.dispatch("items#show", &mut ctx);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.has_attribute("item"));
    }

    #[test]
    fn test_dispatch_missing_entity_is_404() {
        let dispatcher = dispatcher(&Environment::new());
        let mut ctx = RequestContext::new().with_parameter("item.id", "8");

        assert_eq!(dispatcher.dispatch("items#show", &mut ctx).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body_reports_request_path() {
        let dispatcher = dispatcher(&Environment::new());
        let mut ctx = RequestContext::new()
            .with_path("/items")
            .with_parameter("item.id", "8");

        let response = dispatcher.dispatch("items#show", &mut ctx);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["path"], "/items");
        assert_eq!(body["status"], 404);
    }

    #[test]
    fn test_dispatch_unknown_route_is_404() {
        let dispatcher = dispatcher(&Environment::new());
        let mut ctx = RequestContext::new();

        assert_eq!(dispatcher.dispatch("nope", &mut ctx).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_disabled_loading_skips_interceptor() {
        let env = Environment::new().with_property_source(
            MapPropertySource::new("test").with_property(LOAD_ENABLED, ConfigValue::Bool(false)),
        );
        let dispatcher = dispatcher(&env);
        assert!(dispatcher.interceptors().is_empty());

        // 没有加载拦截器时处理函数拿不到实体
        let mut ctx = RequestContext::new().with_parameter("item.id", "7");
        let response = dispatcher.dispatch("items#show", &mut ctx);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_handler_receives_flash_arguments() {
        let dispatcher = dispatcher(&Environment::new());
        let store = Arc::clone(dispatcher.flash_store().unwrap());
        store.put(
            FlashKey {
                route: "items#show".into(),
                correlation_id: "k1".into(),
            },
            vec![None],
        );

        let mut ctx = RequestContext::new()
            .with_parameter("item.id", "7")
            .with_flash(store.scope("k1"));
        let response = dispatcher.dispatch("items#show", &mut ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!ctx.has_attribute("item"));
    }

    /// 不调用 next 也不设置结果的拦截器
    struct Halt;

    impl ControllerInterceptor for Halt {
        fn name(&self) -> &str {
            "Halt"
        }

        fn accepts(&self, _method: &ControllerMethod) -> bool {
            true
        }

        fn intercept(
            &self,
            _stack: &mut dyn InterceptorStack,
            _method: &ControllerMethod,
            _instance: &dyn Any,
            _ctx: &mut RequestContext,
        ) -> InterceptorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_halted_request_without_response_is_no_content() {
        let dispatcher = Dispatcher::new().with_interceptor(Halt).route(show_route());
        let mut ctx = RequestContext::new().with_parameter("item.id", "7");

        assert_eq!(dispatcher.dispatch("items#show", &mut ctx).status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_invocation_prefers_argument_slots() {
        let method = ControllerMethod::builder("r").load::<Item>("item").build();
        let mut request = RequestContext::new();
        let from_attribute: Value = Arc::new(Item {
            id: 1,
            title: "attr".into(),
        });
        request.set_attribute("item", from_attribute);
        let from_slot: Value = Arc::new(Item {
            id: 2,
            title: "slot".into(),
        });

        let invocation = Invocation {
            method: &method,
            instance: &(),
            request: &request,
            arguments: Some(vec![Some(from_slot)]),
        };
        assert_eq!(invocation.entity::<Item>("item").map(|i| i.id), Some(2));

        let invocation = Invocation {
            method: &method,
            instance: &(),
            request: &request,
            arguments: None,
        };
        assert_eq!(invocation.entity::<Item>("item").map(|i| i.id), Some(1));
    }
}
