//! # Loadkit Web
//!
//! 在控制器执行前按主键加载实体，基于 Axum 构建
//!
//! ## 核心特性
//!
//! - **参数加载** - 形参 `item` 的主键从请求参数 `item.<主键属性名>` 读取
//! - **编译时注册** - `#[derive(Entity)]` 声明实体及其主键
//! - **拦截器栈** - 按优先级执行，任意拦截器都可以提前结束请求
//! - **Flash 参数** - 在请求之间携带控制器实参

// 让派生宏生成的 `::loadkit_web::...` 路径在本 crate 内也能解析
extern crate self as loadkit_web;

pub mod converter;
pub mod dispatch;
pub mod error;
pub mod flash;
pub mod interceptor;
pub mod loader;
pub mod metadata;
pub mod method;
pub mod middleware;
pub mod parameter_loader;
pub mod persistence;
pub mod properties;
pub mod request;
pub mod server;

pub use loadkit_macros::Entity;

#[doc(hidden)]
pub use inventory;

pub mod prelude {
    //! 预导入模块

    pub use crate::converter::{Converter, ConverterRegistry, EntityId};
    pub use crate::dispatch::{Dispatcher, Invocation, Route};
    pub use crate::error::{ConfigurationError, InterceptorError, InterceptorResult, WebError};
    pub use crate::flash::{FlashScope, FlashStore};
    pub use crate::interceptor::{ControllerInterceptor, InterceptorStack};
    pub use crate::loader::{EntityLoader, LoadOutcome};
    pub use crate::metadata::{Entity, EntityType, IdType, MetadataRegistry};
    pub use crate::method::ControllerMethod;
    pub use crate::middleware::{request_id, request_logging};
    pub use crate::parameter_loader::ParameterLoaderInterceptor;
    pub use crate::persistence::{EntityStore, InMemoryEntityStore};
    pub use crate::request::{RequestContext, Value};
    pub use crate::server::{serve, ServerProperties};

    pub use loadkit_macros::Entity;

    pub use axum;
    pub use axum::response::{IntoResponse, Response};
    pub use axum::http::StatusCode;
    pub use axum::Router;
}
