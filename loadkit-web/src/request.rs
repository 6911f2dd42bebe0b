//! 请求上下文
//!
//! 一次请求内的参数、属性、Flash 句柄与处理结果

use axum::{
    body::Body,
    extract::{FromRequest, Query, Request},
    http::{header, Method, StatusCode},
    response::Response,
    Form,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::WebError;
use crate::flash::{FlashScope, NoFlash};

/// 请求内传递的任意值（实体、参数等）
pub type Value = Arc<dyn Any + Send + Sync>;

/// 控制器方法的实参缓冲区，槽位与形参一一对应
pub type Arguments = Vec<Option<Value>>;

/// 请求上下文
///
/// 只在一次请求的处理线程内使用，不跨请求共享
pub struct RequestContext {
    path: String,
    parameters: HashMap<String, String>,
    attributes: HashMap<String, Value>,
    correlation_id: Option<String>,
    flash: Box<dyn FlashScope>,
    result: RequestResult,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            path: String::new(),
            parameters: HashMap::new(),
            attributes: HashMap::new(),
            correlation_id: None,
            flash: Box::new(NoFlash),
            result: RequestResult::default(),
        }
    }

    /// 添加请求参数
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// 请求路径，用于错误响应
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// 设置本次请求使用的 Flash 句柄
    pub fn with_flash(mut self, flash: impl FlashScope + 'static) -> Self {
        self.flash = Box::new(flash);
        self
    }

    /// 从 axum 请求构建上下文
    ///
    /// 合并查询字符串与 `application/x-www-form-urlencoded` 请求体，表单字段覆盖同名查询参数
    pub async fn from_request(request: Request, max_form_bytes: usize) -> Result<Self, WebError> {
        let path = request.uri().path().to_string();
        let mut parameters = Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .map(|Query(query)| query)
            .map_err(|e| WebError::BadRequest(format!("Invalid query string: {}", e)))?;

        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        if is_form && request.method() != Method::GET && request.method() != Method::HEAD {
            let (parts, body) = request.into_parts();
            let bytes = axum::body::to_bytes(body, max_form_bytes)
                .await
                .map_err(|e| WebError::BadRequest(format!("Failed to read form body: {}", e)))?;
            let request = Request::from_parts(parts, Body::from(bytes));

            let Form(form) = Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map_err(|e| WebError::BadRequest(format!("Invalid form data: {}", e)))?;
            parameters.extend(form);
        }

        Ok(Self::new().with_path(path).with_parameters(parameters))
    }

    /// 查找请求参数，不存在时返回 None
    pub fn get_parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// 设置请求作用域属性
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// 获取指定类型的属性；类型不匹配时返回 None
    pub fn attribute<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.attributes
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn flash(&self) -> &dyn FlashScope {
        self.flash.as_ref()
    }

    pub fn result(&self) -> &RequestResult {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut RequestResult {
        &mut self.result
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 请求处理结果
///
/// `not_found` 与控制器响应互斥：一旦标记为未找到，控制器不会再被调用
#[derive(Default)]
pub struct RequestResult {
    status: Option<StatusCode>,
    response: Option<Response>,
}

impl RequestResult {
    /// 以 404 结束当前请求
    pub fn not_found(&mut self) {
        self.status = Some(StatusCode::NOT_FOUND);
        self.response = None;
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(StatusCode::NOT_FOUND)
    }

    /// 记录控制器的响应
    pub fn respond(&mut self, response: Response) {
        self.status = Some(response.status());
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
