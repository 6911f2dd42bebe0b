//! 控制器方法描述
//!
//! 在路由注册时静态声明每个形参的名称、类型以及是否需要按主键加载实体，
//! 取代运行时的注解反射。

use std::any::type_name;

use crate::metadata::EntityType;

/// 形参的种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// 标记为 load 的实体参数
    Load(EntityType),
    /// 普通参数，只记录类型名
    Plain(&'static str),
}

/// 单个形参的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub index: usize,
    pub name: String,
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    pub fn is_load(&self) -> bool {
        matches!(self.kind, ParameterKind::Load(_))
    }

    /// 声明类型名称
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ParameterKind::Load(entity) => entity.name(),
            ParameterKind::Plain(name) => *name,
        }
    }
}

/// 控制器方法描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerMethod {
    route: String,
    parameters: Vec<ParameterDescriptor>,
}

impl ControllerMethod {
    /// # 示例
    ///
    /// ```ignore
    /// let method = ControllerMethod::builder("items#show")
    ///     .load::<Item>("item")
    ///     .param::<String>("format")
    ///     .build();
    /// ```
    pub fn builder(route: impl Into<String>) -> ControllerMethodBuilder {
        ControllerMethodBuilder {
            route: route.into(),
            parameters: Vec::new(),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// 每个形参是否带 load 标记，顺序与声明一致
    pub fn parameter_annotations(&self) -> Vec<bool> {
        self.parameters.iter().map(ParameterDescriptor::is_load).collect()
    }

    pub fn parameter_types(&self) -> Vec<&'static str> {
        self.parameters.iter().map(ParameterDescriptor::type_name).collect()
    }

    /// 是否至少有一个 load 形参
    pub fn contains_load(&self) -> bool {
        self.parameters.iter().any(ParameterDescriptor::is_load)
    }
}

pub struct ControllerMethodBuilder {
    route: String,
    parameters: Vec<ParameterDescriptor>,
}

impl ControllerMethodBuilder {
    /// 追加一个需要按主键加载的实体形参
    pub fn load<T: 'static>(self, name: impl Into<String>) -> Self {
        self.push(name, ParameterKind::Load(EntityType::of::<T>()))
    }

    /// 追加一个普通形参
    pub fn param<T: 'static>(self, name: impl Into<String>) -> Self {
        self.push(name, ParameterKind::Plain(type_name::<T>()))
    }

    fn push(mut self, name: impl Into<String>, kind: ParameterKind) -> Self {
        let index = self.parameters.len();
        self.parameters.push(ParameterDescriptor {
            index,
            name: name.into(),
            kind,
        });
        self
    }

    pub fn build(self) -> ControllerMethod {
        ControllerMethod {
            route: self.route,
            parameters: self.parameters,
        }
    }
}

/// 形参名称解析器
///
/// 返回的名称与形参一一对应、顺序一致
pub trait ParameterNameProvider: Send + Sync {
    fn names_for(&self, method: &ControllerMethod) -> Vec<String>;
}

/// 直接使用描述中声明的名称
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredNameProvider;

impl ParameterNameProvider for DeclaredNameProvider {
    fn names_for(&self, method: &ControllerMethod) -> Vec<String> {
        method.parameters().iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item;

    #[test]
    fn test_builder_assigns_indexes_in_declaration_order() {
        let method = ControllerMethod::builder("items#show")
            .load::<Item>("item")
            .param::<String>("format")
            .build();

        assert_eq!(method.route(), "items#show");
        assert_eq!(method.parameters()[0].index, 0);
        assert_eq!(method.parameters()[1].index, 1);
        assert_eq!(method.parameter_annotations(), vec![true, false]);
        assert_eq!(method.parameter_types()[1], type_name::<String>());
        assert!(method.contains_load());
    }

    #[test]
    fn test_method_without_load_parameters() {
        let method = ControllerMethod::builder("items#index")
            .param::<u32>("page")
            .build();
        assert!(!method.contains_load());

        let empty = ControllerMethod::builder("health").build();
        assert!(!empty.contains_load());
    }

    #[test]
    fn test_declared_names() {
        let method = ControllerMethod::builder("r").load::<Item>("a").param::<u8>("b").build();
        assert_eq!(DeclaredNameProvider.names_for(&method), vec!["a", "b"]);
    }
}
