//! 实体加载
//!
//! 对每个带 load 标记的形参：
//! 1. 从实体元数据取得主键属性名
//! 2. 以 `"<形参名>.<主键属性名>"` 查找请求参数
//! 3. 把原始字符串转换为主键的原生类型
//! 4. 按主键读取实体
//!
//! 所有形参都加载成功后才会进行绑定，任何一个缺失都以 404 结束请求。

use std::sync::Arc;

use crate::converter::{ConversionError, ConverterRegistry, EntityId, IdConverter};
use crate::error::ConfigurationError;
use crate::metadata::{EntityType, MetadataRegistry};
use crate::method::{ControllerMethod, DeclaredNameProvider, ParameterKind, ParameterNameProvider};
use crate::persistence::{EntityStore, PersistenceError};
use crate::request::{Arguments, RequestContext, Value};

/// 一个需要加载的形参
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub index: usize,
    pub name: String,
    pub entity: EntityType,
}

/// 未找到的原因，只用于日志；对控制器而言两者没有区别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// 请求中没有 `"<name>.<id>"` 参数
    MissingParameter { key: String },
    /// 存储中没有该主键对应的实体
    MissingEntity { id: EntityId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub parameter: String,
    pub entity: EntityType,
    pub reason: NotFoundReason,
}

/// 一个已加载的实体及其目标形参
#[derive(Clone)]
pub struct BoundEntity {
    pub index: usize,
    pub name: String,
    pub entity: Value,
}

/// 全部加载成功的实体，按形参声明顺序排列
#[derive(Clone, Default)]
pub struct BoundEntities(Vec<BoundEntity>);

impl BoundEntities {
    pub fn iter(&self) -> impl Iterator<Item = &BoundEntity> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 绑定到实参缓冲区（存在时）或请求属性
    ///
    /// 有 Flash 实参时只写入对应槽位，不设置任何请求属性
    pub fn bind(self, ctx: &mut RequestContext, args: Option<&mut Arguments>) {
        match args {
            Some(args) => {
                for bound in self.0 {
                    if args.len() <= bound.index {
                        args.resize(bound.index + 1, None);
                    }
                    args[bound.index] = Some(bound.entity);
                }
            }
            None => {
                for bound in self.0 {
                    ctx.set_attribute(bound.name, bound.entity);
                }
            }
        }
    }
}

/// 一次加载的结果
pub enum LoadOutcome {
    /// 全部加载成功，继续执行后续拦截器与控制器
    Proceed(BoundEntities),
    /// 请求参数或实体不存在
    NotFound(NotFound),
    /// 请求参数无法转换为主键类型
    BadRequest(ConversionError),
    /// 实体声明有误
    ConfigError(ConfigurationError),
}

enum Fetched {
    Loaded(Value),
    Missing(NotFoundReason),
}

enum LoadFailure {
    Configuration(ConfigurationError),
    Conversion(ConversionError),
    Persistence(PersistenceError),
}

impl From<ConfigurationError> for LoadFailure {
    fn from(error: ConfigurationError) -> Self {
        LoadFailure::Configuration(error)
    }
}

impl From<ConversionError> for LoadFailure {
    fn from(error: ConversionError) -> Self {
        LoadFailure::Conversion(error)
    }
}

impl From<PersistenceError> for LoadFailure {
    fn from(error: PersistenceError) -> Self {
        LoadFailure::Persistence(error)
    }
}

/// 实体加载器
///
/// 无状态，可在并发请求间共享
#[derive(Clone)]
pub struct EntityLoader {
    metadata: Arc<MetadataRegistry>,
    converters: Arc<ConverterRegistry>,
    store: Arc<dyn EntityStore>,
    names: Arc<dyn ParameterNameProvider>,
}

impl EntityLoader {
    pub fn new(
        metadata: Arc<MetadataRegistry>,
        converters: Arc<ConverterRegistry>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            metadata,
            converters,
            store,
            names: Arc::new(DeclaredNameProvider),
        }
    }

    pub fn with_name_provider(mut self, names: Arc<dyn ParameterNameProvider>) -> Self {
        self.names = names;
        self
    }

    /// 加载方法的全部 load 形参
    ///
    /// 存储故障以 `Err` 返回；其余情况都体现在 `LoadOutcome` 中
    pub fn resolve(&self, method: &ControllerMethod, ctx: &RequestContext) -> Result<LoadOutcome, PersistenceError> {
        let targets = match self.load_targets(method) {
            Ok(targets) => targets,
            Err(e) => return Ok(LoadOutcome::ConfigError(e)),
        };

        let mut bound = Vec::with_capacity(targets.len());
        for target in targets {
            match self.fetch(&target, ctx) {
                Ok(Fetched::Loaded(entity)) => {
                    tracing::debug!(
                        route = method.route(),
                        parameter = %target.name,
                        entity = %target.entity,
                        "Loaded entity for parameter"
                    );
                    bound.push(BoundEntity {
                        index: target.index,
                        name: target.name,
                        entity,
                    });
                }
                Ok(Fetched::Missing(reason)) => {
                    return Ok(LoadOutcome::NotFound(NotFound {
                        parameter: target.name,
                        entity: target.entity,
                        reason,
                    }));
                }
                Err(LoadFailure::Configuration(e)) => return Ok(LoadOutcome::ConfigError(e)),
                Err(LoadFailure::Conversion(e)) => return Ok(LoadOutcome::BadRequest(e)),
                Err(LoadFailure::Persistence(e)) => return Err(e),
            }
        }

        Ok(LoadOutcome::Proceed(BoundEntities(bound)))
    }

    /// 挑出带 load 标记的形参，名称来自名称解析器
    pub fn load_targets(&self, method: &ControllerMethod) -> Result<Vec<LoadTarget>, ConfigurationError> {
        let names = self.names.names_for(method);
        if names.len() != method.parameters().len() {
            return Err(ConfigurationError::MismatchedParameterNames {
                route: method.route().to_string(),
                expected: method.parameters().len(),
                found: names.len(),
            });
        }

        Ok(method
            .parameters()
            .iter()
            .zip(names)
            .filter_map(|(parameter, name)| match parameter.kind {
                ParameterKind::Load(entity) => Some(LoadTarget {
                    index: parameter.index,
                    name,
                    entity,
                }),
                ParameterKind::Plain(_) => None,
            })
            .collect())
    }

    /// 实体的主键属性名
    pub fn identifier_property(&self, entity: &EntityType) -> Result<&str, ConfigurationError> {
        let metadata = self
            .metadata
            .metadata_for(entity)
            .ok_or_else(|| ConfigurationError::UnknownEntity {
                entity: entity.simple_name().to_string(),
            })?;

        metadata
            .identifier_property()
            .ok_or_else(|| ConfigurationError::MissingIdentifier {
                entity: entity.simple_name().to_string(),
            })
    }

    /// 实体主键类型对应的转换器
    pub fn identifier_converter(&self, entity: &EntityType) -> Result<&dyn IdConverter, ConfigurationError> {
        let id_type = self
            .metadata
            .metadata_for(entity)
            .and_then(|metadata| metadata.identifier_type())
            .ok_or_else(|| ConfigurationError::MissingIdentifier {
                entity: entity.simple_name().to_string(),
            })?;

        self.converters
            .converter_for(id_type)
            .ok_or_else(|| ConfigurationError::MissingConverter {
                entity: entity.simple_name().to_string(),
                id_type,
            })
    }

    /// 主键属性必须先于请求参数检查；转换器只在参数存在时才需要
    fn fetch(&self, target: &LoadTarget, ctx: &RequestContext) -> Result<Fetched, LoadFailure> {
        let property = self.identifier_property(&target.entity)?;
        let key = format!("{}.{}", target.name, property);

        let Some(raw) = ctx.get_parameter(&key) else {
            return Ok(Fetched::Missing(NotFoundReason::MissingParameter { key }));
        };

        let converter = self.identifier_converter(&target.entity)?;
        let id = converter.convert(raw, &target.entity)?;

        Ok(match self.store.get(&target.entity, &id)? {
            Some(entity) => Fetched::Loaded(entity),
            None => Fetched::Missing(NotFoundReason::MissingEntity { id }),
        })
    }
}
