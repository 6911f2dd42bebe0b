//! 主键转换器
//!
//! 把请求中的原始字符串转换为实体主键的原生类型

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::metadata::{EntityType, IdType};

/// 已转换的主键值
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    Long(i64),
    Integer(i32),
    Text(String),
    Uuid(Uuid),
}

impl EntityId {
    pub fn id_type(&self) -> IdType {
        match self {
            EntityId::Long(_) => IdType::Long,
            EntityId::Integer(_) => IdType::Integer,
            EntityId::Text(_) => IdType::Text,
            EntityId::Uuid(_) => IdType::Uuid,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Long(v) => write!(f, "{}", v),
            EntityId::Integer(v) => write!(f, "{}", v),
            EntityId::Text(v) => f.write_str(v),
            EntityId::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Long(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        EntityId::Integer(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Text(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Text(value.to_string())
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        EntityId::Uuid(value)
    }
}

/// 原始值无法转换为主键类型
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot convert '{raw}' to {target} for {entity}: {reason}")]
pub struct ConversionError {
    pub raw: String,
    pub target: IdType,
    pub entity: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(raw: &str, target: IdType, reason: impl fmt::Display) -> Self {
        Self {
            raw: raw.to_string(),
            target,
            entity: String::new(),
            reason: reason.to_string(),
        }
    }

    fn for_entity(mut self, entity: &EntityType) -> Self {
        self.entity = entity.simple_name().to_string();
        self
    }
}

/// 类型化的转换器
pub trait Converter: Send + Sync {
    type Output: Into<EntityId>;

    fn parse(&self, raw: &str) -> Result<Self::Output, ConversionError>;
}

/// 注册表中保存的类型擦除转换器
pub trait IdConverter: Send + Sync {
    fn convert(&self, raw: &str, entity: &EntityType) -> Result<EntityId, ConversionError>;
}

impl<C: Converter> IdConverter for C {
    fn convert(&self, raw: &str, entity: &EntityType) -> Result<EntityId, ConversionError> {
        self.parse(raw)
            .map(Into::into)
            .map_err(|e| e.for_entity(entity))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LongConverter;

impl Converter for LongConverter {
    type Output = i64;

    fn parse(&self, raw: &str) -> Result<i64, ConversionError> {
        raw.trim()
            .parse()
            .map_err(|e| ConversionError::new(raw, IdType::Long, e))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    type Output = i32;

    fn parse(&self, raw: &str) -> Result<i32, ConversionError> {
        raw.trim()
            .parse()
            .map_err(|e| ConversionError::new(raw, IdType::Integer, e))
    }
}

/// 原样保留字符串
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    type Output = String;

    fn parse(&self, raw: &str) -> Result<String, ConversionError> {
        Ok(raw.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidConverter;

impl Converter for UuidConverter {
    type Output = Uuid;

    fn parse(&self, raw: &str) -> Result<Uuid, ConversionError> {
        Uuid::parse_str(raw.trim()).map_err(|e| ConversionError::new(raw, IdType::Uuid, e))
    }
}

/// 按主键原生类型索引的转换器注册表
#[derive(Default, Clone)]
pub struct ConverterRegistry {
    converters: HashMap<IdType, Arc<dyn IdConverter>>,
}

impl ConverterRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置 Long / Integer / Text / Uuid 转换器
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(IdType::Long, LongConverter)
            .register(IdType::Integer, IntegerConverter)
            .register(IdType::Text, StringConverter)
            .register(IdType::Uuid, UuidConverter);
        registry
    }

    pub fn register(&mut self, id_type: IdType, converter: impl IdConverter + 'static) -> &mut Self {
        self.converters.insert(id_type, Arc::new(converter));
        self
    }

    pub fn remove(&mut self, id_type: IdType) -> &mut Self {
        self.converters.remove(&id_type);
        self
    }

    pub fn converter_for(&self, id_type: IdType) -> Option<&dyn IdConverter> {
        self.converters.get(&id_type).map(|c| c.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticket;

    #[test]
    fn test_default_converters() {
        let registry = ConverterRegistry::with_defaults();
        let entity = EntityType::of::<Ticket>();

        let long = registry.converter_for(IdType::Long).unwrap();
        assert_eq!(long.convert("123", &entity).unwrap(), EntityId::Long(123));

        let text = registry.converter_for(IdType::Text).unwrap();
        assert_eq!(text.convert("123", &entity).unwrap(), EntityId::Text("123".into()));

        let uuid = Uuid::new_v4();
        let converted = registry
            .converter_for(IdType::Uuid)
            .unwrap()
            .convert(&uuid.to_string(), &entity)
            .unwrap();
        assert_eq!(converted, EntityId::Uuid(uuid));
    }

    #[test]
    fn test_conversion_failure_names_entity() {
        let registry = ConverterRegistry::with_defaults();
        let err = registry
            .converter_for(IdType::Integer)
            .unwrap()
            .convert("abc", &EntityType::of::<Ticket>())
            .unwrap_err();

        assert_eq!(err.raw, "abc");
        assert_eq!(err.target, IdType::Integer);
        assert_eq!(err.entity, "Ticket");
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.remove(IdType::Long);
        assert!(registry.converter_for(IdType::Long).is_none());
        assert!(ConverterRegistry::new().converter_for(IdType::Text).is_none());
    }
}
