//! 实体元数据
//!
//! 每个可加载的实体类型在注册表中登记主键属性名及其原生类型

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// 实体类型标识
#[derive(Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// 完整类型路径
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径的类型名，用于日志与错误信息
    pub fn simple_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityType").field(&self.name).finish()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_name())
    }
}

/// 主键的原生类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdType {
    /// i64
    Long,
    /// i32
    Integer,
    /// String
    Text,
    Uuid,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdType::Long => write!(f, "Long"),
            IdType::Integer => write!(f, "Integer"),
            IdType::Text => write!(f, "Text"),
            IdType::Uuid => write!(f, "Uuid"),
        }
    }
}

/// 可作为主键字段的 Rust 类型
pub trait Identifier {
    const ID_TYPE: IdType;
}

impl Identifier for i64 {
    const ID_TYPE: IdType = IdType::Long;
}

impl Identifier for i32 {
    const ID_TYPE: IdType = IdType::Integer;
}

impl Identifier for String {
    const ID_TYPE: IdType = IdType::Text;
}

impl Identifier for Uuid {
    const ID_TYPE: IdType = IdType::Uuid;
}

/// 实体元数据能力接口
pub trait EntityMetadata: Send + Sync {
    fn entity_name(&self) -> &str;

    /// 主键属性名；实体没有主键时返回 None
    fn identifier_property(&self) -> Option<&str>;

    /// 主键的原生类型
    fn identifier_type(&self) -> Option<IdType>;
}

/// 编译期已知的实体元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticEntityMetadata {
    pub name: &'static str,
    pub identifier: Option<(&'static str, IdType)>,
}

impl StaticEntityMetadata {
    pub const fn new(name: &'static str, property: &'static str, id_type: IdType) -> Self {
        Self {
            name,
            identifier: Some((property, id_type)),
        }
    }

    /// 没有主键的实体
    pub const fn without_identifier(name: &'static str) -> Self {
        Self {
            name,
            identifier: None,
        }
    }
}

impl EntityMetadata for StaticEntityMetadata {
    fn entity_name(&self) -> &str {
        self.name
    }

    fn identifier_property(&self) -> Option<&str> {
        self.identifier.map(|(property, _)| property)
    }

    fn identifier_type(&self) -> Option<IdType> {
        self.identifier.map(|(_, id_type)| id_type)
    }
}

/// 可加载的实体
///
/// 通常通过 `#[derive(Entity)]` 实现：
///
/// ```ignore
/// #[derive(Entity)]
/// struct Item {
///     #[id]
///     id: i64,
///     name: String,
/// }
/// ```
pub trait Entity: Any + Send + Sync {
    fn metadata() -> StaticEntityMetadata;
}

/// 实体编译时注册信息
pub struct EntityRegistration {
    pub entity_type: fn() -> EntityType,
    pub metadata: fn() -> StaticEntityMetadata,
}

impl EntityRegistration {
    pub const fn new(entity_type: fn() -> EntityType, metadata: fn() -> StaticEntityMetadata) -> Self {
        Self {
            entity_type,
            metadata,
        }
    }
}

inventory::collect!(EntityRegistration);

/// 实体元数据注册表
#[derive(Default, Clone)]
pub struct MetadataRegistry {
    entries: HashMap<EntityType, Arc<dyn EntityMetadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集所有通过 `#[derive(Entity)]` 提交的实体
    pub fn from_inventory() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<EntityRegistration> {
            let entity_type = (registration.entity_type)();
            registry.register_metadata(entity_type, (registration.metadata)());
        }

        tracing::info!(
            entities = registry.len(),
            "Entity metadata discovery completed"
        );
        registry
    }

    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.register_metadata(EntityType::of::<T>(), T::metadata())
    }

    pub fn register_metadata(
        &mut self,
        entity_type: EntityType,
        metadata: impl EntityMetadata + 'static,
    ) -> &mut Self {
        tracing::debug!(entity = %entity_type, "Registered entity metadata");
        self.entries.insert(entity_type, Arc::new(metadata));
        self
    }

    pub fn metadata_for(&self, entity_type: &EntityType) -> Option<&dyn EntityMetadata> {
        self.entries.get(entity_type).map(|m| m.as_ref())
    }

    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.entries.contains_key(entity_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
