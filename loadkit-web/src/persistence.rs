//! 实体存储
//!
//! 按 (实体类型, 主键) 读取实体。加载器只读不写。

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::converter::EntityId;
use crate::metadata::EntityType;
use crate::request::Value;

/// 存储本身出错（与"实体不存在"不同）
#[derive(Debug, Error)]
#[error("Failed to load {entity} with id {id}: {message}")]
pub struct PersistenceError {
    pub entity: String,
    pub id: String,
    pub message: String,
}

impl PersistenceError {
    pub fn new(entity: &EntityType, id: &EntityId, message: impl Into<String>) -> Self {
        Self {
            entity: entity.simple_name().to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// 实体存储
pub trait EntityStore: Send + Sync {
    /// 按主键读取实体，不存在时返回 `Ok(None)`
    fn get(&self, entity: &EntityType, id: &EntityId) -> Result<Option<Value>, PersistenceError>;
}

/// 内存实体存储
#[derive(Default)]
pub struct InMemoryEntityStore {
    entities: RwLock<HashMap<(EntityType, EntityId), Value>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存实体，返回被替换的旧值
    pub fn insert<T: Any + Send + Sync>(&self, id: impl Into<EntityId>, entity: T) -> Option<Value> {
        self.insert_shared(id, Arc::new(entity))
    }

    pub fn insert_shared<T: Any + Send + Sync>(&self, id: impl Into<EntityId>, entity: Arc<T>) -> Option<Value> {
        self.entities
            .write()
            .insert((EntityType::of::<T>(), id.into()), entity)
    }

    pub fn remove<T: Any + Send + Sync>(&self, id: impl Into<EntityId>) -> Option<Value> {
        self.entities.write().remove(&(EntityType::of::<T>(), id.into()))
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, entity: &EntityType, id: &EntityId) -> Result<Option<Value>, PersistenceError> {
        Ok(self.entities.read().get(&(*entity, id.clone())).cloned())
    }
}
