// ==========================================
// 表格导入系统 - 配置查找 Trait
// ==========================================
// 职责: 上传流程只需按配置 ID 取回三级名称，不依赖完整仓储
// 实现者: ReferenceRepository
// ==========================================

use crate::domain::reference::ConfigurationHierarchy;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait ConfigurationLookup: Send + Sync {
    /// 按配置 ID 查询行业/产品/子类型名称
    ///
    /// # 返回
    /// - Ok(Some): 配置存在且未删除
    /// - Ok(None): 配置不存在或已删除
    async fn find_hierarchy(
        &self,
        configuration_id: Uuid,
    ) -> RepositoryResult<Option<ConfigurationHierarchy>>;
}

#[async_trait]
impl<T: ConfigurationLookup + ?Sized> ConfigurationLookup for Arc<T> {
    async fn find_hierarchy(
        &self,
        configuration_id: Uuid,
    ) -> RepositoryResult<Option<ConfigurationHierarchy>> {
        (**self).find_hierarchy(configuration_id).await
    }
}
