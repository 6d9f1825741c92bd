use std::{borrow::Cow, path::Path, sync::Arc};

use dbrouter_core::{DbRouterAspect, RouterConfig};
use dbrouter_dynamic::{
    ConnectionDescriptor, ConnectionProvider, DataSourceSettings, DbRouterStrategy,
    DynamicDataSource, ResolveError, TableRewriter,
};

use crate::{builder::RouterHostBuilder, error::HostError, settings::RouterSettings};

/// 装配完成的路由组件集合。
///
/// # 教案级注释
/// - **设计目的 (Why)**：拦截管线、动态数据源与表名改写器共享同一份配置与命名模板，
///   集中保存在一个结构体里，数据访问层只需持有这一个入口。
/// - **关键要素 (How)**
///   - `aspect`：包裹数据访问调用，计算并发布分片坐标；
///   - `data_source`：读取坐标选择物理库，以 `Arc` 共享，便于运行期调用 [`DynamicDataSource::update`]；
///   - `rewriter`：读取坐标改写表名。
/// - **契约说明 (What)**：克隆开销为几次引用计数递增，各克隆共享同一组目标库。
#[derive(Clone, Debug)]
pub struct RouterHost {
    aspect: DbRouterAspect,
    data_source: Arc<DynamicDataSource<DataSourceSettings>>,
    rewriter: TableRewriter,
}

impl RouterHost {
    pub(crate) fn new(
        aspect: DbRouterAspect,
        data_source: Arc<DynamicDataSource<DataSourceSettings>>,
        rewriter: TableRewriter,
    ) -> Self {
        Self {
            aspect,
            data_source,
            rewriter,
        }
    }

    /// 以默认哈希策略装配。
    pub fn from_settings(settings: RouterSettings) -> Result<Self, HostError> {
        RouterHostBuilder::new(settings).build()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, HostError> {
        Self::from_settings(RouterSettings::from_toml_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HostError> {
        Self::from_settings(RouterSettings::from_path(path)?)
    }

    pub fn builder(settings: RouterSettings) -> RouterHostBuilder {
        RouterHostBuilder::new(settings)
    }

    pub fn aspect(&self) -> &DbRouterAspect {
        &self.aspect
    }

    pub fn config(&self) -> &RouterConfig {
        self.aspect.config()
    }

    pub fn data_source(&self) -> &Arc<DynamicDataSource<DataSourceSettings>> {
        &self.data_source
    }

    pub fn rewriter(&self) -> &TableRewriter {
        &self.rewriter
    }

    /// 按当前执行单元的坐标选择连接，未路由时回落到默认库。
    pub fn select_connection(&self) -> Result<ConnectionDescriptor, ResolveError> {
        self.data_source.select_connection()
    }

    /// 按声明改写 SQL 表名，见 [`TableRewriter::rewrite`]。
    pub fn rewrite<'a>(
        &self,
        sql: &'a str,
        strategy: DbRouterStrategy,
    ) -> Result<Cow<'a, str>, ResolveError> {
        self.rewriter.rewrite(sql, strategy)
    }
}
