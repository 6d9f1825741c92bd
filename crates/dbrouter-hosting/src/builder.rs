use std::{fmt, sync::Arc};

use dbrouter_core::{DbRouterAspect, HashCodeStrategy, ShardStrategy};
use dbrouter_dynamic::{DataSourceSettings, DynamicDataSource, TableRewriter};

use crate::{error::HostError, host::RouterHost, settings::RouterSettings};

/// `RouterHostBuilder` 把配置文件装配成可用的 [`RouterHost`]。
///
/// # 教案级注释
/// - **设计目标 (Why)**
///   - 为应用提供统一的装配入口，避免在各处重复处理配置校验、策略选择与数据源映射；
///   - 默认使用 [`HashCodeStrategy`]，调用方显式注入策略时以注入的为准。
/// - **关键流程 (How)**
///   1. 由 `[router]` 段构造并校验 [`RouterConfig`](dbrouter_core::RouterConfig)；
///   2. 校验 `list` 与 `default` 引用的数据源都有连接参数；
///   3. 组装拦截管线、动态数据源与表名改写器。
/// - **契约说明 (What)**
///   - 任何一步失败都返回 [`HostError`]，不会产出半成品；
///   - 分片库数量与 `db_count` 不一致、或某个分库下标对应的查找键（如 `db02`）没有注册时，
///     只记录 `warn` 日志；多出的库不会被路由命中，缺少的库会在调用期报错。
pub struct RouterHostBuilder {
    settings: RouterSettings,
    strategy: Option<Arc<dyn ShardStrategy>>,
}

impl fmt::Debug for RouterHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHostBuilder")
            .field("settings", &self.settings)
            .field("custom_strategy", &self.strategy.is_some())
            .finish()
    }
}

impl RouterHostBuilder {
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            settings,
            strategy: None,
        }
    }

    /// 替换默认的哈希分片策略。
    pub fn with_strategy(mut self, strategy: impl ShardStrategy) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// 校验配置并构建宿主。
    pub fn build(self) -> Result<RouterHost, HostError> {
        let RouterHostBuilder { settings, strategy } = self;
        let config = settings.router_config()?;
        let datasource = &settings.datasource;

        let target = |id: &str| -> Result<DataSourceSettings, HostError> {
            datasource
                .targets
                .get(id)
                .cloned()
                .ok_or_else(|| HostError::MissingDataSource { id: id.to_owned() })
        };

        let shard_ids = datasource.shard_ids();
        let mut targets = Vec::with_capacity(shard_ids.len());
        for id in shard_ids.iter().copied() {
            targets.push((id.to_owned(), target(id)?));
        }
        let default = datasource.default.as_deref().map(target).transpose()?;

        if shard_ids.len() != config.db_count() as usize {
            tracing::warn!(
                db_count = config.db_count(),
                data_sources = shard_ids.len(),
                "data source count does not match db_count"
            );
        }
        for db_index in 0..config.db_count() {
            let lookup_key = config.naming().data_source_key(db_index);
            if !shard_ids.contains(&lookup_key.as_str()) {
                tracing::warn!(
                    db_index,
                    lookup_key = %lookup_key,
                    "no data source registered for shard database; routed calls to it will fail"
                );
            }
        }
        if default.is_none() {
            tracing::warn!("no default data source configured; unrouted calls will fail");
        }

        let strategy = strategy.unwrap_or_else(|| Arc::new(HashCodeStrategy::new(&config)));
        let naming = config.naming().clone();
        let data_source = DynamicDataSource::new(naming.clone(), targets, default);
        tracing::info!(
            db_count = config.db_count(),
            table_count = config.table_count(),
            routing_key = config.routing_key().unwrap_or(""),
            data_sources = ?data_source.target_keys(),
            "router host assembled"
        );

        Ok(RouterHost::new(
            DbRouterAspect::new(Arc::new(config), strategy),
            Arc::new(data_source),
            TableRewriter::new(naming),
        ))
    }
}
