//! 分库分表拦截管线。
//!
//! # 教案式说明
//! - **意图（Why）**：调用方不写任何分片感知代码，只需在调用点用 [`DbRouterAspect::around`]
//!   显式包裹数据访问操作；管线负责“提取路由键 → 计算坐标 → 发布上下文 → 执行 → 释放上下文”。
//! - **结构（How）**：[`DbRouter`] 是每次调用的路由声明（可选覆盖路由字段名）；
//!   [`DbRouterAspect`] 持有不可变配置与可替换的 [`ShardStrategy`]，自身无可变状态，可在线程间共享。
//! - **契约（What）**：
//!   1. 路由字段名优先取声明中的覆盖值，否则取全局默认值，两者皆空返回 [`RouterError::Configuration`]；
//!   2. 提取失败且未配置兜底键时返回 [`RouterError::MissingRoutingKey`]，包裹的操作不会被执行；
//!   3. 操作恰好执行一次，其错误原样返回，绝不被吞掉或转为成功；
//!   4. 无论操作成功、失败、panic 还是（异步时）被取消，上下文都会按重入策略释放。

use std::{future::Future, sync::Arc};

use crate::{
    config::RouterConfig,
    context,
    error::RouterError,
    extract::{CallArg, RoutingKey, extract},
    strategy::{HashCodeStrategy, ShardCoordinate, ShardStrategy},
};

/// 调用点的路由声明。
///
/// `DbRouter::default()` 表示沿用全局路由字段；`DbRouter::key("uId")` 覆盖本次调用的字段名。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DbRouter {
    key: Option<String>,
}

impl DbRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定字段名覆盖全局路由字段，空白字符串等同于不覆盖。
    pub fn key(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = if name.trim().is_empty() {
            None
        } else {
            Some(name.trim().to_owned())
        };
        Self { key }
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// 路由拦截器。
///
/// # 教案式说明
/// - **意图 (Why)**：以显式包裹代替隐式织入，调用点一眼可见哪些操作参与分片。
/// - **契约 (What)**：
///   - `config`：进程级只读配置；
///   - `strategy`：纯函数式分片策略，默认 [`HashCodeStrategy`]；
///   - 结构体 `Clone` 代价为两次 `Arc` 计数递增。
#[derive(Clone)]
pub struct DbRouterAspect {
    config: Arc<RouterConfig>,
    strategy: Arc<dyn ShardStrategy>,
}

impl std::fmt::Debug for DbRouterAspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbRouterAspect")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DbRouterAspect {
    pub fn new(config: Arc<RouterConfig>, strategy: Arc<dyn ShardStrategy>) -> Self {
        Self { config, strategy }
    }

    /// 使用默认哈希策略构造。
    pub fn with_hash_strategy(config: RouterConfig) -> Self {
        let strategy = Arc::new(HashCodeStrategy::new(&config));
        Self::new(Arc::new(config), strategy)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// 解析本次调用生效的路由字段名。
    pub fn resolve_key_name<'a>(
        &'a self,
        declaration: &'a DbRouter,
    ) -> Result<&'a str, RouterError> {
        declaration
            .routing_key()
            .or_else(|| self.config.routing_key())
            .ok_or_else(|| {
                RouterError::configuration(
                    "routing key is declared neither on the call nor in the router configuration",
                )
            })
    }

    /// 执行步骤 1~3：解析字段名、提取路由键、计算分片坐标，不触碰上下文。
    pub fn route(
        &self,
        declaration: &DbRouter,
        args: &[CallArg<'_>],
    ) -> Result<ShardCoordinate, RouterError> {
        let outcome = self.resolve_key_name(declaration).and_then(|key_name| {
            let key = self.extract_or_fallback(key_name, args)?;
            let coordinate = self.strategy.compute(key.as_str())?;
            tracing::debug!(
                routing_key = key_name,
                key_value = %key,
                db_index = coordinate.db_index,
                table_index = coordinate.table_index,
                "shard coordinate computed"
            );
            Ok(coordinate)
        });
        if let Err(err) = &outcome {
            tracing::error!(code = err.code(), error = %err, "failed to route call");
        }
        outcome
    }

    fn extract_or_fallback(
        &self,
        key_name: &str,
        args: &[CallArg<'_>],
    ) -> Result<RoutingKey, RouterError> {
        extract(key_name, args).or_else(|err| {
            match self.config.fallback_key().and_then(RoutingKey::new) {
                Some(fallback) => {
                    tracing::debug!(
                        routing_key = key_name,
                        fallback = %fallback,
                        "using fallback routing key"
                    );
                    Ok(fallback)
                }
                None => Err(err),
            }
        })
    }

    /// 同步包裹：在 `proceed` 执行期间发布分片坐标。
    ///
    /// # 教案式说明
    /// - **前置条件**：`E: From<RouterError>`，路由失败会转换为调用方的错误类型返回，`proceed` 不会执行；
    /// - **执行步骤**：路由 → 发布（得到守卫）→ 执行 `proceed` → 守卫析构释放上下文；
    /// - **后置条件**：返回时当前线程不再持有本次调用发布的坐标，panic 展开同样成立。
    pub fn around<T, E, F>(
        &self,
        declaration: &DbRouter,
        args: &[CallArg<'_>],
        proceed: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RouterError>,
    {
        let coordinate = self.route(declaration, args)?;
        let _guard = context::publish(coordinate, self.config.reentrancy());
        proceed()
    }

    /// 异步包裹：在 `proceed` 被轮询期间发布分片坐标。
    ///
    /// 路由在调用本方法时同步完成，返回的 Future 不借用入参，可直接交给 `tokio::spawn`。
    /// Future 被丢弃（取消、超时）时任务本地作用域随之结束。
    pub fn around_async<T, E, Fut>(
        &self,
        declaration: &DbRouter,
        args: &[CallArg<'_>],
        proceed: Fut,
    ) -> impl Future<Output = Result<T, E>> + use<T, E, Fut>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<RouterError>,
    {
        let routed = self.route(declaration, args);
        let policy = self.config.reentrancy();
        async move {
            let coordinate = match routed {
                Ok(coordinate) => coordinate,
                Err(err) => return Err(E::from(err)),
            };
            context::scope(coordinate, policy, proceed).await
        }
    }
}
