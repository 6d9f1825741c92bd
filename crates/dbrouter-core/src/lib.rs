//! # dbrouter-core
//!
//! ## 定位与职责（Why）
//! - 透明分库分表中间件的核心：调用方只声明“这次调用按哪个字段路由”，由本 crate 计算目标
//!   `(库, 表)` 坐标，并在被包裹操作执行期间把坐标暴露给下游的连接选择与表名改写。
//! - 连接池、事务与 SQL 解析不在此处，物理解析器（`dbrouter-dynamic`）只通过
//!   [`current_shard_coordinate`] 读取坐标。
//!
//! ## 架构嵌入（Where）
//! - [`strategy`]：路由键 → 坐标的纯函数计算；
//! - [`context`]：线程/任务本地的坐标槽位；
//! - [`extract`]：从异构入参中按字段名提取路由键；
//! - [`aspect`]：把上述三者串成带保证释放的拦截管线；
//! - [`config`]、[`error`]、[`observability`]：配置、错误域与日志安装。
//!
//! ## 使用示例（How）
//! ```
//! use dbrouter_core::{DbRouter, DbRouterAspect, RouterConfig, current_shard_coordinate};
//!
//! let aspect = DbRouterAspect::with_hash_strategy(RouterConfig::new(2, 4, "userId")?);
//! let shard = aspect.around(&DbRouter::default(), &["10000001".into()], || {
//!     Ok::<_, dbrouter_core::RouterError>(current_shard_coordinate())
//! })?;
//! assert!(shard.is_some());
//! assert_eq!(current_shard_coordinate(), None);
//! # Ok::<(), dbrouter_core::RouterError>(())
//! ```

pub mod aspect;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod observability;
pub mod strategy;

pub use aspect::{DbRouter, DbRouterAspect};
pub use config::{ReentrancyPolicy, RouterConfig, RouterConfigBuilder, ShardNaming};
pub use context::{RouteGuard, current_shard_coordinate};
pub use error::{ExtractionWarning, RouterError};
pub use extract::{CallArg, FieldAccess, RoutingKey, SerdeFields, extract};
pub use strategy::{HashCodeStrategy, ShardCoordinate, ShardStrategy, stable_hash};
