//! dbrouter-dynamic: 读取路由上下文的物理解析器。
//!
//! # 教案式概览
//! - **意图（Why）**：`dbrouter-core` 只负责算出坐标并在调用期间发布；把坐标变成“哪条连接、哪张表”
//!   是本 crate 的职责，两者只通过 [`dbrouter_core::current_shard_coordinate`] 交互。
//! - **结构（How）**：[`datasource`] 负责分库（连接选择），[`table`] 负责分表（表名改写）。
//! - **契约（What）**：两者读到的坐标都是同一执行单元内最近一次发布的坐标，不会读到其他并发调用的坐标。
//! - **风险提示（Trade-offs）**：连接池与 SQL 解析不在范围内，[`DataSource`] 的实现由驱动层提供。

pub mod datasource;
pub mod error;
pub mod table;

pub use datasource::{
    ConnectionDescriptor, ConnectionProvider, DataSource, DataSourceSettings, DynamicDataSource,
};
pub use error::{BoxError, ResolveError};
pub use table::{DbRouterStrategy, TableRewriter};
