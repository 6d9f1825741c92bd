//! 分库分表路由的进程级配置。
//!
//! # 教案式说明
//! - **意图（Why）**：[`RouterConfig`] 在进程启动时构造一次，之后只读；所有字段在构造阶段校验，
//!   运行期不可能出现 `db_count == 0` 之类的非法实例。
//! - **结构（How）**：必填项为分库数、分表数；全局路由字段、兜底路由键、重入策略与物理命名模板为可选项，
//!   通过 [`RouterConfigBuilder`] 链式设置。
//! - **契约（What）**：构造失败一律返回 [`RouterError::Configuration`]，属于启动期致命错误。

use serde::Deserialize;

use crate::error::RouterError;

/// 嵌套调用时路由上下文的恢复策略。
///
/// # 教案式说明
/// - **意图（Why）**：同一执行单元内，一个带路由声明的操作可能调用另一个带路由声明的操作；
///   内层退出时如何处理外层坐标必须是显式选择。
/// - **契约（What）**：
///   - `Restore`：栈式纪律，内层退出时恢复外层坐标，最外层退出后上下文为空；
///   - `Clear`：无论嵌套与否，退出时一律清空，外层在内层返回后失去坐标（不可依赖外层坐标存活）。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReentrancyPolicy {
    #[default]
    Restore,
    Clear,
}

/// 分片坐标到物理名称的展示模板。
///
/// 坐标内部始终从 0 开始编号；`db_base`/`table_base` 决定展示时的偏移，
/// 默认值生成 `db01`、`user_000` 这样的名称。
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShardNaming {
    pub db_prefix: String,
    pub db_width: usize,
    pub db_base: u32,
    pub table_separator: String,
    pub table_width: usize,
    pub table_base: u32,
}

impl Default for ShardNaming {
    fn default() -> Self {
        Self {
            db_prefix: "db".to_owned(),
            db_width: 2,
            db_base: 1,
            table_separator: "_".to_owned(),
            table_width: 3,
            table_base: 0,
        }
    }
}

impl ShardNaming {
    /// 生成数据源查找键，例如 `db_index = 0` 时得到 `db01`。
    pub fn data_source_key(&self, db_index: u32) -> String {
        let shown = u64::from(db_index) + u64::from(self.db_base);
        format!("{}{:0width$}", self.db_prefix, shown, width = self.db_width)
    }

    /// 生成物理表名，例如 `("user", 2)` 得到 `user_002`。
    pub fn physical_table(&self, logical: &str, table_index: u32) -> String {
        let shown = u64::from(table_index) + u64::from(self.table_base);
        format!(
            "{logical}{}{:0width$}",
            self.table_separator,
            shown,
            width = self.table_width
        )
    }
}

/// 不可变的路由配置。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouterConfig {
    db_count: u32,
    table_count: u32,
    routing_key: Option<String>,
    fallback_key: Option<String>,
    reentrancy: ReentrancyPolicy,
    naming: ShardNaming,
}

impl RouterConfig {
    /// 以最常用的三元组构造配置。
    ///
    /// - **前置条件**：`db_count ≥ 1` 且 `table_count ≥ 1`，两者乘积不得溢出 `u32`；
    /// - **后置条件**：空白的 `routing_key` 视为“未声明全局路由字段”，由每次调用的声明补齐。
    pub fn new(
        db_count: u32,
        table_count: u32,
        routing_key: impl Into<String>,
    ) -> Result<Self, RouterError> {
        Self::builder(db_count, table_count)
            .routing_key(routing_key)
            .build()
    }

    /// 返回配置构造器。
    pub fn builder(db_count: u32, table_count: u32) -> RouterConfigBuilder {
        RouterConfigBuilder {
            db_count,
            table_count,
            routing_key: None,
            fallback_key: None,
            reentrancy: ReentrancyPolicy::default(),
            naming: ShardNaming::default(),
        }
    }

    pub fn db_count(&self) -> u32 {
        self.db_count
    }

    pub fn table_count(&self) -> u32 {
        self.table_count
    }

    /// 分片网格总数 `db_count * table_count`，构造时已保证不溢出。
    pub fn grid_size(&self) -> u32 {
        self.db_count * self.table_count
    }

    /// 全局默认路由字段名。
    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }

    /// 提取失败时使用的兜底路由键值。
    pub fn fallback_key(&self) -> Option<&str> {
        self.fallback_key.as_deref()
    }

    pub fn reentrancy(&self) -> ReentrancyPolicy {
        self.reentrancy
    }

    pub fn naming(&self) -> &ShardNaming {
        &self.naming
    }
}

/// [`RouterConfig`] 的链式构造器。
#[derive(Clone, Debug)]
pub struct RouterConfigBuilder {
    db_count: u32,
    table_count: u32,
    routing_key: Option<String>,
    fallback_key: Option<String>,
    reentrancy: ReentrancyPolicy,
    naming: ShardNaming,
}

impl RouterConfigBuilder {
    pub fn routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = non_blank(routing_key.into());
        self
    }

    pub fn fallback_key(mut self, fallback_key: impl Into<String>) -> Self {
        self.fallback_key = non_blank(fallback_key.into());
        self
    }

    pub fn reentrancy(mut self, reentrancy: ReentrancyPolicy) -> Self {
        self.reentrancy = reentrancy;
        self
    }

    pub fn naming(mut self, naming: ShardNaming) -> Self {
        self.naming = naming;
        self
    }

    /// 校验并冻结配置。
    pub fn build(self) -> Result<RouterConfig, RouterError> {
        if self.db_count < 1 {
            return Err(RouterError::configuration(format!(
                "db_count must be >= 1, got {}",
                self.db_count
            )));
        }
        if self.table_count < 1 {
            return Err(RouterError::configuration(format!(
                "table_count must be >= 1, got {}",
                self.table_count
            )));
        }
        if self.db_count.checked_mul(self.table_count).is_none() {
            return Err(RouterError::configuration(format!(
                "shard grid {} x {} overflows",
                self.db_count, self.table_count
            )));
        }
        Ok(RouterConfig {
            db_count: self.db_count,
            table_count: self.table_count,
            routing_key: self.routing_key,
            fallback_key: self.fallback_key,
            reentrancy: self.reentrancy,
            naming: self.naming,
        })
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
