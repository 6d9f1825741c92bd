//! 物理表名解析与 SQL 表名改写。
//!
//! # 教案式说明
//! - **意图（Why）**：分表场景下，业务 SQL 只写逻辑表名（如 `user`），执行前需要替换为当前坐标对应的
//!   物理表（如 `user_002`）。只有声明了分表的数据访问对象才改写，其余 SQL 原样放行。
//! - **逻辑（How）**：定位第一个 `from|into|update` 关键字之后的表名，仅替换这一处；
//!   不做完整的 SQL 解析，多表 JOIN 等复杂语句需由调用方自行拼接物理表名。
//! - **契约（What）**：
//!   - 未声明分表时返回借用的原始 SQL，零分配；
//!   - 声明分表但当前执行单元没有坐标时返回 [`ResolveError::MissingShardContext`]；
//!   - SQL 中找不到表名时原样返回并记录 `debug` 日志。

use std::{borrow::Cow, sync::LazyLock};

use dbrouter_core::{ShardCoordinate, ShardNaming, current_shard_coordinate};
use regex::Regex;

use crate::error::ResolveError;

static TABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|into|update)\s+(\w+)").expect("table pattern is a valid regex")
});

/// 数据访问对象级别的分表声明。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DbRouterStrategy {
    pub split_table: bool,
}

impl DbRouterStrategy {
    pub const SPLIT: Self = Self { split_table: true };
    pub const NO_SPLIT: Self = Self { split_table: false };
}

/// 逻辑表名 → 物理表名的改写器。
#[derive(Clone, Debug, Default)]
pub struct TableRewriter {
    naming: ShardNaming,
}

impl TableRewriter {
    pub fn new(naming: ShardNaming) -> Self {
        Self { naming }
    }

    /// 以显式坐标生成物理表名。
    pub fn physical_table_for(&self, logical: &str, shard: ShardCoordinate) -> String {
        self.naming.physical_table(logical, shard.table_index)
    }

    /// 以当前执行单元的坐标生成物理表名。
    pub fn resolve_physical_table(&self, logical: &str) -> Result<String, ResolveError> {
        let shard = current_shard_coordinate().ok_or(ResolveError::MissingShardContext)?;
        Ok(self.physical_table_for(logical, shard))
    }

    /// 按声明改写 SQL 中的表名。
    pub fn rewrite<'a>(
        &self,
        sql: &'a str,
        strategy: DbRouterStrategy,
    ) -> Result<Cow<'a, str>, ResolveError> {
        if !strategy.split_table {
            return Ok(Cow::Borrowed(sql));
        }
        let shard = current_shard_coordinate().ok_or(ResolveError::MissingShardContext)?;
        Ok(self.rewrite_with(sql, shard))
    }

    /// 以显式坐标改写 SQL，不读取路由上下文。
    pub fn rewrite_with<'a>(&self, sql: &'a str, shard: ShardCoordinate) -> Cow<'a, str> {
        let Some(table) = TABLE_PATTERN.captures(sql).and_then(|caps| caps.get(1)) else {
            tracing::debug!(sql, "no table name found, statement left unchanged");
            return Cow::Borrowed(sql);
        };
        let physical = self.physical_table_for(table.as_str(), shard);
        let mut rewritten = String::with_capacity(sql.len() + physical.len());
        rewritten.push_str(&sql[..table.start()]);
        rewritten.push_str(&physical);
        rewritten.push_str(&sql[table.end()..]);
        tracing::debug!(logical = table.as_str(), physical = %physical, "table name rewritten");
        Cow::Owned(rewritten)
    }
}
