//! 路由键 → 分片坐标的计算策略。
//!
//! # 教案式说明
//! - **意图（Why）**：相同路由键必须永远落在同一 `(库, 表)` 上，这是同一实体的写入与读取能命中同一分片的前提；
//!   因此哈希函数必须跨进程、跨运行稳定，不能使用带随机种子的 `std` 哈希。
//! - **逻辑（How）**：把 `db_count × table_count` 视作一个耦合的二维网格，对网格总数取模后再拆分库/表下标，
//!   避免“库、表各自独立取模”导致表选择与库选择相关联。
//! - **契约（What）**：[`ShardStrategy`] 是可替换的扩展点，默认实现为 [`HashCodeStrategy`]。

use crate::{config::RouterConfig, error::RouterError};

/// 分片网格中的一个坐标，库/表下标均从 0 开始。
///
/// 展示层（数据源名、物理表后缀）的偏移由 [`ShardNaming`](crate::config::ShardNaming) 负责。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShardCoordinate {
    pub db_index: u32,
    pub table_index: u32,
}

impl ShardCoordinate {
    pub const fn new(db_index: u32, table_index: u32) -> Self {
        Self {
            db_index,
            table_index,
        }
    }
}

/// 分片策略扩展点。
///
/// # 教案式说明
/// - **意图 (Why)**：允许装配方替换哈希算法（例如为兼容某个既有部署的桶分配），而拦截管线保持不变；
/// - **契约 (What)**：
///   - 实现必须是纯函数：无 I/O、无内部可变状态，同一输入返回同一坐标；
///   - 返回坐标必须满足 `db_index < db_count` 且 `table_index < table_count`；
///   - 空白路由键返回 [`RouterError::MissingRoutingKey`]。
pub trait ShardStrategy: Send + Sync + 'static {
    fn compute(&self, key: &str) -> Result<ShardCoordinate, RouterError>;
}

/// 基于字符串哈希码扰动后取模的默认策略。
///
/// # 教案式说明
/// - **执行步骤 (How)**：
///   1. `size = db_count * table_count`；
///   2. `h = stable_hash(key)`：UTF-16 码元上的 31 进制多项式哈希（`i32` 回绕），再做 `h ^ (h >>> 16)` 扰动；
///   3. `idx = h.rem_euclid(size)`，保证负哈希也得到非负桶号；
///   4. `db_index = idx / table_count`，`table_index = idx % table_count`。
/// - **兼容性 (Trade-offs)**：当网格总数为 2 的幂时，结果与“`(size - 1) & h`”的位与写法完全一致，
///   既有部署的数据无需迁移；非 2 的幂时位与写法会留下空桶，取模写法则覆盖全部网格。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HashCodeStrategy {
    db_count: u32,
    table_count: u32,
}

impl HashCodeStrategy {
    /// 从已校验的配置构造策略。
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            db_count: config.db_count(),
            table_count: config.table_count(),
        }
    }

    /// 直接以分库/分表数量构造，数量非法时返回配置错误。
    pub fn with_counts(db_count: u32, table_count: u32) -> Result<Self, RouterError> {
        let config = RouterConfig::builder(db_count, table_count).build()?;
        Ok(Self::new(&config))
    }
}

/// 空白键值被拒绝时错误中使用的占位字段名。
const BLANK_KEY_NAME: &str = "<blank>";

impl ShardStrategy for HashCodeStrategy {
    fn compute(&self, key: &str) -> Result<ShardCoordinate, RouterError> {
        if key.trim().is_empty() {
            // 策略只看到键值，拿不到字段名。
            return Err(RouterError::missing_key(BLANK_KEY_NAME));
        }
        let size = i64::from(self.db_count) * i64::from(self.table_count);
        let idx = i64::from(stable_hash(key)).rem_euclid(size);
        let table_count = i64::from(self.table_count);
        // idx < size ≤ u32::MAX，两次转换都不会截断。
        Ok(ShardCoordinate {
            db_index: (idx / table_count) as u32,
            table_index: (idx % table_count) as u32,
        })
    }
}

/// 稳定的字符串哈希：与 JVM `String.hashCode` 相同的多项式哈希，再叠加高 16 位扰动。
pub fn stable_hash(key: &str) -> i32 {
    let h = key
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
    h ^ (((h as u32) >> 16) as i32)
}
