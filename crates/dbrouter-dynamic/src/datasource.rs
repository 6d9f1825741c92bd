//! 动态数据源：按当前分片坐标挑选物理库。
//!
//! # 教案式说明
//! - **意图（Why）**：业务代码只向“一个”数据源要连接，由本模块根据拦截管线发布的坐标
//!   把请求转给对应的物理库，从而做到分库对调用方透明。
//! - **结构（How）**：
//!   - [`DataSource`]：单个物理库的连接来源，连接池实现由外部提供；
//!   - [`ConnectionProvider`]：`resolve(坐标) -> 连接` 的能力接口，`select_connection` 自动读取当前坐标；
//!   - [`DynamicDataSource`]：以组合方式持有多个目标库与一个默认库，目标表由 `ArcSwap` 承载，可整表热替换。
//! - **契约（What）**：
//!   - 当前执行单元没有坐标时回落到默认库；既无坐标又无默认库返回 [`ResolveError::NoDefaultDataSource`]；
//!   - 坐标映射出的查找键（如 `db02`）未注册时返回 [`ResolveError::UnknownDataSource`]，不会静默回落。

use std::{collections::HashMap, fmt, sync::Arc};

use arc_swap::ArcSwap;
use dbrouter_core::{ShardCoordinate, ShardNaming, current_shard_coordinate};
use serde::Deserialize;

use crate::error::{BoxError, ResolveError};

/// 单个物理库的连接来源。
pub trait DataSource: Send + Sync + 'static {
    type Connection;

    fn connection(&self) -> Result<Self::Connection, BoxError>;
}

/// 按分片坐标解析连接的能力接口。
pub trait ConnectionProvider {
    type Connection;

    /// 以显式坐标解析连接，`None` 表示当前没有路由坐标。
    fn resolve(&self, shard: Option<ShardCoordinate>) -> Result<Self::Connection, ResolveError>;

    /// 读取当前执行单元的坐标并解析连接。
    fn select_connection(&self) -> Result<Self::Connection, ResolveError> {
        self.resolve(current_shard_coordinate())
    }
}

/// 一个物理库的连接参数。
#[derive(Clone, Eq, PartialEq, Deserialize)]
pub struct DataSourceSettings {
    pub url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl DataSourceSettings {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for DataSourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 交给驱动层打开的连接描述。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectionDescriptor {
    pub url: String,
    pub username: String,
}

impl DataSource for DataSourceSettings {
    type Connection = ConnectionDescriptor;

    fn connection(&self) -> Result<Self::Connection, BoxError> {
        if self.url.trim().is_empty() {
            return Err("data source url is empty".into());
        }
        Ok(ConnectionDescriptor {
            url: self.url.clone(),
            username: self.username.clone(),
        })
    }
}

struct Targets<D> {
    by_key: HashMap<String, Arc<D>>,
    default: Option<Arc<D>>,
}

impl<D> Targets<D> {
    fn build<I>(targets: I, default: Option<D>) -> Self
    where
        I: IntoIterator<Item = (String, D)>,
    {
        Self {
            by_key: targets
                .into_iter()
                .map(|(key, target)| (key, Arc::new(target)))
                .collect(),
            default: default.map(Arc::new),
        }
    }
}

/// 按坐标在多个物理库之间切换的数据源。
pub struct DynamicDataSource<D> {
    naming: ShardNaming,
    targets: ArcSwap<Targets<D>>,
}

impl<D> fmt::Debug for DynamicDataSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self.targets.load();
        let mut keys: Vec<_> = targets.by_key.keys().collect();
        keys.sort();
        f.debug_struct("DynamicDataSource")
            .field("naming", &self.naming)
            .field("targets", &keys)
            .field("has_default", &targets.default.is_some())
            .finish()
    }
}

impl<D> DynamicDataSource<D> {
    /// 以查找键 → 数据源的映射与可选默认库构造。
    pub fn new<I>(naming: ShardNaming, targets: I, default: Option<D>) -> Self
    where
        I: IntoIterator<Item = (String, D)>,
    {
        Self {
            naming,
            targets: ArcSwap::from_pointee(Targets::build(targets, default)),
        }
    }

    /// 整表替换目标库，正在使用旧表的读者不受影响。
    pub fn update<I>(&self, targets: I, default: Option<D>)
    where
        I: IntoIterator<Item = (String, D)>,
    {
        let next = Targets::build(targets, default);
        tracing::info!(targets = next.by_key.len(), "dynamic data source targets replaced");
        self.targets.store(Arc::new(next));
    }

    /// 坐标对应的查找键，例如 `db_index = 1` 得到 `db02`。
    pub fn lookup_key(&self, shard: ShardCoordinate) -> String {
        self.naming.data_source_key(shard.db_index)
    }

    /// 当前已注册的查找键，按字典序排列。
    pub fn target_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.targets.load().by_key.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 解析坐标对应的目标库本身，而不向其索取连接。
    pub fn determine_target(
        &self,
        shard: Option<ShardCoordinate>,
    ) -> Result<(String, Arc<D>), ResolveError> {
        let targets = self.targets.load();
        match shard {
            None => targets
                .default
                .as_ref()
                .map(|target| ("default".to_owned(), Arc::clone(target)))
                .ok_or(ResolveError::NoDefaultDataSource),
            Some(shard) => {
                let lookup_key = self.lookup_key(shard);
                match targets.by_key.get(&lookup_key) {
                    Some(target) => Ok((lookup_key, Arc::clone(target))),
                    None => Err(ResolveError::UnknownDataSource { lookup_key }),
                }
            }
        }
    }
}

impl<D: DataSource> ConnectionProvider for DynamicDataSource<D> {
    type Connection = D::Connection;

    fn resolve(&self, shard: Option<ShardCoordinate>) -> Result<Self::Connection, ResolveError> {
        let (lookup_key, target) = self.determine_target(shard)?;
        tracing::debug!(lookup_key = %lookup_key, "data source selected");
        target
            .connection()
            .map_err(|source| ResolveError::Connection { lookup_key, source })
    }
}
