use thiserror::Error;

/// 数据源建连失败时携带的底层错误。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 物理解析失败。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“当前执行单元没有坐标”“坐标指向未注册的数据源”“数据源本身建连失败”三类问题，
///   前两类通常是装配或调用方式错误，最后一类才是运行时故障。
/// - **契约 (What)**：`Connection` 通过 `#[source]` 保留底层错误链，便于上层打印完整原因。
#[derive(Debug, Error)]
pub enum ResolveError {
    /// 需要坐标的操作在任何路由调用之外执行。
    #[error("no shard coordinate is published for the current unit of work")]
    MissingShardContext,

    /// 坐标缺失且未配置默认数据源。
    #[error("no shard coordinate is published and no default data source is configured")]
    NoDefaultDataSource,

    /// 坐标对应的数据源查找键没有注册。
    #[error("no data source registered under `{lookup_key}`")]
    UnknownDataSource { lookup_key: String },

    /// 目标数据源无法提供连接。
    #[error("data source `{lookup_key}` failed to provide a connection")]
    Connection {
        lookup_key: String,
        #[source]
        source: BoxError,
    },
}
