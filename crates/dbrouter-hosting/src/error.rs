use std::{io, path::PathBuf};

use dbrouter_core::RouterError;
use thiserror::Error;

/// 装配阶段的失败。
///
/// # 教案式说明
/// - **意图 (Why)**：自动装配只在进程启动时执行一次，任何失败都意味着配置不可用，
///   调用方应当直接终止启动而不是带着半套路由继续运行。
/// - **契约 (What)**：
///   - `Io`/`Parse`：配置文件无法读取或不是合法的 TOML，`#[source]` 保留底层原因；
///   - `Router`：分库分表参数本身非法，原样转交核心库的 [`RouterError`]；
///   - `MissingDataSource`：`list` 或 `default` 引用了没有连接参数的数据源。
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to read router settings from `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("router settings are not valid TOML")]
    Parse(#[from] toml::de::Error),

    #[error("router configuration rejected")]
    Router(#[from] RouterError),

    #[error("data source `{id}` is referenced but has no connection settings")]
    MissingDataSource { id: String },
}
