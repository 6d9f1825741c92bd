//! `tracing` 订阅器的一次性安装入口。
//!
//! # 教案式说明
//! - **意图（Why）**：路由链路的所有诊断（提取告警、路由失败、坐标发布）都通过 `tracing` 宏输出；
//!   宿主进程只需在启动时调用一次 [`install`] 即可看到结构化日志。
//! - **逻辑（How）**：组装 `registry + EnvFilter + fmt` 三层并设为全局默认订阅器；
//!   `EnvFilter` 优先读取 `RUST_LOG`，缺省为 `info`。
//! - **契约（What）**：重复调用返回 [`InstallError::AlreadyInstalled`]；外部已设置订阅器时返回
//!   [`InstallError::SubscriberAlreadySet`]，不会覆盖宿主自己的配置。

use std::sync::OnceLock;

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

static INSTALLED: OnceLock<()> = OnceLock::new();

/// 安装订阅器失败的原因。
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("dbrouter tracing subscriber is already installed")]
    AlreadyInstalled,
    #[error("a global tracing subscriber was set by someone else")]
    SubscriberAlreadySet,
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// 安装全局 `tracing` 订阅器。
pub fn install() -> Result<(), InstallError> {
    install_with_filter(build_env_filter())
}

/// 以显式过滤指令安装，例如 `"dbrouter_core=debug"`。
pub fn install_with_directives(directives: &str) -> Result<(), InstallError> {
    install_with_filter(EnvFilter::new(directives))
}

fn install_with_filter(filter: EnvFilter) -> Result<(), InstallError> {
    if INSTALLED.get().is_some() {
        return Err(InstallError::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(InstallError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    INSTALLED.set(()).map_err(|_| InstallError::AlreadyInstalled)
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
