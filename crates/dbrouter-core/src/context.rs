//! 执行单元级的路由上下文。
//!
//! # 教案式说明
//! - **意图（Why）**：拦截管线计算出的分片坐标需要在“被包裹操作执行期间”对物理解析器可见，
//!   但绝不能被并发的其他执行单元看到。因此槽位必须是执行上下文本地存储，而非进程级可变变量。
//! - **结构（How）**：
//!   - 同步调用者使用 `thread_local!` 槽位；
//!   - 异步调用者使用 `tokio::task_local!` 槽位，任务在线程间迁移时坐标随任务走；
//!   - [`current_shard_coordinate`] 先查当前任务的作用域，不在任何路由任务作用域内时再查线程槽位；
//!   - 在路由任务作用域内发生的同步发布直接写任务槽位，保证两种槽位永远不会给出矛盾的答案。
//! - **契约（What）**：
//!   - 发布返回 [`RouteGuard`]，其 `Drop` 按 [`ReentrancyPolicy`] 释放槽位，正常返回、`Err`、panic 展开都会执行；
//!   - 异步作用域随 Future 完成或被丢弃（取消/超时）而结束，坐标不会泄漏到后续任务；
//!   - 新 spawn 的线程或任务不继承坐标。
//! - **风险提示（Trade-offs）**：[`RouteGuard`] 为 `!Send`，只能在发布它的线程上释放；
//!   异步代码应使用 [`scope`] 而非跨 `.await` 持有守卫。

use core::{cell::Cell, future::Future, marker::PhantomData};

use crate::{config::ReentrancyPolicy, strategy::ShardCoordinate};

thread_local! {
    static THREAD_SLOT: Cell<Option<ShardCoordinate>> = const { Cell::new(None) };
}

tokio::task_local! {
    static TASK_SLOT: Cell<Option<ShardCoordinate>>;
}

/// 读取当前执行单元最近一次发布的分片坐标。
///
/// 不在任何带路由声明的调用内时返回 `None`。
pub fn current_shard_coordinate() -> Option<ShardCoordinate> {
    TASK_SLOT
        .try_with(Cell::get)
        .unwrap_or_else(|_| THREAD_SLOT.with(Cell::get))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    Thread,
    Task,
}

/// 坐标发布守卫，离开作用域时释放槽位。
#[must_use = "dropping the guard immediately releases the routing context"]
#[derive(Debug)]
pub struct RouteGuard {
    slot: Slot,
    previous: Option<ShardCoordinate>,
    policy: ReentrancyPolicy,
    _not_send: PhantomData<*const ()>,
}

/// 把坐标写入当前执行单元的槽位。
///
/// 覆盖式写入：嵌套调用时内层坐标立即生效，外层坐标由守卫记录，
/// 在 [`ReentrancyPolicy::Restore`] 下于内层退出时恢复。
pub fn publish(coordinate: ShardCoordinate, policy: ReentrancyPolicy) -> RouteGuard {
    let (slot, previous) = match TASK_SLOT.try_with(|cell| cell.replace(Some(coordinate))) {
        Ok(previous) => (Slot::Task, previous),
        Err(_) => (
            Slot::Thread,
            THREAD_SLOT.with(|cell| cell.replace(Some(coordinate))),
        ),
    };
    RouteGuard {
        slot,
        previous,
        policy,
        _not_send: PhantomData,
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        let restored = match self.policy {
            ReentrancyPolicy::Restore => self.previous,
            ReentrancyPolicy::Clear => None,
        };
        // 线程本地存储析构期间 `try_with` 会失败，此时槽位本身也随之销毁，忽略即可。
        match self.slot {
            Slot::Task => {
                let _ = TASK_SLOT.try_with(|cell| cell.set(restored));
            }
            Slot::Thread => {
                let _ = THREAD_SLOT.try_with(|cell| cell.set(restored));
            }
        }
    }
}

/// 在同步闭包执行期间发布坐标。
pub fn with_coordinate<R>(
    coordinate: ShardCoordinate,
    policy: ReentrancyPolicy,
    f: impl FnOnce() -> R,
) -> R {
    let _guard = publish(coordinate, policy);
    f()
}

/// 在异步 Future 执行期间发布坐标。
///
/// # 教案式说明
/// - **逻辑 (How)**：为 Future 建立新的任务本地作用域；作用域嵌套时 Tokio 会在内层结束后换回外层的值，
///   天然满足 [`ReentrancyPolicy::Restore`]；`Clear` 策略则在内层正常结束后额外清空外层槽位，
///   外层是任务作用域时清任务槽位，否则清线程槽位。
/// - **契约 (What)**：Future 被丢弃时作用域随之结束，无需额外清理步骤。
pub async fn scope<F>(coordinate: ShardCoordinate, policy: ReentrancyPolicy, fut: F) -> F::Output
where
    F: Future,
{
    let nested = TASK_SLOT.try_with(|_| ()).is_ok();
    let output = TASK_SLOT.scope(Cell::new(Some(coordinate)), fut).await;
    if policy == ReentrancyPolicy::Clear {
        if nested {
            let _ = TASK_SLOT.try_with(|cell| cell.set(None));
        } else {
            // 外层可能是同步发布的线程槽位，例如同步调用里 `block_on` 一个异步调用。
            let _ = THREAD_SLOT.try_with(|cell| cell.set(None));
        }
    }
    output
}
