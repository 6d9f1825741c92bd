//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为路由链路对外暴露的失败语义提供集中定义：配置错误在启动期暴露，缺失路由键只让当次调用失败；
//! - 单个入参字段读取失败属于“告警”而非“错误”，单独建模为 [`ExtractionWarning`]，只记录日志、不中断提取。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架；
//! - [`RouterError::code`] 返回稳定错误码，供调用方做告警聚合；
//! - 被包裹业务操作的错误类型只需实现 `From<RouterError>`，即可在拦截管线中用 `?` 传播。

use thiserror::Error;

/// 路由失败的稳定错误码。
pub mod codes {
    /// 分库/分表数量或路由字段配置非法。
    pub const CONFIG_INVALID: &str = "dbrouter.config.invalid";
    /// 无法从调用入参中提取路由键。
    pub const ROUTE_MISSING_KEY: &str = "dbrouter.route.missing_key";
}

/// 分片路由错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“进程级不可恢复”的配置错误与“单次调用失败”的缺键错误，
///   前者应在装配阶段 fail fast，后者仅回传给当次调用方，系统其余部分保持可用。
/// - **契约 (What)**：
///   - 两类错误都不应自动重试：配置不会因重试而改变，畸形入参亦然；
///   - 变体携带 `String` 上下文，`Clone + Eq` 便于测试断言与跨线程传播。
/// - **风险 (Trade-offs)**：`detail` 为自由文本，告警聚合应使用 [`Self::code`] 而非消息内容。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RouterError {
    /// 分库/分表数量非法，或注解与全局配置都未声明路由字段。
    #[error("router configuration invalid: {detail}")]
    Configuration { detail: String },

    /// 所有入参都无法提供非空的路由键，且未配置兜底键。
    #[error("routing key `{key_name}` not found in call arguments")]
    MissingRoutingKey { key_name: String },
}

impl RouterError {
    /// 构造配置错误的便捷方法。
    pub fn configuration(detail: impl Into<String>) -> Self {
        RouterError::Configuration {
            detail: detail.into(),
        }
    }

    /// 构造缺失路由键错误的便捷方法。
    pub fn missing_key(key_name: impl Into<String>) -> Self {
        RouterError::MissingRoutingKey {
            key_name: key_name.into(),
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::Configuration { .. } => codes::CONFIG_INVALID,
            RouterError::MissingRoutingKey { .. } => codes::ROUTE_MISSING_KEY,
        }
    }
}

/// 读取单个入参字段时的非致命失败。
///
/// # 教案式说明
/// - **意图 (Why)**：对应“某个入参没有该属性”之类的局部失败；提取流程记录后继续扫描剩余入参，
///   只有全部入参都失败时才上升为 [`RouterError::MissingRoutingKey`]。
/// - **契约 (What)**：由 [`FieldAccess`](crate::extract::FieldAccess) 实现返回，调用方不应据此中断调用。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ExtractionWarning {
    /// 多参数调用中的标量入参没有字段可读。
    #[error("argument #{index} is a scalar and has no field `{field}`")]
    NotARecord { index: usize, field: String },

    /// 入参不含该字段。
    #[error("field `{field}` is not present on the argument")]
    FieldNotFound { field: String },

    /// 字段存在，但其值无法字符串化为路由键（例如嵌套对象）。
    #[error("field `{field}` holds an unsupported {kind} value")]
    UnsupportedValue { field: String, kind: &'static str },

    /// 字段访问过程本身失败（例如序列化失败）。
    #[error("failed to access field `{field}`: {detail}")]
    Access { field: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            RouterError::configuration("db_count must be >= 1").code(),
            codes::CONFIG_INVALID
        );
        assert_eq!(
            RouterError::missing_key("userId").code(),
            codes::ROUTE_MISSING_KEY
        );
    }

    #[test]
    fn display_carries_context() {
        let err = RouterError::missing_key("userId");
        assert_eq!(
            err.to_string(),
            "routing key `userId` not found in call arguments"
        );
    }
}
