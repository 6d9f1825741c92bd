//! 从调用入参中提取路由键。
//!
//! # 教案式说明
//! - **意图（Why）**：业务方法的入参形态各异（单个字符串、请求对象、多个对象混排），
//!   拦截管线只关心“名为 `routing_key` 的字段值”。本模块用 [`FieldAccess`] 能力接口替代运行时反射，
//!   让异构入参都能按字段名查找。
//! - **逻辑（How）**：
//!   1. 恰好一个标量入参时直接把它当作路由键，不做任何字段查找；
//!   2. 否则按顺序扫描入参，返回第一个非空白的字段值；
//!   3. 单个入参读取失败只记录告警并跳过，全部失败才返回 [`RouterError::MissingRoutingKey`]。
//! - **契约（What）**：不存在“静默得到空键”的路径：要么返回非空白的 [`RoutingKey`]，要么返回显式错误。

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ExtractionWarning, RouterError};

/// 按名称读取字段的能力接口。
///
/// # 契约说明（What）
/// - `Ok(Some(value))`：字段存在且可字符串化；
/// - `Ok(None)`：字段存在但为空（如 JSON `null`），调用方继续扫描；
/// - `Err(warning)`：字段缺失或无法读取，调用方记录告警后继续扫描。
pub trait FieldAccess {
    fn field(&self, name: &str) -> Result<Option<String>, ExtractionWarning>;
}

impl FieldAccess for HashMap<String, String> {
    fn field(&self, name: &str) -> Result<Option<String>, ExtractionWarning> {
        self.get(name)
            .map(|value| Some(value.clone()))
            .ok_or_else(|| not_found(name))
    }
}

impl FieldAccess for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Result<Option<String>, ExtractionWarning> {
        self.get(name)
            .map(|value| Some(value.clone()))
            .ok_or_else(|| not_found(name))
    }
}

impl FieldAccess for Value {
    fn field(&self, name: &str) -> Result<Option<String>, ExtractionWarning> {
        match self {
            Value::Object(members) => match members.get(name) {
                Some(value) => json_text(name, value),
                None => Err(not_found(name)),
            },
            _ => Err(not_found(name)),
        }
    }
}

/// 为任意可序列化的结构体提供按字段名读取的能力。
///
/// 通过 `serde_json::to_value` 把入参投影为 JSON 对象后查找字段，
/// 字段名遵循结构体上的 `#[serde(rename...)]` 约定。
#[derive(Clone, Copy, Debug)]
pub struct SerdeFields<'a, T: ?Sized>(pub &'a T);

impl<T> FieldAccess for SerdeFields<'_, T>
where
    T: Serialize + ?Sized,
{
    fn field(&self, name: &str) -> Result<Option<String>, ExtractionWarning> {
        let projected = serde_json::to_value(self.0).map_err(|err| ExtractionWarning::Access {
            field: name.to_owned(),
            detail: err.to_string(),
        })?;
        projected.field(name)
    }
}

fn json_text(name: &str, value: &Value) -> Result<Option<String>, ExtractionWarning> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Array(_) => Err(ExtractionWarning::UnsupportedValue {
            field: name.to_owned(),
            kind: "array",
        }),
        Value::Object(_) => Err(ExtractionWarning::UnsupportedValue {
            field: name.to_owned(),
            kind: "object",
        }),
    }
}

fn not_found(name: &str) -> ExtractionWarning {
    ExtractionWarning::FieldNotFound {
        field: name.to_owned(),
    }
}

/// 一次调用的单个入参。
pub enum CallArg<'a> {
    /// 字符串或已字符串化的原始类型。
    Scalar(Cow<'a, str>),
    /// 可按字段名读取的结构化入参。
    Record(&'a dyn FieldAccess),
}

impl<'a> CallArg<'a> {
    pub fn scalar(value: impl Into<Cow<'a, str>>) -> Self {
        CallArg::Scalar(value.into())
    }

    pub fn record(value: &'a dyn FieldAccess) -> Self {
        CallArg::Record(value)
    }
}

impl fmt::Debug for CallArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            CallArg::Record(_) => f.write_str("Record(..)"),
        }
    }
}

impl<'a> From<&'a str> for CallArg<'a> {
    fn from(value: &'a str) -> Self {
        CallArg::Scalar(Cow::Borrowed(value))
    }
}

impl From<String> for CallArg<'_> {
    fn from(value: String) -> Self {
        CallArg::Scalar(Cow::Owned(value))
    }
}

impl<'a, T: FieldAccess> From<&'a T> for CallArg<'a> {
    fn from(value: &'a T) -> Self {
        CallArg::Record(value)
    }
}

macro_rules! scalar_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CallArg<'_> {
                fn from(value: $ty) -> Self {
                    CallArg::Scalar(Cow::Owned(value.to_string()))
                }
            }
        )*
    };
}

scalar_from_display!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize, bool, char);

/// 非空白的路由键值。
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// 空白字符串返回 `None`。
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 从入参中提取名为 `key_name` 的路由键。
pub fn extract(key_name: &str, args: &[CallArg<'_>]) -> Result<RoutingKey, RouterError> {
    if let [CallArg::Scalar(value)] = args {
        return RoutingKey::new(value.as_ref())
            .ok_or_else(|| RouterError::missing_key(key_name));
    }

    for (index, arg) in args.iter().enumerate() {
        let record = match arg {
            CallArg::Record(record) => *record,
            CallArg::Scalar(_) => {
                let warning = ExtractionWarning::NotARecord {
                    index,
                    field: key_name.to_owned(),
                };
                tracing::warn!(index, %warning, "skipping argument while extracting routing key");
                continue;
            }
        };
        match record.field(key_name) {
            Ok(Some(value)) => {
                if let Some(key) = RoutingKey::new(value) {
                    return Ok(key);
                }
            }
            Ok(None) => {}
            Err(warning) => {
                tracing::warn!(index, %warning, "skipping argument while extracting routing key");
            }
        }
    }

    Err(RouterError::missing_key(key_name))
}
