//! TOML 形式的路由与数据源配置。
//!
//! # 教案式说明
//! - **意图（Why）**：把分库数、分表数、路由字段与各物理库的连接参数集中写在一份配置文件里，
//!   启动时一次性读入，业务代码不再手工拼装 [`RouterConfig`] 与数据源映射。
//! - **格式（What）**：
//!
//! ```toml
//! [router]
//! db_count = 2
//! table_count = 4
//! routing_key = "userId"
//! # fallback_key = "10000000"
//! # reentrancy = "clear"
//!
//! [router.naming]          # 可选，缺省生成 db01 / user_000
//! db_width = 2
//!
//! [datasource]
//! list = ["db01", "db02"]
//! default = "db00"
//!
//! [datasource.targets.db00]
//! url = "mysql://127.0.0.1:3306/lottery"
//! username = "root"
//! password = "123456"
//! ```
//!
//! - **风险提示（Trade-offs）**：未知字段直接拒绝，拼写错误会在启动期暴露，而不是被静默忽略。

use std::{collections::BTreeMap, fs, path::Path};

use dbrouter_core::{ReentrancyPolicy, RouterConfig, RouterError, ShardNaming};
use dbrouter_dynamic::DataSourceSettings;
use serde::Deserialize;

use crate::error::HostError;

/// 配置文件的根。
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSettings {
    pub router: RouterSection,
    #[serde(default)]
    pub datasource: DataSourceSection,
}

/// `[router]` 段。
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    pub db_count: u32,
    pub table_count: u32,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub fallback_key: Option<String>,
    #[serde(default)]
    pub reentrancy: ReentrancyPolicy,
    #[serde(default)]
    pub naming: ShardNaming,
}

/// `[datasource]` 段。
///
/// `list` 为空时，`targets` 中除默认库之外的全部条目都视为分片库。
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceSection {
    #[serde(default)]
    pub list: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, DataSourceSettings>,
}

impl RouterSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, HostError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "router settings loaded");
        Self::from_toml_str(&source)
    }

    /// 由 `[router]` 段构造并校验 [`RouterConfig`]。
    pub fn router_config(&self) -> Result<RouterConfig, RouterError> {
        let router = &self.router;
        let mut builder = RouterConfig::builder(router.db_count, router.table_count)
            .routing_key(router.routing_key.as_str())
            .reentrancy(router.reentrancy)
            .naming(router.naming.clone());
        if let Some(fallback_key) = &router.fallback_key {
            builder = builder.fallback_key(fallback_key.as_str());
        }
        builder.build()
    }
}

impl DataSourceSection {
    /// 参与分片的数据源编号，保持声明顺序。
    pub fn shard_ids(&self) -> Vec<&str> {
        if !self.list.is_empty() {
            return self.list.iter().map(String::as_str).collect();
        }
        self.targets
            .keys()
            .map(String::as_str)
            .filter(|id| Some(*id) != self.default.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [router]
        db_count = 2
        table_count = 4
        routing_key = "userId"
    "#;

    #[test]
    fn minimal_settings_use_defaults() {
        let settings = RouterSettings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(settings.router.reentrancy, ReentrancyPolicy::Restore);
        assert_eq!(settings.router.naming, ShardNaming::default());
        assert!(settings.datasource.targets.is_empty());

        let config = settings.router_config().unwrap();
        assert_eq!(config.grid_size(), 8);
        assert_eq!(config.routing_key(), Some("userId"));
        assert_eq!(config.fallback_key(), None);
    }

    #[test]
    fn optional_router_fields_are_honoured() {
        let settings = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 4
            table_count = 4
            fallback_key = "guest"
            reentrancy = "clear"

            [router.naming]
            db_prefix = "lottery_"
            table_width = 2
            "#,
        )
        .unwrap();
        let config = settings.router_config().unwrap();
        assert_eq!(config.routing_key(), None);
        assert_eq!(config.fallback_key(), Some("guest"));
        assert_eq!(config.reentrancy(), ReentrancyPolicy::Clear);
        assert_eq!(config.naming().data_source_key(0), "lottery_01");
        assert_eq!(config.naming().physical_table("user", 3), "user_03");
    }

    #[test]
    fn data_source_targets_are_parsed() {
        let settings = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 2
            table_count = 2

            [datasource]
            list = ["db02", "db01"]
            default = "db00"

            [datasource.targets.db00]
            url = "mysql://127.0.0.1:3306/lottery"
            username = "root"

            [datasource.targets.db01]
            url = "mysql://127.0.0.1:3306/lottery_01"
            username = "root"
            password = "123456"
            "#,
        )
        .unwrap();
        let datasource = &settings.datasource;
        assert_eq!(datasource.shard_ids(), vec!["db02", "db01"]);
        assert_eq!(datasource.default.as_deref(), Some("db00"));
        assert_eq!(datasource.targets["db00"].password, "");
        assert_eq!(datasource.targets["db01"].password, "123456");
    }

    #[test]
    fn empty_list_uses_every_non_default_target() {
        let settings = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 2
            table_count = 2

            [datasource]
            default = "db00"

            [datasource.targets.db00]
            url = "a"
            username = "root"
            [datasource.targets.db02]
            url = "c"
            username = "root"
            [datasource.targets.db01]
            url = "b"
            username = "root"
            "#,
        )
        .unwrap();
        assert_eq!(settings.datasource.shard_ids(), vec!["db01", "db02"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 2
            table_count = 2
            tb_count = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, HostError::Parse(_)));
    }

    #[test]
    fn unknown_naming_fields_are_rejected() {
        let err = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 2
            table_count = 2

            [router.naming]
            db_prefx = "lottery_"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, HostError::Parse(_)));
    }

    #[test]
    fn invalid_counts_surface_as_router_error() {
        let settings = RouterSettings::from_toml_str(
            r#"
            [router]
            db_count = 0
            table_count = 2
            "#,
        )
        .unwrap();
        assert!(matches!(
            settings.router_config(),
            Err(RouterError::Configuration { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err =
            RouterSettings::from_path("/definitely/not/here/router.toml").unwrap_err();
        let HostError::Io { path, .. } = err else {
            panic!("expected io error");
        };
        assert!(path.ends_with("router.toml"));
    }
}
