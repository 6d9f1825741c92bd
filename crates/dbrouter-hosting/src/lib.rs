#![deny(unsafe_code)]
//! dbrouter-hosting: 从配置文件装配分库分表路由。
//!
//! # 教案式概览
//! - **意图（Why）**：核心库与动态数据源都只提供构件，本 crate 负责在启动期读入配置、
//!   校验引用关系并把构件组装成一个 [`RouterHost`]。
//! - **结构（How）**：[`settings`] 描述 TOML 格式；[`RouterHostBuilder`] 执行校验与装配，
//!   并允许替换分片策略。
//! - **契约（What）**：装配失败统一返回 [`HostError`]；成功后的 [`RouterHost`] 只读共享，
//!   运行期唯一可变的是动态数据源的目标库表。
//!
//! ```
//! use dbrouter_core::{DbRouter, RouterError};
//! use dbrouter_dynamic::{DbRouterStrategy, ResolveError};
//! use dbrouter_hosting::RouterHost;
//!
//! #[derive(Debug)]
//! enum DaoError {
//!     Router(RouterError),
//!     Resolve(ResolveError),
//! }
//!
//! impl From<RouterError> for DaoError {
//!     fn from(value: RouterError) -> Self {
//!         DaoError::Router(value)
//!     }
//! }
//!
//! impl From<ResolveError> for DaoError {
//!     fn from(value: ResolveError) -> Self {
//!         DaoError::Resolve(value)
//!     }
//! }
//!
//! let host = RouterHost::from_toml_str(r#"
//!     [router]
//!     db_count = 2
//!     table_count = 4
//!     routing_key = "userId"
//!
//!     [datasource]
//!     list = ["db01", "db02"]
//!     default = "db00"
//!     [datasource.targets.db00]
//!     url = "mysql://127.0.0.1:3306/lottery"
//!     username = "root"
//!     [datasource.targets.db01]
//!     url = "mysql://127.0.0.1:3306/lottery_01"
//!     username = "root"
//!     [datasource.targets.db02]
//!     url = "mysql://127.0.0.1:3306/lottery_02"
//!     username = "root"
//! "#)?;
//!
//! let (connection, sql) = host
//!     .aspect()
//!     .around(&DbRouter::default(), &["10000001".into()], || {
//!         let connection = host.select_connection()?;
//!         let sql = host.rewrite("select * from user", DbRouterStrategy::SPLIT)?;
//!         Ok::<_, DaoError>((connection, sql.into_owned()))
//!     })
//!     .expect("routed call succeeds");
//! assert!(connection.url.starts_with("mysql://127.0.0.1:3306/lottery_0"));
//! assert!(sql.starts_with("select * from user_00"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
pub mod error;
mod host;
pub mod settings;

pub use builder::RouterHostBuilder;
pub use error::HostError;
pub use host::RouterHost;
pub use settings::{DataSourceSection, RouterSection, RouterSettings};
