//! 从配置文件到数据访问调用的完整装配链路。

use std::{fs, path::PathBuf, process};

use dbrouter_core::{
    CallArg, DbRouter, ReentrancyPolicy, RouterError, ShardCoordinate, current_shard_coordinate,
};
use dbrouter_dynamic::{ConnectionProvider, DataSourceSettings, DbRouterStrategy, ResolveError};
use dbrouter_hosting::{HostError, RouterHost, RouterSettings};
use serde_json::json;

const SETTINGS: &str = r#"
[router]
db_count = 2
table_count = 4
routing_key = "userId"

[datasource]
list = ["db01", "db02"]
default = "db00"

[datasource.targets.db00]
url = "mysql://127.0.0.1:3306/lottery"
username = "root"
password = "123456"

[datasource.targets.db01]
url = "mysql://127.0.0.1:3306/lottery_01"
username = "root"
password = "123456"

[datasource.targets.db02]
url = "mysql://127.0.0.1:3306/lottery_02"
username = "root"
password = "123456"
"#;

#[derive(Debug)]
enum DaoError {
    Router(RouterError),
    Resolve(ResolveError),
}

impl From<RouterError> for DaoError {
    fn from(value: RouterError) -> Self {
        DaoError::Router(value)
    }
}

impl From<ResolveError> for DaoError {
    fn from(value: ResolveError) -> Self {
        DaoError::Resolve(value)
    }
}

fn host() -> RouterHost {
    RouterHost::from_toml_str(SETTINGS).unwrap()
}

fn host_with(router_line: &str) -> RouterHost {
    let source = SETTINGS.replace(
        "routing_key = \"userId\"",
        &format!("routing_key = \"userId\"\n{router_line}"),
    );
    RouterHost::from_settings(RouterSettings::from_toml_str(&source).unwrap()).unwrap()
}

fn expected_url(shard: ShardCoordinate) -> String {
    format!("mysql://127.0.0.1:3306/lottery_{:02}", shard.db_index + 1)
}

#[test]
fn settings_file_is_loaded_from_disk() {
    let path: PathBuf =
        std::env::temp_dir().join(format!("dbrouter-hosting-{}.toml", process::id()));
    fs::write(&path, SETTINGS).unwrap();
    let loaded = RouterHost::from_path(&path);
    fs::remove_file(&path).unwrap();

    let host = loaded.unwrap();
    assert_eq!(host.config().db_count(), 2);
    assert_eq!(host.config().table_count(), 4);
    assert_eq!(
        host.data_source().target_keys(),
        vec!["db01".to_owned(), "db02".to_owned()]
    );
}

#[test]
fn routed_record_selects_shard_and_table() {
    let host = host();
    let user = json!({ "userId": "user-42", "userNickName": "tester" });
    let expected = host
        .aspect()
        .route(&DbRouter::default(), &["user-42".into()])
        .unwrap();

    let (connection, sql) = host
        .aspect()
        .around(&DbRouter::default(), &[CallArg::record(&user)], || {
            let connection = host.select_connection()?;
            let sql = host.rewrite(
                "select id, user_id from user where user_id = ?",
                DbRouterStrategy::SPLIT,
            )?;
            Ok::<_, DaoError>((connection, sql.into_owned()))
        })
        .unwrap();

    assert_eq!(connection.url, expected_url(expected));
    assert_eq!(
        sql,
        format!(
            "select id, user_id from user_{:03} where user_id = ?",
            expected.table_index
        )
    );
    assert_eq!(current_shard_coordinate(), None);
}

#[test]
fn records_without_key_use_fallback_value() {
    let host = host_with("fallback_key = \"10000001\"");
    let anonymous = json!({ "nickname": "guest" });
    let direct = host
        .aspect()
        .route(&DbRouter::default(), &["10000001".into()])
        .unwrap();
    let via_fallback = host
        .aspect()
        .route(&DbRouter::default(), &[CallArg::record(&anonymous)])
        .unwrap();
    assert_eq!(direct, via_fallback);
}

#[test]
fn per_call_key_overrides_configured_key() {
    let host = host();
    let order = json!({ "userId": "ignored", "orderId": "hello" });
    let by_order = host
        .aspect()
        .route(&DbRouter::key("orderId"), &[CallArg::record(&order)])
        .unwrap();
    let direct = host
        .aspect()
        .route(&DbRouter::default(), &["hello".into()])
        .unwrap();
    assert_eq!(by_order, direct);
}

#[test]
fn unrouted_access_uses_default_data_source() {
    let host = host();
    let connection = host.select_connection().unwrap();
    assert_eq!(connection.url, "mysql://127.0.0.1:3306/lottery");
    assert!(matches!(
        host.rewrite("select * from user", DbRouterStrategy::SPLIT),
        Err(ResolveError::MissingShardContext)
    ));
}

#[test]
fn missing_routing_key_fails_before_proceeding() {
    let host = host();
    let record = json!({ "nickname": "tester" });
    let mut proceeded = false;
    let err = host
        .aspect()
        .around(&DbRouter::default(), &[CallArg::record(&record)], || {
            proceeded = true;
            Ok::<(), DaoError>(())
        })
        .unwrap_err();
    assert!(!proceeded);
    assert!(matches!(err, DaoError::Router(RouterError::MissingRoutingKey { .. })));
}

#[test]
fn async_call_resolves_inside_task_scope() {
    let host = host();
    let expected = host
        .aspect()
        .route(&DbRouter::default(), &["hello".into()])
        .unwrap();
    let data_source = std::sync::Arc::clone(host.data_source());
    let routed = host
        .aspect()
        .around_async(&DbRouter::default(), &["hello".into()], async move {
            Ok::<_, DaoError>(data_source.select_connection()?)
        });
    let connection = futures::executor::block_on(routed).unwrap();
    assert_eq!(connection.url, expected_url(expected));
    assert_eq!(current_shard_coordinate(), None);
}

#[test]
fn hot_update_is_visible_to_clones() {
    let host = host();
    let clone = host.clone();
    host.data_source().update(
        [
            (
                "db01".to_owned(),
                DataSourceSettings::new("mysql://10.0.0.1:3306/lottery_01", "root", ""),
            ),
            (
                "db02".to_owned(),
                DataSourceSettings::new("mysql://10.0.0.2:3306/lottery_02", "root", ""),
            ),
        ],
        None,
    );
    let connection = clone
        .data_source()
        .resolve(Some(ShardCoordinate::new(1, 0)))
        .unwrap();
    assert_eq!(connection.url, "mysql://10.0.0.2:3306/lottery_02");
    assert!(matches!(
        clone.select_connection(),
        Err(ResolveError::NoDefaultDataSource)
    ));
}

#[test]
fn clear_policy_is_applied_from_settings() {
    let host = host_with("reentrancy = \"clear\"");
    assert_eq!(host.config().reentrancy(), ReentrancyPolicy::Clear);

    let outer_after_inner = host
        .aspect()
        .around(&DbRouter::default(), &["hello".into()], || {
            host.aspect()
                .around(&DbRouter::default(), &["user-42".into()], || {
                    Ok::<_, RouterError>(())
                })?;
            Ok::<_, RouterError>(current_shard_coordinate())
        })
        .unwrap();
    assert_eq!(outer_after_inner, None);
}

#[test]
fn broken_settings_are_rejected() {
    assert!(matches!(
        RouterHost::from_toml_str("[router]\ndb_count = 2\n"),
        Err(HostError::Parse(_))
    ));
    assert!(matches!(
        RouterHost::from_toml_str("[router]\ndb_count = 2\ntable_count = 0\n"),
        Err(HostError::Router(RouterError::Configuration { .. }))
    ));
}
