//! Static, read-only schema tables answered without touching the backing
//! store: the server version string, the single known table, and the
//! `users` column descriptor.

use crate::protocol::mysql::basic::Column;
use mysql_common::constants::ColumnType;

pub const SERVER_VERSION_STR: &str = "8.0.36-mini-mysql-redis";
pub const USERS_TABLE: &str = "users";

pub fn version_columns() -> Vec<Column> {
    vec![Column::new("", "@@version", ColumnType::MYSQL_TYPE_VAR_STRING)]
}

pub fn version_rows() -> Vec<Vec<Option<String>>> {
    vec![vec![Some(SERVER_VERSION_STR.to_string())]]
}

pub fn show_tables_columns(db: &str) -> Vec<Column> {
    vec![Column::new(
        "",
        &format!("Tables_in_{db}"),
        ColumnType::MYSQL_TYPE_VAR_STRING,
    )]
}

pub fn show_tables_rows() -> Vec<Vec<Option<String>>> {
    vec![vec![Some(USERS_TABLE.to_string())]]
}

pub fn describe_columns() -> Vec<Column> {
    vec![
        Column::new("", "Field", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "Type", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "Null", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "Key", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "Default", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "Extra", ColumnType::MYSQL_TYPE_VAR_STRING),
    ]
}

fn describe_row(field: &str, ty: &str, null: &str, key: &str) -> Vec<Option<String>> {
    vec![
        Some(field.to_string()),
        Some(ty.to_string()),
        Some(null.to_string()),
        Some(key.to_string()),
        None,
        Some(String::new()),
    ]
}

pub fn describe_users_rows() -> Vec<Vec<Option<String>>> {
    vec![
        describe_row("id", "varchar(255)", "NO", "PRI"),
        describe_row("name", "varchar(255)", "YES", ""),
        describe_row("email", "varchar(255)", "YES", ""),
        describe_row("age", "int", "YES", ""),
        describe_row("created_at", "datetime", "YES", ""),
    ]
}

pub fn users_row_columns() -> Vec<Column> {
    vec![
        Column::new(USERS_TABLE, "id", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new(USERS_TABLE, "name", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new(USERS_TABLE, "email", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new(USERS_TABLE, "age", ColumnType::MYSQL_TYPE_LONG),
        Column::new(
            USERS_TABLE,
            "created_at",
            ColumnType::MYSQL_TYPE_VAR_STRING,
        ),
    ]
}

pub fn token_verify_columns() -> Vec<Column> {
    vec![
        Column::new("", "verified", ColumnType::MYSQL_TYPE_LONG),
        Column::new("", "user_id", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "facility", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "verified_at", ColumnType::MYSQL_TYPE_VAR_STRING),
        Column::new("", "data", ColumnType::MYSQL_TYPE_VAR_STRING),
    ]
}

pub fn rejected_columns() -> Vec<Column> {
    vec![Column::new("", "result", ColumnType::MYSQL_TYPE_VAR_STRING)]
}
