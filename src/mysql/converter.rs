// ABOUTME: MySQL column and value conversion for script output
// ABOUTME: Maps driver column types to declared type names and values to cells

use crate::dump::{Cell, TypeClass};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Value};

/// Binary collation id; string-family columns with it hold raw bytes
const BINARY_CHARSET: u16 = 63;

/// Declared type name of a result column, as the server describes it
///
/// Unsigned integer and decimal columns are prefixed with `UNSIGNED `.
pub fn declared_type_name(column: &Column) -> String {
    let binary = column.character_set() == BINARY_CHARSET;
    let name = match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY => "TINYINT",
        ColumnType::MYSQL_TYPE_SHORT => "SMALLINT",
        ColumnType::MYSQL_TYPE_INT24 => "MEDIUMINT",
        ColumnType::MYSQL_TYPE_LONG => "INT",
        ColumnType::MYSQL_TYPE_LONGLONG => "BIGINT",
        ColumnType::MYSQL_TYPE_FLOAT => "FLOAT",
        ColumnType::MYSQL_TYPE_DOUBLE => "DOUBLE",
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
        ColumnType::MYSQL_TYPE_YEAR => "YEAR",
        ColumnType::MYSQL_TYPE_BIT => "BIT",
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => "DATE",
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => "TIME",
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_DATETIME2 => "DATETIME",
        ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP",
        ColumnType::MYSQL_TYPE_JSON => "JSON",
        ColumnType::MYSQL_TYPE_ENUM => "ENUM",
        ColumnType::MYSQL_TYPE_SET => "SET",
        ColumnType::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        ColumnType::MYSQL_TYPE_NULL => "NULL",
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING if binary => {
            "VARBINARY"
        }
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => "VARCHAR",
        ColumnType::MYSQL_TYPE_STRING if binary => "BINARY",
        ColumnType::MYSQL_TYPE_STRING => "CHAR",
        ColumnType::MYSQL_TYPE_TINY_BLOB if binary => "TINYBLOB",
        ColumnType::MYSQL_TYPE_TINY_BLOB => "TINYTEXT",
        ColumnType::MYSQL_TYPE_MEDIUM_BLOB if binary => "MEDIUMBLOB",
        ColumnType::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUMTEXT",
        ColumnType::MYSQL_TYPE_LONG_BLOB if binary => "LONGBLOB",
        ColumnType::MYSQL_TYPE_LONG_BLOB => "LONGTEXT",
        ColumnType::MYSQL_TYPE_BLOB if binary => "BLOB",
        ColumnType::MYSQL_TYPE_BLOB => "TEXT",
        _ => "UNKNOWN",
    };

    if column.flags().contains(ColumnFlags::UNSIGNED_FLAG) {
        format!("UNSIGNED {}", name)
    } else {
        name.to_string()
    }
}

/// Encoding class of a result column
pub fn column_type_class(column: &Column) -> TypeClass {
    TypeClass::from_declared(&declared_type_name(column))
}

/// Converts a driver value into a cell of the given class
///
/// Text-protocol results arrive as `Value::Bytes` and are passed through
/// untouched. Binary-protocol values are rendered the way the server would
/// print them.
pub fn value_to_cell(value: Value, class: TypeClass) -> Cell {
    let raw = match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes),
        Value::Int(i) => Some(i.to_string().into_bytes()),
        Value::UInt(u) => Some(u.to_string().into_bytes()),
        Value::Float(f) => Some(f.to_string().into_bytes()),
        Value::Double(d) => Some(d.to_string().into_bytes()),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            let mut text = format!("{:04}-{:02}-{:02}", year, month, day);
            if hour != 0 || minute != 0 || second != 0 || micro != 0 {
                text.push_str(&format!(" {:02}:{:02}:{:02}", hour, minute, second));
                if micro != 0 {
                    text.push_str(&format!(".{:06}", micro));
                }
            }
            Some(text.into_bytes())
        }
        Value::Time(is_negative, days, hours, minutes, seconds, micro) => {
            let sign = if is_negative { "-" } else { "" };
            let total_hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds);
            if micro != 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            Some(text.into_bytes())
        }
    };

    Cell::new(raw, class)
}
