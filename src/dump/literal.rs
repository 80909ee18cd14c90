// ABOUTME: Renders single cell values as SQL literal text
// ABOUTME: Classifies declared column types and escapes textual data byte-for-byte

/// Declared type names rendered as bare numbers. Everything else is quoted.
const NUMERIC_TYPES: &[&str] = &[
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "INT",
    "INTEGER",
    "BIGINT",
    "FLOAT",
    "DOUBLE",
    "DOUBLE PRECISION",
    "REAL",
    "DECIMAL",
    "DEC",
    "NUMERIC",
    "FIXED",
];

/// How a column's values are written into the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Integer, floating-point and fixed-point columns, written unquoted
    Numeric,
    /// Character, temporal, binary, JSON, enum/set and anything unrecognized
    Textual,
}

impl TypeClass {
    /// Classifies a declared database type name such as `UNSIGNED BIGINT`,
    /// `decimal(10,2)` or `VARCHAR`.
    ///
    /// `UNSIGNED`/`ZEROFILL` qualifiers and any width suffix are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_backup::dump::TypeClass;
    /// assert_eq!(TypeClass::from_declared("UNSIGNED INT"), TypeClass::Numeric);
    /// assert_eq!(TypeClass::from_declared("decimal(10,2)"), TypeClass::Numeric);
    /// assert_eq!(TypeClass::from_declared("DATETIME"), TypeClass::Textual);
    /// ```
    pub fn from_declared(type_name: &str) -> Self {
        let base = type_name.split('(').next().unwrap_or_default();
        let normalized = base
            .split_whitespace()
            .filter(|word| {
                !word.eq_ignore_ascii_case("UNSIGNED")
                    && !word.eq_ignore_ascii_case("SIGNED")
                    && !word.eq_ignore_ascii_case("ZEROFILL")
            })
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        if NUMERIC_TYPES.contains(&normalized.as_str()) {
            TypeClass::Numeric
        } else {
            TypeClass::Textual
        }
    }
}

/// One cell of a fetched row, classified once from its column's declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Numeric(Vec<u8>),
    Textual(Vec<u8>),
}

impl Cell {
    /// Builds a cell from raw driver bytes (`None` is SQL NULL)
    pub fn new(raw: Option<Vec<u8>>, class: TypeClass) -> Self {
        match (raw, class) {
            (None, _) => Cell::Null,
            (Some(bytes), TypeClass::Numeric) => Cell::Numeric(bytes),
            (Some(bytes), TypeClass::Textual) => Cell::Textual(bytes),
        }
    }

    /// Appends this cell's literal to `out`
    pub fn write_literal(&self, out: &mut Vec<u8>) {
        match self {
            Cell::Null => out.extend_from_slice(b"null"),
            Cell::Numeric(text) => out.extend_from_slice(text),
            Cell::Textual(bytes) => {
                out.reserve(bytes.len() + 2);
                out.push(b'\'');
                escape_into(bytes, out);
                out.push(b'\'');
            }
        }
    }
}

/// Encodes one value as literal text
///
/// NULL wins over the type class; numeric text passes through untouched;
/// textual data is escaped and single-quoted.
///
/// # Examples
///
/// ```
/// # use mysql_backup::dump::{encode_literal, TypeClass};
/// assert_eq!(encode_literal(b"O'Brien", false, TypeClass::Textual), b"'O\\'Brien'");
/// assert_eq!(encode_literal(b"42", false, TypeClass::Numeric), b"42");
/// assert_eq!(encode_literal(b"", true, TypeClass::Numeric), b"null");
/// ```
pub fn encode_literal(value: &[u8], is_null: bool, class: TypeClass) -> Vec<u8> {
    let cell = if is_null {
        Cell::Null
    } else {
        Cell::new(Some(value.to_vec()), class)
    };
    let mut out = Vec::with_capacity(value.len() + 2);
    cell.write_literal(&mut out);
    out
}

/// Prefixes every `\` and `'` byte with a backslash.
///
/// Works on raw bytes so non-UTF-8 content (BLOBs) is copied verbatim; both
/// escaped characters are ASCII and never occur inside a multi-byte UTF-8
/// sequence.
pub fn escape_into(input: &[u8], out: &mut Vec<u8>) {
    for &byte in input {
        if byte == b'\\' || byte == b'\'' {
            out.push(b'\\');
        }
        out.push(byte);
    }
}
