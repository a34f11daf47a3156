//! The `comments` table schema
//!
//! [`COMMENT_FIELDS`] is the one list of recognized comment attributes. Table
//! creation, parsing and the insert statement all iterate it, so a field added
//! here shows up in all three.
//!
//! Column names are left unquoted, so Postgres folds them to lower case
//! (`commentOnDocumentId` is stored as `commentondocumentid`).

use std::fmt;

pub const COMMENTS_TABLE: &str = "comments";

/// Storage type of an attribute column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Timestamp,
    Boolean,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One recognized attribute under `data.attributes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: ColumnKind::Text }
}

const fn integer(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: ColumnKind::Integer }
}

const fn timestamp(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: ColumnKind::Timestamp }
}

const fn boolean(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: ColumnKind::Boolean }
}

pub const FIELD_COUNT: usize = 45;

/// Columns per inserted row: `id`, `apiurl` and every attribute.
pub const COLUMNS_PER_ROW: usize = FIELD_COUNT + 2;

pub static COMMENT_FIELDS: [FieldSpec; FIELD_COUNT] = [
    text("commentOn"),
    text("commentOnDocumentId"),
    integer("duplicateComments"),
    text("address1"),
    text("address2"),
    text("agencyId"),
    text("city"),
    text("category"),
    text("comment"),
    text("country"),
    text("docAbstract"),
    text("docketId"),
    text("documentType"),
    text("email"),
    text("fax"),
    text("field1"),
    text("field2"),
    text("fileFormats"),
    text("firstName"),
    text("govAgency"),
    text("govAgencyType"),
    text("objectId"),
    text("lastName"),
    text("legacyId"),
    timestamp("modifyDate"),
    text("organization"),
    text("originalDocumentId"),
    integer("pageCount"),
    text("phone"),
    timestamp("postedDate"),
    timestamp("postmarkDate"),
    text("reasonWithdrawn"),
    timestamp("receiveDate"),
    text("restrictReason"),
    text("restrictReasonType"),
    text("stateProvinceRegion"),
    text("submitterRep"),
    text("submitterRepAddress"),
    text("submitterRepCityState"),
    text("subtype"),
    text("title"),
    text("trackingNbr"),
    boolean("withdrawn"),
    text("zip"),
    boolean("openForComment"),
];

pub fn field_index(name: &str) -> Option<usize> {
    COMMENT_FIELDS.iter().position(|field| field.name == name)
}

/// `id, apiurl, commentOn, ...` in insert order
pub fn column_list() -> String {
    ["id", "apiurl"]
        .into_iter()
        .chain(COMMENT_FIELDS.iter().map(|field| field.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table_sql() -> String {
    let mut columns = vec![
        "    id TEXT PRIMARY KEY".to_string(),
        "    apiurl TEXT".to_string(),
    ];
    columns.extend(
        COMMENT_FIELDS
            .iter()
            .map(|field| format!("    {} {}", field.name, field.kind.sql_type())),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        COMMENTS_TABLE,
        columns.join(",\n")
    )
}

pub fn drop_table_sql() -> String {
    format!("DROP TABLE IF EXISTS {}", COMMENTS_TABLE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = COMMENT_FIELDS.iter().map(|f| f.name.to_lowercase()).collect();
        assert_eq!(names.len(), FIELD_COUNT);
        assert!(!names.contains("id"));
        assert!(!names.contains("apiurl"));
    }

    #[test]
    fn test_typed_columns() {
        let kind = |name| COMMENT_FIELDS[field_index(name).unwrap()].kind;
        assert_eq!(kind("duplicateComments"), ColumnKind::Integer);
        assert_eq!(kind("pageCount"), ColumnKind::Integer);
        assert_eq!(kind("postedDate"), ColumnKind::Timestamp);
        assert_eq!(kind("withdrawn"), ColumnKind::Boolean);
        assert_eq!(kind("openForComment"), ColumnKind::Boolean);
        assert_eq!(kind("comment"), ColumnKind::Text);
    }

    #[test]
    fn test_create_table_sql_covers_every_field() {
        let sql = create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS comments ("));
        assert!(sql.contains("id TEXT PRIMARY KEY"));
        for field in COMMENT_FIELDS.iter() {
            assert!(
                sql.contains(&format!("{} {}", field.name, field.kind.sql_type())),
                "missing column {}",
                field.name
            );
        }
    }

    #[test]
    fn test_column_list_order() {
        let columns = column_list();
        let parts: Vec<_> = columns.split(", ").collect();
        assert_eq!(parts.len(), COLUMNS_PER_ROW);
        assert_eq!(&parts[..3], &["id", "apiurl", "commentOn"]);
        assert_eq!(parts.last(), Some(&"openForComment"));
    }
}
