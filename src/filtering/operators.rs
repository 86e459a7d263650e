use sea_orm::{
    Condition, DatabaseBackend,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use super::fields::FieldPath;

/// Escape LIKE wildcards so user input only ever matches literally.
/// Escapes: `\` first, then `%` and `_`.
#[must_use]
pub fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `%value%` with the value's own wildcards escaped
#[must_use]
pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like_wildcards(value))
}

/// `ESCAPE` operand matching [`escape_like_wildcards`]
const LIKE_ESCAPE: &str = r"'\'";

/// `target ILIKE pattern ESCAPE '\'` as one flat expression; sea-query would
/// parenthesise `pattern ESCAPE ..` after a Postgres operator, which Postgres rejects.
fn pg_ilike(operator: &str, target: Expr, pattern: String) -> SimpleExpr {
    Expr::cust_with_exprs(
        format!("$1 {operator} $2 ESCAPE $3"),
        [target.into(), pattern.into(), Expr::cust(LIKE_ESCAPE)],
    )
}

/// Case-insensitive `target LIKE pattern` for the connected backend.
///
/// `PostgreSQL` gets `ILIKE`; `MySQL` and `SQLite` compare `LOWER(target)` against
/// the lowered pattern. The pattern must already be escaped.
#[must_use]
pub fn like_ci(backend: DatabaseBackend, target: Expr, pattern: String) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => pg_ilike("ILIKE", target, pattern),
        DatabaseBackend::MySql | DatabaseBackend::Sqlite => Expr::expr(Func::lower(target))
            .like(LikeExpr::new(pattern.to_lowercase()).escape('\\')),
    }
}

/// Case-insensitive `target NOT LIKE pattern` for the connected backend.
#[must_use]
pub fn not_like_ci(backend: DatabaseBackend, target: Expr, pattern: String) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => pg_ilike("NOT ILIKE", target, pattern),
        DatabaseBackend::MySql | DatabaseBackend::Sqlite => Expr::expr(Func::lower(target))
            .not_like(LikeExpr::new(pattern.to_lowercase()).escape('\\')),
    }
}

/// Comparison applied by an `input_text` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextOperator {
    Is,
    IsNot,
    StartsWith,
    EndsWith,
    #[default]
    Contains,
    ContainsNot,
    IsEmpty,
    IsNotEmpty,
    IsNull,
    IsNotNull,
    IsBlank,
    IsNotBlank,
}

impl TextOperator {
    pub const ALL: [Self; 12] = [
        Self::Is,
        Self::IsNot,
        Self::StartsWith,
        Self::EndsWith,
        Self::Contains,
        Self::ContainsNot,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::IsNull,
        Self::IsNotNull,
        Self::IsBlank,
        Self::IsNotBlank,
    ];

    /// Parse an operator identifier, ignoring case. Unknown identifiers yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Contains => "contains",
            Self::ContainsNot => "contains_not",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::IsBlank => "is_blank",
            Self::IsNotBlank => "is_not_blank",
        }
    }

    /// Whether the operator compares against the filter value at all
    #[must_use]
    pub const fn takes_value(self) -> bool {
        matches!(
            self,
            Self::Is
                | Self::IsNot
                | Self::StartsWith
                | Self::EndsWith
                | Self::Contains
                | Self::ContainsNot
        )
    }

    /// Build the predicate for `field` and `value`.
    ///
    /// Value-bearing operators with a blank value produce nothing.
    #[must_use]
    pub fn predicate(
        self,
        field: &FieldPath,
        value: &str,
        backend: DatabaseBackend,
    ) -> Option<Condition> {
        if self.takes_value() && value.trim().is_empty() {
            return None;
        }

        let expr = match self {
            Self::Is => field.expr().eq(value),
            Self::IsNot => field.expr().ne(value),
            Self::StartsWith => like_ci(
                backend,
                field.expr(),
                format!("{}%", escape_like_wildcards(value)),
            ),
            Self::EndsWith => like_ci(
                backend,
                field.expr(),
                format!("%{}", escape_like_wildcards(value)),
            ),
            Self::Contains => like_ci(backend, field.expr(), anchored_contains_pattern(value)),
            Self::ContainsNot => not_like_ci(backend, field.expr(), contains_pattern(value)),
            Self::IsEmpty => {
                return Some(
                    Condition::any()
                        .add(field.expr().eq(""))
                        .add(field.expr().is_null()),
                );
            }
            Self::IsNotEmpty => {
                return Some(
                    Condition::all()
                        .add(field.expr().ne(""))
                        .add(field.expr().is_not_null()),
                );
            }
            Self::IsNull => field.expr().is_null(),
            Self::IsNotNull => field.expr().is_not_null(),
            Self::IsBlank => field.expr().eq(""),
            Self::IsNotBlank => {
                return Some(
                    Condition::any()
                        .add(field.expr().ne(""))
                        .add(field.expr().is_null()),
                );
            }
        };

        Some(Condition::all().add(expr))
    }
}

/// Pattern for the `contains` operator.
///
/// A leading `*` anchors the match to the end of the column (`%abc`), a trailing
/// `*` anchors it to the start (`abc%`). With both or neither the value may occur
/// anywhere (`%abc%`).
#[must_use]
pub fn anchored_contains_pattern(value: &str) -> String {
    let leading = value.starts_with('*');
    let trailing = value.len() > 1 && value.ends_with('*');

    match (leading, trailing) {
        (true, false) => format!("%{}", escape_like_wildcards(&value[1..])),
        (false, true) => format!("{}%", escape_like_wildcards(&value[..value.len() - 1])),
        (true, true) => contains_pattern(&value[1..value.len() - 1]),
        (false, false) => contains_pattern(value),
    }
}

impl std::fmt::Display for TextOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
