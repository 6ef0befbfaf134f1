//! CSV row mapping and best-effort field coercion.
//!
//! Coercion never fails a row: anything that cannot be read as a number
//! simply leaves the field empty.

use csv::{ReaderBuilder, StringRecord};

use crate::models::UserRecord;

/// Header names accepted for the user identifier, in priority order.
pub const USER_ID_COLUMNS: [&str; 3] = ["user_id", "id", "uid"];

/// Parses a floating point value. Surrounding whitespace is ignored.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Parses an integer through a float so that values such as `"30.0"` are
/// accepted, truncating toward zero. Non-finite or out-of-range values are
/// treated as unparseable.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let value = parse_numeric(raw)?.trunc();
    if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Builds a CSV reader over decoded text. Rows shorter than the header are
/// allowed; their missing trailing fields read as absent.
pub fn reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    user_id: Vec<usize>,
    email: Option<usize>,
    monthly_income: Option<usize>,
    credit_score: Option<usize>,
    employment_status: Option<usize>,
    age: Option<usize>,
}

impl ColumnMap {
    /// Header names are matched case-sensitively. When a name repeats, the
    /// right-most column wins.
    pub fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| *h == name)
                .map(|(i, _)| i)
                .last()
        };

        Self {
            user_id: USER_ID_COLUMNS.iter().filter_map(|name| find(*name)).collect(),
            email: find("email"),
            monthly_income: find("monthly_income"),
            credit_score: find("credit_score"),
            employment_status: find("employment_status"),
            age: find("age"),
        }
    }

    pub fn user_record(&self, row: &StringRecord) -> UserRecord {
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i));

        // An empty identifier falls through to the next alias.
        let user_id = self
            .user_id
            .iter()
            .filter_map(|&i| row.get(i))
            .find(|v| !v.is_empty())
            .map(str::to_string);

        UserRecord {
            user_id,
            email: field(self.email).map(str::to_string),
            monthly_income: field(self.monthly_income).and_then(parse_numeric),
            credit_score: field(self.credit_score).and_then(parse_integer),
            employment_status: field(self.employment_status).map(str::to_string),
            age: field(self.age).and_then(parse_integer),
        }
    }
}
