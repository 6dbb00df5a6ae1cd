use std::error::Error;

use tokio_postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::{RowValues, hex_bytes};

/// Borrowed parameter list in the shape `tokio-postgres` expects.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let references = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Params { references }
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Text form of a value as the server's input functions read it; `None` for NULL.
#[must_use]
pub fn postgres_text(value: &RowValues) -> Option<String> {
    match value {
        RowValues::Null => None,
        RowValues::Int(i) => Some(i.to_string()),
        RowValues::Float(f) if f.is_infinite() => Some(
            if f.is_sign_positive() { "Infinity" } else { "-Infinity" }.to_string(),
        ),
        RowValues::Float(f) => Some(f.to_string()),
        RowValues::Text(s) => Some(s.clone()),
        RowValues::Bool(b) => Some(b.to_string()),
        RowValues::Timestamp(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::JSON(value) => Some(value.to_string()),
        RowValues::Blob(bytes) => Some(hex_bytes(bytes)),
    }
}

// Parameters go out in text format and the server parses them for whatever type it
// inferred, so `'5'` bound to `$1::int` works the same as a literal would.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match postgres_text(self) {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}
