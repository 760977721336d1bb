use chrono::{NaiveDate, SecondsFormat};
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::{AppError, AppResult};
use crate::models::Movement;

const BOM: &str = "\u{FEFF}";

pub const HEADER: [&str; 7] = [
    "ID",
    "Fecha",
    "Producto",
    "Tipo",
    "Cantidad",
    "Responsable",
    "Motivo",
];

/// Quote `field` only when it holds a delimiter, quote or line break.
fn escaped(field: &str) -> AppResult<String> {
    if field.is_empty() {
        return Ok(String::new());
    }
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    wtr.write_field(field).map_err(anyhow::Error::from)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("flushing CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.into()))
}

/// Render the audit file. `Motivo` is always quoted; the other columns are
/// quoted only when their content needs it.
pub fn movements_csv(movements: &[Movement]) -> AppResult<Vec<u8>> {
    if movements.is_empty() {
        return Err(AppError::BadRequest("no movements to export".to_string()));
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(BOM.as_bytes().to_vec());

    wtr.write_record(HEADER).map_err(anyhow::Error::from)?;

    for m in movements {
        wtr.write_record([
            escaped(&m.id)?,
            m.fecha.to_rfc3339_opts(SecondsFormat::Millis, true),
            escaped(&m.producto_nombre)?,
            m.tipo.to_string(),
            m.cantidad.to_string(),
            escaped(&m.usuario)?,
            format!("\"{}\"", m.motivo.replace('"', "\"\"")),
        ])
        .map_err(anyhow::Error::from)?;
    }

    wtr.into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("flushing CSV: {}", e)))
}

pub fn file_name(date: NaiveDate) -> String {
    format!("auditoria_movimientos_{}.csv", date.format("%Y-%m-%d"))
}
