use crate::domain::record::{FundRecord, FIELD_COUNT};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

/// Field layout shared by the downloaded bulk feed and the persisted
/// snapshot. Consumers must see exactly this header before trusting
/// positional field semantics.
pub const FUND_FIELDS: [&str; FIELD_COUNT] = [
    "Scheme Code",
    "ISIN Div Payout/ ISIN Growth",
    "ISIN Div Reinvestment",
    "Scheme Name",
    "Net Asset Value",
    "Date",
];

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub records: Vec<FundRecord>,
    /// Header differed from [`FUND_FIELDS`]. Parsing proceeded best-effort;
    /// the caller surfaces this as a recoverable warning.
    pub schema_mismatch: bool,
    /// Data rows seen, including dropped ones.
    pub total_rows: usize,
    /// Rows whose field count did not match the header's.
    pub dropped_rows: usize,
}

/// Parses a full document in the semicolon-delimited feed format.
///
/// A missing or mismatched header degrades to best-effort parsing of the data
/// rows; a row with the wrong field count is dropped; a row with the right
/// shape but non-numeric NAV text fails the whole parse.
pub fn parse(text: &str) -> Result<ParsedFeed> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();

    let Some(header) = rows.next().transpose().context("reading feed header")? else {
        return Ok(ParsedFeed::default());
    };

    let schema_mismatch = header.len() != FUND_FIELDS.len()
        || header.iter().zip(FUND_FIELDS).any(|(got, expected)| got != expected);
    let header_len = header.len();

    let mut parsed = ParsedFeed {
        schema_mismatch,
        ..ParsedFeed::default()
    };

    for row in rows {
        let row = row.context("reading feed row")?;
        parsed.total_rows += 1;

        // The bulk feed interleaves section headings and blank separators
        // with data rows; anything without the header's shape is skipped.
        if row.len() != header_len || row.len() != FIELD_COUNT {
            parsed.dropped_rows += 1;
            continue;
        }

        let fields: Vec<String> = row.iter().map(str::to_string).collect();
        parsed.records.push(FundRecord::from_fields(&fields)?);
    }

    Ok(parsed)
}

/// Renders the header plus one line per record, the exact inverse of
/// [`parse`] for well-formed input.
pub fn write_records(records: &[FundRecord]) -> Result<String> {
    let mut writer = WriterBuilder::new().delimiter(b';').from_writer(Vec::new());

    writer
        .write_record(FUND_FIELDS)
        .context("writing feed header")?;
    for record in records {
        writer
            .write_record(record.fields())
            .with_context(|| format!("writing record for {:?}", record.scheme_name))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing feed writer: {err}"))?;
    String::from_utf8(bytes).context("feed output is not UTF-8")
}
