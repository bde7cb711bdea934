use thiserror::Error;

/// Errors raised while loading news or price data.
///
/// These never abort the batch: callers log them and degrade to an empty
/// result for the failing input.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read or parse {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("unparseable date '{value}' in {path}")]
    Date { value: String, path: String },

    #[error("price history fetch failed for {ticker}: {reason}")]
    Fetch { ticker: String, reason: String },
}
