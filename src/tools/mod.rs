//! Market-data tools
//!
//! The tool set is closed: every request the model can make is a variant of
//! [`ToolRequest`], decoded (and validated) from the model's function call
//! before anything is executed. Invocation is an exhaustive match, so there
//! is no name lookup left to fail at execution time.

use crate::error::AdvisorError;
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

pub mod polygon;
pub use polygon::PolygonClient;

/// The fixed set of tools advertised to the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    LastQuote,
    TickerNews,
    Financials,
    Aggregates,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::LastQuote,
        ToolKind::TickerNews,
        ToolKind::Financials,
        ToolKind::Aggregates,
    ];

    /// Function name the model uses to call this tool
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::LastQuote => "polygon_last_quote",
            ToolKind::TickerNews => "polygon_ticker_news",
            ToolKind::Financials => "polygon_financials",
            ToolKind::Aggregates => "polygon_aggregates",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::LastQuote => {
                "A wrapper around Polygon's Last Quote API. Useful for fetching the \
                 latest price of a stock. Input should be the ticker that you want \
                 to query the last price quote for."
            }
            ToolKind::TickerNews => {
                "A wrapper around Polygon's Ticker News API. Useful for fetching the \
                 latest news for a stock. Input should be the ticker that you want \
                 to get the latest news for."
            }
            ToolKind::Financials => {
                "A wrapper around Polygon's Stock Financials API. Useful for fetching \
                 fundamental financials from SEC filings (income statement, balance \
                 sheet, cash flow) for a stock. Input should be the ticker."
            }
            ToolKind::Aggregates => {
                "A wrapper around Polygon's Aggregates API. Useful for fetching \
                 aggregate bars (open, high, low, close, volume) for a stock over a \
                 date range with a given timespan."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// JSON schema of the function arguments
    pub fn parameters(&self) -> Value {
        match self {
            ToolKind::LastQuote | ToolKind::TickerNews | ToolKind::Financials => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Stock ticker symbol, e.g. AAPL"
                    }
                },
                "required": ["query"]
            }),
            ToolKind::Aggregates => {
                let timespans: Vec<&str> = Timespan::ALL.iter().map(Timespan::as_str).collect();
                json!({
                    "type": "object",
                    "properties": {
                        "ticker": {
                            "type": "string",
                            "description": "The ticker symbol to fetch aggregates for."
                        },
                        "timespan": {
                            "type": "string",
                            "enum": timespans,
                            "description": "The size of the time window."
                        },
                        "timespan_multiplier": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "The number of timespans to aggregate, e.g. 5 with 'minute' gives 5-minute bars."
                        },
                        "from_date": {
                            "type": "string",
                            "description": "Start of the aggregate window, YYYY-MM-DD."
                        },
                        "to_date": {
                            "type": "string",
                            "description": "End of the aggregate window, YYYY-MM-DD."
                        }
                    },
                    "required": ["ticker", "timespan", "timespan_multiplier", "from_date", "to_date"]
                })
            }
        }
    }

    /// Chat-completions `tools` entry for this tool
    pub fn definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Timespan {
    pub const ALL: [Timespan; 8] = [
        Timespan::Second,
        Timespan::Minute,
        Timespan::Hour,
        Timespan::Day,
        Timespan::Week,
        Timespan::Month,
        Timespan::Quarter,
        Timespan::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Second => "second",
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
            Timespan::Quarter => "quarter",
            Timespan::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickerInput {
    #[serde(alias = "ticker")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregatesInput {
    pub ticker: String,
    pub timespan: Timespan,
    pub timespan_multiplier: u32,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// A validated tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tool", content = "input", rename_all = "snake_case")]
pub enum ToolRequest {
    LastQuote(TickerInput),
    TickerNews(TickerInput),
    Financials(TickerInput),
    Aggregates(AggregatesInput),
}

impl ToolRequest {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolRequest::LastQuote(_) => ToolKind::LastQuote,
            ToolRequest::TickerNews(_) => ToolKind::TickerNews,
            ToolRequest::Financials(_) => ToolKind::Financials,
            ToolRequest::Aggregates(_) => ToolKind::Aggregates,
        }
    }

    /// Decode a model function call (`name` + JSON-encoded `arguments`).
    ///
    /// Unknown names and malformed arguments are rejected here so the
    /// request aborts before any tool runs.
    pub fn from_function_call(name: &str, arguments: &str) -> Result<Self> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| AdvisorError::UnknownTool(name.to_string()))?;

        let arguments = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str::<Value>(arguments).map_err(|e| {
                AdvisorError::InvalidToolInput(format!("{}: arguments are not JSON: {}", name, e))
            })?
        };

        Self::from_arguments(kind, arguments)
    }

    pub fn from_arguments(kind: ToolKind, arguments: Value) -> Result<Self> {
        // Single-input tools may be called with a bare string.
        let arguments = match arguments {
            Value::String(s) if kind != ToolKind::Aggregates => json!({ "query": s }),
            other => other,
        };

        let invalid = |e: serde_json::Error| {
            AdvisorError::InvalidToolInput(format!("{}: {}", kind.name(), e))
        };

        let request = match kind {
            ToolKind::LastQuote => {
                ToolRequest::LastQuote(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::TickerNews => {
                ToolRequest::TickerNews(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::Financials => {
                ToolRequest::Financials(serde_json::from_value(arguments).map_err(invalid)?)
            }
            ToolKind::Aggregates => {
                ToolRequest::Aggregates(serde_json::from_value(arguments).map_err(invalid)?)
            }
        };

        request.normalized()
    }

    /// Arguments as the model would send them (for replaying the call).
    pub fn arguments(&self) -> Value {
        match self {
            ToolRequest::LastQuote(input)
            | ToolRequest::TickerNews(input)
            | ToolRequest::Financials(input) => json!({ "query": input.query }),
            ToolRequest::Aggregates(input) => json!({
                "ticker": input.ticker,
                "timespan": input.timespan.as_str(),
                "timespan_multiplier": input.timespan_multiplier,
                "from_date": input.from_date.format("%Y-%m-%d").to_string(),
                "to_date": input.to_date.format("%Y-%m-%d").to_string(),
            }),
        }
    }

    fn normalized(self) -> Result<Self> {
        let kind = self.kind();
        match self {
            ToolRequest::LastQuote(input) => Ok(ToolRequest::LastQuote(normalize_ticker(kind, input)?)),
            ToolRequest::TickerNews(input) => Ok(ToolRequest::TickerNews(normalize_ticker(kind, input)?)),
            ToolRequest::Financials(input) => Ok(ToolRequest::Financials(normalize_ticker(kind, input)?)),
            ToolRequest::Aggregates(mut input) => {
                input.ticker = clean_ticker(kind, &input.ticker)?;
                if input.timespan_multiplier == 0 {
                    return Err(AdvisorError::InvalidToolInput(format!(
                        "{}: timespan_multiplier must be at least 1",
                        kind.name()
                    )));
                }
                if input.from_date > input.to_date {
                    return Err(AdvisorError::InvalidToolInput(format!(
                        "{}: from_date {} is after to_date {}",
                        kind.name(),
                        input.from_date,
                        input.to_date
                    )));
                }
                Ok(ToolRequest::Aggregates(input))
            }
        }
    }
}

fn normalize_ticker(kind: ToolKind, input: TickerInput) -> Result<TickerInput> {
    Ok(TickerInput {
        query: clean_ticker(kind, &input.query)?,
    })
}

fn clean_ticker(kind: ToolKind, raw: &str) -> Result<String> {
    let ticker = raw.trim().trim_start_matches('$').to_uppercase();
    if ticker.is_empty() {
        return Err(AdvisorError::InvalidToolInput(format!(
            "{}: ticker must not be empty",
            kind.name()
        )));
    }
    Ok(ticker)
}

/// Source of market data the tools read from
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn last_quote(&self, ticker: &str) -> Result<Value>;
    async fn ticker_news(&self, ticker: &str) -> Result<Value>;
    async fn financials(&self, ticker: &str) -> Result<Value>;
    async fn aggregates(&self, input: &AggregatesInput) -> Result<Value>;
}

/// The immutable tool set shared by every session
#[derive(Clone)]
pub struct ToolSet {
    source: Arc<dyn MarketDataSource>,
}

impl ToolSet {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// Tool definitions advertised to the model
    pub fn definitions(&self) -> Vec<Value> {
        ToolKind::ALL.iter().map(ToolKind::definition).collect()
    }

    /// Run a tool and return its observation text
    pub async fn invoke(&self, request: &ToolRequest) -> Result<String> {
        let data = match request {
            ToolRequest::LastQuote(input) => self.source.last_quote(&input.query).await?,
            ToolRequest::TickerNews(input) => self.source.ticker_news(&input.query).await?,
            ToolRequest::Financials(input) => self.source.financials(&input.query).await?,
            ToolRequest::Aggregates(input) => self.source.aggregates(input).await?,
        };

        Ok(serde_json::to_string(&data)?)
    }
}
