//! Currency-rate provider.
//!
//! The reconciler only needs "how many units of the local currency one unit
//! of the configured currency costs right now". Implementations must return a
//! finite, strictly positive value or an error.

use std::fmt;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RateError {
    /// Network or transport failure.
    Transport(String),
    /// The feed answered with a non-success status.
    Api { status: u16 },
    /// The payload could not be parsed.
    Decode(String),
    /// The configured currency code is absent from the feed.
    CurrencyNotFound { code: String },
    /// The feed listed the code with an unusable value.
    InvalidRate { code: String, raw: String },
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::Transport(msg) => write!(f, "rate transport error: {msg}"),
            RateError::Api { status } => write!(f, "rate feed http error status={status}"),
            RateError::Decode(msg) => write!(f, "rate feed decode error: {msg}"),
            RateError::CurrencyNotFound { code } => {
                write!(f, "currency '{code}' not present in rate feed")
            }
            RateError::InvalidRate { code, raw } => {
                write!(f, "currency '{code}' has unusable rate '{raw}'")
            }
        }
    }
}

impl std::error::Error for RateError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current multiplier for the configured currency.
    async fn get_rate(&self) -> Result<f64, RateError>;
}

// ---------------------------------------------------------------------------
// Central Bank of Russia daily feed
// ---------------------------------------------------------------------------

/// CBR `XML_daily.asp` provider.
///
/// The feed quotes RUB per `Nominal` units; the returned rate is per one unit.
#[derive(Debug, Clone)]
pub struct CbrRateProvider {
    http: reqwest::Client,
    feed_url: String,
    currency: String,
}

impl CbrRateProvider {
    pub fn new(feed_url: String, currency: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            feed_url,
            currency: currency.to_ascii_uppercase(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

#[async_trait::async_trait]
impl RateProvider for CbrRateProvider {
    fn name(&self) -> &'static str {
        "cbr"
    }

    async fn get_rate(&self) -> Result<f64, RateError> {
        let resp = self
            .http
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| RateError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RateError::Api {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RateError::Transport(e.to_string()))?;

        let rate = parse_cbr_rate(&body, &self.currency)?;
        debug!(currency = %self.currency, rate, "rate fetched");
        Ok(rate)
    }
}

#[derive(Debug, Default)]
struct ValuteFields {
    char_code: String,
    nominal: String,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CharCode,
    Nominal,
    Value,
}

/// Extract the per-unit rate of `code` from a CBR `ValCurs` document.
///
/// `Value` uses a decimal comma (`"90,5000"`). A missing `Nominal` counts as 1.
pub fn parse_cbr_rate(xml: &[u8], code: &str) -> Result<f64, RateError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<ValuteFields> = None;
    let mut field: Option<Field> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"ValCurs" => saw_root = true,
                b"Valute" => current = Some(ValuteFields::default()),
                b"CharCode" if current.is_some() => field = Some(Field::CharCode),
                b"Nominal" if current.is_some() => field = Some(Field::Nominal),
                b"Value" if current.is_some() => field = Some(Field::Value),
                _ => field = None,
            },
            Ok(Event::Text(ref e)) => {
                if let (Some(f), Some(v)) = (field, current.as_mut()) {
                    let text = String::from_utf8_lossy(e.as_ref());
                    match f {
                        Field::CharCode => v.char_code.push_str(&text),
                        Field::Nominal => v.nominal.push_str(&text),
                        Field::Value => v.value.push_str(&text),
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"Valute" => {
                    if let Some(v) = current.take() {
                        if v.char_code.trim().eq_ignore_ascii_case(code) {
                            return per_unit_rate(code, &v);
                        }
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RateError::Decode(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(RateError::Decode("missing ValCurs root element".to_string()));
    }
    Err(RateError::CurrencyNotFound {
        code: code.to_string(),
    })
}

fn per_unit_rate(code: &str, v: &ValuteFields) -> Result<f64, RateError> {
    let invalid = || RateError::InvalidRate {
        code: code.to_string(),
        raw: v.value.clone(),
    };

    let value: f64 = v.value.trim().replace(',', ".").parse().map_err(|_| invalid())?;
    let nominal: f64 = if v.nominal.trim().is_empty() {
        1.0
    } else {
        v.nominal
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| invalid())?
    };

    if !value.is_finite() || !nominal.is_finite() || value <= 0.0 || nominal <= 0.0 {
        return Err(invalid());
    }
    Ok(value / nominal)
}
