use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// East Africa Time, the clock M-Pesa uses for timestamps (UTC+3, no DST)
const EAT_OFFSET_SECS: i32 = 3 * 3600;

/// Timestamp layout used by the gateway: `YYYYMMDDHHmmss`
pub const GATEWAY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Ledger date layout: `YYYY-MM-DD`
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Gateway-specific timezone handling.
/// All timestamps stored internally as UTC, converted to gateway time for API calls.
pub struct TimezoneConverter;

impl TimezoneConverter {
    fn eat() -> FixedOffset {
        FixedOffset::east_opt(EAT_OFFSET_SECS).expect("Valid offset")
    }

    /// Convert UTC timestamp to Africa/Nairobi (UTC+3)
    pub fn utc_to_nairobi(utc_time: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc_time.with_timezone(&Self::eat())
    }

    /// Convert Africa/Nairobi timestamp to UTC
    pub fn nairobi_to_utc(local_time: DateTime<FixedOffset>) -> DateTime<Utc> {
        local_time.with_timezone(&Utc)
    }

    /// Request timestamp for the gateway password and `Timestamp` field
    pub fn gateway_timestamp(utc_time: DateTime<Utc>) -> String {
        Self::utc_to_nairobi(utc_time)
            .format(GATEWAY_TIMESTAMP_FORMAT)
            .to_string()
    }

    /// Calendar date in gateway time, used as the ledger fallback date
    pub fn ledger_today(utc_time: DateTime<Utc>) -> NaiveDate {
        Self::utc_to_nairobi(utc_time).date_naive()
    }
}

/// Parse a strict `YYYY-MM-DD` ledger date
pub fn parse_ledger_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    // chrono accepts unpadded fields, the ledger key format does not
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, LEDGER_DATE_FORMAT).ok()
}

/// Normalize a gateway `TransactionDate` to a ledger date.
///
/// The gateway reports `YYYYMMDDHHmmss` (sometimes as a JSON number); an
/// already formatted `YYYY-MM-DD` value is accepted as is.
pub fn parse_gateway_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(stamp) = NaiveDateTime::parse_from_str(value, GATEWAY_TIMESTAMP_FORMAT) {
        return Some(stamp.date());
    }
    parse_ledger_date(value)
}
