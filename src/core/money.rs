use rust_decimal::Decimal;

use super::{AppError, Result};

/// Kenyan shilling amounts carry at most two decimal places
pub const KES_SCALE: u32 = 2;

/// Rounds an amount to shilling precision
fn round_kes(amount: Decimal) -> Decimal {
    amount.round_dp(KES_SCALE)
}

/// Rejects zero, negative, or over-precise amounts
pub fn validate_positive(amount: Decimal, field: &str) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "{} must be greater than zero",
            field
        )));
    }

    if amount.scale() > KES_SCALE && amount.normalize().scale() > KES_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places",
            field, KES_SCALE
        )));
    }

    Ok(amount)
}

/// Formats an amount the way the gateway `Amount` field expects it (`200.00`)
pub fn format_gateway_amount(amount: Decimal) -> String {
    format!("{:.2}", round_kes(amount))
}
