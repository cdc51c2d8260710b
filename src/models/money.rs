use rust_decimal::Decimal;

/// Decimal places stored by the `NUMERIC(12, 2)` money columns.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(12, 2)` column holds.
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999, MONEY_SCALE)
}

/// True when `amount` is stored without rounding or overflow.
pub fn fits_money_column(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE && amount.abs() <= max_money()
}
