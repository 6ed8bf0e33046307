//! Order pricing. All amounts are integers in the currency's smallest unit;
//! the flat surcharge is truncated toward zero, so for a subtotal `s` the
//! total is `floor(1.02 * s)`.

/// Flat surcharge applied to order subtotals, in percent.
pub const TAX_RATE_PERCENT: i64 = 2;

/// Surcharge on an amount, floored. Inputs are never negative, so integer
/// division matches floor semantics.
pub fn tax_on(amount: i64) -> i64 {
    amount * TAX_RATE_PERCENT / 100
}

/// Total for a priced order: subtotal across `(unit_price, quantity)` lines
/// plus the flat surcharge. Callers reject empty item lists before pricing.
pub fn order_total(lines: &[(i64, i32)]) -> i64 {
    let subtotal: i64 = lines
        .iter()
        .map(|(price, quantity)| price * i64::from(*quantity))
        .sum();
    subtotal + tax_on(subtotal)
}

/// Per-unit charge sent to the gateway for a single checkout line item.
// TODO: this adds 2% per unit on top of the order-level 2% already baked
// into the stored amount, so the gateway total can exceed the order total.
// Confirm intended behavior with billing before changing either side.
pub fn unit_amount_with_surcharge(unit_price: i64) -> i64 {
    unit_price + tax_on(unit_price)
}
