/// Equated monthly installment on a reducing-balance loan, in paise.
///
/// `P·r·(1+r)^n / ((1+r)^n − 1)` with `r` the monthly rate. A zero rate
/// spreads the principal evenly. Rounded to the nearest paisa.
pub fn monthly_installment(principal_paise: u64, annual_rate_bps: u32, tenure_months: u32) -> u64 {
    if tenure_months == 0 {
        return principal_paise;
    }

    let principal = principal_paise as f64;
    let months = tenure_months as f64;
    let monthly_rate = annual_rate_bps as f64 / 10_000.0 / 12.0;

    if monthly_rate == 0.0 {
        return (principal / months).round() as u64;
    }

    let growth = (1.0 + monthly_rate).powf(months);
    (principal * monthly_rate * growth / (growth - 1.0)).round() as u64
}
