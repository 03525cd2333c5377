//! # Interest and Term Computation
//!
//! Pure functions. NO I/O, NO clock access: callers pass `now` in.

use super::value_objects::U256;

/// Seconds in a 365-day year.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Rate denominator (rates are percentage points).
pub const PERCENT: u64 = 100;

/// Simple interest prorated over the loan term, truncated toward zero:
///
/// `interest = loan_amount * rate * duration / (100 * SECONDS_PER_YEAR)`
///
/// Returns `None` if the numerator overflows `U256`.
#[must_use]
pub fn compute_interest(loan_amount: U256, interest_rate: u64, duration_secs: u64) -> Option<U256> {
    let numerator = loan_amount
        .checked_mul(U256::from(interest_rate))?
        .checked_mul(U256::from(duration_secs))?;
    let denominator = U256::from(PERCENT) * U256::from(SECONDS_PER_YEAR);
    Some(numerator / denominator)
}

/// Absolute due date. Returns `None` on `u64` overflow.
#[must_use]
pub fn compute_due_date(now: u64, duration_secs: u64) -> Option<u64> {
    now.checked_add(duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ONE_UNIT: u64 = 1_000_000_000_000_000_000;
    const THIRTY_DAYS: u64 = 2_592_000;

    #[test]
    fn test_thirty_day_term_is_prorated() {
        // 1e18 * 5 * 2_592_000 / (100 * 31_536_000)
        let interest = compute_interest(U256::from(ONE_UNIT), 5, THIRTY_DAYS).unwrap();
        assert_eq!(interest, U256::from(4_109_589_041_095_890u64));

        // Nowhere near a flat 5% of principal
        let flat = U256::from(ONE_UNIT) * U256::from(5u64) / U256::from(100u64);
        assert!(interest < flat);
    }

    #[test]
    fn test_full_year_equals_nominal_rate() {
        let interest = compute_interest(U256::from(1_000u64), 5, SECONDS_PER_YEAR).unwrap();
        assert_eq!(interest, U256::from(50u64));
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 1 * 1 * 1 / 3_153_600_000 -> 0
        assert_eq!(compute_interest(U256::one(), 1, 1), Some(U256::zero()));
    }

    #[test]
    fn test_zero_duration_has_no_interest() {
        assert_eq!(
            compute_interest(U256::from(ONE_UNIT), 5, 0),
            Some(U256::zero())
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        assert!(compute_interest(U256::MAX, 2, 1).is_none());
        assert!(compute_due_date(u64::MAX, 1).is_none());
        assert_eq!(compute_due_date(1_000, 50), Some(1_050));
    }

    proptest! {
        #[test]
        fn prop_interest_matches_floor_formula(
            amount in 0u64..=u64::MAX,
            rate in 1u64..=10_000,
            duration in 0u64..=(10 * SECONDS_PER_YEAR),
        ) {
            let expected = u128::from(amount) * u128::from(rate) * u128::from(duration)
                / (u128::from(PERCENT) * u128::from(SECONDS_PER_YEAR));
            let actual = compute_interest(U256::from(amount), rate, duration).unwrap();
            prop_assert_eq!(actual, U256::from(expected));
        }

        #[test]
        fn prop_interest_is_monotonic_in_duration(
            amount in 1u64..=u64::MAX,
            rate in 1u64..=1_000,
            duration in 0u64..SECONDS_PER_YEAR,
        ) {
            let shorter = compute_interest(U256::from(amount), rate, duration).unwrap();
            let longer = compute_interest(U256::from(amount), rate, duration + 1).unwrap();
            prop_assert!(shorter <= longer);
        }
    }
}
