//! Installment [`Schedule`] of a [`Lease`] rent.
//!
//! [`Lease`]: crate::domain::Lease

use common::{Date, DateTime, Money};
use derive_more::{Display, Error as StdError};

use crate::domain::{
    lease::{self, ChequeCount, PaymentMethod, PaymentPlan},
    rent_payment::{self, RentPayment},
};

/// Computes the installment [`Schedule`] of the provided yearly `rent`.
///
/// Every installment but the last one gets `rent / cheque_count` rounded down
/// to cents, while the last one absorbs the remainder, so the amounts always
/// sum up to `rent` exactly. Installment `i` (0-based) is due `i` intervals of
/// `12 / cheque_count` months after `start`, clamped to `lease_end`.
///
/// # Errors
///
/// - If `cheque_count` is not one of [`ChequeCount::ALLOWED`].
/// - If `rent` is not positive.
/// - If a due date overflows the supported date range.
pub fn schedule(
    rent: Money,
    cheque_count: u8,
    start: Date,
    lease_end: Date,
) -> Result<Schedule, Error> {
    let cheque_count = ChequeCount::try_from(cheque_count)?;
    if !rent.is_positive() {
        return Err(Error::NonPositiveRent(rent));
    }

    let count = cheque_count.get();
    let base = rent.split(cheque_count.divisor());
    let last = rent - base.times(count - 1);
    let interval = u32::from(cheque_count.interval_months());

    let installments = (0..count)
        .map(|i| {
            let due_date = start
                .checked_add_months(u32::from(i) * interval)
                .ok_or(Error::DateOverflow)?
                .min(lease_end);
            Ok(Installment {
                number: (i16::from(i) + 1).into(),
                due_date,
                amount: if i + 1 == count { last } else { base },
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Schedule {
        cheque_count,
        installments,
    })
}

/// Ordered installments of a [`Lease`] rent.
///
/// [`Lease`]: crate::domain::Lease
#[derive(Clone, Debug)]
pub struct Schedule {
    /// [`ChequeCount`] this [`Schedule`] was computed for.
    cheque_count: ChequeCount,

    /// [`Installment`]s of this [`Schedule`] in their due order.
    installments: Vec<Installment>,
}

impl Schedule {
    /// Returns [`Installment`]s of this [`Schedule`].
    #[must_use]
    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    /// Returns [`ChequeCount`] of this [`Schedule`].
    #[must_use]
    pub const fn cheque_count(&self) -> ChequeCount {
        self.cheque_count
    }

    /// Returns the total amount of this [`Schedule`].
    #[must_use]
    pub fn total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    /// Summarizes this [`Schedule`] into a [`PaymentPlan`].
    #[must_use]
    pub fn plan(&self, payment_method: Option<PaymentMethod>) -> PaymentPlan {
        let first = self.installments.first();
        let last = self.installments.last();
        PaymentPlan {
            cheque_count: self.cheque_count,
            interval_months: self.cheque_count.interval_months(),
            payment_method,
            first_due_date: first.map_or_else(Date::today, |i| i.due_date),
            installment_amount: first.map_or(Money::ZERO, |i| i.amount),
            last_installment_amount: last.map_or(Money::ZERO, |i| i.amount),
            total: self.total(),
        }
    }

    /// Turns this [`Schedule`] into [`rent_payment::Status::Pending`]
    /// [`RentPayment`]s of the provided [`Lease`].
    ///
    /// [`Lease`]: crate::domain::Lease
    #[must_use]
    pub fn into_rent_payments(
        self,
        lease_id: lease::Id,
        at: DateTime,
    ) -> Vec<RentPayment> {
        self.installments
            .into_iter()
            .map(|i| RentPayment {
                id: rent_payment::Id::new(),
                lease_id,
                installment_number: i.number,
                due_date: i.due_date,
                amount: i.amount,
                status: rent_payment::Status::Pending,
                paid_at: None,
                created_at: at.coerce(),
                updated_at: at.coerce(),
            })
            .collect()
    }
}

/// Single installment of a [`Schedule`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Installment {
    /// 1-based number of this [`Installment`].
    pub number: rent_payment::InstallmentNumber,

    /// [`Date`] this [`Installment`] is due at.
    pub due_date: Date,

    /// Amount of this [`Installment`].
    pub amount: Money,
}

/// Error of computing a [`Schedule`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Cheque count is not allowed.
    #[display("{_0}")]
    UnsupportedChequeCount(lease::UnsupportedChequeCount),

    /// Rent is zero or negative.
    #[display("rent amount must be positive, got `{_0}`")]
    NonPositiveRent(#[error(not(source))] Money),

    /// Due date is out of the supported range.
    #[display("installment due date is out of range")]
    DateOverflow,
}

impl From<lease::UnsupportedChequeCount> for Error {
    fn from(e: lease::UnsupportedChequeCount) -> Self {
        Self::UnsupportedChequeCount(e)
    }
}

#[cfg(test)]
mod spec {
    use common::{Date, Money};

    use super::{schedule, Error};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn amounts(rent: &str, count: u8) -> Vec<Money> {
        schedule(money(rent), count, date("2025-01-01"), date("2026-01-01"))
            .unwrap()
            .installments()
            .iter()
            .map(|i| i.amount)
            .collect()
    }

    #[test]
    fn splits_evenly_into_quarters() {
        let s = schedule(
            money("10000"),
            4,
            date("2025-01-01"),
            date("2026-01-01"),
        )
        .unwrap();

        let due: Vec<_> = s.installments().iter().map(|i| i.due_date).collect();
        assert_eq!(
            due,
            [
                date("2025-01-01"),
                date("2025-04-01"),
                date("2025-07-01"),
                date("2025-10-01"),
            ],
        );
        assert!(s.installments().iter().all(|i| i.amount == money("2500")));
        let numbers: Vec<i16> =
            s.installments().iter().map(|i| i.number.into()).collect();
        assert_eq!(numbers, [1, 2, 3, 4]);
    }

    #[test]
    fn last_installment_absorbs_remainder() {
        let a = amounts("10000", 6);

        assert_eq!(a.len(), 6);
        assert!(a[..5].iter().all(|m| *m == money("1666.66")));
        assert_eq!(a[5], money("1666.70"));
    }

    #[test]
    fn sums_exactly() {
        for rent in ["10000", "10001", "99999.99", "0.05", "123456.78", "7"] {
            for count in [1, 2, 4, 6, 12] {
                let total: Money = amounts(rent, count).into_iter().sum();
                assert_eq!(total, money(rent), "{rent} / {count}");
            }
        }
    }

    #[test]
    fn monthly_intervals() {
        let s = schedule(
            money("120000"),
            12,
            date("2025-01-31"),
            date("2026-01-31"),
        )
        .unwrap();

        let due: Vec<_> = s.installments().iter().map(|i| i.due_date).collect();
        assert_eq!(due[0], date("2025-01-31"));
        assert_eq!(due[1], date("2025-02-28"));
        assert_eq!(due[2], date("2025-03-31"));
        assert_eq!(due[11], date("2025-12-31"));
    }

    #[test]
    fn clamps_due_dates_to_lease_end() {
        let s = schedule(
            money("6000"),
            12,
            date("2025-01-01"),
            date("2025-03-15"),
        )
        .unwrap();

        let due: Vec<_> = s.installments().iter().map(|i| i.due_date).collect();
        assert_eq!(due.len(), 12);
        assert_eq!(due[2], date("2025-03-01"));
        assert!(due[3..].iter().all(|d| *d == date("2025-03-15")));
        assert_eq!(s.total(), money("6000"));
    }

    #[test]
    fn rejects_unsupported_cheque_count() {
        for count in [0, 3, 5, 24] {
            let err = schedule(
                money("10001"),
                count,
                date("2025-01-01"),
                date("2026-01-01"),
            )
            .unwrap_err();
            assert!(matches!(err, Error::UnsupportedChequeCount(_)), "{count}");
        }
    }

    #[test]
    fn rejects_non_positive_rent() {
        for rent in ["0", "-100"] {
            let err = schedule(
                money(rent),
                1,
                date("2025-01-01"),
                date("2026-01-01"),
            )
            .unwrap_err();
            assert!(matches!(err, Error::NonPositiveRent(_)), "{rent}");
        }
    }

    #[test]
    fn reports_failure_as_error() {
        let err: Box<dyn std::error::Error> = Box::new(
            schedule(money("0"), 1, date("2025-01-01"), date("2026-01-01"))
                .unwrap_err(),
        );

        assert_eq!(err.to_string(), "rent amount must be positive, got `0.00`");
        assert!(err.source().is_none());
    }

    #[test]
    fn summarizes_plan() {
        let s = schedule(
            money("10000"),
            6,
            date("2025-02-01"),
            date("2026-02-01"),
        )
        .unwrap();

        let plan = s.plan(None);

        assert_eq!(plan.cheque_count.get(), 6);
        assert_eq!(plan.interval_months, 2);
        assert_eq!(plan.first_due_date, date("2025-02-01"));
        assert_eq!(plan.installment_amount, money("1666.66"));
        assert_eq!(plan.last_installment_amount, money("1666.70"));
        assert_eq!(plan.total, money("10000"));
    }
}
