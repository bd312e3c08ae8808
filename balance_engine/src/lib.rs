use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};
use domain::{AccountBalance, BalanceSnapshot, Transaction, TrendSummary};

pub use domain::DEFAULT_WINDOW_DAYS;

/// Reconstructs the daily balance for the closed window
/// `[as_of - window_days, as_of]`, oldest day first.
///
/// The walk starts at `as_of` with `current_total` and steps backward one day
/// at a time: each day is emitted at the running balance, then that day's net
/// delta is removed to obtain the previous day's balance. An empty
/// `transactions` slice yields an empty series, since there is nothing to
/// anchor a trend on.
pub fn project(
    transactions: &[Transaction],
    current_total: f64,
    window_days: u32,
    as_of: NaiveDate,
) -> Vec<BalanceSnapshot> {
    if transactions.is_empty() {
        return Vec::new();
    }

    let window_start = as_of
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    let deltas = daily_deltas(
        transactions
            .iter()
            .filter(|t| t.date >= window_start && t.date <= as_of),
    );

    let mut snapshots =
        Vec::with_capacity((window_days as usize).saturating_add(1).min(4096));
    let mut running = current_total;
    for offset in 0..=u64::from(window_days) {
        let Some(date) = as_of.checked_sub_days(Days::new(offset)) else {
            break;
        };
        snapshots.push(BalanceSnapshot {
            date,
            balance: running,
        });
        running -= deltas.get(&date).copied().unwrap_or(0.0);
    }

    snapshots.reverse();
    snapshots
}

/// [`project`] anchored on the current UTC date.
pub fn project_today(
    transactions: &[Transaction],
    current_total: f64,
    window_days: u32,
) -> Vec<BalanceSnapshot> {
    project(
        transactions,
        current_total,
        window_days,
        Utc::now().date_naive(),
    )
}

/// Net balance change per calendar day. Debits are positive amounts, so each
/// transaction contributes `-amount`.
pub fn daily_deltas<'a, I>(transactions: I) -> HashMap<NaiveDate, f64>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut deltas: HashMap<NaiveDate, f64> = HashMap::new();
    for t in transactions {
        *deltas.entry(t.date).or_insert(0.0) -= t.amount;
    }
    deltas
}

/// Sum of the `current` balance across accounts; accounts that report no
/// current balance count as zero.
pub fn total_balance(accounts: &[AccountBalance]) -> f64 {
    accounts
        .iter()
        .map(|account| account.balances.current.unwrap_or(0.0))
        .sum()
}

pub fn summarize(snapshots: &[BalanceSnapshot]) -> Option<TrendSummary> {
    let first = snapshots.first()?;
    let last = snapshots.last()?;
    let highest = snapshots
        .iter()
        .map(|s| s.balance)
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = snapshots
        .iter()
        .map(|s| s.balance)
        .fold(f64::INFINITY, f64::min);

    Some(TrendSummary {
        start_date: first.date,
        end_date: last.date,
        start_balance: first.balance,
        end_balance: last.balance,
        net_change: last.balance - first.balance,
        highest_balance: highest,
        lowest_balance: lowest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Balances;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(id: &str, date: NaiveDate, amount: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            date,
            amount,
        }
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            txn("a", day(2024, 3, 1), 12.5),
            txn("b", day(2024, 3, 1), -1000.0),
            txn("c", day(2024, 2, 20), 43.21),
            txn("d", day(2024, 2, 14), 89.99),
            txn("e", day(2023, 12, 31), 500.0),
            txn("f", day(2024, 3, 5), 7.0),
        ]
    }

    #[test]
    fn worked_example_three_days() {
        let transactions = vec![
            txn("t1", day(2024, 1, 9), 20.0),
            txn("t2", day(2024, 1, 10), -5.0),
        ];
        let snapshots = project(&transactions, 100.0, 2, day(2024, 1, 10));
        assert_eq!(
            snapshots,
            vec![
                BalanceSnapshot {
                    date: day(2024, 1, 8),
                    balance: 115.0
                },
                BalanceSnapshot {
                    date: day(2024, 1, 9),
                    balance: 95.0
                },
                BalanceSnapshot {
                    date: day(2024, 1, 10),
                    balance: 100.0
                },
            ]
        );
    }

    #[test]
    fn empty_transactions_give_empty_series() {
        assert!(project(&[], 500.0, 30, day(2024, 1, 10)).is_empty());
        assert!(project(&[], -20.0, 0, day(2024, 1, 10)).is_empty());
        assert!(project_today(&[], 500.0, DEFAULT_WINDOW_DAYS).is_empty());
    }

    #[test]
    fn covers_every_day_of_the_window_in_order() {
        let transactions = sample_transactions();
        for window in [0_u32, 1, 2, 7, 30, 90] {
            for as_of in [day(2024, 3, 5), day(2024, 3, 1), day(2024, 1, 1)] {
                let snapshots = project(&transactions, 250.0, window, as_of);
                assert_eq!(snapshots.len(), window as usize + 1);
                assert_eq!(
                    snapshots.first().map(|s| s.date),
                    as_of.checked_sub_days(Days::new(u64::from(window)))
                );
                assert_eq!(snapshots.last().map(|s| s.date), Some(as_of));
                for pair in snapshots.windows(2) {
                    assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
                }
            }
        }
    }

    #[test]
    fn last_snapshot_is_the_current_total() {
        let transactions = sample_transactions();
        for total in [0.0, 1234.56, -87.3] {
            let snapshots = project(&transactions, total, 30, day(2024, 3, 5));
            assert_eq!(snapshots.last().map(|s| s.balance), Some(total));
        }
    }

    #[test]
    fn adjacent_days_differ_by_the_later_days_net_amount() {
        let transactions = sample_transactions();
        let snapshots = project(&transactions, 800.0, 30, day(2024, 3, 5));
        for pair in snapshots.windows(2) {
            let later = pair[1].date;
            let amounts: f64 = transactions
                .iter()
                .filter(|t| t.date == later)
                .map(|t| t.amount)
                .sum();
            assert!(
                approx_eq(pair[1].balance - pair[0].balance, -amounts),
                "mismatch on {later}"
            );
        }
    }

    #[test]
    fn balance_is_flat_across_quiet_days() {
        let transactions = sample_transactions();
        let snapshots = project(&transactions, 800.0, 30, day(2024, 3, 5));
        for pair in snapshots.windows(2) {
            let later = pair[1].date;
            if !transactions.iter().any(|t| t.date == later) {
                assert_eq!(pair[0].balance, pair[1].balance);
            }
        }
    }

    #[test]
    fn transactions_outside_the_window_do_not_move_the_series() {
        let only_old = vec![txn("old", day(2023, 6, 1), 75.0)];
        let snapshots = project(&only_old, 40.0, 5, day(2024, 1, 10));
        assert_eq!(snapshots.len(), 6);
        assert!(snapshots.iter().all(|s| s.balance == 40.0));

        let future = vec![txn("future", day(2024, 1, 11), 10.0)];
        let snapshots = project(&future, 40.0, 3, day(2024, 1, 10));
        assert!(snapshots.iter().all(|s| s.balance == 40.0));
    }

    #[test]
    fn same_day_transactions_are_netted() {
        let transactions = vec![
            txn("a", day(2024, 1, 10), 30.0),
            txn("b", day(2024, 1, 10), -50.0),
            txn("c", day(2024, 1, 10), 5.0),
        ];
        let snapshots = project(&transactions, 10.0, 1, day(2024, 1, 10));
        // net delta on the 10th is +15, so the 9th sat at -5
        assert!(approx_eq(snapshots[0].balance, -5.0));
        assert!(approx_eq(snapshots[1].balance, 10.0));
    }

    #[test]
    fn window_reaching_past_the_calendar_start_is_truncated() {
        let transactions = vec![txn("a", NaiveDate::MIN, 1.0)];
        let as_of = NaiveDate::MIN.checked_add_days(Days::new(2)).unwrap();
        let snapshots = project(&transactions, 3.0, 10, as_of);
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].date, NaiveDate::MIN);
    }

    #[test]
    fn total_balance_skips_missing_current_values() {
        let account = |id: &str, current: Option<f64>| AccountBalance {
            account_id: id.to_string(),
            name: id.to_string(),
            account_type: Some("depository".to_string()),
            subtype: None,
            balances: Balances {
                available: None,
                current,
                iso_currency_code: Some("USD".to_string()),
            },
        };
        let accounts = vec![
            account("checking", Some(110.0)),
            account("savings", Some(210.5)),
            account("pending", None),
            account("card", Some(-410.0)),
        ];
        assert!(approx_eq(total_balance(&accounts), -89.5));
        assert_eq!(total_balance(&[]), 0.0);
    }

    #[test]
    fn summary_reports_extremes_and_net_change() {
        let transactions = vec![
            txn("t1", day(2024, 1, 9), 20.0),
            txn("t2", day(2024, 1, 10), -5.0),
        ];
        let snapshots = project(&transactions, 100.0, 2, day(2024, 1, 10));
        let summary = summarize(&snapshots).expect("summary");
        assert_eq!(summary.start_date, day(2024, 1, 8));
        assert_eq!(summary.end_date, day(2024, 1, 10));
        assert!(approx_eq(summary.net_change, -15.0));
        assert!(approx_eq(summary.highest_balance, 115.0));
        assert!(approx_eq(summary.lowest_balance, 95.0));
        assert!(summarize(&[]).is_none());
    }
}
