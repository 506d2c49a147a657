//! Transfer pairing

use rust_decimal::Decimal;

use super::parse::{ParsedRow, RowError};

/// Both legs of one transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPair {
    /// Negative-amount leg (expense)
    pub source: ParsedRow,
    /// Non-negative leg (income)
    pub dest: ParsedRow,
}

/// Match transfer candidates into pairs.
///
/// Greedy and order-dependent: each unmatched row takes the first later
/// unmatched row on the same date that names it back. Amounts are not
/// compared beyond their sign, so ambiguous days pair up in input order.
pub fn pair_transfers(candidates: Vec<ParsedRow>) -> (Vec<TransferPair>, Vec<(usize, RowError)>) {
    let mut matched = vec![false; candidates.len()];
    let mut pairs = Vec::new();
    let mut failures = Vec::new();

    for i in 0..candidates.len() {
        if matched[i] {
            continue;
        }
        let a = &candidates[i];

        let partner = (i + 1..candidates.len()).find(|&j| {
            let b = &candidates[j];
            !matched[j] && a.date == b.date && a.account == b.transfer && a.transfer == b.account
        });

        let Some(j) = partner else {
            failures.push((a.row_number, RowError::TransferPairNotFound));
            continue;
        };
        matched[i] = true;
        matched[j] = true;

        let b = &candidates[j];
        if is_negative(a) == is_negative(b) {
            failures.push((a.row_number, RowError::TransferSameSign));
            failures.push((b.row_number, RowError::TransferSameSign));
            continue;
        }

        let (source, dest) = if is_negative(a) { (a, b) } else { (b, a) };
        pairs.push(TransferPair {
            source: source.clone(),
            dest: dest.clone(),
        });
    }

    (pairs, failures)
}

fn is_negative(row: &ParsedRow) -> bool {
    row.amount < Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    use crate::domain::TransactionKind;

    fn leg(row_number: usize, day: u32, account: &str, amount: &str, transfer: &str) -> ParsedRow {
        let amount = Decimal::from_str(amount).unwrap();
        ParsedRow {
            row_number,
            date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            account: account.to_string(),
            category: String::new(),
            amount,
            abs_amount: amount.abs(),
            currency: "USD".to_string(),
            description: String::new(),
            transfer: transfer.to_string(),
            kind: TransactionKind::from_amount(amount),
        }
    }

    #[test]
    fn test_opposite_signs_pair_up() {
        let (pairs, failures) = pair_transfers(vec![
            leg(1, 20, "B", "1000", "A"),
            leg(2, 20, "A", "-1000", "B"),
        ]);
        assert!(failures.is_empty());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].source.row_number, 2);
        assert_eq!(pairs[0].dest.row_number, 1);
    }

    #[test]
    fn test_same_sign_fails_both_rows() {
        let (pairs, failures) = pair_transfers(vec![
            leg(1, 20, "A", "-10", "B"),
            leg(2, 20, "B", "-10", "A"),
        ]);
        assert!(pairs.is_empty());
        assert_eq!(
            failures,
            vec![(1, RowError::TransferSameSign), (2, RowError::TransferSameSign)]
        );
    }

    #[test]
    fn test_single_row_is_unmatched() {
        let (pairs, failures) = pair_transfers(vec![leg(4, 20, "A", "-10", "B")]);
        assert!(pairs.is_empty());
        assert_eq!(failures, vec![(4, RowError::TransferPairNotFound)]);
    }

    #[test]
    fn test_different_dates_do_not_pair() {
        let (pairs, failures) = pair_transfers(vec![
            leg(1, 20, "A", "-10", "B"),
            leg(2, 21, "B", "10", "A"),
        ]);
        assert!(pairs.is_empty());
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|(_, e)| *e == RowError::TransferPairNotFound));
    }

    #[test]
    fn test_first_match_wins_in_input_order() {
        let (pairs, failures) = pair_transfers(vec![
            leg(1, 20, "A", "-10", "B"),
            leg(2, 20, "B", "99", "A"),
            leg(3, 20, "B", "10", "A"),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].dest.row_number, 2);
        assert_eq!(failures, vec![(3, RowError::TransferPairNotFound)]);
    }
}
