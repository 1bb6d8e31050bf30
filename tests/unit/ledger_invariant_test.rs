// Ledger invariants over arbitrary mutation sequences
//
// After any sequence of payments and reversals: paid_amount equals the sum of
// the dated entries and is never negative.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use paysettle::invoices::{Invoice, InvoiceType, LedgerEntry};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (0i64..5).prop_map(|offset| base_date() + Duration::days(offset))
}

fn entry() -> impl Strategy<Value = LedgerEntry> {
    prop_oneof![
        4 => (amount(), date()).prop_map(|(amount, date)| LedgerEntry::Payment { amount, date }),
        1 => Just(LedgerEntry::ReverseAll),
        3 => (amount(), date())
            .prop_map(|(amount, date)| LedgerEntry::ReverseAmount { amount, date }),
    ]
}

fn fresh_invoice() -> Invoice {
    Invoice::new("order-prop".to_string(), dec!(5000), Decimal::ZERO).unwrap()
}

proptest! {
    #[test]
    fn ledger_stays_balanced(entries in prop::collection::vec(entry(), 0..40)) {
        let mut invoice = fresh_invoice();

        for entry in &entries {
            let before = invoice.paid_amount;
            let applied = entry.apply(&mut invoice).unwrap();

            prop_assert!(invoice.is_balanced(), "unbalanced after {:?}: {:?}", entry, invoice);
            prop_assert!(invoice.paid_amount >= Decimal::ZERO);

            match entry {
                LedgerEntry::Payment { amount, .. } => {
                    prop_assert_eq!(invoice.paid_amount, before + *amount);
                    prop_assert_eq!(applied, *amount);
                }
                LedgerEntry::ReverseAll => {
                    prop_assert_eq!(invoice.paid_amount, Decimal::ZERO);
                    prop_assert!(invoice.paid_on.is_empty());
                    prop_assert_eq!(invoice.invoice_type, InvoiceType::Receivable);
                    prop_assert_eq!(applied, before);
                }
                LedgerEntry::ReverseAmount { amount, .. } => {
                    prop_assert_eq!(applied, (*amount).min(before));
                    prop_assert_eq!(invoice.paid_amount, before - applied);
                    if invoice.paid_amount == Decimal::ZERO {
                        prop_assert_eq!(invoice.invoice_type, InvoiceType::Receivable);
                    }
                }
            }
        }
    }

    #[test]
    fn invoice_amount_never_changes(entries in prop::collection::vec(entry(), 0..20)) {
        let mut invoice = fresh_invoice();
        for entry in &entries {
            entry.apply(&mut invoice).unwrap();
        }
        prop_assert_eq!(invoice.invoice_amount, dec!(5000));
    }

    #[test]
    fn over_reversal_clamps_to_balance(paid in amount(), extra in amount()) {
        let mut invoice = fresh_invoice();
        invoice.apply_payment(paid, base_date()).unwrap();

        let applied = invoice.reverse_amount(paid + extra, base_date()).unwrap();

        prop_assert_eq!(applied, paid);
        prop_assert_eq!(invoice.paid_amount, Decimal::ZERO);
        prop_assert_eq!(invoice.invoice_type, InvoiceType::Receivable);
        prop_assert!(invoice.is_balanced());
    }
}

#[test]
fn same_date_entries_accumulate() {
    let mut invoice = fresh_invoice();
    let day = base_date();

    invoice.apply_payment(dec!(100), day).unwrap();
    invoice.apply_payment(dec!(50), day).unwrap();
    invoice.reverse_amount(dec!(30), day).unwrap();

    assert_eq!(invoice.paid_on.get(&day), Some(&dec!(120)));
    assert_eq!(invoice.paid_amount, dec!(120));
    assert_eq!(invoice.invoice_type, InvoiceType::Payable);
}

#[test]
fn non_positive_amounts_rejected() {
    let mut invoice = fresh_invoice();

    assert!(invoice.apply_payment(Decimal::ZERO, base_date()).is_err());
    assert!(invoice.apply_payment(dec!(-1), base_date()).is_err());
    assert!(invoice.reverse_amount(Decimal::ZERO, base_date()).is_err());
    assert!(invoice.is_balanced());
    assert_eq!(invoice.paid_amount, Decimal::ZERO);
}
