use chrono::NaiveDate;
use rental_ledger_core::allocation::planning::{
    active_contract_for, plan_payment, PaymentPart, PaymentSubmission,
};
use rental_ledger_core::allocation::{allocate, allocate_with, AllocationRequest};
use rental_ledger_core::records::{Contract, ContractStatus, PaymentStatus};
use rental_ledger_core::{Currency, CurrencyNormalizer, EngineConfig, RentalLedgerError};
use rust_decimal::Decimal;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

// ===========================================================================
// Allocation invariants
// ===========================================================================

#[test]
fn test_allocations_sum_to_amount_across_a_sweep() {
    let dues = [dec!(100), dec!(333.33), dec!(4000), dec!(25.5)];
    let amounts = [dec!(0.01), dec!(99.99), dec!(100), dec!(1234.56), dec!(12000.5)];
    for due in dues {
        for amount in amounts {
            let out = allocate(amount, &Currency::USD, 11, 2023, due).unwrap();
            let total: Decimal = out.iter().map(|a| a.amount).sum();
            assert!(
                (total - amount).abs() <= dec!(0.000001),
                "amount {amount} due {due}: allocated {total}"
            );
        }
    }
}

#[test]
fn test_only_last_allocation_may_be_partial() {
    let out = allocate(dec!(1234.56), &Currency::USD, 1, 2024, dec!(100)).unwrap();
    let (last, rest) = out.split_last().unwrap();
    assert!(rest.iter().all(|a| a.is_full && a.amount == dec!(100)));
    assert!(!last.is_full);
    assert_eq!(last.amount, dec!(34.56));
    assert_eq!(out.len(), 13);
}

#[test]
fn test_periods_are_consecutive_without_gaps() {
    let out = allocate(dec!(2600), &Currency::USD, 10, 2024, dec!(100)).unwrap();
    assert_eq!(out.len(), 26);
    for pair in out.windows(2) {
        assert_eq!(pair[0].period().next().unwrap(), pair[1].period());
    }
    assert_eq!((out[0].month, out[0].year), (10, 2024));
    assert_eq!((out[25].month, out[25].year), (11, 2026));
}

#[test]
fn test_identical_inputs_give_identical_output() {
    let a = allocate(dec!(987.65), &Currency::VES, 6, 2024, dec!(123.45)).unwrap();
    let b = allocate(dec!(987.65), &Currency::VES, 6, 2024, dec!(123.45)).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
}

#[test]
fn test_validation_error_returns_nothing() {
    let err = allocate(dec!(-10), &Currency::USD, 3, 2024, dec!(100)).unwrap_err();
    match err {
        RentalLedgerError::Validation { field, .. } => assert_eq!(field, "amount"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_ves_payment_allocated_against_converted_rent() {
    // Rent 100 USD; tenant pays 6000 VES at 40 VES/USD -> 4000 VES per month
    let normalizer = CurrencyNormalizer::default();
    let due = normalizer
        .to_local(dec!(100), &Currency::VES, Some(dec!(40)))
        .unwrap();
    let request = AllocationRequest {
        amount: dec!(6000),
        currency: Currency::VES,
        start_month: 2,
        start_year: 2024,
        periodic_due_amount: due,
        source_reference: Some("PM-5521".into()),
    };
    let out = allocate_with(&EngineConfig::default(), &request).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].amount, dec!(4000));
    assert!(out[0].is_full);
    assert_eq!(out[1].amount, dec!(2000));
    assert!(!out[1].is_full);
}

// ===========================================================================
// Payment planning
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn contracts() -> Vec<Contract> {
    vec![
        Contract {
            id: "c-2023".into(),
            tenant_id: "t1".into(),
            unit_id: "u1".into(),
            rent_amount: dec!(90),
            currency: Currency::USD,
            start_date: date(2023, 1, 1),
            end_date: Some(date(2023, 12, 31)),
            status: ContractStatus::Expired,
        },
        Contract {
            id: "c-2024".into(),
            tenant_id: "t1".into(),
            unit_id: "u1".into(),
            rent_amount: dec!(100),
            currency: Currency::USD,
            start_date: date(2024, 1, 1),
            end_date: None,
            status: ContractStatus::Active,
        },
    ]
}

#[test]
fn test_plan_from_looked_up_contract() {
    let contracts = contracts();
    let contract = active_contract_for(&contracts, "t1", date(2024, 5, 3)).unwrap();
    let submission = PaymentSubmission {
        tenant_id: "t1".into(),
        contract_id: contract.id.clone(),
        date: date(2024, 5, 3),
        start_month: 11,
        start_year: 2024,
        parts: vec![
            PaymentPart {
                amount: dec!(250),
                currency: Currency::USD,
                exchange_rate: None,
                reference: "CASH".into(),
            },
            PaymentPart {
                amount: dec!(2000),
                currency: Currency::VES,
                exchange_rate: Some(dec!(40)),
                reference: "PM-1".into(),
            },
        ],
        exchange_rate: None,
        reference: String::new(),
        concept: String::new(),
    };

    let out = plan_payment(&submission, contract, &EngineConfig::default()).unwrap();
    let plan = &out.result;
    assert_eq!(plan.due_amount, dec!(100));
    assert_eq!(plan.parts.len(), 2);

    let usd_periods: Vec<NaiveDate> = plan
        .drafts
        .iter()
        .filter(|d| d.currency == Currency::USD)
        .map(|d| d.billing_period)
        .collect();
    assert_eq!(
        usd_periods,
        vec![date(2024, 11, 1), date(2024, 12, 1), date(2025, 1, 1)]
    );

    let ves = &plan.parts[1];
    assert_eq!(ves.due_in_part_currency, dec!(4000));
    assert_eq!(ves.allocations.len(), 1);
    assert!(!ves.allocations[0].is_full);
    assert_eq!(plan.total_canonical, dec!(300));
    assert!(plan.drafts.iter().all(|d| d.status == PaymentStatus::Pending));
}

#[test]
fn test_plan_preview_equals_commit() {
    let contracts = contracts();
    let contract = &contracts[1];
    let submission = PaymentSubmission {
        tenant_id: "t1".into(),
        contract_id: contract.id.clone(),
        date: date(2024, 5, 3),
        start_month: 5,
        start_year: 2024,
        parts: vec![PaymentPart {
            amount: dec!(310.5),
            currency: Currency::USD,
            exchange_rate: None,
            reference: String::new(),
        }],
        exchange_rate: None,
        reference: "REF".into(),
        concept: "Alquiler".into(),
    };
    let preview = plan_payment(&submission, contract, &EngineConfig::default()).unwrap();
    let commit = plan_payment(&submission, contract, &EngineConfig::default()).unwrap();
    assert_eq!(preview.result.drafts, commit.result.drafts);
    assert!(preview.result.drafts.iter().all(|d| d.concept == "Alquiler"));
}

#[test]
fn test_no_active_contract_is_reported() {
    let err = active_contract_for(&contracts(), "t1", date(2022, 6, 1)).unwrap_err();
    assert!(matches!(err, RentalLedgerError::NoRecurringAmount(_)));
}
