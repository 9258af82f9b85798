use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::RentalLedgerError;
use crate::records::{Expense, Payment, Property, PropertyDirectory};
use crate::types::BillingPeriod;
use crate::RentalLedgerResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a report covers. Immutable; build a new one to change the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub year: i32,
    /// Selected months (1–12). Empty selects the whole year.
    #[serde(default)]
    pub months: BTreeSet<u32>,
    /// Restrict to these property ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeSet<String>>,
    /// Restrict to properties owned (in part) by these owner ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<BTreeSet<String>>,
}

impl ScopeFilter {
    pub fn year(year: i32) -> Self {
        ScopeFilter {
            year,
            months: BTreeSet::new(),
            properties: None,
            owners: None,
        }
    }

    pub fn with_months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.months = months.into_iter().collect();
        self
    }

    pub fn with_properties<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.properties = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_owners<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.owners = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> RentalLedgerResult<()> {
        if let Some(bad) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(RentalLedgerError::validation(
                "months",
                format!("Months must be between 1 and 12, got {bad}"),
            ));
        }
        Ok(())
    }

    /// The months actually in scope.
    pub fn selected_months(&self) -> BTreeSet<u32> {
        if self.months.is_empty() {
            (1..=12).collect()
        } else {
            self.months.clone()
        }
    }

    /// Inclusive date range used at the data-fetch boundary: the first day
    /// of the earliest selected month through the last day of the latest.
    ///
    /// The range alone over-selects when months are not contiguous; records
    /// must also pass the per-month check in [`ResolvedScope::admits_date`].
    pub fn date_range(&self) -> RentalLedgerResult<(NaiveDate, NaiveDate)> {
        self.validate()?;
        let months = self.selected_months();
        let first = months.iter().next().copied().unwrap_or(1);
        let last = months.iter().next_back().copied().unwrap_or(12);
        Ok((
            BillingPeriod::new(first, self.year)?.first_day()?,
            BillingPeriod::new(last, self.year)?.last_day()?,
        ))
    }
}

/// A scope with the owner filter already translated into property ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedScope {
    pub year: i32,
    pub months: BTreeSet<u32>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// `None` admits every property
    pub property_ids: Option<BTreeSet<String>>,
    /// `None` credits every owner
    pub owner_ids: Option<BTreeSet<String>>,
}

impl ResolvedScope {
    pub fn admits_date(&self, date: NaiveDate) -> bool {
        date >= self.start
            && date <= self.end
            && date.year() == self.year
            && self.months.contains(&date.month())
    }

    pub fn admits_property(&self, property_id: Option<&str>) -> bool {
        match (&self.property_ids, property_id) {
            (None, _) => true,
            (Some(ids), Some(id)) => ids.contains(id),
            (Some(_), None) => false,
        }
    }

    pub fn admits(&self, date: NaiveDate, property_id: Option<&str>) -> bool {
        self.admits_date(date) && self.admits_property(property_id)
    }

    pub fn credits_owner(&self, owner_id: &str) -> bool {
        self.owner_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(owner_id))
    }
}

/// Records that can be placed in a report scope by date.
pub trait ScopedRecord {
    fn record_date(&self) -> NaiveDate;
}

impl ScopedRecord for Payment {
    fn record_date(&self) -> NaiveDate {
        self.date
    }
}

impl ScopedRecord for Expense {
    fn record_date(&self) -> NaiveDate {
        self.date
    }
}

// ---------------------------------------------------------------------------
// Resolution and narrowing
// ---------------------------------------------------------------------------

/// Translate the owner filter into property ids and intersect it with the
/// explicit property filter.
pub fn resolve(scope: &ScopeFilter, properties: &[Property]) -> RentalLedgerResult<ResolvedScope> {
    let (start, end) = scope.date_range()?;

    let owned_by_selection: Option<BTreeSet<String>> = scope.owners.as_ref().map(|owners| {
        properties
            .iter()
            .filter(|p| p.has_owner_in(owners.iter()))
            .map(|p| p.id.clone())
            .collect()
    });

    let property_ids = match (scope.properties.clone(), owned_by_selection) {
        (None, None) => None,
        (Some(explicit), None) => Some(explicit),
        (None, Some(owned)) => Some(owned),
        (Some(explicit), Some(owned)) => Some(explicit.intersection(&owned).cloned().collect()),
    };

    debug!(
        year = scope.year,
        months = scope.selected_months().len(),
        properties = property_ids.as_ref().map(BTreeSet::len),
        "resolved report scope"
    );

    Ok(ResolvedScope {
        year: scope.year,
        months: scope.selected_months(),
        start,
        end,
        property_ids,
        owner_ids: scope.owners.clone(),
    })
}

/// Keep the records inside `scope`. `locate` names each record's property;
/// a record whose property cannot be located is dropped whenever a property
/// filter is active.
pub fn narrow<'a, T, F>(records: &'a [T], scope: &ResolvedScope, locate: F) -> Vec<T>
where
    T: ScopedRecord + Clone,
    F: Fn(&'a T) -> Option<&'a str>,
{
    records
        .iter()
        .filter(|r| scope.admits(r.record_date(), locate(*r)))
        .cloned()
        .collect()
}

pub fn narrow_payments(
    payments: &[Payment],
    directory: &PropertyDirectory,
    scope: &ResolvedScope,
) -> Vec<Payment> {
    narrow(payments, scope, |p| directory.property_of(p))
}

pub fn narrow_expenses(expenses: &[Expense], scope: &ResolvedScope) -> Vec<Expense> {
    narrow(expenses, scope, |e| Some(e.property_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ExpenseStatus, OwnershipEntry};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn property(id: &str, owners: &[&str]) -> Property {
        Property {
            id: id.into(),
            name: id.to_uppercase(),
            owners: owners
                .iter()
                .map(|o| OwnershipEntry {
                    owner_id: o.to_string(),
                    owner_name: o.to_string(),
                    percentage: dec!(50),
                })
                .collect(),
        }
    }

    fn expense(id: &str, property_id: &str, on: NaiveDate) -> Expense {
        Expense {
            id: id.into(),
            property_id: property_id.into(),
            amount: dec!(10),
            category: "repairs".into(),
            date: on,
            status: ExpenseStatus::Paid,
        }
    }

    #[test]
    fn test_date_range_spans_min_to_max_month() {
        let scope = ScopeFilter::year(2024).with_months([3, 1]);
        assert_eq!(scope.date_range().unwrap(), (date(2024, 1, 1), date(2024, 3, 31)));
        let whole = ScopeFilter::year(2023);
        assert_eq!(whole.date_range().unwrap(), (date(2023, 1, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(ScopeFilter::year(2024).with_months([0]).date_range().is_err());
        assert!(ScopeFilter::year(2024).with_months([4, 13]).validate().is_err());
    }

    #[test]
    fn test_non_contiguous_months_exclude_gap() {
        let scope = resolve(&ScopeFilter::year(2024).with_months([1, 3]), &[]).unwrap();
        let expenses = vec![
            expense("jan", "a", date(2024, 1, 15)),
            expense("feb", "a", date(2024, 2, 15)),
            expense("mar", "a", date(2024, 3, 31)),
            expense("apr", "a", date(2024, 4, 1)),
        ];
        let kept: Vec<String> = narrow_expenses(&expenses, &scope)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(kept, vec!["jan", "mar"]);
    }

    #[test]
    fn test_owner_filter_intersects_property_filter() {
        let props = vec![
            property("a", &["o1"]),
            property("b", &["o1", "o2"]),
            property("c", &["o2"]),
        ];
        let scope = ScopeFilter::year(2024)
            .with_properties(["a", "c"])
            .with_owners(["o1"]);
        let resolved = resolve(&scope, &props).unwrap();
        let ids: Vec<&str> = resolved
            .property_ids
            .as_ref()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(ids, vec!["a"]);
        assert!(resolved.credits_owner("o1"));
        assert!(!resolved.credits_owner("o2"));
    }

    #[test]
    fn test_owner_filter_alone_selects_owned_properties() {
        let props = vec![property("a", &["o1"]), property("b", &["o2"]), property("c", &[])];
        let resolved = resolve(&ScopeFilter::year(2024).with_owners(["o2"]), &props).unwrap();
        assert!(!resolved.admits_property(Some("a")));
        assert!(resolved.admits_property(Some("b")));
        assert!(!resolved.admits_property(Some("c")));
        assert!(!resolved.admits_property(None));
    }

    #[test]
    fn test_unfiltered_scope_admits_unlocated_records() {
        let resolved = resolve(&ScopeFilter::year(2024), &[]).unwrap();
        assert!(resolved.admits(date(2024, 6, 1), None));
        assert!(!resolved.admits(date(2025, 1, 1), None));
    }
}
