//! Filtering and ordering of customer records for display and export

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::CustomerRecord;

/// Column a view is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Contact,
    Delivery,
    VisitedDate,
    BillAmount,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Search and ordering options, usually taken from a URL query string.
///
/// The default view is every record, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewQuery {
    /// Case-insensitive substring matched against name or contact
    pub q: Option<String>,
    pub sort: SortKey,
    pub dir: SortDirection,
}

impl ViewQuery {
    pub fn new(q: Option<&str>, sort: SortKey, dir: SortDirection) -> Self {
        Self {
            q: q.map(str::to_string),
            sort,
            dir,
        }
    }

    /// Whether `record` passes the search filter
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        let needle = match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };

        record.name.to_lowercase().contains(&needle)
            || record.contact_str().to_lowercase().contains(&needle)
    }

    /// Compare two records by this view's key and direction
    pub fn compare(&self, a: &CustomerRecord, b: &CustomerRecord, visit_tz: &FixedOffset) -> Ordering {
        let ord = match self.sort {
            SortKey::Name => natural_cmp(&a.name, &b.name),
            SortKey::Contact => natural_cmp(a.contact_str(), b.contact_str()),
            SortKey::Delivery => natural_cmp(a.delivery.as_str(), b.delivery.as_str()),
            SortKey::VisitedDate => natural_cmp(
                &a.visited_date_or_derived(visit_tz),
                &b.visited_date_or_derived(visit_tz),
            ),
            SortKey::BillAmount => a
                .bill_amount
                .partial_cmp(&b.bill_amount)
                .unwrap_or(Ordering::Equal),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };

        match self.dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Build a filtered, ordered copy of `records`. Ties keep their input order.
pub fn apply_view(
    records: &[CustomerRecord],
    query: &ViewQuery,
    visit_tz: &FixedOffset,
) -> Vec<CustomerRecord> {
    let mut out: Vec<CustomerRecord> = records
        .iter()
        .filter(|r| query.matches(r))
        .cloned()
        .collect();

    out.sort_by(|a, b| query.compare(a, b, visit_tz));
    out
}

/// Case-insensitive comparison that orders digit runs by numeric value,
/// so `"item2"` sorts before `"item10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = take_digits(&mut ai);
                let run_b = take_digits(&mut bi);
                let ord = compare_digit_runs(&run_a, &run_b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
