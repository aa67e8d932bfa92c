//! Spreadsheet (CSV) export of a customer view

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{Error, Result};
use crate::models::CustomerRecord;

pub const EXPORT_HEADERS: [&str; 8] = [
    "Name",
    "Contact",
    "Delivery",
    "Address",
    "VisitedDate",
    "BillAmount",
    "CreatedAt",
    "ID",
];

/// Render `records` in the given order as CSV with a header row
pub fn to_csv(records: &[CustomerRecord], visit_tz: &FixedOffset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for record in records {
        let visited = record.visited_date_or_derived(visit_tz);
        let bill = record.bill_amount.to_string();
        let created = record
            .created_at
            .with_timezone(visit_tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        writer.write_record([
            record.name.as_str(),
            record.contact_str(),
            record.delivery.as_str(),
            record.address.as_deref().unwrap_or(""),
            visited.as_str(),
            bill.as_str(),
            created.as_str(),
            record.id.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Download name for an export produced at `now`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("customers-{}.csv", now.format("%Y-%m-%d"))
}
