//! Activity log export.
//!
//! One row per customer record with a fixed 8-column header. Absent
//! optional fields render as empty strings; timestamps render in a
//! locale-readable `M/D/YYYY, h:mm:ss AM` form in the chosen time zone.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::model::CustomerRecord;

pub const HEADER: [&str; 8] = [
    "Name",
    "Party Size",
    "Mobile Number",
    "Arrival Time",
    "Table Number",
    "Seated Time",
    "Finished Time",
    "Canceled Time",
];

/// Default file name for a downloaded report.
pub const DEFAULT_FILE_NAME: &str = "waitlist_report.csv";

const TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub party_size: u32,
    pub mobile_number: String,
    pub arrival_time: DateTime<Utc>,
    pub table_number: Option<u32>,
    pub seated_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
    pub canceled_time: Option<DateTime<Utc>>,
}

impl From<&CustomerRecord> for ExportRow {
    fn from(r: &CustomerRecord) -> Self {
        Self {
            name: r.name.clone(),
            party_size: r.party_size,
            mobile_number: r.mobile_number.clone(),
            arrival_time: r.arrival_time,
            table_number: r.table_number,
            seated_time: r.seated_time,
            finished_time: r.finished_time,
            canceled_time: r.canceled_time,
        }
    }
}

impl ExportRow {
    fn cells<Tz>(&self, tz: &Tz) -> [String; 8]
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let time = |t: &DateTime<Utc>| t.with_timezone(tz).format(TIME_FORMAT).to_string();
        let optional = |t: &Option<DateTime<Utc>>| t.as_ref().map(time).unwrap_or_default();

        [
            self.name.clone(),
            self.party_size.to_string(),
            self.mobile_number.clone(),
            time(&self.arrival_time),
            self.table_number.map(|n| n.to_string()).unwrap_or_default(),
            optional(&self.seated_time),
            optional(&self.finished_time),
            optional(&self.canceled_time),
        ]
    }
}

/// Exportable record of all activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityLog {
    pub rows: Vec<ExportRow>,
}

impl ActivityLog {
    pub fn from_records(records: &[CustomerRecord]) -> Self {
        Self {
            rows: records.iter().map(ExportRow::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// CSV with timestamps in the machine's local time zone.
    pub fn to_csv(&self) -> String {
        self.render_csv(&Local)
    }

    /// CSV with timestamps in `tz`. Lines are joined by `\n`, no trailing
    /// newline.
    pub fn render_csv<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(join_row(HEADER.iter().copied()));
        for row in &self.rows {
            let cells = row.cells(tz);
            lines.push(join_row(cells.iter().map(String::as_str)));
        }
        lines.join("\n")
    }

    pub fn write_csv(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(escape).collect::<Vec<_>>().join(",")
}

/// Quote a field if it contains a delimiter, quote, or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomerId;
    use chrono::Duration;

    fn seated_record() -> CustomerRecord {
        let arrival = Utc.with_ymd_and_hms(2026, 3, 1, 18, 5, 9).unwrap();
        CustomerRecord {
            id: CustomerId::new(),
            name: "Amina".to_string(),
            party_size: 3,
            mobile_number: "+971501234567".to_string(),
            arrival_time: arrival,
            table_number: Some(5),
            seated_time: Some(arrival + Duration::minutes(20)),
            finished_time: None,
            canceled_time: None,
        }
    }

    #[test]
    fn header_only_when_empty() {
        let csv = ActivityLog::default().render_csv(&Utc);
        assert_eq!(
            csv,
            "Name,Party Size,Mobile Number,Arrival Time,Table Number,Seated Time,Finished Time,Canceled Time"
        );
    }

    #[test]
    fn absent_fields_are_blank() {
        let log = ActivityLog::from_records(&[seated_record()]);
        let csv = log.render_csv(&Utc);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "Amina,3,+971501234567,\"3/1/2026, 6:05:09 PM\",5,\"3/1/2026, 6:25:09 PM\",,"
        );
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("Smith, J"), "\"Smith, J\"");
        assert_eq!(escape("the \"big\" table"), "\"the \"\"big\"\" table\"");
    }

    #[test]
    fn time_zone_is_applied() {
        let dubai = chrono::FixedOffset::east_opt(4 * 3600).unwrap();
        let log = ActivityLog::from_records(&[seated_record()]);
        let csv = log.render_csv(&dubai);
        assert!(csv.contains("3/1/2026, 10:05:09 PM"));
    }
}
