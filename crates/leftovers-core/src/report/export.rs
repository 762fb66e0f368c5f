//! CSV table and plain-text summary of a [`StatisticsReport`].

use csv::{Terminator, WriterBuilder};

use super::stats::StatisticsReport;
use super::{ReportError, ReportResult};

const BOM: &str = "\u{feff}";
const DATE: &str = "%d/%m/%Y";
const TIMESTAMP: &str = "%d/%m/%Y %H:%M";

const CSV_HEADER: [&str; 7] = [
    "ID",
    "Preparation",
    "Dose",
    "Expiry",
    "Used",
    "Resolved",
    "Created",
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl StatisticsReport {
    /// Semicolon-delimited table of the included records, prefixed with a
    /// UTF-8 byte order mark.
    pub fn to_csv(&self) -> ReportResult<String> {
        let mut wtr = WriterBuilder::new()
            .delimiter(b';')
            .terminator(Terminator::Any(b'\n'))
            .from_writer(BOM.as_bytes().to_vec());

        wtr.write_record(CSV_HEADER)?;
        for included in &self.records {
            let r = &included.record;
            wtr.write_record([
                r.id.as_str(),
                r.preparation_name.as_str(),
                r.dose.as_str(),
                &r.expiry_date.to_string(),
                yes_no(r.used),
                yes_no(r.resolved),
                &included.created_local.format(TIMESTAMP).to_string(),
            ])?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| ReportError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Fixed-format summary: period, generation time, status counters with
    /// their share of the total, and the utilization rate.
    pub fn to_text(&self) -> String {
        let c = &self.counts;
        let line = |label: &str, count: usize| {
            format!("{}: {} ({:.1}%)\n", label, count, c.share(count))
        };

        let mut out = String::new();
        out.push_str("LEFTOVER STATISTICS REPORT\n");
        out.push_str("==========================\n");
        out.push_str(&format!(
            "Period: {} - {}\n",
            self.window.start.format(DATE),
            self.window.end.format(DATE)
        ));
        out.push_str(&format!("Generated: {}\n\n", self.generated_at.format(TIMESTAMP)));

        out.push_str("SUMMARY\n");
        out.push_str("-------\n");
        out.push_str(&format!("Total preparations: {}\n", c.total));
        out.push_str(&line("Utilized (used)", c.utilized()));
        out.push_str(&line("Resolved", c.resolved));
        out.push_str(&line("Pending", c.pending));
        out.push_str(&line("Expired", c.expired));
        out.push_str(&format!("\nUTILIZATION RATE: {:.1}%\n", c.utilization_rate()));
        out
    }

    /// `statistics_<yyyy-mm-dd>.csv`, dated by generation day.
    pub fn csv_file_name(&self) -> String {
        format!("statistics_{}.csv", self.generated_at.format("%Y-%m-%d"))
    }

    /// `report_<yyyy-mm-dd>.txt`, dated by generation day.
    pub fn text_file_name(&self) -> String {
        format!("report_{}.txt", self.generated_at.format("%Y-%m-%d"))
    }
}
