//! Historical enrollment records (CSV) used to seed a minimizer before live
//! randomization starts.
//!
//! The first non-blank line is a header naming one column per factor, in any
//! order, plus an arm column (`Arm` unless told otherwise). Every later row is
//! one participant, consumed in file order:
//!
//! ```text
//! Sex,Age,Arm
//! Male,10-20,Treat1
//! "Female",30+,Treat2
//! ```
//!
//! Fields may be double-quoted (`""` inside quotes is a literal quote) and are
//! trimmed. Blank lines are skipped.

use std::io::BufRead;

use tracing::debug;

use crate::error::{Error, Result};
use crate::trial::{Minimizer, Participant};

pub const DEFAULT_ARM_COLUMN: &str = "Arm";

/// One enrolled participant and the arm they are in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    pub line: usize,
    pub participant: Participant,
    pub arm: String,
}

/// Parse every record. Factor and arm names are not checked here; see
/// `Minimizer::load_history`.
pub fn read_participants<R: BufRead>(reader: R, arm_column: &str) -> Result<Vec<HistoryRecord>> {
    let mut header: Option<(Vec<String>, usize)> = None;
    let mut out = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let mut line = line?;
        // spreadsheet exports often start with a UTF-8 byte order mark
        if i == 0 && line.starts_with('\u{feff}') {
            line.remove(0);
        }
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(&line).map_err(|reason| Error::MalformedRecord { line: line_no, reason })?;

        let Some((columns, arm_at)) = &header else {
            let arm_at = fields.iter().position(|c| c == arm_column).ok_or_else(|| Error::MalformedRecord {
                line: line_no,
                reason: format!("header has no '{arm_column}' column"),
            })?;
            if let Some(dup) = fields.iter().enumerate().find(|&(j, c)| fields[..j].contains(c)) {
                return Err(Error::MalformedRecord {
                    line: line_no,
                    reason: format!("column '{}' appears twice", dup.1),
                });
            }
            header = Some((fields, arm_at));
            continue;
        };

        if fields.len() != columns.len() {
            return Err(Error::MalformedRecord {
                line: line_no,
                reason: format!("expected {} fields, found {}", columns.len(), fields.len()),
            });
        }
        let mut participant = Participant::new();
        let mut arm = String::new();
        for (j, (column, value)) in columns.iter().zip(fields).enumerate() {
            if j == *arm_at {
                arm = value;
            } else {
                participant.insert(column.clone(), value);
            }
        }
        out.push(HistoryRecord { line: line_no, participant, arm });
    }

    debug!(records = out.len(), "history parsed");
    Ok(out)
}

/// Split one CSV line, honouring double quotes.
fn split_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                cur.push('"');
            }
            ('"', true) => quoted = false,
            ('"', false) if cur.trim().is_empty() => {
                cur.clear();
                quoted = true;
            }
            (',', false) => fields.push(std::mem::take(&mut cur).trim().to_string()),
            _ => cur.push(c),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(cur.trim().to_string());
    Ok(fields)
}

impl Minimizer {
    /// Seed the count table from CSV history with the default `Arm` column.
    /// Returns how many participants were added. The file is validated in
    /// full first; on error nothing is added.
    pub fn load_history<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        self.load_history_with_column(reader, DEFAULT_ARM_COLUMN)
    }

    pub fn load_history_with_column<R: BufRead>(&mut self, reader: R, arm_column: &str) -> Result<usize> {
        let records = read_participants(reader, arm_column)?;
        let added = self
            .add_existing_participants(records.iter().map(|r| (&r.participant, r.arm.as_str())))
            .map_err(|e| match records.iter().find(|r| self.check_record(r).is_err()) {
                Some(r) => Error::MalformedRecord { line: r.line, reason: e.to_string() },
                None => e,
            })?;
        debug!(added, total = self.total_participants(), "history loaded");
        Ok(added)
    }

    fn check_record(&self, record: &HistoryRecord) -> Result<()> {
        self.get_current_x_counts(&record.participant)?;
        if !self.arm_names().contains(&record.arm.as_str()) {
            return Err(Error::UnknownArm(record.arm.clone()));
        }
        Ok(())
    }
}
