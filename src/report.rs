//! Session reports
//!
//! A report summarizes one proctored attempt for the collaborator that
//! grades or audits it. Written as pretty JSON files, one per session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::session::SessionOutcome;
use crate::violation::Violation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<SessionOutcome>,
    pub warning_count: u32,
    pub max_warnings: u32,
    pub violations: Vec<Violation>,
}

pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(reports_dir: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let reports_dir = reports_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&reports_dir)?;
        Ok(Self { reports_dir })
    }

    pub fn write(&self, report: &SessionReport) -> Result<PathBuf, std::io::Error> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self
            .reports_dir
            .join(format!("session_{}_{}.json", report.session_id, timestamp));
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ViolationKind;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports")).unwrap();

        let report = SessionReport {
            session_id: Uuid::new_v4(),
            started_at: Some(Utc::now()),
            ended_at: Some(Utc::now()),
            outcome: Some(SessionOutcome::AutoSubmitted),
            warning_count: 3,
            max_warnings: 3,
            violations: vec![Violation::new(ViolationKind::TabSwitch, Utc::now())],
        };

        let path = writer.write(&report).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let parsed: SessionReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.session_id, report.session_id);
        assert_eq!(parsed.outcome, Some(SessionOutcome::AutoSubmitted));
        assert_eq!(parsed.violations, report.violations);
    }
}
