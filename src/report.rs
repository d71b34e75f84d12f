//! The serialized form of per-feature results, written as newline-delimited JSON.

use {
    crate::errors::ReportError,
    geomatch_decision::{Hypothesis, Support},
    geomatch_evidence::Report,
    serde::{Deserialize, Serialize},
    std::io::Write,
};

/// Whether a reference feature could be evaluated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Evaluated,
    Failed,
    TimedOut,
}

/// The result for one reference feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureReport {
    pub reference: String,
    pub status: Status,
    /// `matched`, `no_match` or `ambiguous`. Missing unless the feature was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supports: Vec<SupportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The belief figures for one hypothesis. A missing candidate stands for the no-match hypothesis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SupportReport {
    pub candidate: Option<String>,
    pub belief: f64,
    pub plausibility: f64,
    pub pignistic: f64,
}

impl From<&Support<String>> for SupportReport {
    fn from(support: &Support<String>) -> Self {
        Self {
            candidate: match &support.hypothesis {
                Hypothesis::Candidate(id) => Some(id.clone()),
                Hypothesis::NoMatch => None,
            },
            belief: support.belief,
            plausibility: support.plausibility,
            pignistic: support.pignistic,
        }
    }
}

impl From<Report> for FeatureReport {
    fn from(report: Report) -> Self {
        Self {
            status: Status::Evaluated,
            verdict: Some(report.verdict.kind().to_string()),
            candidate: report.verdict.candidate().cloned(),
            conflict: Some(report.conflict),
            supports: report.supports.iter().map(SupportReport::from).collect(),
            error: None,
            reference: report.reference,
        }
    }
}

impl FeatureReport {
    /// A report for a feature that could not be evaluated.
    pub fn failed(reference: impl Into<String>, status: Status, error: impl ToString) -> Self {
        Self {
            reference: reference.into(),
            status,
            verdict: None,
            candidate: None,
            conflict: None,
            supports: vec![],
            error: Some(error.to_string()),
        }
    }
}

/// Writes each report as one line of JSON.
pub fn write_reports<W: Write>(writer: &mut W, reports: &[FeatureReport]) -> Result<(), ReportError> {
    for report in reports {
        serde_json::to_writer(&mut *writer, report)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomatch_decision::Verdict;

    #[test]
    fn serializes_json_lines() -> Result<(), Box<dyn std::error::Error>> {
        let report = Report {
            reference: "r1".to_string(),
            verdict: Verdict::Matched("c1".to_string()),
            conflict: 0.25,
            supports: vec![Support {
                hypothesis: Hypothesis::NoMatch,
                belief: 0.0,
                plausibility: 0.5,
                pignistic: 0.25,
            }],
        };
        let reports = vec![
            FeatureReport::from(report),
            FeatureReport::failed("r2", Status::TimedOut, "deadline elapsed"),
        ];
        let mut buffer = Vec::new();
        write_reports(&mut buffer, &reports)?;
        let output = String::from_utf8(buffer)?;
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"reference":"r1","status":"evaluated","verdict":"matched","candidate":"c1","conflict":0.25,"supports":[{"candidate":null,"belief":0.0,"plausibility":0.5,"pignistic":0.25}]}"#
        );
        assert_eq!(
            lines[1],
            r#"{"reference":"r2","status":"timed_out","error":"deadline elapsed"}"#
        );
        let parsed: FeatureReport = serde_json::from_str(lines[1])?;
        assert_eq!(parsed, reports[1]);
        Ok(())
    }
}
