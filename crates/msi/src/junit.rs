use crate::session::{Outcome, TestCase};
use msi_core::{HarnessError, Result};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a single-suite JUnit XML document
pub fn render(
    suite: &str,
    elapsed: Duration,
    properties: &[(String, String)],
    cases: &[TestCase],
) -> String {
    let count = |pred: fn(&Outcome) -> bool| cases.iter().filter(|c| pred(&c.outcome)).count();
    let failures = count(|o| matches!(o, Outcome::Failed(_)));
    let errors = count(|o| matches!(o, Outcome::Error { .. }));
    let skipped = count(|o| matches!(o, Outcome::Skipped(_)));

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<testsuites>\n");
    let _ = writeln!(
        xml,
        "  <testsuite name=\"{}\" errors=\"{}\" failures=\"{}\" skipped=\"{}\" tests=\"{}\" time=\"{:.3}\">",
        escape(suite),
        errors,
        failures,
        skipped,
        cases.len(),
        elapsed.as_secs_f64()
    );

    if !properties.is_empty() {
        xml.push_str("    <properties>\n");
        for (name, value) in properties {
            let _ = writeln!(
                xml,
                "      <property name=\"{}\" value=\"{}\"/>",
                escape(name),
                escape(value)
            );
        }
        xml.push_str("    </properties>\n");
    }

    for case in cases {
        let _ = write!(
            xml,
            "    <testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\"",
            escape(suite),
            escape(&case.name),
            case.duration.as_secs_f64()
        );
        let child = match &case.outcome {
            Outcome::Passed => None,
            Outcome::Failed(message) => Some(("failure", message.clone())),
            Outcome::Error { phase, message } => {
                Some(("error", format!("failed on {}: {}", phase, message)))
            }
            Outcome::Skipped(reason) => Some(("skipped", reason.clone())),
        };
        match child {
            None => xml.push_str("/>\n"),
            Some((tag, message)) => {
                let _ = writeln!(
                    xml,
                    ">\n      <{} message=\"{}\"/>\n    </testcase>",
                    tag,
                    escape(&message)
                );
            }
        }
    }

    xml.push_str("  </testsuite>\n</testsuites>\n");
    xml
}

/// Write `xml` to `path`, creating parent directories
pub fn write(path: &Path, xml: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, &e))?;
    }
    std::fs::write(path, xml).map_err(|e| HarnessError::io(path, &e))
}
