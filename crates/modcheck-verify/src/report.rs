//! Session report: everything a failed run needs to be reproduced.

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageMetrics;
use crate::mirror::ConsistencyFailure;
use crate::scoreboard::{Leftover, Mismatch};
use crate::session::SessionConfig;

/// Outcome of one verification session. The session passes only if no
/// non-fatal error of any kind occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub passed: bool,
    /// Echo of the configuration, so any failure reproduces from the seed.
    pub config: SessionConfig,
    pub streams_driven: u64,
    pub matched: u64,
    pub mismatches: Vec<Mismatch>,
    pub leftovers: Vec<Leftover>,
    pub consistency_failures: Vec<ConsistencyFailure>,
    pub register_checks: u64,
    pub coverage: CoverageMetrics,
}

impl SessionReport {
    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Verification Session Report ===\n\n");
        out.push_str(&format!(
            "Result: {}\n",
            if self.passed { "PASS" } else { "FAIL" }
        ));
        out.push_str(&format!(
            "Divisor: {}  Policy: {:?}  Seed: {}\n",
            self.config.divisor, self.config.policy, self.config.seed
        ));
        out.push_str(&format!("Streams driven: {}\n", self.streams_driven));
        out.push_str(&format!("Verdicts matched: {}\n", self.matched));

        out.push_str(&format!("Mismatches: {}\n", self.mismatches.len()));
        for mismatch in &self.mismatches {
            match mismatch {
                Mismatch::Wrong { expected, observed } => out.push_str(&format!(
                    "  value {} ({} bits): expected {}, observed {}\n",
                    expected.value, expected.bit_length, expected.verdict, observed
                )),
                Mismatch::Orphan { observed } => out.push_str(&format!(
                    "  observed {observed} with nothing expected\n"
                )),
            }
        }

        out.push_str(&format!("Leftover expectations: {}\n", self.leftovers.len()));
        for Leftover(e) in &self.leftovers {
            out.push_str(&format!(
                "  value {} ({} bits): expected {}, never observed\n",
                e.value, e.bit_length, e.verdict
            ));
        }

        out.push_str(&format!(
            "Register checks: {} ({} failed)\n",
            self.register_checks,
            self.consistency_failures.len()
        ));
        for f in &self.consistency_failures {
            out.push_str(&format!(
                "  {:?} path: predicted {}, read back {}\n",
                f.path, f.predicted, f.read_back
            ));
        }

        let c = &self.coverage;
        out.push_str("Coverage:\n");
        out.push_str(&format!(
            "  stream length: {}/{} buckets ({:.1}%)\n",
            c.length_covered, c.length_total, c.length_pct
        ));
        out.push_str(&format!(
            "  stream value:  {}/{} buckets ({:.1}%)\n",
            c.value_covered, c.value_total, c.value_pct
        ));
        out.push_str(&format!(
            "  verdict:       {} ({:.1}%)\n",
            if c.verdict_covered { "both seen" } else { "incomplete" },
            c.verdict_pct
        ));
        out.push_str(&format!("  overall:       {:.1}%\n", c.overall_pct));

        out
    }
}
