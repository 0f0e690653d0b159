//! Replaying a timed sequence of outbound messages through a throttler.
//!
//! A scenario is a YAML document listing messages and the offset, in
//! milliseconds from the start of the replay, at which each one is handed to
//! the dispatch path:
//!
//! ```yaml
//! messages:
//!   - at_ms: 0
//!     kind: new_order
//!   - at_ms: 25
//!     kind: cancel_request
//!   - at_ms: 30
//!     kind: new_order
//!     poss_dup: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::clock::Clock;
use crate::error::{Result, ThrottleError};
use crate::throttle::{Admission, Message, MessageKind, OutboundMessage, Throttler};

/// One message of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Offset from the start of the replay
    pub at_ms: i64,
    #[serde(flatten)]
    pub message: OutboundMessage,
}

/// An ordered list of messages to dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub messages: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading scenario");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a scenario from a YAML string. Offsets must be non-negative and
    /// non-decreasing.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;

        let mut previous = 0;
        for (seq, step) in scenario.messages.iter().enumerate() {
            if step.at_ms < previous {
                return Err(ThrottleError::Config(format!(
                    "scenario message {} at {} ms is earlier than the one before it",
                    seq, step.at_ms
                )));
            }
            previous = step.at_ms;
        }

        Ok(scenario)
    }
}

/// What happened to a replayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Admitted,
    Delayed,
    Rejected,
}

/// One output row of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub seq: usize,
    /// Scheduled offset from the start of the replay
    pub at_ms: i64,
    pub kind: MessageKind,
    pub poss_dup: bool,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub overridden: bool,
    /// Offset at which the message left the throttler, if it was admitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admitted_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-verdict totals of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub admitted: usize,
    pub delayed: usize,
    pub rejected: usize,
}

impl ReplaySummary {
    pub fn from_records(records: &[ReplayRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            match record.verdict {
                Verdict::Admitted => summary.admitted += 1,
                Verdict::Delayed => summary.delayed += 1,
                Verdict::Rejected => summary.rejected += 1,
            }
            summary
        })
    }
}

/// Dispatch every message of `scenario` through `throttler`, in order.
///
/// `pace` is called with the absolute time each message is due and must not
/// return before then. If an earlier delay already pushed the dispatch path
/// past that time, the message goes out late, as it would on a real
/// dispatcher.
pub fn replay(
    throttler: &mut dyn Throttler,
    clock: &dyn Clock,
    scenario: &Scenario,
    mut pace: impl FnMut(i64),
) -> Vec<ReplayRecord> {
    let start = clock.now_ms();

    scenario
        .messages
        .iter()
        .enumerate()
        .map(|(seq, step)| {
            pace(start + step.at_ms);

            let mut record = ReplayRecord {
                seq,
                at_ms: step.at_ms,
                kind: step.message.kind(),
                poss_dup: step.message.is_poss_dup(),
                verdict: Verdict::Admitted,
                delay_ms: None,
                overridden: false,
                admitted_at_ms: None,
                error: None,
            };

            match throttler.check_throttle(&step.message) {
                Ok(Admission::Immediate) => {
                    record.admitted_at_ms = Some(clock.now_ms() - start);
                }
                Ok(Admission::Delayed {
                    delay_ms,
                    overridden,
                }) => {
                    record.verdict = Verdict::Delayed;
                    record.delay_ms = Some(delay_ms);
                    record.overridden = overridden;
                    record.admitted_at_ms = Some(clock.now_ms() - start);
                }
                Err(exceeded) => {
                    record.verdict = Verdict::Rejected;
                    record.error = Some(exceeded.message().to_string());
                }
            }

            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::throttle::{DispatchThrottler, MemorySink};

    const EXAMPLE: &str = r#"
messages:
  - at_ms: 0
    kind: new_order
  - at_ms: 10
    kind: new_order
  - at_ms: 20
    kind: cancel_replace
  - at_ms: 25
    kind: new_order
  - at_ms: 25
    kind: cancel_request
  - at_ms: 30
    kind: new_order
    poss_dup: true
"#;

    fn simulate(scenario: &Scenario, capacity: usize) -> Vec<ReplayRecord> {
        let clock = ManualClock::new(0);
        let mut throttler = DispatchThrottler::new(capacity, clock.clone(), clock.clone())
            .unwrap()
            .with_sink(Box::new(MemorySink::new()));

        replay(&mut throttler, &clock, scenario, |due| {
            if clock.now_ms() < due {
                clock.set(due);
            }
        })
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_yaml(EXAMPLE).unwrap();
        assert_eq!(scenario.messages.len(), 6);
        assert_eq!(scenario.messages[4].message.kind, MessageKind::CancelRequest);
        assert!(scenario.messages[5].message.poss_dup);
    }

    #[test]
    fn test_out_of_order_scenario_rejected() {
        let yaml = r#"
messages:
  - at_ms: 50
    kind: new_order
  - at_ms: 40
    kind: new_order
"#;
        assert!(matches!(Scenario::from_yaml(yaml), Err(ThrottleError::Config(_))));
    }

    #[test]
    fn test_replay_verdicts() {
        let scenario = Scenario::from_yaml(EXAMPLE).unwrap();
        let records = simulate(&scenario, 3);

        let verdicts: Vec<Verdict> = records.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Admitted,
                Verdict::Admitted,
                Verdict::Admitted,
                Verdict::Rejected,
                Verdict::Delayed,
                Verdict::Admitted,
            ]
        );

        assert_eq!(
            records[3].error.as_deref(),
            Some("Exceeded throttle rate of 3 messages per 1000 ms")
        );
        assert_eq!(records[4].delay_ms, Some(985));
        assert_eq!(records[4].admitted_at_ms, Some(1010));

        // The replay was due at 30 but the path was blocked until 1010, by
        // which time t=10 had left the window.
        assert_eq!(records[5].delay_ms, None);
        assert_eq!(records[5].admitted_at_ms, Some(1010));

        assert_eq!(
            ReplaySummary::from_records(&records),
            ReplaySummary {
                admitted: 4,
                delayed: 1,
                rejected: 1,
            }
        );
    }

    #[test]
    fn test_record_serializes_compactly() {
        let scenario = Scenario::from_yaml(EXAMPLE).unwrap();
        let records = simulate(&scenario, 3);

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["verdict"], "admitted");
        assert_eq!(json["kind"], "new_order");
        assert!(json.get("error").is_none());
        assert!(json.get("overridden").is_none());

        let json = serde_json::to_value(&records[3]).unwrap();
        assert_eq!(json["verdict"], "rejected");
        assert!(json.get("admitted_at_ms").is_none());
    }
}
