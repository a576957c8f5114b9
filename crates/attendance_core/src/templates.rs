//! crates/attendance_core/src/templates.rs
//!
//! Message templates for every notice the bot posts.
//!
//! Templates use `{placeholder}` markers:
//! `{name}`, `{channel}`, `{time}`, `{duration}`, `{rest}` and, in the follow-up,
//! `{report_channel}`. Unknown markers are left as they are.

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::{ClockOutReason, Notice};
use crate::duration::format_hhmm;

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct Templates {
    pub clock_in: String,
    pub movement: String,
    pub rest_start: String,
    pub rest_end: String,
    pub clock_out: String,
    pub clock_out_inferred: String,
    pub follow_up: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            clock_in: "{name} clocked in at \"{channel}\".\nClock-in time\n{time}".to_string(),
            movement: "{name} moved to \"{channel}\".".to_string(),
            rest_start: "{name} started a break.".to_string(),
            rest_end: "{name} is back from a break ({rest}).".to_string(),
            clock_out: "{name} left \"{channel}\".\nClock-out time\n{time}\n\nWorked\n{duration}"
                .to_string(),
            clock_out_inferred: "{name} lost connection in \"{channel}\" and was clocked out.\nClock-out time\n{time}\n\nWorked\n{duration}"
                .to_string(),
            follow_up: "Please post the following template in <#{report_channel}>:\n◆Daily report\nDone\n・\nNext\n・\nComment\n・"
                .to_string(),
        }
    }
}

impl Templates {
    /// Renders the main message for a notice, with times shown at `offset`.
    pub fn render(&self, notice: &Notice, offset: FixedOffset) -> String {
        match notice {
            Notice::ClockIn {
                display_name,
                channel,
                at,
                ..
            } => fill(
                &self.clock_in,
                &[
                    ("name", display_name.as_str()),
                    ("channel", channel.as_str()),
                    ("time", local_time(*at, offset).as_str()),
                ],
            ),
            Notice::Move {
                display_name,
                channel,
                at,
                ..
            } => fill(
                &self.movement,
                &[
                    ("name", display_name.as_str()),
                    ("channel", channel.as_str()),
                    ("time", local_time(*at, offset).as_str()),
                ],
            ),
            Notice::RestStarted {
                display_name, at, ..
            } => fill(
                &self.rest_start,
                &[("name", display_name.as_str()), ("time", local_time(*at, offset).as_str())],
            ),
            Notice::RestEnded {
                display_name,
                rest_seconds,
                at,
                ..
            } => fill(
                &self.rest_end,
                &[
                    ("name", display_name.as_str()),
                    ("rest", format_hhmm(*rest_seconds).as_str()),
                    ("time", local_time(*at, offset).as_str()),
                ],
            ),
            Notice::ClockOut {
                display_name,
                channel,
                at,
                summary,
                reason,
                ..
            } => {
                let template = match reason {
                    ClockOutReason::Explicit => &self.clock_out,
                    ClockOutReason::Inferred => &self.clock_out_inferred,
                };
                fill(
                    template,
                    &[
                        ("name", display_name.as_str()),
                        ("channel", channel.as_str()),
                        ("time", local_time(*at, offset).as_str()),
                        ("duration", format_hhmm(summary.work_seconds).as_str()),
                        ("rest", format_hhmm(summary.rest_seconds).as_str()),
                    ],
                )
            }
        }
    }

    /// Renders the daily-report reminder posted under a clock-out.
    pub fn render_follow_up(&self, report_channel: &str) -> String {
        fill(&self.follow_up, &[("report_channel", report_channel)])
    }
}

/// Formats an instant as wall-clock time at the given offset.
pub fn local_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(TIME_FORMAT).to_string()
}

/// Substitutes `{key}` markers in one left-to-right pass; inserted values are never rescanned.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClockOutSummary, UserId};
    use chrono::{Duration, TimeZone};

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn clock_in_shows_local_time_and_channel() {
        let notice = Notice::ClockIn {
            user_id: UserId::new("u1"),
            display_name: "Alice".to_string(),
            channel: "office".to_string(),
            at: t0(),
        };
        let text = Templates::default().render(&notice, jst());
        assert_eq!(
            text,
            "Alice clocked in at \"office\".\nClock-in time\n2024/04/01 09:00:00"
        );
    }

    #[test]
    fn clock_out_shows_worked_duration() {
        let notice = Notice::ClockOut {
            user_id: UserId::new("u1"),
            display_name: "Alice".to_string(),
            channel: "office".to_string(),
            at: t0() + Duration::seconds(600),
            summary: ClockOutSummary {
                clock_in_time: t0(),
                clock_out_time: t0() + Duration::seconds(600),
                work_seconds: 480,
                rest_seconds: 120,
            },
            reason: ClockOutReason::Explicit,
        };
        let text = Templates::default().render(&notice, jst());
        assert!(text.starts_with("Alice left \"office\"."));
        assert!(text.ends_with("Worked\n00:08"));
    }

    #[test]
    fn inferred_clock_out_uses_its_own_template() {
        let notice = Notice::ClockOut {
            user_id: UserId::new("u1"),
            display_name: "Alice".to_string(),
            channel: "office".to_string(),
            at: t0() + Duration::seconds(3600),
            summary: ClockOutSummary {
                clock_in_time: t0(),
                clock_out_time: t0() + Duration::seconds(3600),
                work_seconds: 3600,
                rest_seconds: 0,
            },
            reason: ClockOutReason::Inferred,
        };
        let text = Templates::default().render(&notice, jst());
        assert!(text.contains("lost connection"));
        assert!(text.ends_with("Worked\n01:00"));
    }

    #[test]
    fn placeholders_inside_values_are_left_alone() {
        let notice = Notice::ClockIn {
            user_id: UserId::new("u1"),
            display_name: "{channel} {time}".to_string(),
            channel: "office".to_string(),
            at: t0(),
        };
        let text = Templates::default().render(&notice, jst());
        assert!(text.starts_with("{channel} {time} clocked in at \"office\"."));
    }

    #[test]
    fn unknown_and_unclosed_markers_pass_through() {
        let text = fill("{name} {nope} {", &[("name", "Alice")]);
        assert_eq!(text, "Alice {nope} {");
    }

    #[test]
    fn follow_up_names_the_report_channel() {
        let text = Templates::default().render_follow_up("C123");
        assert!(text.starts_with("Please post the following template in <#C123>:"));
    }
}
