use chrono::{NaiveTime, Timelike};
use qte_schemas::TimePhase;

/// Maps IST wall-clock time to a trading time-phase.
///
/// Boundaries (24h IST): Opening 09:15–09:45, Morning 09:45–13:00,
/// Afternoon 13:00–15:00, Closing 15:00–15:30, Other otherwise.
pub fn time_phase(ist_time: NaiveTime) -> TimePhase {
    let mins = ist_time.hour() as i64 * 60 + ist_time.minute() as i64;
    let opening = 9 * 60 + 15;
    let morning_end = 13 * 60;
    let afternoon_end = 15 * 60;
    let closing_end = 15 * 60 + 30;

    if mins < opening || mins >= closing_end {
        TimePhase::Other
    } else if mins < opening + 30 {
        TimePhase::Opening
    } else if mins < morning_end {
        TimePhase::Morning
    } else if mins < afternoon_end {
        TimePhase::Afternoon
    } else {
        TimePhase::Closing
    }
}
