// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the monitor thread when LOOPTONE_MONITOR_PRIORITY is unset.
const DEFAULT_MONITOR_THREAD_PRIORITY: u8 = 60;

/// Reads LOOPTONE_MONITOR_PRIORITY (0-99), falling back to the default.
pub fn monitor_thread_priority() -> Option<ThreadPriorityValue> {
    let priority = std::env::var("LOOPTONE_MONITOR_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_MONITOR_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(priority).ok()
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether to attempt SCHED_FIFO for the monitor thread. Opt out with
/// LOOPTONE_DISABLE_RT_MONITOR=1.
pub fn rt_monitor_enabled() -> bool {
    !env_flag("LOOPTONE_DISABLE_RT_MONITOR")
}

/// Raises the priority of the calling thread. Failures are logged and
/// otherwise ignored: the monitor still runs at normal priority.
pub fn configure_monitor_thread_priority(priority: Option<ThreadPriorityValue>, rt_monitor: bool) {
    let Some(priority) = priority else {
        return;
    };
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Failed to raise monitor thread priority");
    }

    #[cfg(unix)]
    if rt_monitor {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => {
                info!("Enabled RT SCHED_FIFO for monitor thread");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to set RT SCHED_FIFO for monitor thread"
                );
            }
        }
    }

    #[cfg(not(unix))]
    let _ = rt_monitor;
}
