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

/// Priority for the output callback thread when SAMPLESMITH_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

/// Reads SAMPLESMITH_THREAD_PRIORITY (0-99). Called while building the stream,
/// never from the callback.
pub fn callback_thread_priority() -> ThreadPriority {
    let requested = std::env::var("SAMPLESMITH_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(requested)
        .map(ThreadPriority::Crossplatform)
        .unwrap_or(ThreadPriority::Max)
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether the output callback thread should ask for SCHED_FIFO.
/// SAMPLESMITH_DISABLE_RT_AUDIO=1 turns it off.
pub fn rt_audio_enabled() -> bool {
    !env_flag("SAMPLESMITH_DISABLE_RT_AUDIO")
}

/// Raises the priority of the calling thread the first time it is called from it.
pub fn configure_audio_thread_priority(
    priority: &ThreadPriority,
    rt_audio: bool,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    *priority_set = true;

    let _ = set_current_thread_priority(priority.clone());

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            priority.clone(),
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled SCHED_FIFO for the output callback thread"),
            Err(e) => warn!(error = %e, "Unable to enable SCHED_FIFO for the output callback thread"),
        }
    }
    #[cfg(not(unix))]
    let _ = rt_audio;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        std::env::set_var("SAMPLESMITH_TEST_FLAG_ON", "Yes");
        std::env::set_var("SAMPLESMITH_TEST_FLAG_OFF", "0");
        assert!(env_flag("SAMPLESMITH_TEST_FLAG_ON"));
        assert!(!env_flag("SAMPLESMITH_TEST_FLAG_OFF"));
        assert!(!env_flag("SAMPLESMITH_TEST_FLAG_UNSET"));
    }
}
