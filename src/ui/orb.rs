//! The pulsing orb that visualizes conversation loudness.

use dioxus::prelude::*;

use crate::session::LiveStatus;

/// Growth of the orb at full volume.
const VOLUME_SCALE: f32 = 0.6;

pub fn orb_scale(volume: f32, status: LiveStatus) -> f32 {
    if status == LiveStatus::Connected {
        1.0 + volume.clamp(0.0, 1.0) * VOLUME_SCALE
    } else {
        1.0
    }
}

/// Tailwind background class for the orb core.
pub fn status_color(status: LiveStatus) -> &'static str {
    match status {
        LiveStatus::Error => "bg-red-500",
        LiveStatus::Connecting => "bg-amber-400",
        LiveStatus::Connected => "bg-cyan-400",
        LiveStatus::Disconnected => "bg-slate-600",
    }
}

#[allow(non_snake_case)]
#[component]
pub fn Orb(volume: f32, status: LiveStatus) -> Element {
    let color = status_color(status);
    let scale = orb_scale(volume, status);
    let glow = if status == LiveStatus::Connected {
        "shadow-[0_0_80px_-20px_rgba(34,211,238,0.6)]"
    } else {
        "shadow-none"
    };

    rsx! {
        div {
            class: "relative flex items-center justify-center w-64 h-64",

            div { class: "absolute inset-0 rounded-full blur-3xl opacity-30 transition-all duration-700 {color}" }
            div { class: "absolute inset-0 rounded-full border border-slate-400 opacity-20 animate-[spin_10s_linear_infinite]" }

            if status == LiveStatus::Connecting {
                div { class: "absolute inset-0 rounded-full border-4 border-t-transparent border-amber-400 animate-spin opacity-80" }
            }

            div {
                class: "relative w-24 h-24 rounded-full transition-all duration-100 ease-out {color} {glow}",
                style: "transform: scale({scale});",
                div { class: "absolute top-2 left-3 w-8 h-4 bg-white/30 rounded-full blur-sm -rotate-45" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_tracks_volume_only_when_connected() {
        assert_eq!(orb_scale(0.0, LiveStatus::Connected), 1.0);
        assert!((orb_scale(1.0, LiveStatus::Connected) - 1.6).abs() < 1e-6);
        assert!((orb_scale(0.5, LiveStatus::Connected) - 1.3).abs() < 1e-6);
        assert_eq!(orb_scale(1.0, LiveStatus::Connecting), 1.0);
        assert_eq!(orb_scale(4.0, LiveStatus::Error), 1.0);
    }

    #[test]
    fn test_each_status_has_distinct_color() {
        let colors = [
            status_color(LiveStatus::Disconnected),
            status_color(LiveStatus::Connecting),
            status_color(LiveStatus::Connected),
            status_color(LiveStatus::Error),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
