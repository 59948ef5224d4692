//! Main application entry point for the UI.

use std::time::{Duration, Instant};

use dioxus::prelude::*;

use crate::session::{LiveClient, LiveSnapshot, LiveStatus};

use super::orb::Orb;

/// Refresh cadence of the observable state, about one display frame.
const POLL_INTERVAL: Duration = Duration::from_millis(16);
const ERROR_BANNER_DURATION: Duration = Duration::from_secs(5);

#[allow(non_snake_case)]
pub fn App() -> Element {
    let client = use_context::<LiveClient>();

    let mut snapshot = use_signal(LiveSnapshot::default);
    let mut show_error = use_signal(|| false);

    let poll_client = client.clone();
    use_effect(move || {
        let client = poll_client.clone();
        spawn(async move {
            let mut last_error: Option<String> = None;
            let mut shown_at: Option<Instant> = None;
            loop {
                let current = client.snapshot();

                if current.error_message != last_error {
                    last_error = current.error_message.clone();
                    shown_at = last_error.as_ref().map(|_| Instant::now());
                }
                let visible = shown_at.is_some_and(|t| t.elapsed() < ERROR_BANNER_DURATION);
                if show_error() != visible {
                    show_error.set(visible);
                }
                if *snapshot.peek() != current {
                    snapshot.set(current);
                }

                tokio::time::sleep(POLL_INTERVAL).await;
            }
        });
    });

    let LiveSnapshot {
        status,
        error_message,
        volume,
    } = snapshot();
    let is_active = status == LiveStatus::Connected;
    let is_connecting = status == LiveStatus::Connecting;

    let banner_class = if show_error() {
        "opacity-100 translate-y-0"
    } else {
        "opacity-0 -translate-y-4 pointer-events-none"
    };
    let button_class = if is_active {
        "bg-red-500/10 hover:bg-red-500/20 border border-red-500/30 text-red-400"
    } else {
        "bg-cyan-500 hover:bg-cyan-400 text-slate-900"
    };
    let (headline, subline) = match status {
        LiveStatus::Connected => ("Listening...", "Go ahead, I'm listening."),
        LiveStatus::Connecting => ("Connecting", "Preparing your English coach..."),
        _ => (
            "Hello, Student",
            "Ready to practice your English conversation?",
        ),
    };
    let button_label = if is_active {
        "End Session"
    } else if is_connecting {
        "Connecting..."
    } else {
        "Start Conversation"
    };

    rsx! {
        script { src: "https://cdn.tailwindcss.com" }

        div {
            class: "relative min-h-screen w-full flex flex-col items-center justify-center overflow-hidden bg-slate-900 text-slate-100 font-sans",

            header {
                class: "absolute top-0 left-0 right-0 p-6 flex items-center gap-3",
                h1 { class: "text-lg font-semibold tracking-tight", "LingoLab Coach" }
                span {
                    class: "text-xs font-medium text-slate-400",
                    if is_active { "Session Active" } else { "Ready to Learn" }
                }
            }

            main {
                class: "relative flex flex-col items-center justify-center w-full max-w-xl px-4",

                div {
                    class: "absolute top-24 transition-all duration-300 transform {banner_class}",
                    div {
                        class: "bg-red-500/10 border border-red-500/20 text-red-200 px-4 py-2 rounded-lg text-sm font-medium",
                        {error_message.unwrap_or_default()}
                    }
                }

                div {
                    class: "mb-16",
                    Orb { volume: volume, status: status }
                }

                div {
                    class: "text-center space-y-2 mb-12 h-20",
                    h2 { class: "text-3xl font-light tracking-wide", "{headline}" }
                    p { class: "text-slate-400 text-base", "{subline}" }
                }

                button {
                    class: "rounded-full px-10 py-5 font-semibold text-lg transition-all duration-300 disabled:opacity-50 disabled:cursor-not-allowed {button_class}",
                    disabled: is_connecting,
                    onclick: move |_| client.toggle(),
                    "{button_label}"
                }
            }

            footer {
                class: "absolute bottom-6 text-slate-500 text-sm font-medium tracking-wide",
                "Powered by Gemini Live API"
            }
        }
    }
}
