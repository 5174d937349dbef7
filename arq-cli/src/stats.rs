//! Statistics display and formatting

use arq_sim::time;
use arq_sim::SimReport;
use std::fmt::Write;
use std::time::Duration;

/// Format simulated time in time units
pub fn format_time_units(duration: Duration) -> String {
    format!("{:.3}", time::as_units(duration))
}

/// Format `part` as a percentage of `total`
pub fn format_percent(part: u64, total: u64) -> String {
    if total == 0 {
        "N/A".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / total as f64)
    }
}

/// Render the end-of-run statistics table
pub fn render_report(report: &SimReport) -> String {
    let mut out = String::new();
    let sender = &report.sender;
    let receiver = &report.receiver;
    let channel = &report.channel;

    // Writing into a String cannot fail
    let _ = writeln!(out, "┌──────────────────────────────────────────────┐");
    let _ = writeln!(out, "│ EMULATION STATISTICS                         │");
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    let _ = writeln!(
        out,
        "│ Simulated time:          {:>19} │",
        format_time_units(report.end_time)
    );
    let _ = writeln!(
        out,
        "│ Completed:               {:>19} │",
        if report.finished { "yes" } else { "time limit" }
    );
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    let _ = writeln!(out, "│ SENDER (A)                                   │");
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    for (label, value) in [
        ("Messages generated", report.messages_generated),
        ("Messages accepted", sender.messages_sent),
        ("Window full drops", sender.window_full),
        ("Packets sent", sender.packets_sent),
        ("Packets resent", sender.packets_resent),
        ("ACKs received", sender.acks_received),
        ("New ACKs", sender.new_acks),
        ("Duplicate ACKs", sender.duplicate_acks),
        ("Corrupted ACKs", sender.corrupted_acks),
        ("Timeouts", sender.timeouts),
    ] {
        let _ = writeln!(out, "│ {:<24} {:>19} │", label, value);
    }
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    let _ = writeln!(out, "│ RECEIVER (B)                                 │");
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    for (label, value) in [
        ("Packets received", receiver.packets_received),
        ("Corrupted packets", receiver.corrupted),
        ("Duplicate packets", receiver.duplicates),
        ("Out of window", receiver.out_of_window),
        ("Messages delivered", receiver.delivered),
        ("ACKs sent", receiver.acks_sent),
    ] {
        let _ = writeln!(out, "│ {:<24} {:>19} │", label, value);
    }
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    let _ = writeln!(out, "│ CHANNEL                                      │");
    let _ = writeln!(out, "├──────────────────────────────────────────────┤");
    for (label, value, share) in [
        ("Packets lost", channel.lost, true),
        ("Packets corrupted", channel.corrupted, true),
        ("Packets duplicated", channel.duplicated, true),
        ("Timer warnings", report.timer_warnings, false),
    ] {
        let shown = if share {
            format!("{} ({})", value, format_percent(value, channel.frames_sent))
        } else {
            value.to_string()
        };
        let _ = writeln!(out, "│ {:<24} {:>19} │", label, shown);
    }
    let _ = writeln!(out, "└──────────────────────────────────────────────┘");
    out
}

/// Print the statistics table to stdout
pub fn display_report(report: &SimReport) {
    print!("{}", render_report(report));
}
