//! Scripted end-to-end scenarios
//!
//! All messages are offered at time zero over a channel with a fixed 2-unit
//! delay and a 16-unit timeout, so every transmission time below is exact.

use arq_protocol::{ArqConfig, Message};
use arq_sim::{Fault, Side};
use arq_tests::{expected_messages, run_scripted};
use std::time::Duration;

#[test]
fn test_go_back_n_lost_acks_resend_tail() {
    let faults = (2..=5).map(Fault::drop_ack).collect();
    let report = run_scripted(ArqConfig::go_back_n(), 6, faults);

    assert!(report.finished);
    assert_eq!(report.data_sequence(), vec![0, 1, 2, 3, 4, 5, 2, 3, 4, 5]);
    assert_eq!(report.delivered, expected_messages(6));
    assert_eq!(report.sender.timeouts, 1);
    assert_eq!(report.sender.packets_resent, 4);
    assert_eq!(report.receiver.delivered, 6);

    // The resends all go out at the single timeout
    let resend_times: Vec<Duration> = report
        .transmissions
        .iter()
        .filter(|tx| tx.from == Side::A)
        .skip(6)
        .map(|tx| tx.at)
        .collect();
    assert_eq!(resend_times, vec![Duration::from_millis(16); 4]);
}

#[test]
fn test_go_back_n_single_lost_ack_covered_cumulatively() {
    let report = run_scripted(ArqConfig::go_back_n(), 6, vec![Fault::drop_ack(2)]);

    assert!(report.is_consistent());
    assert_eq!(report.data_sequence(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(report.sender.packets_resent, 0);
    assert_eq!(report.sender.timeouts, 0);
}

#[test]
fn test_go_back_n_lost_data_resends_tail() {
    let report = run_scripted(ArqConfig::go_back_n(), 6, vec![Fault::drop_data(2)]);

    assert_eq!(report.data_sequence(), vec![0, 1, 2, 3, 4, 5, 2, 3, 4, 5]);
    assert_eq!(report.delivered, expected_messages(6));
    // 3, 4 and 5 arrive out of order and each repeats ACK 1
    assert_eq!(&report.ack_sequence()[..5], &[0, 1, 1, 1, 1]);
    assert_eq!(report.receiver.out_of_window, 3);
}

#[test]
fn test_selective_repeat_lost_data_resends_only_the_gap() {
    let report = run_scripted(ArqConfig::selective_repeat(), 6, vec![Fault::drop_data(3)]);

    assert!(report.finished);
    assert_eq!(report.data_sequence(), vec![0, 1, 2, 3, 4, 5, 3]);
    assert_eq!(report.data_transmissions(3), 2);
    assert_eq!(report.data_transmissions(4), 1);
    assert_eq!(report.data_transmissions(5), 1);
    assert_eq!(report.delivered, expected_messages(6));
    assert_eq!(report.sender.packets_resent, 1);
}

#[test]
fn test_selective_repeat_buffers_out_of_order() {
    let report = run_scripted(ArqConfig::selective_repeat(), 6, vec![Fault::drop_data(3)]);

    // 4 and 5 are acknowledged individually before the gap is filled
    assert_eq!(report.ack_sequence(), vec![0, 1, 2, 4, 5, 3]);
    assert_eq!(report.sender.new_acks, 6);
}

#[test]
fn test_corrupted_ack_treated_as_lost() {
    for arq in [ArqConfig::go_back_n(), ArqConfig::selective_repeat()] {
        let report = run_scripted(arq, 1, vec![Fault::corrupt_ack(0)]);

        assert_eq!(report.sender.corrupted_acks, 1, "{}", arq.mode);
        assert_eq!(report.sender.timeouts, 1, "{}", arq.mode);
        assert_eq!(report.data_transmissions(0), 2, "{}", arq.mode);
        assert_eq!(report.delivered, vec![Message::filled(b'a')], "{}", arq.mode);
        assert_eq!(report.receiver.duplicates, 1, "{}", arq.mode);
        assert_eq!(report.ack_sequence(), vec![0, 0], "{}", arq.mode);
    }
}

#[test]
fn test_corrupted_data_recovered() {
    for arq in [ArqConfig::go_back_n(), ArqConfig::selective_repeat()] {
        let report = run_scripted(arq, 3, vec![Fault::corrupt_data(1)]);

        assert_eq!(report.receiver.corrupted, 1, "{}", arq.mode);
        assert!(report.data_transmissions(1) >= 2, "{}", arq.mode);
        assert_eq!(report.delivered, expected_messages(3), "{}", arq.mode);
    }
}

#[test]
fn test_duplicated_data_delivered_once() {
    for arq in [ArqConfig::go_back_n(), ArqConfig::selective_repeat()] {
        let report = run_scripted(arq, 1, vec![Fault::duplicate_data(0)]);

        assert_eq!(report.ack_sequence(), vec![0, 0], "{}", arq.mode);
        assert_eq!(report.delivered, vec![Message::filled(b'a')], "{}", arq.mode);
        assert_eq!(report.receiver.duplicates, 1, "{}", arq.mode);
        assert_eq!(report.sender.packets_resent, 0, "{}", arq.mode);
        assert_eq!(report.sender.out_of_window_acks, 1, "{}", arq.mode);
    }
}

#[test]
fn test_duplicated_ack_is_harmless() {
    for arq in [ArqConfig::go_back_n(), ArqConfig::selective_repeat()] {
        let report = run_scripted(arq, 3, vec![Fault::duplicate_ack(0)]);

        assert!(report.is_consistent(), "{}", arq.mode);
        assert_eq!(report.sender.new_acks, 3, "{}", arq.mode);
        assert_eq!(report.sender.packets_resent, 0, "{}", arq.mode);
    }
}

#[test]
fn test_sequence_numbers_wrap() {
    // Forty messages spread out over time walk the ring several times
    for arq in [ArqConfig::go_back_n(), ArqConfig::selective_repeat()] {
        let config = arq_sim::SimConfig {
            mean_interval: 10.0,
            messages: 40,
            ..arq_tests::scripted(arq, 40, Vec::new())
        };
        let report = arq_tests::run(config);

        assert!(report.is_consistent(), "{}", arq.mode);
        let max_seq = report.data_sequence().into_iter().max().unwrap_or(0);
        assert_eq!(max_seq as u32, arq.seq_space - 1, "{}", arq.mode);
    }
}

#[test]
fn test_no_timer_misuse_in_scenarios() {
    let report = run_scripted(ArqConfig::go_back_n(), 6, vec![Fault::drop_data(0)]);
    assert_eq!(report.timer_warnings, 0);
    assert_eq!(report.delivered, expected_messages(6));
}
