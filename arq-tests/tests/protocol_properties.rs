//! Property-based tests for the sender and receiver engines
//!
//! Engines are driven directly through a recording environment for the
//! window and timer invariants, and end to end through the emulator for
//! delivery correctness.

use arq_protocol::{
    AckOutcome, ArqConfig, DataOutcome, Message, Packet, Receiver, RecordingEnvironment, Sender,
};
use arq_sim::{ChannelConfig, SimConfig};
use proptest::prelude::*;
use std::time::Duration;

// Property test strategies

fn arq_config_strategy() -> impl Strategy<Value = ArqConfig> {
    prop_oneof![
        Just(ArqConfig::go_back_n()),
        Just(ArqConfig::selective_repeat()),
    ]
}

fn channel_strategy() -> impl Strategy<Value = ChannelConfig> {
    (0.0..0.3f64, 0.0..0.3f64, 0.0..0.2f64).prop_map(|(loss, corrupt, duplicate)| ChannelConfig {
        loss,
        corrupt,
        duplicate,
        ..ChannelConfig::default()
    })
}

#[derive(Debug, Clone)]
enum SenderOp {
    Submit,
    Ack { ack: u32, corrupt: bool },
    Timeout,
    Advance(u64),
}

fn sender_op_strategy() -> impl Strategy<Value = SenderOp> {
    prop_oneof![
        3 => Just(SenderOp::Submit),
        3 => (0u32..12, any::<bool>()).prop_map(|(ack, corrupt)| SenderOp::Ack { ack, corrupt }),
        1 => Just(SenderOp::Timeout),
        1 => (1u64..20).prop_map(SenderOp::Advance),
    ]
}

fn message(n: usize) -> Message {
    Message::filled(b'a' + (n % 26) as u8)
}

// Property tests

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_accepted_message_delivered_once_in_order(
        arq in arq_config_strategy(),
        channel in channel_strategy(),
        messages in 1u64..40,
        mean_interval in 0.0..40.0f64,
        seed in any::<u64>(),
    ) {
        let report = arq_tests::run(SimConfig {
            arq,
            channel,
            messages,
            mean_interval,
            seed,
            ..SimConfig::default()
        });

        prop_assert!(report.finished);
        prop_assert_eq!(&report.delivered, &report.accepted);
        prop_assert_eq!(report.timer_warnings, 0);
        prop_assert_eq!(
            report.accepted.len() as u64 + report.sender.window_full,
            messages
        );
    }
}

proptest! {
    #[test]
    fn prop_window_bound_and_timer_liveness(
        arq in arq_config_strategy(),
        ops in prop::collection::vec(sender_op_strategy(), 1..200),
    ) {
        let mut sender = Sender::new(arq).unwrap();
        let mut env = RecordingEnvironment::new();
        let mut submitted = 0;

        for op in ops {
            match op {
                SenderOp::Submit => {
                    sender.submit(&mut env, message(submitted));
                    submitted += 1;
                }
                SenderOp::Ack { ack, corrupt } => {
                    let mut packet = Packet::ack(ack % arq.seq_space);
                    if corrupt {
                        packet.checksum = packet.checksum.wrapping_add(1);
                    }
                    sender.on_ack(&mut env, &packet);
                }
                SenderOp::Timeout => {
                    if env.expire_timer() {
                        let resent = sender.on_timeout(&mut env);
                        prop_assert!(resent >= 1);
                    }
                }
                SenderOp::Advance(ms) => env.advance(Duration::from_millis(ms)),
            }

            prop_assert!(sender.outstanding() <= arq.window_size);
            prop_assert_eq!(sender.timer_active(), sender.outstanding() > 0);
            prop_assert_eq!(env.timer.is_some(), sender.timer_active());
        }
    }

    #[test]
    fn prop_repeated_ack_is_idempotent(
        arq in arq_config_strategy(),
        sent in 1usize..=6,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut sender = Sender::new(arq).unwrap();
        let mut env = RecordingEnvironment::new();
        for n in 0..sent {
            sender.submit(&mut env, message(n));
        }
        let ack = Packet::ack(pick.index(sent) as u32);

        let first = sender.on_ack(&mut env, &ack);
        let first_accepted = matches!(first, AckOutcome::Accepted { .. });
        prop_assert!(first_accepted);
        let base = sender.base();
        let outstanding = sender.outstanding();
        let transmitted = env.transmitted.len();

        let second = sender.on_ack(&mut env, &ack);
        prop_assert!(matches!(second, AckOutcome::Duplicate | AckOutcome::OutOfWindow));
        prop_assert_eq!(sender.base(), base);
        prop_assert_eq!(sender.outstanding(), outstanding);
        prop_assert_eq!(env.transmitted.len(), transmitted);
    }

    #[test]
    fn prop_duplicate_data_delivered_once_and_reacknowledged(
        arq in arq_config_strategy(),
        copies in prop::collection::vec(1usize..=3, 1..30),
    ) {
        let ring = arq.ring();
        let mut receiver = Receiver::new(arq).unwrap();
        let mut env = RecordingEnvironment::new();
        let mut fed = 0;

        for (n, &count) in copies.iter().enumerate() {
            let packet = Packet::data(ring.add(0, n as u32), &message(n));
            for copy in 0..count {
                let outcome = receiver.on_data(&mut env, &packet);
                if copy == 0 {
                    prop_assert_eq!(outcome, DataOutcome::Accepted { delivered: 1 });
                } else {
                    prop_assert_eq!(outcome, DataOutcome::Duplicate);
                }
                fed += 1;
            }
        }

        let expected: Vec<Message> = (0..copies.len()).map(message).collect();
        prop_assert_eq!(&env.delivered, &expected);
        // Every copy is answered with an ACK for its own sequence number
        prop_assert_eq!(env.transmitted.len(), fed);
    }

    #[test]
    fn prop_corrupted_data_never_delivered(
        arq in arq_config_strategy(),
        seq in 0u32..7,
        delta in 1i32..1000,
    ) {
        let mut receiver = Receiver::new(arq).unwrap();
        let mut env = RecordingEnvironment::new();
        let mut packet = Packet::data(seq, &message(0));
        packet.checksum = packet.checksum.wrapping_add(delta);

        prop_assert_eq!(receiver.on_data(&mut env, &packet), DataOutcome::Corrupted);
        prop_assert!(env.delivered.is_empty());
        prop_assert_eq!(receiver.expected(), 0);
    }
}
