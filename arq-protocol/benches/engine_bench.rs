use arq_protocol::checksum;
use arq_protocol::{ArqConfig, Message, Packet, Receiver, RecordingEnvironment, SeqSpace, Sender};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn bench_packet_codec(c: &mut Criterion) {
    let packet = Packet::data(5, &Message::filled(b'f'));
    let bytes = packet.to_bytes();

    c.bench_function("packet_serialize", |b| {
        b.iter(|| {
            let bytes = black_box(&packet).to_bytes();
            black_box(bytes);
        });
    });

    c.bench_function("packet_deserialize", |b| {
        b.iter(|| {
            let packet = Packet::from_bytes(black_box(&bytes)).unwrap();
            black_box(packet);
        });
    });

    c.bench_function("checksum", |b| {
        b.iter(|| {
            let sum = checksum::compute(black_box(&packet));
            black_box(sum);
        });
    });
}

fn bench_seq_space_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_ring");
    let ring = SeqSpace::new(12);

    group.bench_function("distance", |b| {
        b.iter(|| {
            let dist = ring.distance(black_box(3), black_box(9));
            black_box(dist);
        });
    });

    group.bench_function("in_window", |b| {
        b.iter(|| {
            let inside = ring.in_window(black_box(1), black_box(9), black_box(6));
            black_box(inside);
        });
    });

    group.finish();
}

fn bench_window_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_cycle");
    let window = ArqConfig::selective_repeat().window_size;
    group.throughput(Throughput::Elements(window as u64));

    for (name, config) in [
        ("go_back_n", ArqConfig::go_back_n()),
        ("selective_repeat", ArqConfig::selective_repeat()),
    ] {
        group.bench_function(name, |b| {
            let mut sender = Sender::new(config).unwrap();
            let mut receiver = Receiver::new(config).unwrap();
            let mut a = RecordingEnvironment::new();
            let mut z = RecordingEnvironment::new();

            b.iter(|| {
                for n in 0..window {
                    sender.submit(&mut a, Message::filled(b'a' + n as u8));
                }
                for packet in a.take_transmitted() {
                    receiver.on_data(&mut z, &packet);
                }
                for ack in z.take_transmitted() {
                    sender.on_ack(&mut a, &ack);
                }
                z.delivered.clear();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_packet_codec, bench_seq_space_ops, bench_window_cycle);
criterion_main!(benches);
