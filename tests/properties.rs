//! Property tests: urutan operasi acak di satu thread dibandingkan dengan
//! model `VecDeque`.

#![cfg(not(feature = "loom"))]

use std::collections::VecDeque;

use proptest::prelude::*;
use ringpipe::{round_capacity, Cursors, RingBuffer};

#[derive(Debug, Clone)]
enum Op {
    /// Reserve `len`, isi penuh, commit semua
    Write(usize),
    /// Reserve `len`, commit sebagian (`keep` dimodulo panjang grant + 1)
    WritePrefix(usize, usize),
    /// Reserve `len` lalu drop tanpa commit
    AbandonWrite(usize),
    Read(usize),
    ReadPrefix(usize, usize),
    AbandonRead(usize),
}

fn op_strategy(max_len: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..=max_len).prop_map(Op::Write),
        2 => (0..=max_len, any::<usize>()).prop_map(|(l, k)| Op::WritePrefix(l, k)),
        1 => (0..=max_len).prop_map(Op::AbandonWrite),
        4 => (0..=max_len).prop_map(Op::Read),
        2 => (0..=max_len, any::<usize>()).prop_map(|(l, k)| Op::ReadPrefix(l, k)),
        1 => (0..=max_len).prop_map(Op::AbandonRead),
    ]
}

fn check_quiescent(c: &Cursors, prev: &Cursors, capacity: usize, model_len: usize) {
    // Tanpa grant aktif head == tail
    assert_eq!(c.write_head, c.write_tail);
    assert_eq!(c.read_head, c.read_tail);
    assert!(c.in_use() <= capacity, "capacity bound violated: {:?}", c);
    assert_eq!(c.readable(), model_len);

    for (now, before) in [
        (c.write_head, prev.write_head),
        (c.write_tail, prev.write_tail),
        (c.read_head, prev.read_head),
        (c.read_tail, prev.read_tail),
    ] {
        assert!(now >= before, "cursor went backwards: {:?} -> {:?}", prev, c);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_ring_matches_fifo_model(
        requested in 1usize..=64,
        ops in prop::collection::vec(op_strategy(80), 1..200),
    ) {
        let (mut producer, mut consumer) = RingBuffer::create(requested).unwrap();
        let capacity = producer.capacity();
        prop_assert_eq!(Some(capacity), round_capacity(requested));

        let mut model: VecDeque<u8> = VecDeque::new();
        let mut next_byte: u8 = 0;
        let mut prev = producer.cursors();

        for op in ops {
            match op {
                Op::Write(len) | Op::WritePrefix(len, _) | Op::AbandonWrite(len) => {
                    let free = capacity - model.len();
                    let to_end = capacity - (prev.write_head & (capacity - 1));
                    let mut grant = producer.reserve(len);
                    prop_assert_eq!(grant.len(), len.min(free).min(to_end));
                    prop_assert_eq!(grant.remaining(), free - grant.len());

                    for byte in grant.iter_mut() {
                        *byte = next_byte;
                        next_byte = next_byte.wrapping_add(1);
                    }
                    let granted = grant.len();
                    let keep = match op {
                        Op::Write(_) => granted,
                        Op::WritePrefix(_, k) => k % (granted + 1),
                        _ => 0,
                    };
                    match op {
                        Op::AbandonWrite(_) => drop(grant),
                        _ => grant.commit_prefix(keep),
                    }

                    // Bytes yang tidak di-commit ditimpa ulang oleh reserve berikutnya
                    let start = next_byte.wrapping_sub(granted as u8);
                    for i in 0..keep {
                        model.push_back(start.wrapping_add(i as u8));
                    }
                    next_byte = start.wrapping_add(keep as u8);
                }
                Op::Read(len) | Op::ReadPrefix(len, _) | Op::AbandonRead(len) => {
                    let to_end = capacity - (prev.read_head & (capacity - 1));
                    let grant = consumer.reserve(len);
                    prop_assert_eq!(grant.len(), len.min(model.len()).min(to_end));
                    prop_assert_eq!(grant.remaining(), model.len() - grant.len());

                    for (i, &byte) in grant.iter().enumerate() {
                        prop_assert_eq!(byte, model[i]);
                    }
                    let keep = match op {
                        Op::Read(_) => grant.len(),
                        Op::ReadPrefix(_, k) => k % (grant.len() + 1),
                        _ => 0,
                    };
                    match op {
                        Op::AbandonRead(_) => drop(grant),
                        _ => grant.release_prefix(keep),
                    }
                    model.drain(..keep);
                }
            }

            let now = producer.cursors();
            check_quiescent(&now, &prev, capacity, model.len());
            prop_assert_eq!(consumer.len(), model.len());
            prop_assert_eq!(producer.free_len(), capacity - model.len());
            prev = now;
        }

        // Sisa data keluar dalam urutan FIFO (paling banyak dua kali read karena wrap)
        let mut rest = vec![0u8; capacity];
        let mut n = 0;
        while !consumer.is_empty() {
            n += consumer.read(&mut rest[n..]);
        }
        prop_assert_eq!(&rest[..n], &model.iter().copied().collect::<Vec<_>>()[..]);
    }

    #[test]
    fn prop_zero_length_reserve_is_inert(
        requested in 1usize..=4096,
        fill in 0usize..=4096,
    ) {
        let (mut producer, mut consumer) = RingBuffer::create(requested).unwrap();
        let filled = producer.write(&vec![7u8; fill]);
        prop_assert_eq!(filled, fill.min(producer.capacity()));
        let before = producer.cursors();

        producer.reserve(0).commit();
        consumer.reserve(0).release();
        drop(producer.reserve(0));
        drop(consumer.reserve(0));

        prop_assert_eq!(producer.cursors(), before);
    }

    #[test]
    fn prop_round_capacity_is_smallest_power_of_two(requested in 1usize..=(1 << 40)) {
        let capacity = round_capacity(requested).unwrap();
        prop_assert!(capacity.is_power_of_two());
        prop_assert!(capacity >= requested);
        prop_assert!(capacity / 2 < requested);
    }
}
