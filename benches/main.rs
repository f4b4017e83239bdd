use atomic::Atomic;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;

use gcstate::util::object_forwarding::{abandon_forwarding, attempt_to_forward, ForwardingAttempt};
use gcstate::util::options::Options;
use gcstate::util::state_word::StateWord;
use gcstate::util::Address;
use gcstate::vm::{GCRoot, NoStaticRoots, SimpleSlot};
use gcstate::RootManager;

fn bench_state_word(c: &mut Criterion) {
    let word = StateWord::with_type_info(unsafe { Address::from_usize(0x7f00_0000_1000) });

    c.bench_function("atomic_get_object_state", |b| {
        b.iter(|| black_box(&word).atomic_get_object_state())
    });

    c.bench_function("lock and unlock", |b| {
        b.iter(|| {
            let current = word.atomic_get_object_state();
            assert!(word.try_lock_state_word(current));
            word.unlock_state_word(current);
        })
    });

    c.bench_function("attempt_to_forward and abandon", |b| {
        b.iter(|| match attempt_to_forward(&word) {
            ForwardingAttempt::Claimed(previous) => abandon_forwarding(&word, previous),
            other => panic!("Unexpected {:?}", other),
        })
    });
}

fn bench_visit_roots(c: &mut Criterion) {
    let manager = RootManager::new(Options::without_env(), Box::new(NoStaticRoots));
    let cells: Vec<Atomic<Address>> = (1..=1024usize)
        .map(|i| Atomic::new(unsafe { Address::from_usize(i << 4) }))
        .collect();
    for cell in cells.iter() {
        manager
            .dynamic_roots()
            .global_roots
            .add(SimpleSlot::from_cell(cell));
    }

    c.bench_function("visit 1024 global roots", |b| {
        b.iter(|| {
            let mut count = 0usize;
            manager.visit_stw_roots(&mut |root: GCRoot| {
                count += 1;
                black_box(root);
            });
            count
        })
    });
}

criterion_group!(benches, bench_state_word, bench_visit_roots);
criterion_main!(benches);
