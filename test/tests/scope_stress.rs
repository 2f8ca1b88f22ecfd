/// Stress tests of concurrent scope registry updates

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};

use weft_shared::{CellAddress, Link, LinkKey, Scope, ScopeError, Uri};

const THREADS: usize = 16;
const OPS: usize = 1000;
const KEYS: usize = 64;

struct CountedLink {
    key: LinkKey,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl CountedLink {
    fn new(key: u64) -> Arc<Self> {
        Arc::new(Self {
            key: LinkKey::from_u64(key),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        })
    }
}

impl Link for CountedLink {
    fn key(&self) -> LinkKey {
        self.key
    }

    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn force_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn scope() -> Arc<Scope<CountedLink>> {
    Arc::new(Scope::new(
        CellAddress::Lane {
            node_uri: Uri::from("/unit/1"),
            lane_uri: Uri::from("count"),
        },
        None,
    ))
}

#[test]
fn concurrent_updates_lose_nothing() {
    let scope = scope();
    let threads: Vec<_> = (0..THREADS)
        .map(|thread| {
            let scope = Arc::clone(&scope);
            thread::spawn(move || {
                let mut rng = fastrand::Rng::with_seed(thread as u64);
                let mut model = HashSet::new();
                for _ in 0..OPS {
                    let key = (thread * KEYS + rng.usize(..KEYS)) as u64;
                    if rng.bool() {
                        let opened = scope.open_downlink(CountedLink::new(key)).is_ok();
                        assert_eq!(opened, model.insert(LinkKey::from_u64(key)));
                    } else {
                        let closed = scope.close_downlink(&LinkKey::from_u64(key)).is_some();
                        assert_eq!(closed, model.remove(&LinkKey::from_u64(key)));
                    }
                }
                model
            })
        })
        .collect();

    let expected: HashSet<LinkKey> = threads
        .into_iter()
        .flat_map(|thread| thread.join().unwrap())
        .collect();
    let actual: HashSet<LinkKey> = scope.snapshot().keys().copied().collect();
    assert_eq!(actual, expected);
    assert_eq!(scope.len(), expected.len());
}

#[test]
fn concurrent_inserts_of_one_key_admit_one() {
    let scope = scope();
    let barrier = Arc::new(Barrier::new(THREADS));
    let threads: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = Arc::clone(&scope);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scope.open_downlink(CountedLink::new(7))
            })
        })
        .collect();

    let results: Vec<_> = threads.into_iter().map(|thread| thread.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, ScopeError::Duplicate { .. })));
    assert_eq!(scope.len(), 1);
}

#[test]
fn close_racing_inserts_closes_every_link_once() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 500;

    let scope = scope();
    let barrier = Arc::new(Barrier::new(WRITERS + 1));
    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let scope = Arc::clone(&scope);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_WRITER)
                    .map(|n| {
                        let link = CountedLink::new((writer * PER_WRITER + n) as u64);
                        let result = scope.open_downlink(Arc::clone(&link));
                        (link, result)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    barrier.wait();
    thread::yield_now();
    let closed_by_scope = scope.close();

    let links: Vec<_> = writers
        .into_iter()
        .flat_map(|writer| writer.join().unwrap())
        .collect();
    let mut rejected = 0;
    for (link, result) in &links {
        assert_eq!(link.closed.load(Ordering::SeqCst), 1);
        match result {
            Ok(()) => assert_eq!(link.opened.load(Ordering::SeqCst), 1),
            Err(ScopeError::Closed { .. }) => {
                rejected += 1;
                assert_eq!(link.opened.load(Ordering::SeqCst), 0);
            }
            Err(err) => panic!("unexpected {}", err),
        }
    }
    assert_eq!(closed_by_scope + rejected, WRITERS * PER_WRITER);
    assert!(scope.is_empty());
    assert!(scope.is_closed());
}
