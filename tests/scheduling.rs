/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Scheduling guarantees under real concurrency: single runner, FIFO,
//! no loss, terminal exit, idle-when-empty, and independence of actors.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use actor_lite::{
    Actor, ActorStatus, Context, Dispatcher, DispatcherConfig, Port, PostError, ThreadPool,
};

const TIMEOUT: Duration = Duration::from_secs(20);

fn setup(workers: usize) -> (Arc<ThreadPool>, Dispatcher) {
    let pool = Arc::new(ThreadPool::new(workers).unwrap());
    let dispatcher = Dispatcher::new(pool.clone());
    (pool, dispatcher)
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

/// Records how many workers are inside it at once.
struct OverlapTracker {
    inside: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    received: Arc<AtomicUsize>,
}

impl OverlapTracker {
    fn new() -> Self {
        OverlapTracker {
            inside: Arc::new(AtomicUsize::new(0)),
            overlaps: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn touch(&mut self, ctx: &Context<OverlapTracker>) {
        if self.inside.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if ctx.port().status() != ActorStatus::Running {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        // Widen the window a concurrent runner would have to hit.
        for _ in 0..50 {
            std::hint::spin_loop();
        }
        self.received.fetch_add(1, Ordering::SeqCst);
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Actor for OverlapTracker {}

#[test]
fn single_runner_under_concurrent_posts() {
    let (pool, dispatcher) = setup(8);
    let tracker = OverlapTracker::new();
    let overlaps = Arc::clone(&tracker.overlaps);
    let received = Arc::clone(&tracker.received);
    let port = dispatcher.spawn(tracker);

    let threads = 16;
    let per_thread = 500;
    let barrier = Arc::new(Barrier::new(threads));
    let producers: Vec<_> = (0..threads)
        .map(|_| {
            let port = port.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    port.post(|p, ctx| p.touch(ctx));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    wait_until("all messages", || received.load(Ordering::SeqCst) == threads * per_thread);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.stats().contended, 0);
    pool.shutdown();
}

#[derive(Default)]
struct Concat {
    text: String,
}
impl Actor for Concat {}

#[test]
fn fifo_for_single_producer() {
    let (pool, dispatcher) = setup(4);
    let port = dispatcher.spawn(Concat::default());
    let (tx, rx) = crossbeam_channel::bounded(1);

    for piece in ["1", "2", "3"] {
        port.post(move |c, _| c.text.push_str(piece));
    }
    port.post(move |c, _| {
        let _ = tx.send(c.text.clone());
    });

    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), "123");
    pool.shutdown();
}

#[test]
fn fifo_per_producer_with_interleaving() {
    #[derive(Default)]
    struct Seqs {
        last: Vec<Option<usize>>,
        out_of_order: usize,
        count: usize,
    }
    impl Actor for Seqs {}

    let (pool, dispatcher) = setup(4);
    let producers = 8;
    let per_producer = 1_000;
    let port = dispatcher.spawn(Seqs {
        last: vec![None; producers],
        ..Default::default()
    });

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let port = port.clone();
            thread::spawn(move || {
                for seq in 0..per_producer {
                    port.post(move |s: &mut Seqs, _| {
                        if let Some(prev) = s.last[p] {
                            if seq != prev + 1 {
                                s.out_of_order += 1;
                            }
                        }
                        s.last[p] = Some(seq);
                        s.count += 1;
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let (tx, rx) = crossbeam_channel::bounded(1);
    port.post(move |s, _| {
        let _ = tx.send((s.count, s.out_of_order));
    });
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), (producers * per_producer, 0));
    pool.shutdown();
}

#[derive(Default)]
struct Tally {
    count: usize,
}
impl Actor for Tally {}

#[test]
fn no_message_loss_under_burst() {
    let (pool, dispatcher) = setup(8);
    let port = dispatcher.spawn(Tally::default());
    let drained = Arc::new(AtomicUsize::new(0));

    let threads = 50;
    let per_thread = 200;
    let barrier = Arc::new(Barrier::new(threads));
    let producers: Vec<_> = (0..threads)
        .map(|_| {
            let port = port.clone();
            let barrier = Arc::clone(&barrier);
            let drained = Arc::clone(&drained);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    let drained = Arc::clone(&drained);
                    port.post(move |t, _| {
                        t.count += 1;
                        drained.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    wait_until("10_000 drains", || drained.load(Ordering::SeqCst) == 10_000);
    wait_until("idle", || port.status() == ActorStatus::Idle);

    let (tx, rx) = crossbeam_channel::bounded(1);
    port.post(move |t, _| {
        let _ = tx.send(t.count);
    });
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 10_000);
    wait_until("final message counted", || dispatcher.stats().processed == 10_001);
    assert_eq!(dispatcher.stats().dead_letters, 0);
    pool.shutdown();
}

#[test]
fn exit_is_terminal() {
    struct Stoppable {
        after_stop: Arc<AtomicUsize>,
        stopped: bool,
    }
    impl Actor for Stoppable {}

    let (pool, dispatcher) = setup(4);
    let after_stop = Arc::new(AtomicUsize::new(0));
    let port: Port<Stoppable> = dispatcher.spawn(Stoppable {
        after_stop: Arc::clone(&after_stop),
        stopped: false,
    });

    // Watch the status the whole time; Running must never follow Terminated.
    let done = Arc::new(AtomicBool::new(false));
    let watcher = {
        let port = port.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut seen_terminated = false;
            let mut violations = 0;
            while !done.load(Ordering::SeqCst) {
                match port.status() {
                    ActorStatus::Terminated => seen_terminated = true,
                    ActorStatus::Running if seen_terminated => violations += 1,
                    ActorStatus::Idle if seen_terminated => violations += 1,
                    _ => {}
                }
            }
            violations
        })
    };

    let barrier = Arc::new(Barrier::new(5));
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let port = port.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    port.post(|s: &mut Stoppable, _| {
                        if s.stopped {
                            s.after_stop.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            })
        })
        .collect();

    barrier.wait();
    port.post(|s, ctx| {
        s.stopped = true;
        ctx.exit();
    });
    for producer in producers {
        producer.join().unwrap();
    }

    wait_until("terminated", || port.is_terminated());
    assert_eq!(port.try_post(|_, _| {}), Err(PostError::Terminated));
    thread::sleep(Duration::from_millis(20));

    done.store(true, Ordering::SeqCst);
    assert_eq!(watcher.join().unwrap(), 0);
    assert_eq!(after_stop.load(Ordering::SeqCst), 0);
    assert_eq!(port.status(), ActorStatus::Terminated);
    assert_eq!(port.pending(), 0);

    let stats = dispatcher.stats();
    assert_eq!(stats.terminated, 1);
    // Every message was either processed or counted as a dead letter.
    assert_eq!(stats.processed + stats.dead_letters, 2_000 + 1 + 1);
    pool.shutdown();
}

#[test]
fn idle_when_empty() {
    let (pool, dispatcher) = setup(2);
    let port = dispatcher.spawn(Tally::default());
    assert_eq!(port.status(), ActorStatus::Idle);

    let (tx, rx) = crossbeam_channel::unbounded();
    let tx2 = tx.clone();
    port.post(move |t, _| {
        t.count += 1;
        let _ = tx.send(t.count);
    });
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 1);

    wait_until("idle", || port.status() == ActorStatus::Idle);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(port.status(), ActorStatus::Idle);
    assert_eq!(port.pending(), 0);

    port.post(move |t, _| {
        t.count += 1;
        let _ = tx2.send(t.count);
    });
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 2);
    wait_until("idle again", || port.status() == ActorStatus::Idle);
    pool.shutdown();
}

#[test]
fn actors_do_not_block_each_other() {
    // Fewer workers than actors.
    let (pool, dispatcher) = setup(2);

    let slow = dispatcher.spawn(Tally::default());
    for _ in 0..200 {
        slow.post(|t, _| {
            thread::sleep(Duration::from_millis(2));
            t.count += 1;
        });
    }

    let finished = Arc::new(AtomicUsize::new(0));
    let fast: Vec<Port<Tally>> = (0..6).map(|_| dispatcher.spawn(Tally::default())).collect();
    for port in &fast {
        for i in 0..1_000 {
            let finished = Arc::clone(&finished);
            port.post(move |t, _| {
                t.count += 1;
                if i == 999 {
                    finished.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    }

    wait_until("fast actors", || finished.load(Ordering::SeqCst) == fast.len());
    // The slow actor holds at most one worker, so the others got through
    // long before it finished.
    assert!(slow.pending() > 0);

    wait_until("slow actor", || slow.pending() == 0 && slow.status() == ActorStatus::Idle);
    assert_eq!(dispatcher.stats().processed, 200 + 6 * 1_000);
    pool.shutdown();
}

#[test]
fn bounded_mailbox_rejects_when_full() {
    let pool = Arc::new(ThreadPool::new(1).unwrap());
    let config = DispatcherConfig {
        mailbox_capacity: Some(2),
        ..DispatcherConfig::with_workers(1)
    };
    let dispatcher = Dispatcher::with_config(pool.clone(), &config);

    // Park the only worker so the mailbox cannot drain.
    let gate = Arc::new(Barrier::new(2));
    let blocker = dispatcher.spawn(Tally::default());
    {
        let gate = Arc::clone(&gate);
        blocker.post(move |_, _| {
            gate.wait();
        });
    }

    let port = dispatcher.spawn(Tally::default());
    assert!(port.try_post(|t, _| t.count += 1).is_ok());
    assert!(port.try_post(|t, _| t.count += 1).is_ok());
    assert_eq!(
        port.try_post(|t, _| t.count += 1),
        Err(PostError::MailboxFull { capacity: 2 })
    );
    assert_eq!(dispatcher.stats().dead_letters, 1);

    gate.wait();
    wait_until("drained", || port.pending() == 0 && port.status() == ActorStatus::Idle);
    assert_eq!(dispatcher.stats().processed, 3);
    pool.shutdown();
}
