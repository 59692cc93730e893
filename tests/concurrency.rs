use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, OnceLock};
use std::thread;

use typebus::{Bus, MailboxRef, Message, MessageType, UndeliveredMessage};

#[derive(Debug)]
struct Tick(usize);
impl Message for Tick {}

#[derive(Debug)]
struct Tock;
impl Message for Tock {}

fn count_undelivered(bus: &Bus) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    bus.subscribe(
        MessageType::of::<UndeliveredMessage>(),
        MailboxRef::from_fn("undelivered", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );
    count
}

#[test]
fn concurrent_subscribe_unsubscribe_leaves_no_residue() {
    let bus = Bus::new();
    let undelivered = count_undelivered(&bus);
    let threads = 8;
    let rounds = 200;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let bus = bus.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    let mailbox = MailboxRef::discard("transient");
                    bus.subscribe(MessageType::of::<Tick>(), mailbox.clone());
                    bus.unsubscribe(&MessageType::of::<Tick>(), &mailbox).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(bus.subscribers_to(&MessageType::of::<Tick>()).is_empty());
    bus.post(Tick(0)).unwrap();
    assert_eq!(undelivered.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_subscribes_are_not_lost() {
    let bus = Bus::new();
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let bus = bus.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    bus.subscribe(MessageType::of::<Tick>(), MailboxRef::discard("keep"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let subs: Vec<_> = bus
        .subscriptions()
        .into_iter()
        .filter(|s| s.message_type == MessageType::of::<Tick>())
        .collect();
    assert_eq!(subs.len(), threads * per_thread);
    // Order indexes are unique and increasing.
    assert!(subs.windows(2).all(|w| w[0].order < w[1].order));
}

#[test]
fn posts_from_many_threads_reach_every_mailbox() {
    let bus = Bus::new();
    let received = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let counter = Arc::clone(&received);
        bus.subscribe(
            MessageType::of::<Tick>(),
            MailboxRef::typed("count", move |tick: &Tick| {
                assert!(tick.0 < 400);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
    }

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let bus = bus.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    bus.post(Tick(t * 100 + i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(received.load(Ordering::SeqCst), 4 * 100 * 3);
}

#[test]
fn mailbox_can_unsubscribe_itself_during_delivery() {
    let bus = Bus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let this: Arc<OnceLock<MailboxRef>> = Arc::new(OnceLock::new());

    let counter = Arc::clone(&calls);
    let handle = Arc::clone(&this);
    let inner_bus = bus.clone();
    let once = MailboxRef::from_fn("once", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(me) = handle.get() {
            inner_bus.unsubscribe(&MessageType::of::<Tick>(), me)?;
        }
        Ok(())
    });
    this.set(once.clone()).unwrap();
    bus.subscribe(MessageType::of::<Tick>(), once);

    bus.post(Tick(1)).unwrap();
    bus.post(Tick(2)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(bus.subscribers_to(&MessageType::of::<Tick>()).is_empty());
}

#[test]
fn mailbox_can_subscribe_and_post_during_delivery() {
    let bus = Bus::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner_bus = bus.clone();
    let sink = Arc::clone(&log);
    bus.subscribe(
        MessageType::of::<Tick>(),
        MailboxRef::from_fn("wire", move |_| {
            let late = Arc::clone(&sink);
            inner_bus.subscribe(
                MessageType::of::<Tock>(),
                MailboxRef::from_fn("tock", move |_| {
                    late.lock().unwrap().push("tock");
                    Ok(())
                }),
            );
            inner_bus.post(Tock)?;
            Ok(())
        }),
    );

    bus.post(Tick(0)).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["tock"]);
}

#[test]
fn snapshot_is_taken_before_delivery() {
    // A mailbox added mid-delivery does not join the in-flight post.
    let bus = Bus::new();
    let late_calls = Arc::new(AtomicUsize::new(0));

    let inner_bus = bus.clone();
    let counter = Arc::clone(&late_calls);
    bus.subscribe(
        MessageType::of::<Tick>(),
        MailboxRef::from_fn("adder", move |_| {
            let counter = Arc::clone(&counter);
            inner_bus.subscribe(
                MessageType::of::<Tick>(),
                MailboxRef::from_fn("late", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
            Ok(())
        }),
    );

    bus.post(Tick(0)).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    bus.post(Tick(1)).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}
