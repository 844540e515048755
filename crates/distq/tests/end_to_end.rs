use std::time::Duration;

use distq::{Config, EntryError, System};
use distq_core::MessageKind;

fn system() -> System {
    System::new(Config { quota_per_peer: 1024, max_payload_len: 256, table_capacity: 8 })
}

#[tokio::test]
async fn payload_send_is_delivered_and_quota_is_credited_back() {
    let sys = system();
    let sender = sys.create_peer();
    let receiver = sys.create_peer();
    let object = sys.create_object(receiver.id()).unwrap();
    let handle = sys.grant_handle(object.id(), sender.id()).unwrap();

    sys.send_payload(sender.id(), handle.id(), b"hello".to_vec()).unwrap();
    assert_eq!(sender.quota().used(), 5);

    let delivery = sys.recv_blocking(receiver.id(), Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(delivery.kind, MessageKind::Payload);
    assert_eq!(delivery.payload.as_deref(), Some(b"hello".as_slice()));

    assert_eq!(sender.quota().used(), 0);
}

#[tokio::test]
async fn payload_over_quota_is_rejected_before_anything_is_staged() {
    let sys = system();
    let sender = sys.create_peer();
    let receiver = sys.create_peer();
    let object = sys.create_object(receiver.id()).unwrap();
    let handle = sys.grant_handle(object.id(), sender.id()).unwrap();

    let err = sys.send_payload(sender.id(), handle.id(), vec![0u8; 2000]).unwrap_err();
    assert!(matches!(err, EntryError::PayloadTooLarge { .. }));

    assert_eq!(sender.quota().used(), 0);
    assert!(sys.try_recv(receiver.id()).unwrap().is_none());
}

#[test]
fn destroying_an_object_flushes_every_outstanding_handle() {
    let sys = system();
    let owner = sys.create_peer();
    let holder_a = sys.create_peer();
    let holder_b = sys.create_peer();

    let object = sys.create_object(owner.id()).unwrap();
    let handle_a = sys.grant_handle(object.id(), holder_a.id()).unwrap();
    let handle_b = sys.grant_handle(object.id(), holder_b.id()).unwrap();

    sys.destroy_object(object.id()).unwrap();

    let owner_delivery = sys.try_recv(owner.id()).unwrap().expect("owner sees the release");
    assert_eq!(owner_delivery.kind, MessageKind::ObjectRelease);
    assert_eq!(owner_delivery.subject_id, object.id().0);

    let a_delivery = sys.try_recv(holder_a.id()).unwrap().expect("holder a sees destruction");
    assert_eq!(a_delivery.kind, MessageKind::HandleDestruction);
    assert_eq!(a_delivery.subject_id, handle_a.id().0);

    let b_delivery = sys.try_recv(holder_b.id()).unwrap().expect("holder b sees destruction");
    assert_eq!(b_delivery.kind, MessageKind::HandleDestruction);
    assert_eq!(b_delivery.subject_id, handle_b.id().0);

    assert!(!handle_a.is_linked());
    assert!(!handle_b.is_linked());

    let err = sys.destroy_object(object.id()).unwrap_err();
    assert!(matches!(err, EntryError::AlreadyDestroyed(_)));
}

#[test]
fn releasing_a_handle_concurrently_with_its_objects_destruction_is_a_no_op() {
    let sys = system();
    let owner = sys.create_peer();
    let holder = sys.create_peer();

    let object = sys.create_object(owner.id()).unwrap();
    let handle = sys.grant_handle(object.id(), holder.id()).unwrap();

    sys.destroy_object(object.id()).unwrap();
    // The destruction already unlinked `handle`; releasing it afterward
    // must not double-flush a second handle-release message.
    sys.release_handle(handle.id()).unwrap();

    let first = sys.try_recv(holder.id()).unwrap().expect("destruction delivered");
    assert_eq!(first.kind, MessageKind::HandleDestruction);
    assert!(sys.try_recv(holder.id()).unwrap().is_none());
}

#[test]
fn overlapping_destroy_calls_on_the_same_object_yield_exactly_one_success() {
    let sys = std::sync::Arc::new(system());
    let owner = sys.create_peer();
    let object = sys.create_object(owner.id()).unwrap();
    let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));

    let results = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let sys = std::sync::Arc::clone(&sys);
                let barrier = std::sync::Arc::clone(&barrier);
                let object_id = object.id();
                scope.spawn(move || {
                    barrier.wait();
                    sys.destroy_object(object_id)
                })
            })
            .collect();
        workers.into_iter().map(|w: std::thread::ScopedJoinHandle<_>| w.join().unwrap()).collect::<Vec<_>>()
    });

    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    let already_destroyed_count = results
        .iter()
        .filter(|r| matches!(r, Err(EntryError::AlreadyDestroyed(_))))
        .count();
    assert_eq!(ok_count, 1, "exactly one of two racing destructions must win");
    assert_eq!(already_destroyed_count, 1);
}

#[test]
fn transfer_handle_moves_holdership_with_deterministic_lock_ordering() {
    let sys = system();
    let owner = sys.create_peer();
    let a = sys.create_peer();
    let b = sys.create_peer();

    let object = sys.create_object(owner.id()).unwrap();
    let handle = sys.grant_handle(object.id(), a.id()).unwrap();

    sys.transfer_handle(a.id(), handle.id(), b.id()).unwrap();
    assert_eq!(handle.holder(), b.id());

    let err = sys.transfer_handle(a.id(), handle.id(), b.id()).unwrap_err();
    assert!(matches!(err, EntryError::NotOwner(_, _)));
}

#[test]
fn transfer_handle_to_its_current_holder_is_a_cheap_no_op() {
    let sys = system();
    let owner = sys.create_peer();
    let holder = sys.create_peer();

    let object = sys.create_object(owner.id()).unwrap();
    let handle = sys.grant_handle(object.id(), holder.id()).unwrap();

    // Must return promptly rather than deadlock on `lock_pair` locking the
    // same peer's mutex twice.
    sys.transfer_handle(holder.id(), handle.id(), holder.id()).unwrap();
    assert_eq!(handle.holder(), holder.id());
}

#[test]
fn removing_a_peer_finalizes_its_queue() {
    let sys = system();
    let owner = sys.create_peer();
    let holder = sys.create_peer();
    let object = sys.create_object(owner.id()).unwrap();
    let _handle = sys.grant_handle(object.id(), holder.id()).unwrap();

    sys.remove_peer(holder.id()).unwrap();
    assert!(sys.peer(holder.id()).is_err());

    // The object's destruction still succeeds even though one holder's
    // queue is already gone from the registry: that holder simply never
    // gets notified, everyone else still does.
    sys.destroy_object(object.id()).unwrap();
    let owner_delivery = sys.try_recv(owner.id()).unwrap().expect("owner sees the release");
    assert_eq!(owner_delivery.kind, MessageKind::ObjectRelease);
}
