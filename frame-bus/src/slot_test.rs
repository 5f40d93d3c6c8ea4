use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use super::frame_slot;
use crate::FrameError;

#[test]
fn test_send_then_take() {
    let (tx, rx) = frame_slot();
    let write = tx.send(b"abc").unwrap();
    assert_eq!(write.seq, 1);
    assert!(!write.replaced);

    let taken = rx.take_with(|seq, data| (seq, data.to_vec())).unwrap();
    assert_eq!(taken, (1, b"abc".to_vec()));
    assert!(rx.take_with(|_, _| ()).is_none());
}

#[test]
fn test_latest_frame_wins() {
    let (tx, rx) = frame_slot();
    tx.send(b"first").unwrap();
    let second = tx.send(b"second").unwrap();
    assert!(second.replaced);

    let taken = rx.take_with(|seq, data| (seq, data.to_vec())).unwrap();
    assert_eq!(taken, (2, b"second".to_vec()));
}

#[test]
fn test_empty_payload_is_rejected() {
    let (tx, rx) = frame_slot();
    assert!(matches!(tx.send(&[]), Err(FrameError::EmptyFrame)));
    assert!(rx.take_with(|_, _| ()).is_none());
}

#[test]
fn test_staging_grows_exact_and_never_shrinks() {
    let (tx, _rx) = frame_slot();
    tx.send(&[1u8; 300]).unwrap();
    assert_eq!(tx.staging_capacity(), 300);
    tx.send(&[1u8; 20]).unwrap();
    assert_eq!(tx.staging_capacity(), 300);
}

#[test]
fn test_send_after_receiver_dropped() {
    let (tx, rx) = frame_slot();
    drop(rx);
    assert!(tx.is_closed());
    assert!(matches!(tx.send(b"x"), Err(FrameError::Closed)));
}

#[tokio::test]
async fn test_changed_wakes_on_send() -> anyhow::Result<()> {
    let (tx, rx) = frame_slot();
    let sender = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(b"wake").unwrap();
        tx
    });

    tokio::time::timeout(Duration::from_secs(2), rx.changed()).await??;
    assert_eq!(rx.take_with(|_, d| d.to_vec()).unwrap(), b"wake");

    let tx = sender.await?;
    tx.close();
    let closed = tokio::time::timeout(Duration::from_secs(2), rx.changed()).await?;
    assert!(matches!(closed, Err(FrameError::Closed)));
    Ok(())
}

/// Writers fill each payload with one repeated byte whose value encodes the
/// length; a reader checks every snapshot is uniform and of that length.
#[test]
fn test_concurrent_writers_never_mix_payloads() {
    const WRITERS: usize = 8;
    const WRITES: usize = 500;

    let (tx, rx) = frame_slot();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut checked = 0usize;
            loop {
                let finished = done.load(Ordering::Acquire);
                let snapshot = rx.take_with(|_, data| data.to_vec());
                if let Some(data) = snapshot {
                    let value = data[0];
                    assert!(data.iter().all(|b| *b == value), "mixed payload");
                    assert_eq!(data.len(), value as usize * 16);
                    checked += 1;
                } else if finished {
                    break;
                }
            }
            checked
        })
    };

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let tx = tx.clone();
            std::thread::spawn(move || {
                for i in 0..WRITES {
                    let value = ((w * 31 + i) % 200 + 1) as u8;
                    tx.send(&vec![value; value as usize * 16]).unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    let checked = reader.join().unwrap();
    assert!(checked >= 1);
}
