use kanban_core::sync::{RemoteBackend, RemoteCall, RemoteError, SyncNotice, SyncQueue, SyncTicket};
use kanban_core::{EntityKind, SyncConfig};
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

/// Records calls, replays scripted failures, and blocks calls for board
/// `gate` until released.
#[derive(Default)]
struct ScriptedBackend {
    sent: Mutex<Vec<RemoteCall>>,
    failures: Mutex<VecDeque<RemoteError>>,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
}

impl ScriptedBackend {
    fn failing(failures: Vec<RemoteError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..Self::default()
        }
    }

    fn gated() -> (Self, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let backend = Self {
            gate: Mutex::new(Some(gate)),
            ..Self::default()
        };
        (backend, release)
    }

    fn sent_ops(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(RemoteCall::op).collect()
    }
}

impl RemoteBackend for ScriptedBackend {
    fn send(&self, call: &RemoteCall) -> Result<(), RemoteError> {
        if call.board_id() == "gate" {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
        }
        self.sent.lock().unwrap().push(call.clone());
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn config(max_attempts: u32) -> SyncConfig {
    SyncConfig {
        enabled: true,
        max_attempts,
        retry_backoff_ms: 1,
    }
}

fn delete_task(board: &str, task: &str) -> RemoteCall {
    RemoteCall::DeleteTask {
        board_id: board.to_string(),
        task_id: task.to_string(),
    }
}

async fn next(notices: &mut UnboundedReceiver<SyncNotice>) -> SyncNotice {
    tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn delivers_in_fifo_order() {
    let backend = Arc::new(ScriptedBackend::default());
    let (queue, mut notices) = SyncQueue::start(backend.clone(), &config(3), &Handle::current());

    let calls = [
        RemoteCall::CreateColumn {
            board_id: "b1".to_string(),
            column_id: "c1".to_string(),
            title: "Todo".to_string(),
        },
        delete_task("b1", "t1"),
        RemoteCall::DeleteBoard {
            board_id: "b1".to_string(),
        },
    ];
    for call in calls {
        queue.enqueue(call).unwrap();
    }

    for expected in 1..=3 {
        let notice = next(&mut notices).await;
        assert_eq!(
            notice,
            SyncNotice::Delivered {
                ticket: SyncTicket(expected),
                attempts: 1
            }
        );
    }
    assert_eq!(
        backend.sent_ops(),
        ["create_column", "delete_task", "delete_board"]
    );
    queue.shutdown().await;
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let backend = Arc::new(ScriptedBackend::failing(vec![
        RemoteError::transient("timeout"),
        RemoteError::transient("timeout"),
    ]));
    let (queue, mut notices) = SyncQueue::start(backend.clone(), &config(3), &Handle::current());

    queue.enqueue(delete_task("b1", "t1")).unwrap();

    assert_eq!(
        next(&mut notices).await,
        SyncNotice::Delivered {
            ticket: SyncTicket(1),
            attempts: 3
        }
    );
    assert_eq!(backend.sent_ops().len(), 3);
    queue.shutdown().await;
}

#[tokio::test]
async fn exhausted_call_is_reported_and_can_be_retried() {
    let backend = Arc::new(ScriptedBackend::failing(vec![
        RemoteError::transient("offline"),
        RemoteError::transient("offline"),
    ]));
    let (queue, mut notices) = SyncQueue::start(backend.clone(), &config(2), &Handle::current());

    let call = delete_task("b1", "t1");
    queue.enqueue(call.clone()).unwrap();

    let SyncNotice::Failed {
        ticket,
        call: failed,
        error,
        attempts,
    } = next(&mut notices).await
    else {
        panic!("expected a failure notice");
    };
    assert_eq!(ticket, SyncTicket(1));
    assert_eq!(failed, call);
    assert!(error.retryable);
    assert_eq!(attempts, 2);

    let retried = queue.retry(failed).unwrap();
    assert_eq!(retried, SyncTicket(2));
    assert_eq!(
        next(&mut notices).await,
        SyncNotice::Delivered {
            ticket: retried,
            attempts: 1
        }
    );
    queue.shutdown().await;
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let backend = Arc::new(ScriptedBackend::failing(vec![RemoteError::permanent(
        "rejected",
    )]));
    let (queue, mut notices) = SyncQueue::start(backend.clone(), &config(5), &Handle::current());

    queue.enqueue(delete_task("b1", "t1")).unwrap();

    let notice = next(&mut notices).await;
    assert!(matches!(notice, SyncNotice::Failed { attempts: 1, .. }));
    assert_eq!(backend.sent_ops().len(), 1);
    queue.shutdown().await;
}

#[tokio::test]
async fn cancel_skips_queued_calls_but_not_later_ones() {
    let (backend, release) = ScriptedBackend::gated();
    let backend = Arc::new(backend);
    let (queue, mut notices) = SyncQueue::start(backend.clone(), &config(3), &Handle::current());

    queue
        .enqueue(RemoteCall::DeleteBoard {
            board_id: "gate".to_string(),
        })
        .unwrap();
    queue.enqueue(delete_task("b1", "t2")).unwrap();
    queue.cancel_entity(EntityKind::Task, "t2");
    queue.enqueue(delete_task("b1", "t2")).unwrap();
    release.send(()).unwrap();

    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Delivered { ticket: SyncTicket(1), .. }
    ));
    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Cancelled { ticket: SyncTicket(2), .. }
    ));
    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Delivered { ticket: SyncTicket(3), .. }
    ));
    assert_eq!(backend.sent_ops(), ["delete_board", "delete_task"]);
    queue.shutdown().await;
}

#[tokio::test]
async fn in_flight_result_is_discarded_after_cancel() {
    let (backend, release) = ScriptedBackend::gated();
    let (queue, mut notices) =
        SyncQueue::start(Arc::new(backend), &config(3), &Handle::current());

    queue.enqueue(delete_task("gate", "t9")).unwrap();
    // Let the worker pick the call up before cancelling it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.cancel_entity(EntityKind::Board, "gate");
    release.send(()).unwrap();

    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Cancelled { ticket: SyncTicket(1), .. }
    ));
    queue.shutdown().await;
}

#[tokio::test]
async fn cancel_reports_whether_create_left_the_queue() {
    let (backend, release) = ScriptedBackend::gated();
    let (queue, mut notices) =
        SyncQueue::start(Arc::new(backend), &config(3), &Handle::current());

    queue
        .enqueue(RemoteCall::CreateColumn {
            board_id: "gate".to_string(),
            column_id: "c1".to_string(),
            title: "Todo".to_string(),
        })
        .unwrap();
    queue
        .enqueue(RemoteCall::CreateColumn {
            board_id: "b1".to_string(),
            column_id: "c2".to_string(),
            title: "Done".to_string(),
        })
        .unwrap();
    // Let the worker start sending the first create.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!queue.cancel_entity(EntityKind::Column, "c1"));
    assert!(queue.cancel_entity(EntityKind::Column, "c2"));
    assert!(!queue.cancel_entity(EntityKind::Column, "c2"));
    release.send(()).unwrap();

    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Cancelled { ticket: SyncTicket(1), .. }
    ));
    assert!(matches!(
        next(&mut notices).await,
        SyncNotice::Cancelled { ticket: SyncTicket(2), .. }
    ));
    queue.shutdown().await;
}
