//! Folding response streams into run results, over both bridge shapes.

#![allow(clippy::unwrap_used)] // unwrap is acceptable in tests

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use enclave::stream::{self, LineResult};
use enclave::{
    ClientError, Instruction, InstructionPosition, ResponseLine, ResponseStream, RunFinished,
    StarlarkError, reduce,
};
use tokio::time::timeout;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("enclave=debug")
            .with_test_writer()
            .init();
    });
}

fn instruction(name: &str, line: i32) -> ResponseLine {
    ResponseLine::Instruction(Instruction {
        position: InstructionPosition {
            filename: "main.star".to_string(),
            line,
            column: 1,
        },
        name: name.to_string(),
        executable_text: format!("{name}()"),
        ..Default::default()
    })
}

fn result(serialized: &str) -> ResponseLine {
    ResponseLine::InstructionResult(serialized.to_string())
}

fn finished(is_successful: bool, output: &str) -> ResponseLine {
    ResponseLine::RunFinished(RunFinished {
        is_successful,
        serialized_output: output.to_string(),
    })
}

/// A pull-based transport that yields `lines` and then ends.
fn pull(lines: Vec<ResponseLine>) -> ResponseStream {
    ResponseStream::from_stream(tokio_stream::iter(lines.into_iter().map(Ok)))
}

/// A push-based transport that emits `lines`, then the given terminal.
fn push(lines: Vec<ResponseLine>, terminal: Option<ClientError>) -> ResponseStream {
    let (sink, stream) = stream::channel();
    tokio::spawn(async move {
        for line in lines {
            if !sink.data(line).await {
                return;
            }
        }
        match terminal {
            Some(err) => sink.error(err).await,
            None => sink.end().await,
        }
    });
    stream
}

#[tokio::test]
async fn test_instructions_keep_arrival_order() {
    init_tracing();
    let lines = vec![
        instruction("add_service", 1),
        ResponseLine::Info("starting".into()),
        instruction("exec", 2),
        result("ok"),
        instruction("add_service", 1),
        ResponseLine::Progress(Default::default()),
        instruction("print", 3),
    ];
    let expected: Vec<Instruction> = lines
        .iter()
        .filter_map(|l| match l {
            ResponseLine::Instruction(i) => Some(i.clone()),
            _ => None,
        })
        .collect();

    let from_pull = reduce(pull(lines.clone())).await.unwrap();
    let from_push = reduce(push(lines, None)).await.unwrap();

    assert_eq!(from_pull.instructions, expected);
    assert_eq!(from_push.instructions, expected);
    // duplicates are kept
    assert_eq!(from_pull.instructions.len(), 4);
}

#[tokio::test]
async fn test_empty_stream_gives_empty_result() {
    let run = reduce(pull(Vec::new())).await.unwrap();
    assert!(run.instructions.is_empty());
    assert_eq!(run.run_output, "");
    assert!(!run.has_errors());
}

#[tokio::test]
async fn test_instruction_results_accumulate_with_newlines() {
    let run = reduce(push(vec![result("a"), result("b")], None))
        .await
        .unwrap();
    assert_eq!(run.run_output, "a\nb\n");
}

#[tokio::test]
async fn test_successful_run_finished_supplies_output() {
    let run = reduce(pull(vec![finished(true, "done")])).await.unwrap();
    assert_eq!(run.run_output, "done\n");

    let run = reduce(pull(vec![finished(false, "done")])).await.unwrap();
    assert_eq!(run.run_output, "");
}

#[tokio::test]
async fn test_validation_errors_accumulate_and_interpretation_error_is_first_wins() {
    let run = reduce(pull(vec![
        ResponseLine::Error(StarlarkError::Validation("v1".into())),
        ResponseLine::Error(StarlarkError::Validation("v2".into())),
        ResponseLine::Error(StarlarkError::Validation("v3".into())),
    ]))
    .await
    .unwrap();
    assert_eq!(run.validation_errors, vec!["v1", "v2", "v3"]);

    let run = reduce(pull(vec![
        ResponseLine::Error(StarlarkError::Interpretation("first".into())),
        ResponseLine::Error(StarlarkError::Interpretation("second".into())),
    ]))
    .await
    .unwrap();
    assert_eq!(run.interpretation_error.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_logical_errors_do_not_fail_the_stream() {
    let run = reduce(push(
        vec![
            instruction("exec", 1),
            ResponseLine::Error(StarlarkError::Execution("exit code 1".into())),
            finished(false, ""),
        ],
        None,
    ))
    .await
    .unwrap();
    assert_eq!(run.execution_error.as_deref(), Some("exit code 1"));
    assert!(run.has_errors());
}

#[tokio::test]
async fn test_transport_error_discards_partial_result() {
    init_tracing();
    let prefix = vec![instruction("add_service", 1), result("a"), result("b")];

    let err = reduce(push(
        prefix.clone(),
        Some(ClientError::transport(
            "An error has been returned from the execution response lines stream",
            "upstream connect error",
        )),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert!(err.to_string().contains("upstream connect error"));

    let items: Vec<LineResult> = prefix
        .into_iter()
        .map(Ok)
        .chain(std::iter::once(Err(ClientError::transport(
            "streaming",
            "reset",
        ))))
        .collect();
    let err = reduce(ResponseStream::from_stream(tokio_stream::iter(items)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[tokio::test]
async fn test_cancelling_mid_fold_fails_the_reduce() {
    let (sink, lines) = stream::channel();
    let handle = lines.cancel_handle();
    let cancels = Arc::new(AtomicUsize::new(0));
    let lines = {
        let cancels = Arc::clone(&cancels);
        lines.on_cancel(move || {
            cancels.fetch_add(1, Ordering::SeqCst);
        })
    };

    let reducer = tokio::spawn(reduce(lines));
    assert!(sink.data(result("a")).await);

    handle.close();
    handle.close();

    let outcome = timeout(Duration::from_secs(5), reducer)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, Err(ClientError::Cancelled)));
    assert_eq!(cancels.load(Ordering::SeqCst), 1);

    // the producer is told, and its remaining sends are refused
    timeout(Duration::from_secs(5), sink.cancelled())
        .await
        .unwrap();
    assert!(!sink.data(result("b")).await);
}

#[tokio::test]
async fn test_dropping_the_reduce_future_cancels_the_call() {
    let cancels = Arc::new(AtomicUsize::new(0));
    let lines = {
        let cancels = Arc::clone(&cancels);
        ResponseStream::from_stream(futures::stream::pending::<LineResult>()).on_cancel(
            move || {
                cancels.fetch_add(1, Ordering::SeqCst);
            },
        )
    };
    let outcome = timeout(Duration::from_millis(20), reduce(lines)).await;
    assert!(outcome.is_err());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_closing_twice_forwards_one_cancellation() {
    let cancels = Arc::new(AtomicUsize::new(0));
    let mut lines = {
        let cancels = Arc::clone(&cancels);
        push(vec![result("a")], None).on_cancel(move || {
            cancels.fetch_add(1, Ordering::SeqCst);
        })
    };
    lines.close();
    lines.close();
    assert!(lines.is_closed());
    drop(lines);
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}
