//! Process isolation across a real worker boundary
//!
//! This binary is its own worker: the supervisor re-executes it with the
//! worker flag, and it answers from the same registration code.

use faceoff::{
    is_worker_process, ConfigError, Faceoff, FaceoffError, Options, ProcessIsolation, Runner,
    TuningOptions, VersionSource,
};
use std::hint::black_box;
use std::time::Duration;

fn register() -> Result<Faceoff<u64>, ConfigError> {
    let mut faceoff = Faceoff::new([
        ("small", VersionSource::module(1_000u64, ".")),
        ("large", VersionSource::module(10_000u64, ".")),
    ])?;

    faceoff.suite("sum", Options::new(), |s| {
        s.add(
            "range",
            |n, _| {
                black_box((0..*n).sum::<u64>());
                Ok(())
            },
            Options::new(),
        )
    })?;

    faceoff.add(
        "broken",
        |n, _| {
            if *n > 1_000 {
                Err("large input rejected".into())
            } else {
                Ok(())
            }
        },
        Options::new(),
    )?;

    Ok(faceoff)
}

fn isolated_runner(filter: &'static str, samples: u64) -> Runner {
    let binary = std::env::current_exe().unwrap();
    let mut tuning = TuningOptions::default();
    tuning.samples = Some(samples);

    Runner::new()
        .base_tuning(tuning)
        .filter(move |heading| heading.starts_with(filter))
        .isolation(ProcessIsolation::new(Some(Duration::from_secs(60))).with_binary(binary))
        .force_isolation(true)
}

/// Close everything above stderr so the pipes land on the lowest fds, as in a shell
fn close_inherited_fds() {
    for fd in 3..64 {
        unsafe {
            libc::close(fd);
        }
    }
    assert_eq!(unsafe { libc::fcntl(3, libc::F_GETFD) }, -1);
    assert_eq!(unsafe { libc::fcntl(4, libc::F_GETFD) }, -1);
}

fn test_worker_returns_requested_samples() {
    let faceoff = register().unwrap();
    let results = isolated_runner("sum", 25).run(&faceoff).unwrap();

    let group = results.get("sum ⇒ range").unwrap();
    assert_eq!(group.results.len(), 2);
    for result in &group.results {
        assert_eq!(result.runs_sampled, 25);
        assert!(result.ops_sec > 0.0);
    }
    assert!(group.results[0].baseline);
    assert_eq!(group.results[1].version, "large");
}

fn test_worker_body_failure_is_benchmark_error() {
    let faceoff = register().unwrap();
    let err = isolated_runner("broken", 5).run(&faceoff).unwrap_err();

    assert!(matches!(err, FaceoffError::Benchmark { .. }), "got {err}");
    assert_eq!(err.benchmark(), Some("broken ⇒ large"));
    assert!(err.to_string().contains("large input rejected"));
}

fn main() -> anyhow::Result<()> {
    if is_worker_process() {
        return faceoff::run(&register()?);
    }

    close_inherited_fds();

    let tests: [(&str, fn()); 2] = [
        ("worker_returns_requested_samples", test_worker_returns_requested_samples),
        ("worker_body_failure_is_benchmark_error", test_worker_body_failure_is_benchmark_error),
    ];
    for (name, test) in tests {
        test();
        println!("test {name} ... ok");
    }
    Ok(())
}
