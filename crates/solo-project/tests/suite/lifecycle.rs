use std::sync::Arc;

use solo_build::BuildError;
use solo_project::{PendingCleanup, SearchChain, SourceInput, SynthError};

use super::support::{project_dir_of, synthesizer, FakeJavac, DUMMY};

#[test]
fn build_failure_is_rendered_to_the_sink_and_cleaned_up() {
    let javac = Arc::new(FakeJavac::failing(
        "Dummy.java:1: error: cannot find symbol\n  symbol: class Nope",
    ));
    let synth = synthesizer(&javac, SearchChain::new());

    let mut sink = Vec::new();
    let outcome = synth
        .assemble_package(&SourceInput::text(DUMMY), false, None, Some(&mut sink))
        .unwrap();
    assert!(outcome.is_none());

    let rendered = String::from_utf8(sink).unwrap();
    assert!(
        rendered.contains("Dummy.java:1: error: cannot find symbol\n  symbol: class Nope"),
        "{rendered}"
    );

    let dirs = javac.output_dirs();
    assert_eq!(dirs.len(), 1);
    assert!(!project_dir_of(&dirs[0]).exists());
}

#[test]
fn build_failure_without_sink_is_returned() {
    let javac = Arc::new(FakeJavac::failing("boom"));
    let synth = synthesizer(&javac, SearchChain::new());

    let err = synth
        .synthesize(&SourceInput::text(DUMMY), None)
        .unwrap_err();
    match err {
        SynthError::Build(BuildError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
        other => panic!("unexpected error: {other:?}"),
    }

    let dirs = javac.output_dirs();
    assert!(!project_dir_of(&dirs[0]).exists());
}

#[test]
fn successful_requests_clean_up_too() {
    let javac = Arc::new(FakeJavac::default());
    let pending = Arc::new(PendingCleanup::new());
    let synth = synthesizer(&javac, SearchChain::new()).with_pending_cleanup(pending.clone());

    for _ in 0..3 {
        synth
            .synthesize(&SourceInput::text(DUMMY), None)
            .unwrap()
            .unwrap();
    }

    let dirs = javac.output_dirs();
    assert_eq!(dirs.len(), 3);
    for dir in &dirs {
        assert!(!project_dir_of(dir).exists(), "{} survived", dir.display());
    }
    assert!(pending.pending().is_empty());
    assert_eq!(pending.flush(), 0);
}

#[test]
fn repeated_requests_get_distinct_artifact_ids() {
    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());

    let ids: Vec<String> = (0..3)
        .map(|_| {
            synth
                .compile(&SourceInput::text(DUMMY), None)
                .unwrap()
                .unwrap()
                .artifact_id
        })
        .collect();
    assert_eq!(ids, ["Dummy", "Dummy-1", "Dummy-2"]);
}

#[test]
fn concurrent_sessions_do_not_interfere() {
    let javac = Arc::new(FakeJavac::default());
    let synth = Arc::new(synthesizer(&javac, SearchChain::new()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let synth = synth.clone();
            std::thread::spawn(move || {
                synth
                    .synthesize(&SourceInput::text(DUMMY), None)
                    .unwrap()
                    .unwrap()
                    .project
                    .coordinate()
                    .artifact_id
                    .clone()
            })
        })
        .collect();

    let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    for dir in javac.output_dirs() {
        assert!(!project_dir_of(&dir).exists());
    }
}
