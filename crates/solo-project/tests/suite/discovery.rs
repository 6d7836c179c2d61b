use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};

use solo_build::{BuildEnvironment, EngineConfig, Resolved};
use solo_config::{DiscoveryConfig, ProjectConfig};
use solo_project::{path_to_url, DependencyDiscovery, SearchChain, SearchLink};
use url::Url;

use super::support::write_booter_jar;

fn discover(env: &BuildEnvironment, chain: &SearchChain) -> Vec<solo_project::DependencyRecord> {
    let project = ProjectConfig::default();
    DependencyDiscovery::new(env, &project, &DiscoveryConfig::default())
        .unwrap()
        .discover(chain)
}

fn link(paths: &[PathBuf]) -> SearchLink {
    SearchLink::from_paths("test", paths)
}

#[test]
fn booter_jar_is_replaced_by_its_class_path() {
    let root = tempfile::tempdir().unwrap();
    let booter = root.path().join("app/target/surefire/surefirebooter4711.jar");
    write_booter_jar(
        &booter,
        &["../../../repo/junit-4.13.jar", "../../../repo/hamcrest-core.jar", "../classes/"],
    );

    let env = BuildEnvironment::new(EngineConfig::default());
    let mut chain = SearchChain::new();
    chain.push(link(&[booter.clone()]));
    let records = discover(&env, &chain);

    let paths: Vec<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            root.path().join("repo/junit-4.13.jar"),
            root.path().join("repo/hamcrest-core.jar"),
            root.path().join("app/target/classes"),
        ]
    );
    let ids: Vec<&str> = records.iter().map(|r| r.coordinate.artifact_id.as_str()).collect();
    assert_eq!(ids, ["junit-4", "hamcrest-core", "classes"]);
    assert_eq!(env.fake_count(), 3);
    assert!(!env.has_project("org.scijava.scripting.java", "surefirebooter4711"));
}

#[test]
fn long_class_path_survives_manifest_line_wrapping() {
    let root = tempfile::tempdir().unwrap();
    let booter = root.path().join("target/surefire/surefirebooter.jar");
    let elements: Vec<String> = (0..12)
        .map(|i| format!("../../lib/some-rather-long-artifact-name-{i}.jar"))
        .collect();
    let refs: Vec<&str> = elements.iter().map(String::as_str).collect();
    write_booter_jar(&booter, &refs);

    let env = BuildEnvironment::new(EngineConfig::default());
    let mut chain = SearchChain::new();
    chain.push(link(&[booter]));
    let records = discover(&env, &chain);

    assert_eq!(records.len(), 12);
    assert_eq!(
        records[11].path,
        root.path().join("lib/some-rather-long-artifact-name-11.jar")
    );
}

#[test]
fn unreadable_booter_is_skipped_without_aborting() {
    let root = tempfile::tempdir().unwrap();
    let booter = root.path().join("target/surefire/surefirebooter1.jar");
    std::fs::create_dir_all(booter.parent().unwrap()).unwrap();
    std::fs::write(&booter, b"this is not a zip archive").unwrap();
    let other = root.path().join("lib/guava.jar");

    let env = BuildEnvironment::new(EngineConfig::default());
    let mut chain = SearchChain::new();
    chain.push(link(&[booter, other.clone()]));
    let records = discover(&env, &chain);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, other);
    assert_eq!(records[0].coordinate.artifact_id, "guava");
}

#[test]
fn booter_pattern_must_match_the_whole_url() {
    let root = tempfile::tempdir().unwrap();
    let lookalike = root.path().join("surefirebooter2.jar");
    write_booter_jar(&lookalike, &["dep.jar"]);

    let env = BuildEnvironment::new(EngineConfig::default());
    let mut chain = SearchChain::new();
    chain.push(link(&[lookalike.clone()]));
    let records = discover(&env, &chain);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, lookalike);
}

#[test]
fn links_are_walked_innermost_first() {
    let env = BuildEnvironment::new(EngineConfig::default());
    let mut chain = SearchChain::new();
    chain.push(SearchLink::new("inner", vec![Url::parse("file:///inner/x.jar").unwrap()]));
    chain.push(SearchLink::new("outer", vec![Url::parse("file:///outer/x.jar").unwrap()]));

    let records = discover(&env, &chain);
    assert_eq!(records[0].path, PathBuf::from("/inner/x.jar"));
    assert_eq!(records[0].coordinate.artifact_id, "x");
    assert_eq!(records[1].coordinate.artifact_id, "x-1");
}

#[test]
fn colliding_prefixes_get_distinct_ids_and_keep_them() {
    let env = BuildEnvironment::new(EngineConfig::default());
    let paths: Vec<PathBuf> = (0..5)
        .map(|i| PathBuf::from(format!("/repo/v{i}/commons.jar")))
        .collect();
    let mut chain = SearchChain::new();
    chain.push(SearchLink::new(
        "test",
        paths.iter().map(|p| Url::from_file_path(p).unwrap()).collect(),
    ));

    let first = discover(&env, &chain);
    let ids: HashSet<_> = first.iter().map(|r| r.coordinate.artifact_id.clone()).collect();
    assert_eq!(ids.len(), 5);

    let second = discover(&env, &chain);
    for record in &second {
        assert!(!ids.contains(&record.coordinate.artifact_id));
    }
    for record in &first {
        assert!(matches!(
            env.resolve(&record.coordinate),
            Some(Resolved::Fake(path)) if path == record.path
        ));
    }
}

#[test]
fn concurrent_discovery_never_shares_an_id() {
    let env = Arc::new(BuildEnvironment::new(EngineConfig::default()));
    let mut chain = SearchChain::new();
    chain.push(SearchLink::new(
        "test",
        (0..10)
            .map(|i| Url::parse(&format!("file:///repo/{i}/lib.jar")).unwrap())
            .collect(),
    ));
    let chain = Arc::new(chain);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let env = env.clone();
            let chain = chain.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                discover(&env, &chain)
                    .into_iter()
                    .map(|r| r.coordinate.artifact_id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(all.insert(id), "duplicate artifact id");
        }
    }
    assert_eq!(all.len(), 40);
}

#[test]
fn configured_classpath_forms_the_innermost_link() {
    let root = tempfile::tempdir().unwrap();
    let classes = root.path().join("classes");
    std::fs::create_dir_all(&classes).unwrap();
    let config = DiscoveryConfig {
        classpath: vec![root.path().join("lib.jar")],
        inherit_env_classpath: false,
        ..DiscoveryConfig::default()
    };

    let chain = SearchChain::from_process(&config, &[classes.clone()]);
    assert_eq!(chain.links().len(), 1);
    assert_eq!(
        chain.links()[0].entries,
        vec![
            path_to_url(&classes).unwrap(),
            Url::from_file_path(root.path().join("lib.jar")).unwrap(),
        ]
    );
    assert!(chain.links()[0].entries[0].as_str().ends_with("/classes/"));
}
