use std::path::PathBuf;
use std::sync::Arc;

use solo_archive::Archive;
use solo_project::{SearchChain, SearchLink, SourceInput, SynthError, SynthState};
use url::Url;

use super::support::{arg_after, sorted_entries, synthesizer, FakeJavac, DUMMY};

#[test]
fn dummy_text_packages_without_sources() {
    let out = tempfile::tempdir().unwrap();
    let jar_path = out.path().join("dummy.jar");
    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());

    let written = synth
        .assemble_package(&SourceInput::text(DUMMY), false, Some(&jar_path), None)
        .unwrap()
        .unwrap();

    assert_eq!(written, jar_path);
    assert_eq!(
        sorted_entries(&jar_path),
        vec![
            "Dummy.class",
            "META-INF/MANIFEST.MF",
            "META-INF/maven/org.scijava.scripting.java/Dummy/pom.xml",
        ]
    );
    let manifest = Archive::new(&jar_path).manifest().unwrap().unwrap();
    assert_eq!(manifest.main_class(), Some("Dummy"));
}

#[test]
fn dummy_text_packages_with_sources() {
    let out = tempfile::tempdir().unwrap();
    let jar_path = out.path().join("nested/dummy-src.jar");
    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());

    synth
        .assemble_package(&SourceInput::text(DUMMY), true, Some(&jar_path), None)
        .unwrap()
        .unwrap();

    assert_eq!(
        sorted_entries(&jar_path),
        vec![
            "Dummy.class",
            "META-INF/MANIFEST.MF",
            "META-INF/maven/org.scijava.scripting.java/Dummy/pom.xml",
            "pom.xml",
            "src/main/java/Dummy.java",
        ]
    );
    let jar = Archive::new(&jar_path);
    assert_eq!(
        jar.read("src/main/java/Dummy.java").unwrap().unwrap(),
        DUMMY.as_bytes()
    );
    let pom = String::from_utf8(jar.read("pom.xml").unwrap().unwrap()).unwrap();
    assert!(pom.contains("<artifactId><![CDATA[Dummy]]></artifactId>"), "{pom}");
    assert!(pom.contains("<mainClass><![CDATA[Dummy]]></mainClass>"), "{pom}");
}

#[test]
fn synthesize_reports_entry_point_and_classpath() {
    let libs = tempfile::tempdir().unwrap();
    let commons = libs.path().join("commons-io-2.11.jar");
    std::fs::write(&commons, b"").unwrap();
    let mut chain = SearchChain::new();
    chain.push(SearchLink::new(
        "test",
        vec![Url::from_file_path(&commons).unwrap()],
    ));

    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, chain);
    let source = "package com.acme;\n\npublic class Hello {\n    public static void main(String[] a) {}\n}\n";

    let (built, project_dir) = synth
        .synthesize_with(&SourceInput::text(source), None, |built| {
            assert!(built.project.build_output().join("com/acme/Hello.class").is_file());
            (built.clone(), built.project.directory().to_path_buf())
        })
        .unwrap()
        .unwrap();

    assert_eq!(built.state, SynthState::LooseUnit);
    assert_eq!(built.entry_point, "com.acme.Hello");
    assert_eq!(built.project.coordinate().artifact_id, "Hello");
    assert_eq!(built.classpath, vec![built.project.build_output(), commons.clone()]);
    assert_eq!(
        built.project.dependencies()[0].coordinate.artifact_id,
        "commons-io-2"
    );

    let invocations = javac.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(arg_after(&invocations[0], "-cp").contains("commons-io-2.11.jar"));

    // The temporary project is gone once the request returns.
    assert!(!project_dir.exists());
}

#[test]
fn conventional_layout_graduates_and_is_reused() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("tool");
    let source = project.join("src/main/java/com/acme/Tool.java");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "package com.acme;\npublic class Tool {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let first = synthesizer(&javac, SearchChain::new())
        .synthesize(&SourceInput::file(&source), None)
        .unwrap()
        .unwrap();

    let pom = project.join("pom.xml");
    assert_eq!(first.state, SynthState::LooseUnit);
    assert!(pom.is_file());
    assert_eq!(first.project.descriptor_path(), Some(pom.as_path()));
    assert!(project.join("target/classes/com/acme/Tool.class").is_file());
    let written = std::fs::read(&pom).unwrap();

    let second = synthesizer(&javac, SearchChain::new())
        .synthesize(&SourceInput::file(&source), None)
        .unwrap()
        .unwrap();
    assert_eq!(second.state, SynthState::ExistingUnitInProject);
    assert_eq!(second.entry_point, "com.acme.Tool");
    assert_eq!(second.project.descriptor_bytes(), written.as_slice());
    assert_eq!(std::fs::read(&pom).unwrap(), written);
}

#[test]
fn graduated_descriptor_resolves_a_same_named_jar_in_a_fresh_environment() {
    let root = tempfile::tempdir().unwrap();
    let jar = root.path().join("libs/Tool.jar");
    std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
    std::fs::write(&jar, b"").unwrap();
    let chain = || {
        let mut chain = SearchChain::new();
        chain.push(SearchLink::new("libs", vec![Url::from_file_path(&jar).unwrap()]));
        chain
    };

    let project = root.path().join("tool");
    let source = project.join("src/main/java/Tool.java");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "public class Tool {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let first = synthesizer(&javac, chain())
        .synthesize(&SourceInput::file(&source), None)
        .unwrap()
        .unwrap();
    assert_eq!(first.state, SynthState::LooseUnit);
    assert_eq!(first.project.coordinate().artifact_id, "Tool-1");
    let pom = std::fs::read_to_string(project.join("pom.xml")).unwrap();
    assert!(pom.contains("<artifactId><![CDATA[Tool]]></artifactId>"), "{pom}");

    let second = synthesizer(&javac, chain())
        .synthesize(&SourceInput::file(&source), None)
        .unwrap()
        .unwrap();
    assert_eq!(second.state, SynthState::ExistingUnitInProject);
    assert_eq!(second.project.coordinate().artifact_id, "Tool-1");
    assert_eq!(second.classpath, vec![second.project.build_output(), jar.clone()]);
}

#[test]
fn repeated_requests_reuse_discovered_dependencies() {
    let libs = tempfile::tempdir().unwrap();
    let commons = libs.path().join("commons.jar");
    std::fs::write(&commons, b"").unwrap();
    let mut chain = SearchChain::new();
    chain.push(SearchLink::new("libs", vec![Url::from_file_path(&commons).unwrap()]));

    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, chain);
    let ids: Vec<String> = (0..3)
        .map(|_| {
            let built = synth
                .synthesize(&SourceInput::text(DUMMY), None)
                .unwrap()
                .unwrap();
            built.project.dependencies()[0].coordinate.artifact_id.clone()
        })
        .collect();

    assert_eq!(ids, ["commons", "commons", "commons"]);
    assert_eq!(synth.env().fake_count(), 1);
}

#[test]
fn loose_file_outside_a_project_builds_in_a_temporary_tree() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("com/acme/Foo.java");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "package com.acme;\npublic class Foo {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let built = synthesizer(&javac, SearchChain::new())
        .synthesize(&SourceInput::file(&source), None)
        .unwrap()
        .unwrap();

    assert_eq!(built.state, SynthState::LooseUnit);
    assert_eq!(built.entry_point, "com.acme.Foo");
    assert!(!built.project.directory().starts_with(root.path()));
    assert!(!built.project.directory().exists());
    assert!(!root.path().join("pom.xml").exists());
    assert!(!root.path().join("com/acme/pom.xml").exists());
}

#[test]
fn misplaced_file_is_rejected_with_both_names() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("com/acme/Foo.java");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "package com.acme;\npublic class Bar {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());

    let err = synth
        .synthesize(&SourceInput::file(&source), None)
        .unwrap_err();
    assert!(
        matches!(&err, SynthError::InconsistentPath { expected, actual, .. }
            if expected == "com.acme.Foo" && actual == "com.acme.Bar"),
        "{err:?}"
    );

    let mut sink = Vec::new();
    let outcome = synth
        .synthesize(&SourceInput::file(&source), Some(&mut sink))
        .unwrap();
    assert!(outcome.is_none());
    let rendered = String::from_utf8(sink).unwrap();
    assert!(rendered.contains("com.acme.Foo"), "{rendered}");
    assert!(rendered.contains("com.acme.Bar"), "{rendered}");
    assert!(javac.invocations().is_empty());
}

#[test]
fn existing_descriptor_is_used_unchanged() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("src/main/java/app")).unwrap();
    std::fs::write(
        root.path().join("src/main/java/app/Main.java"),
        "package app;\npublic class Main {}\n",
    )
    .unwrap();
    let pom_text = r#"<project>
    <groupId>org.example</groupId>
    <artifactId>app</artifactId>
    <version>2.0</version>
    <build><plugins><plugin>
        <artifactId>maven-jar-plugin</artifactId>
        <configuration><archive><manifest><mainClass>app.Main</mainClass></manifest></archive></configuration>
    </plugin></plugins></build>
</project>"#;
    let pom = root.path().join("pom.xml");
    std::fs::write(&pom, pom_text).unwrap();

    let javac = Arc::new(FakeJavac::default());
    let built = synthesizer(&javac, SearchChain::new())
        .synthesize(&SourceInput::file(&pom), None)
        .unwrap()
        .unwrap();

    assert_eq!(built.state, SynthState::ExistingDescriptor);
    assert_eq!(built.entry_point, "app.Main");
    assert_eq!(std::fs::read_to_string(&pom).unwrap(), pom_text);
    assert!(root.path().join("target/classes/app/Main.class").is_file());
}

#[test]
fn descriptor_without_entry_point_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let pom = root.path().join("pom.xml");
    std::fs::write(
        &pom,
        "<project><groupId>g</groupId><artifactId>lib</artifactId><version>1</version></project>",
    )
    .unwrap();

    let javac = Arc::new(FakeJavac::default());
    let err = synthesizer(&javac, SearchChain::new())
        .synthesize(&SourceInput::file(&pom), None)
        .unwrap_err();
    assert!(matches!(err, SynthError::NoEntryPoint { .. }), "{err:?}");
}

#[test]
fn non_java_files_are_unsupported() {
    let root = tempfile::tempdir().unwrap();
    let script = root.path().join("script.groovy");
    std::fs::write(&script, "println 'hi'").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let err = synthesizer(&javac, SearchChain::new())
        .compile(&SourceInput::file(&script), None)
        .unwrap_err();
    assert!(matches!(err, SynthError::UnsupportedSource { .. }), "{err:?}");
}

#[test]
fn existing_named_file_wins_over_text() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("Real.java");
    std::fs::write(&source, "public class Real {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());
    let built = synth
        .synthesize(&SourceInput::named_text("public class Ignored {}", &source), None)
        .unwrap()
        .unwrap();
    assert_eq!(built.entry_point, "Real");

    let missing = root.path().join("Gone.java");
    let built = synth
        .synthesize(&SourceInput::named_text("class Hidden {}", &missing), None)
        .unwrap()
        .unwrap();
    assert_eq!(built.entry_point, "Gone");
}

#[test]
fn raw_text_without_public_type_uses_fallback_name() {
    let javac = Arc::new(FakeJavac::default());
    let coordinate = synthesizer(&javac, SearchChain::new())
        .compile(&SourceInput::text("class Helper {}"), None)
        .unwrap()
        .unwrap();
    assert_eq!(coordinate.artifact_id, "Script");
}

#[test]
fn descriptor_preview_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("tool/src/main/java/Tool.java");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "public class Tool {}\n").unwrap();

    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());

    let pom = String::from_utf8(synth.descriptor_for(&SourceInput::file(&source)).unwrap()).unwrap();
    assert!(pom.contains("<artifactId><![CDATA[Tool]]></artifactId>"), "{pom}");
    assert!(pom.contains("<version><![CDATA[1.0.0-SNAPSHOT]]></version>"), "{pom}");
    assert!(!root.path().join("tool/pom.xml").exists());
    assert!(javac.invocations().is_empty());

    let text_pom = synth.descriptor_for(&SourceInput::text(DUMMY)).unwrap();
    assert!(String::from_utf8(text_pom).unwrap().contains("<mainClass><![CDATA[Dummy]]></mainClass>"));
}

#[test]
fn compile_leaves_no_temporary_tree() {
    let javac = Arc::new(FakeJavac::default());
    let synth = synthesizer(&javac, SearchChain::new());
    let coordinate = synth
        .compile(&SourceInput::text(DUMMY), None)
        .unwrap()
        .unwrap();
    assert_eq!(coordinate.to_string(), "org.scijava.scripting.java:Dummy:1.0.0-SNAPSHOT");

    let dirs: Vec<PathBuf> = javac.output_dirs();
    assert_eq!(dirs.len(), 1);
    assert!(!dirs[0].exists());
}
