//! Ad-hoc project synthesis for single Java source files.
//!
//! A loose `.java` file (or raw source text) has no build descriptor. This
//! crate recovers the unit's name, fakes a descriptor entry for everything on
//! the process classpath, writes a minimal Maven-style project around the
//! unit, and hands it to [`solo_build`]. Files that already live in a project
//! reuse that project's `pom.xml`.

mod descriptor;
mod discovery;
mod error;
mod session;
mod synth;
mod unit;

pub use descriptor::{
    conventional_project_root, DescriptorFactory, Persistence, ProjectDescriptor,
    SynthesizedDescriptor, DESCRIPTOR_FILE_NAME,
};
pub use discovery::{
    fake_artifact_id, path_to_url, DependencyDiscovery, DependencyRecord, SearchChain, SearchLink,
};
pub use error::{DescriptorError, Result, SynthError};
pub use session::{ErrorSink, PendingCleanup, SynthesisSession};
pub use synth::{Built, ProjectSynthesizer, SourceInput, SynthState, Synthesized};
pub use unit::{extract_unit_name, extract_unit_name_from_file, SourceUnit};
