use std::path::PathBuf;

use solo_archive::{JarWriter, Manifest};

use crate::project::Project;
use crate::{BuildError, Result};

/// Write the project JAR to [`Project::target`].
///
/// Layout: the manifest (with `Main-Class` when the project has an entry
/// point), a descriptor copy under `META-INF/maven/<group>/<artifact>/`, the
/// compiled classes, and with `include_sources` the descriptor and main
/// sources at their project-relative paths.
pub(crate) fn assemble(project: &Project, include_sources: bool) -> Result<PathBuf> {
    let target = project.target();
    let package_err = |err: anyhow::Error| BuildError::Package {
        path: target.clone(),
        message: format!("{err:#}"),
    };

    let mut manifest = Manifest::with_defaults();
    if let Some(main_class) = project.entry_point() {
        manifest.insert("Main-Class", main_class);
    }

    let coordinate = project.coordinate();
    let mut jar = JarWriter::create(&target, &manifest).map_err(package_err)?;
    jar.add_bytes(
        &format!(
            "META-INF/maven/{}/{}/pom.xml",
            coordinate.group_id, coordinate.artifact_id
        ),
        project.descriptor_bytes(),
    )
    .map_err(package_err)?;

    let classes = project.build_output();
    if classes.is_dir() {
        jar.add_tree("", &classes).map_err(package_err)?;
    }

    if include_sources {
        jar.add_bytes("pom.xml", project.descriptor_bytes())
            .map_err(package_err)?;
        let sources = project.source_dir();
        if sources.is_dir() {
            jar.add_tree("src/main/java/", &sources).map_err(package_err)?;
        }
    }

    jar.finish().map_err(package_err)
}
