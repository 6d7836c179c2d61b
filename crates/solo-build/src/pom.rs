use crate::{BuildError, Coordinate, Result};

pub const JAR_PLUGIN_ARTIFACT_ID: &str = "maven-jar-plugin";

/// The subset of a `pom.xml` the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomModel {
    pub coordinate: Coordinate,
    /// `maven-jar-plugin` → `configuration/archive/manifest/mainClass`.
    pub entry_point: Option<String>,
    pub dependencies: Vec<PomDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    /// `version` is empty when the POM omits it.
    pub coordinate: Coordinate,
    pub scope: Option<String>,
}

impl PomDependency {
    pub fn is_test_scoped(&self) -> bool {
        self.scope.as_deref() == Some("test")
    }
}

impl PomModel {
    /// Parse POM text; `origin` names the source in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(text).map_err(|err| BuildError::Descriptor {
            origin: origin.to_owned(),
            message: err.to_string(),
        })?;

        let project = doc.root_element();
        if project.tag_name().name() != "project" {
            return Err(BuildError::Descriptor {
                origin: origin.to_owned(),
                message: format!(
                    "expected <project> root element, found <{}>",
                    project.tag_name().name()
                ),
            });
        }

        let parent = child_element(&project, "parent");
        let inherited = |name: &str| parent.as_ref().and_then(|p| child_text(p, name));

        let missing = |name: &str| BuildError::Descriptor {
            origin: origin.to_owned(),
            message: format!("missing <{name}>"),
        };
        let group_id = child_text(&project, "groupId")
            .or_else(|| inherited("groupId"))
            .ok_or_else(|| missing("groupId"))?;
        let artifact_id = child_text(&project, "artifactId").ok_or_else(|| missing("artifactId"))?;
        let version = child_text(&project, "version")
            .or_else(|| inherited("version"))
            .ok_or_else(|| missing("version"))?;

        let entry_point = child_element(&project, "build")
            .and_then(|build| child_element(&build, "plugins"))
            .and_then(|plugins| {
                plugins
                    .children()
                    .filter(|n| n.is_element() && n.has_tag_name("plugin"))
                    .find(|plugin| {
                        child_text(plugin, "artifactId").as_deref() == Some(JAR_PLUGIN_ARTIFACT_ID)
                    })
            })
            .and_then(|plugin| child_element(&plugin, "configuration"))
            .and_then(|configuration| child_element(&configuration, "archive"))
            .and_then(|archive| child_element(&archive, "manifest"))
            .and_then(|manifest| child_text(&manifest, "mainClass"));

        let dependencies = child_element(&project, "dependencies")
            .map(|deps| parse_dependencies(&deps))
            .unwrap_or_default();

        Ok(Self {
            coordinate: Coordinate::new(group_id, artifact_id, version),
            entry_point,
            dependencies,
        })
    }
}

fn parse_dependencies(deps_node: &roxmltree::Node<'_, '_>) -> Vec<PomDependency> {
    deps_node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("dependency"))
        .filter_map(|dep_node| {
            let group_id = child_text(&dep_node, "groupId")?;
            let artifact_id = child_text(&dep_node, "artifactId")?;
            let version = child_text(&dep_node, "version").unwrap_or_default();
            Some(PomDependency {
                coordinate: Coordinate::new(group_id, artifact_id, version),
                scope: child_text(&dep_node, "scope"),
            })
        })
        .collect()
}

fn child_element<'a, 'i>(
    node: &roxmltree::Node<'a, 'i>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
