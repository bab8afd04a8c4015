//! Test suites
//!
//! A suite is an ordered list of test cases plus the session resources they
//! share. Construction checks that names are unique and that every
//! dependency points at a test declared earlier, so the runner can execute
//! in declaration order without ever meeting an unresolved dependency.
//!
//! Suites can also be loaded from YAML:
//!
//! ```yaml
//! name: Project lifecycle
//! names:
//!   project: "__harness_project_"
//! session:
//!   - kind: project
//!     name: "${project}"
//! tests:
//!   - name: test_open_project
//!     tool: open_project
//!     args: { project: "${project}" }
//!     validator: project_opened
//! ```
//!
//! Every entry under `names` becomes a placeholder bound to the prefix plus
//! a fresh random suffix, substituted into all string arguments.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

use super::model::TestCase;
use super::resources::{ResourceNamer, ResourceSpec};
use super::validators::Validator;

/// An ordered, validated collection of tests
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    description: Option<String>,
    tests: Vec<TestCase>,
    session: Vec<ResourceSpec>,
}

impl Suite {
    /// Build a suite, rejecting duplicate names and forward or dangling
    /// dependencies
    pub fn new(name: impl Into<String>, tests: Vec<TestCase>) -> Result<Self> {
        validate(&tests)?;
        Ok(Self {
            name: name.into(),
            description: None,
            tests,
            session: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Resources created before the first test and released after the last
    pub fn with_session(mut self, resources: Vec<ResourceSpec>) -> Self {
        self.session = resources;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn session(&self) -> &[ResourceSpec] {
        &self.session
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Load a suite from a YAML file
    pub fn load(path: &Path, namer: &ResourceNamer) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content, namer)
    }

    /// Parse a suite from YAML, binding each `names` placeholder to a
    /// freshly generated name
    pub fn from_yaml(source: &str, namer: &ResourceNamer) -> Result<Self> {
        let file: SuiteFile = serde_yaml::from_str(source)?;

        let vars: BTreeMap<String, String> = file
            .names
            .iter()
            .map(|(key, prefix)| (key.clone(), namer.name(prefix)))
            .collect();

        let mut tests = file.tests;
        for test in &mut tests {
            substitute_map(&mut test.args, &vars)?;
            if let Some(setup) = &mut test.setup {
                substitute_map(&mut setup.args, &vars)?;
            }
            if let Some(cleanup) = &mut test.cleanup {
                substitute_map(&mut cleanup.args, &vars)?;
            }
            if let Some(Validator::Contains(needle)) = &mut test.validator {
                *needle = substitute(needle, &vars)?;
            }
        }

        let session = file
            .session
            .into_iter()
            .map(|decl| decl.into_spec(&vars))
            .collect::<Result<Vec<_>>>()?;

        let mut suite = Suite::new(file.name, tests)?.with_session(session);
        suite.description = file.description;
        Ok(suite)
    }
}

fn validate(tests: &[TestCase]) -> Result<()> {
    let mut seen = HashSet::new();
    for test in tests {
        if let Some(dep) = &test.depends_on {
            if !seen.contains(dep.as_str()) {
                return Err(Error::unknown_dependency(&test.name, dep));
            }
        }
        if !seen.insert(test.name.as_str()) {
            return Err(Error::DuplicateTest(test.name.clone()));
        }
    }
    Ok(())
}

/// On-disk suite layout
#[derive(Deserialize, Debug)]
struct SuiteFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    /// Placeholder name to name prefix
    #[serde(default)]
    names: BTreeMap<String, String>,
    #[serde(default)]
    session: Vec<ResourceDecl>,
    tests: Vec<TestCase>,
}

/// A session resource as written in a suite file
#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ResourceDecl {
    Project {
        name: String,
        #[serde(default)]
        instructions: Option<String>,
    },
    File {
        project: String,
        name: String,
        #[serde(default)]
        content: String,
    },
    Conversation {
        project: String,
        name: String,
        message: String,
    },
}

impl ResourceDecl {
    fn into_spec(self, vars: &BTreeMap<String, String>) -> Result<ResourceSpec> {
        Ok(match self {
            ResourceDecl::Project { name, instructions } => {
                let instructions = instructions.map(|i| substitute(&i, vars)).transpose()?;
                ResourceSpec::project(&substitute(&name, vars)?, instructions.as_deref())
            }
            ResourceDecl::File {
                project,
                name,
                content,
            } => ResourceSpec::file(
                &substitute(&project, vars)?,
                &substitute(&name, vars)?,
                &substitute(&content, vars)?,
            ),
            ResourceDecl::Conversation {
                project,
                name,
                message,
            } => ResourceSpec::conversation(
                &substitute(&project, vars)?,
                &substitute(&name, vars)?,
                &substitute(&message, vars)?,
            ),
        })
    }
}

/// Replace every `${key}` in `text`
///
/// An unterminated `${` is left as is; an unknown key is an error.
fn substitute(text: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let key = &rest[start + 2..start + 2 + len];
        let value = vars
            .get(key)
            .ok_or_else(|| Error::Config(format!("Unknown placeholder '${{{}}}'", key)))?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + 3 + len..];
    }

    out.push_str(rest);
    Ok(out)
}

fn substitute_value(value: &mut Value, vars: &BTreeMap<String, String>) -> Result<()> {
    match value {
        Value::String(s) => *s = substitute(s, vars)?,
        Value::Array(items) => {
            for item in items {
                substitute_value(item, vars)?;
            }
        }
        Value::Object(map) => substitute_map(map, vars)?,
        _ => {}
    }
    Ok(())
}

fn substitute_map(map: &mut Map<String, Value>, vars: &BTreeMap<String, String>) -> Result<()> {
    for value in map.values_mut() {
        substitute_value(value, vars)?;
    }
    Ok(())
}
