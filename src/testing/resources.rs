//! Remote resource lifecycle
//!
//! Projects, files and conversations created on the remote side must be
//! torn down even when the code using them fails or panics. Resources are
//! acquired through a [`ResourceManager`] scope whose release step always
//! runs, and every generated name carries a random suffix so repeated or
//! concurrent runs do not collide.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::{Error, Result};
use crate::mcp::{Payload, ToolCaller};

use super::model::ToolInvocation;

/// Length of the random part of generated names
pub const SUFFIX_LEN: usize = 8;

/// Source of name suffixes
pub type SuffixFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Eight hex characters from a fresh v4 UUID
pub fn random_suffix() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(SUFFIX_LEN);
    hex
}

/// Generates collision-free resource names
#[derive(Clone)]
pub struct ResourceNamer {
    suffix: SuffixFn,
}

impl ResourceNamer {
    /// Namer backed by [`random_suffix`]
    pub fn random() -> Self {
        Self {
            suffix: Arc::new(random_suffix),
        }
    }

    /// Namer with a caller-supplied suffix source, e.g. a counter in tests
    pub fn with_suffix_fn(suffix: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            suffix: Arc::new(suffix),
        }
    }

    /// `prefix` followed by a fresh suffix
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, (self.suffix)())
    }
}

impl Default for ResourceNamer {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for ResourceNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNamer").finish_non_exhaustive()
    }
}

/// Kinds of remote state the harness creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    File,
    Conversation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Project => "project",
            ResourceKind::File => "file",
            ResourceKind::Conversation => "conversation",
        })
    }
}

/// How to create and destroy one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: String,
    pub create: ToolInvocation,
    /// `None` when the remote side has no way to delete this kind
    pub release: Option<ToolInvocation>,
}

impl ResourceSpec {
    /// A project, deleted with `confirm: true`
    pub fn project(name: &str, instructions: Option<&str>) -> Self {
        let mut create = json!({ "name": name });
        if let Some(instructions) = instructions {
            create["instructions"] = json!(instructions);
        }
        Self {
            kind: ResourceKind::Project,
            name: name.to_string(),
            create: ToolInvocation::new("create_project", create),
            release: Some(ToolInvocation::new(
                "delete_project",
                json!({ "project": name, "confirm": true }),
            )),
        }
    }

    /// A text file in a project's knowledge base
    pub fn file(project: &str, file_name: &str, content: &str) -> Self {
        Self {
            kind: ResourceKind::File,
            name: file_name.to_string(),
            create: ToolInvocation::new(
                "create_file",
                json!({ "project": project, "file_name": file_name, "content": content }),
            ),
            release: Some(ToolInvocation::new(
                "delete_file",
                json!({ "project": project, "file_name": file_name }),
            )),
        }
    }

    /// A conversation started by sending a message; it cannot be deleted
    pub fn conversation(project: &str, label: &str, message: &str) -> Self {
        Self {
            kind: ResourceKind::Conversation,
            name: label.to_string(),
            create: ToolInvocation::new(
                "send_message",
                json!({ "project": project, "message": message, "wait_for_response": true }),
            ),
            release: None,
        }
    }

    fn label(&self) -> String {
        format!("{} '{}'", self.kind, self.name)
    }
}

/// A created resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    /// Id assigned by the remote side, when it reported one
    pub id: Option<String>,
    pub url: Option<String>,
    #[serde(skip)]
    release: Option<ToolInvocation>,
}

impl Resource {
    fn from_creation(spec: &ResourceSpec, content: Option<&Value>) -> Self {
        let field = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                content
                    .and_then(|c| c.get(*key))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
        };
        Self {
            kind: spec.kind,
            name: spec.name.clone(),
            id: field(&["id", "projectId", "uuid", "conversation_id"]),
            url: field(&["url"]),
            release: spec.release.clone(),
        }
    }
}

/// Which scope owns a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Created once before a batch of tests, destroyed once after
    Session,
    /// Created and destroyed within a single test body
    Test,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Session => "session",
            Scope::Test => "test",
        })
    }
}

/// Acquires and releases remote resources with guaranteed teardown
#[derive(Debug, Clone, Default)]
pub struct ResourceManager {
    namer: ResourceNamer,
    /// Skip the release step, leaving resources in place for inspection
    keep: bool,
}

impl ResourceManager {
    pub fn new(namer: ResourceNamer, keep: bool) -> Self {
        Self { namer, keep }
    }

    pub fn namer(&self) -> &ResourceNamer {
        &self.namer
    }

    /// Create one resource
    ///
    /// A failed creation call is an [`Error::SetupFailed`].
    pub async fn acquire<C: ToolCaller>(
        &self,
        caller: &mut C,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> Result<Resource> {
        tracing::info!("Creating {}", spec.label());
        let response = caller
            .call_tool(&spec.create.tool, spec.create.args.clone(), timeout)
            .await?;

        if let Some(error) = response.error() {
            return Err(Error::setup_failed(&spec.label(), error));
        }

        let content = match response.content() {
            Some(Payload::Structured(value)) => Some(value),
            _ => None,
        };
        Ok(Resource::from_creation(spec, content))
    }

    /// Destroy one resource, logging instead of failing
    ///
    /// The remote side may already have removed it; any error is swallowed
    /// so it cannot mask the result of the code that used the resource.
    pub async fn release<C: ToolCaller>(
        &self,
        caller: &mut C,
        resource: &Resource,
        timeout: Duration,
    ) {
        let Some(release) = &resource.release else {
            tracing::debug!("No release step for {} '{}'", resource.kind, resource.name);
            return;
        };
        if self.keep {
            tracing::info!("Keeping {} '{}'", resource.kind, resource.name);
            return;
        }

        tracing::info!("Releasing {} '{}'", resource.kind, resource.name);
        match caller
            .call_tool(&release.tool, release.args.clone(), timeout)
            .await
        {
            Ok(response) => {
                if let Some(error) = response.error() {
                    tracing::warn!(
                        "Release of {} '{}' failed: {}",
                        resource.kind,
                        resource.name,
                        error
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Release of {} '{}' failed: {}",
                    resource.kind,
                    resource.name,
                    e
                );
            }
        }
    }

    /// Run `body` with resources that are released afterwards no matter what
    ///
    /// Resources are created in order and released in reverse order. If a
    /// creation fails, the ones already created are released and the
    /// failure is returned without running `body`. If `body` panics, release
    /// still happens before the panic continues.
    pub async fn scoped<C, T, F>(
        &self,
        scope: Scope,
        caller: &mut C,
        specs: &[ResourceSpec],
        timeout: Duration,
        body: F,
    ) -> Result<T>
    where
        C: ToolCaller,
        F: for<'c> FnOnce(&'c mut C, &'c [Resource]) -> BoxFuture<'c, T>,
    {
        let mut resources = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.acquire(caller, spec, timeout).await {
                Ok(resource) => resources.push(resource),
                Err(e) => {
                    tracing::error!("{} setup failed: {}", scope, e);
                    self.release_all(caller, &resources, timeout).await;
                    return Err(e);
                }
            }
        }

        let outcome = AssertUnwindSafe(body(caller, &resources))
            .catch_unwind()
            .await;

        self.release_all(caller, &resources, timeout).await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// [`scoped`](Self::scoped) for resources shared by a batch of tests
    pub async fn session<C, T, F>(
        &self,
        caller: &mut C,
        specs: &[ResourceSpec],
        timeout: Duration,
        body: F,
    ) -> Result<T>
    where
        C: ToolCaller,
        F: for<'c> FnOnce(&'c mut C, &'c [Resource]) -> BoxFuture<'c, T>,
    {
        self.scoped(Scope::Session, caller, specs, timeout, body).await
    }

    /// [`scoped`](Self::scoped) for a single resource inside one test body
    pub async fn per_test<C, T, F>(
        &self,
        caller: &mut C,
        spec: &ResourceSpec,
        timeout: Duration,
        body: F,
    ) -> Result<T>
    where
        C: ToolCaller,
        F: for<'c> FnOnce(&'c mut C, &'c [Resource]) -> BoxFuture<'c, T>,
    {
        self.scoped(Scope::Test, caller, std::slice::from_ref(spec), timeout, body)
            .await
    }

    async fn release_all<C: ToolCaller>(
        &self,
        caller: &mut C,
        resources: &[Resource],
        timeout: Duration,
    ) {
        for resource in resources.iter().rev() {
            self.release(caller, resource, timeout).await;
        }
    }
}
