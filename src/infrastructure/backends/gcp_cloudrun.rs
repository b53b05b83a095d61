//! Google Cloud Run binding
//!
//! Setup enables the platform APIs and creates an Artifact Registry docker
//! repository. Deploy runs `gcloud run deploy` with a fresh revision suffix.

use serde_json::Value;

use crate::domain::entities::{
    DeploymentSpec, ImageRef, Lookup, ProvisioningStep, ResourceDescriptor, ResourceSet,
    REQUIRED_APIS,
};
use crate::domain::ports::{AdapterError, AdapterResult, CommandRunner, Invocation, ResourceAdapter};
use crate::domain::value_objects::{Backend, ErrorClass, ResourceKind};

use super::cli::{
    optional, revision_suffix, sig, str_at, ProviderCli, Signature, IMAGE_NOT_VISIBLE, TRANSIENT,
};

const SIGNATURES: &[Signature] = &[
    sig(&["image", "not found"], IMAGE_NOT_VISIBLE),
    sig(&["image", "manifest"], IMAGE_NOT_VISIBLE),
    sig(&["image", "pull"], IMAGE_NOT_VISIBLE),
    sig(&["do not currently have an active account"], ErrorClass::Fatal),
    sig(&["reauthentication"], ErrorClass::Fatal),
    sig(&["permission_denied"], ErrorClass::Fatal),
    sig(&["permission denied"], ErrorClass::Fatal),
    sig(&["does not have permission"], ErrorClass::Fatal),
    sig(&["billing"], ErrorClass::Fatal),
    sig(&["quota"], ErrorClass::Fatal),
    sig(&["invalid_argument"], ErrorClass::Fatal),
    sig(&["not_found"], ErrorClass::NotFound),
    sig(&["cannot find"], ErrorClass::NotFound),
    sig(&["could not be found"], ErrorClass::NotFound),
    sig(&["not found"], ErrorClass::NotFound),
    sig(&["does not exist"], ErrorClass::NotFound),
    sig(&["unavailable"], TRANSIENT),
    sig(&["try again"], TRANSIENT),
];

pub struct GcpCloudRun<R: CommandRunner> {
    spec: DeploymentSpec,
    cli: ProviderCli<R>,
}

impl<R: CommandRunner> GcpCloudRun<R> {
    pub fn new(spec: DeploymentSpec, runner: R) -> Self {
        let cli = ProviderCli::new(runner, SIGNATURES).with_owned_names(spec.owned_names());
        Self { spec, cli }
    }

    fn project(&self) -> &str {
        self.spec.project_id.as_deref().unwrap_or_default()
    }

    fn gcloud<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        Invocation::new("gcloud")
            .args(args)
            .arg(format!("--project={}", self.project()))
            .arg("--format=json")
    }

    fn region_flag(&self) -> String {
        format!("--region={}", self.spec.region)
    }

    fn descriptor(&self, kind: ResourceKind, id: impl Into<String>) -> ResourceDescriptor {
        ResourceDescriptor::new(kind, self.spec.resource_name(kind), id)
    }

    /// `<region>-docker.pkg.dev/<project>/<repository>`
    fn repository_path(&self) -> String {
        format!(
            "{}-docker.pkg.dev/{}/{}",
            self.spec.region,
            self.project(),
            self.spec.names.repository
        )
    }

    fn lookup_apis(&self) -> AdapterResult<Lookup> {
        let out = self.cli.json(&self.gcloud(["services", "list", "--enabled"]))?;
        let enabled: Vec<&str> = out
            .as_array()
            .map(|services| {
                services
                    .iter()
                    .filter_map(|s| s.pointer("/config/name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let missing: Vec<&str> = REQUIRED_APIS
            .iter()
            .copied()
            .filter(|api| !enabled.contains(api))
            .collect();
        if missing.is_empty() {
            Ok(Lookup::Found(
                self.descriptor(ResourceKind::ServiceApis, REQUIRED_APIS.join(",")),
            ))
        } else {
            tracing::debug!(missing = ?missing, "platform APIs not enabled");
            Ok(Lookup::NotFound)
        }
    }

    fn enable_apis(&self) -> AdapterResult<ResourceDescriptor> {
        let inv = Invocation::new("gcloud")
            .args(["services", "enable"])
            .args(REQUIRED_APIS)
            .arg(format!("--project={}", self.project()));
        self.cli.run(&inv)?;
        Ok(self.descriptor(ResourceKind::ServiceApis, REQUIRED_APIS.join(",")))
    }

    fn registry_descriptor(&self, id: &str) -> ResourceDescriptor {
        self.descriptor(ResourceKind::Registry, id)
            .with_attribute("uri", self.repository_path())
    }

    fn lookup_registry(&self) -> AdapterResult<Lookup> {
        let location = format!("--location={}", self.spec.region);
        let inv = self.gcloud([
            "artifacts",
            "repositories",
            "describe",
            self.spec.names.repository.as_str(),
            location.as_str(),
        ]);
        Ok(match optional(self.cli.json(&inv))? {
            Some(out) => Lookup::Found(self.registry_descriptor(str_at(&out, "/name")?)),
            None => Lookup::NotFound,
        })
    }

    fn create_registry(&self) -> AdapterResult<ResourceDescriptor> {
        let location = format!("--location={}", self.spec.region);
        let inv = self.gcloud([
            "artifacts",
            "repositories",
            "create",
            self.spec.names.repository.as_str(),
            "--repository-format=docker",
            location.as_str(),
        ]);
        self.cli.run(&inv)?;
        let id = format!(
            "projects/{}/locations/{}/repositories/{}",
            self.project(),
            self.spec.region,
            self.spec.names.repository
        );
        Ok(self.registry_descriptor(&id))
    }

    fn describe_service(&self) -> AdapterResult<Option<Value>> {
        let region = self.region_flag();
        let inv = self.gcloud([
            "run",
            "services",
            "describe",
            self.spec.names.service.as_str(),
            region.as_str(),
        ]);
        optional(self.cli.json(&inv))
    }

    fn service_descriptor(&self, service: &Value) -> ResourceDescriptor {
        let id = service
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or(&self.spec.names.service);
        let descriptor = self.descriptor(ResourceKind::Service, id);
        match service.pointer("/status/url").and_then(Value::as_str) {
            Some(url) => descriptor.with_attribute("url", url),
            None => descriptor,
        }
    }

    fn deploy_invocation(&self, revision: &ResourceDescriptor) -> AdapterResult<Invocation> {
        let image = revision
            .attribute("image")
            .ok_or_else(|| AdapterError::fatal("revision has no image"))?;
        let suffix = revision.attribute("suffix").unwrap_or_default();
        let spec = &self.spec;

        let mut inv = Invocation::new("gcloud")
            .args(["run", "deploy", spec.names.service.as_str()])
            .arg(format!("--image={image}"))
            .arg(self.region_flag())
            .arg(format!("--project={}", self.project()))
            .arg("--platform=managed")
            .arg(format!("--cpu={}", spec.sizing.cpu))
            .arg(format!("--memory={}", spec.sizing.memory))
            .arg(format!("--port={}", spec.container_port))
            .arg(format!("--min-instances={}", spec.min_instances))
            .arg(format!("--max-instances={}", spec.max_instances))
            .arg(format!("--timeout={}", spec.timeout_seconds))
            .arg(format!("--revision-suffix={suffix}"));

        inv = if spec.allow_unauthenticated {
            inv.arg("--allow-unauthenticated")
        } else {
            inv.arg("--no-allow-unauthenticated")
        };

        if !spec.environment.is_empty() {
            // Custom delimiter so values may contain commas
            let pairs: Vec<String> = spec
                .environment
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            inv = inv.secret_arg(format!("--set-env-vars=^@^{}", pairs.join("@")));
        }

        Ok(inv.args(["--quiet", "--format=json"]))
    }
}

impl<R: CommandRunner> ResourceAdapter for GcpCloudRun<R> {
    fn backend(&self) -> Backend {
        Backend::GcpCloudRun
    }

    fn provisioning_steps(&self) -> Vec<ProvisioningStep> {
        vec![
            ProvisioningStep::new(ResourceKind::ServiceApis),
            ProvisioningStep::new(ResourceKind::Registry).after(ResourceKind::ServiceApis),
        ]
    }

    fn rollout_kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Service]
    }

    fn lookup(&self, kind: ResourceKind, _deps: &ResourceSet) -> AdapterResult<Lookup> {
        match kind {
            ResourceKind::ServiceApis => self.lookup_apis(),
            ResourceKind::Registry => self.lookup_registry(),
            ResourceKind::Service => Ok(match self.describe_service()? {
                Some(service) => Lookup::Found(self.service_descriptor(&service)),
                None => Lookup::NotFound,
            }),
            other => Err(unsupported(other)),
        }
    }

    fn create(&self, kind: ResourceKind, _deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        match kind {
            ResourceKind::ServiceApis => self.enable_apis(),
            ResourceKind::Registry => self.create_registry(),
            other => Err(unsupported(other)),
        }
    }

    fn remove(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()> {
        let region = self.region_flag();
        let location = format!("--location={}", self.spec.region);
        match descriptor.kind {
            ResourceKind::Service => self
                .cli
                .run(&self.gcloud([
                    "run",
                    "services",
                    "delete",
                    self.spec.names.service.as_str(),
                    region.as_str(),
                    "--quiet",
                ]))
                .map(|_| ()),
            ResourceKind::Registry => self
                .cli
                .run(&self.gcloud([
                    "artifacts",
                    "repositories",
                    "delete",
                    self.spec.names.repository.as_str(),
                    location.as_str(),
                    "--quiet",
                ]))
                .map(|_| ()),
            ResourceKind::ServiceApis => {
                tracing::info!(project = %self.project(), "platform APIs stay enabled for the project");
                Ok(())
            }
            other => Err(unsupported(other)),
        }
    }

    fn verify_credentials(&self) -> AdapterResult<()> {
        let accounts = self.cli.json(
            &Invocation::new("gcloud").args(["auth", "list", "--filter=status:ACTIVE", "--format=json"]),
        )?;
        if accounts.as_array().map_or(true, Vec::is_empty) {
            return Err(AdapterError::fatal(
                "gcloud has no active account; run 'gcloud auth login'",
            ));
        }
        self.cli
            .run(&self.gcloud(["projects", "describe", self.project()]))
            .map(|_| ())
    }

    fn image_reference(&self, resources: &ResourceSet, tag: &str) -> AdapterResult<ImageRef> {
        let repository = resources
            .attribute(ResourceKind::Registry, "uri")
            .map(str::to_string)
            .unwrap_or_else(|| self.repository_path());
        Ok(ImageRef::new(
            format!("{}/{}", repository, self.spec.service_name),
            tag,
        ))
    }

    fn authenticate_registry(&self, image: &ImageRef) -> AdapterResult<()> {
        let inv = Invocation::new("gcloud").args([
            "auth",
            "configure-docker",
            image.registry_host(),
            "--quiet",
        ]);
        self.cli.run(&inv).map(|_| ())
    }

    fn image_exists(&self, image: &ImageRef) -> AdapterResult<bool> {
        let reference = image.to_string();
        let inv = self.gcloud(["artifacts", "docker", "images", "describe", reference.as_str()]);
        Ok(optional(self.cli.run(&inv))?.is_some())
    }

    /// Cloud Run creates the revision during deploy; this only names it
    fn register_revision(
        &self,
        _resources: &ResourceSet,
        image: &ImageRef,
    ) -> AdapterResult<ResourceDescriptor> {
        let suffix = revision_suffix(&image.tag);
        Ok(self
            .descriptor(
                ResourceKind::Revision,
                format!("{}-{}", self.spec.names.service, suffix),
            )
            .with_attribute("image", image.to_string())
            .with_attribute("suffix", suffix))
    }

    fn apply_service(
        &self,
        _resources: &ResourceSet,
        revision: &ResourceDescriptor,
    ) -> AdapterResult<ResourceDescriptor> {
        let out = self.cli.json(&self.deploy_invocation(revision)?)?;
        Ok(self
            .service_descriptor(&out)
            .with_attribute("revision", revision.id.clone()))
    }

    fn service_stable(&self, service: &ResourceDescriptor) -> AdapterResult<bool> {
        let Some(out) = self.describe_service()? else {
            return Ok(false);
        };
        let ready = out
            .pointer("/status/conditions")
            .and_then(Value::as_array)
            .map_or(false, |conditions| {
                conditions.iter().any(|c| {
                    c.get("type").and_then(Value::as_str) == Some("Ready")
                        && c.get("status").and_then(Value::as_str) == Some("True")
                })
            });
        let latest_ready = out
            .pointer("/status/latestReadyRevisionName")
            .and_then(Value::as_str);
        let expected = service.attribute("revision").or_else(|| {
            out.pointer("/status/latestCreatedRevisionName")
                .and_then(Value::as_str)
        });
        Ok(ready && latest_ready.is_some() && latest_ready == expected)
    }

    fn service_url(&self, _resources: &ResourceSet) -> AdapterResult<Option<String>> {
        Ok(self.describe_service()?.and_then(|service| {
            service
                .pointer("/status/url")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    fn stream_logs(&self) -> AdapterResult<()> {
        let inv = Invocation::new("gcloud")
            .args(["beta", "run", "services", "logs", "read"])
            .arg(self.spec.names.service.as_str())
            .arg(format!("--project={}", self.project()))
            .arg(self.region_flag())
            .arg("--limit=50");
        self.cli.stream(&inv)
    }
}

fn unsupported(kind: ResourceKind) -> AdapterError {
    AdapterError::fatal(format!("{} is not managed on Cloud Run", kind))
}
