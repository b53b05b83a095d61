//! Azure Container Apps binding
//!
//! Resource group, container registry, Log Analytics workspace and a
//! Container Apps environment; deploy creates or updates the container app
//! with a new revision suffix.

use serde_json::Value;

use crate::domain::entities::{
    DeploymentSpec, ImageRef, Lookup, ProvisioningStep, ResourceDescriptor, ResourceSet,
};
use crate::domain::ports::{AdapterError, AdapterResult, CommandRunner, Invocation, ResourceAdapter};
use crate::domain::value_objects::{Backend, ErrorClass, ResourceKind};

use super::cli::{
    optional, revision_suffix, sig, str_at, ProviderCli, Signature, IMAGE_NOT_VISIBLE, TRANSIENT,
};

const SIGNATURES: &[Signature] = &[
    sig(&["image", "not found"], IMAGE_NOT_VISIBLE),
    sig(&["manifest", "unknown"], IMAGE_NOT_VISIBLE),
    sig(&["image", "pull"], IMAGE_NOT_VISIBLE),
    sig(&["az login"], ErrorClass::Fatal),
    sig(&["authorizationfailed"], ErrorClass::Fatal),
    sig(&["subscriptionnotfound"], ErrorClass::Fatal),
    sig(&["quotaexceeded"], ErrorClass::Fatal),
    sig(&["invalidparameter"], ErrorClass::Fatal),
    sig(&["resourcegroupnotfound"], ErrorClass::NotFound),
    sig(&["resourcenotfound"], ErrorClass::NotFound),
    sig(&["could not be found"], ErrorClass::NotFound),
    sig(&["was not found"], ErrorClass::NotFound),
    sig(&["not found"], ErrorClass::NotFound),
    sig(&["does not exist"], ErrorClass::NotFound),
    sig(&["toomanyrequests"], TRANSIENT),
    sig(&["anotheroperationinprogress"], TRANSIENT),
];

/// Tag marking a resource group spinx created and may delete
const MANAGER: &str = "spinx";
const MANAGED_TAG: &str = "managed-by=spinx";
const GROUP_ATTRIBUTES: &[(&str, &str)] = &[("managed_by", "/tags/managed-by")];

pub struct AzureContainerApps<R: CommandRunner> {
    spec: DeploymentSpec,
    cli: ProviderCli<R>,
}

impl<R: CommandRunner> AzureContainerApps<R> {
    pub fn new(spec: DeploymentSpec, runner: R) -> Self {
        let cli = ProviderCli::new(runner, SIGNATURES).with_owned_names(spec.owned_names());
        Self { spec, cli }
    }

    fn az<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        Invocation::new("az").args(args).args(["--output", "json"])
    }

    /// `az` call scoped to the deployment's resource group
    fn az_in_group<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        self.az(args)
            .args(["--resource-group", self.spec.names.resource_group.as_str()])
    }

    fn descriptor(&self, kind: ResourceKind, id: impl Into<String>) -> ResourceDescriptor {
        ResourceDescriptor::new(kind, self.spec.resource_name(kind), id)
    }

    /// `show`-style lookup: the resource's `id`, or `NotFound`
    fn show(&self, kind: ResourceKind, inv: Invocation) -> AdapterResult<Option<(ResourceDescriptor, Value)>> {
        match optional(self.cli.json(&inv))? {
            Some(out) => Ok(Some((self.descriptor(kind, str_at(&out, "/id")?), out))),
            None => Ok(None),
        }
    }

    fn found(
        &self,
        kind: ResourceKind,
        inv: Invocation,
        attributes: &[(&str, &str)],
    ) -> AdapterResult<Lookup> {
        Ok(match self.show(kind, inv)? {
            Some((mut descriptor, out)) => {
                for (key, pointer) in attributes {
                    if let Some(value) = out.pointer(pointer).and_then(Value::as_str) {
                        descriptor = descriptor.with_attribute(*key, value);
                    }
                }
                Lookup::Found(descriptor)
            }
            None => Lookup::NotFound,
        })
    }

    fn created(
        &self,
        kind: ResourceKind,
        inv: Invocation,
        attributes: &[(&str, &str)],
    ) -> AdapterResult<ResourceDescriptor> {
        let out = self.cli.json(&inv)?;
        let mut descriptor = self.descriptor(kind, str_at(&out, "/id")?);
        for (key, pointer) in attributes {
            if let Some(value) = out.pointer(pointer).and_then(Value::as_str) {
                descriptor = descriptor.with_attribute(*key, value);
            }
        }
        Ok(descriptor)
    }

    fn registry_show(&self) -> Invocation {
        self.az_in_group(["acr", "show", "--name", self.spec.names.registry.as_str()])
    }

    fn workspace_show(&self) -> Invocation {
        self.az_in_group([
            "monitor",
            "log-analytics",
            "workspace",
            "show",
            "--workspace-name",
            self.spec.names.log_workspace.as_str(),
        ])
    }

    fn environment_show(&self) -> Invocation {
        self.az_in_group([
            "containerapp",
            "env",
            "show",
            "--name",
            self.spec.names.environment.as_str(),
        ])
    }

    fn app_show(&self) -> Invocation {
        self.az_in_group(["containerapp", "show", "--name", self.spec.names.service.as_str()])
    }

    fn create_environment(&self, deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        let customer_id = deps
            .attribute(ResourceKind::LogSink, "customer_id")
            .ok_or_else(|| AdapterError::fatal("environment requires the Log Analytics workspace"))?;
        let keys = self.cli.json(&self.az_in_group([
            "monitor",
            "log-analytics",
            "workspace",
            "get-shared-keys",
            "--workspace-name",
            self.spec.names.log_workspace.as_str(),
        ]))?;
        let key = str_at(&keys, "/primarySharedKey")?;

        let inv = self
            .az_in_group([
                "containerapp",
                "env",
                "create",
                "--name",
                self.spec.names.environment.as_str(),
                "--location",
                self.spec.region.as_str(),
                "--logs-workspace-id",
                customer_id,
            ])
            .arg("--logs-workspace-key")
            .secret_arg(key);
        self.created(ResourceKind::ComputeCluster, inv, &[])
    }

    fn env_pairs(&self) -> Vec<String> {
        self.spec
            .environment
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }

    fn create_app(&self, resources: &ResourceSet, image: &str, suffix: &str) -> AdapterResult<Invocation> {
        let environment = resources
            .get(ResourceKind::ComputeCluster)
            .ok_or_else(|| AdapterError::fatal("container app requires the environment"))?;
        let login_server = resources
            .attribute(ResourceKind::Registry, "login_server")
            .ok_or_else(|| AdapterError::fatal("container registry login server unknown"))?;
        let spec = &self.spec;
        let port = spec.container_port.to_string();
        let ingress = if spec.allow_unauthenticated { "external" } else { "internal" };

        let mut inv = self
            .az_in_group([
                "containerapp",
                "create",
                "--name",
                spec.names.service.as_str(),
                "--environment",
                environment.id.as_str(),
                "--image",
                image,
                "--registry-server",
                login_server,
                "--target-port",
                port.as_str(),
                "--ingress",
                ingress,
            ])
            .args(self.scaling_args())
            .args(["--revision-suffix", suffix]);
        let pairs = self.env_pairs();
        if !pairs.is_empty() {
            inv = inv.arg("--env-vars");
            for pair in pairs {
                inv = inv.secret_arg(pair);
            }
        }
        Ok(inv)
    }

    fn update_app(&self, image: &str, suffix: &str) -> Invocation {
        let mut inv = self
            .az_in_group([
                "containerapp",
                "update",
                "--name",
                self.spec.names.service.as_str(),
                "--image",
                image,
            ])
            .args(self.scaling_args())
            .args(["--revision-suffix", suffix]);
        let pairs = self.env_pairs();
        if !pairs.is_empty() {
            inv = inv.arg("--set-env-vars");
            for pair in pairs {
                inv = inv.secret_arg(pair);
            }
        }
        inv
    }

    fn scaling_args(&self) -> Vec<String> {
        let spec = &self.spec;
        vec![
            "--cpu".to_string(),
            spec.sizing.cpu.clone(),
            "--memory".to_string(),
            spec.sizing.memory.clone(),
            "--min-replicas".to_string(),
            spec.min_instances.to_string(),
            "--max-replicas".to_string(),
            spec.max_instances.to_string(),
        ]
    }

    fn delete(&self, args: &[&str]) -> AdapterResult<()> {
        let inv = self.az_in_group(args.iter().copied()).arg("--yes");
        self.cli.run(&inv).map(|_| ())
    }
}

impl<R: CommandRunner> ResourceAdapter for AzureContainerApps<R> {
    fn backend(&self) -> Backend {
        Backend::AzureContainerApps
    }

    fn provisioning_steps(&self) -> Vec<ProvisioningStep> {
        use ResourceKind::*;
        vec![
            ProvisioningStep::new(ResourceGroup),
            ProvisioningStep::new(Registry).after(ResourceGroup),
            ProvisioningStep::new(LogSink).after(ResourceGroup),
            ProvisioningStep::new(ComputeCluster)
                .after(ResourceGroup)
                .after(LogSink),
        ]
    }

    fn rollout_kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Service]
    }

    fn lookup(&self, kind: ResourceKind, _deps: &ResourceSet) -> AdapterResult<Lookup> {
        let names = &self.spec.names;
        match kind {
            ResourceKind::ResourceGroup => self.found(
                kind,
                self.az(["group", "show", "--name", names.resource_group.as_str()]),
                GROUP_ATTRIBUTES,
            ),
            ResourceKind::Registry => {
                self.found(kind, self.registry_show(), &[("login_server", "/loginServer")])
            }
            ResourceKind::LogSink => {
                self.found(kind, self.workspace_show(), &[("customer_id", "/customerId")])
            }
            ResourceKind::ComputeCluster => self.found(kind, self.environment_show(), &[]),
            ResourceKind::Service => self.found(
                kind,
                self.app_show(),
                &[("fqdn", "/properties/configuration/ingress/fqdn")],
            ),
            other => Err(unsupported(other)),
        }
    }

    fn create(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        let names = &self.spec.names;
        let location = self.spec.region.as_str();
        match kind {
            ResourceKind::ResourceGroup => self.created(
                kind,
                self.az([
                    "group",
                    "create",
                    "--name",
                    names.resource_group.as_str(),
                    "--location",
                    location,
                    "--tags",
                    MANAGED_TAG,
                ]),
                GROUP_ATTRIBUTES,
            ),
            ResourceKind::Registry => self.created(
                kind,
                self.az_in_group([
                    "acr",
                    "create",
                    "--name",
                    names.registry.as_str(),
                    "--sku",
                    "Basic",
                    "--admin-enabled",
                    "true",
                    "--location",
                    location,
                ]),
                &[("login_server", "/loginServer")],
            ),
            ResourceKind::LogSink => self.created(
                kind,
                self.az_in_group([
                    "monitor",
                    "log-analytics",
                    "workspace",
                    "create",
                    "--workspace-name",
                    names.log_workspace.as_str(),
                    "--location",
                    location,
                ]),
                &[("customer_id", "/customerId")],
            ),
            ResourceKind::ComputeCluster => self.create_environment(deps),
            other => Err(unsupported(other)),
        }
    }

    fn remove(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()> {
        let names = &self.spec.names;
        match descriptor.kind {
            ResourceKind::Service => {
                self.delete(&["containerapp", "delete", "--name", names.service.as_str()])
            }
            ResourceKind::ComputeCluster => {
                self.delete(&["containerapp", "env", "delete", "--name", names.environment.as_str()])
            }
            ResourceKind::LogSink => self.delete(&[
                "monitor",
                "log-analytics",
                "workspace",
                "delete",
                "--workspace-name",
                names.log_workspace.as_str(),
                "--force",
                "true",
            ]),
            ResourceKind::Registry => {
                self.delete(&["acr", "delete", "--name", names.registry.as_str()])
            }
            ResourceKind::ResourceGroup if descriptor.attribute("managed_by") == Some(MANAGER) => {
                let inv = self
                    .az(["group", "delete", "--name", names.resource_group.as_str()])
                    .arg("--yes");
                self.cli.run(&inv).map(|_| ())
            }
            ResourceKind::ResourceGroup => {
                tracing::info!(
                    group = %names.resource_group,
                    "resource group was not created by spinx; leaving it in place"
                );
                Ok(())
            }
            other => Err(unsupported(other)),
        }
    }

    fn verify_credentials(&self) -> AdapterResult<()> {
        let account = self.cli.json(&self.az(["account", "show"]))?;
        tracing::debug!(subscription = %str_at(&account, "/id")?, "Azure credentials verified");
        Ok(())
    }

    fn image_reference(&self, resources: &ResourceSet, tag: &str) -> AdapterResult<ImageRef> {
        let login_server = resources
            .attribute(ResourceKind::Registry, "login_server")
            .ok_or_else(|| AdapterError::fatal("container registry login server unknown"))?;
        Ok(ImageRef::new(
            format!("{}/{}", login_server, self.spec.service_name),
            tag,
        ))
    }

    fn authenticate_registry(&self, _image: &ImageRef) -> AdapterResult<()> {
        let inv = Invocation::new("az").args(["acr", "login", "--name", self.spec.names.registry.as_str()]);
        self.cli.run(&inv).map(|_| ())
    }

    fn image_exists(&self, image: &ImageRef) -> AdapterResult<bool> {
        let reference = format!("{}:{}", self.spec.service_name, image.tag);
        let inv = self.az([
            "acr",
            "repository",
            "show",
            "--name",
            self.spec.names.registry.as_str(),
            "--image",
            reference.as_str(),
        ]);
        Ok(optional(self.cli.run(&inv))?.is_some())
    }

    /// Container Apps creates the revision during apply; this only names it
    fn register_revision(
        &self,
        _resources: &ResourceSet,
        image: &ImageRef,
    ) -> AdapterResult<ResourceDescriptor> {
        let suffix = revision_suffix(&image.tag);
        Ok(self
            .descriptor(
                ResourceKind::Revision,
                format!("{}--{}", self.spec.names.service, suffix),
            )
            .with_attribute("image", image.to_string())
            .with_attribute("suffix", suffix))
    }

    fn apply_service(
        &self,
        resources: &ResourceSet,
        revision: &ResourceDescriptor,
    ) -> AdapterResult<ResourceDescriptor> {
        let image = revision
            .attribute("image")
            .ok_or_else(|| AdapterError::fatal("revision has no image"))?;
        let suffix = revision.attribute("suffix").unwrap_or_default();

        let inv = match self.show(ResourceKind::Service, self.app_show())? {
            Some(_) => self.update_app(image, suffix),
            None => self.create_app(resources, image, suffix)?,
        };
        let service = self.created(
            ResourceKind::Service,
            inv,
            &[("fqdn", "/properties/configuration/ingress/fqdn")],
        )?;
        Ok(service.with_attribute("revision", revision.id.clone()))
    }

    fn service_stable(&self, service: &ResourceDescriptor) -> AdapterResult<bool> {
        let Some((_, out)) = self.show(ResourceKind::Service, self.app_show())? else {
            return Ok(false);
        };
        let provisioned =
            out.pointer("/properties/provisioningState").and_then(Value::as_str) == Some("Succeeded");
        let latest_ready = out
            .pointer("/properties/latestReadyRevisionName")
            .and_then(Value::as_str);
        let expected = service.attribute("revision").or_else(|| {
            out.pointer("/properties/latestRevisionName")
                .and_then(Value::as_str)
        });
        Ok(provisioned && latest_ready.is_some() && latest_ready == expected)
    }

    fn service_url(&self, _resources: &ResourceSet) -> AdapterResult<Option<String>> {
        let Some((_, out)) = self.show(ResourceKind::Service, self.app_show())? else {
            return Ok(None);
        };
        Ok(out
            .pointer("/properties/configuration/ingress/fqdn")
            .and_then(Value::as_str)
            .map(|fqdn| format!("https://{fqdn}")))
    }

    fn stream_logs(&self) -> AdapterResult<()> {
        let inv = Invocation::new("az")
            .args(["containerapp", "logs", "show"])
            .args(["--name", self.spec.names.service.as_str()])
            .args(["--resource-group", self.spec.names.resource_group.as_str()])
            .args(["--tail", "50"]);
        self.cli.stream(&inv)
    }
}

fn unsupported(kind: ResourceKind) -> AdapterError {
    AdapterError::fatal(format!("{} is not managed on Azure Container Apps", kind))
}
