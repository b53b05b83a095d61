//! AWS Fargate binding
//!
//! ECR repository, default VPC, IAM roles, ECS cluster, Application Load
//! Balancer (with its security groups, target group and listeners) and a
//! CloudWatch log group; deploy registers a task definition and creates or
//! updates the ECS service.

use serde_json::json;

use crate::domain::entities::{
    DeploymentSpec, ImageRef, Lookup, ProvisioningStep, ResourceDescriptor, ResourceSet,
};
use crate::domain::ports::{AdapterError, AdapterResult, CommandRunner, Invocation, ResourceAdapter};
use crate::domain::value_objects::{Backend, ErrorClass, ResourceKind};

use super::cli::{
    optional, sig, str_at, strings_at, ProviderCli, Signature, IMAGE_NOT_VISIBLE, TRANSIENT,
};

const EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

const SIGNATURES: &[Signature] = &[
    sig(&["cannotpullcontainer"], IMAGE_NOT_VISIBLE),
    sig(&["image", "not found"], IMAGE_NOT_VISIBLE),
    sig(&["image", "pull"], IMAGE_NOT_VISIBLE),
    sig(&["image", "manifest"], IMAGE_NOT_VISIBLE),
    sig(&["unable to locate credentials"], ErrorClass::Fatal),
    sig(&["expiredtoken"], ErrorClass::Fatal),
    sig(&["invalidclienttokenid"], ErrorClass::Fatal),
    sig(&["accessdenied"], ErrorClass::Fatal),
    sig(&["unauthorizedoperation"], ErrorClass::Fatal),
    sig(&["not authorized"], ErrorClass::Fatal),
    sig(&["requestlimitexceeded"], TRANSIENT),
    sig(&["limitexceeded"], ErrorClass::Fatal),
    sig(&["throttl"], TRANSIENT),
    sig(&["rate exceeded"], TRANSIENT),
    sig(&["nosuchentity"], ErrorClass::NotFound),
    sig(&["repositorynotfoundexception"], ErrorClass::NotFound),
    sig(&["imagenotfoundexception"], ErrorClass::NotFound),
    sig(&["clusternotfoundexception"], ErrorClass::NotFound),
    sig(&["servicenotfoundexception"], ErrorClass::NotFound),
    sig(&["servicenotactiveexception"], ErrorClass::NotFound),
    sig(&["loadbalancernotfound"], ErrorClass::NotFound),
    sig(&["targetgroupnotfound"], ErrorClass::NotFound),
    sig(&["resourcenotfoundexception"], ErrorClass::NotFound),
    sig(&["invalidgroup.notfound"], ErrorClass::NotFound),
    sig(&["unable to describe task definition"], ErrorClass::NotFound),
    sig(&["does not exist"], ErrorClass::NotFound),
    sig(&["dependencyviolation"], TRANSIENT),
    sig(&["resourceinuse"], TRANSIENT),
    sig(&["invalidparameter"], ErrorClass::Fatal),
    sig(&["validationerror"], ErrorClass::Fatal),
];

/// Pieces of the load balancer step that exist so far
#[derive(Debug, Default)]
struct LoadBalancerParts {
    alb_security_group: Option<String>,
    service_security_group: Option<String>,
    load_balancer: Option<(String, String)>,
    target_group: Option<String>,
    has_listener: bool,
}

pub struct AwsFargate<R: CommandRunner> {
    spec: DeploymentSpec,
    cli: ProviderCli<R>,
}

impl<R: CommandRunner> AwsFargate<R> {
    pub fn new(spec: DeploymentSpec, runner: R) -> Self {
        let cli = ProviderCli::new(runner, SIGNATURES).with_owned_names(spec.owned_names());
        Self { spec, cli }
    }

    fn aws(&self, service: &str, operation: &str) -> Invocation {
        Invocation::new("aws")
            .args([service, operation])
            .args(["--region", self.spec.region.as_str(), "--output", "json"])
    }

    fn descriptor(&self, kind: ResourceKind, id: impl Into<String>) -> ResourceDescriptor {
        ResourceDescriptor::new(kind, self.spec.resource_name(kind), id)
    }

    // Registry

    fn lookup_registry(&self) -> AdapterResult<Lookup> {
        let inv = self
            .aws("ecr", "describe-repositories")
            .args(["--repository-names", self.spec.names.repository.as_str()]);
        let Some(out) = optional(self.cli.json(&inv))? else {
            return Ok(Lookup::NotFound);
        };
        Ok(Lookup::Found(
            self.descriptor(ResourceKind::Registry, str_at(&out, "/repositories/0/repositoryArn")?)
                .with_attribute("uri", str_at(&out, "/repositories/0/repositoryUri")?),
        ))
    }

    fn create_registry(&self) -> AdapterResult<ResourceDescriptor> {
        let inv = self
            .aws("ecr", "create-repository")
            .args(["--repository-name", self.spec.names.repository.as_str()])
            .args(["--image-scanning-configuration", "scanOnPush=true"]);
        let out = self.cli.json(&inv)?;
        Ok(
            self.descriptor(ResourceKind::Registry, str_at(&out, "/repository/repositoryArn")?)
                .with_attribute("uri", str_at(&out, "/repository/repositoryUri")?),
        )
    }

    // Network

    fn default_vpc(&self) -> AdapterResult<Option<String>> {
        let inv = self
            .aws("ec2", "describe-vpcs")
            .args(["--filters", "Name=isDefault,Values=true"])
            .args(["--query", "Vpcs[].VpcId"]);
        Ok(strings_at(&self.cli.json(&inv)?, "").into_iter().next())
    }

    fn network_descriptor(&self, vpc_id: &str) -> AdapterResult<ResourceDescriptor> {
        let inv = self
            .aws("ec2", "describe-subnets")
            .arg("--filters")
            .arg(format!("Name=vpc-id,Values={vpc_id}"))
            .arg("Name=default-for-az,Values=true")
            .args(["--query", "Subnets[].SubnetId"]);
        let subnets = strings_at(&self.cli.json(&inv)?, "");
        if subnets.is_empty() {
            tracing::warn!(vpc = %vpc_id, "default VPC has no default subnets");
        }
        Ok(self
            .descriptor(ResourceKind::Network, vpc_id)
            .with_attribute("subnets", subnets.join(",")))
    }

    fn lookup_network(&self) -> AdapterResult<Lookup> {
        match self.default_vpc()? {
            Some(vpc_id) => Ok(Lookup::Found(self.network_descriptor(&vpc_id)?)),
            None => Ok(Lookup::NotFound),
        }
    }

    fn create_network(&self) -> AdapterResult<ResourceDescriptor> {
        let out = self.cli.json(&self.aws("ec2", "create-default-vpc"))?;
        let vpc_id = str_at(&out, "/Vpc/VpcId")?.to_string();
        tracing::info!(vpc = %vpc_id, "created default VPC");
        self.network_descriptor(&vpc_id)
    }

    // Identity

    fn role_arn(&self, role: &str) -> AdapterResult<Option<String>> {
        let inv = self.aws("iam", "get-role").args(["--role-name", role]);
        optional(self.cli.json(&inv))?
            .map(|out| str_at(&out, "/Role/Arn").map(str::to_string))
            .transpose()
    }

    fn identity_descriptor(&self, execution: String, task: String) -> ResourceDescriptor {
        self.descriptor(ResourceKind::Identity, execution.clone())
            .with_attribute("execution_role_arn", execution)
            .with_attribute("task_role_arn", task)
    }

    fn lookup_identity(&self) -> AdapterResult<Lookup> {
        let execution = self.role_arn(&self.spec.names.execution_role)?;
        let task = self.role_arn(&self.spec.names.task_role)?;
        match (execution, task) {
            // A role left without its policy by an interrupted setup is repaired by create
            (Some(execution), Some(task))
                if self.role_has_policy(&self.spec.names.execution_role, EXECUTION_POLICY_ARN)? =>
            {
                Ok(Lookup::Found(self.identity_descriptor(execution, task)))
            }
            _ => Ok(Lookup::NotFound),
        }
    }

    fn attached_policies(&self, role: &str) -> AdapterResult<Option<Vec<String>>> {
        let list = self
            .aws("iam", "list-attached-role-policies")
            .args(["--role-name", role])
            .args(["--query", "AttachedPolicies[].PolicyArn"]);
        Ok(optional(self.cli.json(&list))?.map(|out| strings_at(&out, "")))
    }

    fn role_has_policy(&self, role: &str, policy: &str) -> AdapterResult<bool> {
        Ok(self
            .attached_policies(role)?
            .is_some_and(|policies| policies.iter().any(|p| p == policy)))
    }

    /// Create the role if missing, then attach `policy` (attaching twice is a no-op)
    fn ensure_role(&self, role: &str, policy: Option<&str>) -> AdapterResult<String> {
        let arn = match self.role_arn(role)? {
            Some(arn) => arn,
            None => self.create_role(role)?,
        };
        if let Some(policy) = policy {
            let attach = self
                .aws("iam", "attach-role-policy")
                .args(["--role-name", role, "--policy-arn", policy]);
            self.cli.run(&attach)?;
        }
        Ok(arn)
    }

    fn create_role(&self, role: &str) -> AdapterResult<String> {
        let trust = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": "ecs-tasks.amazonaws.com" },
                "Action": "sts:AssumeRole"
            }]
        });
        let inv = self
            .aws("iam", "create-role")
            .args(["--role-name", role])
            .arg("--assume-role-policy-document")
            .arg(trust.to_string());
        let arn = str_at(&self.cli.json(&inv)?, "/Role/Arn")?.to_string();
        tracing::info!(role = %role, "created IAM role");
        Ok(arn)
    }

    fn create_identity(&self) -> AdapterResult<ResourceDescriptor> {
        let execution = self.ensure_role(&self.spec.names.execution_role, Some(EXECUTION_POLICY_ARN))?;
        let task = self.ensure_role(&self.spec.names.task_role, None)?;
        Ok(self.identity_descriptor(execution, task))
    }

    fn remove_role(&self, role: &str) -> AdapterResult<()> {
        let Some(policies) = self.attached_policies(role)? else {
            return Ok(());
        };
        for policy in policies {
            let detach = self
                .aws("iam", "detach-role-policy")
                .args(["--role-name", role, "--policy-arn", policy.as_str()]);
            self.cli.run(&detach)?;
        }
        optional(self.cli.run(&self.aws("iam", "delete-role").args(["--role-name", role])))?;
        Ok(())
    }

    // Compute cluster

    fn lookup_cluster(&self) -> AdapterResult<Lookup> {
        let inv = self
            .aws("ecs", "describe-clusters")
            .args(["--clusters", self.spec.names.cluster.as_str()]);
        let out = self.cli.json(&inv)?;
        match out.pointer("/clusters/0/status").and_then(|v| v.as_str()) {
            Some("ACTIVE") | Some("PROVISIONING") => Ok(Lookup::Found(self.descriptor(
                ResourceKind::ComputeCluster,
                str_at(&out, "/clusters/0/clusterArn")?,
            ))),
            _ => Ok(Lookup::NotFound),
        }
    }

    fn create_cluster(&self) -> AdapterResult<ResourceDescriptor> {
        let linked = self
            .aws("iam", "create-service-linked-role")
            .args(["--aws-service-name", "ecs.amazonaws.com"]);
        if let Err(err) = self.cli.run(&linked) {
            // Already present in most accounts
            tracing::debug!(error = %err, "ECS service-linked role not created");
        }

        let inv = self
            .aws("ecs", "create-cluster")
            .args(["--cluster-name", self.spec.names.cluster.as_str()])
            .args(["--capacity-providers", "FARGATE", "FARGATE_SPOT"]);
        let out = self.cli.json(&inv)?;
        Ok(self.descriptor(
            ResourceKind::ComputeCluster,
            str_at(&out, "/cluster/clusterArn")?,
        ))
    }

    // Load balancer

    fn security_group(&self, name: &str, vpc: Option<&str>) -> AdapterResult<Option<String>> {
        let mut inv = self
            .aws("ec2", "describe-security-groups")
            .arg("--filters")
            .arg(format!("Name=group-name,Values={name}"));
        if let Some(vpc) = vpc {
            inv = inv.arg(format!("Name=vpc-id,Values={vpc}"));
        }
        let inv = inv.args(["--query", "SecurityGroups[].GroupId"]);
        Ok(optional(self.cli.json(&inv))?
            .and_then(|out| strings_at(&out, "").into_iter().next()))
    }

    fn load_balancer_parts(&self, vpc: Option<&str>) -> AdapterResult<LoadBalancerParts> {
        let names = &self.spec.names;
        let mut parts = LoadBalancerParts {
            alb_security_group: self.security_group(&names.alb_security_group, vpc)?,
            service_security_group: self.security_group(&names.service_security_group, vpc)?,
            ..Default::default()
        };

        let lb = self
            .aws("elbv2", "describe-load-balancers")
            .args(["--names", names.load_balancer.as_str()]);
        if let Some(out) = optional(self.cli.json(&lb))? {
            let arn = str_at(&out, "/LoadBalancers/0/LoadBalancerArn")?.to_string();
            let dns = str_at(&out, "/LoadBalancers/0/DNSName")?.to_string();
            let listeners = self
                .aws("elbv2", "describe-listeners")
                .args(["--load-balancer-arn", arn.as_str()])
                .args(["--query", "Listeners[].ListenerArn"]);
            parts.has_listener = !strings_at(&self.cli.json(&listeners)?, "").is_empty();
            parts.load_balancer = Some((arn, dns));
        }

        let tg = self
            .aws("elbv2", "describe-target-groups")
            .args(["--names", names.target_group.as_str()]);
        if let Some(out) = optional(self.cli.json(&tg))? {
            parts.target_group = Some(str_at(&out, "/TargetGroups/0/TargetGroupArn")?.to_string());
        }

        Ok(parts)
    }

    fn load_balancer_descriptor(&self, parts: LoadBalancerParts) -> Option<ResourceDescriptor> {
        let (arn, dns) = parts.load_balancer?;
        if !parts.has_listener {
            return None;
        }
        Some(
            self.descriptor(ResourceKind::LoadBalancer, arn)
                .with_attribute("dns_name", dns)
                .with_attribute("target_group_arn", parts.target_group?)
                .with_attribute("alb_security_group", parts.alb_security_group?)
                .with_attribute("service_security_group", parts.service_security_group?),
        )
    }

    fn lookup_load_balancer(&self, deps: &ResourceSet) -> AdapterResult<Lookup> {
        let vpc = deps.get(ResourceKind::Network).map(|d| d.id.as_str());
        let parts = self.load_balancer_parts(vpc)?;
        Ok(match self.load_balancer_descriptor(parts) {
            Some(descriptor) => Lookup::Found(descriptor),
            None => Lookup::NotFound,
        })
    }

    fn create_security_group(&self, name: &str, vpc: &str, description: &str) -> AdapterResult<String> {
        let inv = self
            .aws("ec2", "create-security-group")
            .args(["--group-name", name, "--description", description, "--vpc-id", vpc]);
        Ok(str_at(&self.cli.json(&inv)?, "/GroupId")?.to_string())
    }

    /// Add an ingress rule; a rule that already exists counts as added
    fn allow_ingress(&self, group: &str, port: u16, source: Ingress<'_>) -> AdapterResult<()> {
        let port = port.to_string();
        let inv = self
            .aws("ec2", "authorize-security-group-ingress")
            .args(["--group-id", group, "--protocol", "tcp", "--port", port.as_str()]);
        let inv = match source {
            Ingress::Anywhere => inv.args(["--cidr", "0.0.0.0/0"]),
            Ingress::Group(source) => inv.args(["--source-group", source]),
        };
        match self.cli.run(&inv) {
            Ok(_) => Ok(()),
            Err(err) if err.message.to_lowercase().contains("invalidpermission.duplicate") => {
                tracing::debug!(group = %group, port = %port, "ingress rule already present");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn create_load_balancer(&self, deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        let network = deps
            .get(ResourceKind::Network)
            .ok_or_else(|| AdapterError::fatal("load balancer requires the network"))?;
        let vpc = network.id.as_str();
        let subnets: Vec<&str> = network
            .attribute("subnets")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .collect();
        if subnets.len() < 2 {
            return Err(AdapterError::fatal(format!(
                "an application load balancer needs subnets in two availability zones; VPC {} has {}",
                vpc,
                subnets.len()
            )));
        }

        let names = &self.spec.names;
        let mut parts = self.load_balancer_parts(Some(vpc))?;

        // Ingress is re-applied to existing groups so a half-finished earlier run is repaired
        let alb_sg = match parts.alb_security_group.take() {
            Some(id) => id,
            None => self.create_security_group(&names.alb_security_group, vpc, "Load balancer ingress")?,
        };
        self.allow_ingress(&alb_sg, 80, Ingress::Anywhere)?;
        if self.spec.https_listener() {
            self.allow_ingress(&alb_sg, 443, Ingress::Anywhere)?;
        }
        parts.alb_security_group = Some(alb_sg.clone());

        let service_sg = match parts.service_security_group.take() {
            Some(id) => id,
            None => self.create_security_group(
                &names.service_security_group,
                vpc,
                "Service traffic from the load balancer",
            )?,
        };
        self.allow_ingress(&service_sg, self.spec.container_port, Ingress::Group(&alb_sg))?;
        parts.service_security_group = Some(service_sg);

        if parts.load_balancer.is_none() {
            let inv = self
                .aws("elbv2", "create-load-balancer")
                .args(["--name", names.load_balancer.as_str()])
                .arg("--subnets")
                .args(subnets.iter().copied())
                .args(["--security-groups", alb_sg.as_str()])
                .args(["--scheme", "internet-facing", "--type", "application"]);
            let out = self.cli.json(&inv)?;
            parts.load_balancer = Some((
                str_at(&out, "/LoadBalancers/0/LoadBalancerArn")?.to_string(),
                str_at(&out, "/LoadBalancers/0/DNSName")?.to_string(),
            ));
        }

        let target_group = match parts.target_group.take() {
            Some(arn) => arn,
            None => {
                let port = self.spec.container_port.to_string();
                let interval = self.spec.health_check.interval_seconds.to_string();
                let inv = self
                    .aws("elbv2", "create-target-group")
                    .args(["--name", names.target_group.as_str()])
                    .args(["--protocol", "HTTP", "--port", port.as_str()])
                    .args(["--vpc-id", vpc, "--target-type", "ip"])
                    .args(["--health-check-path", self.spec.health_check.path.as_str()])
                    .args(["--health-check-interval-seconds", interval.as_str()]);
                str_at(&self.cli.json(&inv)?, "/TargetGroups/0/TargetGroupArn")?.to_string()
            }
        };
        parts.target_group = Some(target_group.clone());

        if !parts.has_listener {
            let lb_arn = parts
                .load_balancer
                .as_ref()
                .map(|(arn, _)| arn.clone())
                .unwrap_or_default();
            self.create_listeners(&lb_arn, &target_group)?;
            parts.has_listener = true;
        }

        self.load_balancer_descriptor(parts)
            .ok_or_else(|| AdapterError::transient("load balancer parts not visible yet"))
    }

    fn create_listeners(&self, lb_arn: &str, target_group: &str) -> AdapterResult<()> {
        let forward = format!("Type=forward,TargetGroupArn={target_group}");
        match &self.spec.certificate_arn {
            Some(certificate) if self.spec.enable_https => {
                let https = self
                    .aws("elbv2", "create-listener")
                    .args(["--load-balancer-arn", lb_arn, "--protocol", "HTTPS", "--port", "443"])
                    .arg("--certificates")
                    .arg(format!("CertificateArn={certificate}"))
                    .args(["--default-actions", forward.as_str()]);
                self.cli.run(&https)?;

                let redirect = self
                    .aws("elbv2", "create-listener")
                    .args(["--load-balancer-arn", lb_arn, "--protocol", "HTTP", "--port", "80"])
                    .args([
                        "--default-actions",
                        "Type=redirect,RedirectConfig={Protocol=HTTPS,Port=443,StatusCode=HTTP_301}",
                    ]);
                self.cli.run(&redirect)?;
            }
            _ => {
                if self.spec.enable_https {
                    tracing::warn!("enableHttps is set without certificateArn; creating an HTTP listener");
                }
                let http = self
                    .aws("elbv2", "create-listener")
                    .args(["--load-balancer-arn", lb_arn, "--protocol", "HTTP", "--port", "80"])
                    .args(["--default-actions", forward.as_str()]);
                self.cli.run(&http)?;
            }
        }
        Ok(())
    }

    fn remove_load_balancer(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()> {
        let mut failures: Vec<String> = Vec::new();
        let mut record = |result: AdapterResult<String>| {
            if let Err(err) = optional(result) {
                failures.push(err.to_string());
            }
        };

        record(self.cli.run(
            &self
                .aws("elbv2", "delete-load-balancer")
                .args(["--load-balancer-arn", descriptor.id.as_str()]),
        ));
        record(self.cli.run(
            &self
                .aws("elbv2", "wait")
                .args(["load-balancers-deleted", "--load-balancer-arns", descriptor.id.as_str()]),
        ));
        if let Some(tg) = descriptor.attribute("target_group_arn") {
            record(self.cli.run(
                &self
                    .aws("elbv2", "delete-target-group")
                    .args(["--target-group-arn", tg]),
            ));
        }
        // The service group references the load balancer group, so it goes first
        for key in ["service_security_group", "alb_security_group"] {
            if let Some(group) = descriptor.attribute(key) {
                record(self.cli.run(
                    &self
                        .aws("ec2", "delete-security-group")
                        .args(["--group-id", group]),
                ));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::transient(failures.join("; ")))
        }
    }

    // Log sink

    fn lookup_log_group(&self) -> AdapterResult<Lookup> {
        let name = self.spec.names.log_group.as_str();
        let inv = self
            .aws("logs", "describe-log-groups")
            .args(["--log-group-name-prefix", name]);
        let out = self.cli.json(&inv)?;
        let found = out
            .pointer("/logGroups")
            .and_then(|v| v.as_array())
            .and_then(|groups| {
                groups
                    .iter()
                    .find(|g| g.get("logGroupName").and_then(|n| n.as_str()) == Some(name))
            })
            .map(|g| {
                g.get("arn")
                    .and_then(|a| a.as_str())
                    .unwrap_or(name)
                    .to_string()
            });
        Ok(match found {
            Some(arn) => Lookup::Found(self.descriptor(ResourceKind::LogSink, arn)),
            None => Lookup::NotFound,
        })
    }

    fn create_log_group(&self) -> AdapterResult<ResourceDescriptor> {
        let name = self.spec.names.log_group.as_str();
        self.cli
            .run(&self.aws("logs", "create-log-group").args(["--log-group-name", name]))?;
        Ok(self.descriptor(ResourceKind::LogSink, name))
    }

    // Revision and service

    fn lookup_revision(&self) -> AdapterResult<Lookup> {
        let inv = self
            .aws("ecs", "describe-task-definition")
            .args(["--task-definition", self.spec.names.task_family.as_str()]);
        let Some(out) = optional(self.cli.json(&inv))? else {
            return Ok(Lookup::NotFound);
        };
        Ok(Lookup::Found(self.descriptor(
            ResourceKind::Revision,
            str_at(&out, "/taskDefinition/taskDefinitionArn")?,
        )))
    }

    fn lookup_service(&self) -> AdapterResult<Lookup> {
        let names = &self.spec.names;
        let inv = self
            .aws("ecs", "describe-services")
            .args(["--cluster", names.cluster.as_str()])
            .args(["--services", names.service.as_str()]);
        let Some(out) = optional(self.cli.json(&inv))? else {
            return Ok(Lookup::NotFound);
        };
        match out.pointer("/services/0/status").and_then(|v| v.as_str()) {
            Some(status) if status != "INACTIVE" => Ok(Lookup::Found(self.descriptor(
                ResourceKind::Service,
                str_at(&out, "/services/0/serviceArn")?,
            ))),
            _ => Ok(Lookup::NotFound),
        }
    }

    fn task_definition(&self, resources: &ResourceSet, image: &ImageRef) -> AdapterResult<String> {
        let identity = resources
            .get(ResourceKind::Identity)
            .ok_or_else(|| AdapterError::fatal("task definition requires the IAM roles"))?;
        let environment: Vec<_> = self
            .spec
            .environment
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();

        let definition = json!({
            "family": self.spec.names.task_family,
            "networkMode": "awsvpc",
            "requiresCompatibilities": ["FARGATE"],
            "cpu": self.spec.sizing.cpu,
            "memory": self.spec.sizing.memory,
            "executionRoleArn": identity.attribute("execution_role_arn").unwrap_or(&identity.id),
            "taskRoleArn": identity.attribute("task_role_arn").unwrap_or(&identity.id),
            "containerDefinitions": [{
                "name": self.spec.service_name,
                "image": image.to_string(),
                "essential": true,
                "portMappings": [{ "containerPort": self.spec.container_port, "protocol": "tcp" }],
                "environment": environment,
                "logConfiguration": {
                    "logDriver": "awslogs",
                    "options": {
                        "awslogs-group": self.spec.names.log_group,
                        "awslogs-region": self.spec.region,
                        "awslogs-stream-prefix": "ecs"
                    }
                }
            }]
        });
        Ok(definition.to_string())
    }

    fn remove_service(&self) -> AdapterResult<()> {
        let names = &self.spec.names;
        let scale = self
            .aws("ecs", "update-service")
            .args(["--cluster", names.cluster.as_str()])
            .args(["--service", names.service.as_str(), "--desired-count", "0"]);
        optional(self.cli.run(&scale))?;
        let delete = self
            .aws("ecs", "delete-service")
            .args(["--cluster", names.cluster.as_str()])
            .args(["--service", names.service.as_str(), "--force"]);
        self.cli.run(&delete).map(|_| ())
    }

    fn remove_revisions(&self) -> AdapterResult<()> {
        let list = self
            .aws("ecs", "list-task-definitions")
            .args(["--family-prefix", self.spec.names.task_family.as_str()])
            .args(["--status", "ACTIVE"]);
        let arns = strings_at(&self.cli.json(&list)?, "/taskDefinitionArns");
        for arn in arns {
            let inv = self
                .aws("ecs", "deregister-task-definition")
                .args(["--task-definition", arn.as_str()]);
            optional(self.cli.run(&inv))?;
        }
        Ok(())
    }
}

enum Ingress<'a> {
    Anywhere,
    Group(&'a str),
}

impl<R: CommandRunner> ResourceAdapter for AwsFargate<R> {
    fn backend(&self) -> Backend {
        Backend::AwsFargate
    }

    fn provisioning_steps(&self) -> Vec<ProvisioningStep> {
        use ResourceKind::*;
        vec![
            ProvisioningStep::new(Registry),
            ProvisioningStep::new(Network),
            ProvisioningStep::new(Identity),
            ProvisioningStep::new(ComputeCluster).after(Identity),
            ProvisioningStep::new(LoadBalancer).after(Network),
            ProvisioningStep::new(LogSink),
        ]
    }

    fn rollout_kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Revision, ResourceKind::Service]
    }

    fn lookup(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<Lookup> {
        match kind {
            ResourceKind::Registry => self.lookup_registry(),
            ResourceKind::Network => self.lookup_network(),
            ResourceKind::Identity => self.lookup_identity(),
            ResourceKind::ComputeCluster => self.lookup_cluster(),
            ResourceKind::LoadBalancer => self.lookup_load_balancer(deps),
            ResourceKind::LogSink => self.lookup_log_group(),
            ResourceKind::Revision => self.lookup_revision(),
            ResourceKind::Service => self.lookup_service(),
            other => Err(unsupported(other)),
        }
    }

    fn create(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        match kind {
            ResourceKind::Registry => self.create_registry(),
            ResourceKind::Network => self.create_network(),
            ResourceKind::Identity => self.create_identity(),
            ResourceKind::ComputeCluster => self.create_cluster(),
            ResourceKind::LoadBalancer => self.create_load_balancer(deps),
            ResourceKind::LogSink => self.create_log_group(),
            other => Err(unsupported(other)),
        }
    }

    fn remove(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()> {
        let names = &self.spec.names;
        match descriptor.kind {
            ResourceKind::Service => self.remove_service(),
            ResourceKind::Revision => self.remove_revisions(),
            ResourceKind::LogSink => self
                .cli
                .run(
                    &self
                        .aws("logs", "delete-log-group")
                        .args(["--log-group-name", names.log_group.as_str()]),
                )
                .map(|_| ()),
            ResourceKind::LoadBalancer => self.remove_load_balancer(descriptor),
            ResourceKind::ComputeCluster => self
                .cli
                .run(
                    &self
                        .aws("ecs", "delete-cluster")
                        .args(["--cluster", names.cluster.as_str()]),
                )
                .map(|_| ()),
            ResourceKind::Identity => {
                self.remove_role(&names.execution_role)?;
                self.remove_role(&names.task_role)
            }
            ResourceKind::Network => {
                tracing::info!(vpc = %descriptor.id, "default VPC is shared; leaving it in place");
                Ok(())
            }
            ResourceKind::Registry => self
                .cli
                .run(
                    &self
                        .aws("ecr", "delete-repository")
                        .args(["--repository-name", names.repository.as_str(), "--force"]),
                )
                .map(|_| ()),
            other => Err(unsupported(other)),
        }
    }

    fn is_drained(&self, _descriptor: &ResourceDescriptor) -> AdapterResult<bool> {
        let inv = self
            .aws("ecs", "list-tasks")
            .args(["--cluster", self.spec.names.cluster.as_str()]);
        Ok(strings_at(&self.cli.json(&inv)?, "/taskArns").is_empty())
    }

    fn verify_credentials(&self) -> AdapterResult<()> {
        let out = self.cli.json(&self.aws("sts", "get-caller-identity"))?;
        tracing::debug!(account = %str_at(&out, "/Account")?, "AWS credentials verified");
        Ok(())
    }

    fn image_reference(&self, resources: &ResourceSet, tag: &str) -> AdapterResult<ImageRef> {
        let uri = resources
            .attribute(ResourceKind::Registry, "uri")
            .ok_or_else(|| AdapterError::fatal("ECR repository URI unknown"))?;
        Ok(ImageRef::new(uri, tag))
    }

    fn authenticate_registry(&self, image: &ImageRef) -> AdapterResult<()> {
        let password = self.cli.run(&self.aws("ecr", "get-login-password"))?;
        let login = Invocation::new("docker")
            .args(["login", "--username", "AWS", "--password-stdin", image.registry_host()])
            .stdin(password.trim());
        self.cli.run(&login).map(|_| ())
    }

    fn image_exists(&self, image: &ImageRef) -> AdapterResult<bool> {
        let tag = format!("imageTag={}", image.tag);
        let inv = self
            .aws("ecr", "describe-images")
            .args(["--repository-name", self.spec.names.repository.as_str()])
            .args(["--image-ids", tag.as_str()]);
        Ok(optional(self.cli.run(&inv))?.is_some())
    }

    fn register_revision(
        &self,
        resources: &ResourceSet,
        image: &ImageRef,
    ) -> AdapterResult<ResourceDescriptor> {
        let inv = self
            .aws("ecs", "register-task-definition")
            .arg("--cli-input-json")
            .secret_arg(self.task_definition(resources, image)?);
        let out = self.cli.json(&inv)?;
        Ok(self.descriptor(
            ResourceKind::Revision,
            str_at(&out, "/taskDefinition/taskDefinitionArn")?,
        ))
    }

    fn apply_service(
        &self,
        resources: &ResourceSet,
        revision: &ResourceDescriptor,
    ) -> AdapterResult<ResourceDescriptor> {
        let names = &self.spec.names;
        let desired = self.spec.desired_count.to_string();

        let inv = match self.lookup_service()? {
            Lookup::Found(_) => self
                .aws("ecs", "update-service")
                .args(["--cluster", names.cluster.as_str()])
                .args(["--service", names.service.as_str()])
                .args(["--task-definition", revision.id.as_str()])
                .args(["--desired-count", desired.as_str(), "--force-new-deployment"]),
            Lookup::NotFound => {
                let subnets = resources
                    .attribute(ResourceKind::Network, "subnets")
                    .unwrap_or_default();
                let lb = resources
                    .get(ResourceKind::LoadBalancer)
                    .ok_or_else(|| AdapterError::fatal("service requires the load balancer"))?;
                let security_group = lb.attribute("service_security_group").unwrap_or_default();
                let target_group = lb.attribute("target_group_arn").unwrap_or_default();

                self.aws("ecs", "create-service")
                    .args(["--cluster", names.cluster.as_str()])
                    .args(["--service-name", names.service.as_str()])
                    .args(["--task-definition", revision.id.as_str()])
                    .args(["--desired-count", desired.as_str(), "--launch-type", "FARGATE"])
                    .arg("--network-configuration")
                    .arg(format!(
                        "awsvpcConfiguration={{subnets=[{subnets}],securityGroups=[{security_group}],assignPublicIp=ENABLED}}"
                    ))
                    .arg("--load-balancers")
                    .arg(format!(
                        "targetGroupArn={target_group},containerName={},containerPort={}",
                        self.spec.service_name, self.spec.container_port
                    ))
            }
        };

        let out = self.cli.json(&inv)?;
        Ok(self.descriptor(ResourceKind::Service, str_at(&out, "/service/serviceArn")?))
    }

    fn service_stable(&self, _service: &ResourceDescriptor) -> AdapterResult<bool> {
        let names = &self.spec.names;
        let inv = self
            .aws("ecs", "describe-services")
            .args(["--cluster", names.cluster.as_str()])
            .args(["--services", names.service.as_str()]);
        let out = self.cli.json(&inv)?;
        let deployments = out
            .pointer("/services/0/deployments")
            .and_then(|v| v.as_array())
            .map(Vec::len)
            .unwrap_or(0);
        let running = out.pointer("/services/0/runningCount").and_then(|v| v.as_u64());
        let desired = out.pointer("/services/0/desiredCount").and_then(|v| v.as_u64());
        Ok(deployments == 1 && running.is_some() && running == desired)
    }

    fn service_url(&self, resources: &ResourceSet) -> AdapterResult<Option<String>> {
        let scheme = if self.spec.https_listener() { "https" } else { "http" };
        Ok(resources
            .attribute(ResourceKind::LoadBalancer, "dns_name")
            .map(|dns| format!("{scheme}://{dns}")))
    }

    fn stream_logs(&self) -> AdapterResult<()> {
        let inv = Invocation::new("aws")
            .args(["logs", "tail", self.spec.names.log_group.as_str()])
            .args(["--since", "1h", "--format", "short"])
            .args(["--region", self.spec.region.as_str()]);
        self.cli.stream(&inv)
    }
}

fn unsupported(kind: ResourceKind) -> AdapterError {
    AdapterError::fatal(format!("{} is not managed on AWS Fargate", kind))
}
