//! Test fixtures - reusable configuration files.

/// Minimal valid AWS Fargate configuration
pub const AWS_CONFIG: &str = r#"serviceName: shop
region: us-east-1
containerPort: 3000
"#;

/// Cloud Run configuration missing its project id
pub const GCP_CONFIG_WITHOUT_PROJECT: &str = r#"serviceName: shop
region: europe-west1
"#;

/// Valid Cloud Run configuration
pub const GCP_CONFIG: &str = r#"serviceName: shop
region: europe-west1
projectId: acme-prod
"#;

/// YAML that does not parse
pub const BROKEN_CONFIG: &str = "serviceName: [shop\nregion: us-east-1\n";
