//! AWS CLI-backed implementations of the collaborator traits.
//!
//! Everything shells out to the `aws` binary with `--output json` and parses
//! the response with serde. The binary is discovered once with `which`;
//! absence is a prerequisite failure with remediation text, reported before
//! any mutating call.

use crate::context::ExecutionContext;
use crate::domain::DomainName;
use crate::error::{DeployError, Result};
use crate::provisioner::{ObjectStore, Provisioner, StackDescription, StackRequest, ZoneAdmin};
use crate::stack::StackStatus;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// AwsCli
// ---------------------------------------------------------------------------

pub struct AwsCli {
    bin: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
}

impl AwsCli {
    pub fn discover() -> Result<Self> {
        let bin = which::which("aws").map_err(|_| DeployError::PrerequisiteMissing {
            tool: "aws".to_string(),
            remediation: "install the AWS CLI (https://aws.amazon.com/cli/) and configure \
                          credentials with 'aws configure'"
                .to_string(),
        })?;
        Ok(Self { bin })
    }

    /// Cheap read-only call proving the credentials work before anything
    /// mutating runs.
    pub fn verify_credentials(&self, ctx: &ExecutionContext) -> Result<CallerIdentity> {
        let mut cmd = self.command(ctx);
        cmd.args(["sts", "get-caller-identity"]);
        let out = run(cmd)?;
        if !out.success {
            return Err(DeployError::PrerequisiteMissing {
                tool: "aws credentials".to_string(),
                remediation: format!(
                    "configure credentials with 'aws configure' or the AWS_ACCESS_KEY_ID / \
                     AWS_SECRET_ACCESS_KEY environment variables ({})",
                    out.stderr_snippet()
                ),
            });
        }
        Ok(serde_json::from_str(&out.stdout)?)
    }

    fn command(&self, ctx: &ExecutionContext) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["--output", "json", "--region", &ctx.region]);
        cmd.stdin(Stdio::null());
        ctx.apply_credentials(&mut cmd);
        cmd
    }
}

struct CliOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl CliOutput {
    fn stderr_snippet(&self) -> String {
        let line = self.stderr.lines().find(|l| !l.trim().is_empty());
        line.unwrap_or("(no error output)").trim().to_string()
    }
}

fn run(mut cmd: Command) -> Result<CliOutput> {
    let output = cmd.output()?;
    Ok(CliOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn remote_failure(target: &str, out: &CliOutput) -> DeployError {
    DeployError::Provisioning {
        target: target.to_string(),
        reason: out.stderr_snippet(),
    }
}

/// Argv for the stack parameters. The CLI keeps only the last occurrence of
/// a repeated list flag, so `--parameters` must appear exactly once with
/// every pair following it as a separate value.
fn parameter_args(parameters: &BTreeMap<String, String>) -> Vec<String> {
    if parameters.is_empty() {
        return Vec::new();
    }
    let mut args = vec!["--parameters".to_string()];
    args.extend(
        parameters
            .iter()
            .map(|(key, value)| format!("ParameterKey={key},ParameterValue={value}")),
    );
    args
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    stacks: Vec<RawStack>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStack {
    stack_status: String,
    creation_time: Option<String>,
    #[serde(default)]
    outputs: Vec<RawOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOutput {
    output_key: String,
    output_value: String,
}

impl Provisioner for AwsCli {
    fn describe(&self, ctx: &ExecutionContext, name: &str) -> Result<Option<StackDescription>> {
        let mut cmd = self.command(ctx);
        cmd.args(["cloudformation", "describe-stacks", "--stack-name", name]);
        let out = run(cmd)?;

        if !out.success {
            // The CLI reports a missing stack as a validation error.
            if out.stderr.contains("does not exist") {
                return Ok(None);
            }
            return Err(remote_failure(name, &out));
        }

        let parsed: DescribeStacksResponse = serde_json::from_str(&out.stdout)?;
        let Some(raw) = parsed.stacks.into_iter().next() else {
            return Ok(None);
        };

        let status = StackStatus::from_provider(&raw.stack_status);
        if status == StackStatus::NotFound {
            return Ok(None);
        }
        Ok(Some(StackDescription {
            name: name.to_string(),
            status,
            raw_status: raw.stack_status,
            creation_time: raw.creation_time,
            outputs: raw
                .outputs
                .into_iter()
                .map(|o| (o.output_key, o.output_value))
                .collect(),
        }))
    }

    fn submit(&self, ctx: &ExecutionContext, request: &StackRequest) -> Result<()> {
        let attempt = |verb: &str| -> Result<CliOutput> {
            let mut cmd = self.command(ctx);
            cmd.args(["cloudformation", verb, "--stack-name", &request.name]);
            cmd.arg("--template-body").arg(&request.template_body);
            cmd.args(parameter_args(&request.parameters));
            if request.iam_capabilities {
                cmd.args(["--capabilities", "CAPABILITY_IAM"]);
            }
            run(cmd)
        };

        let created = attempt("create-stack")?;
        if created.success {
            return Ok(());
        }
        if !created.stderr.contains("AlreadyExistsException") {
            return Err(remote_failure(&request.name, &created));
        }

        let updated = attempt("update-stack")?;
        if updated.success || updated.stderr.contains("No updates are to be performed") {
            return Ok(());
        }
        Err(remote_failure(&request.name, &updated))
    }

    fn delete(&self, ctx: &ExecutionContext, name: &str) -> Result<()> {
        let mut cmd = self.command(ctx);
        cmd.args(["cloudformation", "delete-stack", "--stack-name", name]);
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(name, &out));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

impl ObjectStore for AwsCli {
    fn exists(&self, ctx: &ExecutionContext, bucket: &str) -> Result<bool> {
        let mut cmd = self.command(ctx);
        cmd.args(["s3api", "head-bucket", "--bucket", bucket]);
        let out = run(cmd)?;
        if out.success {
            return Ok(true);
        }
        if out.stderr.contains("404") || out.stderr.contains("Not Found") {
            return Ok(false);
        }
        Err(remote_failure(bucket, &out))
    }

    fn empty(&self, ctx: &ExecutionContext, bucket: &str) -> Result<bool> {
        if !self.exists(ctx, bucket)? {
            return Ok(false);
        }
        let mut cmd = self.command(ctx);
        cmd.args(["s3", "rm", &format!("s3://{bucket}"), "--recursive"]);
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(bucket, &out));
        }
        // The CLI prints one line per deleted object; silence means the
        // bucket was already empty.
        Ok(!out.stdout.trim().is_empty())
    }

    fn sync(
        &self,
        ctx: &ExecutionContext,
        local: &Path,
        bucket: &str,
        delete_extraneous: bool,
    ) -> Result<()> {
        let mut cmd = self.command(ctx);
        cmd.arg("s3").arg("sync").arg(local).arg(format!("s3://{bucket}"));
        if delete_extraneous {
            cmd.arg("--delete");
        }
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(bucket, &out));
        }
        Ok(())
    }

    fn invalidate(&self, ctx: &ExecutionContext, distribution_id: &str, glob: &str) -> Result<()> {
        let mut cmd = self.command(ctx);
        cmd.args([
            "cloudfront",
            "create-invalidation",
            "--distribution-id",
            distribution_id,
            "--paths",
            glob,
        ]);
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(distribution_id, &out));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ZoneAdmin
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListZonesResponse {
    hosted_zones: Vec<RawZone>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawZone {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListRecordSetsResponse {
    resource_record_sets: Vec<serde_json::Value>,
}

impl ZoneAdmin for AwsCli {
    fn find_zone(&self, ctx: &ExecutionContext, domain: &DomainName) -> Result<Option<String>> {
        let mut cmd = self.command(ctx);
        cmd.args([
            "route53",
            "list-hosted-zones-by-name",
            "--dns-name",
            domain.as_str(),
            "--max-items",
            "1",
        ]);
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(domain.as_str(), &out));
        }

        let parsed: ListZonesResponse = serde_json::from_str(&out.stdout)?;
        let wanted = format!("{domain}.");
        Ok(parsed
            .hosted_zones
            .into_iter()
            .find(|z| z.name == wanted)
            .map(|z| z.id.trim_start_matches("/hostedzone/").to_string()))
    }

    fn delete_extra_records(&self, ctx: &ExecutionContext, zone_id: &str) -> Result<usize> {
        let mut cmd = self.command(ctx);
        cmd.args([
            "route53",
            "list-resource-record-sets",
            "--hosted-zone-id",
            zone_id,
        ]);
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(zone_id, &out));
        }
        let parsed: ListRecordSetsResponse = serde_json::from_str(&out.stdout)?;

        // The apex is wherever the SOA lives; its NS/SOA pair is mandatory
        // and undeletable, everything else blocks zone deletion.
        let apex = parsed
            .resource_record_sets
            .iter()
            .find(|r| r["Type"] == "SOA")
            .and_then(|r| r["Name"].as_str())
            .map(str::to_string);

        let doomed: Vec<&serde_json::Value> = parsed
            .resource_record_sets
            .iter()
            .filter(|r| {
                let mandatory_apex = (r["Type"] == "NS" || r["Type"] == "SOA")
                    && apex.as_deref() == r["Name"].as_str();
                !mandatory_apex
            })
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }

        let batch = serde_json::json!({
            "Changes": doomed
                .iter()
                .map(|r| serde_json::json!({ "Action": "DELETE", "ResourceRecordSet": r }))
                .collect::<Vec<_>>(),
        });

        let mut cmd = self.command(ctx);
        cmd.args([
            "route53",
            "change-resource-record-sets",
            "--hosted-zone-id",
            zone_id,
        ]);
        cmd.arg("--change-batch").arg(batch.to_string());
        let out = run(cmd)?;
        if !out.success {
            return Err(remote_failure(zone_id, &out));
        }
        Ok(doomed.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
