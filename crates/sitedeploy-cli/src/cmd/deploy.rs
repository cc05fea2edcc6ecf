use crate::output::print_json;
use crate::prompt::ConsoleCheckpoint;
use anyhow::Context;
use sitedeploy_core::{
    aws::AwsCli,
    clock::SystemClock,
    context::ExecutionContext,
    domain::{DeploymentTarget, DomainName},
    orchestrator::Orchestrator,
    probe::DigProbe,
    provisioner::ObjectStore,
};
use std::path::Path;

pub fn run(region: &str, domain: &str, path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let domain = DomainName::parse(domain)?;
    let target = DeploymentTarget::new(domain, path.map(Path::to_path_buf));
    if let Some(p) = &target.website_path {
        anyhow::ensure!(
            p.is_dir(),
            "website folder '{}' does not exist or is not a directory",
            p.display()
        );
    }

    let ctx = ExecutionContext::new(region);
    let aws = AwsCli::discover()?;
    let identity = aws
        .verify_credentials(&ctx)
        .context("credential check failed")?;
    // Progress goes to stderr; stdout is reserved for the final result so
    // `--json` output stays machine-parseable.
    eprintln!(
        "Deploying {} (account {}, {})",
        target.domain, identity.account, identity.arn
    );

    let clock = SystemClock;
    let orchestrator = Orchestrator::new(&aws, &clock);
    let probe = DigProbe::discover();

    let (nameservers, phase1) =
        orchestrator.run_phase1(&ctx, &target.domain, &probe, &ConsoleCheckpoint)?;

    eprintln!("Provisioning certificate, CDN, and storage. Certificate validation");
    eprintln!("waits on DNS propagation and can take 10-15 minutes per attempt.");
    let deployed = orchestrator.run_phase2(&ctx, &target.domain, &phase1)?;

    if let Some(p) = &target.website_path {
        eprintln!("Publishing {} to s3://{} ...", p.display(), deployed.bucket);
        aws.sync(&ctx, p, &deployed.bucket, true)
            .context("file publish failed")?;
        aws.invalidate(&ctx, &deployed.distribution_id, "/*")
            .context("cache invalidation failed")?;
        eprintln!("Published and requested cache invalidation for /*");
    } else {
        eprintln!("No website folder given; skipping publish. Rerun with a path to upload content.");
    }

    if json {
        print_json(&deployed)?;
    } else {
        println!();
        println!("Deployment complete");
        println!("  Website URL:     {}", deployed.website_url);
        println!("  Storage bucket:  {}", deployed.bucket);
        println!("  Distribution:    {}", deployed.distribution_id);
        println!(
            "  Nameservers:     {}",
            nameservers.iter().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
