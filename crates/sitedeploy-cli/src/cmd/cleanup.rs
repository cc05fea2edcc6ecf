use crate::output::print_json;
use crate::prompt;
use anyhow::Context;
use sitedeploy_core::{
    aws::AwsCli, clock::SystemClock, context::ExecutionContext, domain::DomainName,
    orchestrator::Orchestrator,
};

pub fn run(region: &str, domain: &str, confirm: Option<&str>, json: bool) -> anyhow::Result<()> {
    let domain = DomainName::parse(domain)?;

    if !prompt::confirm_teardown(&domain, confirm)? {
        println!("Cleanup cancelled");
        return Ok(());
    }

    let ctx = ExecutionContext::new(region);
    let aws = AwsCli::discover()?;
    aws.verify_credentials(&ctx)
        .context("credential check failed")?;

    let clock = SystemClock;
    let orchestrator = Orchestrator::new(&aws, &clock);
    let report = orchestrator.teardown(&ctx, &domain, &aws, &aws)?;

    if json {
        print_json(&report)?;
        return Ok(());
    }

    if report.removed.is_empty() {
        println!("Nothing left to remove for {domain}");
    }
    for item in &report.removed {
        println!("removed: {item}");
    }
    for item in &report.residue {
        eprintln!("warning: {item}");
    }
    if report.is_clean() {
        println!("Cleanup complete");
    } else {
        println!("Cleanup finished with residue; if it does not clear on its own, rerun cleanup later");
    }
    Ok(())
}
