use crate::output::{print_json, print_table};
use anyhow::Context;
use sitedeploy_core::{
    aws::AwsCli,
    context::ExecutionContext,
    domain::DomainName,
    provisioner::Provisioner,
    stack::{legacy_stack_name, stack_name, Phase},
};

pub fn run(region: &str, domain: &str, json: bool) -> anyhow::Result<()> {
    let domain = DomainName::parse(domain)?;
    let ctx = ExecutionContext::new(region);
    let aws = AwsCli::discover()?;
    aws.verify_credentials(&ctx)
        .context("credential check failed")?;

    let cert_ctx = ctx.for_certificate_operations();
    let lookups = [
        (stack_name(&domain, Phase::One), &ctx),
        (stack_name(&domain, Phase::Two), &cert_ctx),
        (legacy_stack_name(&domain), &cert_ctx),
    ];

    let mut found = Vec::new();
    for (name, op_ctx) in &lookups {
        if let Some(description) = aws.describe(op_ctx, name)? {
            found.push(description);
        }
    }

    if found.is_empty() {
        anyhow::bail!("no stacks found for {domain}");
    }

    if json {
        print_json(&found)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = found
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.raw_status.clone(),
                d.creation_time.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["STACK", "STATUS", "CREATED"], &rows);

    for description in &found {
        if description.outputs.is_empty() {
            continue;
        }
        println!();
        println!("{} outputs:", description.name);
        for (key, value) in &description.outputs {
            println!("  {key}: {value}");
        }
    }
    Ok(())
}
