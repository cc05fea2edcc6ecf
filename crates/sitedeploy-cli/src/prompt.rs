//! Operator interaction: the delegation checkpoint and the teardown
//! confirmation. Both are deliberately blocking and synchronous.

use sitedeploy_core::domain::DomainName;
use sitedeploy_core::orchestrator::{Checkpoint, NameServerSet};
use std::io::{self, BufRead, Write};

/// Blocks, with no timeout, until the operator confirms the registrar has
/// been pointed at the delegation nameservers. The system has no way to
/// observe registrar state; it can only ask.
pub struct ConsoleCheckpoint;

impl Checkpoint for ConsoleCheckpoint {
    fn acknowledge_delegation(
        &self,
        domain: &DomainName,
        nameservers: &NameServerSet,
    ) -> io::Result<()> {
        println!();
        println!("Delegation nameservers for {domain}:");
        for (i, server) in nameservers.iter().enumerate() {
            println!("  {}. {server}", i + 1);
        }
        // Duplicated to stderr so the listing survives output-capturing
        // wrappers.
        eprintln!(
            "nameservers for {domain}: {}",
            nameservers.iter().collect::<Vec<_>>().join(", ")
        );
        println!();
        println!("Set these as the nameservers for {domain} at your domain registrar.");
        println!("Propagation can take up to 24-48 hours, but is usually much faster.");
        print!("Press Enter once the registrar has been updated: ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// Teardown destroys multiple resources irreversibly, so the bar is higher
/// than a yes/no: the operator must type the domain name itself (or pass it
/// via `--confirm`).
pub fn confirm_teardown(domain: &DomainName, preconfirmed: Option<&str>) -> io::Result<bool> {
    if let Some(token) = preconfirmed {
        return Ok(token == domain.as_str());
    }

    println!("WARNING: this permanently deletes every resource for {domain}:");
    println!("  - storage buckets and all website files");
    println!("  - the CDN distribution and TLS certificate");
    println!("  - the DNS hosted zone");
    println!();
    print!("Type the domain name ('{domain}') to confirm: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim() == domain.as_str())
}
