//! Walkthrough: gate decisions, a DEV run, a sweep and ledger verification
//!
//! Reads `QPROOF_*` variables from the environment. Without any set, the run
//! stays in `DEV` mode and every result is `CLASS_C`.

use qproof::{ExecutionConfig, ExperimentRequest, Orchestrator, Result, SweepRequest};
use qproof_core::{bell_fidelity, detect_revival, ExperimentFamily, RevivalCriteria, SweepPoint};
use qproof_ledger::{ExecutionMode, Ledger};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== qproof Evidence Walkthrough ===\n");

    let config = ExecutionConfig::from_env()?;
    println!("Mode: {}", config.mode);
    if config.mode == ExecutionMode::Qpu {
        println!("No hardware provider is registered in this walkthrough; expect denials.");
    }
    let orchestrator = Orchestrator::new(config, Arc::new(Ledger::new()));

    // 1. Single Bell experiment
    println!("\n1. Bell experiment");
    println!("------------------");
    let response = orchestrator.submit(&ExperimentRequest::new(ExperimentFamily::Bell, 2048))?;
    match response.experiment_id() {
        Some(id) => {
            let poll = orchestrator.poll(id)?;
            println!("Experiment {} -> {} ({})", id, poll.status, poll.evidence_id);
            println!("Evidence class: {}", poll.evidence_class.as_str());
            if let Some(counts) = &poll.counts {
                println!("Counts: {:?}", counts);
                let (fidelity, std_err) = bell_fidelity(counts);
                println!("Bell fidelity: {:.3} +/- {:.3}", fidelity, std_err);
            }
        }
        None => println!("Denied: {:?}", response.denial_code()),
    }

    // 2. Delay sweep
    println!("\n2. Bell delay sweep");
    println!("-------------------");
    let sweep = SweepRequest::new(
        ExperimentFamily::BellDelay { delay_us: 0.0 },
        vec![0.0, 20.0, 40.0, 80.0],
        1024,
    );
    let response = orchestrator.submit_sweep(&sweep)?;
    if let Some(id) = response.experiment_id() {
        let poll = orchestrator.poll_sweep(id)?;
        for (delay, counts) in sweep.delays_us.iter().zip(&poll.results) {
            match counts {
                Some(counts) => println!("  {:>5.1} us: fidelity {:.3}", delay, bell_fidelity(counts).0),
                None => println!("  {:>5.1} us: no result", delay),
            }
        }
        let points: Vec<SweepPoint> = sweep
            .delays_us
            .iter()
            .zip(&poll.results)
            .filter_map(|(delay, counts)| counts.as_ref().map(|c| SweepPoint::from_counts(*delay, c)))
            .collect();
        let revival = detect_revival(&points, &RevivalCriteria::default());
        println!(
            "  revival: dip {:.1} us, peak {:.1} us, z = {:.2}, detected = {}",
            revival.dip_us, revival.peak_us, revival.z_score, revival.detected
        );
    }

    // 3. Ledger
    println!("\n3. Ledger");
    println!("---------");
    let state = orchestrator.chain_state();
    println!("Length: {}", state.length);
    println!("Head:   {}", state.head.to_hex());
    for entry in orchestrator.all_entries() {
        println!(
            "  #{} {} {} leaf={}",
            entry.index,
            entry.class.as_str(),
            entry.mode,
            &entry.leaf_digest.to_hex()[..16]
        );
    }
    match orchestrator.verify_ledger() {
        Ok(()) => println!("Chain verifies from index 0"),
        Err(e) => println!("Chain verification failed: {}", e),
    }

    Ok(())
}
