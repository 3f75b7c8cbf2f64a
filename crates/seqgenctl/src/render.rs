//! Human-readable summaries of engine output.

use std::fmt::Write;

use seqgen_engine::model::StepConfig;
use seqgen_engine::sequence::SequenceDigest;
use seqgen_engine::{Atom, CategorizedTime, ExecutionConfig, GeneratedSequence, ObservationDigest, ProgramDigest};

fn step_kind(config: &StepConfig) -> String {
    match config {
        StepConfig::Bias => "bias".to_string(),
        StepConfig::Dark => "dark".to_string(),
        StepConfig::Gcal(_) => "gcal".to_string(),
        StepConfig::Science { offset, .. } => format!("science {}", offset),
    }
}

fn atom(out: &mut String, label: &str, atom: &Atom) {
    let _ = writeln!(
        out,
        "  {} {} {} ({} s)",
        label,
        atom.id,
        atom.description.as_deref().unwrap_or("-"),
        atom.total
    );
    for step in &atom.steps {
        let _ = writeln!(
            out,
            "      {:<12} {:<28} exp {:>12} s  total {:>12} s",
            step.observe_class.to_string(),
            step_kind(&step.step_config),
            step.instrument_config.exposure(),
            step.estimate.total
        );
    }
}

fn sequence(out: &mut String, title: &str, generated: &GeneratedSequence) {
    let _ = writeln!(out, "{} [{}]", title, generated.state);
    match &generated.next_atom {
        Some(next) => atom(out, "next  ", next),
        None => {
            let _ = writeln!(out, "  complete");
        }
    }
    for future in &generated.possible_future {
        atom(out, "future", future);
    }
    if generated.has_more {
        let _ = writeln!(out, "  ...");
    }
}

fn time(out: &mut String, label: &str, time: &CategorizedTime) {
    let _ = writeln!(
        out,
        "{:<12} program {:>14} s  partner {:>14} s  non-charged {:>14} s  total {:>14} s",
        label,
        time.program,
        time.partner,
        time.non_charged,
        time.total()
    );
}

fn digest_line(out: &mut String, label: &str, digest: &SequenceDigest) {
    let class = digest
        .observe_class
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "{:<12} {} atoms, class {}, {} offsets",
        label,
        digest.atom_count,
        class,
        digest.offsets.len()
    );
    time(out, "", &digest.time_estimate);
}

/// Text form of a generated execution config.
pub fn execution_config(config: &ExecutionConfig) -> String {
    let mut out = String::new();
    if let Some(acquisition) = &config.acquisition {
        sequence(&mut out, "Acquisition", acquisition);
    }
    sequence(&mut out, "Science", &config.science);
    out
}

/// Text form of an observation digest.
pub fn observation_digest(digest: &ObservationDigest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Observation {}", digest.observation_id);
    let _ = writeln!(
        out,
        "{:<12} full {} s, reacquisition {} s",
        "Setup", digest.execution.setup.full, digest.execution.setup.reacquisition
    );
    if let Some(acquisition) = &digest.execution.acquisition {
        digest_line(&mut out, "Acquisition", acquisition);
    }
    digest_line(&mut out, "Science", &digest.execution.science);
    time(&mut out, "Charged", &digest.invoice.final_charge);
    time(&mut out, "Remaining", &digest.remaining);
    out
}

/// Text form of a program digest.
pub fn program_digest(digest: &ProgramDigest) -> String {
    let mut out = String::new();
    let ids: Vec<String> = digest.observations.iter().map(|id| id.to_string()).collect();
    let _ = writeln!(out, "Observations {}", ids.join(", "));
    time(&mut out, "Charged", &digest.final_charge);
    time(&mut out, "Remaining", &digest.remaining);
    out
}
