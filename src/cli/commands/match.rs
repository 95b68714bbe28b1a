//! Match command - offline topic/pattern diagnostics.

use crate::cli::args::MatchArgs;
use crate::routing::{Pattern, TopicAddress};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct MatchReport {
    topic: String,
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fromhost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tohost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    matched: bool,
}

pub fn run_match(args: MatchArgs) -> Result<()> {
    let report = evaluate(&args);
    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        match &report.error {
            Some(err) => println!("{}: {err}", report.topic),
            None => println!(
                "{} -> from={} to={} event={} entity={}",
                report.topic,
                report.fromhost.as_deref().unwrap_or("-"),
                report.tohost.as_deref().unwrap_or("-"),
                report.event_type.as_deref().unwrap_or("-"),
                report.entity.as_deref().unwrap_or("-"),
            ),
        }
        println!(
            "pattern {} {}",
            report.pattern,
            if report.matched { "matches" } else { "does not match" }
        );
    }
    Ok(())
}

fn evaluate(args: &MatchArgs) -> MatchReport {
    let pattern = Pattern::from_filters(
        args.fromhost.as_deref(),
        args.tohost.as_deref(),
        args.event_type.as_deref(),
        args.entity.as_deref(),
    );
    let mut report = MatchReport {
        topic: args.topic.clone(),
        pattern: pattern.to_string(),
        fromhost: None,
        tohost: None,
        event_type: None,
        entity: None,
        error: None,
        matched: false,
    };
    match TopicAddress::parse(&args.base, &args.topic) {
        Ok(address) => {
            report.matched = pattern.matches(&address);
            report.fromhost = Some(address.fromhost);
            report.tohost = address.tohost;
            report.event_type = Some(address.event_type);
            report.entity = address.entity;
        }
        Err(err) => report.error = Some(err.to_string()),
    }
    report
}
