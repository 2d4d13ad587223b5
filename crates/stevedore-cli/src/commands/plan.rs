//! Plan command - show the resolved order without touching a cluster

use console::style;
use indexmap::IndexMap;
use serde::Serialize;
use stevedore_core::UnitRef;
use stevedore_kube::{Manifest, Operation};

use super::{GlobalArgs, load_manifest};
use crate::OutputFormat;
use crate::error::Result;

/// The order a run would follow
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub manifest: String,
    pub operation: Operation,
    pub order: Vec<UnitRef>,
    /// Direct dependencies per unit, as declared plus the manifest root's
    pub dependencies: IndexMap<String, Vec<String>>,
}

impl Plan {
    pub fn build(manifest: &Manifest, reverse: bool) -> Result<Self> {
        let order = manifest.install_order()?;
        let (operation, order) = if reverse {
            (Operation::Uninstall, order.reversed())
        } else {
            (Operation::Install, order.units().to_vec())
        };

        let dependencies = manifest
            .graph()
            .iter()
            .filter(|(_, deps)| !deps.is_empty())
            .map(|(name, deps)| {
                (
                    name.to_string(),
                    deps.iter().map(|d| d.name.clone()).collect(),
                )
            })
            .collect();

        Ok(Self {
            manifest: manifest.name().to_string(),
            operation,
            order,
            dependencies,
        })
    }

    fn print(&self) {
        println!(
            "{} {} order for {}",
            style("→").blue().bold(),
            capitalize(&self.operation.to_string()),
            style(&self.manifest).cyan()
        );
        for (i, unit) in self.order.iter().enumerate() {
            println!(
                "  {:>2}. {} {}",
                i + 1,
                unit.name,
                style(format!("({})", unit.kind)).dim()
            );
        }

        if !self.dependencies.is_empty() {
            println!("\n{}", style("Dependencies:").bold());
            for (name, deps) in &self.dependencies {
                println!("  {} → {}", name, deps.join(", "));
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run the plan command
pub fn run(args: &GlobalArgs, reverse: bool, output: OutputFormat) -> Result<()> {
    let manifest = load_manifest(args)?;
    let plan = Plan::build(&manifest, reverse)?;

    match output {
        OutputFormat::Table => plan.print(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&plan)?),
    }
    Ok(())
}
