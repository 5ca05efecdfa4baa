// tg_cli - command-line front end (library interface for testing)
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tg_model::{ParsingConfig, TypeCategory, TypeNode, Types};
use tg_parser::{split_classpath, ClasspathLocator, Parser, ParsingContext};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(clap::Parser, Debug)]
#[command(name = "typegraph")]
#[command(about = "Builds a type graph from compiled classes and queries it")]
#[command(subcommand_precedence_over_arg = true)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// TOML file with parsing options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Model members that carry no annotation
    #[arg(long, global = true)]
    pub all_members: bool,
    /// Annotation whose presence on a type turns on member modeling
    #[arg(long = "annotation", value_name = "NAME", global = true)]
    pub annotations: Vec<String>,
    /// Directory or archive searched for types the inputs reference
    #[arg(long, value_name = "PATH", global = true)]
    pub classpath: Vec<String>,
    /// Directories, archives or class files to parse
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Count types per category and list what stayed unresolved
    Summary,
    /// List every class that is an instance of an interface
    Implementations {
        interface: String,
    },
    /// List types carrying an annotation
    Annotated {
        annotation: String,
        /// Also follow annotations meta-annotated with it
        #[arg(long)]
        meta: bool,
    },
    /// List direct and indirect subtypes
    Subtypes {
        #[arg(value_name = "TYPE")]
        type_name: String,
    },
    /// Describe one type
    Show {
        #[arg(value_name = "TYPE")]
        type_name: String,
    },
}

impl Cli {
    pub fn parsing_config(&self) -> Result<ParsingConfig> {
        let config = match &self.config {
            Some(path) => ParsingConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ParsingConfig::default(),
        };
        let config = if self.all_members {
            config.with_model_unannotated_members(true)
        } else {
            config
        };
        Ok(config.with_annotations_of_interest(self.annotations.iter().cloned()))
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses the inputs and answers the command.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let context = Arc::new(ParsingContext::new(cli.parsing_config()?));
    let mut parser = Parser::new(Arc::clone(&context));
    let classpath = split_classpath(&cli.classpath);
    let reconcile = !classpath.is_empty();
    if reconcile {
        parser = parser.with_locator(Arc::new(ClasspathLocator::new(classpath)));
    }

    let report = parser
        .parse_all(&cli.paths)
        .context("failed to read inputs")?;
    debug!(units = report.units, failures = report.failures, "inputs parsed");
    if reconcile {
        let reconciled = parser.reconcile();
        debug!(located = reconciled.located, "classpath consulted");
    }

    let types = parser.types();
    match &cli.command {
        Command::Summary => {
            write_summary(out, &types, &context)?;
            if report.failures > 0 {
                writeln!(out, "undecodable entries: {}", report.failures)?;
            }
        }
        Command::Implementations { interface } => {
            if types.proxy(interface).is_none() {
                bail!("unknown type {interface}");
            }
            write_names(out, types.implementations_of(interface))?;
        }
        Command::Annotated { annotation, meta } => {
            let annotated = match types.get_by_name(annotation) {
                Some(node) if *meta => node.all_annotated_types(),
                _ => types.annotated_with(annotation),
            };
            write_names(out, annotated)?;
        }
        Command::Subtypes { type_name } => {
            let node = find_node(&types, type_name)?;
            write_names(out, node.all_sub_types())?;
        }
        Command::Show { type_name } => {
            let node = find_node(&types, type_name)?;
            write_type(out, &node)?;
        }
    }
    Ok(())
}

/// A visited node, or the placeholder of a name only ever referenced.
fn find_node(types: &Types, name: &str) -> Result<Arc<TypeNode>> {
    match types.proxy(name).and_then(|proxy| proxy.node()) {
        Some(node) => Ok(node),
        None => bail!("unknown type {name}"),
    }
}

fn write_names(out: &mut dyn Write, nodes: Vec<Arc<TypeNode>>) -> Result<()> {
    let mut names: Vec<String> = nodes.iter().map(|node| node.name().to_string()).collect();
    names.sort_unstable();
    names.dedup();
    for name in names {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn write_summary(out: &mut dyn Write, types: &Types, context: &ParsingContext) -> Result<()> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for category in [
        TypeCategory::Class,
        TypeCategory::Interface,
        TypeCategory::Enum,
        TypeCategory::Annotation,
    ] {
        counts.insert(category.to_string(), 0);
    }
    for node in types.all_types() {
        *counts.entry(node.category().to_string()).or_default() += 1;
    }

    writeln!(out, "types: {}", types.len())?;
    for (category, count) in &counts {
        writeln!(out, "  {category}: {count}")?;
    }

    let unresolved = types.unresolved_names();
    writeln!(out, "unresolved: {}", unresolved.len())?;
    for name in &unresolved {
        writeln!(out, "  {name}")?;
    }

    let diagnostics = context.diagnostics();
    if !diagnostics.is_empty() {
        writeln!(out, "diagnostics: {}", diagnostics.len())?;
        for diagnostic in &diagnostics {
            writeln!(out, "  {diagnostic}")?;
        }
    }
    Ok(())
}

fn write_type(out: &mut dyn Write, node: &TypeNode) -> Result<()> {
    let state = if node.is_visited() { "" } else { " (unresolved)" };
    writeln!(out, "{} {}{state}", node.category(), node.name())?;
    if let Some(parent) = node.parameterized_parent() {
        writeln!(out, "  extends {parent}")?;
    } else if let Some(parent) = node.parent_name() {
        writeln!(out, "  extends {parent}")?;
    }

    let interfaces = node.parameterized_interfaces();
    if interfaces.is_empty() {
        for interface in node.interfaces() {
            writeln!(out, "  implements {}", interface.name())?;
        }
    } else {
        for interface in interfaces {
            writeln!(out, "  implements {interface}")?;
        }
    }
    for location in node.locations() {
        writeln!(out, "  location {location}")?;
    }
    for annotation in node.annotations() {
        writeln!(out, "  @{}", annotation.type_name())?;
    }

    for field in node.static_fields().iter().chain(node.fields().iter()) {
        let modifier = if field.is_static() { "static " } else { "" };
        let suffix = if field.is_array() { "[]" } else { "" };
        writeln!(
            out,
            "  field {modifier}{}{suffix} {}",
            field.type_name(),
            field.name()
        )?;
    }
    for method in node.methods() {
        let returns = method
            .return_type()
            .map(ToString::to_string)
            .unwrap_or_else(|| "void".to_string());
        writeln!(
            out,
            "  method {returns} {}({})",
            method.name(),
            method.argument_type_names().join(", ")
        )?;
    }
    for (element, value) in node.default_values() {
        writeln!(out, "  default {element} = {value:?}")?;
    }
    Ok(())
}
