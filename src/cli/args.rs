//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum and shared argument groups.

use crate::analysis::{CallFilter, Direction};
use crate::error::QueryResult;
use crate::symbol::{MethodQuery, MethodSignature};
use clap::{
    Args, Parser, Subcommand, ValueEnum,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Symbol reference graph and call-chain analysis
#[derive(Parser, Debug)]
#[command(
    name = "refgraph",
    version = env!("CARGO_PKG_VERSION"),
    about = "Symbol reference graph and call-chain analysis",
    long_about = "Answer caller, call-chain, cycle and type-usage questions over facts collected by a language front end.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  refgraph init\n  refgraph import facts.json\n  refgraph callers Execute --type Service\n  refgraph chains Run --direction backward --depth 3\n  refgraph cycles --namespace App.Core\n  refgraph type-usages Order --kind instantiations"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "REFGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fact file to analyze instead of the imported index
    #[arg(long, global = true, value_name = "PATH")]
    pub facts: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .refgraph directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Load a fact file written by a front end into the index
    Import {
        /// JSON fact file
        #[arg(value_name = "FACTS")]
        path: PathBuf,
    },

    /// Index statistics and supported operations
    Capabilities,

    /// Methods calling the given method
    Callers {
        #[command(flatten)]
        method: MethodArgs,

        /// Restrict to direct or indirect calls
        #[arg(long, value_enum, default_value_t = EdgeFilter::All)]
        filter: EdgeFilter,
    },

    /// Methods called by the given method
    Callees {
        #[command(flatten)]
        method: MethodArgs,

        #[arg(long, value_enum, default_value_t = EdgeFilter::All)]
        filter: EdgeFilter,
    },

    /// Call chains starting at a method
    Chains {
        #[command(flatten)]
        method: MethodArgs,

        /// forward (callees) or backward (callers)
        #[arg(long, default_value = "forward")]
        direction: Direction,

        /// Maximum number of steps per chain
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Call chains from one method to another
    Between {
        #[command(flatten)]
        route: RouteArgs,

        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Call chains that return to the method
    Recursive {
        #[command(flatten)]
        method: MethodArgs,

        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Call graph of a type or namespace
    CallGraph {
        /// Type to scope the graph to
        #[arg(short = 't', long = "type", conflicts_with = "namespace")]
        type_name: Option<String>,

        /// Namespace to scope the graph to
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Circular call dependencies
    Cycles {
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Methods reachable from a method, by depth
    Reachable {
        #[command(flatten)]
        method: MethodArgs,

        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Shortest call path between two methods
    ShortestPath {
        #[command(flatten)]
        route: RouteArgs,
    },

    /// Where a type is used
    TypeUsages {
        /// Type name (simple, dotted suffix or full)
        type_name: String,

        #[arg(long, value_enum, default_value_t = UsageFilter::All)]
        kind: UsageFilter,

        /// Match the full name exactly
        #[arg(long)]
        full_name: bool,
    },

    /// Base classes, derived classes and interfaces of a type
    Inheritance { type_name: String },

    /// Types a type depends on and types depending on it
    TypeDeps { type_name: String },

    /// Unused, oversized, duplicated and circular types
    Refactoring {
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Callers, callees, chains, recursion and reachability of a method
    AnalyzeMethod {
        #[command(flatten)]
        method: MethodArgs,

        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Usages, inheritance and dependencies of a type
    AnalyzeType { type_name: String },
}

/// Selects a method by name, or one overload by exact signature.
#[derive(Args, Debug, Clone)]
pub struct MethodArgs {
    /// Method name
    pub name: String,

    /// Declaring type (full name, simple name or dotted suffix)
    #[arg(short = 't', long = "type")]
    pub containing_type: Option<String>,

    /// Match one overload exactly; --type must be the full type name
    #[arg(long, requires = "containing_type")]
    pub exact: bool,

    /// Parameter types of the exact overload, comma separated
    #[arg(long, value_delimiter = ',', requires = "exact")]
    pub params: Vec<String>,

    /// Return type of the exact overload [default: void]
    #[arg(long, requires = "exact")]
    pub returns: Option<String>,
}

impl MethodArgs {
    pub fn to_query(&self) -> QueryResult<MethodQuery> {
        match (self.exact, self.containing_type.as_deref()) {
            (true, Some(declaring_type)) => {
                let params: Vec<&str> = self.params.iter().map(String::as_str).collect();
                let signature = MethodSignature::from_types(
                    declaring_type,
                    &self.name,
                    self.returns.as_deref().unwrap_or("void"),
                    &params,
                )?;
                Ok(signature.into())
            }
            _ => Ok(MethodQuery::by_name(
                self.name.as_str(),
                self.containing_type.as_deref(),
            )),
        }
    }
}

/// Start and end methods of a path query.
#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Method the path starts at
    pub from: String,

    /// Method the path ends at
    pub to: String,

    /// Declaring type of the start method
    #[arg(long)]
    pub from_type: Option<String>,

    /// Declaring type of the end method
    #[arg(long)]
    pub to_type: Option<String>,
}

impl RouteArgs {
    pub fn queries(&self) -> (MethodQuery, MethodQuery) {
        (
            MethodQuery::by_name(self.from.as_str(), self.from_type.as_deref()),
            MethodQuery::by_name(self.to.as_str(), self.to_type.as_deref()),
        )
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    All,
    Direct,
    Indirect,
}

impl From<EdgeFilter> for CallFilter {
    fn from(filter: EdgeFilter) -> Self {
        match filter {
            EdgeFilter::All => CallFilter::All,
            EdgeFilter::Direct => CallFilter::Direct,
            EdgeFilter::Indirect => CallFilter::Indirect,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageFilter {
    All,
    Instantiations,
    Implementations,
    Generics,
}
