//! Command-line interface for xsd2jsonschema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xsd2jsonschema::{ConversionOptions, Converter, Draft, MixedContent, ResolutionReport};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsd2jsonschema")]
#[command(author, version, about = "Convert XML Schema documents to JSON Schema", long_about = None)]
struct Cli {
    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an XSD schema (with its includes and imports) to JSON Schema
    Convert {
        /// Path to the root XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Global element to use as the document root
        #[arg(short, long)]
        root: Option<String>,

        /// JSON Schema draft: 7 or 2020-12
        #[arg(short, long)]
        draft: Option<Draft>,

        /// JSON options file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// XML catalog used for URN schema locations
        #[arg(long, value_name = "FILE")]
        catalog: Vec<PathBuf>,

        /// Map element wildcards to open objects
        #[arg(long)]
        allow_wildcards: bool,

        /// Map mixed content to a text property
        #[arg(long)]
        mixed_text: bool,

        /// Drop facets that do not apply to the target type
        #[arg(long)]
        lenient_facets: bool,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Load and resolve an XSD schema and print what was found
    Inspect {
        /// Path to the root XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// XML catalog used for URN schema locations
        #[arg(long, value_name = "FILE")]
        catalog: Vec<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            schema,
            output,
            root,
            draft,
            config,
            catalog,
            allow_wildcards,
            mixed_text,
            lenient_facets,
            compact,
        } => {
            let options = ConvertFlags {
                root,
                draft,
                config,
                catalog,
                allow_wildcards,
                mixed_text,
                lenient_facets,
                compact,
            };
            cmd_convert(schema, output, options)
        }
        Commands::Inspect {
            schema,
            catalog,
            json,
        } => cmd_inspect(schema, catalog, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let default = if verbose { "xsd2jsonschema=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "cli")]
struct ConvertFlags {
    root: Option<String>,
    draft: Option<Draft>,
    config: Option<PathBuf>,
    catalog: Vec<PathBuf>,
    allow_wildcards: bool,
    mixed_text: bool,
    lenient_facets: bool,
    compact: bool,
}

#[cfg(feature = "cli")]
impl ConvertFlags {
    /// Options file first, then command-line flags on top
    fn into_options(self) -> Result<ConversionOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => ConversionOptions::from_json(&fs::read_to_string(path)?)?,
            None => ConversionOptions::default(),
        };
        if let Some(root) = self.root {
            options = options.with_root_element(root);
        }
        if let Some(draft) = self.draft {
            options = options.with_draft(draft);
        }
        for catalog in self.catalog {
            options = options.with_catalog(catalog);
        }
        if self.allow_wildcards {
            options = options.with_allow_wildcards(true);
        }
        if self.mixed_text {
            options = options.with_mixed_content(MixedContent::TextProperty);
        }
        if self.lenient_facets {
            options = options.with_lenient_facets(true);
        }
        if self.compact {
            options = options.with_pretty(false);
        }
        Ok(options)
    }
}

#[cfg(feature = "cli")]
fn cmd_convert(
    schema: PathBuf,
    output: Option<PathBuf>,
    flags: ConvertFlags,
) -> Result<(), Box<dyn std::error::Error>> {
    let converter = Converter::new(flags.into_options()?);
    let conversion = converter.convert_file(&schema)?;
    let text = converter.emit(&conversion)?;

    match output {
        Some(path) => fs::write(&path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema: PathBuf,
    catalogs: Vec<PathBuf>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = catalogs
        .into_iter()
        .fold(ConversionOptions::default(), |options, catalog| {
            options.with_catalog(catalog)
        });
    let report = Converter::new(options).inspect_file(&schema)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_report(report: &ResolutionReport) {
    println!("xsd2jsonschema v{}", xsd2jsonschema::VERSION);
    println!();
    println!("Documents:");
    for document in &report.documents {
        println!("  {}", document);
    }
    if !report.unreachable.is_empty() {
        println!();
        println!("Unreachable documents:");
        for document in &report.unreachable {
            println!("  {}", document);
        }
    }

    println!();
    println!("Declarations:");
    for (space, count) in &report.declarations {
        println!("  {}: {}", space, count);
    }
    println!("  anonymous types: {}", report.anonymous);

    if !report.substitution_groups.is_empty() {
        println!();
        println!("Substitution groups:");
        for (head, members) in &report.substitution_groups {
            println!("  {} <- {}", head, members.join(", "));
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
