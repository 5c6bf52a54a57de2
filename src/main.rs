use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use votable::{
    build_param_node, build_resource_node, get_resource_param_attribute, serialize_to_string,
    Attribute, Datatype, Document, Reader, ReaderConfig,
};

#[derive(Debug, Parser)]
#[command(name = "votable", version, about = "Build and query VOTable documents")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one attribute of a PARAM inside a RESOURCE
    Query {
        /// Input file (defaults to stdin)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
        /// RESOURCE utype
        #[arg(long)]
        resource_type: String,
        /// RESOURCE name
        #[arg(long)]
        resource_name: String,
        /// PARAM name
        #[arg(long)]
        param: String,
        /// Attribute to print (ID, unit, datatype, arraysize, value, ...)
        #[arg(short, long, default_value = "value")]
        attribute: Attribute,
        /// Maximum element nesting accepted by the reader (0 = reader ceiling)
        #[arg(long, default_value_t = ReaderConfig::default().max_depth)]
        max_depth: u16,
    },
    /// Write a document with one RESOURCE holding the given PARAMs
    Emit {
        /// RESOURCE utype
        #[arg(long)]
        resource_type: String,
        /// RESOURCE name
        #[arg(long)]
        resource_name: String,
        /// PARAM as name:datatype[:unit]=value, repeatable
        #[arg(short, long = "param", value_name = "SPEC")]
        params: Vec<ParamArg>,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Debug)]
struct ParamArg {
    name: String,
    datatype: Datatype,
    unit: Option<String>,
    value: String,
}

impl FromStr for ParamArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (head, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name:datatype[:unit]=value, got '{s}'"))?;
        let mut parts = head.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let datatype = parts
            .next()
            .ok_or_else(|| format!("missing datatype in '{s}'"))?
            .parse::<Datatype>()
            .map_err(|err| err.to_string())?;
        let unit = parts.next().map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            datatype,
            unit,
            value: value.to_string(),
        })
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Query {
            input,
            resource_type,
            resource_name,
            param,
            attribute,
            max_depth,
        } => {
            let text = read_input(&input)?;
            let config = ReaderConfig {
                max_depth,
                ..ReaderConfig::default()
            };
            let document = Reader::with_config(text.as_bytes(), config)
                .parse()
                .context("failed to parse input document")?;
            query(&document, &resource_type, &resource_name, &param, attribute)
        }
        Command::Emit {
            resource_type,
            resource_name,
            params,
            output,
        } => {
            let xml = emit(&resource_type, &resource_name, &params)?;
            write_output(&output, xml.as_bytes())
        }
    }
}

fn query(
    document: &Document,
    resource_type: &str,
    resource_name: &str,
    param: &str,
    attribute: Attribute,
) -> Result<()> {
    let found =
        get_resource_param_attribute(document, resource_type, resource_name, param, attribute)
            .context("query failed")?;
    match found {
        Some(value) => {
            let mut stdout = io::stdout();
            writeln!(stdout, "{value}").context("failed to write stdout")?;
            Ok(())
        }
        None => bail!(
            "no {attribute} on PARAM '{param}' in RESOURCE utype='{resource_type}' name='{resource_name}'"
        ),
    }
}

fn emit(resource_type: &str, resource_name: &str, params: &[ParamArg]) -> Result<String> {
    let nodes = params
        .iter()
        .map(|p| {
            build_param_node(&p.name, p.unit.as_deref(), p.datatype, None, &p.value)
                .with_context(|| format!("invalid PARAM '{}'", p.name))
        })
        .collect::<Result<Vec<_>>>()?;
    let resource = build_resource_node(resource_type, resource_name, nodes)?;
    Ok(serialize_to_string(resource)?)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn read_input(path: &Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            if buffer.trim().is_empty() {
                bail!("no input provided on stdin");
            }
            Ok(buffer)
        }
    }
}

fn write_output(path: &Option<PathBuf>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(data).context("failed to write stdout")?;
            Ok(())
        }
    }
}
