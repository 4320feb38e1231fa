use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

use easytouch_config as etc;
use easytouch_config::{LoadSession, MockHost, Presence, SessionOptions};

#[derive(Parser, Debug)]
#[command(
    name = "etc",
    version,
    about = "Pentair EasyTouch configuration compiler",
    disable_help_subcommand = true
)]
struct Cli {
    /// Session options file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    options: Option<String>,

    /// Switch-slot profile; overrides the options file
    #[arg(long, value_enum, global = true)]
    profile: Option<ProfileArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ProfileArg {
    MultiFeature,
    SingleAddress,
}

impl From<ProfileArg> for etc::Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::MultiFeature => etc::Profile::MultiFeature,
            ProfileArg::SingleAddress => etc::Profile::SingleAddress,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the feature table
    Features,
    /// Print the composed device schema
    Schema,
    /// Validate every device in a config file without registering anything
    Validate {
        /// YAML config path
        #[arg(long)]
        file: String,
        /// Print the validated trees as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Validate, build and register every device against the mock host
    Build {
        /// YAML config path
        #[arg(long)]
        file: String,
        /// Print graphs and registrations as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let options = session_options(cli.options.as_deref(), cli.profile)?;

    let res = match cli.command {
        Commands::Features => features(),
        Commands::Schema => schema(&options),
        Commands::Validate { file, json } => validate(&file, &options, json),
        Commands::Build { file, json } => build(&file, &options, json),
    };
    if let Err(e) = &res {
        error!("{e:#}");
    }
    res
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn session_options(path: Option<&str>, profile: Option<ProfileArg>) -> Result<SessionOptions> {
    let mut options = match path {
        Some(p) => SessionOptions::load(p)?,
        None => SessionOptions::default(),
    };
    if let Some(p) = profile {
        options.profile = p.into();
    }
    Ok(options)
}

fn features() -> Result<()> {
    for f in etc::Feature::ALL {
        println!("{}\t{}\t{}", f.code(), f.role(), f.slot());
    }
    Ok(())
}

fn schema(options: &SessionOptions) -> Result<()> {
    let session = LoadSession::new(MockHost::new(), options)?;
    println!("# profile: {}", session.profile());
    for field in session.schema().fields() {
        let presence = match field.presence {
            Presence::Required => "required",
            Presence::Optional => "optional",
        };
        println!("{}\t{presence}\t{}", field.name, field.kind);
    }
    Ok(())
}

fn validate(file: &str, options: &SessionOptions, json: bool) -> Result<()> {
    let doc = etc::load_document_file(file)?;
    // Validation is read-only, so a single session checks each device in
    // isolation; cross-device id clashes surface in `build`.
    let session = LoadSession::new(MockHost::new(), options)?;
    let mut trees = Vec::new();
    for (i, entry) in etc::device_entries(&doc)?.into_iter().enumerate() {
        let config = session
            .validate(entry)
            .map_err(|e| anyhow::anyhow!("{}[{i}]: {e}", etc::PLATFORM_KEY))?;
        println!("ok: {} ({} switches)", config.id, config.switches.len());
        trees.push(config);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&trees)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct BuildReport<'a> {
    profile: etc::Profile,
    devices: Vec<&'a etc::DeviceGraph>,
    registrations: &'a [etc::Registration],
}

fn build(file: &str, options: &SessionOptions, json: bool) -> Result<()> {
    let doc = etc::load_document_file(file)?;
    let mut session = LoadSession::new(MockHost::new(), options)?;
    let built = etc::process_document(&mut session, &doc)?;
    info!(devices = built.len(), profile = %session.profile(), "build complete");

    let host = session.host();
    if json {
        let report = BuildReport {
            profile: session.profile(),
            devices: built.iter().map(|(g, _)| g).collect(),
            registrations: host.registrations(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (graph, _) in &built {
        print!("{}", graph.summary());
    }
    println!();
    for (n, reg) in host.registrations().iter().enumerate() {
        println!("{n:>3}  {}", serde_json::to_string(reg)?);
    }
    Ok(())
}
