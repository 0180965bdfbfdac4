use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use obs_core::{ObservationService, ServiceConfig, ServiceError, StoreBackend};
use obs_observation::Filter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    let slugs = [
        Arg::new("feature-type")
            .required(true)
            .help("Feature type slug, e.g. people"),
        Arg::new("property")
            .required(true)
            .help("Property slug, e.g. goal"),
        Arg::new("property-type")
            .required(true)
            .help("Property type slug, e.g. textual"),
    ];

    Command::new("obs")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Record and query self-describing observations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("store-dir")
                .long("store-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Use the file store in this directory"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("definitions").about("Print the taxonomy as JSON"))
        .subcommand(
            Command::new("validate")
                .about("Check a JSON payload against a property type")
                .args(slugs.clone())
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Payload file"),
                ),
        )
        .subcommand(
            Command::new("record")
                .about("Record a JSON payload as an observation of a feature")
                .args(slugs)
                .arg(
                    Arg::new("feature-id")
                        .required(true)
                        .help("UUID or URI of the observed feature"),
                )
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Payload file"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List observations, most recent first")
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .num_args(3)
                        .value_names(["PATH", "OP", "VALUE"])
                        .action(ArgAction::Append)
                        .help("Filter on an indexed field, e.g. --filter featureId = urn:x"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .conflicts_with("filter")
                        .help("JSON search document: {\"filters\":[{\"path\",\"op\",\"match\"}]}"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print one observation")
                .arg(Arg::new("id").required(true).help("Observation id")),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_service(matches: &ArgMatches) -> anyhow::Result<ObservationService> {
    let config_path = matches.get_one::<PathBuf>("config");
    let mut config = ServiceConfig::load(config_path.map(PathBuf::as_path))
        .context("loading configuration")?;

    if let Some(dir) = matches.get_one::<PathBuf>("store-dir") {
        config = config
            .with_store_backend(StoreBackend::File)
            .with_store_directory(dir);
    }

    ObservationService::from_config(&config)
        .await
        .context("starting observation service")
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{name}>"))
}

fn read_file(args: &ArgMatches) -> anyhow::Result<Vec<u8>> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("missing argument <file>")?;
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn filters(args: &ArgMatches) -> Vec<Filter> {
    args.get_occurrences::<String>("filter")
        .map(|occurrences| {
            occurrences
                .filter_map(|values| match values.collect::<Vec<_>>().as_slice() {
                    [path, op, value] => Some(Filter::new(*path, *op, *value)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn run(service: &ObservationService, matches: &ArgMatches) -> anyhow::Result<()> {
    let ctx = service.context();

    match matches.subcommand() {
        Some(("definitions", _)) => print_json(service.definitions()),
        Some(("validate", args)) => {
            let body = read_file(args)?;
            let payload: serde_json::Value = serde_json::from_slice(&body)
                .map_err(|e| ServiceError::MalformedPayload(e.to_string()))?;
            let resolved = service.check_payload(
                arg(args, "feature-type")?,
                arg(args, "property")?,
                arg(args, "property-type")?,
                &payload,
            )?;
            println!(
                "payload is valid for {} / {} / {}",
                resolved.feature_type.name, resolved.property.name, resolved.property_type.name
            );
            Ok(())
        }
        Some(("record", args)) => {
            let body = read_file(args)?;
            let observation = service
                .record_raw(
                    &ctx,
                    arg(args, "feature-type")?,
                    arg(args, "property")?,
                    arg(args, "property-type")?,
                    arg(args, "feature-id")?,
                    &body,
                )
                .await?;
            print_json(&observation)
        }
        Some(("list", args)) => {
            let observations = match args.get_one::<String>("search") {
                Some(search) => service.search(&ctx, search).await?,
                None => service.list(&ctx, &filters(args)).await?,
            };
            print_json(&observations)
        }
        Some(("show", args)) => {
            let observation = service.find(&ctx, arg(args, "id")?).await?;
            print_json(&observation)
        }
        _ => anyhow::bail!("unknown command"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let service = match build_service(&matches).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("startup failed: {e:#}");
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run(&service, &matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ServiceError>() {
                Some(service_error) => match serde_json::to_string(&service_error.to_response()) {
                    Ok(body) => eprintln!("{body}"),
                    Err(_) => eprintln!("error: {service_error}"),
                },
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
