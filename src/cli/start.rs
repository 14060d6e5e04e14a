use crate::cli::{Config, Host, actions::Action, commands, globals::GlobalArgs};
use crate::coordinator::Coordinator;
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};

/// # Errors
/// Will return an error if the config directory can not be created
pub fn get_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().map_or_else(|| PathBuf::from("/tmp"), |h| h);

    let config_path = Path::new(&home_dir).join(".config").join("partup");
    fs::create_dir_all(&config_path)
        .context(format!("unable to create: {}", &config_path.display()))?;

    Ok(config_path)
}

/// # Errors
/// Will return an error if the config file is not found
pub fn start() -> Result<(Coordinator, Action, GlobalArgs)> {
    let config_path = get_config_path()?;

    // start the command line interface
    let cmd = commands::new(&config_path);

    // get the matches
    let matches = cmd.get_matches();

    let verbosity_level = match matches.get_one::<u8>("verbose").copied().unwrap_or(0) {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(verbosity_level)
        .init();

    log::info!("config path: {}", config_path.display());

    // Config file is required
    let config_file: PathBuf = matches.get_one::<PathBuf>("config").map_or_else(
        || {
            eprintln!("no config file found");
            exit(1);
        },
        Into::into,
    );

    // load the config file
    let config = Config::new(config_file)?;

    log::debug!("config: {config:#?}");

    // show config
    if matches.get_one::<bool>("show").copied().unwrap_or(false) {
        println!("Hosts:");
        for key in config.hosts.keys() {
            println!("   - {key}");
        }
        exit(0);
    }

    let host = get_host(&config, &config_path, &matches)?;

    let coordinator = Coordinator::new(&host.endpoint)?;

    log::debug!("{coordinator}");

    // define global args
    let mut global_args = GlobalArgs::new();

    //  define retries
    let retries: usize = matches.get_one::<usize>("retries").map_or(1, |n| *n);
    global_args.set_retries(retries);

    global_args.set_session_token(host.get_session_token());

    let action = upload_action(&matches)?;

    log::debug!("globals: {global_args:#?}, action: {action:#?}");

    Ok((coordinator, action, global_args))
}

fn get_host<'a>(config: &'a Config, config_path: &Path, matches: &ArgMatches) -> Result<&'a Host> {
    let name = matches.get_one::<String>("host").ok_or_else(|| {
        anyhow!(
            "No \"host\" found, check config file {}/config.yml, For more information try {}",
            config_path.display(),
            "--help".green()
        )
    })?;

    config.get_host(name).map_err(|_| {
        anyhow!(
            "Could not find host: \"{}\". Check config file {}/config.yml, For more information try {}",
            name.red(),
            config_path.display(),
            "--help".green()
        )
    })
}

fn upload_action(matches: &ArgMatches) -> Result<Action> {
    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .context("file path missing")?;

    // the session appends the file extension to the name
    let name = match matches.get_one::<String>("name") {
        Some(name) => name.clone(),
        None => file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToString::to_string)
            .with_context(|| format!("cannot derive a name from: {}", file.display()))?,
    };

    Ok(Action::Upload {
        file,
        name,
        chunk_size: matches.get_one::<u64>("chunk-size").copied().unwrap_or_default(),
        concurrency: matches.get_one::<usize>("concurrency").copied().unwrap_or_default(),
        quiet: matches.get_one::<bool>("quiet").copied().unwrap_or(false),
    })
}
