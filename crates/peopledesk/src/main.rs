//! `pdesk` - CLI for peopledesk
//!
//! This binary provides the command-line interface for browsing and editing
//! a remote people directory.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;

use peopledesk::cli::{
    shell, AddCommand, Cli, Command, ConfigCommand, DeleteCommand, EditCommand, ListCommand,
    ShowCommand,
};
use peopledesk::render::{project, render, OutputFormat};
use peopledesk::surface::{AssumeYes, Prompt, StdinPrompt, TerminalSurface};
use peopledesk::{
    init_logging, App, Config, Field, PeopleApi, ReqwestTransport, SystemClock, UiSettings,
};

type DeskApp = App<ReqwestTransport>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_with_base_url(cli.config.clone(), cli.base_url.as_deref())?;

    // Execute the command
    match cli.command {
        Command::List(cmd) => handle_list(&config, cmd).await,
        Command::Show(cmd) => handle_show(&config, cmd).await,
        Command::Add(cmd) => handle_add(&config, cmd).await,
        Command::Edit(cmd) => handle_edit(&config, cmd).await,
        Command::Delete(cmd) => handle_delete(&config, cmd).await,
        Command::Shell => {
            shell::run(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn build_app(
    config: &Config,
    surface: &Rc<TerminalSurface>,
    prompt: Rc<dyn Prompt>,
) -> DeskApp {
    App::new(
        PeopleApi::from_config(ReqwestTransport::new(), config),
        UiSettings::from_config(config),
        surface.clone(),
        prompt,
        Rc::new(SystemClock),
    )
}

fn exit_code(surface: &TerminalSurface) -> ExitCode {
    if surface.had_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn handle_list(config: &Config, cmd: ListCommand) -> anyhow::Result<ExitCode> {
    let surface = Rc::new(TerminalSurface::new(cmd.format.into(), false));
    let app = build_app(config, &surface, Rc::new(AssumeYes));

    if app.refresh().await.is_ok() {
        if let Some(query) = &cmd.search {
            app.search_now(query);
        }
        surface.flush();
    }
    Ok(exit_code(&surface))
}

async fn handle_show(config: &Config, cmd: ShowCommand) -> anyhow::Result<ExitCode> {
    let surface = Rc::new(TerminalSurface::new(cmd.format.into(), false));
    let app = build_app(config, &surface, Rc::new(AssumeYes));

    match app.lookup(&cmd.dni).await {
        Some(person) => {
            let text = render(&project(&[person], ""), cmd.format.into())?;
            if text.ends_with('\n') {
                print!("{text}");
            } else {
                println!("{text}");
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("error: No data found for DNI {}", cmd.dni);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn handle_add(config: &Config, cmd: AddCommand) -> anyhow::Result<ExitCode> {
    let surface = Rc::new(TerminalSurface::new(OutputFormat::Table, false));
    let app = build_app(config, &surface, Rc::new(AssumeYes));

    app.open_new();
    let filled = app
        .set_field(Field::Name, cmd.name)
        .and_then(|()| app.set_field(Field::Dni, cmd.dni))
        .and_then(|()| app.set_field(Field::Age, cmd.age));
    if filled.is_ok() {
        let _ = app.submit().await;
    }
    Ok(exit_code(&surface))
}

async fn handle_edit(config: &Config, cmd: EditCommand) -> anyhow::Result<ExitCode> {
    let surface = Rc::new(TerminalSurface::new(OutputFormat::Table, false));
    let app = build_app(config, &surface, Rc::new(AssumeYes));

    app.open_edit(&cmd.dni).await?;
    let mut filled: peopledesk::Result<()> = Ok(());
    if let Some(name) = cmd.name {
        filled = filled.and_then(|()| app.set_field(Field::Name, name));
    }
    if let Some(age) = cmd.age {
        filled = filled.and_then(|()| app.set_field(Field::Age, age));
    }
    if filled.is_ok() {
        let _ = app.submit().await;
    }
    Ok(exit_code(&surface))
}

async fn handle_delete(config: &Config, cmd: DeleteCommand) -> anyhow::Result<ExitCode> {
    let surface = Rc::new(TerminalSurface::new(OutputFormat::Table, false));
    let prompt: Rc<dyn Prompt> = if cmd.yes {
        Rc::new(AssumeYes)
    } else {
        Rc::new(StdinPrompt)
    };
    let app = build_app(config, &surface, prompt);

    let _ = app.delete(&cmd.dni).await;
    Ok(exit_code(&surface))
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", config.base_url());
                println!("  Timeout (ms):       {}", config.api.timeout_ms);
                println!("  Attempts:           {}", config.api.retries);
                println!("  Retry base (ms):    {}", config.api.retry_base_delay_ms);
                println!("  Retry jitter (ms):  {}", config.api.retry_jitter_ms);
                println!();
                println!("[UI]");
                println!("  Search debounce:    {} ms", config.ui.search_debounce_ms);
                println!("  Notice lifetime:    {} ms", config.ui.notice_ms);
                println!("  Refresh notice:     {} ms", config.ui.refresh_notice_ms);
                println!("  Confirm deletes:    {}", config.ui.confirm_deletes);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
