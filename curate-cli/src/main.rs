use std::{
    io::{self, BufRead, Write},
    process,
    sync::Arc,
};

use env_logger::{Builder, Env};

use curate_core::{
    config::Config,
    curator::{Curator, Outcome, Pending, Toggle},
    error::Error,
    item::{CatalogItem, ItemType},
    ledger::client::LedgerClient,
    projection::{Screen, View},
    worker::WorkerHandle,
};

const ENV_LOG: &str = "CURATE_LOG";
const ENV_LOG_STYLE: &str = "CURATE_LOG_STYLE";

const HELP: &str = "\
commands:
  playlists                          list playlists
  select <playlist>                  set the working playlist
  create <name>                      create a playlist
  rename <playlist> <name>           rename a playlist
  delete <playlist>                  delete a playlist
  type search|summary <type>         switch the listed item type
  search <query>                     search the catalog
  expand search|summary <type> <id>  open an artist or album
  include|exclude <type> <id>        record a decision
  undo include|exclude <type> <id>   take a decision back
  summary                            reload the included items
  show search|summary|browse <type>  print a list
  publish [playlist]                 publish a playlist (default: working)
  publish-all                        publish every playlist
  quit";

type Engine = Curator<Arc<LedgerClient>>;

enum Command {
    Playlists,
    Select(String),
    Create(String),
    Rename(String, String),
    Delete(String),
    SetType(Screen, ItemType),
    Search(String),
    Expand(Screen, ItemType, String),
    Toggle(Toggle),
    Summary,
    Show(View),
    Publish(Option<String>),
    PublishAll,
    Help,
    Quit,
}

fn main() {
    // Setup logging from the env variables, with defaults.
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    let mut config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            log::error!("failed to load config, using defaults: {}", err);
            Config::default()
        }
    };

    let client = match LedgerClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };
    let worker = match WorkerHandle::spawn(client.clone()) {
        Ok(worker) => worker,
        Err(err) => {
            log::error!("failed to start the ledger worker: {}", err);
            process::exit(1);
        }
    };
    let mut curator = Curator::new(client, config.heuristics.clone());
    if let Some(playlist) = &config.playlist {
        curator.select_playlist(playlist.as_str());
    }

    println!("{}", HELP);
    prompt();
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("failed to read input: {}", err);
                break;
            }
        };
        if line.trim().is_empty() {
            prompt();
            continue;
        }
        match parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Select(id)) => {
                curator.select_playlist(id.as_str());
                config.playlist = Some(id);
                if let Err(err) = config.save() {
                    log::warn!("failed to save config: {}", err);
                }
            }
            Ok(command) => match execute(&mut curator, &worker, command) {
                Ok(()) => {}
                Err(err) if err.is_ledger_failure() => println!("ledger error: {}", err),
                Err(err) => println!("rejected: {}", err),
            },
            Err(err) => log::warn!("{}", err),
        }
        prompt();
    }

    worker.shutdown();
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn execute(curator: &mut Engine, worker: &WorkerHandle, command: Command) -> Result<(), Error> {
    let pending = match command {
        Command::Playlists => curator.begin_load_playlists(),
        Command::Create(name) => curator.begin_create_playlist(&name),
        Command::Rename(id, name) => curator.begin_rename_playlist(&id, &name),
        Command::Delete(id) => curator.begin_delete_playlist(&id),
        Command::Search(query) => curator.begin_search(&query)?,
        Command::Expand(screen, item_type, id) => {
            curator.begin_expand(screen, id.as_str(), item_type)?
        }
        Command::Toggle(toggle) => curator.begin_toggle(toggle)?,
        Command::Summary => curator.begin_refresh_summary()?,
        Command::Publish(id) => {
            let id = id
                .or_else(|| curator.playlist().map(str::to_string))
                .ok_or(Error::NoPlaylistSelected)?;
            curator.begin_publish(&id)
        }
        Command::PublishAll => curator.begin_publish_all(),
        Command::SetType(Screen::Search, item_type) => {
            curator.set_search_type(item_type);
            return Ok(());
        }
        Command::SetType(Screen::Summary, item_type) => {
            curator.set_summary_type(item_type);
            print_view(curator, View::Summary(item_type));
            return Ok(());
        }
        Command::Show(view) => {
            print_view(curator, view);
            return Ok(());
        }
        Command::Help => {
            println!("{}", HELP);
            return Ok(());
        }
        Command::Select(_) | Command::Quit => return Ok(()),
    };
    dispatch(curator, worker, pending)
}

fn dispatch(curator: &mut Engine, worker: &WorkerHandle, pending: Pending) -> Result<(), Error> {
    worker.submit(pending)?;
    match worker.complete_next(curator)? {
        Outcome::Loaded { view, .. } => print_view(curator, view),
        Outcome::Refreshed { count } => {
            println!("{} included items", count);
            print_view(curator, View::Summary(curator.summary_type()));
        }
        Outcome::Mutated(report) => {
            println!("now {:?}", report.status);
            for id in &report.excluded_by_name {
                println!("  excluded by name: {}", id);
            }
            for id in &report.released_by_name {
                println!("  released: {}", id);
            }
            if !report.proxied.is_empty() || !report.reset.is_empty() {
                println!(
                    "  {} children updated",
                    report.proxied.len() + report.reset.len()
                );
            }
        }
        Outcome::Playlist(playlist) => println!("{}  {}", playlist.spotify_id, playlist.name),
        Outcome::Acknowledged => println!("ok"),
        Outcome::Superseded => {}
    }
    Ok(())
}

fn print_view(curator: &Engine, view: View) {
    let items = curator.items(view);
    if items.is_empty() {
        println!("(empty)");
    }
    for (index, item) in items.iter().enumerate() {
        println!("{:3}  {}", index, describe(item));
    }
}

fn describe(item: &CatalogItem) -> String {
    let status = format!("{:?}", item.status);
    match &item.sort_hint {
        Some(hint) => format!("{:<14} {}  {} ({})", status, item.id, item.name, hint),
        None => format!("{:<14} {}  {}", status, item.id, item.name),
    }
}

fn parse(line: &str) -> Result<Command, Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let rest = |from: usize| words.get(from..).map(|w| w.join(" ")).unwrap_or_default();

    let command = match words.as_slice() {
        ["playlists"] => Command::Playlists,
        ["select", id] => Command::Select(id.to_string()),
        ["create", _, ..] => Command::Create(rest(1)),
        ["rename", id, _, ..] => Command::Rename(id.to_string(), rest(2)),
        ["delete", id] => Command::Delete(id.to_string()),
        ["type", screen, item_type] => Command::SetType(parse_screen(screen)?, item_type.parse()?),
        ["search", ..] => Command::Search(rest(1)),
        ["expand", screen, item_type, id] => {
            Command::Expand(parse_screen(screen)?, item_type.parse()?, id.to_string())
        }
        ["include" | "exclude", item_type, id] => {
            Command::Toggle(Toggle::new(*id, item_type.parse()?, words[0] == "include"))
        }
        ["undo", decision @ ("include" | "exclude"), item_type, id] => Command::Toggle(
            Toggle::new(*id, item_type.parse()?, *decision == "include").undo(),
        ),
        ["summary"] => Command::Summary,
        ["show", "playlists"] => Command::Show(View::Selection),
        ["show", list, item_type] => {
            let item_type: ItemType = item_type.parse()?;
            Command::Show(match *list {
                "search" => View::Search(item_type),
                "summary" => View::Summary(item_type),
                "browse" => View::Browse(item_type),
                other => return Err(Error::InvalidValue(format!("list {:?}", other))),
            })
        }
        ["publish"] => Command::Publish(None),
        ["publish", id] => Command::Publish(Some(id.to_string())),
        ["publish-all"] => Command::PublishAll,
        ["help"] => Command::Help,
        ["quit" | "exit"] => Command::Quit,
        _ => return Err(Error::InvalidValue(format!("unknown command {:?}", line))),
    };
    Ok(command)
}

fn parse_screen(screen: &str) -> Result<Screen, Error> {
    match screen {
        "search" => Ok(Screen::Search),
        "summary" => Ok(Screen::Summary),
        other => Err(Error::InvalidValue(format!("screen {:?}", other))),
    }
}
