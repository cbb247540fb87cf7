use anyhow::Result;
use std::fmt::Write as _;
use std::io::{self, BufRead, BufReader, Write};

use crate::client::{RegistryClient, RepoCommand};
use crate::repos::{FilterTermSet, RepositoryIndex, filter_repo_map, flatten_repo_map};
use crate::tui::tag_selector::subtitle;

pub const HELP: &str = "/help                     Show help
/list [term...]           Fetch repositories, optionally filtered
/index                    Show every searchable name and tag
/deploy <repo> <tag>      Pin and deploy a tag
/auto <repo> on|off       Toggle auto-deploy
/reset <repo>             Re-enable auto-deploy and track versioned tags
/quit                     Quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Help,
    Quit,
    List(Vec<String>),
    Index,
    Run(RepoCommand),
    Usage(&'static str),
    Unknown(String),
}

/// Parses one input line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<LineCommand> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let args: Vec<&str> = parts.collect();
    let cmd = match (head, args.as_slice()) {
        ("/help", _) => LineCommand::Help,
        ("/quit" | "/exit", _) => LineCommand::Quit,
        ("/list", terms) => LineCommand::List(terms.iter().map(|s| s.to_string()).collect()),
        ("/index", _) => LineCommand::Index,
        ("/deploy", [repo, tag]) => LineCommand::Run(RepoCommand::deploy(*repo, *tag)),
        ("/deploy", _) => LineCommand::Usage("usage: /deploy <repo> <tag>"),
        ("/auto", [repo, flag]) => match *flag {
            "on" | "true" => LineCommand::Run(RepoCommand::auto_deploy(*repo, true)),
            "off" | "false" => LineCommand::Run(RepoCommand::auto_deploy(*repo, false)),
            _ => LineCommand::Usage("usage: /auto <repo> on|off"),
        },
        ("/auto", _) => LineCommand::Usage("usage: /auto <repo> on|off"),
        ("/reset", [repo]) => LineCommand::Run(RepoCommand::reset(*repo)),
        ("/reset", _) => LineCommand::Usage("usage: /reset <repo>"),
        _ => LineCommand::Unknown(line.trim().to_string()),
    };
    Some(cmd)
}

pub fn format_index(index: &RepositoryIndex) -> String {
    if index.is_empty() {
        return "(no repositories)\n".to_string();
    }
    let mut out = String::new();
    for (name, record) in index {
        let auto = if record.auto_deploy { "on" } else { "off" };
        let _ = writeln!(out, "{name}  [{}]  auto-deploy: {auto}", subtitle(record));
        let _ = writeln!(out, "    tags: {}", record.tags.join(", "));
    }
    out
}

pub async fn run_line_mode(client: RegistryClient) -> Result<()> {
    println!("rdash (line mode) - type /help for commands");
    let reader = BufReader::new(io::stdin()).lines();

    for line in reader {
        let line = line?;
        let Some(cmd) = parse_line(&line) else {
            continue;
        };
        match cmd {
            LineCommand::Help => println!("{HELP}"),
            LineCommand::Quit => break,
            LineCommand::Usage(usage) => eprintln!("{usage}"),
            LineCommand::Unknown(text) => eprintln!("unknown command: {text} (try /help)"),
            LineCommand::List(terms) => match client.fetch_repos().await {
                Ok(index) => {
                    let terms: FilterTermSet = terms.iter().collect();
                    print!("{}", format_index(&filter_repo_map(&index, &terms)));
                }
                Err(e) => eprintln!("list error: {e}"),
            },
            LineCommand::Index => match client.fetch_repos().await {
                Ok(index) => {
                    for term in flatten_repo_map(&index) {
                        println!("{term}");
                    }
                }
                Err(e) => eprintln!("index error: {e}"),
            },
            LineCommand::Run(cmd) => match client.execute(&cmd).await {
                Ok(()) => println!("{}: {} accepted", cmd.repo, cmd.action),
                Err(e) => eprintln!("{}: {} failed: {e}", cmd.repo, cmd.action),
            },
        }
        io::stdout().flush()?;
    }
    Ok(())
}
