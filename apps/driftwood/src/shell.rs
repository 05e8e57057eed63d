use anyhow::{anyhow, bail};
use client_core::{
    ClientError, FilterMode, ParticipantField, ParticipantId, SimulationLab,
};
use shared::{domain::RunId, protocol::RunRecord};

use crate::{console::Console, render};

pub const HELP: &str = "\
Views:      view <scenario|conversation|history>, close
Draft:      name <text>, prompt <text>, model <name>, temperature <n>, max-tokens <n>
            add, remove <#>, set <#> <name|role|perspective|message> <text>,
            tag <#> <1-3> [text], draft, submit
History:    filter <all|starred>, open <run>, star <run>, unstar <run>,
            delete <run>, purge
Other:      help, quit
Runs are addressed by id or by a unique id prefix.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    View(String),
    Name(String),
    Prompt(String),
    Model(String),
    Temperature(f64),
    MaxTokens(u32),
    Add,
    Remove(usize),
    Set {
        ordinal: usize,
        field: ParticipantField,
        value: String,
    },
    Tag {
        ordinal: usize,
        index: usize,
        value: String,
    },
    Draft,
    Submit,
    Filter(FilterMode),
    Star(String),
    Unstar(String),
    Open(String),
    Delete(String),
    Purge,
    Close,
    Help,
    Quit,
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn ordinal(raw: Option<&str>, usage: &str) -> Result<usize, String> {
    raw.and_then(|raw| raw.parse::<usize>().ok())
        .filter(|ordinal| *ordinal >= 1)
        .ok_or_else(|| format!("usage: {usage}"))
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Ok(Command::Empty),
        "view" => required(rest, "view <scenario|conversation|history>").map(Command::View),
        "name" => Ok(Command::Name(rest.to_string())),
        "prompt" => Ok(Command::Prompt(rest.to_string())),
        "model" => required(rest, "model <name>").map(Command::Model),
        "temperature" => rest
            .parse()
            .map(Command::Temperature)
            .map_err(|_| "usage: temperature <number>".to_string()),
        "max-tokens" | "max_tokens" => rest
            .parse()
            .map(Command::MaxTokens)
            .map_err(|_| "usage: max-tokens <whole number>".to_string()),
        "add" => Ok(Command::Add),
        "remove" => ordinal(Some(rest), "remove <participant #>").map(Command::Remove),
        "set" => {
            const USAGE: &str = "set <participant #> <name|role|perspective|message> <text>";
            let mut parts = rest.splitn(3, char::is_whitespace);
            let ordinal = ordinal(parts.next(), USAGE)?;
            let field = parts
                .next()
                .ok_or_else(|| format!("usage: {USAGE}"))?
                .parse::<ParticipantField>()?;
            let value = parts.next().unwrap_or_default().trim().to_string();
            Ok(Command::Set {
                ordinal,
                field,
                value,
            })
        }
        "tag" => {
            const USAGE: &str = "tag <participant #> <1-3> [text]";
            let mut parts = rest.splitn(3, char::is_whitespace);
            let ordinal = ordinal(parts.next(), USAGE)?;
            let slot = parts
                .next()
                .and_then(|raw| raw.parse::<usize>().ok())
                .filter(|slot| (1..=3).contains(slot))
                .ok_or_else(|| format!("usage: {USAGE}"))?;
            let value = parts.next().unwrap_or_default().trim().to_string();
            Ok(Command::Tag {
                ordinal,
                index: slot - 1,
                value,
            })
        }
        "draft" => Ok(Command::Draft),
        "submit" => Ok(Command::Submit),
        "filter" => rest.parse().map(Command::Filter),
        "star" => required(rest, "star <run>").map(Command::Star),
        "unstar" => required(rest, "unstar <run>").map(Command::Unstar),
        "open" => required(rest, "open <run>").map(Command::Open),
        "delete" => required(rest, "delete <run>").map(Command::Delete),
        "purge" => Ok(Command::Purge),
        "close" => Ok(Command::Close),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'; type `help`")),
    }
}

pub fn match_run(runs: &[RunRecord], needle: &str) -> Result<RunId, String> {
    let needle = needle.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err("a run id or prefix is required".to_string());
    }
    let matches = runs
        .iter()
        .map(|run| run.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(format!("no run matches '{needle}'")),
        many => Err(format!(
            "'{needle}' matches {} runs; use a longer prefix",
            many.len()
        )),
    }
}

async fn ensure_runs_loaded(lab: &SimulationLab, console: &mut Console) -> anyhow::Result<()> {
    if lab.cached_runs().await.is_some() {
        return Ok(());
    }
    match lab.refresh_history().await {
        Ok(_) => {
            console.discard();
            Ok(())
        }
        Err(err) => {
            console.flush();
            Err(err.into())
        }
    }
}

pub async fn resolve_run(
    lab: &SimulationLab,
    console: &mut Console,
    needle: &str,
) -> anyhow::Result<RunId> {
    if let Ok(id) = needle.trim().parse::<RunId>() {
        return Ok(id);
    }
    ensure_runs_loaded(lab, console).await?;
    let runs = lab.cached_runs().await.unwrap_or_default();
    match_run(&runs, needle).map_err(|message| anyhow!(message))
}

pub async fn delete_with_confirmation(
    lab: &SimulationLab,
    console: &mut Console,
    id: RunId,
    assume_yes: bool,
) -> anyhow::Result<()> {
    if !assume_yes
        && !console
            .confirm("Are you sure you want to delete this simulation run?")
            .await?
    {
        println!("Cancelled.");
        return Ok(());
    }
    lab.delete_run(id).await?;
    Ok(())
}

pub async fn purge_with_confirmation(
    lab: &SimulationLab,
    console: &mut Console,
    assume_yes: bool,
) -> anyhow::Result<()> {
    ensure_runs_loaded(lab, console).await?;
    let count = lab.unstarred_count().await;
    if count > 0
        && !assume_yes
        && !console
            .confirm(&format!(
                "Are you sure you want to delete all {count} unstarred simulation runs? \
                 This action cannot be undone."
            ))
            .await?
    {
        println!("Cancelled.");
        return Ok(());
    }
    lab.delete_all_unstarred().await?;
    Ok(())
}

/// Lab failures were already published as notices; anything else, such as a
/// closed stdin, still surfaces.
fn unless_notified(result: anyhow::Result<()>) -> anyhow::Result<()> {
    match result {
        Err(err) if err.downcast_ref::<ClientError>().is_some() => Ok(()),
        other => other,
    }
}

async fn participant_at(lab: &SimulationLab, ordinal: usize) -> anyhow::Result<ParticipantId> {
    lab.draft_snapshot()
        .await
        .id_at(ordinal)
        .ok_or_else(|| anyhow!("there is no participant {ordinal}"))
}

async fn execute(lab: &SimulationLab, console: &mut Console, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{HELP}"),
        Command::View(name) => {
            if !lab.show_view(&name).await {
                bail!("unknown view '{name}' (scenario, conversation, history)");
            }
        }
        Command::Name(name) => lab.set_scenario_name(&name).await,
        Command::Prompt(prompt) => lab.set_system_prompt(&prompt).await,
        Command::Model(model) => {
            let mut settings = lab.draft_snapshot().await.settings;
            settings.model = model;
            lab.set_settings(settings).await;
        }
        Command::Temperature(temperature) => {
            let mut settings = lab.draft_snapshot().await.settings;
            settings.temperature = temperature;
            lab.set_settings(settings).await;
        }
        Command::MaxTokens(max_tokens) => {
            let mut settings = lab.draft_snapshot().await.settings;
            settings.max_tokens = max_tokens;
            lab.set_settings(settings).await;
        }
        Command::Add => {
            lab.add_participant().await;
        }
        Command::Remove(ordinal) => {
            let id = participant_at(lab, ordinal).await?;
            lab.remove_participant(id).await;
        }
        Command::Set {
            ordinal,
            field,
            value,
        } => {
            let id = participant_at(lab, ordinal).await?;
            lab.update_participant(id, field, &value).await;
        }
        Command::Tag {
            ordinal,
            index,
            value,
        } => {
            let id = participant_at(lab, ordinal).await?;
            lab.update_meta_tag(id, index, &value).await?;
        }
        Command::Draft => println!("{}", render::draft(&lab.draft_snapshot().await)),
        Command::Submit => {
            if let Err(ClientError::Validation(failure)) = lab.submit_draft().await {
                console.flush();
                println!(
                    "Missing: {}",
                    failure
                        .issues
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        Command::Filter(mode) => {
            lab.set_history_filter(mode).await;
            if lab.history_view().await.is_none() {
                println!("Filter set to {mode}; open the history view to load runs.");
            }
        }
        Command::Star(needle) => {
            let id = resolve_run(lab, console, &needle).await?;
            ensure_runs_loaded(lab, console).await?;
            let _ = lab.toggle_star(id, true).await;
        }
        Command::Unstar(needle) => {
            let id = resolve_run(lab, console, &needle).await?;
            ensure_runs_loaded(lab, console).await?;
            let _ = lab.toggle_star(id, false).await;
        }
        Command::Open(needle) => {
            let id = resolve_run(lab, console, &needle).await?;
            let _ = lab.view_run(id).await;
        }
        Command::Delete(needle) => {
            let id = resolve_run(lab, console, &needle).await?;
            unless_notified(delete_with_confirmation(lab, console, id, false).await)?;
        }
        Command::Purge => {
            unless_notified(purge_with_confirmation(lab, console, false).await)?;
        }
        Command::Close => lab.close_conversation().await,
    }
    Ok(())
}

pub async fn run(lab: &SimulationLab, console: &mut Console) -> anyhow::Result<()> {
    lab.start().await;
    console.flush();
    println!("Type `help` for commands.");

    while let Some(line) = console.read_line("driftwood> ").await? {
        match parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = execute(lab, console, command).await {
                    console.flush();
                    println!("{err:#}");
                }
            }
            Err(message) => println!("{message}"),
        }
        console.flush();
    }
    Ok(())
}
