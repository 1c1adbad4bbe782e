//! Line-oriented interactive play on stdin/stdout.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use fb_engine::{GameEvent, GameRunner, Request, RunnerConfig};

const HELP: &str = "\
  look <hotspot>   (l)  look at something
  talk <hotspot>   (t)  talk to someone
  use <hotspot>    (u)  use something
  go <scene>            enter a scene directly
  <number>              pick a dialogue option
  <enter>               continue past a line (with --wait)
  hotspots         (h)  list what is here
  describe         (d)  describe the scene
  inventory        (i)  list carried items
  flags                 list story flags
  save <file>           save the game
  load <file>           load a saved game
  quit             (q)  leave";

enum Flow {
    Continue,
    Quit,
}

pub fn run(acts: &[PathBuf], wait: bool) -> Result<(), String> {
    let config = RunnerConfig::default()
        .with_wait_for_continue(wait)
        .with_event_log(false);
    let mut runner = super::load_runner(acts, config)?;
    runner.bus().subscribe_all(print_event);

    println!(
        "  {} {} act(s). Type 'help' for commands, 'quit' to exit.",
        "Playing".bold(),
        runner.act_count()
    );
    runner.start().map_err(|e| e.to_string())?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();
    let mut shown_scene: Option<String> = None;

    loop {
        let scene = runner.state().current_scene().map(str::to_string);
        if scene != shown_scene {
            describe(&runner);
            shown_scene = scene;
        }
        if runner.is_ended() {
            println!("\n  {}", "The End".bold());
            break;
        }

        let prompt = match runner.pending() {
            Some(Request::Choice(_)) => "choose> ",
            Some(Request::Line(_)) => "... ",
            None => "> ",
        };
        print!("{prompt}");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        match execute(&mut runner, line.trim()) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("{}", e.yellow()),
        }
    }

    Ok(())
}

fn execute(runner: &mut GameRunner, input: &str) -> Result<Flow, String> {
    let (verb, arg) = match input.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (input, ""),
    };

    if let Ok(choice) = verb.parse::<usize>() {
        if !matches!(runner.pending(), Some(Request::Choice(_))) {
            return Err("nothing to choose right now".into());
        }
        runner.select_choice(choice).map_err(|e| e.to_string())?;
        return Ok(Flow::Continue);
    }

    match verb.to_ascii_lowercase().as_str() {
        "" => {
            runner.advance().map_err(|e| e.to_string())?;
        }
        "look" | "l" => {
            let id = hotspot(runner, arg)?;
            runner.look_at(&id).map_err(|e| e.to_string())?;
        }
        "talk" | "t" => {
            let id = hotspot(runner, arg)?;
            runner.talk_to(&id).map_err(|e| e.to_string())?;
        }
        "use" | "u" => {
            let id = hotspot(runner, arg)?;
            runner.use_hotspot(&id).map_err(|e| e.to_string())?;
        }
        "go" => {
            if runner.interpreter().scene(arg).is_none() {
                return Err(format!("no scene named '{arg}'"));
            }
            runner.enter_scene(arg).map_err(|e| e.to_string())?;
        }
        "hotspots" | "h" => print_hotspots(runner),
        "describe" | "d" => describe(runner),
        "inventory" | "inv" | "i" => {
            let items = runner.state().inventory();
            if items.is_empty() {
                println!("  You carry nothing.");
            }
            for item in items {
                println!("  - {item}");
            }
        }
        "flags" => print_flags(runner),
        "save" => {
            let json = runner.save().map_err(|e| e.to_string())?;
            write_file(arg, &json)?;
            println!("  Saved to {arg}.");
        }
        "load" => {
            let json = std::fs::read_to_string(non_empty(arg, "load")?)
                .map_err(|e| format!("cannot read {arg}: {e}"))?;
            runner.load(&json).map_err(|e| e.to_string())?;
            println!("  Loaded {arg}.");
            describe(runner);
        }
        "help" | "?" => println!("{HELP}"),
        "quit" | "q" | "exit" => return Ok(Flow::Quit),
        other => return Err(format!("unknown command '{other}', type 'help'")),
    }
    Ok(Flow::Continue)
}

fn non_empty<'a>(arg: &'a str, verb: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("{verb} what?"))
    } else {
        Ok(arg)
    }
}

/// Resolve a hotspot argument by id or case-insensitive display name.
fn hotspot(runner: &GameRunner, arg: &str) -> Result<String, String> {
    let arg = non_empty(arg, "what")?;
    runner
        .available_hotspots()
        .into_iter()
        .find(|h| h.id == arg || h.name.eq_ignore_ascii_case(arg))
        .map(|h| h.id)
        .ok_or_else(|| format!("there is no '{arg}' here"))
}

fn write_file(path: &str, contents: &str) -> Result<(), String> {
    let path = Path::new(non_empty(path, "save")?);
    std::fs::write(path, contents).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

fn describe(runner: &GameRunner) {
    let Some(scene) = runner.scene() else {
        return;
    };
    let title = scene.location.as_deref().unwrap_or(&scene.id);
    println!("\n  {}", title.bold().underline());
    for line in &scene.description {
        println!("  {}", line.dimmed());
    }
    print_hotspots(runner);
}

fn print_hotspots(runner: &GameRunner) {
    let hotspots = runner.available_hotspots();
    if hotspots.is_empty() {
        return;
    }
    let names: Vec<String> = hotspots
        .iter()
        .map(|h| format!("{} ({})", h.name, h.id))
        .collect();
    println!("  You see: {}", names.join(", "));
}

fn print_flags(runner: &GameRunner) {
    let flags = runner.state().flags();
    if flags.is_empty() {
        println!("  No flags set.");
        return;
    }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Flag", "Value"]);
    for (name, value) in flags {
        table.add_row(vec![name.clone(), value.to_string()]);
    }
    println!("{table}");
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::ActStart { act, .. } => println!("\n  {}", format!("Act {act}").bold()),
        GameEvent::DialogueLine {
            speaker,
            text,
            thinks,
        } => print_line(speaker.as_deref(), text, *thinks, false),
        GameEvent::CutsceneLine {
            speaker,
            text,
            thinks,
        } => print_line(speaker.as_deref(), text, *thinks, true),
        GameEvent::DialogueChoice { options } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {option}", i + 1);
            }
        }
        GameEvent::InventoryAdd { item } => println!("  {}", format!("+ {item}").green()),
        GameEvent::InventoryRemove { item } => println!("  {}", format!("- {item}").red()),
        GameEvent::GameEnd { ending } => println!("  {}", format!("[{ending}]").dimmed()),
        _ => {}
    }
}

fn print_line(speaker: Option<&str>, text: &str, thinks: bool, cutscene: bool) {
    let text = if thinks || cutscene {
        text.italic()
    } else {
        text.normal()
    };
    match speaker {
        Some(speaker) if thinks => println!("  {} {text}", format!("{speaker} (thinks):").bold()),
        Some(speaker) => println!("  {} {text}", format!("{speaker}:").bold()),
        None => println!("  {text}"),
    }
}
