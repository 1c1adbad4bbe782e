use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use fb_engine::interpreter::is_sentinel;
use fb_script::diagnostics::render_diagnostics;
use fb_script::{Diagnostic, Script, Stmt};

pub fn run(files: &[PathBuf], strict: bool) -> Result<(), String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Scenes", "Dialogues", "Triggers", "Warnings"]);

    let mut failed = 0;
    let mut warnings = 0;

    for path in files {
        let filename = path.display().to_string();
        let (source, script, diagnostics) = match check_file(path) {
            Ok(checked) => checked,
            Err(e) => {
                eprintln!("  {} {e}", "FAIL".red().bold());
                failed += 1;
                table.add_row(vec![filename, "-".into(), "-".into(), "-".into(), "-".into()]);
                continue;
            }
        };

        if !diagnostics.is_empty() {
            eprint!("{}", render_diagnostics(&source, &filename, &diagnostics));
        }
        warnings += diagnostics.len();
        table.add_row(vec![
            filename,
            script.scenes.len().to_string(),
            script.dialogues.len().to_string(),
            script.triggers.len().to_string(),
            diagnostics.len().to_string(),
        ]);
    }

    println!("{table}");
    println!();

    if failed > 0 {
        return Err(format!("{failed} file(s) could not be loaded"));
    }
    if warnings == 0 {
        println!("  {} All checks passed.", "OK".green().bold());
        return Ok(());
    }

    println!(
        "  {} warning{}",
        warnings,
        if warnings == 1 { "" } else { "s" }
    );
    if strict {
        return Err("warnings reported in strict mode".into());
    }
    Ok(())
}

/// Parse one file and add warnings for GOTO targets it cannot resolve.
fn check_file(path: &Path) -> Result<(String, Script, Vec<Diagnostic>), String> {
    let source = super::read_story(path)?;
    let parsed = fb_script::parse(&source).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(unresolved_gotos(&parsed.script));
    diagnostics.sort_by_key(|d| d.span.start);
    Ok((source, parsed.script, diagnostics))
}

fn resolves(script: &Script, target: &str) -> bool {
    is_sentinel(target)
        || script.dialogue(target).is_some()
        || script.trigger(target).is_some()
        || script.scene(target).is_some()
}

fn unresolved_gotos(script: &Script) -> Vec<Diagnostic> {
    let statements = script.arena.nodes().filter_map(|node| match &node.stmt {
        Stmt::Goto { target } => Some((target.as_str(), node.span.clone())),
        _ => None,
    });
    let triggers = script
        .triggers
        .values()
        .filter_map(|t| t.goto.as_deref().map(|target| (target, t.span.clone())));

    statements
        .chain(triggers)
        .filter(|(target, _)| !resolves(script, target))
        .map(|(target, span)| {
            Diagnostic::warning(span, format!("unknown goto target `{target}`"))
                .with_label("no dialogue, trigger or scene has this id")
        })
        .collect()
}
