//! Line-oriented block parser for story text.
//!
//! Every block keyword opens a body that runs to its own `END`, so nested
//! blocks of the same kind (IF in IF, CHOICE in CHOICE) close innermost-first.
//! The parser never fails on malformed content: problems become warnings and
//! the parse continues, with placeholder ids where a header lacks one.

use tracing::debug;

use crate::ast::{
    ChoiceOption, Dialogue, Hotspot, Node, NodeId, Requirement, Scene, Script, Span, Stmt, Trigger,
};
use crate::condition::Condition;
use crate::diagnostics::Diagnostic;
use crate::error::{LoadError, LoadResult};
use crate::value::{FlagValue, unquote};

/// Keywords that can only start a top-level definition.
const TOP_LEVEL: &[&str] = &["SCENE", "DIALOGUE", "TRIGGER"];

/// Keywords that open a body closed by `END`.
const BLOCK_OPENERS: &[&str] = &[
    "IF",
    "CHOICE",
    "HOTSPOT",
    "DESCRIPTION",
    "ON_ENTER",
    "LOOK",
    "TALK",
    "USE",
    "CUTSCENE",
];

/// The output of a successful load.
#[derive(Debug, Clone)]
pub struct Parsed {
    /// Scenes, dialogues and triggers.
    pub script: Script,
    /// Structural warnings collected while parsing.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse story text.
///
/// Fails only when the text is empty or whitespace; everything else loads,
/// with warnings for what had to be skipped or patched.
pub fn parse(source: &str) -> LoadResult<Parsed> {
    if source.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let mut parser = Parser {
        lines: split_lines(source),
        pos: 0,
        script: Script::default(),
        diagnostics: Vec::new(),
        placeholders: 0,
    };
    parser.parse_top_level();

    Ok(Parsed {
        script: parser.script,
        diagnostics: parser.diagnostics,
    })
}

/// A meaningful (non-blank, non-comment) source line.
#[derive(Debug, Clone)]
struct Line<'a> {
    indent: usize,
    text: &'a str,
    span: Span,
}

impl<'a> Line<'a> {
    fn keyword(&self) -> (&'a str, &'a str) {
        match self.text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (self.text, ""),
        }
    }
}

fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for raw in source.split_inclusive('\n') {
        let content = raw.trim_end_matches(['\n', '\r']);
        let body = content.trim_start();
        let indent = content.len() - body.len();
        let text = body.trim_end();
        if !text.is_empty() && !text.starts_with('#') {
            let start = offset + indent;
            lines.push(Line {
                indent,
                text,
                span: start..start + text.len(),
            });
        }
        offset += raw.len();
    }

    lines
}

/// Why a statement list stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// An `END` belonging to the open block.
    End,
    /// An `ELSE` belonging to the open IF.
    Else,
    /// A sibling `>` option of the open CHOICE.
    Option,
    /// End of input, a shallower `END`, or a new top-level definition.
    Unterminated,
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    script: Script,
    diagnostics: Vec<Diagnostic>,
    placeholders: usize,
}

impl<'a> Parser<'a> {
    fn parse_top_level(&mut self) {
        while let Some(line) = self.advance() {
            match line.keyword() {
                ("SCENE", rest) => self.parse_scene(&line, rest),
                ("DIALOGUE", rest) => self.parse_dialogue(&line, rest),
                ("TRIGGER", rest) => self.parse_trigger(&line, rest),
                _ => debug!(line = line.text, "skipping top-level line"),
            }
        }
    }

    fn advance(&mut self) -> Option<Line<'a>> {
        let line = self.lines.get(self.pos).cloned();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn warn(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(span, message));
    }

    fn placeholder(&mut self, kind: &str) -> String {
        self.placeholders += 1;
        format!("{kind}_{}", self.placeholders)
    }

    /// Check whether the current line ends the body opened at `opener_indent`.
    fn stop_at(&self, opener_indent: usize, allow_else: bool, allow_option: bool) -> Option<Stop> {
        let Some(line) = self.lines.get(self.pos) else {
            return Some(Stop::Unterminated);
        };
        let (keyword, _) = line.keyword();
        if keyword == "END" {
            return Some(if line.indent < opener_indent {
                Stop::Unterminated
            } else {
                Stop::End
            });
        }
        if TOP_LEVEL.contains(&keyword) {
            return Some(Stop::Unterminated);
        }
        if allow_else && keyword == "ELSE" {
            return Some(Stop::Else);
        }
        if allow_option && line.text.starts_with('>') {
            return Some(Stop::Option);
        }
        None
    }

    /// Consume the `END` of a block, or warn that it is missing.
    fn close(&mut self, stop: Stop, opener: &Line<'_>, what: &str) {
        match stop {
            Stop::End => self.pos += 1,
            Stop::Unterminated => {
                let span = opener.span.clone();
                self.diagnostics.push(
                    Diagnostic::warning(span, format!("{what} block is missing END"))
                        .with_label("block closed here"),
                );
            }
            Stop::Else | Stop::Option => {}
        }
    }

    /// Parse statements until something closes the body opened by `opener`.
    fn statements(
        &mut self,
        opener: &Line<'_>,
        allow_else: bool,
        allow_option: bool,
    ) -> (Vec<NodeId>, Stop) {
        let mut ids = Vec::new();
        loop {
            if let Some(stop) = self.stop_at(opener.indent, allow_else, allow_option) {
                return (ids, stop);
            }
            let Some(line) = self.advance() else {
                return (ids, Stop::Unterminated);
            };
            if let Some(id) = self.statement(&line) {
                ids.push(id);
            }
        }
    }

    /// Skip a line that does not belong where it was written, including the
    /// whole body when it opens a block.
    fn skip_unexpected(&mut self, line: &Line<'_>, context: &str) {
        let (keyword, _) = line.keyword();
        self.warn(
            line.span.clone(),
            format!("unexpected line in {context}: `{}`", line.text),
        );
        if BLOCK_OPENERS.contains(&keyword) {
            let (_, stop) = self.statements(line, false, false);
            if stop != Stop::Unterminated {
                self.pos += 1;
            }
        }
    }

    fn alloc(&mut self, stmt: Stmt, line: &Line<'_>) -> NodeId {
        self.script.arena.alloc(Node {
            stmt,
            span: line.span.clone(),
        })
    }

    fn statement(&mut self, line: &Line<'_>) -> Option<NodeId> {
        if let Some(target) = line.text.strip_prefix("->") {
            let target = target.trim();
            if target.is_empty() {
                self.warn(line.span.clone(), "GOTO without a target");
                return None;
            }
            let stmt = Stmt::Goto {
                target: target.to_string(),
            };
            return Some(self.alloc(stmt, line));
        }

        match line.keyword() {
            ("IF", rest) => Some(self.parse_if(line, rest)),
            ("CHOICE", _) => Some(self.parse_choice(line)),
            ("GIVE", item) => {
                if item.is_empty() {
                    self.warn(line.span.clone(), "GIVE without an item");
                    return None;
                }
                let stmt = Stmt::Give {
                    item: item.to_string(),
                };
                Some(self.alloc(stmt, line))
            }
            ("SET", rest) => {
                let Some((name, value)) = rest.split_once('=') else {
                    self.warn(line.span.clone(), "SET needs the form `SET name = value`");
                    return None;
                };
                let name = name.trim();
                if name.is_empty() {
                    self.warn(line.span.clone(), "SET without a flag name");
                    return None;
                }
                let stmt = Stmt::Set {
                    name: name.to_string(),
                    value: FlagValue::from_literal(value),
                };
                Some(self.alloc(stmt, line))
            }
            _ => {
                if let Some(stmt) = dialogue_line(line.text) {
                    return Some(self.alloc(stmt, line));
                }
                if let Some(text) = quoted(line.text) {
                    let stmt = Stmt::Narration {
                        text: text.to_string(),
                    };
                    return Some(self.alloc(stmt, line));
                }
                self.skip_unexpected(line, "a line block");
                None
            }
        }
    }

    fn parse_if(&mut self, line: &Line<'_>, source: &str) -> NodeId {
        let condition = match Condition::parse(source) {
            Ok(condition) => condition,
            Err(e) => {
                self.diagnostics.push(
                    Diagnostic::warning(line.span.clone(), format!("invalid IF condition: {e}"))
                        .with_label("treated as false"),
                );
                Condition::Literal(false)
            }
        };

        let (then_ids, stop) = self.statements(line, true, false);
        let mut else_ids = None;
        let stop = if stop == Stop::Else {
            if let Some(else_line) = self.advance() {
                if !else_line.keyword().1.is_empty() {
                    self.warn(else_line.span.clone(), "text after ELSE is ignored");
                }
            }
            let (ids, stop) = self.statements(line, false, false);
            else_ids = Some(ids);
            stop
        } else {
            stop
        };
        self.close(stop, line, "IF");

        let then_branch = self.script.arena.seal(then_ids);
        let else_branch = else_ids.map(|ids| self.script.arena.seal(ids));
        self.alloc(
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            },
            line,
        )
    }

    fn parse_choice(&mut self, line: &Line<'_>) -> NodeId {
        let mut options = Vec::new();

        loop {
            match self.stop_at(line.indent, false, true) {
                Some(Stop::Option) => {
                    let Some(option_line) = self.advance() else {
                        break;
                    };
                    let raw = option_line.text[1..].trim();
                    let text = quoted(raw).unwrap_or(raw).to_string();
                    let (ids, stop) = self.statements(line, false, true);
                    let body = self.script.arena.seal(ids);
                    options.push(ChoiceOption { text, body });
                    if stop != Stop::Option {
                        self.close(stop, line, "CHOICE");
                        break;
                    }
                }
                Some(stop) => {
                    self.close(stop, line, "CHOICE");
                    break;
                }
                None => {
                    let Some(stray) = self.advance() else {
                        break;
                    };
                    self.warn(stray.span.clone(), "line before the first CHOICE option is ignored");
                    self.statement(&stray);
                }
            }
        }

        if options.is_empty() {
            self.warn(line.span.clone(), "CHOICE without options");
        }
        self.alloc(Stmt::Choice { options }, line)
    }

    /// Collect raw text lines up to `END`, unquoting quoted ones.
    fn raw_text(&mut self, opener: &Line<'_>, what: &str) -> Vec<String> {
        let mut text = Vec::new();
        let stop = loop {
            if let Some(stop) = self.stop_at(opener.indent, false, false) {
                break stop;
            }
            let Some(line) = self.advance() else {
                break Stop::Unterminated;
            };
            text.push(quoted(line.text).unwrap_or(line.text).to_string());
        };
        self.close(stop, opener, what);
        text
    }

    fn parse_scene(&mut self, line: &Line<'_>, header: &str) {
        let (id, label) = match header.split_once(char::is_whitespace) {
            Some((id, label)) => (id.trim_end_matches(':'), Some(label.trim())),
            None => (header.trim_end_matches(':'), None),
        };
        let id = if id.is_empty() || id.starts_with('"') {
            let placeholder = self.placeholder("scene");
            self.diagnostics.push(
                Diagnostic::warning(line.span.clone(), "SCENE without an id")
                    .with_label(format!("using `{placeholder}`")),
            );
            placeholder
        } else {
            id.to_string()
        };

        let mut scene = Scene {
            id: id.clone(),
            location: label
                .filter(|l| !l.is_empty())
                .map(|l| quoted(l).unwrap_or(l).to_string()),
            description: Vec::new(),
            on_enter: Default::default(),
            hotspots: Default::default(),
            span: line.span.clone(),
        };
        let mut on_enter = Vec::new();

        loop {
            if let Some(stop) = self.stop_at(line.indent, false, false) {
                self.close(stop, line, "SCENE");
                break;
            }
            let Some(inner) = self.advance() else {
                break;
            };
            match inner.keyword() {
                ("DESCRIPTION", _) => {
                    let text = self.raw_text(&inner, "DESCRIPTION");
                    scene.description.extend(text);
                }
                ("ON_ENTER", _) => {
                    let (ids, stop) = self.statements(&inner, false, false);
                    self.close(stop, &inner, "ON_ENTER");
                    on_enter.extend(ids);
                }
                ("HOTSPOT", rest) => {
                    let hotspot = self.parse_hotspot(&inner, rest);
                    if scene.hotspots.contains_key(&hotspot.id) {
                        debug!(scene = %id, hotspot = %hotspot.id, "duplicate hotspot id, later definition wins");
                    }
                    scene.hotspots.insert(hotspot.id.clone(), hotspot);
                }
                ("LOCATION", rest) => {
                    let rest = rest.trim_start_matches(':').trim();
                    scene.location = Some(quoted(rest).unwrap_or(rest).to_string());
                }
                _ => self.skip_unexpected(&inner, "SCENE"),
            }
        }

        scene.on_enter = self.script.arena.seal(on_enter);
        if self.script.scenes.contains_key(&id) {
            debug!(scene = %id, "duplicate scene id, later definition wins");
        }
        self.script.scenes.insert(id, scene);
    }

    fn parse_hotspot(&mut self, line: &Line<'_>, header: &str) -> Hotspot {
        let (id, name) = hotspot_header(header);
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let placeholder = self.placeholder("hotspot");
                self.diagnostics.push(
                    Diagnostic::warning(line.span.clone(), "HOTSPOT without an id")
                        .with_label(format!("using `{placeholder}`")),
                );
                placeholder
            }
        };
        let mut name = name.map(str::to_string).unwrap_or_else(|| id.clone());
        let mut look = Vec::new();
        let mut talk = Vec::new();
        let mut on_use = Vec::new();

        loop {
            if let Some(stop) = self.stop_at(line.indent, false, false) {
                self.close(stop, line, "HOTSPOT");
                break;
            }
            let Some(inner) = self.advance() else {
                break;
            };
            let (keyword, rest) = inner.keyword();
            let target = match keyword {
                "LOOK" => &mut look,
                "TALK" => &mut talk,
                "USE" => &mut on_use,
                "NAME" => {
                    let rest = rest.trim_start_matches(':').trim();
                    name = quoted(rest).unwrap_or(rest).to_string();
                    continue;
                }
                _ => {
                    self.skip_unexpected(&inner, "HOTSPOT");
                    continue;
                }
            };
            let (ids, stop) = self.statements(&inner, false, false);
            target.extend(ids);
            self.close(stop, &inner, keyword);
        }

        let arena = &mut self.script.arena;
        Hotspot {
            id,
            name,
            look: arena.seal(look),
            talk: arena.seal(talk),
            on_use: arena.seal(on_use),
        }
    }

    fn parse_dialogue(&mut self, line: &Line<'_>, header: &str) {
        let id = match first_word(header) {
            Some(id) => id.to_string(),
            None => {
                let placeholder = self.placeholder("dialogue");
                self.warn(line.span.clone(), "DIALOGUE without an id");
                placeholder
            }
        };
        let (ids, stop) = self.statements(line, false, false);
        self.close(stop, line, "DIALOGUE");
        let body = self.script.arena.seal(ids);

        if self.script.dialogues.contains_key(&id) {
            debug!(dialogue = %id, "duplicate dialogue id, later definition wins");
        }
        self.script.dialogues.insert(
            id.clone(),
            Dialogue {
                id,
                body,
                span: line.span.clone(),
            },
        );
    }

    fn parse_trigger(&mut self, line: &Line<'_>, header: &str) {
        let id = match first_word(header) {
            Some(id) => id.to_string(),
            None => {
                let placeholder = self.placeholder("trigger");
                self.warn(line.span.clone(), "TRIGGER without an id");
                placeholder
            }
        };
        let mut requires = Vec::new();
        let mut cutscene = Vec::new();
        let mut goto: Option<String> = None;

        loop {
            if let Some(stop) = self.stop_at(line.indent, false, false) {
                self.close(stop, line, "TRIGGER");
                break;
            }
            let Some(inner) = self.advance() else {
                break;
            };
            if let Some(target) = inner.text.strip_prefix("->") {
                let target = target.trim();
                if goto.is_some() {
                    self.warn(inner.span.clone(), "TRIGGER has more than one GOTO, the last one wins");
                }
                goto = Some(target.to_string()).filter(|t| !t.is_empty());
                continue;
            }
            match inner.keyword() {
                ("REQUIRE", source) => {
                    let condition = match Condition::parse(source) {
                        Ok(condition) => condition,
                        Err(e) => {
                            self.diagnostics.push(
                                Diagnostic::warning(
                                    inner.span.clone(),
                                    format!("invalid REQUIRE condition: {e}"),
                                )
                                .with_label("never satisfied"),
                            );
                            Condition::Literal(false)
                        }
                    };
                    requires.push(Requirement {
                        source: source.to_string(),
                        condition,
                    });
                }
                ("CUTSCENE", _) => {
                    let (ids, stop) = self.statements(&inner, false, false);
                    self.close(stop, &inner, "CUTSCENE");
                    cutscene.extend(ids);
                }
                _ => self.skip_unexpected(&inner, "TRIGGER"),
            }
        }

        let cutscene = self.script.arena.seal(cutscene);
        if self.script.triggers.contains_key(&id) {
            debug!(trigger = %id, "duplicate trigger id, later definition wins");
        }
        self.script.triggers.insert(
            id.clone(),
            Trigger {
                id,
                requires,
                cutscene,
                goto,
                span: line.span.clone(),
            },
        );
    }
}

fn first_word(header: &str) -> Option<&str> {
    header
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches(':'))
        .filter(|w| !w.is_empty() && !w.starts_with('"'))
}

/// Split a hotspot header into id and display name.
///
/// Accepts `id "Name"`, `id: Name` and a bare `id`.
fn hotspot_header(header: &str) -> (Option<&str>, Option<&str>) {
    let header = header.trim();
    if header.starts_with('"') {
        return (None, quoted(header));
    }

    let (first, rest) = header
        .split_once(char::is_whitespace)
        .unwrap_or((header, ""));
    let (id, name) = match first.split_once(':') {
        Some((id, after)) => (id, if after.is_empty() { rest } else { after }),
        None => (first, rest.trim_start().trim_start_matches(':')),
    };
    let name = name.trim();
    let id = Some(id).filter(|id| !id.is_empty());
    let name = Some(quoted(name).unwrap_or(name)).filter(|n| !n.is_empty());
    (id, name)
}

/// The inside of a double-quoted string literal.
fn quoted(text: &str) -> Option<&str> {
    if text.starts_with('"') {
        unquote(text)
    } else {
        None
    }
}

/// `speaker: "text"` or `speaker (thinks): "text"`.
fn dialogue_line(text: &str) -> Option<Stmt> {
    if text.starts_with('"') {
        return None;
    }
    let (speaker, said) = text.split_once(':')?;
    let said = quoted(said.trim())?;
    let speaker = speaker.trim();
    let (speaker, thinks) = match speaker.strip_suffix("(thinks)") {
        Some(name) => (name.trim_end(), true),
        None => (speaker, false),
    };
    if speaker.is_empty() {
        return None;
    }
    Some(Stmt::Dialogue {
        speaker: speaker.to_string(),
        text: said.to_string(),
        thinks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Arena, Block, Verb};

    fn parse_ok(source: &str) -> Parsed {
        parse(source).expect("story should load")
    }

    fn kinds(arena: &Arena, block: Block) -> Vec<&'static str> {
        arena
            .iter(block)
            .map(|n| match n.stmt {
                Stmt::Give { .. } => "give",
                Stmt::Set { .. } => "set",
                Stmt::Goto { .. } => "goto",
                Stmt::If { .. } => "if",
                Stmt::Choice { .. } => "choice",
                Stmt::Dialogue { .. } => "dialogue",
                Stmt::Narration { .. } => "narration",
            })
            .collect()
    }

    #[test]
    fn empty_content_is_a_load_error() {
        assert_eq!(parse("").unwrap_err(), LoadError::Empty);
        assert_eq!(parse("  \n\t\n").unwrap_err(), LoadError::Empty);
    }

    #[test]
    fn scene_with_hotspots() {
        let parsed = parse_ok(
            r#"
# The opening scene
SCENE cellar "Damp Cellar"
    DESCRIPTION
        "Water drips from the ceiling."
        A rat scurries past.
    END
    ON_ENTER
        SET visited_cellar = true
    END
    HOTSPOT barrel "Old Barrel"
        LOOK
            "It smells of vinegar."
        END
        USE
            GIVE key
        END
    END
    HOTSPOT door: Iron Door
        TALK
            Player: "Hello, door."
        END
    END
END
"#,
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let script = &parsed.script;
        let scene = script.scene("cellar").unwrap();
        assert_eq!(scene.location.as_deref(), Some("Damp Cellar"));
        assert_eq!(
            scene.description,
            vec!["Water drips from the ceiling.", "A rat scurries past."]
        );
        assert_eq!(kinds(&script.arena, scene.on_enter), vec!["set"]);

        let ids: Vec<_> = scene.hotspots.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["barrel", "door"]);
        let barrel = &scene.hotspots["barrel"];
        assert_eq!(barrel.name, "Old Barrel");
        assert_eq!(kinds(&script.arena, barrel.block(Verb::Look)), vec!["narration"]);
        assert_eq!(kinds(&script.arena, barrel.block(Verb::Use)), vec!["give"]);
        assert!(barrel.block(Verb::Talk).is_empty());
        assert_eq!(scene.hotspots["door"].name, "Iron Door");
    }

    #[test]
    fn nested_if_closes_innermost_first() {
        let parsed = parse_ok(
            r#"
DIALOGUE d
    IF a
        IF b
            "both"
        END
        "only a"
    ELSE
        "not a"
    END
    "after"
END
"#,
        );
        let script = &parsed.script;
        let body = script.dialogue("d").unwrap().body;
        assert_eq!(kinds(&script.arena, body), vec!["if", "narration"]);

        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = &script.arena.child(body, 0).unwrap().stmt
        else {
            panic!("expected IF");
        };
        assert_eq!(kinds(&script.arena, *then_branch), vec!["if", "narration"]);
        assert_eq!(kinds(&script.arena, else_branch.unwrap()), vec!["narration"]);
    }

    #[test]
    fn nested_choice_options_span_correctly() {
        let parsed = parse_ok(
            r#"
DIALOGUE d
    CHOICE
        > "Outer one"
            CHOICE
                > "Inner one"
                    GIVE inner_1
                > "Inner two"
                    GIVE inner_2
            END
            "after inner"
        > "Outer two"
            GIVE outer_2
    END
END
"#,
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let script = &parsed.script;
        let body = script.dialogue("d").unwrap().body;
        let Stmt::Choice { options } = &script.arena.child(body, 0).unwrap().stmt else {
            panic!("expected CHOICE");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].text, "Outer one");
        assert_eq!(kinds(&script.arena, options[0].body), vec!["choice", "narration"]);
        assert_eq!(options[1].text, "Outer two");
        assert_eq!(kinds(&script.arena, options[1].body), vec!["give"]);

        let Stmt::Choice { options: inner } = &script.arena.child(options[0].body, 0).unwrap().stmt
        else {
            panic!("expected inner CHOICE");
        };
        let texts: Vec<_> = inner.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Inner one", "Inner two"]);
    }

    #[test]
    fn statement_kinds() {
        let parsed = parse_ok(
            r#"
DIALOGUE d
    -> somewhere
    GIVE lamp
    SET mood = "calm"
    SET coins = 12
    Guard: "Halt!"
    Hero (thinks): "Not again."
    "The wind howls."
END
"#,
        );
        let script = &parsed.script;
        let body = script.dialogue("d").unwrap().body;
        let stmts: Vec<_> = script.arena.iter(body).map(|n| n.stmt.clone()).collect();
        assert_eq!(
            stmts,
            vec![
                Stmt::Goto {
                    target: "somewhere".into()
                },
                Stmt::Give { item: "lamp".into() },
                Stmt::Set {
                    name: "mood".into(),
                    value: FlagValue::Text("calm".into())
                },
                Stmt::Set {
                    name: "coins".into(),
                    value: FlagValue::Number(12)
                },
                Stmt::Dialogue {
                    speaker: "Guard".into(),
                    text: "Halt!".into(),
                    thinks: false
                },
                Stmt::Dialogue {
                    speaker: "Hero".into(),
                    text: "Not again.".into(),
                    thinks: true
                },
                Stmt::Narration {
                    text: "The wind howls.".into()
                },
            ]
        );
    }

    #[test]
    fn trigger_definition() {
        let parsed = parse_ok(
            r#"
TRIGGER open_gate
    REQUIRE HAS(gate_key)
    REQUIRE guard_asleep
    CUTSCENE
        "The gate creaks open."
    END
    -> courtyard
END
"#,
        );
        let trigger = parsed.script.trigger("open_gate").unwrap();
        assert_eq!(trigger.requires.len(), 2);
        assert_eq!(trigger.requires[0].source, "HAS(gate_key)");
        assert_eq!(trigger.requires[0].condition, Condition::Has("gate_key".into()));
        assert_eq!(trigger.goto.as_deref(), Some("courtyard"));
        assert_eq!(trigger.cutscene.len(), 1);
    }

    #[test]
    fn missing_hotspot_id_gets_placeholder() {
        let parsed = parse_ok(
            r#"
SCENE hall
    HOTSPOT
        LOOK
            "Something."
        END
    END
END
"#,
        );
        let scene = parsed.script.scene("hall").unwrap();
        assert_eq!(scene.hotspots.len(), 1);
        assert!(scene.hotspots.contains_key("hotspot_1"));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].message.contains("HOTSPOT without an id"));
    }

    #[test]
    fn hotspot_header_forms() {
        assert_eq!(hotspot_header("door"), (Some("door"), None));
        assert_eq!(hotspot_header("door \"Iron Door\""), (Some("door"), Some("Iron Door")));
        assert_eq!(hotspot_header("door: Iron Door"), (Some("door"), Some("Iron Door")));
        assert_eq!(hotspot_header("door:Iron"), (Some("door"), Some("Iron")));
        assert_eq!(hotspot_header("sign \"Sign: Danger\""), (Some("sign"), Some("Sign: Danger")));
        assert_eq!(hotspot_header("\"Nameless\""), (None, Some("Nameless")));
        assert_eq!(hotspot_header(""), (None, None));
    }

    #[test]
    fn unknown_top_level_lines_are_skipped() {
        let parsed = parse_ok(
            r#"
TITLE The Lost Key
random words here
DIALOGUE d
    "hi"
END
"#,
        );
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.script.dialogues.len(), 1);
    }

    #[test]
    fn duplicate_definitions_last_wins() {
        let parsed = parse_ok(
            r#"
SCENE hall "Old Hall"
END
DIALOGUE greet
    "first"
END
TRIGGER alarm
    -> hall
END
SCENE hall "New Hall"
END
DIALOGUE greet
    "second"
END
TRIGGER alarm
    REQUIRE HAS(bell)
    -> greet
END
"#,
        );
        let script = &parsed.script;
        assert!(parsed.diagnostics.is_empty());

        assert_eq!(script.scenes.len(), 1);
        assert_eq!(script.scene("hall").unwrap().location.as_deref(), Some("New Hall"));

        assert_eq!(script.dialogues.len(), 1);
        let body = script.dialogue("greet").unwrap().body;
        assert_eq!(
            script.arena.child(body, 0).unwrap().stmt,
            Stmt::Narration {
                text: "second".into()
            }
        );

        assert_eq!(script.triggers.len(), 1);
        let alarm = script.trigger("alarm").unwrap();
        assert_eq!(alarm.goto.as_deref(), Some("greet"));
        assert_eq!(alarm.requires.len(), 1);
    }

    #[test]
    fn missing_end_before_next_definition() {
        let parsed = parse_ok(
            r#"
DIALOGUE first
    "one"
DIALOGUE second
    "two"
END
"#,
        );
        assert_eq!(parsed.script.dialogues.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].message.contains("DIALOGUE block is missing END"));
    }

    #[test]
    fn shallower_end_closes_unterminated_inner_block() {
        let parsed = parse_ok(
            r#"
DIALOGUE d
    IF a
        "inside"
END
DIALOGUE e
    "e"
END
"#,
        );
        let script = &parsed.script;
        assert_eq!(script.dialogues.len(), 2);
        let body = script.dialogue("d").unwrap().body;
        assert_eq!(kinds(&script.arena, body), vec!["if"]);
        assert!(parsed.diagnostics.iter().any(|d| d.message.contains("IF block")));
    }

    #[test]
    fn invalid_condition_becomes_false() {
        let parsed = parse_ok(
            r#"
DIALOGUE d
    IF (a AND
        "never"
    END
END
"#,
        );
        let script = &parsed.script;
        let body = script.dialogue("d").unwrap().body;
        let Stmt::If { condition, .. } = &script.arena.child(body, 0).unwrap().stmt else {
            panic!("expected IF");
        };
        assert_eq!(condition, &Condition::Literal(false));
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn unexpected_block_inside_scene_is_skipped_whole() {
        let parsed = parse_ok(
            r#"
SCENE s
    CUTSCENE
        "misplaced"
    END
    HOTSPOT h
    END
END
"#,
        );
        let scene = parsed.script.scene("s").unwrap();
        assert!(scene.hotspots.contains_key("h"));
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn spans_point_at_lines() {
        let source = "DIALOGUE d\n  \"hi\"\nEND\n";
        let parsed = parse_ok(source);
        let script = &parsed.script;
        let body = script.dialogue("d").unwrap().body;
        let node = script.arena.child(body, 0).unwrap();
        assert_eq!(&source[node.span.clone()], "\"hi\"");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        const FRAGMENTS: &[&str] = &[
            "SCENE s",
            "DIALOGUE d",
            "TRIGGER t",
            "HOTSPOT",
            "IF a AND (b",
            "ELSE",
            "CHOICE",
            "> \"pick me\"",
            "END",
            "-> d",
            "LOOK",
            "CUTSCENE",
            "REQUIRE HAS(",
            "Bob: \"hi\"",
        ];

        fn story_line() -> impl Strategy<Value = String> {
            prop_oneof![
                prop::sample::select(FRAGMENTS).prop_map(String::from),
                "[ -~]{0,16}",
            ]
        }

        proptest! {
            #[test]
            fn arbitrary_content_never_panics(
                lines in prop::collection::vec((0usize..8, story_line()), 1..48)
            ) {
                let text: String = lines
                    .iter()
                    .map(|(indent, line)| format!("{}{line}\n", " ".repeat(*indent)))
                    .collect();
                let _ = parse(&text);
            }
        }
    }
}
