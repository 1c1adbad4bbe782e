//! Parsed story content: an arena of statements plus the scene, dialogue and
//! trigger tables that point into it.

use indexmap::IndexMap;

use crate::condition::Condition;
use crate::value::FlagValue;

/// Source span as a byte range.
pub type Span = std::ops::Range<usize>;

/// Index of a statement node in the [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// A contiguous run of child statements in the [`Arena`].
///
/// Blocks are plain indices, so they are `Copy` and can be held by an
/// in-flight execution without borrowing the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    start: u32,
    len: u32,
}

impl Block {
    /// A block with no statements.
    pub const EMPTY: Block = Block { start: 0, len: 0 };

    /// Number of statements in the block.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the block has no statements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A single executable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `GIVE item`.
    Give {
        /// Item id added to the inventory.
        item: String,
    },
    /// `SET name = value`.
    Set {
        /// Flag name.
        name: String,
        /// Coerced value.
        value: FlagValue,
    },
    /// `-> target`.
    Goto {
        /// Dialogue, trigger, scene or sentinel name.
        target: String,
    },
    /// `IF cond ... [ELSE ...] END`.
    If {
        /// The condition, evaluated once.
        condition: Condition,
        /// Statements run when the condition holds.
        then_branch: Block,
        /// Statements run otherwise, when an `ELSE` was written.
        else_branch: Option<Block>,
    },
    /// `CHOICE > "a" ... > "b" ... END`.
    Choice {
        /// Options in the order they were written.
        options: Vec<ChoiceOption>,
    },
    /// `speaker: "text"` or `speaker (thinks): "text"`.
    Dialogue {
        /// Who is speaking.
        speaker: String,
        /// The spoken text.
        text: String,
        /// Whether this is an inner thought.
        thinks: bool,
    },
    /// A bare quoted `"text"` line.
    Narration {
        /// The narrated text.
        text: String,
    },
}

/// One `> "text"` option of a CHOICE block.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    /// Text shown to the player.
    pub text: String,
    /// Statements run when this option is picked.
    pub body: Block,
}

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The statement.
    pub stmt: Stmt,
    /// Byte range of the statement's first line.
    pub span: Span,
}

/// Flat storage for every statement of one loaded act.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    children: Vec<NodeId>,
}

impl Arena {
    /// Store a node and return its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Append a finished list of sibling nodes and return it as a block.
    ///
    /// Nested blocks are sealed before their parent, so every block occupies
    /// its own contiguous range.
    pub fn seal(&mut self, ids: Vec<NodeId>) -> Block {
        if ids.is_empty() {
            return Block::EMPTY;
        }
        let start = self.children.len() as u32;
        let len = ids.len() as u32;
        self.children.extend(ids);
        Block { start, len }
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// The `index`-th statement of a block, if it exists.
    pub fn child(&self, block: Block, index: usize) -> Option<&Node> {
        if index >= block.len() {
            return None;
        }
        let id = self.children[block.start as usize + index];
        Some(self.node(id))
    }

    /// Iterate over the statements of a block.
    pub fn iter(&self, block: Block) -> impl Iterator<Item = &Node> + '_ {
        (0..block.len()).filter_map(move |i| self.child(block, i))
    }

    /// Every stored statement, in allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    /// Total number of statements stored.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no statements are stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Which hotspot verb block to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `LOOK` block.
    Look,
    /// `TALK` block.
    Talk,
    /// `USE` block.
    Use,
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Look => write!(f, "look"),
            Self::Talk => write!(f, "talk"),
            Self::Use => write!(f, "use"),
        }
    }
}

/// An interactive object inside a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    /// Hotspot id, unique within its scene.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `LOOK` statements.
    pub look: Block,
    /// `TALK` statements.
    pub talk: Block,
    /// `USE` statements.
    pub on_use: Block,
}

impl Hotspot {
    /// The statements for a verb.
    pub fn block(&self, verb: Verb) -> Block {
        match verb {
            Verb::Look => self.look,
            Verb::Talk => self.talk,
            Verb::Use => self.on_use,
        }
    }
}

/// A location the player can be in.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene id.
    pub id: String,
    /// Human-readable location label.
    pub location: Option<String>,
    /// `DESCRIPTION` text lines.
    pub description: Vec<String>,
    /// `ON_ENTER` statements.
    pub on_enter: Block,
    /// Hotspots in the order they were written.
    pub hotspots: IndexMap<String, Hotspot>,
    /// Byte range of the `SCENE` header line.
    pub span: Span,
}

/// A named line sequence reachable through GOTO.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialogue {
    /// Dialogue id.
    pub id: String,
    /// The dialogue's statements.
    pub body: Block,
    /// Byte range of the `DIALOGUE` header line.
    pub span: Span,
}

/// One `REQUIRE` line of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// The condition text as written.
    pub source: String,
    /// The parsed condition.
    pub condition: Condition,
}

/// A guarded, chainable unit of cutscene content.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    /// Trigger id.
    pub id: String,
    /// Conditions that must all hold.
    pub requires: Vec<Requirement>,
    /// `CUTSCENE` statements.
    pub cutscene: Block,
    /// Where to go afterwards.
    pub goto: Option<String>,
    /// Byte range of the `TRIGGER` header line.
    pub span: Span,
}

/// Everything loaded from one act's story text.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Statement storage.
    pub arena: Arena,
    /// Scenes by id, in definition order.
    pub scenes: IndexMap<String, Scene>,
    /// Dialogues by id, in definition order.
    pub dialogues: IndexMap<String, Dialogue>,
    /// Triggers by id, in definition order.
    pub triggers: IndexMap<String, Trigger>,
}

impl Script {
    /// The first scene written in the source, used as an act's entry point.
    pub fn first_scene(&self) -> Option<&Scene> {
        self.scenes.values().next()
    }

    /// Look up a scene.
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// Look up a dialogue.
    pub fn dialogue(&self, id: &str) -> Option<&Dialogue> {
        self.dialogues.get(id)
    }

    /// Look up a trigger.
    pub fn trigger(&self, id: &str) -> Option<&Trigger> {
        self.triggers.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narration(text: &str) -> Node {
        Node {
            stmt: Stmt::Narration {
                text: text.to_string(),
            },
            span: 0..0,
        }
    }

    #[test]
    fn nested_blocks_stay_contiguous() {
        let mut arena = Arena::default();
        let inner_a = arena.alloc(narration("inner a"));
        let inner_b = arena.alloc(narration("inner b"));
        let inner = arena.seal(vec![inner_a, inner_b]);

        let outer_a = arena.alloc(narration("outer a"));
        let outer_if = arena.alloc(Node {
            stmt: Stmt::If {
                condition: Condition::Literal(true),
                then_branch: inner,
                else_branch: None,
            },
            span: 0..0,
        });
        let outer = arena.seal(vec![outer_a, outer_if]);

        let texts: Vec<_> = arena
            .iter(inner)
            .map(|n| match &n.stmt {
                Stmt::Narration { text } => text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texts, vec!["inner a", "inner b"]);
        assert_eq!(outer.len(), 2);
        assert!(matches!(arena.child(outer, 1).unwrap().stmt, Stmt::If { .. }));
        assert!(arena.child(outer, 2).is_none());
    }

    #[test]
    fn empty_block() {
        let mut arena = Arena::default();
        let block = arena.seal(Vec::new());
        assert!(block.is_empty());
        assert_eq!(arena.iter(block).count(), 0);
    }
}
