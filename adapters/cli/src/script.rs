//! Parser for the line-oriented command script read from stdin.
//!
//! Each non-blank line holds a verb followed by its argument, for example
//! `move up`, `use 7`, `build bow`, `interact 3`, `rewind 2`, `save slot`,
//! `load slot` or `view`. Lines starting with `#` are comments.

use std::{error::Error, fmt};

use delve_core::{BuildableKind, Command, Direction, DungeonError, EntityId};

/// Request decoded from one script line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Request {
    /// A command applied to the world.
    Apply(Command),
    /// Store the world under the given name.
    Save(String),
    /// Replace the world with the save of the given name.
    Load(String),
    /// Print the projection without changing anything.
    View,
}

/// Errors raised while decoding a script line.
#[derive(Debug)]
pub(crate) enum ScriptError {
    /// The first word is not a known verb.
    UnknownVerb(String),
    /// The verb needs an argument that was not supplied.
    MissingArgument(&'static str),
    /// The line carried more words than the verb accepts.
    TrailingInput(String),
    /// An entity identifier or tick count was not a number.
    InvalidNumber(String),
    /// The argument was rejected by the dungeon vocabulary.
    Rejected(DungeonError),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVerb(verb) => write!(f, "unknown command '{verb}'"),
            Self::MissingArgument(verb) => write!(f, "'{verb}' needs an argument"),
            Self::TrailingInput(rest) => write!(f, "unexpected input '{rest}'"),
            Self::InvalidNumber(value) => write!(f, "'{value}' is not a number"),
            Self::Rejected(error) => write!(f, "{error}"),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// Decodes one line; blank lines and comments yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<Request>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let verb = verb.to_ascii_lowercase();
    let argument = words.next();
    let rest: Vec<&str> = words.collect();
    if !rest.is_empty() {
        return Err(ScriptError::TrailingInput(rest.join(" ")));
    }

    let request = match verb.as_str() {
        "view" => Request::View,
        "move" => Request::Apply(Command::Move {
            direction: required("move", argument)?
                .parse::<Direction>()
                .map_err(ScriptError::Rejected)?,
        }),
        "use" => Request::Apply(Command::UseItem {
            item: entity_id(required("use", argument)?)?,
        }),
        "build" => Request::Apply(Command::Build {
            buildable: required("build", argument)?
                .parse::<BuildableKind>()
                .map_err(ScriptError::Rejected)?,
        }),
        "interact" => Request::Apply(Command::Interact {
            entity: entity_id(required("interact", argument)?)?,
        }),
        "rewind" => {
            let ticks = required("rewind", argument)?;
            Request::Apply(Command::Rewind {
                ticks: ticks
                    .parse::<i64>()
                    .map_err(|_| ScriptError::InvalidNumber(ticks.to_owned()))?,
            })
        }
        "save" => Request::Save(required("save", argument)?.to_owned()),
        "load" => Request::Load(required("load", argument)?.to_owned()),
        _ => return Err(ScriptError::UnknownVerb(verb)),
    };
    Ok(Some(request))
}

fn required<'a>(verb: &'static str, argument: Option<&'a str>) -> Result<&'a str, ScriptError> {
    argument.ok_or(ScriptError::MissingArgument(verb))
}

fn entity_id(value: &str) -> Result<EntityId, ScriptError> {
    value
        .parse::<u64>()
        .map(EntityId::new)
        .map_err(|_| ScriptError::InvalidNumber(value.to_owned()))
}
